//! Observable event records emitted by entities and the role registry.
//!
//! Every significant action (deposit, withdrawal, policy creation, upgrade)
//! appends an [`EventRecord`] to the host's append-only log. Records of a
//! reverted call are discarded together with the rest of its state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, Amount, Asset, CallId, ContextId, OfferId, RoleId};

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityEvent {
    EntityDeposit {
        caller: Address,
        unit: Asset,
        amount: Amount,
    },
    EntityWithdraw {
        caller: Address,
        unit: Asset,
        amount: Amount,
    },
    NewPolicy {
        policy: Address,
        entity: Address,
        deployer: Address,
    },
    TradePlaced {
        caller: Address,
        offer_id: Option<OfferId>,
        sell_unit: Asset,
        sold: Amount,
        buy_unit: Asset,
        received: Amount,
    },
    SoldAtBestPrice {
        caller: Address,
        sell_unit: Asset,
        sold: Amount,
        buy_unit: Asset,
        received: Amount,
    },
    TradeProceedsClaimed {
        offer_id: OfferId,
        unit: Asset,
        amount: Amount,
    },
    TradeCancelled {
        offer_id: OfferId,
        unit: Asset,
        returned: Amount,
    },
    PremiumPaid {
        caller: Address,
        policy: Address,
        tranch_index: usize,
        unit: Asset,
        amount: Amount,
    },
    FacetsRegistered {
        modules: Vec<Address>,
    },
    UpgradesFrozen,
    RoleAssigned {
        context: ContextId,
        principal: Address,
        role: RoleId,
        assigner: Address,
    },
    RoleUnassigned {
        context: ContextId,
        principal: Address,
        role: RoleId,
        assigner: Address,
    },
}

impl EntityEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::EntityDeposit { .. } => "ENTITY_DEPOSIT",
            Self::EntityWithdraw { .. } => "ENTITY_WITHDRAW",
            Self::NewPolicy { .. } => "NEW_POLICY",
            Self::TradePlaced { .. } => "TRADE_PLACED",
            Self::SoldAtBestPrice { .. } => "SOLD_AT_BEST_PRICE",
            Self::TradeProceedsClaimed { .. } => "TRADE_PROCEEDS_CLAIMED",
            Self::TradeCancelled { .. } => "TRADE_CANCELLED",
            Self::PremiumPaid { .. } => "PREMIUM_PAID",
            Self::FacetsRegistered { .. } => "FACETS_REGISTERED",
            Self::UpgradesFrozen => "UPGRADES_FROZEN",
            Self::RoleAssigned { .. } => "ROLE_ASSIGNED",
            Self::RoleUnassigned { .. } => "ROLE_UNASSIGNED",
        }
    }
}

impl std::fmt::Display for EntityEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry of the event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position in the log, starting at zero.
    pub sequence: u64,
    /// The top-level call that produced this record.
    pub call_id: CallId,
    /// Contract that emitted the event.
    pub emitter: Address,
    pub event: EntityEvent,
    pub recorded_at: DateTime<Utc>,
}

/// Append-only event log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, call_id: CallId, emitter: Address, event: EntityEvent) {
        let sequence = self.records.len() as u64;
        self.records.push(EventRecord {
            sequence,
            call_id,
            emitter,
            event,
            recorded_at: Utc::now(),
        });
    }

    #[must_use]
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records produced by one call.
    pub fn for_call(&self, call_id: CallId) -> impl Iterator<Item = &EventRecord> {
        self.records.iter().filter(move |r| r.call_id == call_id)
    }

    #[must_use]
    pub fn last(&self) -> Option<&EventRecord> {
        self.records.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
