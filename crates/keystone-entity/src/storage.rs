//! Per-entity storage shared by every module installed on the entity.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use keystone_ledger::{ExplicitLedger, ReentrancyGuard};
use keystone_types::{Address, Amount, Asset, ContextId, OfferId};
use serde::{Deserialize, Serialize};

use crate::diamond::DiamondState;

/// A resting venue offer created by `trade`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenTrade {
    pub offer_id: OfferId,
    pub sell_unit: Asset,
    pub buy_unit: Asset,
    /// Proceeds already credited to the explicit ledger.
    pub credited: Amount,
}

/// Everything an entity owns. Modules change; this does not.
#[derive(Debug, Clone)]
pub struct EntityStorage {
    pub context: ContextId,
    pub diamond: DiamondState,
    pub ledger: ExplicitLedger,
    pub guard: ReentrancyGuard,
    pub policies: Vec<Address>,
    pub open_trades: BTreeMap<OfferId, OpenTrade>,
    pub created_at: DateTime<Utc>,
}

impl EntityStorage {
    #[must_use]
    pub fn new(context: ContextId, delegate: Address) -> Self {
        Self {
            context,
            diamond: DiamondState::new(delegate),
            ledger: ExplicitLedger::new(),
            guard: ReentrancyGuard::new(),
            policies: Vec::new(),
            open_trades: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }
}
