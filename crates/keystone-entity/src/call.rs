//! The entity's operation surface.
//!
//! Every operation is an [`EntityCall`] variant whose selector is derived from
//! its signature string, so the dispatcher can route it without knowing which
//! module implements it. Operations contributed by later modules travel as
//! [`EntityCall::Extension`].

use chrono::{DateTime, Utc};
use keystone_types::{
    Address, Amount, Asset, KeystoneError, OfferId, PolicyConfig, Result, SaleOutcome, Selector,
    TradeOutcome,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EntityCall {
    // --- ledger ---
    Deposit {
        unit: Asset,
        amount: Amount,
    },
    Withdraw {
        unit: Asset,
        amount: Amount,
    },
    Trade {
        sell_unit: Asset,
        sell_amount: Amount,
        buy_unit: Asset,
        min_buy_amount: Amount,
    },
    SellAtBestPrice {
        sell_unit: Asset,
        sell_amount: Amount,
        buy_unit: Asset,
    },
    ClaimTradeProceeds {
        offer_id: OfferId,
    },
    CancelTrade {
        offer_id: OfferId,
    },
    PayTranchPremium {
        policy: Address,
        tranch_index: usize,
        amount: Amount,
    },
    GetBalance {
        unit: Asset,
    },

    // --- policies / introspection ---
    GetNumPolicies,
    GetPolicy {
        index: usize,
    },
    CreatePolicy(PolicyConfig),
    GetVersionInfo,

    // --- upgrade control ---
    Upgrade {
        modules: Vec<Address>,
    },
    RegisterFacets {
        modules: Vec<Address>,
    },
    IsUpgradeFrozen,
    FreezeUpgrades,
    GetDelegateAddress,

    /// Operation implemented by a module installed after construction.
    Extension {
        signature: String,
        #[serde(default)]
        args: serde_json::Value,
    },
}

impl EntityCall {
    #[must_use]
    pub fn signature(&self) -> &str {
        match self {
            Self::Deposit { .. } => "deposit(address,uint256)",
            Self::Withdraw { .. } => "withdraw(address,uint256)",
            Self::Trade { .. } => "trade(address,uint256,address,uint256)",
            Self::SellAtBestPrice { .. } => "sellAtBestPrice(address,uint256,address)",
            Self::ClaimTradeProceeds { .. } => "claimTradeProceeds(uint256)",
            Self::CancelTrade { .. } => "cancelTrade(uint256)",
            Self::PayTranchPremium { .. } => "payTranchPremium(address,uint256,uint256)",
            Self::GetBalance { .. } => "getBalance(address)",
            Self::GetNumPolicies => "getNumPolicies()",
            Self::GetPolicy { .. } => "getPolicy(uint256)",
            Self::CreatePolicy(_) => "createPolicy(bytes)",
            Self::GetVersionInfo => "getVersionInfo()",
            Self::Upgrade { .. } => "upgrade(address[])",
            Self::RegisterFacets { .. } => "registerFacets(address[])",
            Self::IsUpgradeFrozen => "isUpgradeFrozen()",
            Self::FreezeUpgrades => "freezeUpgrades()",
            Self::GetDelegateAddress => "getDelegateAddress()",
            Self::Extension { signature, .. } => signature,
        }
    }

    #[must_use]
    pub fn selector(&self) -> Selector {
        Selector::of(self.signature())
    }

    /// Selector of an operation by signature, for modules declaring what they serve.
    #[must_use]
    pub fn selector_of(signature: &str) -> Selector {
        Selector::of(signature)
    }
}

/// `getVersionInfo` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub num: u32,
    /// When the module table last changed.
    pub date: DateTime<Utc>,
    /// Fingerprint of the module table.
    pub hash: String,
}

/// Value returned by an entity operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CallOutput {
    Unit,
    Amount(Amount),
    Count(usize),
    Address(Address),
    Bool(bool),
    Trade(TradeOutcome),
    Sale(SaleOutcome),
    Version(VersionInfo),
    Json(serde_json::Value),
}

fn unexpected(expected: &str, got: &CallOutput) -> KeystoneError {
    KeystoneError::Internal(format!("expected {expected} output, got {got:?}"))
}

impl CallOutput {
    pub fn into_amount(self) -> Result<Amount> {
        match self {
            Self::Amount(amount) => Ok(amount),
            other => Err(unexpected("amount", &other)),
        }
    }

    pub fn into_count(self) -> Result<usize> {
        match self {
            Self::Count(n) => Ok(n),
            other => Err(unexpected("count", &other)),
        }
    }

    pub fn into_address(self) -> Result<Address> {
        match self {
            Self::Address(address) => Ok(address),
            other => Err(unexpected("address", &other)),
        }
    }

    pub fn into_bool(self) -> Result<bool> {
        match self {
            Self::Bool(b) => Ok(b),
            other => Err(unexpected("bool", &other)),
        }
    }

    pub fn into_trade(self) -> Result<TradeOutcome> {
        match self {
            Self::Trade(outcome) => Ok(outcome),
            other => Err(unexpected("trade", &other)),
        }
    }

    pub fn into_sale(self) -> Result<SaleOutcome> {
        match self {
            Self::Sale(outcome) => Ok(outcome),
            other => Err(unexpected("sale", &other)),
        }
    }

    pub fn into_version(self) -> Result<VersionInfo> {
        match self {
            Self::Version(info) => Ok(info),
            other => Err(unexpected("version", &other)),
        }
    }
}
