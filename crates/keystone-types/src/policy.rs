//! Policy and tranche configuration records.
//!
//! Every field of [`PolicyConfig`] is optional; omitted fields default when
//! the policy is created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, Amount, Asset};

/// Configuration passed to `createPolicy`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PolicyConfig {
    /// Underwriting entity; defaults to the creating entity.
    pub underwriter: Option<Address>,
    pub start_date: Option<DateTime<Utc>>,
    pub initiation_date: Option<DateTime<Utc>>,
    pub maturation_date: Option<DateTime<Utc>>,
    /// Premium unit; defaults to the host's native asset.
    pub unit: Option<Asset>,
}

impl PolicyConfig {
    #[must_use]
    pub fn with_underwriter(mut self, underwriter: Address) -> Self {
        self.underwriter = Some(underwriter);
        self
    }

    #[must_use]
    pub fn with_unit(mut self, unit: Asset) -> Self {
        self.unit = Some(unit);
        self
    }

    #[must_use]
    pub fn with_dates(
        mut self,
        initiation: DateTime<Utc>,
        start: DateTime<Utc>,
        maturation: DateTime<Utc>,
    ) -> Self {
        self.initiation_date = Some(initiation);
        self.start_date = Some(start);
        self.maturation_date = Some(maturation);
        self
    }
}

/// Resolved policy properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyInfo {
    pub entity: Address,
    pub underwriter: Address,
    pub initiation_date: DateTime<Utc>,
    pub start_date: DateTime<Utc>,
    pub maturation_date: DateTime<Utc>,
    pub unit: Asset,
    pub num_tranches: usize,
}

/// Configuration passed to `createTranch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranchConfig {
    pub num_shares: u64,
    pub price_per_share_amount: Amount,
    /// Premium schedule, paid in order.
    pub premiums: Vec<Amount>,
}
