//! Explicit-balance ledger.
//!
//! Per-asset amounts an entity recognizes as its own. Custody may hold more
//! (funds sent directly, never deposited); the difference is inert and no
//! operation can spend it.

use std::collections::BTreeMap;

use keystone_types::{
    Address, Amount, Asset, Custody, Holding, KeystoneError, Result, add_amounts,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplicitLedger {
    balances: BTreeMap<Asset, Amount>,
}

impl ExplicitLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicit balance of `asset`; zero on first reference.
    #[must_use]
    pub fn balance(&self, asset: Asset) -> Amount {
        self.balances.get(&asset).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn credit(&mut self, asset: Asset, amount: Amount) -> Result<()> {
        if amount < Decimal::ZERO {
            return Err(KeystoneError::InvalidAmount(amount));
        }
        let balance = add_amounts(self.balance(asset), amount, "explicit credit")?;
        self.balances.insert(asset, balance);
        Ok(())
    }

    /// Fails with `ExceedsExplicitBalance` and leaves the balance untouched.
    pub fn debit(&mut self, asset: Asset, amount: Amount) -> Result<()> {
        if amount < Decimal::ZERO {
            return Err(KeystoneError::InvalidAmount(amount));
        }
        let available = self.balance(asset);
        if amount > available {
            return Err(KeystoneError::ExceedsExplicitBalance {
                asset,
                requested: amount,
                available,
            });
        }
        self.balances.insert(asset, available - amount);
        Ok(())
    }

    /// Every asset ever referenced, in address order.
    pub fn assets(&self) -> impl Iterator<Item = Asset> + '_ {
        self.balances.keys().copied()
    }

    /// Explicit and custodial view of `asset` for `holder`.
    #[must_use]
    pub fn holding(&self, asset: Asset, custody: &dyn Custody, holder: Address) -> Holding {
        Holding::new(self.balance(asset), custody.balance_of(asset, holder))
    }
}
