//! Asset custody book.
//!
//! Tracks per-(asset, holder) balances and per-(asset, owner, spender)
//! allowances for every fungible asset on the host. All mutations are
//! atomic: either the full transfer succeeds or balances are unchanged.

use std::collections::HashMap;

use keystone_types::{Address, Amount, Asset, Custody, KeystoneError, Result, add_amounts};
use rust_decimal::Decimal;

/// Custodial balances of every asset on the host.
///
/// This is the physical side of the ledger: what an address actually holds,
/// regardless of what any entity's explicit ledger recognizes.
#[derive(Debug, Clone, Default)]
pub struct TokenBook {
    balances: HashMap<(Asset, Address), Amount>,
    allowances: HashMap<(Asset, Address, Address), Amount>,
    supply: HashMap<Asset, Amount>,
}

fn ensure_non_negative(amount: Amount) -> Result<()> {
    if amount < Decimal::ZERO {
        return Err(KeystoneError::InvalidAmount(amount));
    }
    Ok(())
}

impl TokenBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create new units of `asset` for `to` (wrapping native value into the token).
    pub fn mint(&mut self, asset: Asset, to: Address, amount: Amount) -> Result<()> {
        ensure_non_negative(amount)?;
        let supply = add_amounts(self.total_supply(asset), amount, "mint")?;
        let held = add_amounts(self.balance_of(asset, to), amount, "mint")?;
        self.supply.insert(asset, supply);
        self.balances.insert((asset, to), held);
        Ok(())
    }

    /// Total units of `asset` ever minted.
    #[must_use]
    pub fn total_supply(&self, asset: Asset) -> Amount {
        self.supply.get(&asset).copied().unwrap_or(Decimal::ZERO)
    }

    /// Sum of all holders' balances of `asset`. Always equals `total_supply`.
    #[must_use]
    pub fn circulating(&self, asset: Asset) -> Amount {
        self.balances
            .iter()
            .filter(|((a, _), _)| *a == asset)
            .map(|(_, amount)| *amount)
            .sum()
    }

    fn debit(&mut self, asset: Asset, from: Address, amount: Amount) -> Result<()> {
        let held = self.balance_of(asset, from);
        if held < amount {
            return Err(KeystoneError::InsufficientFunds {
                asset,
                requested: amount,
                available: held,
            });
        }
        self.balances.insert((asset, from), held - amount);
        Ok(())
    }
}

impl Custody for TokenBook {
    fn balance_of(&self, asset: Asset, holder: Address) -> Amount {
        self.balances
            .get(&(asset, holder))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    fn allowance(&self, asset: Asset, owner: Address, spender: Address) -> Amount {
        self.allowances
            .get(&(asset, owner, spender))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    fn approve(&mut self, asset: Asset, owner: Address, spender: Address, amount: Amount) {
        if amount <= Decimal::ZERO {
            self.allowances.remove(&(asset, owner, spender));
        } else {
            self.allowances.insert((asset, owner, spender), amount);
        }
    }

    fn transfer(&mut self, asset: Asset, from: Address, to: Address, amount: Amount) -> Result<()> {
        ensure_non_negative(amount)?;
        self.debit(asset, from, amount)?;
        // Every balance is bounded by the asset's supply, so this cannot overflow.
        *self.balances.entry((asset, to)).or_default() += amount;
        Ok(())
    }

    fn transfer_from(
        &mut self,
        asset: Asset,
        spender: Address,
        owner: Address,
        recipient: Address,
        amount: Amount,
    ) -> Result<()> {
        ensure_non_negative(amount)?;
        let allowed = self.allowance(asset, owner, spender);
        if allowed < amount {
            return Err(KeystoneError::AllowanceExceeded {
                asset,
                requested: amount,
                allowed,
            });
        }
        self.transfer(asset, owner, recipient, amount)?;
        self.approve(asset, owner, spender, allowed - amount);
        Ok(())
    }
}
