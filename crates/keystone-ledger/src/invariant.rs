//! Custody invariant checker.
//!
//! Enforced after every ledger mutation:
//! ```text
//! ∀ asset: explicit(entity, asset) <= custody.balance_of(asset, entity)
//! ```
//!
//! A violation means the ledger recognizes funds the entity does not hold.
//! The enclosing call fails and the host reverts it.

use keystone_types::{Address, Asset, Custody, KeystoneError, Result};
use tracing::error;

use crate::ExplicitLedger;

/// Checks explicit balances against physical custody.
pub struct CustodyInvariant;

impl CustodyInvariant {
    /// Verify one asset.
    pub fn verify_asset(
        ledger: &ExplicitLedger,
        custody: &dyn Custody,
        holder: Address,
        asset: Asset,
    ) -> Result<()> {
        let holding = ledger.holding(asset, custody, holder);
        if !holding.is_sound() {
            error!(
                holder = %holder,
                asset = %asset,
                explicit = %holding.explicit,
                custodial = %holding.custodial,
                "CRITICAL: explicit balance exceeds custody"
            );
            return Err(KeystoneError::InvariantViolation {
                reason: format!(
                    "holder {holder} asset {asset}: explicit {} > custodial {}",
                    holding.explicit, holding.custodial
                ),
            });
        }
        Ok(())
    }

    /// Verify every asset the ledger has ever referenced.
    pub fn verify(ledger: &ExplicitLedger, custody: &dyn Custody, holder: Address) -> Result<()> {
        for asset in ledger.assets() {
            Self::verify_asset(ledger, custody, holder, asset)?;
        }
        Ok(())
    }
}
