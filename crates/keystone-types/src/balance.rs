//! Balance types for the explicit-deposit accounting model.
//!
//! An entity physically holds a `custodial` amount of each asset, of which
//! only the `explicit` part is recognized by its ledger. The difference is
//! inert: visible in custody but untouchable by ledger operations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Address, KeystoneError, Result};

/// Token amount.
pub type Amount = Decimal;

/// Assets are identified by the address of their token contract.
pub type Asset = Address;

/// `a + b`, failing with `AmountOverflow` instead of panicking.
pub fn add_amounts(a: Amount, b: Amount, operation: &'static str) -> Result<Amount> {
    a.checked_add(b)
        .ok_or(KeystoneError::AmountOverflow { operation })
}

/// `a * b / c`, failing with `AmountOverflow` on overflow or a zero divisor.
pub fn mul_div(a: Amount, b: Amount, c: Amount, operation: &'static str) -> Result<Amount> {
    a.checked_mul(b)
        .and_then(|product| product.checked_div(c))
        .ok_or(KeystoneError::AmountOverflow { operation })
}

/// Explicit vs. custodial view of one (entity, asset) pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Holding {
    /// Amount the ledger recognizes as usable.
    pub explicit: Amount,
    /// Amount physically held by the entity.
    pub custodial: Amount,
}

impl Holding {
    #[must_use]
    pub fn new(explicit: Amount, custodial: Amount) -> Self {
        Self {
            explicit,
            custodial,
        }
    }

    /// Funds held but never credited (accidental transfers, uncredited proceeds).
    #[must_use]
    pub fn inert(&self) -> Amount {
        (self.custodial - self.explicit).max(Decimal::ZERO)
    }

    /// `explicit <= custodial`.
    #[must_use]
    pub fn is_sound(&self) -> bool {
        self.explicit <= self.custodial
    }
}

impl Default for Holding {
    fn default() -> Self {
        Self::new(Decimal::ZERO, Decimal::ZERO)
    }
}
