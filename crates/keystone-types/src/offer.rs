//! Offer types for the external order-matching venue.
//!
//! An [`Offer`] is a standing order to give `sell_amount` of `sell_asset` in
//! exchange for `buy_amount` of `buy_asset`. Amounts shrink as the offer is
//! filled; the original amounts fix its rate.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{Address, Amount, Asset, OfferId, Result, mul_div};

/// Round an amount toward zero at `precision` decimal places.
#[must_use]
pub fn round_down(amount: Decimal, precision: u32) -> Decimal {
    amount.round_dp_with_strategy(precision, RoundingStrategy::ToZero)
}

/// Round an amount away from zero at `precision` decimal places.
#[must_use]
pub fn round_up(amount: Decimal, precision: u32) -> Decimal {
    amount.round_dp_with_strategy(precision, RoundingStrategy::AwayFromZero)
}

/// Lifecycle status of an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OfferStatus {
    Open,
    Filled,
    Cancelled,
}

impl std::fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Filled => write!(f, "FILLED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub owner: Address,
    pub sell_asset: Asset,
    /// Remaining amount on offer.
    pub sell_amount: Amount,
    pub buy_asset: Asset,
    /// Remaining amount wanted in return.
    pub buy_amount: Amount,
    pub original_sell_amount: Amount,
    pub original_buy_amount: Amount,
    /// Total `buy_asset` paid to the owner so far.
    pub proceeds: Amount,
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
}

impl Offer {
    /// `sell_asset` a taker receives per unit of `buy_asset` paid. Higher is better for takers.
    #[must_use]
    pub fn rate(&self) -> Decimal {
        if self.original_buy_amount.is_zero() {
            Decimal::ZERO
        } else {
            self.original_sell_amount
                .checked_div(self.original_buy_amount)
                .unwrap_or(Decimal::MAX)
        }
    }

    /// `buy_asset` wanted per unit of `sell_asset`.
    #[must_use]
    pub fn price(&self) -> Decimal {
        if self.original_sell_amount.is_zero() {
            Decimal::ZERO
        } else {
            self.original_buy_amount
                .checked_div(self.original_sell_amount)
                .unwrap_or(Decimal::MAX)
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == OfferStatus::Open
    }

    /// Amount of `sell_asset` that has left the offer through fills.
    ///
    /// A cancelled offer keeps the returned remainder in `sell_amount`.
    #[must_use]
    pub fn sold(&self) -> Amount {
        self.original_sell_amount - self.sell_amount
    }

    /// What a taker paying `pay` of `buy_asset` would receive, at `precision`.
    ///
    /// Paying the whole remaining `buy_amount` takes the whole remaining `sell_amount`.
    pub fn proceeds_for(&self, pay: Amount, precision: u32) -> Result<Amount> {
        if self.buy_amount.is_zero() || pay <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }
        if pay >= self.buy_amount {
            return Ok(self.sell_amount);
        }
        let exact = mul_div(pay, self.sell_amount, self.buy_amount, "offer proceeds")?;
        Ok(round_down(exact, precision).min(self.sell_amount))
    }

    /// What a taker must pay to receive `quantity` of `sell_asset`, at `precision`.
    pub fn cost_of(&self, quantity: Amount, precision: u32) -> Result<Amount> {
        if self.sell_amount.is_zero() || quantity <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }
        if quantity >= self.sell_amount {
            return Ok(self.buy_amount);
        }
        let exact = mul_div(quantity, self.buy_amount, self.sell_amount, "offer cost")?;
        Ok(round_up(exact, precision).min(self.buy_amount))
    }
}

/// Result of placing an offer: what matched immediately and what rests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeOutcome {
    /// Id of the resting remainder, `None` when nothing rests on the book.
    pub offer_id: Option<OfferId>,
    /// Amount of the sell asset consumed by immediate matches.
    pub sold: Amount,
    /// Amount of the buy asset received from immediate matches.
    pub received: Amount,
    /// Amount of the sell asset left escrowed at the venue.
    pub resting: Amount,
}

/// Result of a best-price sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleOutcome {
    pub sold: Amount,
    pub received: Amount,
    /// Requested amount that found no counter offer.
    pub unsold: Amount,
    /// Number of counter offers consumed.
    pub fills: usize,
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Offer {
    pub fn dummy(sell_amount: Amount, buy_amount: Amount) -> Self {
        Self {
            id: OfferId(1),
            owner: Address::from_label("maker"),
            sell_asset: Address::from_label("SELL"),
            sell_amount,
            buy_asset: Address::from_label("BUY"),
            buy_amount,
            original_sell_amount: sell_amount,
            original_buy_amount: buy_amount,
            proceeds: Decimal::ZERO,
            status: OfferStatus::Open,
            created_at: Utc::now(),
        }
    }
}
