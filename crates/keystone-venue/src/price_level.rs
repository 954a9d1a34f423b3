//! A single rate level in the offer book.
//!
//! Offers at the same rate are kept in FIFO order (time priority) using a
//! [`VecDeque`] of ids; the offers themselves live in the book's offer map.

use std::collections::VecDeque;

use keystone_types::OfferId;
use rust_decimal::Decimal;

/// All resting offers of one pair at one rate.
///
/// The front of the deque is the oldest offer and is taken first.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    /// `sell_asset` per unit of `buy_asset` for every offer at this level.
    pub rate: Decimal,
    pub offers: VecDeque<OfferId>,
}

impl PriceLevel {
    #[must_use]
    pub fn new(rate: Decimal) -> Self {
        Self {
            rate,
            offers: VecDeque::new(),
        }
    }

    pub fn push_back(&mut self, id: OfferId) {
        self.offers.push_back(id);
    }

    #[must_use]
    pub fn front(&self) -> Option<OfferId> {
        self.offers.front().copied()
    }

    /// Remove a specific offer. Returns `false` if it was not at this level.
    pub fn remove(&mut self, id: OfferId) -> bool {
        match self.offers.iter().position(|o| *o == id) {
            Some(pos) => {
                self.offers.remove(pos);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.offers.len()
    }
}
