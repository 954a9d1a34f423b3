//! The offer book for every asset pair on the venue.
//!
//! Each directed pair `(sell_asset, buy_asset)` has its own
//! `BTreeMap<Reverse<rate>, PriceLevel>`, best rate (most `sell_asset` per
//! unit of `buy_asset`) first. An auxiliary index maps open offer ids to
//! their pair and rate for O(log N) removal. Closed offers stay in the offer
//! map so they can still be looked up.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use keystone_types::{Address, Asset, KeystoneError, Offer, OfferId, OfferStatus, Result};
use rust_decimal::Decimal;

use crate::price_level::PriceLevel;

type Pair = (Asset, Asset);

#[derive(Debug, Clone, Default)]
pub struct OfferBook {
    pairs: HashMap<Pair, BTreeMap<Reverse<Decimal>, PriceLevel>>,
    /// Fast lookup: open `OfferId -> (pair, rate)`.
    index: HashMap<OfferId, (Pair, Decimal)>,
    offers: HashMap<OfferId, Offer>,
}

impl OfferBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =================================================================
    // Insertion / removal
    // =================================================================

    /// Rest an open offer at the back of its rate level.
    pub fn insert(&mut self, offer: Offer) -> Result<()> {
        if self.offers.contains_key(&offer.id) {
            return Err(KeystoneError::InvalidOffer {
                reason: format!("duplicate offer id {}", offer.id),
            });
        }
        if !offer.is_open() {
            return Err(KeystoneError::InvalidOffer {
                reason: format!("offer {} is {}", offer.id, offer.status),
            });
        }
        let pair = (offer.sell_asset, offer.buy_asset);
        let rate = offer.rate();
        self.index.insert(offer.id, (pair, rate));
        self.pairs
            .entry(pair)
            .or_default()
            .entry(Reverse(rate))
            .or_insert_with(|| PriceLevel::new(rate))
            .push_back(offer.id);
        self.offers.insert(offer.id, offer);
        Ok(())
    }

    /// Take an open offer off the book and mark it closed with `status`.
    pub fn close(&mut self, id: OfferId, status: OfferStatus) -> Result<&Offer> {
        let (pair, rate) = self
            .index
            .remove(&id)
            .ok_or(KeystoneError::OfferNotFound(id))?;
        if let Some(levels) = self.pairs.get_mut(&pair) {
            if let Some(level) = levels.get_mut(&Reverse(rate)) {
                level.remove(id);
                if level.is_empty() {
                    levels.remove(&Reverse(rate));
                }
            }
            if levels.is_empty() {
                self.pairs.remove(&pair);
            }
        }
        let offer = self
            .offers
            .get_mut(&id)
            .ok_or(KeystoneError::OfferNotFound(id))?;
        offer.status = status;
        Ok(offer)
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Best open offer selling `sell_asset` for `buy_asset`.
    #[must_use]
    pub fn best(&self, sell_asset: Asset, buy_asset: Asset) -> Option<&Offer> {
        let id = self
            .pairs
            .get(&(sell_asset, buy_asset))?
            .values()
            .next()?
            .front()?;
        self.offers.get(&id)
    }

    /// Best open offer selling `sell_asset` for `buy_asset` not owned by `excluded`.
    ///
    /// Walks levels best rate first and each level in time priority.
    #[must_use]
    pub fn best_excluding(
        &self,
        sell_asset: Asset,
        buy_asset: Asset,
        excluded: Address,
    ) -> Option<&Offer> {
        self.pairs
            .get(&(sell_asset, buy_asset))?
            .values()
            .flat_map(|level| level.offers.iter())
            .filter_map(|id| self.offers.get(id))
            .find(|offer| offer.owner != excluded)
    }

    #[must_use]
    pub fn get(&self, id: OfferId) -> Option<&Offer> {
        self.offers.get(&id)
    }

    /// Mutable access to an open offer. Amounts may change; rate may not.
    pub fn open_mut(&mut self, id: OfferId) -> Result<&mut Offer> {
        if !self.index.contains_key(&id) {
            return Err(match self.offers.get(&id) {
                Some(offer) => KeystoneError::InvalidOffer {
                    reason: format!("offer {id} is {}", offer.status),
                },
                None => KeystoneError::OfferNotFound(id),
            });
        }
        self.offers
            .get_mut(&id)
            .ok_or(KeystoneError::OfferNotFound(id))
    }

    /// Number of open offers.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.index.len()
    }

    /// Number of rate levels for a pair.
    #[must_use]
    pub fn depth(&self, sell_asset: Asset, buy_asset: Asset) -> usize {
        self.pairs
            .get(&(sell_asset, buy_asset))
            .map_or(0, BTreeMap::len)
    }

    /// Open offers, in no particular order.
    pub fn open_offers(&self) -> impl Iterator<Item = &Offer> {
        self.index.keys().filter_map(|id| self.offers.get(id))
    }

    /// Total `asset` escrowed by open offers.
    #[must_use]
    pub fn escrowed(&self, asset: Asset) -> Decimal {
        self.open_offers()
            .filter(|o| o.sell_asset == asset)
            .map(|o| o.sell_amount)
            .sum()
    }
}
