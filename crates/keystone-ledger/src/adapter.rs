//! Venue adapter.
//!
//! Thin translation layer between an entity's ledger and the external venue.
//! Every venue interaction is bracketed by an exact approval that is reset
//! afterwards, and every amount the venue reports is capped by the custody
//! delta actually observed at the holder. The ledger credits only what the
//! adapter returns.

use keystone_types::{
    Address, Amount, Asset, Custody, KeystoneError, Offer, OfferId, Result, TradeOutcome, Venue,
};
use rust_decimal::Decimal;
use tracing::warn;

pub struct VenueAdapter<'a> {
    venue: &'a mut dyn Venue,
    custody: &'a mut dyn Custody,
    holder: Address,
}

impl<'a> VenueAdapter<'a> {
    pub fn new(venue: &'a mut dyn Venue, custody: &'a mut dyn Custody, holder: Address) -> Self {
        Self {
            venue,
            custody,
            holder,
        }
    }

    #[must_use]
    pub fn venue_address(&self) -> Address {
        self.venue.address()
    }

    /// Place a limit offer selling `sell_amount` for at least `buy_amount`.
    ///
    /// `received` in the outcome is the measured amount of `buy_asset` that
    /// reached the holder, never more than the venue reported.
    pub fn place_offer(
        &mut self,
        sell_asset: Asset,
        sell_amount: Amount,
        buy_asset: Asset,
        buy_amount: Amount,
    ) -> Result<TradeOutcome> {
        let venue = self.venue.address();
        let before = self.custody.balance_of(buy_asset, self.holder);
        self.custody.approve(sell_asset, self.holder, venue, sell_amount);
        let placed = self.venue.place_offer(
            &mut *self.custody,
            self.holder,
            sell_asset,
            sell_amount,
            buy_asset,
            buy_amount,
        );
        self.custody.approve(sell_asset, self.holder, venue, Decimal::ZERO);
        let outcome = placed?;
        let received = self.measured("place_offer", buy_asset, before, outcome.received);
        Ok(TradeOutcome {
            received,
            ..outcome
        })
    }

    /// Best standing offer that sells `buy_asset` in exchange for `sell_asset`.
    ///
    /// The holder's own offers are skipped.
    #[must_use]
    pub fn best_counter_offer(&self, sell_asset: Asset, buy_asset: Asset) -> Option<Offer> {
        self.venue.best_offer_for(self.holder, buy_asset, sell_asset)
    }

    pub fn quote(&self, offer_id: OfferId, pay: Amount) -> Result<Amount> {
        self.venue.quote(offer_id, pay)
    }

    /// Pay up to `pay` into an offer. Returns the measured amount received.
    pub fn fill(&mut self, offer_id: OfferId, pay: Amount) -> Result<Amount> {
        let offer = self.offer(offer_id)?;
        let venue = self.venue.address();
        let before = self.custody.balance_of(offer.sell_asset, self.holder);
        self.custody.approve(offer.buy_asset, self.holder, venue, pay);
        let filled = self
            .venue
            .fill(&mut *self.custody, self.holder, offer_id, pay);
        self.custody.approve(offer.buy_asset, self.holder, venue, Decimal::ZERO);
        let reported = filled?;
        Ok(self.measured("fill", offer.sell_asset, before, reported))
    }

    /// Cancel the holder's resting offer. Returns the measured escrow returned.
    pub fn cancel(&mut self, offer_id: OfferId) -> Result<Amount> {
        let offer = self.offer(offer_id)?;
        let before = self.custody.balance_of(offer.sell_asset, self.holder);
        let closed = self
            .venue
            .cancel(&mut *self.custody, self.holder, offer_id)?;
        Ok(self.measured("cancel", offer.sell_asset, before, closed.sell_amount))
    }

    /// Total paid to the owner of `offer_id` so far.
    pub fn proceeds_of(&self, offer_id: OfferId) -> Result<Amount> {
        Ok(self.offer(offer_id)?.proceeds)
    }

    pub fn offer(&self, offer_id: OfferId) -> Result<Offer> {
        self.venue
            .offer(offer_id)
            .ok_or(KeystoneError::OfferNotFound(offer_id))
    }

    fn measured(&self, operation: &str, asset: Asset, before: Amount, reported: Amount) -> Amount {
        let delta = (self.custody.balance_of(asset, self.holder) - before).max(Decimal::ZERO);
        if delta < reported {
            warn!(
                operation,
                holder = %self.holder,
                asset = %asset,
                reported = %reported,
                measured = %delta,
                "Venue reported more than it transferred"
            );
        }
        reported.min(delta)
    }
}
