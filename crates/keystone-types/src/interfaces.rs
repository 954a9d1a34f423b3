//! Collaborator interfaces consumed by the entity ledger.
//!
//! The ledger never touches a concrete token or venue implementation; it
//! holds these traits as `&mut dyn` references for the duration of a call.

use crate::{Address, Amount, Asset, Offer, OfferId, Result, TradeOutcome};

/// Pull/push fungible-asset custody with an allowance model.
pub trait Custody {
    fn balance_of(&self, asset: Asset, holder: Address) -> Amount;

    fn allowance(&self, asset: Asset, owner: Address, spender: Address) -> Amount;

    /// Set (not add to) `spender`'s allowance over `owner`'s funds.
    fn approve(&mut self, asset: Asset, owner: Address, spender: Address, amount: Amount);

    /// Push `amount` from `from` to `to`.
    fn transfer(&mut self, asset: Asset, from: Address, to: Address, amount: Amount)
    -> Result<()>;

    /// Pull `amount` from `owner` to `recipient` using `spender`'s allowance.
    ///
    /// The allowance is checked before the balance.
    fn transfer_from(
        &mut self,
        asset: Asset,
        spender: Address,
        owner: Address,
        recipient: Address,
        amount: Amount,
    ) -> Result<()>;
}

/// Order-matching venue: offer creation, offer fill, best-offer query.
pub trait Venue {
    /// Address that holds escrow and must be approved before placing or filling.
    fn address(&self) -> Address;

    /// Escrow `sell_amount` from `owner`, match it against crossing offers and
    /// rest any remainder.
    fn place_offer(
        &mut self,
        custody: &mut dyn Custody,
        owner: Address,
        sell_asset: Asset,
        sell_amount: Amount,
        buy_asset: Asset,
        buy_amount: Amount,
    ) -> Result<TradeOutcome>;

    /// Best standing offer selling `sell_asset` for `buy_asset`.
    fn best_offer(&self, sell_asset: Asset, buy_asset: Asset) -> Option<Offer>;

    /// Best standing offer `taker` may fill. Offers owned by `taker` are skipped.
    fn best_offer_for(&self, taker: Address, sell_asset: Asset, buy_asset: Asset)
    -> Option<Offer>;

    /// What `fill(offer_id, pay)` would return, without moving funds.
    fn quote(&self, offer_id: OfferId, pay: Amount) -> Result<Amount>;

    /// `taker` pays up to `pay` of the offer's `buy_asset` and receives its
    /// `sell_asset`. Returns the amount received. An owner cannot fill its
    /// own offer.
    fn fill(
        &mut self,
        custody: &mut dyn Custody,
        taker: Address,
        offer_id: OfferId,
        pay: Amount,
    ) -> Result<Amount>;

    /// Any offer, open or closed.
    fn offer(&self, offer_id: OfferId) -> Option<Offer>;

    /// Cancel an open offer and return its escrow to the owner.
    fn cancel(
        &mut self,
        custody: &mut dyn Custody,
        caller: Address,
        offer_id: OfferId,
    ) -> Result<Offer>;
}
