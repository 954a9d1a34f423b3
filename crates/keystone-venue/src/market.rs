//! The offer market: escrowing placement with immediate matching, fills,
//! buys and cancellation.
//!
//! The market holds every open offer's `sell_amount` in escrow at its own
//! address. Matching executes at the resting (maker) offer's price, and the
//! taker side of a fill rounds toward zero at `amount_precision`.

use chrono::Utc;
use keystone_types::{
    Address, Amount, Asset, Custody, KeystoneError, Offer, OfferId, OfferStatus, Result,
    TradeOutcome, Venue, VenueConfig, mul_div, round_up,
};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::offer_book::OfferBook;

#[derive(Debug, Clone)]
pub struct OfferMarket {
    address: Address,
    config: VenueConfig,
    book: OfferBook,
    last_id: OfferId,
}

fn validate_offer(
    sell_asset: Asset,
    sell_amount: Amount,
    buy_asset: Asset,
    buy_amount: Amount,
) -> Result<()> {
    if sell_asset == buy_asset {
        return Err(KeystoneError::InvalidOffer {
            reason: "sell and buy asset must differ".into(),
        });
    }
    if sell_amount <= Decimal::ZERO {
        return Err(KeystoneError::InvalidAmount(sell_amount));
    }
    if buy_amount <= Decimal::ZERO {
        return Err(KeystoneError::InvalidAmount(buy_amount));
    }
    Ok(())
}

fn ensure_not_owner(offer: &Offer, taker: Address) -> Result<()> {
    if offer.owner == taker {
        warn!(offer = %offer.id, owner = %taker, "Self-trade blocked");
        return Err(KeystoneError::InvalidOffer {
            reason: format!("offer {} belongs to the taker", offer.id),
        });
    }
    Ok(())
}

/// Whether a resting `counter` gives at least `buy_amount / sell_amount`.
fn crosses(counter: &Offer, sell_amount: Amount, buy_amount: Amount) -> Result<bool> {
    let offered = counter.original_sell_amount.checked_mul(sell_amount);
    let wanted = counter.original_buy_amount.checked_mul(buy_amount);
    match (offered, wanted) {
        (Some(offered), Some(wanted)) => Ok(offered >= wanted),
        _ => Err(KeystoneError::AmountOverflow {
            operation: "offer crossing",
        }),
    }
}

impl OfferMarket {
    #[must_use]
    pub fn new(address: Address, config: VenueConfig) -> Self {
        Self {
            address,
            config,
            book: OfferBook::new(),
            last_id: OfferId(0),
        }
    }

    #[must_use]
    pub fn config(&self) -> &VenueConfig {
        &self.config
    }

    #[must_use]
    pub fn book(&self) -> &OfferBook {
        &self.book
    }

    /// `taker` buys `quantity` of the offer's `sell_asset`, paying the
    /// rounded-up price. Returns the amount paid.
    pub fn buy(
        &mut self,
        custody: &mut dyn Custody,
        taker: Address,
        offer_id: OfferId,
        quantity: Amount,
    ) -> Result<Amount> {
        if quantity <= Decimal::ZERO {
            return Err(KeystoneError::InvalidAmount(quantity));
        }
        let offer = self.book.open_mut(offer_id)?.clone();
        ensure_not_owner(&offer, taker)?;
        let (take, pay) = if quantity >= offer.sell_amount {
            (offer.sell_amount, offer.buy_amount)
        } else {
            let cost = offer.cost_of(quantity, self.config.amount_precision)?;
            if cost >= offer.buy_amount {
                (offer.sell_amount, offer.buy_amount)
            } else {
                (quantity, cost)
            }
        };
        custody.transfer_from(offer.buy_asset, self.address, taker, offer.owner, pay)?;
        custody.transfer(offer.sell_asset, self.address, taker, take)?;
        self.apply_fill(offer_id, pay, take)?;
        debug!(offer = %offer_id, taker = %taker, take = %take, pay = %pay, "Offer bought");
        Ok(pay)
    }

    fn next_id(&mut self) -> OfferId {
        self.last_id = self.last_id.next();
        self.last_id
    }

    /// Reduce an open offer by a fill and close it once nothing remains.
    fn apply_fill(&mut self, offer_id: OfferId, paid: Amount, taken: Amount) -> Result<()> {
        let offer = self.book.open_mut(offer_id)?;
        offer.sell_amount -= taken;
        offer.buy_amount -= paid;
        offer.proceeds += paid;
        if offer.sell_amount.is_zero() || offer.buy_amount.is_zero() {
            self.book.close(offer_id, OfferStatus::Filled)?;
            debug!(offer = %offer_id, "Offer filled");
        }
        Ok(())
    }
}

impl Venue for OfferMarket {
    fn address(&self) -> Address {
        self.address
    }

    fn place_offer(
        &mut self,
        custody: &mut dyn Custody,
        owner: Address,
        sell_asset: Asset,
        sell_amount: Amount,
        buy_asset: Asset,
        buy_amount: Amount,
    ) -> Result<TradeOutcome> {
        validate_offer(sell_asset, sell_amount, buy_asset, buy_amount)?;
        custody.transfer_from(sell_asset, self.address, owner, self.address, sell_amount)?;

        let precision = self.config.amount_precision;
        let mut remaining = sell_amount;
        let mut received = Decimal::ZERO;
        let mut matches = 0;

        // Counter offers sell our buy asset for our sell asset. The owner's
        // own offers are never matched.
        while remaining > Decimal::ZERO && matches < self.config.max_matches_per_offer {
            let Some(counter) = self.book.best_excluding(buy_asset, sell_asset, owner) else {
                break;
            };
            if !crosses(counter, sell_amount, buy_amount)? {
                break;
            }
            let counter_id = counter.id;
            let counter_owner = counter.owner;
            let pay = remaining.min(counter.buy_amount);
            let got = counter.proceeds_for(pay, precision)?;
            if got.is_zero() {
                break;
            }
            custody.transfer(sell_asset, self.address, counter_owner, pay)?;
            custody.transfer(buy_asset, self.address, owner, got)?;
            self.apply_fill(counter_id, pay, got)?;
            debug!(
                maker = %counter_id,
                taker = %owner,
                pay = %pay,
                got = %got,
                "Offer matched"
            );
            remaining -= pay;
            received += got;
            matches += 1;
        }

        let sold = sell_amount - remaining;
        let mut offer_id = None;
        if remaining > Decimal::ZERO {
            let id = self.next_id();
            let rest_buy = if sold.is_zero() {
                buy_amount
            } else {
                round_up(
                    mul_div(remaining, buy_amount, sell_amount, "resting offer")?,
                    precision,
                )
            };
            self.book.insert(Offer {
                id,
                owner,
                sell_asset,
                sell_amount: remaining,
                buy_asset,
                buy_amount: rest_buy,
                original_sell_amount: sell_amount,
                original_buy_amount: buy_amount,
                proceeds: received,
                status: OfferStatus::Open,
                created_at: Utc::now(),
            })?;
            offer_id = Some(id);
        }

        info!(
            owner = %owner,
            sell_asset = %sell_asset,
            sold = %sold,
            buy_asset = %buy_asset,
            received = %received,
            resting = %remaining,
            matches,
            "Offer placed"
        );

        Ok(TradeOutcome {
            offer_id,
            sold,
            received,
            resting: remaining,
        })
    }

    fn best_offer(&self, sell_asset: Asset, buy_asset: Asset) -> Option<Offer> {
        self.book.best(sell_asset, buy_asset).cloned()
    }

    fn best_offer_for(
        &self,
        taker: Address,
        sell_asset: Asset,
        buy_asset: Asset,
    ) -> Option<Offer> {
        self.book
            .best_excluding(sell_asset, buy_asset, taker)
            .cloned()
    }

    fn quote(&self, offer_id: OfferId, pay: Amount) -> Result<Amount> {
        let offer = self
            .book
            .get(offer_id)
            .ok_or(KeystoneError::OfferNotFound(offer_id))?;
        if !offer.is_open() {
            return Ok(Decimal::ZERO);
        }
        offer.proceeds_for(pay, self.config.amount_precision)
    }

    fn fill(
        &mut self,
        custody: &mut dyn Custody,
        taker: Address,
        offer_id: OfferId,
        pay: Amount,
    ) -> Result<Amount> {
        if pay <= Decimal::ZERO {
            return Err(KeystoneError::InvalidAmount(pay));
        }
        let offer = self.book.open_mut(offer_id)?.clone();
        ensure_not_owner(&offer, taker)?;
        let pay = pay.min(offer.buy_amount);
        let got = offer.proceeds_for(pay, self.config.amount_precision)?;
        if got.is_zero() {
            return Err(KeystoneError::InvalidOffer {
                reason: format!("paying {pay} into offer {offer_id} yields nothing"),
            });
        }
        custody.transfer_from(offer.buy_asset, self.address, taker, offer.owner, pay)?;
        custody.transfer(offer.sell_asset, self.address, taker, got)?;
        self.apply_fill(offer_id, pay, got)?;
        debug!(offer = %offer_id, taker = %taker, pay = %pay, got = %got, "Offer filled by taker");
        Ok(got)
    }

    fn offer(&self, offer_id: OfferId) -> Option<Offer> {
        self.book.get(offer_id).cloned()
    }

    fn cancel(
        &mut self,
        custody: &mut dyn Custody,
        caller: Address,
        offer_id: OfferId,
    ) -> Result<Offer> {
        let offer = self.book.open_mut(offer_id)?;
        if offer.owner != caller {
            return Err(KeystoneError::unauthorized("must be offer owner"));
        }
        let (asset, owner, escrow) = (offer.sell_asset, offer.owner, offer.sell_amount);
        custody.transfer(asset, self.address, owner, escrow)?;
        let closed = self.book.close(offer_id, OfferStatus::Cancelled)?.clone();
        info!(offer = %offer_id, owner = %owner, returned = %escrow, "Offer cancelled");
        Ok(closed)
    }
}
