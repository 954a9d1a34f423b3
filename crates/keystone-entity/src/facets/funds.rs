//! Entity funds: the explicit-deposit ledger operations.
//!
//! Only amounts moved in through `deposit`, or received through a trade or
//! sale, are credited. Funds sent straight to the entity stay inert.
//!
//! Every mutation runs under the entity's [`ReentrancyGuard`], debits before
//! any custody or venue call, and re-checks the custody invariant before it
//! returns.
//!
//! [`ReentrancyGuard`]: keystone_ledger::ReentrancyGuard

use keystone_ledger::{CustodyInvariant, VenueAdapter};
use keystone_types::{
    Address, Amount, Asset, Custody, EmptyBookPolicy, EntityEvent, KeystoneError, OfferId,
    Result, SaleOutcome, Selector, Venue, roles,
};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::call::{CallOutput, EntityCall};
use crate::facet::{CallContext, Facet};
use crate::policy::collect_premium;
use crate::storage::OpenTrade;

const MUST_BE_ENTITY_ADMIN: &str = "must be entity admin";
const MUST_BE_TRADER: &str = "must be trader";
const MUST_BE_ENTITY_REP: &str = "must be entity rep";

#[derive(Debug, Default)]
pub struct EntityFundsFacet;

impl Facet for EntityFundsFacet {
    fn name(&self) -> &'static str {
        "entity-funds"
    }

    fn selectors(&self) -> Vec<Selector> {
        [
            "deposit(address,uint256)",
            "withdraw(address,uint256)",
            "trade(address,uint256,address,uint256)",
            "sellAtBestPrice(address,uint256,address)",
            "claimTradeProceeds(uint256)",
            "cancelTrade(uint256)",
            "payTranchPremium(address,uint256,uint256)",
            "getBalance(address)",
        ]
        .into_iter()
        .map(EntityCall::selector_of)
        .collect()
    }

    fn execute(&self, ctx: &mut CallContext<'_>, call: &EntityCall) -> Result<CallOutput> {
        match *call {
            EntityCall::Deposit { unit, amount } => {
                guarded(ctx, "deposit", |ctx| deposit(ctx, unit, amount))
            }
            EntityCall::Withdraw { unit, amount } => {
                guarded(ctx, "withdraw", |ctx| withdraw(ctx, unit, amount))
            }
            EntityCall::Trade {
                sell_unit,
                sell_amount,
                buy_unit,
                min_buy_amount,
            } => guarded(ctx, "trade", |ctx| {
                trade(ctx, sell_unit, sell_amount, buy_unit, min_buy_amount)
            }),
            EntityCall::SellAtBestPrice {
                sell_unit,
                sell_amount,
                buy_unit,
            } => guarded(ctx, "sellAtBestPrice", |ctx| {
                sell_at_best_price(ctx, sell_unit, sell_amount, buy_unit)
            }),
            EntityCall::ClaimTradeProceeds { offer_id } => {
                guarded(ctx, "claimTradeProceeds", |ctx| {
                    ctx.require_role(roles::entity_rep(), MUST_BE_TRADER)?;
                    claim_proceeds(ctx, offer_id).map(CallOutput::Amount)
                })
            }
            EntityCall::CancelTrade { offer_id } => {
                guarded(ctx, "cancelTrade", |ctx| cancel_trade(ctx, offer_id))
            }
            EntityCall::PayTranchPremium {
                policy,
                tranch_index,
                amount,
            } => guarded(ctx, "payTranchPremium", |ctx| {
                pay_tranch_premium(ctx, policy, tranch_index, amount)
            }),
            EntityCall::GetBalance { unit } => {
                Ok(CallOutput::Amount(ctx.storage().ledger.balance(unit)))
            }
            ref other => Err(CallContext::unsupported(other)),
        }
    }
}

// ========================================================================
// Guard
// ========================================================================

/// Run one ledger mutation under the reentrancy guard, then verify custody.
fn guarded<T>(
    ctx: &mut CallContext<'_>,
    operation: &'static str,
    body: impl FnOnce(&mut CallContext<'_>) -> Result<T>,
) -> Result<T> {
    ctx.storage_mut().guard.enter(operation)?;
    let result = body(ctx);
    ctx.storage_mut().guard.exit();
    let value = result?;

    let this = ctx.this();
    let (storage, world) = ctx.split();
    CustodyInvariant::verify(&storage.ledger, &world.tokens, this)?;
    Ok(value)
}

fn ensure_positive(amount: Amount) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(KeystoneError::InvalidAmount(amount));
    }
    Ok(())
}

// ========================================================================
// Deposit / withdraw
// ========================================================================

fn deposit(ctx: &mut CallContext<'_>, unit: Asset, amount: Amount) -> Result<CallOutput> {
    ensure_positive(amount)?;
    let (this, caller) = (ctx.this(), ctx.caller());
    let (storage, world) = ctx.split();
    world.tokens.transfer_from(unit, this, caller, this, amount)?;
    storage.ledger.credit(unit, amount)?;
    info!(
        entity = %this,
        caller = %caller,
        unit = %unit,
        amount = %amount,
        "Deposit credited"
    );
    ctx.emit(EntityEvent::EntityDeposit {
        caller,
        unit,
        amount,
    });
    Ok(CallOutput::Unit)
}

fn withdraw(ctx: &mut CallContext<'_>, unit: Asset, amount: Amount) -> Result<CallOutput> {
    ctx.require_role(roles::entity_admin(), MUST_BE_ENTITY_ADMIN)?;
    ensure_positive(amount)?;
    let (this, caller) = (ctx.this(), ctx.caller());
    let (storage, world) = ctx.split();
    storage.ledger.debit(unit, amount)?;
    world.tokens.transfer(unit, this, caller, amount)?;
    info!(
        entity = %this,
        caller = %caller,
        unit = %unit,
        amount = %amount,
        "Withdrawal sent"
    );
    ctx.emit(EntityEvent::EntityWithdraw {
        caller,
        unit,
        amount,
    });
    Ok(CallOutput::Unit)
}

// ========================================================================
// Trading
// ========================================================================

fn trade(
    ctx: &mut CallContext<'_>,
    sell_unit: Asset,
    sell_amount: Amount,
    buy_unit: Asset,
    min_buy_amount: Amount,
) -> Result<CallOutput> {
    ctx.require_role(roles::entity_rep(), MUST_BE_TRADER)?;
    ensure_positive(sell_amount)?;
    let (this, caller) = (ctx.this(), ctx.caller());
    let (storage, world) = ctx.split();

    // The full amount leaves the ledger: matched or escrowed at the venue.
    storage.ledger.debit(sell_unit, sell_amount)?;
    let outcome = VenueAdapter::new(&mut world.venue, &mut world.tokens, this).place_offer(
        sell_unit,
        sell_amount,
        buy_unit,
        min_buy_amount,
    )?;
    storage.ledger.credit(buy_unit, outcome.received)?;
    if let Some(offer_id) = outcome.offer_id {
        storage.open_trades.insert(
            offer_id,
            OpenTrade {
                offer_id,
                sell_unit,
                buy_unit,
                credited: outcome.received,
            },
        );
    }

    info!(
        entity = %this,
        sell_unit = %sell_unit,
        sold = %outcome.sold,
        buy_unit = %buy_unit,
        received = %outcome.received,
        resting = %outcome.resting,
        "Trade placed"
    );
    ctx.emit(EntityEvent::TradePlaced {
        caller,
        offer_id: outcome.offer_id,
        sell_unit,
        sold: outcome.sold,
        buy_unit,
        received: outcome.received,
    });
    Ok(CallOutput::Trade(outcome))
}

fn sell_at_best_price(
    ctx: &mut CallContext<'_>,
    sell_unit: Asset,
    sell_amount: Amount,
    buy_unit: Asset,
) -> Result<CallOutput> {
    ctx.require_role(roles::entity_rep(), MUST_BE_TRADER)?;
    ensure_positive(sell_amount)?;
    let (this, caller) = (ctx.this(), ctx.caller());
    let (storage, world) = ctx.split();
    let ledger_config = world.config.ledger.clone();

    if world.venue.best_offer_for(this, buy_unit, sell_unit).is_none()
        && ledger_config.empty_book == EmptyBookPolicy::Fail
    {
        return Err(KeystoneError::NoOffers {
            sell_asset: sell_unit,
            buy_asset: buy_unit,
        });
    }

    storage.ledger.debit(sell_unit, sell_amount)?;
    let held_before = world.tokens.balance_of(sell_unit, this);

    let mut adapter = VenueAdapter::new(&mut world.venue, &mut world.tokens, this);
    let mut remaining = sell_amount;
    let mut received = Decimal::ZERO;
    let mut fills = 0;
    while remaining > Decimal::ZERO && fills < ledger_config.max_fills_per_sale {
        let Some(offer) = adapter.best_counter_offer(sell_unit, buy_unit) else {
            break;
        };
        let pay = remaining.min(offer.buy_amount);
        if adapter.quote(offer.id, pay)?.is_zero() {
            break;
        }
        let got = adapter.fill(offer.id, pay)?;
        debug!(offer = %offer.id, pay = %pay, got = %got, "Sale fill");
        remaining -= pay;
        received += got;
        fills += 1;
    }

    let spent = (held_before - world.tokens.balance_of(sell_unit, this)).max(Decimal::ZERO);
    let sold = spent.min(sell_amount);
    let unsold = sell_amount - sold;
    storage.ledger.credit(sell_unit, unsold)?;
    storage.ledger.credit(buy_unit, received)?;

    info!(
        entity = %this,
        sell_unit = %sell_unit,
        sold = %sold,
        buy_unit = %buy_unit,
        received = %received,
        unsold = %unsold,
        fills,
        "Sold at best price"
    );
    ctx.emit(EntityEvent::SoldAtBestPrice {
        caller,
        sell_unit,
        sold,
        buy_unit,
        received,
    });
    Ok(CallOutput::Sale(SaleOutcome {
        sold,
        received,
        unsold,
        fills,
    }))
}

/// Credit proceeds of a resting trade paid since the last claim.
///
/// The credit never exceeds what custody holds beyond the explicit balance.
fn claim_proceeds(ctx: &mut CallContext<'_>, offer_id: OfferId) -> Result<Amount> {
    let this = ctx.this();
    let (storage, world) = ctx.split();
    let record = storage
        .open_trades
        .get(&offer_id)
        .cloned()
        .ok_or(KeystoneError::OfferNotFound(offer_id))?;
    let offer = VenueAdapter::new(&mut world.venue, &mut world.tokens, this).offer(offer_id)?;

    let pending = (offer.proceeds - record.credited).max(Decimal::ZERO);
    let inert = storage
        .ledger
        .holding(record.buy_unit, &world.tokens, this)
        .inert();
    let amount = pending.min(inert);
    storage.ledger.credit(record.buy_unit, amount)?;

    if offer.is_open() {
        if let Some(open) = storage.open_trades.get_mut(&offer_id) {
            open.credited += amount;
        }
    } else {
        storage.open_trades.remove(&offer_id);
    }

    if !amount.is_zero() {
        debug!(entity = %this, offer = %offer_id, amount = %amount, "Trade proceeds claimed");
        ctx.emit(EntityEvent::TradeProceedsClaimed {
            offer_id,
            unit: record.buy_unit,
            amount,
        });
    }
    Ok(amount)
}

fn cancel_trade(ctx: &mut CallContext<'_>, offer_id: OfferId) -> Result<CallOutput> {
    ctx.require_role(roles::entity_rep(), MUST_BE_TRADER)?;
    let this = ctx.this();
    let record = ctx
        .storage()
        .open_trades
        .get(&offer_id)
        .cloned()
        .ok_or(KeystoneError::OfferNotFound(offer_id))?;

    let (storage, world) = ctx.split();
    let returned = VenueAdapter::new(&mut world.venue, &mut world.tokens, this).cancel(offer_id)?;
    storage.ledger.credit(record.sell_unit, returned)?;
    // The closed offer settles its remaining proceeds and drops the record.
    claim_proceeds(ctx, offer_id)?;

    info!(entity = %this, offer = %offer_id, returned = %returned, "Trade cancelled");
    ctx.emit(EntityEvent::TradeCancelled {
        offer_id,
        unit: record.sell_unit,
        returned,
    });
    Ok(CallOutput::Amount(returned))
}

// ========================================================================
// Premiums
// ========================================================================

fn pay_tranch_premium(
    ctx: &mut CallContext<'_>,
    policy: Address,
    tranch_index: usize,
    amount: Amount,
) -> Result<CallOutput> {
    ctx.require_role(roles::entity_rep(), MUST_BE_ENTITY_REP)?;
    ensure_positive(amount)?;
    let (this, caller) = (ctx.this(), ctx.caller());
    let (storage, world) = ctx.split();
    let unit = world
        .policies
        .get(&policy)
        .map(|p| p.info.unit)
        .ok_or_else(|| KeystoneError::PolicyNotFound(policy.to_string()))?;

    storage.ledger.debit(unit, amount)?;
    collect_premium(world, this, policy, tranch_index, amount)?;

    info!(
        entity = %this,
        policy = %policy,
        tranch = tranch_index,
        amount = %amount,
        "Premium paid"
    );
    ctx.emit(EntityEvent::PremiumPaid {
        caller,
        policy,
        tranch_index,
        unit,
        amount,
    });
    Ok(CallOutput::Unit)
}
