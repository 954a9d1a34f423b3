//! Integration test: entity ledger and policies
//!
//! Deposit → withdraw, inert direct transfers, trading through the venue,
//! best-price sales, policy creation and tranche premiums.

mod common;

use chrono::{Duration, Utc};
use common::{Fixture, dec, requirement};
use keystone_entity::Chain;
use keystone_types::{
    Address, ChainConfig, ContextId, EmptyBookPolicy, EntityEvent, KeystoneError, PolicyConfig,
    RoleStatus, TranchConfig, constants, roles,
};
use rust_decimal::Decimal;

// ═══════════════════════════════════════════════════════════════════
// Deposit / withdraw
// ═══════════════════════════════════════════════════════════════════

#[test]
fn deposit_then_withdraw() {
    let mut fx = Fixture::new();
    let (ether, entity, admin) = (fx.ether, fx.entity, fx.admin());
    let depositor = fx.accounts[5];
    fx.mint(ether, depositor, dec(10));
    fx.chain.approve(ether, depositor, entity, dec(10));

    // Allowance is checked before the balance.
    let err = fx.client().deposit(depositor, ether, dec(11)).unwrap_err();
    assert!(matches!(err, KeystoneError::AllowanceExceeded { .. }), "{err}");
    assert!(format!("{err}").contains("amount exceeds allowance"));

    fx.client().deposit(depositor, ether, dec(10)).unwrap();
    assert_eq!(fx.explicit(ether), dec(10));
    assert_eq!(fx.custodial(ether), dec(10));
    assert_eq!(fx.client().balance(ether).unwrap(), dec(10));
    assert_eq!(
        fx.chain.events().last().unwrap().event,
        EntityEvent::EntityDeposit {
            caller: depositor,
            unit: ether,
            amount: dec(10),
        }
    );

    let err = fx.client().withdraw(depositor, ether, dec(10)).unwrap_err();
    assert_eq!(requirement(&err), Some("must be entity admin"));

    let err = fx.client().withdraw(admin, ether, dec(11)).unwrap_err();
    assert!(matches!(err, KeystoneError::ExceedsExplicitBalance { .. }));
    assert!(format!("{err}").contains("exceeds entity balance"));

    fx.client().withdraw(admin, ether, dec(10)).unwrap();
    assert_eq!(fx.explicit(ether), dec(0));
    assert_eq!(fx.custodial(ether), dec(0));
    assert_eq!(fx.chain.balance_of(ether, admin), dec(10));
    assert_eq!(
        fx.chain.events().last().unwrap().event,
        EntityEvent::EntityWithdraw {
            caller: admin,
            unit: ether,
            amount: dec(10),
        }
    );
}

#[test]
fn failed_deposit_leaves_no_trace() {
    let mut fx = Fixture::new();
    let (ether, entity) = (fx.ether, fx.entity);
    let depositor = fx.accounts[5];
    fx.mint(ether, depositor, dec(5));
    fx.chain.approve(ether, depositor, entity, dec(10));
    let events = fx.chain.events().len();

    let err = fx.client().deposit(depositor, ether, dec(10)).unwrap_err();
    assert!(matches!(err, KeystoneError::InsufficientFunds { .. }));
    assert_eq!(fx.chain.events().len(), events);
    assert_eq!(fx.chain.balance_of(ether, depositor), dec(5));
    assert_eq!(fx.chain.allowance(ether, depositor, entity), dec(10));
    assert_eq!(fx.explicit(ether), dec(0));
}

#[test]
fn direct_transfer_stays_inert() {
    let mut fx = Fixture::new();
    let (ether, ether2, entity, admin, rep) = (fx.ether, fx.ether2, fx.entity, fx.admin(), fx.rep());
    let depositor = fx.accounts[5];
    fx.deposit(depositor, ether, dec(10));

    fx.mint(ether, depositor, dec(100));
    fx.chain.transfer(ether, depositor, entity, dec(100)).unwrap();

    let holding = fx.chain.holding(entity, ether).unwrap();
    assert_eq!(holding.explicit, dec(10));
    assert_eq!(holding.custodial, dec(110));
    assert_eq!(holding.inert(), dec(100));

    let err = fx.client().withdraw(admin, ether, dec(11)).unwrap_err();
    assert!(matches!(err, KeystoneError::ExceedsExplicitBalance { .. }));
    let err = fx
        .client()
        .trade(rep, ether, dec(11), ether2, dec(1))
        .unwrap_err();
    assert!(matches!(err, KeystoneError::ExceedsExplicitBalance { .. }));
    let err = fx
        .client()
        .sell_at_best_price(rep, ether, dec(11), ether2)
        .unwrap_err();
    assert!(matches!(err, KeystoneError::ExceedsExplicitBalance { .. }));

    fx.client().withdraw(admin, ether, dec(10)).unwrap();
    assert_eq!(fx.custodial(ether), dec(100));
    assert_eq!(fx.explicit(ether), dec(0));
}

// ═══════════════════════════════════════════════════════════════════
// Trade
// ═══════════════════════════════════════════════════════════════════

#[test]
fn trade_requires_trader() {
    let mut fx = Fixture::new();
    let (ether, ether2, admin) = (fx.ether, fx.ether2, fx.admin());
    fx.deposit(admin, ether, dec(10));
    let err = fx
        .client()
        .trade(admin, ether, dec(1), ether2, dec(1))
        .unwrap_err();
    assert_eq!(requirement(&err), Some("must be trader"));
}

#[test]
fn resting_trade_is_filled_by_third_party() {
    let mut fx = Fixture::new();
    let (ether, ether2, entity, rep) = (fx.ether, fx.ether2, fx.entity, fx.rep());
    let taker = fx.accounts[3];
    fx.deposit(fx.accounts[5], ether, dec(10));

    let outcome = fx.client().trade(rep, ether, dec(1), ether2, dec(1)).unwrap();
    let offer_id = outcome.offer_id.expect("nothing to match against");
    assert_eq!(outcome.resting, dec(1));
    assert_eq!(outcome.received, dec(0));
    assert_eq!(fx.explicit(ether), dec(9));
    assert_eq!(fx.chain.balance_of(ether, fx.chain.venue_address()), dec(1));

    // Taker buys the whole offer straight from the venue.
    fx.mint(ether2, taker, dec(1));
    let venue = fx.chain.venue_address();
    fx.chain.approve(ether2, taker, venue, dec(1));
    let paid = fx.chain.buy_offer(taker, offer_id, dec(1)).unwrap();
    assert_eq!(paid, dec(1));
    assert_eq!(fx.chain.balance_of(ether, taker), dec(1));

    // Proceeds reached custody but are not credited yet.
    assert_eq!(fx.custodial(ether2), dec(1));
    assert_eq!(fx.explicit(ether2), dec(0));

    assert_eq!(fx.client().claim_trade_proceeds(rep, offer_id).unwrap(), dec(1));
    assert_eq!(fx.explicit(ether2), dec(1));
    assert!(fx.chain.entity(entity).unwrap().open_trades.is_empty());

    let err = fx.client().claim_trade_proceeds(rep, offer_id).unwrap_err();
    assert!(matches!(err, KeystoneError::OfferNotFound(_)));
}

#[test]
fn trade_matches_resting_counter_offer() {
    let mut fx = Fixture::new();
    let (ether, ether2, rep) = (fx.ether, fx.ether2, fx.rep());
    let maker = fx.accounts[7];
    fx.deposit(fx.accounts[5], ether, dec(10));
    fx.rest_offer(maker, ether2, dec(100), ether, dec(3));

    let outcome = fx.client().trade(rep, ether, dec(3), ether2, dec(90)).unwrap();
    assert_eq!(outcome.offer_id, None);
    assert_eq!(outcome.sold, dec(3));
    assert_eq!(outcome.received, dec(100));
    assert_eq!(fx.explicit(ether), dec(7));
    assert_eq!(fx.explicit(ether2), dec(100));
    assert_eq!(fx.chain.balance_of(ether, maker), dec(3));
    assert!(matches!(
        fx.chain.events().last().unwrap().event,
        EntityEvent::TradePlaced { offer_id: None, .. }
    ));
}

#[test]
fn cancel_trade_returns_escrow_and_proceeds() {
    let mut fx = Fixture::new();
    let (ether, ether2, rep) = (fx.ether, fx.ether2, fx.rep());
    let taker = fx.accounts[3];
    fx.deposit(fx.accounts[5], ether, dec(10));

    let offer_id = fx
        .client()
        .trade(rep, ether, dec(4), ether2, dec(8))
        .unwrap()
        .offer_id
        .unwrap();

    // Half filled: 4 ether2 buys 2 ether.
    fx.mint(ether2, taker, dec(4));
    let venue = fx.chain.venue_address();
    fx.chain.approve(ether2, taker, venue, dec(4));
    assert_eq!(fx.chain.fill_offer(taker, offer_id, dec(4)).unwrap(), dec(2));

    let admin = fx.admin();
    let err = fx.client().cancel_trade(admin, offer_id).unwrap_err();
    assert_eq!(requirement(&err), Some("must be trader"));

    assert_eq!(fx.client().cancel_trade(rep, offer_id).unwrap(), dec(2));
    assert_eq!(fx.explicit(ether), dec(8));
    assert_eq!(fx.explicit(ether2), dec(4));
    assert_eq!(fx.custodial(ether), dec(8));
    assert!(!fx.chain.offer(offer_id).unwrap().is_open());
    assert!(matches!(
        fx.chain.events().last().unwrap().event,
        EntityEvent::TradeCancelled { .. }
    ));
}

#[test]
fn overflowing_trade_fails_cleanly() {
    let mut fx = Fixture::new();
    let (ether, ether2, rep) = (fx.ether, fx.ether2, fx.rep());
    let whale = Decimal::from(10_i128.pow(20));
    fx.deposit(fx.accounts[5], ether, whale);
    let lot = Decimal::from(10_i64.pow(10));
    let counter = fx.rest_offer(fx.accounts[7], ether2, lot, ether, dec(5));
    let events = fx.chain.events().len();

    let err = fx.client().trade(rep, ether, whale, ether2, dec(1)).unwrap_err();
    assert!(matches!(err, KeystoneError::AmountOverflow { .. }), "{err}");
    assert_eq!(fx.explicit(ether), whale);
    assert_eq!(fx.custodial(ether), whale);
    assert_eq!(fx.explicit(ether2), dec(0));
    let offer = fx.chain.offer(counter).unwrap();
    assert!(offer.is_open());
    assert_eq!(offer.sell_amount, lot);
    assert_eq!(fx.chain.events().len(), events);
}

// ═══════════════════════════════════════════════════════════════════
// Sell at best price
// ═══════════════════════════════════════════════════════════════════

#[test]
fn sell_at_best_price_walks_the_book() {
    let mut fx = Fixture::new();
    let (ether, ether2, admin, rep) = (fx.ether, fx.ether2, fx.admin(), fx.rep());
    let (maker_a, maker_b) = (fx.accounts[7], fx.accounts[8]);
    fx.deposit(fx.accounts[5], ether, dec(10));

    let first = fx.rest_offer(maker_a, ether2, dec(100), ether, dec(3));
    let second = fx.rest_offer(maker_b, ether2, dec(50), ether, dec(5));
    assert_eq!(fx.chain.best_offer(ether2, ether).unwrap().id, first);

    let err = fx
        .client()
        .sell_at_best_price(admin, ether, dec(5), ether2)
        .unwrap_err();
    assert_eq!(requirement(&err), Some("must be trader"));

    let err = fx
        .client()
        .sell_at_best_price(rep, ether, dec(11), ether2)
        .unwrap_err();
    assert!(format!("{err}").contains("exceeds entity balance"));

    let sale = fx
        .client()
        .sell_at_best_price(rep, ether, dec(5), ether2)
        .unwrap();
    assert_eq!(sale.sold, dec(5));
    assert_eq!(sale.received, dec(120));
    assert_eq!(sale.unsold, dec(0));
    assert_eq!(sale.fills, 2);

    assert_eq!(fx.explicit(ether), dec(5));
    assert_eq!(fx.explicit(ether2), dec(120));
    assert_eq!(fx.custodial(ether2), dec(120));
    assert_eq!(fx.chain.balance_of(ether, maker_a), dec(3));
    assert_eq!(fx.chain.balance_of(ether, maker_b), dec(2));

    assert!(!fx.chain.offer(first).unwrap().is_open());
    let rest = fx.chain.offer(second).unwrap();
    assert_eq!(rest.sell_amount, dec(30));
    assert_eq!(rest.buy_amount, dec(3));
}

#[test]
fn sell_at_best_price_returns_unsold_remainder() {
    let mut fx = Fixture::new();
    let (ether, ether2, rep) = (fx.ether, fx.ether2, fx.rep());
    fx.deposit(fx.accounts[5], ether, dec(10));
    fx.rest_offer(fx.accounts[7], ether2, dec(100), ether, dec(3));

    let sale = fx
        .client()
        .sell_at_best_price(rep, ether, dec(5), ether2)
        .unwrap();
    assert_eq!(sale.sold, dec(3));
    assert_eq!(sale.unsold, dec(2));
    assert_eq!(sale.received, dec(100));
    assert_eq!(fx.explicit(ether), dec(7));
    assert_eq!(fx.custodial(ether), dec(7));
}

#[test]
fn empty_book_is_a_no_op_by_default() {
    let mut fx = Fixture::new();
    let (ether, ether2, rep) = (fx.ether, fx.ether2, fx.rep());
    fx.deposit(fx.accounts[5], ether, dec(10));

    let sale = fx
        .client()
        .sell_at_best_price(rep, ether, dec(5), ether2)
        .unwrap();
    assert_eq!(sale.sold, dec(0));
    assert_eq!(sale.unsold, dec(5));
    assert_eq!(sale.fills, 0);
    assert_eq!(fx.explicit(ether), dec(10));
}

#[test]
fn empty_book_can_be_configured_to_fail() {
    let mut config = ChainConfig::default();
    config.ledger.empty_book = EmptyBookPolicy::Fail;
    let chain = Chain::new(config, common::account(0)).unwrap();
    let mut fx = Fixture::with_chain(chain);
    let (ether, ether2, rep) = (fx.ether, fx.ether2, fx.rep());
    fx.deposit(fx.accounts[5], ether, dec(10));

    let err = fx
        .client()
        .sell_at_best_price(rep, ether, dec(5), ether2)
        .unwrap_err();
    assert!(matches!(err, KeystoneError::NoOffers { .. }));
    assert_eq!(fx.explicit(ether), dec(10));
}

#[test]
fn sale_never_fills_own_resting_trade() {
    let mut fx = Fixture::new();
    let (ether, ether2, rep, entity) = (fx.ether, fx.ether2, fx.rep(), fx.entity);
    let stranger = fx.accounts[6];
    fx.deposit(fx.accounts[5], ether, dec(10));
    fx.deposit(fx.accounts[5], ether2, dec(10));

    let own = fx
        .client()
        .trade(rep, ether2, dec(10), ether, dec(10))
        .unwrap()
        .offer_id
        .unwrap();
    fx.mint(ether, stranger, dec(5));
    fx.chain.transfer(ether, stranger, entity, dec(5)).unwrap();

    let sale = fx
        .client()
        .sell_at_best_price(rep, ether, dec(5), ether2)
        .unwrap();
    assert_eq!(sale.sold, dec(0));
    assert_eq!(sale.unsold, dec(5));
    assert_eq!(sale.fills, 0);

    assert_eq!(fx.client().claim_trade_proceeds(rep, own).unwrap(), dec(0));
    assert_eq!(fx.explicit(ether), dec(10));
    assert_eq!(fx.chain.holding(entity, ether).unwrap().inert(), dec(5));
    assert_eq!(fx.chain.offer(own).unwrap().sell_amount, dec(10));
}

// ═══════════════════════════════════════════════════════════════════
// Policies
// ═══════════════════════════════════════════════════════════════════

fn dated_config() -> PolicyConfig {
    let now = Utc::now();
    PolicyConfig::default().with_dates(
        now + Duration::seconds(100),
        now + Duration::seconds(200),
        now + Duration::seconds(300),
    )
}

#[test]
fn anyone_can_create_a_policy() {
    let mut fx = Fixture::new();
    let (entity, creator) = (fx.entity, fx.accounts[5]);
    let config = dated_config();

    assert_eq!(fx.client().num_policies().unwrap(), 0);
    let policy = fx.client().create_policy(creator, config.clone()).unwrap();
    assert_eq!(fx.client().num_policies().unwrap(), 1);
    assert_eq!(fx.client().policy(0).unwrap(), policy);
    assert!(matches!(
        fx.client().policy(1).unwrap_err(),
        KeystoneError::PolicyNotFound(_)
    ));

    let record = fx.chain.policy(policy).unwrap();
    assert_eq!(record.info.entity, entity);
    assert_eq!(record.info.underwriter, entity);
    assert_eq!(Some(record.info.start_date), config.start_date);
    assert_eq!(record.info.unit, fx.chain.native_token());

    let policy_context = fx.chain.context_of(policy).unwrap();
    assert_ne!(policy_context, fx.context());
    assert_eq!(
        fx.chain
            .has_role(policy_context, creator, roles::policy_owner()),
        RoleStatus::HasRoleContext
    );
    assert_eq!(
        fx.chain.events().last().unwrap().event,
        EntityEvent::NewPolicy {
            policy,
            entity,
            deployer: creator,
        }
    );
}

#[test]
fn policy_defaults_fill_in() {
    let mut fx = Fixture::new();
    let creator = fx.accounts[5];
    let policy = fx
        .client()
        .create_policy(creator, PolicyConfig::default())
        .unwrap();
    let info = &fx.chain.policy(policy).unwrap().info;
    assert_eq!(
        info.maturation_date - info.start_date,
        Duration::days(constants::DEFAULT_POLICY_TERM_DAYS)
    );
    assert!(info.initiation_date <= info.start_date);
}

#[test]
fn policy_dates_must_be_ordered() {
    let mut fx = Fixture::new();
    let now = Utc::now();
    let config =
        PolicyConfig::default().with_dates(now, now + Duration::days(2), now + Duration::days(1));
    let creator = fx.accounts[5];
    let err = fx
        .client()
        .create_policy(creator, config)
        .unwrap_err();
    assert!(matches!(err, KeystoneError::InvalidPolicyConfig { .. }));
    assert_eq!(fx.client().num_policies().unwrap(), 0);
}

#[test]
fn underwriter_context_must_match() {
    let mut fx = Fixture::new();
    let (system_admin, admin, creator) = (fx.system_admin(), fx.admin(), fx.accounts[5]);
    let context = fx.context();

    let outsider = fx.chain.create_entity(system_admin, admin, None).unwrap();
    let err = fx
        .client()
        .create_policy(creator, dated_config().with_underwriter(outsider))
        .unwrap_err();
    assert!(matches!(err, KeystoneError::UnderwriterContextMismatch { .. }));
    assert!(format!("{err}").contains("underwriter ACL context must match"));

    let sibling = fx
        .chain
        .create_entity(system_admin, admin, Some(context))
        .unwrap();
    let policy = fx
        .client()
        .create_policy(creator, dated_config().with_underwriter(sibling))
        .unwrap();
    assert_eq!(fx.chain.policy(policy).unwrap().info.underwriter, sibling);
}

// ═══════════════════════════════════════════════════════════════════
// Tranche premiums
// ═══════════════════════════════════════════════════════════════════

fn policy_with_tranch(fx: &mut Fixture) -> keystone_types::Address {
    let owner = fx.accounts[5];
    let policy = fx.client().create_policy(owner, dated_config()).unwrap();
    let tranch = TranchConfig {
        num_shares: 100,
        price_per_share_amount: dec(2),
        premiums: vec![dec(10), dec(20)],
    };
    let err = fx
        .chain
        .create_tranch(fx.accounts[6], policy, tranch.clone())
        .unwrap_err();
    assert_eq!(requirement(&err), Some("must be policy owner"));
    assert_eq!(fx.chain.create_tranch(owner, policy, tranch).unwrap(), 0);
    policy
}

#[test]
fn premium_requires_entity_rep() {
    let mut fx = Fixture::new();
    let policy = policy_with_tranch(&mut fx);
    let admin = fx.admin();
    fx.deposit(fx.accounts[5], fx.ether, dec(50));

    let err = fx
        .client()
        .pay_tranch_premium(admin, policy, 0, dec(10))
        .unwrap_err();
    assert_eq!(requirement(&err), Some("must be entity rep"));
}

#[test]
fn premium_is_paid_from_explicit_balance_only() {
    let mut fx = Fixture::new();
    let policy = policy_with_tranch(&mut fx);
    let (ether, entity, rep) = (fx.ether, fx.entity, fx.rep());

    let err = fx
        .client()
        .pay_tranch_premium(rep, policy, 0, dec(10))
        .unwrap_err();
    assert!(format!("{err}").contains("exceeds entity balance"));

    // A direct transfer does not count.
    let sender = fx.accounts[6];
    fx.mint(ether, sender, dec(100));
    fx.chain.transfer(ether, sender, entity, dec(100)).unwrap();
    let err = fx
        .client()
        .pay_tranch_premium(rep, policy, 0, dec(10))
        .unwrap_err();
    assert!(matches!(err, KeystoneError::ExceedsExplicitBalance { .. }));

    fx.deposit(fx.accounts[5], ether, dec(50));
    fx.client().pay_tranch_premium(rep, policy, 0, dec(10)).unwrap();
    assert_eq!(fx.explicit(ether), dec(40));
    assert_eq!(fx.chain.balance_of(ether, policy), dec(10));
    assert_eq!(fx.chain.policy(policy).unwrap().tranches[0].premiums_paid, 1);
    assert!(matches!(
        fx.chain.events().last().unwrap().event,
        EntityEvent::PremiumPaid { tranch_index: 0, .. }
    ));

    // Wrong amount for the next premium reverts the debit.
    let err = fx
        .client()
        .pay_tranch_premium(rep, policy, 0, dec(15))
        .unwrap_err();
    assert!(matches!(err, KeystoneError::InvalidPremium { .. }));
    assert_eq!(fx.explicit(ether), dec(40));

    fx.client().pay_tranch_premium(rep, policy, 0, dec(20)).unwrap();
    assert_eq!(fx.explicit(ether), dec(20));
    assert_eq!(fx.chain.policy(policy).unwrap().tranches[0].total_paid(), dec(30));

    let err = fx
        .client()
        .pay_tranch_premium(rep, policy, 3, dec(10))
        .unwrap_err();
    assert!(matches!(err, KeystoneError::TranchNotFound { index: 3, .. }));
}

// ═══════════════════════════════════════════════════════════════════
// Contexts
// ═══════════════════════════════════════════════════════════════════

#[test]
fn stranger_cannot_claim_unused_context() {
    let mut fx = Fixture::new();
    let (system_admin, admin) = (fx.system_admin(), fx.admin());
    let stranger = fx.accounts[6];
    let target = ContextId::of(Address::from_label("not-yet-deployed"));

    let err = fx
        .chain
        .assign_role(stranger, target, stranger, roles::entity_admin())
        .unwrap_err();
    assert_eq!(requirement(&err), Some("must be context admin"));
    assert_eq!(
        fx.chain.has_role(target, stranger, roles::entity_admin()),
        RoleStatus::DoesNotHaveRole
    );

    // A context named after the caller is the caller's to claim.
    fx.chain
        .assign_role(stranger, ContextId::of(stranger), stranger, roles::entity_admin())
        .unwrap();

    // Fresh entities and policies still claim their own contexts.
    let entity = fx.chain.create_entity(system_admin, admin, None).unwrap();
    let context = fx.chain.context_of(entity).unwrap();
    assert_eq!(context, ContextId::of(entity));
    assert!(matches!(
        fx.chain.events().last().unwrap().event,
        EntityEvent::RoleAssigned { assigner, .. } if assigner == entity
    ));
    let policy = fx
        .client()
        .create_policy(stranger, PolicyConfig::default())
        .unwrap();
    assert_eq!(
        fx.chain.has_role(ContextId::of(policy), stranger, roles::policy_owner()),
        RoleStatus::HasRoleContext
    );
}
