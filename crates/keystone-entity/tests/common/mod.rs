//! Shared fixture for entity integration tests.

#![allow(dead_code)]

use keystone_entity::{CallContext, CallOutput, Chain, EntityCall, EntityClient, Facet};
use keystone_types::{
    Address, Amount, Asset, ContextId, KeystoneError, Result, Selector, constants, roles,
};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

pub fn dec(n: i64) -> Decimal {
    Decimal::new(n, 0)
}

/// Install a test subscriber once; `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn account(i: usize) -> Address {
    Address::from_label(&format!("account-{i}"))
}

/// A host with one entity.
///
/// - `accounts[0]`: system admin, deployer of the entity
/// - `accounts[1]`: entity admin
/// - `accounts[2]`: entity rep (trader)
pub struct Fixture {
    pub chain: Chain,
    pub accounts: Vec<Address>,
    pub entity: Address,
    pub ether: Asset,
    pub ether2: Asset,
}

impl Fixture {
    pub fn new() -> Self {
        let chain = Chain::with_defaults(account(0));
        Self::with_chain(chain)
    }

    pub fn with_chain(mut chain: Chain) -> Self {
        init_tracing();
        let accounts: Vec<Address> = (0..10).map(account).collect();
        let entity = chain
            .create_entity(accounts[0], accounts[1], None)
            .expect("create entity");
        let context = chain.context_of(entity).expect("entity context");
        chain
            .assign_role(accounts[1], context, accounts[2], roles::entity_rep())
            .expect("assign rep");
        let ether = chain.native_token();
        Self {
            chain,
            accounts,
            entity,
            ether,
            ether2: Address::from_label("ETHER2"),
        }
    }

    pub fn system_admin(&self) -> Address {
        self.accounts[0]
    }

    pub fn admin(&self) -> Address {
        self.accounts[1]
    }

    pub fn rep(&self) -> Address {
        self.accounts[2]
    }

    pub fn context(&self) -> ContextId {
        self.chain.context_of(self.entity).expect("entity context")
    }

    pub fn client(&mut self) -> EntityClient<'_> {
        self.chain.client(self.entity)
    }

    pub fn mint(&mut self, asset: Asset, to: Address, amount: Amount) {
        self.chain.mint(asset, to, amount).expect("mint");
    }

    /// Mint to `from`, approve the entity and deposit.
    pub fn deposit(&mut self, from: Address, asset: Asset, amount: Amount) {
        self.mint(asset, from, amount);
        self.chain.approve(asset, from, self.entity, amount);
        self.client()
            .deposit(from, asset, amount)
            .expect("deposit");
    }

    /// Mint to `maker` and rest an offer selling `sell_amount` of `sell` for `buy_amount` of `buy`.
    pub fn rest_offer(
        &mut self,
        maker: Address,
        sell: Asset,
        sell_amount: Amount,
        buy: Asset,
        buy_amount: Amount,
    ) -> keystone_types::OfferId {
        self.mint(sell, maker, sell_amount);
        let venue = self.chain.venue_address();
        self.chain.approve(sell, maker, venue, sell_amount);
        self.chain
            .place_offer(maker, sell, sell_amount, buy, buy_amount)
            .expect("place offer")
            .offer_id
            .expect("offer rests")
    }

    pub fn explicit(&self, asset: Asset) -> Amount {
        self.chain.explicit_balance(self.entity, asset)
    }

    pub fn custodial(&self, asset: Asset) -> Amount {
        self.chain.balance_of(asset, self.entity)
    }
}

pub fn requirement(err: &KeystoneError) -> Option<&str> {
    match err {
        KeystoneError::AuthorizationFailure { requirement } => Some(requirement),
        _ => None,
    }
}

// ============================================================================
// Test modules
// ============================================================================

pub const DUMMY_SIGNATURE: &str = "dummyNumPolicies()";

/// Adds one new operation that always reports 666 policies.
#[derive(Debug)]
pub struct DummyEntityFacet;

impl Facet for DummyEntityFacet {
    fn name(&self) -> &'static str {
        "dummy-entity"
    }

    fn selectors(&self) -> Vec<Selector> {
        vec![Selector::of(DUMMY_SIGNATURE)]
    }

    fn execute(&self, _ctx: &mut CallContext<'_>, call: &EntityCall) -> Result<CallOutput> {
        match call {
            EntityCall::Extension { signature, .. } if signature == DUMMY_SIGNATURE => {
                Ok(CallOutput::Count(666))
            }
            other => Err(CallContext::unsupported(other)),
        }
    }
}

/// Tries to take over `getNumPolicies()` from the core module. Registration
/// is add-only, so the upgrade must fail.
#[derive(Debug)]
pub struct OverridingFacet;

impl Facet for OverridingFacet {
    fn name(&self) -> &'static str {
        "overriding"
    }

    fn selectors(&self) -> Vec<Selector> {
        vec![EntityCall::GetNumPolicies.selector()]
    }

    fn execute(&self, _ctx: &mut CallContext<'_>, _call: &EntityCall) -> Result<CallOutput> {
        Ok(CallOutput::Count(666))
    }
}

pub const REENTER_SIGNATURE: &str = "reenter()";
pub const SWEEP_SIGNATURE: &str = "sweep()";

/// Calls back into its own entity from inside a call.
///
/// - `reenter()` makes an external call to the entity it runs on.
/// - `sweep()` holds the ledger guard and self-calls `withdraw`.
#[derive(Debug)]
pub struct ReentrantFacet;

impl Facet for ReentrantFacet {
    fn name(&self) -> &'static str {
        "reentrant"
    }

    fn selectors(&self) -> Vec<Selector> {
        vec![
            Selector::of(REENTER_SIGNATURE),
            Selector::of(SWEEP_SIGNATURE),
        ]
    }

    fn execute(&self, ctx: &mut CallContext<'_>, call: &EntityCall) -> Result<CallOutput> {
        let EntityCall::Extension { signature, .. } = call else {
            return Err(CallContext::unsupported(call));
        };
        match signature.as_str() {
            REENTER_SIGNATURE => {
                let this = ctx.this();
                ctx.call_contract(this, &EntityCall::GetNumPolicies)
            }
            SWEEP_SIGNATURE => {
                ctx.storage_mut().guard.enter("sweep")?;
                let result = ctx.self_call(&EntityCall::Withdraw {
                    unit: Address::from_label(constants::NATIVE_ASSET_LABEL),
                    amount: Decimal::ONE,
                });
                ctx.storage_mut().guard.exit();
                result
            }
            _ => Err(CallContext::unsupported(call)),
        }
    }
}
