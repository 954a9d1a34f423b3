//! In-memory execution host.
//!
//! [`Chain`] owns every piece of state an entity can touch: the role
//! registry, asset custody, the venue, deployed modules, entities and
//! policies. Each top-level call runs against a snapshot; on error the whole
//! host is restored, events included.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use keystone_ledger::TokenBook;
use keystone_types::{
    Address, Amount, Asset, CallId, ChainConfig, ContextId, Custody, EntityEvent, EventLog,
    Holding, KeystoneError, Offer, OfferId, Result, RoleId, RoleStatus, TradeOutcome,
    TranchConfig, Venue, constants, roles,
};
use keystone_venue::OfferMarket;
use tracing::{info, warn};

use crate::acl::Acl;
use crate::call::{CallOutput, EntityCall};
use crate::client::EntityClient;
use crate::diamond::{self, install_modules};
use crate::facet::Facet;
use crate::facets::{
    DiamondUpgradeFacet, EntityCoreFacet, EntityFundsFacet, FreezeUpgradesFacet,
};
use crate::policy::Policy;
use crate::storage::EntityStorage;

/// Modules deployed with the host. All but `freeze` are installed on every entity.
#[derive(Debug, Clone, Copy)]
struct Genesis {
    delegate: Address,
    core: Address,
    funds: Address,
    freeze: Address,
}

/// Host state. Cloned as a whole to snapshot a call.
#[derive(Debug, Clone)]
pub struct World {
    pub(crate) config: ChainConfig,
    pub(crate) acl: Acl,
    pub(crate) tokens: TokenBook,
    pub(crate) venue: OfferMarket,
    pub(crate) policies: HashMap<Address, Policy>,
    pub(crate) native: Asset,
    modules: HashMap<Address, Arc<dyn Facet>>,
    contexts: HashMap<Address, ContextId>,
    entities: HashMap<Address, EntityStorage>,
    /// Entities whose storage is checked out by a running call.
    in_flight: HashSet<Address>,
    events: EventLog,
    nonce: u64,
    system_admin: Address,
    acl_address: Address,
    genesis: Genesis,
}

impl World {
    fn new(config: ChainConfig, system_admin: Address) -> Self {
        let host = Address::from_label("keystone:host");
        let venue = OfferMarket::new(Address::from_label("keystone:venue"), config.venue.clone());
        let mut world = Self {
            acl: Acl::new(&config.acl, system_admin),
            config,
            tokens: TokenBook::new(),
            venue,
            policies: HashMap::new(),
            native: Address::from_label(constants::NATIVE_ASSET_LABEL),
            modules: HashMap::new(),
            contexts: HashMap::new(),
            entities: HashMap::new(),
            in_flight: HashSet::new(),
            events: EventLog::new(),
            nonce: 0,
            system_admin,
            acl_address: Address::from_label("keystone:acl"),
            genesis: Genesis {
                delegate: Address::ZERO,
                core: Address::ZERO,
                funds: Address::ZERO,
                freeze: Address::ZERO,
            },
        };
        world.genesis = Genesis {
            delegate: world.deploy(host, Arc::new(DiamondUpgradeFacet)),
            core: world.deploy(host, Arc::new(EntityCoreFacet)),
            funds: world.deploy(host, Arc::new(EntityFundsFacet)),
            freeze: world.deploy(host, Arc::new(FreezeUpgradesFacet)),
        };
        world
    }

    /// Fresh contract address for `deployer`.
    pub(crate) fn next_address(&mut self, deployer: Address) -> Address {
        self.nonce += 1;
        Address::derive(deployer, self.nonce)
    }

    fn deploy(&mut self, deployer: Address, facet: Arc<dyn Facet>) -> Address {
        let address = self.next_address(deployer);
        info!(module = facet.name(), address = %address, "Module deployed");
        self.modules.insert(address, facet);
        address
    }

    pub(crate) fn facet(&self, address: Address) -> Result<Arc<dyn Facet>> {
        self.modules
            .get(&address)
            .cloned()
            .ok_or(KeystoneError::UnknownModule(address))
    }

    pub(crate) fn context_of(&self, address: Address) -> Option<ContextId> {
        self.contexts.get(&address).copied()
    }

    pub(crate) fn register_policy(&mut self, policy: Policy) {
        self.contexts.insert(policy.address, policy.context);
        self.policies.insert(policy.address, policy);
    }

    pub(crate) fn emit(&mut self, call_id: CallId, emitter: Address, event: EntityEvent) {
        self.events.emit(call_id, emitter, event);
    }

    /// Dispatch `call` on the entity at `target`.
    ///
    /// The entity's storage is checked out for the duration of the call, so a
    /// nested call into the same entity fails with `Reentrancy`.
    pub(crate) fn call_entity(
        &mut self,
        call_id: CallId,
        target: Address,
        caller: Address,
        call: &EntityCall,
    ) -> Result<CallOutput> {
        if self.in_flight.contains(&target) {
            return Err(KeystoneError::Reentrancy {
                operation: call.signature().to_string(),
                held_by: format!("call into {target}"),
            });
        }
        let mut storage = self
            .entities
            .remove(&target)
            .ok_or(KeystoneError::UnknownContract(target))?;
        self.in_flight.insert(target);
        let result = diamond::dispatch(&mut storage, self, call_id, target, caller, call);
        self.in_flight.remove(&target);
        self.entities.insert(target, storage);
        result
    }

    fn create_entity(
        &mut self,
        call_id: CallId,
        deployer: Address,
        admin: Address,
        context: Option<ContextId>,
    ) -> Result<Address> {
        let address = self.next_address(deployer);
        // A fresh entity claims its own context; joining a shared one takes
        // the deployer's admin rights there.
        let (context, assigner) = match context {
            Some(shared) => (shared, deployer),
            None => (ContextId::of(address), address),
        };
        let mut storage = EntityStorage::new(context, self.genesis.delegate);
        install_modules(
            &mut storage.diamond,
            self,
            &[self.genesis.delegate, self.genesis.core, self.genesis.funds],
        )?;

        self.acl
            .assign_role(assigner, context, admin, roles::entity_admin())?;
        self.emit(
            call_id,
            self.acl_address,
            EntityEvent::RoleAssigned {
                context,
                principal: admin,
                role: roles::entity_admin(),
                assigner,
            },
        );
        self.contexts.insert(address, context);
        self.entities.insert(address, storage);
        info!(
            entity = %address,
            context = %context,
            admin = %admin,
            deployer = %deployer,
            "Entity created"
        );
        Ok(address)
    }
}

/// The host every test and client drives.
#[derive(Debug, Clone)]
pub struct Chain {
    world: World,
}

impl Chain {
    pub fn new(config: ChainConfig, system_admin: Address) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            world: World::new(config, system_admin),
        })
    }

    /// Host with the default configuration.
    #[must_use]
    pub fn with_defaults(system_admin: Address) -> Self {
        Self {
            world: World::new(ChainConfig::default(), system_admin),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ChainConfig {
        &self.world.config
    }

    /// Run `f` as one atomic call.
    fn transact<T>(&mut self, f: impl FnOnce(&mut World, CallId) -> Result<T>) -> Result<T> {
        let snapshot = self.world.clone();
        let call_id = CallId::new();
        match f(&mut self.world, call_id) {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!(call = %call_id, error = %err, "Call reverted");
                self.world = snapshot;
                Err(err)
            }
        }
    }

    // ====================================================================
    // Entities and modules
    // ====================================================================

    /// Call an entity operation as `caller`.
    pub fn call(&mut self, entity: Address, caller: Address, call: EntityCall) -> Result<CallOutput> {
        self.transact(|world, call_id| world.call_entity(call_id, entity, caller, &call))
    }

    /// Deploy an entity with the genesis modules and `admin` as entity admin.
    ///
    /// With `context` the entity joins an existing ACL context, which
    /// `deployer` must administer if it is already claimed.
    pub fn create_entity(
        &mut self,
        deployer: Address,
        admin: Address,
        context: Option<ContextId>,
    ) -> Result<Address> {
        self.transact(|world, call_id| world.create_entity(call_id, deployer, admin, context))
    }

    /// Deploy module code; it can then be passed to `upgrade`.
    pub fn deploy_module(&mut self, facet: Arc<dyn Facet>) -> Address {
        let deployer = self.world.system_admin;
        self.world.deploy(deployer, facet)
    }

    #[must_use]
    pub fn client(&mut self, entity: Address) -> EntityClient<'_> {
        EntityClient::new(self, entity)
    }

    #[must_use]
    pub fn entity(&self, entity: Address) -> Option<&EntityStorage> {
        self.world.entities.get(&entity)
    }

    /// Explicit balance of `asset` recognized by `entity`.
    #[must_use]
    pub fn explicit_balance(&self, entity: Address, asset: Asset) -> Amount {
        self.entity(entity)
            .map(|storage| storage.ledger.balance(asset))
            .unwrap_or_default()
    }

    /// Explicit and custodial view of `asset` held by `entity`.
    #[must_use]
    pub fn holding(&self, entity: Address, asset: Asset) -> Option<Holding> {
        self.entity(entity)
            .map(|storage| storage.ledger.holding(asset, &self.world.tokens, entity))
    }

    #[must_use]
    pub fn system_admin(&self) -> Address {
        self.world.system_admin
    }

    #[must_use]
    pub fn native_token(&self) -> Asset {
        self.world.native
    }

    #[must_use]
    pub fn delegate_module(&self) -> Address {
        self.world.genesis.delegate
    }

    #[must_use]
    pub fn core_module(&self) -> Address {
        self.world.genesis.core
    }

    #[must_use]
    pub fn funds_module(&self) -> Address {
        self.world.genesis.funds
    }

    /// Freeze module; installing it through `upgrade` freezes the entity.
    #[must_use]
    pub fn freeze_module(&self) -> Address {
        self.world.genesis.freeze
    }

    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.world.events
    }

    // ====================================================================
    // Roles
    // ====================================================================

    pub fn assign_role(
        &mut self,
        caller: Address,
        context: ContextId,
        principal: Address,
        role: RoleId,
    ) -> Result<()> {
        self.transact(|world, call_id| {
            world.acl.assign_role(caller, context, principal, role)?;
            let emitter = world.acl_address;
            world.emit(
                call_id,
                emitter,
                EntityEvent::RoleAssigned {
                    context,
                    principal,
                    role,
                    assigner: caller,
                },
            );
            Ok(())
        })
    }

    /// Returns `false` if the assignment did not exist.
    pub fn unassign_role(
        &mut self,
        caller: Address,
        context: ContextId,
        principal: Address,
        role: RoleId,
    ) -> Result<bool> {
        self.transact(|world, call_id| {
            let removed = world.acl.unassign_role(caller, context, principal, role)?;
            if removed {
                let emitter = world.acl_address;
                world.emit(
                    call_id,
                    emitter,
                    EntityEvent::RoleUnassigned {
                        context,
                        principal,
                        role,
                        assigner: caller,
                    },
                );
            }
            Ok(removed)
        })
    }

    #[must_use]
    pub fn has_role(&self, context: ContextId, principal: Address, role: RoleId) -> RoleStatus {
        self.world.acl.has_role(context, principal, role)
    }

    /// ACL context of an entity or policy.
    #[must_use]
    pub fn context_of(&self, address: Address) -> Option<ContextId> {
        self.world.context_of(address)
    }

    // ====================================================================
    // Tokens
    // ====================================================================

    pub fn mint(&mut self, asset: Asset, to: Address, amount: Amount) -> Result<()> {
        self.transact(|world, _| world.tokens.mint(asset, to, amount))
    }

    /// Plain transfer; sending to an entity does not credit its ledger.
    pub fn transfer(&mut self, asset: Asset, from: Address, to: Address, amount: Amount) -> Result<()> {
        self.transact(|world, _| world.tokens.transfer(asset, from, to, amount))
    }

    pub fn approve(&mut self, asset: Asset, owner: Address, spender: Address, amount: Amount) {
        self.world.tokens.approve(asset, owner, spender, amount);
    }

    #[must_use]
    pub fn balance_of(&self, asset: Asset, holder: Address) -> Amount {
        self.world.tokens.balance_of(asset, holder)
    }

    #[must_use]
    pub fn allowance(&self, asset: Asset, owner: Address, spender: Address) -> Amount {
        self.world.tokens.allowance(asset, owner, spender)
    }

    // ====================================================================
    // Venue
    // ====================================================================

    #[must_use]
    pub fn venue_address(&self) -> Address {
        self.world.venue.address()
    }

    /// Place an offer as `owner`, who must have approved the venue.
    pub fn place_offer(
        &mut self,
        owner: Address,
        sell_asset: Asset,
        sell_amount: Amount,
        buy_asset: Asset,
        buy_amount: Amount,
    ) -> Result<TradeOutcome> {
        self.transact(|world, _| {
            world.venue.place_offer(
                &mut world.tokens,
                owner,
                sell_asset,
                sell_amount,
                buy_asset,
                buy_amount,
            )
        })
    }

    /// Pay up to `pay` into an offer. Returns the amount received.
    pub fn fill_offer(&mut self, taker: Address, offer_id: OfferId, pay: Amount) -> Result<Amount> {
        self.transact(|world, _| world.venue.fill(&mut world.tokens, taker, offer_id, pay))
    }

    /// Buy `quantity` of an offer's sell asset. Returns the amount paid.
    pub fn buy_offer(&mut self, taker: Address, offer_id: OfferId, quantity: Amount) -> Result<Amount> {
        self.transact(|world, _| world.venue.buy(&mut world.tokens, taker, offer_id, quantity))
    }

    pub fn cancel_offer(&mut self, caller: Address, offer_id: OfferId) -> Result<Offer> {
        self.transact(|world, _| world.venue.cancel(&mut world.tokens, caller, offer_id))
    }

    #[must_use]
    pub fn best_offer(&self, sell_asset: Asset, buy_asset: Asset) -> Option<Offer> {
        self.world.venue.best_offer(sell_asset, buy_asset)
    }

    #[must_use]
    pub fn offer(&self, offer_id: OfferId) -> Option<Offer> {
        self.world.venue.offer(offer_id)
    }

    // ====================================================================
    // Policies
    // ====================================================================

    #[must_use]
    pub fn policy(&self, policy: Address) -> Option<&Policy> {
        self.world.policies.get(&policy)
    }

    /// Add a tranche as the policy owner. Returns its index.
    pub fn create_tranch(
        &mut self,
        caller: Address,
        policy: Address,
        config: TranchConfig,
    ) -> Result<usize> {
        self.transact(|world, _| {
            let record = world
                .policies
                .get_mut(&policy)
                .ok_or_else(|| KeystoneError::PolicyNotFound(policy.to_string()))?;
            world.acl.require(
                record.context,
                caller,
                roles::policy_owner(),
                "must be policy owner",
            )?;
            let index = record.add_tranch(config)?;
            info!(policy = %policy, tranch = index, "Tranch created");
            Ok(index)
        })
    }
}
