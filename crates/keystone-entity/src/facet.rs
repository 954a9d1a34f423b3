//! Module (facet) interface.
//!
//! A facet is stateless code deployed once on the host and registered on any
//! number of entities. It runs against whichever entity's storage the
//! dispatcher hands it through [`CallContext`].

use std::fmt;

use keystone_types::{
    Address, CallId, EntityEvent, KeystoneError, Result, RoleId, RoleStatus, Selector,
};

use crate::call::{CallOutput, EntityCall};
use crate::chain::World;
use crate::diamond;
use crate::storage::EntityStorage;

pub trait Facet: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Selectors this facet serves once registered.
    fn selectors(&self) -> Vec<Selector>;

    /// Registering this facet freezes the entity's upgrades.
    fn freezes_upgrades(&self) -> bool {
        false
    }

    fn execute(&self, ctx: &mut CallContext<'_>, call: &EntityCall) -> Result<CallOutput>;
}

/// Execution context of one dispatched call.
pub struct CallContext<'a> {
    this: Address,
    caller: Address,
    call_id: CallId,
    storage: &'a mut EntityStorage,
    world: &'a mut World,
}

impl<'a> CallContext<'a> {
    pub(crate) fn new(
        this: Address,
        caller: Address,
        call_id: CallId,
        storage: &'a mut EntityStorage,
        world: &'a mut World,
    ) -> Self {
        Self {
            this,
            caller,
            call_id,
            storage,
            world,
        }
    }

    /// The entity being called.
    #[must_use]
    pub fn this(&self) -> Address {
        self.this
    }

    #[must_use]
    pub fn caller(&self) -> Address {
        self.caller
    }

    #[must_use]
    pub fn call_id(&self) -> CallId {
        self.call_id
    }

    #[must_use]
    pub fn storage(&self) -> &EntityStorage {
        &*self.storage
    }

    pub fn storage_mut(&mut self) -> &mut EntityStorage {
        &mut *self.storage
    }

    pub(crate) fn world(&self) -> &World {
        &*self.world
    }

    /// Storage and host borrowed together.
    pub(crate) fn split(&mut self) -> (&mut EntityStorage, &mut World) {
        (&mut *self.storage, &mut *self.world)
    }

    /// Require `role` for the caller in the entity's own context.
    pub fn require_role(&self, role: RoleId, requirement: &str) -> Result<RoleStatus> {
        self.world
            .acl
            .require(self.storage.context, self.caller, role, requirement)
    }

    /// Append an event emitted by this entity.
    pub fn emit(&mut self, event: EntityEvent) {
        self.world.emit(self.call_id, self.this, event);
    }

    /// Dispatch `call` on this entity with the entity itself as caller.
    pub fn self_call(&mut self, call: &EntityCall) -> Result<CallOutput> {
        diamond::dispatch(
            &mut *self.storage,
            &mut *self.world,
            self.call_id,
            self.this,
            self.this,
            call,
        )
    }

    /// Call another contract on the host with this entity as caller.
    pub fn call_contract(&mut self, target: Address, call: &EntityCall) -> Result<CallOutput> {
        self.world
            .call_entity(self.call_id, target, self.this, call)
    }

    /// Error for a call routed to a facet that does not implement it.
    #[must_use]
    pub fn unsupported(call: &EntityCall) -> KeystoneError {
        KeystoneError::UnknownOperation(call.selector())
    }
}
