//! Upgrade control: the entity's delegate module.
//!
//! `upgrade` is the public entry point. The registration primitive
//! `registerFacets` accepts only the entity itself as caller, so the one way
//! to reach it is the self-call `upgrade` makes after its checks pass.

use keystone_types::{
    Address, ContextId, EntityEvent, KeystoneError, Result, Selector, UpgradeFailure, constants, roles,
};
use tracing::info;

use crate::call::{CallOutput, EntityCall};
use crate::diamond::install_modules;
use crate::facet::{CallContext, Facet};

#[derive(Debug, Default)]
pub struct DiamondUpgradeFacet;

impl Facet for DiamondUpgradeFacet {
    fn name(&self) -> &'static str {
        "diamond-upgrade"
    }

    fn selectors(&self) -> Vec<Selector> {
        [
            "upgrade(address[])",
            "registerFacets(address[])",
            "isUpgradeFrozen()",
        ]
        .into_iter()
        .map(EntityCall::selector_of)
        .collect()
    }

    fn execute(&self, ctx: &mut CallContext<'_>, call: &EntityCall) -> Result<CallOutput> {
        match call {
            EntityCall::Upgrade { modules } => upgrade(ctx, modules),
            EntityCall::RegisterFacets { modules } => register_facets(ctx, modules),
            EntityCall::IsUpgradeFrozen => Ok(CallOutput::Bool(ctx.storage().diamond.is_frozen())),
            other => Err(CallContext::unsupported(other)),
        }
    }
}

fn upgrade(ctx: &mut CallContext<'_>, modules: &[Address]) -> Result<CallOutput> {
    if ctx.storage().diamond.is_frozen() {
        return Err(UpgradeFailure::Frozen.into());
    }
    let caller = ctx.caller();
    if !ctx
        .world()
        .acl
        .has_role(ContextId::SYSTEM, caller, roles::system_admin())
        .has()
    {
        return Err(KeystoneError::MustBeAdmin);
    }
    if modules.len() > constants::MAX_MODULES_PER_UPGRADE {
        return Err(KeystoneError::Configuration(format!(
            "upgrade of {} modules exceeds {}",
            modules.len(),
            constants::MAX_MODULES_PER_UPGRADE
        )));
    }
    info!(
        entity = %ctx.this(),
        caller = %caller,
        modules = modules.len(),
        "Upgrade requested"
    );
    ctx.self_call(&EntityCall::RegisterFacets {
        modules: modules.to_vec(),
    })
}

fn register_facets(
    ctx: &mut CallContext<'_>,
    modules: &[Address],
) -> Result<CallOutput> {
    if ctx.caller() != ctx.this() {
        return Err(UpgradeFailure::ExternalCallerNotAllowed.into());
    }
    let (storage, world) = ctx.split();
    let froze = install_modules(&mut storage.diamond, world, modules)?;
    ctx.emit(EntityEvent::FacetsRegistered {
        modules: modules.to_vec(),
    });
    if froze {
        info!(entity = %ctx.this(), "Upgrades frozen");
        ctx.emit(EntityEvent::UpgradesFrozen);
    }
    Ok(CallOutput::Unit)
}
