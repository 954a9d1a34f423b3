use keystone_types::{Result, Selector};

use crate::call::{CallOutput, EntityCall};
use crate::facet::{CallContext, Facet};

/// Installing this module freezes the entity's upgrades for good.
#[derive(Debug, Default)]
pub struct FreezeUpgradesFacet;

impl Facet for FreezeUpgradesFacet {
    fn name(&self) -> &'static str {
        "freeze-upgrades"
    }

    fn selectors(&self) -> Vec<Selector> {
        vec![EntityCall::selector_of("freezeUpgrades()")]
    }

    fn freezes_upgrades(&self) -> bool {
        true
    }

    fn execute(&self, ctx: &mut CallContext<'_>, call: &EntityCall) -> Result<CallOutput> {
        match call {
            EntityCall::FreezeUpgrades => Ok(CallOutput::Bool(ctx.storage().diamond.is_frozen())),
            other => Err(CallContext::unsupported(other)),
        }
    }
}
