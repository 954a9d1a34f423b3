//! Entity core: policy creation and introspection.

use keystone_types::{KeystoneError, Result, Selector, constants};

use crate::call::{CallOutput, EntityCall, VersionInfo};
use crate::facet::{CallContext, Facet};
use crate::policy;

#[derive(Debug, Default)]
pub struct EntityCoreFacet;

impl Facet for EntityCoreFacet {
    fn name(&self) -> &'static str {
        "entity-core"
    }

    fn selectors(&self) -> Vec<Selector> {
        [
            "createPolicy(bytes)",
            "getNumPolicies()",
            "getPolicy(uint256)",
            "getVersionInfo()",
        ]
        .into_iter()
        .map(EntityCall::selector_of)
        .collect()
    }

    fn execute(&self, ctx: &mut CallContext<'_>, call: &EntityCall) -> Result<CallOutput> {
        match call {
            EntityCall::CreatePolicy(config) => {
                let (this, caller, call_id) = (ctx.this(), ctx.caller(), ctx.call_id());
                let (storage, world) = ctx.split();
                let address =
                    policy::create_policy(world, call_id, this, storage.context, caller, config)?;
                storage.policies.push(address);
                Ok(CallOutput::Address(address))
            }
            EntityCall::GetNumPolicies => Ok(CallOutput::Count(ctx.storage().policies.len())),
            EntityCall::GetPolicy { index } => ctx
                .storage()
                .policies
                .get(*index)
                .copied()
                .map(CallOutput::Address)
                .ok_or_else(|| KeystoneError::PolicyNotFound(format!("index {index}"))),
            EntityCall::GetVersionInfo => {
                let diamond = &ctx.storage().diamond;
                Ok(CallOutput::Version(VersionInfo {
                    num: constants::ENTITY_VERSION_NUM,
                    date: diamond.upgraded_at(),
                    hash: diamond.fingerprint(),
                }))
            }
            other => Err(CallContext::unsupported(other)),
        }
    }
}
