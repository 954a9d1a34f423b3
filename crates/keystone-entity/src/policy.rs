//! Policy collaborator.
//!
//! Policies are created by entities and carry their own ACL context. The
//! ledger interacts with them only to pay tranche premiums: the entity approves
//! the policy, and the policy pulls exactly the next unpaid premium.

use chrono::{Duration, Utc};
use keystone_types::{
    Address, Amount, CallId, ContextId, Custody, EntityEvent, KeystoneError, PolicyConfig,
    PolicyInfo, Result, TranchConfig, constants, roles,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::chain::World;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tranch {
    pub config: TranchConfig,
    /// Number of scheduled premiums paid so far.
    pub premiums_paid: usize,
}

impl Tranch {
    /// Next unpaid premium, `None` once the schedule is exhausted.
    #[must_use]
    pub fn next_premium(&self) -> Option<Amount> {
        self.config.premiums.get(self.premiums_paid).copied()
    }

    #[must_use]
    pub fn total_paid(&self) -> Amount {
        self.config.premiums[..self.premiums_paid].iter().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub address: Address,
    pub context: ContextId,
    pub info: PolicyInfo,
    pub tranches: Vec<Tranch>,
}

impl Policy {
    /// Append a tranche. Returns its index.
    pub fn add_tranch(&mut self, config: TranchConfig) -> Result<usize> {
        if config.num_shares == 0 {
            return Err(KeystoneError::InvalidPolicyConfig {
                reason: "tranch must have at least one share".into(),
            });
        }
        if config.price_per_share_amount <= Decimal::ZERO {
            return Err(KeystoneError::InvalidPolicyConfig {
                reason: "price per share must be positive".into(),
            });
        }
        if config.premiums.iter().any(|p| *p <= Decimal::ZERO) {
            return Err(KeystoneError::InvalidPolicyConfig {
                reason: "premiums must be positive".into(),
            });
        }
        self.tranches.push(Tranch {
            config,
            premiums_paid: 0,
        });
        self.info.num_tranches = self.tranches.len();
        Ok(self.tranches.len() - 1)
    }

    #[must_use]
    pub fn tranch(&self, index: usize) -> Option<&Tranch> {
        self.tranches.get(index)
    }

    /// The payment must equal the tranche's next unpaid premium.
    pub fn check_premium(&self, index: usize, amount: Amount) -> Result<()> {
        let tranch = self.tranches.get(index).ok_or(KeystoneError::TranchNotFound {
            policy: self.address,
            index,
        })?;
        match tranch.next_premium() {
            None => Err(KeystoneError::InvalidPremium {
                reason: format!("tranch {index} has no unpaid premiums"),
            }),
            Some(expected) if expected != amount => Err(KeystoneError::InvalidPremium {
                reason: format!("tranch {index} expects {expected}, got {amount}"),
            }),
            Some(_) => Ok(()),
        }
    }

    fn record_premium(&mut self, index: usize) -> Result<()> {
        let policy = self.address;
        let tranch = self
            .tranches
            .get_mut(index)
            .ok_or(KeystoneError::TranchNotFound { policy, index })?;
        tranch.premiums_paid += 1;
        Ok(())
    }
}

/// Create a policy underwritten in `entity_context`.
///
/// The new policy claims its own context and makes `caller` its owner.
pub(crate) fn create_policy(
    world: &mut World,
    call_id: CallId,
    entity: Address,
    entity_context: ContextId,
    caller: Address,
    config: &PolicyConfig,
) -> Result<Address> {
    let underwriter = config.underwriter.unwrap_or(entity);
    if world.context_of(underwriter) != Some(entity_context) {
        return Err(KeystoneError::UnderwriterContextMismatch {
            underwriter,
            expected: entity_context,
        });
    }

    let now = Utc::now();
    let initiation_date = config.initiation_date.unwrap_or(now);
    let start_date = config.start_date.unwrap_or(now);
    let maturation_date = config
        .maturation_date
        .unwrap_or(start_date + Duration::days(constants::DEFAULT_POLICY_TERM_DAYS));
    if initiation_date > start_date || start_date > maturation_date {
        return Err(KeystoneError::InvalidPolicyConfig {
            reason: "dates must satisfy initiation <= start <= maturation".into(),
        });
    }
    let unit = config.unit.unwrap_or(world.native);

    let address = world.next_address(entity);
    let context = ContextId::of(address);
    world
        .acl
        .assign_role(address, context, caller, roles::policy_owner())?;
    world.emit(
        call_id,
        entity,
        EntityEvent::RoleAssigned {
            context,
            principal: caller,
            role: roles::policy_owner(),
            assigner: address,
        },
    );

    let policy = Policy {
        address,
        context,
        info: PolicyInfo {
            entity,
            underwriter,
            initiation_date,
            start_date,
            maturation_date,
            unit,
            num_tranches: 0,
        },
        tranches: Vec::new(),
    };
    world.register_policy(policy);
    world.emit(
        call_id,
        entity,
        EntityEvent::NewPolicy {
            policy: address,
            entity,
            deployer: caller,
        },
    );
    info!(
        policy = %address,
        entity = %entity,
        underwriter = %underwriter,
        owner = %caller,
        unit = %unit,
        "Policy created"
    );
    Ok(address)
}

/// Pull the next premium of `index` from `payer` into the policy.
pub(crate) fn collect_premium(
    world: &mut World,
    payer: Address,
    policy: Address,
    index: usize,
    amount: Amount,
) -> Result<()> {
    let record = world
        .policies
        .get_mut(&policy)
        .ok_or_else(|| KeystoneError::PolicyNotFound(policy.to_string()))?;
    record.check_premium(index, amount)?;
    let unit = record.info.unit;

    world.tokens.approve(unit, payer, policy, amount);
    let pulled = world
        .tokens
        .transfer_from(unit, policy, payer, policy, amount);
    world.tokens.approve(unit, payer, policy, Decimal::ZERO);
    pulled?;

    record.record_premium(index)?;
    info!(
        policy = %policy,
        payer = %payer,
        tranch = index,
        amount = %amount,
        "Premium collected"
    );
    Ok(())
}
