//! Context-scoped role registry.
//!
//! Assignments are `(context, principal, role)` triples. Assignments in
//! [`ContextId::SYSTEM`] are global and satisfy a role check in every
//! context. A context that has never been written to can be claimed once by
//! the contract it belongs to (`ContextId::of(contract)`) or by a system
//! admin; afterwards only a context admin may change it.

use std::collections::HashSet;

use keystone_types::{
    Address, AclConfig, ContextId, KeystoneError, Result, RoleId, RoleStatus, roles,
};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct Acl {
    assignments: HashSet<(ContextId, Address, RoleId)>,
    /// Contexts that have received at least one assignment.
    claimed: HashSet<ContextId>,
    admin_roles: Vec<RoleId>,
}

impl Acl {
    /// Registry whose only assignment is `system_admin` as a global admin.
    #[must_use]
    pub fn new(config: &AclConfig, system_admin: Address) -> Self {
        let mut acl = Self {
            assignments: HashSet::new(),
            claimed: HashSet::new(),
            admin_roles: config.admin_role_ids(),
        };
        acl.assignments
            .insert((ContextId::SYSTEM, system_admin, roles::system_admin()));
        acl.claimed.insert(ContextId::SYSTEM);
        acl
    }

    /// Pure query; never fails.
    #[must_use]
    pub fn has_role(&self, context: ContextId, principal: Address, role: RoleId) -> RoleStatus {
        if self.assignments.contains(&(context, principal, role)) {
            if context.is_system() {
                RoleStatus::HasRoleGlobal
            } else {
                RoleStatus::HasRoleContext
            }
        } else if self
            .assignments
            .contains(&(ContextId::SYSTEM, principal, role))
        {
            RoleStatus::HasRoleGlobal
        } else {
            RoleStatus::DoesNotHaveRole
        }
    }

    /// Whether `principal` may assign roles in `context`.
    #[must_use]
    pub fn is_admin(&self, context: ContextId, principal: Address) -> bool {
        self.admin_roles
            .iter()
            .any(|role| self.has_role(context, principal, *role).has())
    }

    #[must_use]
    pub fn is_claimed(&self, context: ContextId) -> bool {
        self.claimed.contains(&context)
    }

    /// Assign `role` to `principal` in `context`.
    ///
    /// The first assignment into an unclaimed context is open to the
    /// context's own contract. Returns `true` if this call claimed the context.
    pub fn assign_role(
        &mut self,
        caller: Address,
        context: ContextId,
        principal: Address,
        role: RoleId,
    ) -> Result<bool> {
        let claiming = !self.claimed.contains(&context);
        let owns_context = claiming && ContextId::of(caller) == context;
        if !owns_context && !self.is_admin(context, caller) {
            return Err(KeystoneError::unauthorized("must be context admin"));
        }
        self.claimed.insert(context);
        self.assignments.insert((context, principal, role));
        info!(
            context = %context,
            principal = %principal,
            role = %role,
            assigner = %caller,
            claimed = claiming,
            "Role assigned"
        );
        Ok(claiming)
    }

    /// Remove an assignment. Returns `false` if there was nothing to remove.
    pub fn unassign_role(
        &mut self,
        caller: Address,
        context: ContextId,
        principal: Address,
        role: RoleId,
    ) -> Result<bool> {
        if !self.is_admin(context, caller) {
            return Err(KeystoneError::unauthorized("must be context admin"));
        }
        let removed = self.assignments.remove(&(context, principal, role));
        debug!(
            context = %context,
            principal = %principal,
            role = %role,
            removed,
            "Role unassigned"
        );
        Ok(removed)
    }

    /// Fail with `AuthorizationFailure(requirement)` unless `principal` holds `role`.
    pub fn require(
        &self,
        context: ContextId,
        principal: Address,
        role: RoleId,
        requirement: &str,
    ) -> Result<RoleStatus> {
        let status = self.has_role(context, principal, role);
        if status.has() {
            Ok(status)
        } else {
            Err(KeystoneError::unauthorized(requirement))
        }
    }
}
