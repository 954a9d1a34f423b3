//! Role assignment status and the well-known roles.

use serde::{Deserialize, Serialize};

use crate::{RoleId, constants};

/// Result of a has-role query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleStatus {
    DoesNotHaveRole,
    /// Assigned in the queried context.
    HasRoleContext,
    /// Assigned in the system context, which applies everywhere.
    HasRoleGlobal,
}

impl RoleStatus {
    #[must_use]
    pub fn has(self) -> bool {
        !matches!(self, Self::DoesNotHaveRole)
    }
}

impl std::fmt::Display for RoleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DoesNotHaveRole => write!(f, "DOES_NOT_HAVE_ROLE"),
            Self::HasRoleContext => write!(f, "HAS_ROLE_CONTEXT"),
            Self::HasRoleGlobal => write!(f, "HAS_ROLE_GLOBAL"),
        }
    }
}

#[must_use]
pub fn system_admin() -> RoleId {
    RoleId::named(constants::ROLE_SYSTEM_ADMIN)
}

#[must_use]
pub fn entity_admin() -> RoleId {
    RoleId::named(constants::ROLE_ENTITY_ADMIN)
}

#[must_use]
pub fn entity_manager() -> RoleId {
    RoleId::named(constants::ROLE_ENTITY_MANAGER)
}

/// Entity representative, also the trader role.
#[must_use]
pub fn entity_rep() -> RoleId {
    RoleId::named(constants::ROLE_ENTITY_REP)
}

#[must_use]
pub fn policy_owner() -> RoleId {
    RoleId::named(constants::ROLE_POLICY_OWNER)
}
