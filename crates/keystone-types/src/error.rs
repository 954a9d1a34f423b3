//! Error types for Keystone entities.
//!
//! All errors use the `KS_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Authorization errors
//! - 2xx: Balance / custody errors
//! - 3xx: Dispatch and upgrade errors
//! - 4xx: Policy errors
//! - 5xx: Venue errors
//! - 6xx: Safety errors (reentrancy, invariants)
//! - 9xx: General / internal errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{Address, ContextId, OfferId, Selector};

/// Failure of the upgrade path. `Frozen` is permanent for the entity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpgradeFailure {
    /// A selector of the incoming modules is already registered, or repeated
    /// within the same batch.
    #[error("Adding functions failed: selector {selector} already registered")]
    AddingFunctionsFailed { selector: Selector },

    /// Upgrades have been frozen on this entity.
    #[error("upgrades are frozen")]
    Frozen,

    /// The registration primitive was invoked by someone other than the entity itself.
    #[error("external caller not allowed")]
    ExternalCallerNotAllowed,
}

/// Central error enum for all Keystone operations.
#[derive(Debug, Clone, Error)]
pub enum KeystoneError {
    // =================================================================
    // Authorization Errors (1xx)
    // =================================================================
    /// The caller lacks the role the operation requires.
    #[error("KS_ERR_100: Authorization failure: {requirement}")]
    AuthorizationFailure { requirement: String },

    /// The caller is not a system administrator.
    #[error("KS_ERR_101: must be admin")]
    MustBeAdmin,

    // =================================================================
    // Balance / Custody Errors (2xx)
    // =================================================================
    /// The amount is larger than what the ledger explicitly recognizes.
    #[error(
        "KS_ERR_200: amount exceeds entity balance: asset {asset}, requested {requested}, explicit {available}"
    )]
    ExceedsExplicitBalance {
        asset: Address,
        requested: Decimal,
        available: Decimal,
    },

    /// A pull transfer exceeded the owner's approval for the spender.
    #[error("KS_ERR_201: amount exceeds allowance: asset {asset}, requested {requested}, allowed {allowed}")]
    AllowanceExceeded {
        asset: Address,
        requested: Decimal,
        allowed: Decimal,
    },

    /// A transfer exceeded the sender's custodial balance.
    #[error("KS_ERR_202: transfer amount exceeds balance: asset {asset}, requested {requested}, held {available}")]
    InsufficientFunds {
        asset: Address,
        requested: Decimal,
        available: Decimal,
    },

    /// Amounts must be strictly positive.
    #[error("KS_ERR_203: Invalid amount: {0}")]
    InvalidAmount(Decimal),

    /// An amount computation left the representable range.
    #[error("KS_ERR_204: Amount overflow in {operation}")]
    AmountOverflow { operation: &'static str },

    // =================================================================
    // Dispatch / Upgrade Errors (3xx)
    // =================================================================
    #[error("KS_ERR_300: Upgrade failure: {0}")]
    Upgrade(#[from] UpgradeFailure),

    /// No module is registered for the selector.
    #[error("KS_ERR_301: Unknown operation: {0}")]
    UnknownOperation(Selector),

    /// No module code is deployed at the address.
    #[error("KS_ERR_302: Unknown module: {0}")]
    UnknownModule(Address),

    /// No entity or policy lives at the address.
    #[error("KS_ERR_303: Unknown contract: {0}")]
    UnknownContract(Address),

    // =================================================================
    // Policy Errors (4xx)
    // =================================================================
    #[error("KS_ERR_400: underwriter ACL context must match: underwriter {underwriter}, expected {expected}")]
    UnderwriterContextMismatch {
        underwriter: Address,
        expected: ContextId,
    },

    #[error("KS_ERR_401: Policy not found: {0}")]
    PolicyNotFound(String),

    #[error("KS_ERR_402: Tranch {index} not found on policy {policy}")]
    TranchNotFound { policy: Address, index: usize },

    #[error("KS_ERR_403: Invalid premium: {reason}")]
    InvalidPremium { reason: String },

    #[error("KS_ERR_404: Invalid policy config: {reason}")]
    InvalidPolicyConfig { reason: String },

    // =================================================================
    // Venue Errors (5xx)
    // =================================================================
    #[error("KS_ERR_500: Offer not found: {0}")]
    OfferNotFound(OfferId),

    #[error("KS_ERR_501: Invalid offer: {reason}")]
    InvalidOffer { reason: String },

    /// No standing offer exists for the pair and the ledger is configured to fail.
    #[error("KS_ERR_502: No offers available selling {buy_asset} for {sell_asset}")]
    NoOffers {
        sell_asset: Address,
        buy_asset: Address,
    },

    // =================================================================
    // Safety Errors (6xx)
    // =================================================================
    #[error("KS_ERR_600: Reentrant call rejected: {operation} while {held_by} in progress")]
    Reentrancy { operation: String, held_by: String },

    /// Explicit balance exceeded custody. Critical safety alert.
    #[error("KS_ERR_601: Custody invariant violation: {reason}")]
    InvariantViolation { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    #[error("KS_ERR_900: Internal error: {0}")]
    Internal(String),

    #[error("KS_ERR_901: Serialization error: {0}")]
    Serialization(String),

    #[error("KS_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl KeystoneError {
    /// Shorthand for a role-check rejection.
    pub fn unauthorized(requirement: impl Into<String>) -> Self {
        Self::AuthorizationFailure {
            requirement: requirement.into(),
        }
    }

    /// The upgrade failure carried by this error, if any.
    #[must_use]
    pub fn upgrade_failure(&self) -> Option<&UpgradeFailure> {
        match self {
            Self::Upgrade(failure) => Some(failure),
            _ => None,
        }
    }

    /// Whether the caller can recover by retrying with a different role or amount.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::Upgrade(UpgradeFailure::Frozen)
                | Self::InvariantViolation { .. }
                | Self::Internal(_)
        )
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, KeystoneError>;

impl From<serde_json::Error> for KeystoneError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
