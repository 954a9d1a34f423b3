//! Configuration types for a Keystone host.

use serde::{Deserialize, Serialize};

use crate::{KeystoneError, Result, RoleId, constants};

/// Top-level host configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub acl: AclConfig,
    pub ledger: LedgerConfig,
    pub venue: VenueConfig,
}

impl ChainConfig {
    /// Parse and validate a JSON configuration. Missing sections take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| KeystoneError::Configuration(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.venue.amount_precision > constants::MAX_AMOUNT_PRECISION {
            return Err(KeystoneError::Configuration(format!(
                "venue.amount_precision {} exceeds {}",
                self.venue.amount_precision,
                constants::MAX_AMOUNT_PRECISION
            )));
        }
        if self.venue.max_matches_per_offer == 0 {
            return Err(KeystoneError::Configuration(
                "venue.max_matches_per_offer must be > 0".into(),
            ));
        }
        if self.ledger.max_fills_per_sale == 0 {
            return Err(KeystoneError::Configuration(
                "ledger.max_fills_per_sale must be > 0".into(),
            ));
        }
        if self.acl.context_admin_roles.is_empty() {
            return Err(KeystoneError::Configuration(
                "acl.context_admin_roles must name at least one role".into(),
            ));
        }
        Ok(())
    }
}

/// Role registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AclConfig {
    /// Role names whose holders may assign roles within a context.
    pub context_admin_roles: Vec<String>,
}

impl AclConfig {
    #[must_use]
    pub fn admin_role_ids(&self) -> Vec<RoleId> {
        self.context_admin_roles
            .iter()
            .map(|name| RoleId::named(name))
            .collect()
    }
}

impl Default for AclConfig {
    fn default() -> Self {
        Self {
            context_admin_roles: vec![
                constants::ROLE_SYSTEM_ADMIN.to_string(),
                constants::ROLE_ENTITY_ADMIN.to_string(),
            ],
        }
    }
}

/// What `sell_at_best_price` does when no counter offer exists at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyBookPolicy {
    /// Succeed with a zero-amount sale.
    #[default]
    NoOp,
    /// Fail with `NoOffers`.
    Fail,
}

/// Entity ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub empty_book: EmptyBookPolicy,
    pub max_fills_per_sale: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            empty_book: EmptyBookPolicy::default(),
            max_fills_per_sale: constants::DEFAULT_MAX_FILLS_PER_SALE,
        }
    }
}

/// Venue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VenueConfig {
    /// Decimal places kept by fill computations.
    pub amount_precision: u32,
    pub max_matches_per_offer: usize,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            amount_precision: constants::DEFAULT_AMOUNT_PRECISION,
            max_matches_per_offer: constants::DEFAULT_MAX_MATCHES_PER_OFFER,
        }
    }
}
