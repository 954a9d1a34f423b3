//! # keystone-types
//!
//! Shared types, errors, and configuration for **Keystone** entities.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`Address`], [`ContextId`], [`RoleId`], [`Selector`], [`OfferId`], [`CallId`]
//! - **Balance model**: [`Amount`], [`Asset`], [`Holding`]
//! - **Offer model**: [`Offer`], [`OfferStatus`], [`TradeOutcome`], [`SaleOutcome`]
//! - **Policy records**: [`PolicyConfig`], [`PolicyInfo`], [`TranchConfig`]
//! - **Events**: [`EntityEvent`], [`EventRecord`], [`EventLog`]
//! - **Roles**: [`RoleStatus`] and the well-known roles in [`roles`]
//! - **Configuration**: [`ChainConfig`], [`AclConfig`], [`LedgerConfig`], [`VenueConfig`]
//! - **Errors**: [`KeystoneError`] with `KS_ERR_` prefix codes, [`UpgradeFailure`]
//! - **Collaborators**: the [`Custody`] and [`Venue`] traits
//! - **Constants**: system-wide limits and defaults

pub mod balance;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod interfaces;
pub mod offer;
pub mod policy;
pub mod roles;

// Re-export all primary types at crate root for ergonomic imports:
//   use keystone_types::{Address, Offer, KeystoneError, ...};

pub use balance::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use interfaces::*;
pub use offer::*;
pub use policy::*;
pub use roles::RoleStatus;

// Constants are accessed via `keystone_types::constants::FOO` and role ids via
// `keystone_types::roles::entity_admin()` (not re-exported to avoid name collisions).
