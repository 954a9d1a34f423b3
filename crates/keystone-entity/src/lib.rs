//! # keystone-entity
//!
//! **Self-upgrading, role-gated accounting entities.**
//!
//! An entity is a storage record plus a selector table. Every call is routed
//! by the [`diamond`] dispatcher to the module (facet) registered for its
//! selector, and the module runs against the entity's own storage. Modules
//! can be added through `upgrade` but never replaced, and once the freeze
//! module is installed the table is fixed for good.
//!
//! ## Components
//!
//! - [`Acl`]: context-scoped role registry with global (system) roles
//! - [`diamond`]: add-only selector table, freeze state, dispatch
//! - [`facets`]: the built-in upgrade, core, funds and freeze modules
//! - [`policy`]: policies and tranche premium collection
//! - [`Chain`]: in-memory host owning custody, venue, modules and entities,
//!   with whole-call revert
//! - [`EntityClient`]: typed calls against one entity
//!
//! ## Call flow
//!
//! ```text
//! Chain::call(entity, caller, EntityCall)
//!   └─ snapshot host
//!   └─ check out entity storage (nested call into it → Reentrancy)
//!   └─ diamond::dispatch → Facet::execute(CallContext)
//!        └─ role check in the entity's context
//!        └─ ledger mutation under ReentrancyGuard, then CustodyInvariant
//!   └─ on error: restore snapshot
//! ```

pub mod acl;
pub mod call;
pub mod chain;
pub mod client;
pub mod diamond;
pub mod facet;
pub mod facets;
pub mod policy;
pub mod storage;

pub use acl::Acl;
pub use call::{CallOutput, EntityCall, VersionInfo};
pub use chain::{Chain, World};
pub use client::EntityClient;
pub use diamond::{DiamondState, ModuleSpec, UpgradeState};
pub use facet::{CallContext, Facet};
pub use facets::{DiamondUpgradeFacet, EntityCoreFacet, EntityFundsFacet, FreezeUpgradesFacet};
pub use policy::{Policy, Tranch};
pub use storage::{EntityStorage, OpenTrade};
