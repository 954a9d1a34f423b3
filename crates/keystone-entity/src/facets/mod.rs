//! Built-in modules.
//!
//! Every entity is constructed with [`DiamondUpgradeFacet`] (the delegate),
//! [`EntityCoreFacet`] and [`EntityFundsFacet`]. [`FreezeUpgradesFacet`] is
//! deployed by the host but only installed through `upgrade`.

pub mod core;
pub mod freeze;
pub mod funds;
pub mod upgrade;

pub use self::core::EntityCoreFacet;
pub use freeze::FreezeUpgradesFacet;
pub use funds::EntityFundsFacet;
pub use upgrade::DiamondUpgradeFacet;
