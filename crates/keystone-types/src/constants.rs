//! System-wide constants for Keystone.

/// Default decimal precision for venue fill amounts (integer token units).
pub const DEFAULT_AMOUNT_PRECISION: u32 = 0;

/// Maximum supported amount precision (`rust_decimal` scale limit).
pub const MAX_AMOUNT_PRECISION: u32 = 28;

/// Maximum counter offers a single `sell_at_best_price` will consume.
pub const DEFAULT_MAX_FILLS_PER_SALE: usize = 64;

/// Maximum counter offers a newly placed offer matches against on entry.
pub const DEFAULT_MAX_MATCHES_PER_OFFER: usize = 64;

/// Maximum modules accepted by a single upgrade.
pub const MAX_MODULES_PER_UPGRADE: usize = 32;

/// Default policy term when no maturation date is given.
pub const DEFAULT_POLICY_TERM_DAYS: i64 = 365;

/// Role names. Role ids are derived from these with [`crate::RoleId::named`].
pub const ROLE_SYSTEM_ADMIN: &str = "SYSTEM_ADMIN";
pub const ROLE_ENTITY_ADMIN: &str = "ENTITY_ADMIN";
pub const ROLE_ENTITY_MANAGER: &str = "ENTITY_MANAGER";
pub const ROLE_ENTITY_REP: &str = "ENTITY_REP";
pub const ROLE_POLICY_OWNER: &str = "POLICY_OWNER";

/// Label of the native asset deployed with every host.
pub const NATIVE_ASSET_LABEL: &str = "ETHER";

/// Entity implementation version reported by `getVersionInfo`.
pub const ENTITY_VERSION_NUM: u32 = 1;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Keystone";
