//! # keystone-ledger
//!
//! **Asset custody and explicit-deposit accounting for Keystone entities.**
//!
//! - [`TokenBook`]: custodial balances and allowances for every asset on the host
//! - [`ExplicitLedger`]: per-entity balances the entity recognizes as its own
//! - [`ReentrancyGuard`]: one ledger mutation at a time per entity
//! - [`CustodyInvariant`]: `explicit <= custodial` after every mutation
//! - [`VenueAdapter`]: approval-bracketed, delta-measured access to the venue

pub mod adapter;
pub mod explicit;
pub mod guard;
pub mod invariant;
pub mod token_book;

pub use adapter::VenueAdapter;
pub use explicit::ExplicitLedger;
pub use guard::ReentrancyGuard;
pub use invariant::CustodyInvariant;
pub use token_book::TokenBook;
