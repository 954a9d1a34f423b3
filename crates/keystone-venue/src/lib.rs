//! # keystone-venue
//!
//! **In-memory order-matching venue for Keystone entities.**
//!
//! The venue is an external collaborator from an entity's point of view; the
//! ledger only ever sees it through [`keystone_types::Venue`]. It has:
//!
//! - **Escrow**: every open offer's sell amount is held at the venue address
//! - **Immediate matching**: new offers cross resting counter offers at the maker's price
//! - **Price-time priority**: best rate first, FIFO within a rate level
//! - **Closed-offer history**: filled and cancelled offers remain queryable

pub mod market;
pub mod offer_book;
pub mod price_level;

pub use market::OfferMarket;
pub use offer_book::OfferBook;
pub use price_level::PriceLevel;
