//! Shared domain and wire types for the gatehouse services.
//!
//! Both the weighbridge and the billing agent speak the same JSON dialect:
//! `YYYYMMDDhhmmss` timestamps, kilogram integers with an `"na"` sentinel for
//! weights that cannot be determined yet, and comma-joined canonical
//! container lists. Everything that crosses the wire between the two services
//! lives here so the client and the handlers cannot drift apart.

// Forbid unsafe code outside of tests
#![cfg_attr(not(test), forbid(unsafe_code))]
#![warn(missing_docs)]

pub mod api;
pub mod timefmt;

mod types;
pub use types::*;
