//! Command surface consumed by the admin UI and the `assistdesk` binary.
//!
//! Versioned modules (currently `v1`) keep the interface stable while the
//! core logic evolves.

pub mod v1;
