//! rollcall-store — SQLite persistence for roster, sessions and disputes.
//!
//! Single-writer by design: one operator process owns the database for
//! the lifetime of a session. Session writes still carry an optimistic
//! version check so that a second writer is detected instead of
//! silently clobbered.

pub mod schema;
mod store;

pub use store::{Dispute, Store, StoreError};
