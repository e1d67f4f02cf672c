//! Persistent device and record storage for Hearth.
//!
//! Backed by a single redb database. The store is safe to share between
//! any number of request handlers and sync connections: redb serializes
//! write transactions and lets readers proceed concurrently.

pub mod error;
pub mod records;

pub use error::{Error, Result};
pub use records::RecordStore;
