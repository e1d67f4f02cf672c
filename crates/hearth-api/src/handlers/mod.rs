//! HTTP request handlers.

pub mod basic;
pub mod devices;
pub mod records;
pub mod sync;
