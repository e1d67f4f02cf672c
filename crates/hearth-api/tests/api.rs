//! HTTP handler tests.

mod common;
mod handlers;
