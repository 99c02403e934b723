//! Domain types and pure orchestration logic shared by every other crate.
//!
//! This crate has zero internal dependencies so that the db, pipeline,
//! and api crates can all build on it without cycles. Anything that
//! touches the network, the filesystem, or the database lives elsewhere.

pub mod error;
pub mod lifecycle;
pub mod ordering;
pub mod outline;
pub mod prompts;
pub mod retry;
pub mod types;
