//! HTTP handlers, grouped by resource.

pub mod export;
pub mod generation;
pub mod page;
pub mod project;
pub mod upload;
