//! Row structs and DTOs for the slide-deck tables.

pub mod page;
pub mod project;
pub mod status;
pub mod task;
