//! Generation client: the only crate that talks to the AI provider.
//!
//! The orchestrator sees the [`GenerationClient`] trait and a tri-state
//! outcome (success / transient failure / permanent failure) expressed
//! through `CoreError`; provider-specific signals never leak upward.

pub mod classify;
pub mod client;
pub mod http;

pub use client::{
    GenerationClient, ImageEditRequest, ImageGenerationRequest, PageDescriptionRequest,
};
pub use http::{HttpGenerationClient, ProviderConfig};
