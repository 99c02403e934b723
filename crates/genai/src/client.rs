//! The [`GenerationClient`] trait and its request types.

use async_trait::async_trait;
use slidecraft_core::error::CoreError;
use slidecraft_core::outline::PageSpec;

/// Everything needed to describe one page of the deck.
#[derive(Debug, Clone)]
pub struct PageDescriptionRequest {
    /// The original user idea the deck was generated from.
    pub idea: String,
    /// Rendered text of the full outline (section-context continuity).
    pub outline_text: String,
    /// The outline spec of the page being described.
    pub page: PageSpec,
    /// 1-based page number.
    pub page_number: usize,
}

/// Everything needed to render one slide image.
#[derive(Debug, Clone)]
pub struct ImageGenerationRequest {
    /// The page description produced by the description task.
    pub description: String,
    /// Rendered text of the full outline.
    pub outline_text: String,
    /// Section label of the page, if the outline had parts.
    pub section: Option<String>,
    /// Style reference image (uploaded template), if any.
    pub style_ref: Option<Vec<u8>>,
    /// Material images the model may compose into the slide.
    pub material_refs: Vec<Vec<u8>>,
    /// Extra user requirements appended to the prompt.
    pub extra_requirements: Option<String>,
}

/// Everything needed to edit an existing slide image.
#[derive(Debug, Clone)]
pub struct ImageEditRequest {
    /// The current slide image.
    pub current_image: Vec<u8>,
    /// The user's edit instruction.
    pub instruction: String,
    /// The page's description, for content-preserving edits.
    pub original_description: Option<String>,
}

/// Outbound AI calls used by the orchestrator.
///
/// Every error returned here is already classified: transient failures
/// come back as [`CoreError::TransientProvider`] (or `Storage`) and are
/// retryable, everything else is final. Implementations must be safe to
/// abandon mid-flight: a dropped future must not corrupt shared state.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate a deck outline for a free-form idea. Returns the raw
    /// model response; parsing happens in `slidecraft_core::outline`.
    async fn generate_outline(
        &self,
        idea: &str,
        extra_requirements: Option<&str>,
    ) -> Result<String, CoreError>;

    /// Structure a user-provided outline text without rewriting it.
    async fn parse_outline_text(&self, outline_text: &str) -> Result<String, CoreError>;

    /// Generate the text description for one page.
    async fn describe_page(&self, request: &PageDescriptionRequest) -> Result<String, CoreError>;

    /// Render one slide image. Returns encoded image bytes (PNG).
    async fn generate_image(&self, request: &ImageGenerationRequest) -> Result<Vec<u8>, CoreError>;

    /// Edit an existing slide image. Returns encoded image bytes (PNG).
    async fn edit_image(&self, request: &ImageEditRequest) -> Result<Vec<u8>, CoreError>;
}
