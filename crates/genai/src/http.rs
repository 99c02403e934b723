//! HTTP-backed [`GenerationClient`] implementation.
//!
//! Talks to the provider gateway's text and image endpoints. Text calls
//! are plain JSON; image calls send the prompt plus any reference images
//! as multipart and receive raw encoded image bytes back.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use slidecraft_core::error::CoreError;
use slidecraft_core::prompts;

use crate::classify::{classify_status, classify_transport};
use crate::client::{
    GenerationClient, ImageEditRequest, ImageGenerationRequest, PageDescriptionRequest,
};

/// Default per-call timeout. Image rendering is slow; expiry is treated
/// as a transient failure subject to the retry policy.
pub const DEFAULT_TIMEOUT_SECS: u64 = 180;

/// Connection settings for the provider gateway.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL, e.g. `https://gateway.internal`.
    pub base_url: String,
    pub api_key: String,
    /// Model used for outline and description calls.
    pub text_model: String,
    /// Model used for image generation and edit calls.
    pub image_model: String,
    /// Per-call timeout.
    pub timeout: Duration,
}

/// Reqwest-based generation client.
pub struct HttpGenerationClient {
    http: reqwest::Client,
    config: ProviderConfig,
}

/// Response body of the text endpoint.
#[derive(Debug, Deserialize)]
struct TextResponse {
    text: String,
}

impl HttpGenerationClient {
    /// Build a client with the per-call timeout baked into the reqwest
    /// client.
    pub fn new(config: ProviderConfig) -> Result<Self, CoreError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CoreError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    /// POST a prompt to the text endpoint and return the model's text.
    async fn generate_text(&self, prompt: &str) -> Result<String, CoreError> {
        let url = format!("{}/v1/text/generate", self.config.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&serde_json::json!({
                "model": self.config.text_model,
                "prompt": prompt,
            }))
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let body: TextResponse = response
            .json()
            .await
            .map_err(|e| CoreError::TransientProvider(format!("malformed text response: {e}")))?;
        Ok(body.text)
    }

    /// POST a multipart image request and return the raw image bytes.
    async fn request_image(&self, endpoint: &str, form: Form) -> Result<Vec<u8>, CoreError> {
        let url = format!("{}{endpoint}", self.config.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_transport(&e))?;
        if bytes.is_empty() {
            return Err(CoreError::TransientProvider(
                "provider returned an empty image".to_string(),
            ));
        }
        Ok(bytes.to_vec())
    }

    fn image_request_json(&self, prompt: &str) -> String {
        serde_json::json!({
            "model": self.config.image_model,
            "prompt": prompt,
        })
        .to_string()
    }
}

fn png_part(bytes: Vec<u8>, file_name: &'static str) -> Part {
    Part::bytes(bytes).file_name(file_name)
}

#[async_trait]
impl GenerationClient for HttpGenerationClient {
    async fn generate_outline(
        &self,
        idea: &str,
        extra_requirements: Option<&str>,
    ) -> Result<String, CoreError> {
        let prompt = prompts::outline_generation(idea, extra_requirements);
        tracing::debug!(model = %self.config.text_model, "Requesting outline");
        self.generate_text(&prompt).await
    }

    async fn parse_outline_text(&self, outline_text: &str) -> Result<String, CoreError> {
        let prompt = prompts::outline_parsing(outline_text);
        self.generate_text(&prompt).await
    }

    async fn describe_page(&self, request: &PageDescriptionRequest) -> Result<String, CoreError> {
        let prompt = prompts::page_description(
            &request.idea,
            &request.outline_text,
            &request.page,
            request.page_number,
        );
        tracing::debug!(page_number = request.page_number, "Requesting page description");
        self.generate_text(&prompt).await
    }

    async fn generate_image(&self, request: &ImageGenerationRequest) -> Result<Vec<u8>, CoreError> {
        let prompt = prompts::image_generation(
            &request.description,
            &request.outline_text,
            request.section.as_deref(),
            !request.material_refs.is_empty(),
            request.extra_requirements.as_deref(),
        );

        let mut form = Form::new().text("request", self.image_request_json(&prompt));
        if let Some(style) = &request.style_ref {
            form = form.part("style_ref", png_part(style.clone(), "style.png"));
        }
        for material in &request.material_refs {
            form = form.part("material", png_part(material.clone(), "material.png"));
        }

        self.request_image("/v1/images/generate", form).await
    }

    async fn edit_image(&self, request: &ImageEditRequest) -> Result<Vec<u8>, CoreError> {
        let prompt =
            prompts::image_edit(&request.instruction, request.original_description.as_deref());

        let form = Form::new()
            .text("request", self.image_request_json(&prompt))
            .part("image", png_part(request.current_image.clone(), "page.png"));

        self.request_image("/v1/images/edit", form).await
    }
}
