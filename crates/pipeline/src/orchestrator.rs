//! Central generation orchestrator.
//!
//! Owns the epoch lifecycle and drives the two-level task DAG: one
//! outline task, then one description task and one image task per page.
//! Pages progress independently under a bounded worker pool; a new
//! epoch (start or regenerate) cancels the previous one, and every
//! state mutation is guarded by an epoch check so results from a
//! superseded generation are discarded rather than applied.
//!
//! Held in the API's `AppState` as an `Arc<Orchestrator>`.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use slidecraft_core::error::CoreError;
use slidecraft_core::outline::{parse_outline, render_outline, PageSpec};
use slidecraft_core::retry::RetryPolicy;
use slidecraft_core::types::{EntityId, Epoch};
use slidecraft_db::models::page::Page;
use slidecraft_db::models::project::Project;
use slidecraft_db::models::status::{PageStatus, ProjectStatus, TaskErrorKind, TaskKind};
use slidecraft_db::models::task::NewTask;
use slidecraft_genai::{
    GenerationClient, ImageEditRequest, ImageGenerationRequest, PageDescriptionRequest,
};
use slidecraft_storage::ArtifactStore;

use crate::events::{DeckEvent, EventBus};
use crate::store::DeckStore;

// ---------------------------------------------------------------------------
// Configuration and request DTOs
// ---------------------------------------------------------------------------

/// Default number of concurrent provider calls across all projects.
pub const DEFAULT_WORKER_POOL_SIZE: usize = 4;

/// Orchestrator tunables.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Size of the shared worker pool bounding concurrent provider calls.
    pub worker_pool_size: usize,
    /// Retry policy applied to every task stage.
    pub retry: RetryPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: DEFAULT_WORKER_POOL_SIZE,
            retry: RetryPolicy::default(),
        }
    }
}

/// Request to start generating a deck.
///
/// Either `idea` (free-form, the outline is generated) or `outline_text`
/// (user-authored, the outline is structured without rewriting) must be
/// present here or already stored on the project.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartGeneration {
    pub idea: Option<String>,
    pub extra_requirements: Option<String>,
    pub outline_text: Option<String>,
}

// ---------------------------------------------------------------------------
// Internal work dispatch
// ---------------------------------------------------------------------------

/// One unit of provider work, matched to a task kind.
enum Work<'a> {
    Outline {
        idea: &'a str,
        extra_requirements: Option<&'a str>,
        outline_text: Option<&'a str>,
    },
    Describe(&'a PageDescriptionRequest),
    GenerateImage(&'a ImageGenerationRequest),
    EditImage(&'a ImageEditRequest),
}

enum WorkOutput {
    Text(String),
    Image(Vec<u8>),
}

/// Prompt context shared by every page driver of one epoch.
struct PageContext {
    idea: String,
    extra_requirements: Option<String>,
    outline_text: String,
    style_ref: Option<Vec<u8>>,
    materials: Vec<Vec<u8>>,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator {
    store: Arc<dyn DeckStore>,
    client: Arc<dyn GenerationClient>,
    artifacts: ArtifactStore,
    bus: Arc<EventBus>,
    permits: Arc<Semaphore>,
    retry: RetryPolicy,
    /// One cancellation token per project, owned by its current epoch.
    epochs: Mutex<HashMap<EntityId, CancellationToken>>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn DeckStore>,
        client: Arc<dyn GenerationClient>,
        artifacts: ArtifactStore,
        bus: Arc<EventBus>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            client,
            artifacts,
            bus,
            permits: Arc::new(Semaphore::new(config.worker_pool_size)),
            retry: config.retry,
            epochs: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe to generation progress events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<DeckEvent> {
        self.bus.subscribe()
    }

    // -- Epoch entry points --

    /// Start generating a deck for the project.
    ///
    /// Opens a new epoch and returns immediately; generation continues in
    /// the background. Fails with [`CoreError::Conflict`] when an epoch
    /// is already active for the project.
    pub async fn start_generation(
        self: Arc<Self>,
        project_id: EntityId,
        input: StartGeneration,
    ) -> Result<Project, CoreError> {
        let project = self
            .store
            .find_project(project_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "project",
                id: project_id,
            })?;

        let idea = non_empty(input.idea.as_deref());
        let outline_text = non_empty(input.outline_text.as_deref());
        if idea.is_none() && outline_text.is_none() && non_empty(project.idea.as_deref()).is_none()
        {
            return Err(CoreError::Validation(
                "Either an idea or an outline text is required to start generation".to_string(),
            ));
        }

        let project = self
            .store
            .begin_generation(project_id, idea, input.extra_requirements.as_deref())
            .await?
            .ok_or_else(|| {
                CoreError::Conflict(format!(
                    "A generation is already running for project {project_id}"
                ))
            })?;

        self.launch_epoch(project.clone(), outline_text.map(String::from))
            .await;
        Ok(project)
    }

    /// Regenerate the deck from scratch.
    ///
    /// Cancels the current epoch's tasks (in-flight provider calls are
    /// allowed to finish; their results are discarded), then opens a new
    /// epoch with the stored idea.
    pub async fn regenerate(self: Arc<Self>, project_id: EntityId) -> Result<Project, CoreError> {
        let project = self
            .store
            .find_project(project_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "project",
                id: project_id,
            })?;
        if non_empty(project.idea.as_deref()).is_none() {
            return Err(CoreError::Validation(
                "Project has no idea to regenerate from".to_string(),
            ));
        }

        self.abort(project_id).await;
        let cancelled = self
            .store
            .cancel_epoch_tasks(project_id, project.epoch)
            .await?;
        if cancelled > 0 {
            tracing::info!(project_id = %project_id, epoch = project.epoch, cancelled, "Cancelled tasks of superseded epoch");
        }

        let project = self
            .store
            .bump_epoch(project_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "project",
                id: project_id,
            })?;

        self.launch_epoch(project.clone(), None).await;
        Ok(project)
    }

    /// Cancel the project's in-flight epoch driver, if any. Task rows and
    /// project status are left to the caller.
    pub async fn abort(&self, project_id: EntityId) {
        if let Some(token) = self.epochs.lock().await.remove(&project_id) {
            token.cancel();
        }
    }

    async fn launch_epoch(self: Arc<Self>, project: Project, outline_text: Option<String>) {
        let token = CancellationToken::new();
        if let Some(old) = self
            .epochs
            .lock()
            .await
            .insert(project.id, token.clone())
        {
            old.cancel();
        }

        self.bus.publish(
            DeckEvent::new("generation.started", project.id, project.epoch)
                .with_payload(serde_json::json!({ "epoch": project.epoch })),
        );

        tokio::spawn(async move {
            self.run_epoch(project, outline_text, token).await;
        });
    }

    // -- Per-page operations --

    /// Apply an edit instruction to a completed page's image.
    ///
    /// Runs synchronously (the caller awaits the new image), swaps the
    /// image reference atomically, and deletes the old artifact after
    /// the swap commits. Other pages are untouched.
    pub async fn edit_page(
        &self,
        page_id: EntityId,
        instruction: &str,
    ) -> Result<Page, CoreError> {
        if instruction.trim().is_empty() {
            return Err(CoreError::Validation(
                "Edit instruction must not be empty".to_string(),
            ));
        }
        let page = self.require_page(page_id).await?;
        if page.status_id != PageStatus::Completed.id() {
            return Err(CoreError::Conflict(
                "Only completed pages can be edited".to_string(),
            ));
        }
        let project = self.require_project(page.project_id).await?;
        let image_ref = page.image_ref.clone().ok_or_else(|| {
            CoreError::Internal(format!("completed page {page_id} has no image reference"))
        })?;

        let request = ImageEditRequest {
            current_image: self.artifacts.get(&image_ref).await?,
            instruction: instruction.to_string(),
            original_description: page.description.clone(),
        };
        let token = CancellationToken::new();
        let (output, _attempts) = self
            .run_task(
                project.id,
                Some(page_id),
                TaskKind::ImageEdit,
                project.epoch,
                &token,
                Work::EditImage(&request),
            )
            .await?;

        if !self.is_current(project.id, project.epoch).await? {
            return Err(CoreError::Conflict(
                "Project was regenerated while the edit was in flight".to_string(),
            ));
        }
        self.commit_image(
            project.id,
            project.epoch,
            &page,
            output,
            page.image_attempts,
            "page.edited",
        )
        .await?;
        self.require_page(page_id).await
    }

    /// Regenerate a single page's description without touching siblings.
    ///
    /// Rejected while a full generation is running; use regenerate for
    /// that. The page's image (if any) is kept and may now lag the text.
    pub async fn regenerate_page_description(
        &self,
        page_id: EntityId,
    ) -> Result<Page, CoreError> {
        let page = self.require_page(page_id).await?;
        let project = self.require_quiescent_project(page.project_id).await?;
        let pages = self.store.list_pages(project.id).await?;

        let request = PageDescriptionRequest {
            idea: project.idea.clone().unwrap_or_default(),
            outline_text: outline_context(&pages),
            page: spec_of(&page),
            page_number: page.order_index as usize + 1,
        };
        let token = CancellationToken::new();
        let (output, attempts) = self
            .run_task(
                project.id,
                Some(page_id),
                TaskKind::PageDescription,
                project.epoch,
                &token,
                Work::Describe(&request),
            )
            .await?;

        if !self.is_current(project.id, project.epoch).await? {
            return Err(CoreError::Conflict(
                "Project was regenerated while the description was in flight".to_string(),
            ));
        }
        let WorkOutput::Text(description) = output else {
            return Err(CoreError::Internal(
                "description task produced non-text output".to_string(),
            ));
        };
        self.store
            .set_page_description(page_id, &description, attempts)
            .await?;
        // A page with an image stays presentable; one without goes back
        // to pending until its image is regenerated.
        let status = if page.image_ref.is_some() {
            PageStatus::Completed
        } else {
            PageStatus::Pending
        };
        self.store.set_page_status(page_id, status).await?;
        self.bus.publish(
            DeckEvent::new("page.described", project.id, project.epoch).with_page(page_id),
        );
        self.require_page(page_id).await
    }

    /// Regenerate a single page's image from its current description.
    pub async fn regenerate_page_image(&self, page_id: EntityId) -> Result<Page, CoreError> {
        let page = self.require_page(page_id).await?;
        let project = self.require_quiescent_project(page.project_id).await?;
        let description = page.description.clone().ok_or_else(|| {
            CoreError::Conflict("Page has no description to render an image from".to_string())
        })?;
        let pages = self.store.list_pages(project.id).await?;
        let (style_ref, materials) = self.load_image_inputs(&project).await;

        let request = ImageGenerationRequest {
            description,
            outline_text: outline_context(&pages),
            section: page.section.clone(),
            style_ref,
            material_refs: materials,
            extra_requirements: project.extra_requirements.clone(),
        };
        let token = CancellationToken::new();
        self.store
            .set_page_status(page_id, PageStatus::GeneratingImage)
            .await?;
        let result = self
            .run_task(
                project.id,
                Some(page_id),
                TaskKind::ImageGeneration,
                project.epoch,
                &token,
                Work::GenerateImage(&request),
            )
            .await;

        let (output, attempts) = match result {
            Ok(v) => v,
            Err(e) => {
                if self.is_current(project.id, project.epoch).await? {
                    self.store
                        .set_page_status(page_id, PageStatus::Failed)
                        .await?;
                }
                return Err(e);
            }
        };
        if !self.is_current(project.id, project.epoch).await? {
            return Err(CoreError::Conflict(
                "Project was regenerated while the image was in flight".to_string(),
            ));
        }
        self.commit_image(
            project.id,
            project.epoch,
            &page,
            output,
            attempts,
            "page.image_completed",
        )
        .await?;
        self.require_page(page_id).await
    }

    // -- Epoch driver --

    async fn run_epoch(
        self: Arc<Self>,
        project: Project,
        outline_text: Option<String>,
        token: CancellationToken,
    ) {
        let project_id = project.id;
        let epoch = project.epoch;
        if let Err(e) = Arc::clone(&self)
            .drive_epoch(project, outline_text, token)
            .await
        {
            tracing::error!(project_id = %project_id, epoch, error = %e, "Generation epoch failed");
            self.fail_epoch(project_id, epoch, &e).await;
        }
    }

    async fn drive_epoch(
        self: Arc<Self>,
        project: Project,
        outline_text: Option<String>,
        token: CancellationToken,
    ) -> Result<(), CoreError> {
        let project_id = project.id;
        let epoch = project.epoch;
        let idea = project.idea.clone().unwrap_or_default();

        // Level one: the outline task.
        let work = Work::Outline {
            idea: &idea,
            extra_requirements: project.extra_requirements.as_deref(),
            outline_text: outline_text.as_deref(),
        };
        let (output, _attempts) = self
            .run_task(project_id, None, TaskKind::Outline, epoch, &token, work)
            .await?;
        let WorkOutput::Text(raw) = output else {
            return Err(CoreError::Internal(
                "outline task produced non-text output".to_string(),
            ));
        };
        let specs = parse_outline(&raw)?;

        if token.is_cancelled() || !self.is_current(project_id, epoch).await? {
            tracing::debug!(project_id = %project_id, epoch, "Discarding outline of superseded epoch");
            return Ok(());
        }

        // Replace any previous deck, then clean up its orphaned images.
        let old_refs: Vec<String> = self
            .store
            .list_pages(project_id)
            .await?
            .into_iter()
            .filter_map(|p| p.image_ref)
            .collect();
        let pages = self.store.replace_pages(project_id, &specs).await?;
        for reference in old_refs {
            if let Err(e) = self.artifacts.delete(&reference).await {
                tracing::warn!(reference, error = %e, "Failed to delete superseded page image");
            }
        }
        self.bus.publish(
            DeckEvent::new("outline.completed", project_id, epoch)
                .with_payload(serde_json::json!({ "pages": pages.len() })),
        );

        // Level two: per-page description and image tasks, fanned out
        // under the shared worker pool.
        let (style_ref, materials) = self.load_image_inputs(&project).await;
        let ctx = Arc::new(PageContext {
            idea,
            extra_requirements: project.extra_requirements.clone(),
            outline_text: render_outline(&specs),
            style_ref,
            materials,
        });

        let mut drivers = JoinSet::new();
        for page in pages {
            let this = Arc::clone(&self);
            let ctx = Arc::clone(&ctx);
            let page_token = token.child_token();
            drivers.spawn(async move {
                this.run_page(page, ctx, epoch, page_token).await;
            });
        }
        while drivers.join_next().await.is_some() {}

        if token.is_cancelled() {
            // A newer epoch owns the project status now.
            return Ok(());
        }

        let pages = self.store.list_pages(project_id).await?;
        let completed = count_status(&pages, PageStatus::Completed);
        let failed = count_status(&pages, PageStatus::Failed);
        let status = terminal_status(completed, failed, project.allow_partial);

        if self.store.finish_generation(project_id, epoch, status).await? {
            let event_type = match status {
                ProjectStatus::Completed => "generation.completed",
                _ => "generation.failed",
            };
            tracing::info!(project_id = %project_id, epoch, completed, failed, status = status.as_str(), "Generation epoch finished");
            self.bus.publish(
                DeckEvent::new(event_type, project_id, epoch).with_payload(serde_json::json!({
                    "completed_pages": completed,
                    "failed_pages": failed,
                })),
            );
        }
        Ok(())
    }

    async fn run_page(
        self: Arc<Self>,
        page: Page,
        ctx: Arc<PageContext>,
        epoch: Epoch,
        token: CancellationToken,
    ) {
        let project_id = page.project_id;
        let page_id = page.id;

        // Description stage.
        if self.stage_preempted(project_id, epoch, &token).await {
            return;
        }
        if let Err(e) = self
            .store
            .set_page_status(page_id, PageStatus::Describing)
            .await
        {
            tracing::error!(page_id = %page_id, error = %e, "Failed to mark page describing");
            return;
        }
        self.bus
            .publish(DeckEvent::new("page.describing", project_id, epoch).with_page(page_id));

        let request = PageDescriptionRequest {
            idea: ctx.idea.clone(),
            outline_text: ctx.outline_text.clone(),
            page: spec_of(&page),
            page_number: page.order_index as usize + 1,
        };
        let description = match self
            .run_task(
                project_id,
                Some(page_id),
                TaskKind::PageDescription,
                epoch,
                &token,
                Work::Describe(&request),
            )
            .await
        {
            Ok((WorkOutput::Text(text), attempts)) => {
                if self.stage_preempted(project_id, epoch, &token).await {
                    return;
                }
                if let Err(e) = self
                    .store
                    .set_page_description(page_id, &text, attempts)
                    .await
                {
                    tracing::error!(page_id = %page_id, error = %e, "Failed to store description");
                    return;
                }
                self.bus
                    .publish(DeckEvent::new("page.described", project_id, epoch).with_page(page_id));
                text
            }
            Ok((WorkOutput::Image(_), _)) => {
                tracing::error!(page_id = %page_id, "Description task produced image output");
                return;
            }
            Err(e) => {
                self.fail_page(project_id, page_id, epoch, &token, "description", &e)
                    .await;
                return;
            }
        };

        // Image stage; only reachable after the description succeeded.
        if self.stage_preempted(project_id, epoch, &token).await {
            return;
        }
        if let Err(e) = self
            .store
            .set_page_status(page_id, PageStatus::GeneratingImage)
            .await
        {
            tracing::error!(page_id = %page_id, error = %e, "Failed to mark page generating_image");
            return;
        }

        let request = ImageGenerationRequest {
            description,
            outline_text: ctx.outline_text.clone(),
            section: page.section.clone(),
            style_ref: ctx.style_ref.clone(),
            material_refs: ctx.materials.clone(),
            extra_requirements: ctx.extra_requirements.clone(),
        };
        match self
            .run_task(
                project_id,
                Some(page_id),
                TaskKind::ImageGeneration,
                epoch,
                &token,
                Work::GenerateImage(&request),
            )
            .await
        {
            Ok((output, attempts)) => {
                if self.stage_preempted(project_id, epoch, &token).await {
                    return;
                }
                if let Err(e) = self
                    .commit_image(project_id, epoch, &page, output, attempts, "page.image_completed")
                    .await
                {
                    tracing::error!(page_id = %page_id, error = %e, "Failed to commit page image");
                    self.fail_page(project_id, page_id, epoch, &token, "image", &e)
                        .await;
                }
            }
            Err(e) => {
                self.fail_page(project_id, page_id, epoch, &token, "image", &e)
                    .await;
            }
        }
    }

    // -- Task execution --

    /// Run one unit of provider work as a sequence of task rows, one per
    /// attempt, under the retry policy. Returns the output and the
    /// number of attempts consumed.
    async fn run_task(
        &self,
        project_id: EntityId,
        page_id: Option<EntityId>,
        kind: TaskKind,
        epoch: Epoch,
        token: &CancellationToken,
        work: Work<'_>,
    ) -> Result<(WorkOutput, i32), CoreError> {
        for attempt in 1..=self.retry.max_attempts {
            if token.is_cancelled() {
                return Err(CoreError::Conflict("Generation was cancelled".to_string()));
            }

            let task = self
                .store
                .create_task(&NewTask {
                    project_id,
                    page_id,
                    kind_id: kind.id(),
                    attempt: attempt as i32,
                    epoch,
                })
                .await?;
            if !self.store.mark_task_running(task.id).await? {
                tracing::error!(task_id = %task.id, kind = kind.as_str(), "Started a task that was not pending");
            }

            // The permit is held only for the provider call itself; DB
            // writes and backoff sleeps never occupy the worker pool.
            let result = {
                let _permit = self
                    .permits
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| CoreError::Internal("Worker pool is closed".to_string()))?;
                self.dispatch(&work).await
            };

            match result {
                Ok(output) => {
                    self.store.mark_task_succeeded(task.id).await?;
                    return Ok((output, attempt as i32));
                }
                Err(e) => {
                    let error_kind = if e.is_transient() {
                        TaskErrorKind::Transient
                    } else {
                        TaskErrorKind::Permanent
                    };
                    self.store
                        .mark_task_failed(task.id, error_kind, &e.to_string())
                        .await?;

                    if !self.retry.should_retry(attempt, &e) {
                        return Err(e);
                    }
                    let delay = self.retry.delay(attempt);
                    tracing::warn!(
                        project_id = %project_id,
                        kind = kind.as_str(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient task failure, backing off before retry"
                    );
                    tokio::select! {
                        _ = token.cancelled() => {
                            return Err(CoreError::Conflict("Generation was cancelled".to_string()));
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
        Err(CoreError::Internal(
            "Retry loop exited without a result".to_string(),
        ))
    }

    async fn dispatch(&self, work: &Work<'_>) -> Result<WorkOutput, CoreError> {
        match work {
            Work::Outline {
                outline_text: Some(text),
                ..
            } => self
                .client
                .parse_outline_text(text)
                .await
                .map(WorkOutput::Text),
            Work::Outline {
                idea,
                extra_requirements,
                ..
            } => self
                .client
                .generate_outline(idea, *extra_requirements)
                .await
                .map(WorkOutput::Text),
            Work::Describe(request) => self
                .client
                .describe_page(request)
                .await
                .map(WorkOutput::Text),
            Work::GenerateImage(request) => self
                .client
                .generate_image(request)
                .await
                .map(WorkOutput::Image),
            Work::EditImage(request) => {
                self.client.edit_image(request).await.map(WorkOutput::Image)
            }
        }
    }

    // -- Shared helpers --

    /// Store image output as an artifact and swap it into the page,
    /// deleting the superseded artifact after the swap commits.
    async fn commit_image(
        &self,
        project_id: EntityId,
        epoch: Epoch,
        page: &Page,
        output: WorkOutput,
        attempts: i32,
        event_type: &str,
    ) -> Result<(), CoreError> {
        let WorkOutput::Image(bytes) = output else {
            return Err(CoreError::Internal(
                "image task produced non-image output".to_string(),
            ));
        };
        let reference = self.artifacts.put_page_image(project_id, &bytes).await?;
        let old = self
            .store
            .swap_page_image(page.id, &reference, attempts)
            .await?;
        if let Some(old) = old.filter(|old| old != &reference) {
            if let Err(e) = self.artifacts.delete(&old).await {
                tracing::warn!(reference = old, error = %e, "Failed to delete replaced page image");
            }
        }
        self.bus.publish(
            DeckEvent::new(event_type, project_id, epoch)
                .with_page(page.id)
                .with_payload(serde_json::json!({ "order_index": page.order_index })),
        );
        Ok(())
    }

    async fn fail_page(
        &self,
        project_id: EntityId,
        page_id: EntityId,
        epoch: Epoch,
        token: &CancellationToken,
        stage: &str,
        error: &CoreError,
    ) {
        if self.stage_preempted(project_id, epoch, token).await {
            return;
        }
        tracing::warn!(page_id = %page_id, stage, error = %error, "Page stage failed permanently");
        if let Err(e) = self.store.set_page_status(page_id, PageStatus::Failed).await {
            tracing::error!(page_id = %page_id, error = %e, "Failed to mark page failed");
            return;
        }
        self.bus.publish(
            DeckEvent::new("page.failed", project_id, epoch)
                .with_page(page_id)
                .with_payload(serde_json::json!({
                    "stage": stage,
                    "error": error.to_string(),
                })),
        );
    }

    async fn fail_epoch(&self, project_id: EntityId, epoch: Epoch, error: &CoreError) {
        match self
            .store
            .finish_generation(project_id, epoch, ProjectStatus::Failed)
            .await
        {
            Ok(true) => {
                self.bus.publish(
                    DeckEvent::new("generation.failed", project_id, epoch)
                        .with_payload(serde_json::json!({ "error": error.to_string() })),
                );
            }
            Ok(false) => {
                tracing::debug!(project_id = %project_id, epoch, "Skipping failure of superseded epoch");
            }
            Err(e) => {
                tracing::error!(project_id = %project_id, epoch, error = %e, "Failed to record epoch failure");
            }
        }
    }

    /// Whether this stage's result must be discarded: the epoch was
    /// cancelled or the project has moved on to a newer epoch.
    async fn stage_preempted(
        &self,
        project_id: EntityId,
        epoch: Epoch,
        token: &CancellationToken,
    ) -> bool {
        if token.is_cancelled() {
            return true;
        }
        match self.is_current(project_id, epoch).await {
            Ok(current) => !current,
            Err(e) => {
                tracing::error!(project_id = %project_id, error = %e, "Epoch check failed; discarding result");
                true
            }
        }
    }

    async fn is_current(&self, project_id: EntityId, epoch: Epoch) -> Result<bool, CoreError> {
        Ok(self
            .store
            .find_project(project_id)
            .await?
            .is_some_and(|p| p.epoch == epoch))
    }

    /// Load the template and material images for image generation.
    /// Missing or unreadable inputs degrade to absent rather than
    /// failing the page.
    async fn load_image_inputs(&self, project: &Project) -> (Option<Vec<u8>>, Vec<Vec<u8>>) {
        let style_ref = match &project.template_image_ref {
            Some(reference) => match self.artifacts.get(reference).await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    tracing::warn!(reference, error = %e, "Template image unreadable; generating without style reference");
                    None
                }
            },
            None => None,
        };

        let mut materials = Vec::new();
        match self.artifacts.list_material_refs(project.id).await {
            Ok(refs) => {
                for reference in refs {
                    match self.artifacts.get(&reference).await {
                        Ok(bytes) => materials.push(bytes),
                        Err(e) => {
                            tracing::warn!(reference, error = %e, "Material image unreadable; skipping")
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(project_id = %project.id, error = %e, "Failed to list material images")
            }
        }
        (style_ref, materials)
    }

    async fn require_page(&self, page_id: EntityId) -> Result<Page, CoreError> {
        self.store
            .find_page(page_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "page",
                id: page_id,
            })
    }

    async fn require_project(&self, project_id: EntityId) -> Result<Project, CoreError> {
        self.store
            .find_project(project_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "project",
                id: project_id,
            })
    }

    /// Find the project and reject the call while a full generation is
    /// running; single-page operations must not race the epoch driver.
    async fn require_quiescent_project(
        &self,
        project_id: EntityId,
    ) -> Result<Project, CoreError> {
        let project = self.require_project(project_id).await?;
        if project.status_id == ProjectStatus::Generating.id() {
            return Err(CoreError::Conflict(
                "Project is generating; wait for it to finish or regenerate".to_string(),
            ));
        }
        Ok(project)
    }
}

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn spec_of(page: &Page) -> PageSpec {
    PageSpec {
        title: page.title.clone().unwrap_or_default(),
        points: page.points_vec(),
        section: page.section.clone(),
    }
}

fn outline_context(pages: &[Page]) -> String {
    let specs: Vec<PageSpec> = pages.iter().map(spec_of).collect();
    render_outline(&specs)
}

fn count_status(pages: &[Page], status: PageStatus) -> usize {
    pages.iter().filter(|p| p.status_id == status.id()).count()
}

/// Decide the project's terminal status from page outcomes.
///
/// Best effort by default: a deck with at least one completed page is a
/// success even when some pages failed. With `allow_partial` off, any
/// failed page fails the whole project.
fn terminal_status(completed: usize, failed: usize, allow_partial: bool) -> ProjectStatus {
    if completed == 0 {
        return ProjectStatus::Failed;
    }
    if failed > 0 && !allow_partial {
        return ProjectStatus::Failed;
    }
    ProjectStatus::Completed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_completed_pages_fails_project() {
        assert_eq!(terminal_status(0, 5, true), ProjectStatus::Failed);
        assert_eq!(terminal_status(0, 0, true), ProjectStatus::Failed);
    }

    #[test]
    fn partial_deck_completes_by_default() {
        assert_eq!(terminal_status(4, 1, true), ProjectStatus::Completed);
    }

    #[test]
    fn strict_policy_fails_on_any_page_failure() {
        assert_eq!(terminal_status(4, 1, false), ProjectStatus::Failed);
        assert_eq!(terminal_status(5, 0, false), ProjectStatus::Completed);
    }

    #[test]
    fn non_empty_trims_and_filters() {
        assert_eq!(non_empty(Some("  idea  ")), Some("idea"));
        assert_eq!(non_empty(Some("   ")), None);
        assert_eq!(non_empty(None), None);
    }
}
