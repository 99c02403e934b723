//! Test doubles for the orchestrator: an in-memory [`DeckStore`] with
//! the same epoch/guard semantics as the Postgres implementation, and a
//! scripted [`GenerationClient`].

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Semaphore;
use uuid::Uuid;

use slidecraft_core::error::CoreError;
use slidecraft_core::outline::PageSpec;
use slidecraft_core::types::{EntityId, Epoch};
use slidecraft_db::models::page::Page;
use slidecraft_db::models::project::Project;
use slidecraft_db::models::status::{
    PageStatus, ProjectStatus, TaskErrorKind, TaskStatus,
};
use slidecraft_db::models::task::{NewTask, Task};
use slidecraft_pipeline::DeckStore;
use slidecraft_genai::{
    GenerationClient, ImageEditRequest, ImageGenerationRequest, PageDescriptionRequest,
};

// ---------------------------------------------------------------------------
// MemoryDeckStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct State {
    projects: HashMap<EntityId, Project>,
    pages: Vec<Page>,
    tasks: Vec<Task>,
}

/// In-memory [`DeckStore`] mirroring the SQL guards (conditional
/// begin_generation, epoch-checked finish, status-guarded task starts).
#[derive(Default)]
pub struct MemoryDeckStore {
    state: Mutex<State>,
}

impl MemoryDeckStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a draft project and return it.
    pub fn insert_project(&self, name: &str, idea: Option<&str>, allow_partial: bool) -> Project {
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            name: name.to_string(),
            status_id: ProjectStatus::Draft.id(),
            idea: idea.map(String::from),
            extra_requirements: None,
            template_image_ref: None,
            epoch: 0,
            allow_partial,
            created_at: now,
            updated_at: now,
        };
        self.state
            .lock()
            .unwrap()
            .projects
            .insert(project.id, project.clone());
        project
    }

    pub fn tasks_for(&self, project_id: EntityId) -> Vec<Task> {
        self.state
            .lock()
            .unwrap()
            .tasks
            .iter()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DeckStore for MemoryDeckStore {
    async fn find_project(&self, id: EntityId) -> Result<Option<Project>, CoreError> {
        Ok(self.state.lock().unwrap().projects.get(&id).cloned())
    }

    async fn begin_generation(
        &self,
        id: EntityId,
        idea: Option<&str>,
        extra_requirements: Option<&str>,
    ) -> Result<Option<Project>, CoreError> {
        let mut state = self.state.lock().unwrap();
        let Some(project) = state.projects.get_mut(&id) else {
            return Ok(None);
        };
        if project.status_id == ProjectStatus::Generating.id() {
            return Ok(None);
        }
        project.epoch += 1;
        project.status_id = ProjectStatus::Generating.id();
        if let Some(idea) = idea {
            project.idea = Some(idea.to_string());
        }
        if let Some(extra) = extra_requirements {
            project.extra_requirements = Some(extra.to_string());
        }
        project.updated_at = Utc::now();
        Ok(Some(project.clone()))
    }

    async fn bump_epoch(&self, id: EntityId) -> Result<Option<Project>, CoreError> {
        let mut state = self.state.lock().unwrap();
        let Some(project) = state.projects.get_mut(&id) else {
            return Ok(None);
        };
        project.epoch += 1;
        project.status_id = ProjectStatus::Generating.id();
        project.updated_at = Utc::now();
        Ok(Some(project.clone()))
    }

    async fn finish_generation(
        &self,
        id: EntityId,
        epoch: Epoch,
        status: ProjectStatus,
    ) -> Result<bool, CoreError> {
        let mut state = self.state.lock().unwrap();
        let Some(project) = state.projects.get_mut(&id) else {
            return Ok(false);
        };
        if project.epoch != epoch {
            return Ok(false);
        }
        project.status_id = status.id();
        project.updated_at = Utc::now();
        Ok(true)
    }

    async fn replace_pages(
        &self,
        project_id: EntityId,
        specs: &[PageSpec],
    ) -> Result<Vec<Page>, CoreError> {
        let mut state = self.state.lock().unwrap();
        state.pages.retain(|p| p.project_id != project_id);
        let now = Utc::now();
        let pages: Vec<Page> = specs
            .iter()
            .enumerate()
            .map(|(i, spec)| Page {
                id: Uuid::new_v4(),
                project_id,
                order_index: i as i32,
                title: Some(spec.title.clone()),
                section: spec.section.clone(),
                points: serde_json::json!(spec.points),
                description: None,
                image_ref: None,
                status_id: PageStatus::Pending.id(),
                describe_attempts: 0,
                image_attempts: 0,
                created_at: now,
                updated_at: now,
            })
            .collect();
        state.pages.extend(pages.clone());
        Ok(pages)
    }

    async fn find_page(&self, id: EntityId) -> Result<Option<Page>, CoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .pages
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn list_pages(&self, project_id: EntityId) -> Result<Vec<Page>, CoreError> {
        let mut pages: Vec<Page> = self
            .state
            .lock()
            .unwrap()
            .pages
            .iter()
            .filter(|p| p.project_id == project_id)
            .cloned()
            .collect();
        pages.sort_by_key(|p| p.order_index);
        Ok(pages)
    }

    async fn set_page_status(&self, id: EntityId, status: PageStatus) -> Result<(), CoreError> {
        let mut state = self.state.lock().unwrap();
        if let Some(page) = state.pages.iter_mut().find(|p| p.id == id) {
            page.status_id = status.id();
            page.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_page_description(
        &self,
        id: EntityId,
        description: &str,
        attempts: i32,
    ) -> Result<(), CoreError> {
        let mut state = self.state.lock().unwrap();
        if let Some(page) = state.pages.iter_mut().find(|p| p.id == id) {
            page.description = Some(description.to_string());
            page.describe_attempts = attempts;
            page.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn swap_page_image(
        &self,
        id: EntityId,
        image_ref: &str,
        attempts: i32,
    ) -> Result<Option<String>, CoreError> {
        let mut state = self.state.lock().unwrap();
        let Some(page) = state.pages.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        let old = page.image_ref.replace(image_ref.to_string());
        page.image_attempts = attempts;
        page.status_id = PageStatus::Completed.id();
        page.updated_at = Utc::now();
        Ok(old)
    }

    async fn create_task(&self, task: &NewTask) -> Result<Task, CoreError> {
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            project_id: task.project_id,
            page_id: task.page_id,
            kind_id: task.kind_id,
            status_id: TaskStatus::Pending.id(),
            attempt: task.attempt,
            epoch: task.epoch,
            error_kind_id: None,
            error_message: None,
            created_at: now,
            started_at: None,
            finished_at: None,
        };
        self.state.lock().unwrap().tasks.push(task.clone());
        Ok(task)
    }

    async fn mark_task_running(&self, id: EntityId) -> Result<bool, CoreError> {
        let mut state = self.state.lock().unwrap();
        let Some(task) = state.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(false);
        };
        if task.status_id != TaskStatus::Pending.id() {
            return Ok(false);
        }
        task.status_id = TaskStatus::Running.id();
        task.started_at = Some(Utc::now());
        Ok(true)
    }

    async fn mark_task_succeeded(&self, id: EntityId) -> Result<(), CoreError> {
        let mut state = self.state.lock().unwrap();
        if let Some(task) = state
            .tasks
            .iter_mut()
            .find(|t| t.id == id && t.status_id == TaskStatus::Running.id())
        {
            task.status_id = TaskStatus::Succeeded.id();
            task.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn mark_task_failed(
        &self,
        id: EntityId,
        error_kind: TaskErrorKind,
        error_message: &str,
    ) -> Result<(), CoreError> {
        let mut state = self.state.lock().unwrap();
        if let Some(task) = state
            .tasks
            .iter_mut()
            .find(|t| t.id == id && t.status_id == TaskStatus::Running.id())
        {
            task.status_id = TaskStatus::Failed.id();
            task.error_kind_id = Some(error_kind.id());
            task.error_message = Some(error_message.to_string());
            task.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn cancel_epoch_tasks(
        &self,
        project_id: EntityId,
        epoch: Epoch,
    ) -> Result<u64, CoreError> {
        let mut state = self.state.lock().unwrap();
        let mut cancelled = 0;
        for task in state.tasks.iter_mut().filter(|t| {
            t.project_id == project_id
                && t.epoch == epoch
                && (t.status_id == TaskStatus::Pending.id()
                    || t.status_id == TaskStatus::Running.id())
        }) {
            task.status_id = TaskStatus::Cancelled.id();
            task.finished_at = Some(Utc::now());
            cancelled += 1;
        }
        Ok(cancelled)
    }

    async fn list_epoch_tasks(
        &self,
        project_id: EntityId,
        epoch: Epoch,
    ) -> Result<Vec<Task>, CoreError> {
        let mut tasks: Vec<Task> = self
            .state
            .lock()
            .unwrap()
            .tasks
            .iter()
            .filter(|t| t.project_id == project_id && t.epoch == epoch)
            .cloned()
            .collect();
        tasks.reverse();
        Ok(tasks)
    }
}

// ---------------------------------------------------------------------------
// FakeClient
// ---------------------------------------------------------------------------

/// Scripted [`GenerationClient`].
///
/// Outline responses and per-stage errors are queues consumed in call
/// order; once a queue is empty, calls succeed with deterministic
/// content. Every call is appended to `log` for ordering assertions.
#[derive(Default)]
pub struct FakeClient {
    outlines: Mutex<VecDeque<String>>,
    outline_errors: Mutex<VecDeque<CoreError>>,
    describe_errors: Mutex<HashMap<String, VecDeque<CoreError>>>,
    image_errors: Mutex<HashMap<String, VecDeque<CoreError>>>,
    /// When set, outline calls wait for a permit before responding.
    outline_gate: Mutex<Option<Arc<Semaphore>>>,
    pub log: Mutex<Vec<String>>,
}

/// Build an outline response in the simple format.
pub fn outline_json(titles: &[&str]) -> String {
    let entries: Vec<serde_json::Value> = titles
        .iter()
        .map(|t| serde_json::json!({"title": t, "points": [format!("about {t}")]}))
        .collect();
    serde_json::json!(entries).to_string()
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an outline response; consumed in call order.
    pub fn push_outline(&self, json: &str) {
        self.outlines.lock().unwrap().push_back(json.to_string());
    }

    /// Queue an outline error served before any queued response.
    pub fn push_outline_error(&self, error: CoreError) {
        self.outline_errors.lock().unwrap().push_back(error);
    }

    /// Queue errors for the description stage of one page (by title).
    pub fn fail_describe(&self, title: &str, error: CoreError) {
        self.describe_errors
            .lock()
            .unwrap()
            .entry(title.to_string())
            .or_default()
            .push_back(error);
    }

    /// Queue errors for the image stage of one page (by title).
    pub fn fail_image(&self, title: &str, error: CoreError) {
        self.image_errors
            .lock()
            .unwrap()
            .entry(title.to_string())
            .or_default()
            .push_back(error);
    }

    /// Make outline calls block until `release_outlines` grants permits.
    pub fn gate_outlines(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.outline_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }

    fn pop_error(map: &Mutex<HashMap<String, VecDeque<CoreError>>>, key: &str) -> Option<CoreError> {
        map.lock().unwrap().get_mut(key).and_then(VecDeque::pop_front)
    }
}

/// Title a fake description was generated for.
fn title_of(description: &str) -> String {
    description
        .strip_prefix("Description of ")
        .unwrap_or(description)
        .to_string()
}

#[async_trait]
impl GenerationClient for FakeClient {
    async fn generate_outline(
        &self,
        _idea: &str,
        _extra_requirements: Option<&str>,
    ) -> Result<String, CoreError> {
        self.record("outline".to_string());
        // Consume the scripted response in call order, before parking on
        // the gate, so release order cannot reassign responses to calls.
        let error = self.outline_errors.lock().unwrap().pop_front();
        let outline = if error.is_none() {
            Some(self.outlines.lock().unwrap().pop_front().unwrap_or_else(|| {
                outline_json(&["Intro", "Body", "Outro"])
            }))
        } else {
            None
        };
        let gate = self.outline_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .map_err(|_| CoreError::Internal("gate closed".to_string()))?
                .forget();
        }
        if let Some(error) = error {
            return Err(error);
        }
        Ok(outline.expect("outline response consumed without error"))
    }

    async fn parse_outline_text(&self, outline_text: &str) -> Result<String, CoreError> {
        self.record("parse_outline".to_string());
        Ok(outline_text.to_string())
    }

    async fn describe_page(
        &self,
        request: &PageDescriptionRequest,
    ) -> Result<String, CoreError> {
        let title = request.page.title.clone();
        self.record(format!("describe:{title}"));
        // Yield so sibling pages interleave under the worker pool.
        tokio::time::sleep(Duration::from_millis(1)).await;
        if let Some(error) = Self::pop_error(&self.describe_errors, &title) {
            return Err(error);
        }
        Ok(format!("Description of {title}"))
    }

    async fn generate_image(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<Vec<u8>, CoreError> {
        let title = title_of(&request.description);
        self.record(format!("image:{title}"));
        tokio::time::sleep(Duration::from_millis(1)).await;
        if let Some(error) = Self::pop_error(&self.image_errors, &title) {
            return Err(error);
        }
        Ok(format!("image-bytes-{title}").into_bytes())
    }

    async fn edit_image(&self, request: &ImageEditRequest) -> Result<Vec<u8>, CoreError> {
        self.record(format!("edit:{}", request.instruction));
        Ok(format!("edited-{}", request.instruction).into_bytes())
    }
}
