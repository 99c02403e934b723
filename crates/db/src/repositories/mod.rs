//! Repositories: one unit struct of associated async functions per table.

mod page_repo;
mod project_repo;
mod task_repo;

pub use page_repo::PageRepo;
pub use project_repo::ProjectRepo;
pub use task_repo::TaskRepo;
