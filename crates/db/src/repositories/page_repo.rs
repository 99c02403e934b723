//! Repository for the `pages` table.

use slidecraft_core::outline::PageSpec;
use slidecraft_core::types::EntityId;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::page::Page;
use crate::models::status::{PageStatus, StatusId};

/// Column list for `pages` queries.
const COLUMNS: &str = "\
    id, project_id, order_index, title, section, points, description, \
    image_ref, status_id, describe_attempts, image_attempts, \
    created_at, updated_at";

/// Provides CRUD operations for deck pages.
pub struct PageRepo;

impl PageRepo {
    /// Insert one page per outline spec with contiguous `order_index`
    /// starting at 0, all in `pending`. Runs in a single transaction.
    pub async fn create_from_specs(
        pool: &PgPool,
        project_id: EntityId,
        specs: &[PageSpec],
    ) -> Result<Vec<Page>, sqlx::Error> {
        let query = format!(
            "INSERT INTO pages (id, project_id, order_index, title, section, points, status_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );

        let mut tx = pool.begin().await?;
        let mut pages = Vec::with_capacity(specs.len());
        for (i, spec) in specs.iter().enumerate() {
            let page = sqlx::query_as::<_, Page>(&query)
                .bind(Uuid::new_v4())
                .bind(project_id)
                .bind(i as i32)
                .bind(&spec.title)
                .bind(&spec.section)
                .bind(serde_json::json!(spec.points))
                .bind(PageStatus::Pending.id())
                .fetch_one(&mut *tx)
                .await?;
            pages.push(page);
        }
        tx.commit().await?;
        Ok(pages)
    }

    /// Find a page by its ID.
    pub async fn find_by_id(pool: &PgPool, id: EntityId) -> Result<Option<Page>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM pages WHERE id = $1");
        sqlx::query_as::<_, Page>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a project's pages ordered by `order_index` ascending.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: EntityId,
    ) -> Result<Vec<Page>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM pages WHERE project_id = $1 ORDER BY order_index ASC");
        sqlx::query_as::<_, Page>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Update a page's status.
    pub async fn set_status(
        pool: &PgPool,
        id: EntityId,
        status: StatusId,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE pages SET status_id = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(status)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Store the generated description and bump the stage attempt counter.
    pub async fn set_description(
        pool: &PgPool,
        id: EntityId,
        description: &str,
        attempts: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE pages SET description = $2, describe_attempts = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(description)
        .bind(attempts)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Overwrite a page's description text (manual edit).
    pub async fn update_description_text(
        pool: &PgPool,
        id: EntityId,
        description: &str,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE pages SET description = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(description)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Swap the image reference and mark the page completed.
    ///
    /// Returns the previous reference so the caller can delete the old
    /// artifact after the swap commits.
    pub async fn swap_image_ref(
        pool: &PgPool,
        id: EntityId,
        image_ref: &str,
        attempts: i32,
    ) -> Result<Option<String>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let old: Option<String> =
            sqlx::query_scalar("SELECT image_ref FROM pages WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        sqlx::query(
            "UPDATE pages SET image_ref = $2, image_attempts = $3, status_id = $4, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(image_ref)
        .bind(attempts)
        .bind(PageStatus::Completed.id())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(old)
    }

    /// Delete every page of a project. Used when a new epoch regenerates
    /// an existing deck: the fresh outline inserts replacement rows via
    /// [`Self::create_from_specs`]. Returns the number of rows removed.
    pub async fn delete_by_project(pool: &PgPool, project_id: EntityId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM pages WHERE project_id = $1")
            .bind(project_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete a single page, then renumber the survivors contiguously.
    ///
    /// Returns the deleted page's image reference (if any) so the caller
    /// can remove the artifact.
    pub async fn delete_and_renumber(
        pool: &PgPool,
        page: &Page,
    ) -> Result<Option<String>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM pages WHERE id = $1")
            .bind(page.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "UPDATE pages SET order_index = order_index - 1, updated_at = NOW() \
             WHERE project_id = $1 AND order_index > $2",
        )
        .bind(page.project_id)
        .bind(page.order_index)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(page.image_ref.clone())
    }

    /// Apply a computed renumbering (from `slidecraft_core::ordering`).
    ///
    /// The `uq_pages_project_order` constraint is deferred, so the swap
    /// is safe inside one transaction.
    pub async fn apply_order(
        pool: &PgPool,
        project_id: EntityId,
        numbering: &[(EntityId, i32)],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        for (page_id, order_index) in numbering {
            sqlx::query(
                "UPDATE pages SET order_index = $3, updated_at = NOW() \
                 WHERE id = $1 AND project_id = $2",
            )
            .bind(page_id)
            .bind(project_id)
            .bind(order_index)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
