//! Artifact store: content-addressed image files under a local root.
//!
//! References are opaque path-like strings (`{project}/pages/{hash}.png`)
//! meaningful only to the store. Writes go to a temp file first and are
//! atomically renamed into place, so a reader can never observe a
//! partially written image. All failures surface as
//! [`CoreError::Storage`], which the task layer treats as transient.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use slidecraft_core::error::CoreError;
use slidecraft_core::types::EntityId;

/// Length of the content-hash prefix used in file names.
const HASH_PREFIX_LEN: usize = 16;

/// Local-filesystem artifact store.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at `root`. Directories are created lazily
    /// on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store a generated page image. Returns its opaque reference.
    ///
    /// The file name is derived from the content hash, so a re-render
    /// that produces different bytes gets a different reference and the
    /// swap in the database is what makes it visible.
    pub async fn put_page_image(
        &self,
        project_id: EntityId,
        bytes: &[u8],
    ) -> Result<String, CoreError> {
        let reference = format!(
            "{project_id}/pages/{}.png",
            content_hash(bytes)
        );
        self.write_atomic(&reference, bytes).await?;
        Ok(reference)
    }

    /// Store an uploaded template (style reference) image.
    pub async fn put_template_image(
        &self,
        project_id: EntityId,
        bytes: &[u8],
    ) -> Result<String, CoreError> {
        let reference = format!(
            "{project_id}/template/{}.png",
            content_hash(bytes)
        );
        self.write_atomic(&reference, bytes).await?;
        Ok(reference)
    }

    /// Store an uploaded material image.
    pub async fn put_material_image(
        &self,
        project_id: EntityId,
        bytes: &[u8],
    ) -> Result<String, CoreError> {
        let reference = format!(
            "{project_id}/materials/{}.png",
            content_hash(bytes)
        );
        self.write_atomic(&reference, bytes).await?;
        Ok(reference)
    }

    /// List the references of a project's material images, sorted by
    /// file name so prompt assembly sees a stable order.
    pub async fn list_material_refs(
        &self,
        project_id: EntityId,
    ) -> Result<Vec<String>, CoreError> {
        let dir = self.root.join(project_id.to_string()).join("materials");
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(CoreError::Storage(format!(
                    "failed to list materials for project {project_id}: {e}"
                )))
            }
        };

        let mut refs = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CoreError::Storage(format!("failed to read materials dir: {e}")))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.ends_with(".tmp") {
                refs.push(format!("{project_id}/materials/{name}"));
            }
        }
        refs.sort();
        Ok(refs)
    }

    /// Read an artifact by reference.
    pub async fn get(&self, reference: &str) -> Result<Vec<u8>, CoreError> {
        let path = self.resolve(reference)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| CoreError::Storage(format!("failed to read {reference}: {e}")))
    }

    /// Delete an artifact by reference. Missing files are not an error;
    /// delete is idempotent.
    pub async fn delete(&self, reference: &str) -> Result<(), CoreError> {
        let path = self.resolve(reference)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::Storage(format!(
                "failed to delete {reference}: {e}"
            ))),
        }
    }

    /// Delete every artifact belonging to a project.
    pub async fn delete_project(&self, project_id: EntityId) -> Result<(), CoreError> {
        let dir = self.root.join(project_id.to_string());
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::Storage(format!(
                "failed to delete artifacts for project {project_id}: {e}"
            ))),
        }
    }

    /// Resolve a reference to an absolute path, rejecting anything that
    /// could escape the store root.
    fn resolve(&self, reference: &str) -> Result<PathBuf, CoreError> {
        validate_reference(reference)?;
        Ok(self.root.join(reference))
    }

    /// Write bytes to `<root>/<reference>` via temp-file-then-rename.
    async fn write_atomic(&self, reference: &str, bytes: &[u8]) -> Result<(), CoreError> {
        let path = self.resolve(reference)?;
        let parent = path
            .parent()
            .ok_or_else(|| CoreError::Storage(format!("reference has no parent: {reference}")))?;
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CoreError::Storage(format!("failed to create {parent:?}: {e}")))?;

        // Temp file in the same directory so the rename stays on one
        // filesystem and is atomic.
        let tmp = parent.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| CoreError::Storage(format!("failed to write temp file: {e}")))?;

        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(CoreError::Storage(format!(
                "failed to commit {reference}: {e}"
            )));
        }
        Ok(())
    }
}

/// First [`HASH_PREFIX_LEN`] hex chars of the SHA-256 of the content.
fn content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex[..HASH_PREFIX_LEN].to_string()
}

/// Reject references that are absolute or contain parent-dir components.
fn validate_reference(reference: &str) -> Result<(), CoreError> {
    let path = Path::new(reference);
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|c| !matches!(c, std::path::Component::Normal(_)));
    if reference.is_empty() || escapes {
        return Err(CoreError::Storage(format!(
            "invalid artifact reference: {reference:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn store() -> (tempfile::TempDir, ArtifactStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let (_dir, store) = store();
        let project = Uuid::new_v4();
        let reference = store.put_page_image(project, b"fake png").await.unwrap();
        assert!(reference.starts_with(&format!("{project}/pages/")));
        assert!(reference.ends_with(".png"));
        assert_eq!(store.get(&reference).await.unwrap(), b"fake png");
    }

    #[tokio::test]
    async fn same_content_same_reference() {
        let (_dir, store) = store();
        let project = Uuid::new_v4();
        let a = store.put_page_image(project, b"bytes").await.unwrap();
        let b = store.put_page_image(project, b"bytes").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn different_content_different_reference() {
        let (_dir, store) = store();
        let project = Uuid::new_v4();
        let a = store.put_page_image(project, b"one").await.unwrap();
        let b = store.put_page_image(project, b"two").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_dir, store) = store();
        let project = Uuid::new_v4();
        let reference = store.put_page_image(project, b"x").await.unwrap();
        store.delete(&reference).await.unwrap();
        store.delete(&reference).await.unwrap();
        assert!(store.get(&reference).await.is_err());
    }

    #[tokio::test]
    async fn delete_project_removes_everything() {
        let (_dir, store) = store();
        let project = Uuid::new_v4();
        let page = store.put_page_image(project, b"p").await.unwrap();
        let template = store.put_template_image(project, b"t").await.unwrap();
        store.delete_project(project).await.unwrap();
        assert!(store.get(&page).await.is_err());
        assert!(store.get(&template).await.is_err());
    }

    #[tokio::test]
    async fn no_temp_files_left_behind() {
        let (dir, store) = store();
        let project = Uuid::new_v4();
        let reference = store.put_page_image(project, b"visible").await.unwrap();
        let pages_dir = dir.path().join(reference).parent().unwrap().to_path_buf();
        let mut entries = tokio::fs::read_dir(&pages_dir).await.unwrap();
        let mut count = 0;
        while let Some(entry) = entries.next_entry().await.unwrap() {
            assert!(!entry.file_name().to_string_lossy().ends_with(".tmp"));
            count += 1;
        }
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn lists_materials_in_stable_order() {
        let (_dir, store) = store();
        let project = Uuid::new_v4();
        assert!(store.list_material_refs(project).await.unwrap().is_empty());

        let a = store.put_material_image(project, b"aaa").await.unwrap();
        let b = store.put_material_image(project, b"bbb").await.unwrap();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(store.list_material_refs(project).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn rejects_traversal_references() {
        let (_dir, store) = store();
        assert!(store.get("../etc/passwd").await.is_err());
        assert!(store.get("/etc/passwd").await.is_err());
        assert!(store.get("").await.is_err());
        assert!(store.get("a/../../b").await.is_err());
    }
}
