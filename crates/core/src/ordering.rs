//! Page ordering helpers.
//!
//! `order_index` values must stay contiguous (0-based) and unique within
//! a project. Deleting or reordering pages renumbers the remainder; the
//! helpers here compute the new numbering as pure data so repositories
//! can apply it in one transaction.

use crate::error::CoreError;
use crate::types::EntityId;

/// Compute the contiguous renumbering of `page_ids` in their given order.
///
/// Returns `(page_id, new_order_index)` pairs; callers persist only the
/// pairs whose index actually changed.
pub fn renumber(page_ids: &[EntityId]) -> Vec<(EntityId, i32)> {
    page_ids
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i as i32))
        .collect()
}

/// Validate that `requested` is a permutation of `existing` before a
/// manual reorder is applied.
pub fn validate_reorder(existing: &[EntityId], requested: &[EntityId]) -> Result<(), CoreError> {
    if requested.len() != existing.len() {
        return Err(CoreError::Validation(format!(
            "Reorder must list every page exactly once: expected {} ids, got {}",
            existing.len(),
            requested.len()
        )));
    }

    let mut seen = std::collections::HashSet::with_capacity(requested.len());
    for id in requested {
        if !seen.insert(id) {
            return Err(CoreError::Validation(format!("Duplicate page id: {id}")));
        }
        if !existing.contains(id) {
            return Err(CoreError::Validation(format!(
                "Page id {id} does not belong to this project"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn ids(n: usize) -> Vec<EntityId> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn renumber_is_contiguous_from_zero() {
        let pages = ids(4);
        let numbered = renumber(&pages);
        assert_eq!(numbered.len(), 4);
        for (i, (id, idx)) in numbered.iter().enumerate() {
            assert_eq!(*id, pages[i]);
            assert_eq!(*idx, i as i32);
        }
    }

    #[test]
    fn renumber_empty_is_empty() {
        assert!(renumber(&[]).is_empty());
    }

    #[test]
    fn reorder_accepts_permutation() {
        let existing = ids(3);
        let requested = vec![existing[2], existing[0], existing[1]];
        assert!(validate_reorder(&existing, &requested).is_ok());
    }

    #[test]
    fn reorder_rejects_missing_page() {
        let existing = ids(3);
        let requested = vec![existing[0], existing[1]];
        assert!(validate_reorder(&existing, &requested).is_err());
    }

    #[test]
    fn reorder_rejects_duplicate() {
        let existing = ids(2);
        let requested = vec![existing[0], existing[0]];
        assert!(validate_reorder(&existing, &requested).is_err());
    }

    #[test]
    fn reorder_rejects_foreign_page() {
        let existing = ids(2);
        let requested = vec![existing[0], Uuid::new_v4()];
        assert!(validate_reorder(&existing, &requested).is_err());
    }
}
