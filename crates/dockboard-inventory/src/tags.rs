use crate::storage::TagStore;
use dockboard_common::{short_id, InventoryError, Result, Tag, TagMap};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument};

/// Keeps the first tag for each lowercase name, in order.
pub fn dedup_tags(tags: &[Tag]) -> Vec<Tag> {
    let mut seen = HashSet::new();
    tags.iter()
        .filter(|tag| seen.insert(tag.key()))
        .cloned()
        .collect()
}

/// Reconciles a container's stored tags with the list the operator submitted.
///
/// Tags are identified by lowercase name. Existing tags missing from `incoming`
/// are dropped, matches take the incoming color, and unmatched incoming tags are
/// appended in submission order. Duplicate names in `incoming` collapse onto the
/// first occurrence. A hand-edited file holding the same name twice keeps only
/// the first stored entry.
pub fn apply_tag_update(existing: &[Tag], incoming: &[Tag]) -> Vec<Tag> {
    let wanted: HashSet<String> = incoming.iter().map(Tag::key).collect();

    let mut updated: Vec<Tag> = dedup_tags(existing)
        .into_iter()
        .filter(|tag| wanted.contains(&tag.key()))
        .collect();

    for tag in incoming {
        let key = tag.key();
        match updated.iter_mut().find(|t| t.key() == key) {
            Some(current) => {
                if current.color != tag.color {
                    current.color = tag.color.clone();
                }
            }
            None => updated.push(tag.clone()),
        }
    }

    updated
}

/// Serializes load-modify-save cycles against a [`TagStore`].
pub struct TagEditor {
    store: Arc<dyn TagStore>,
    write_lock: Mutex<()>,
}

impl TagEditor {
    pub fn new(store: Arc<dyn TagStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn all(&self) -> TagMap {
        self.store.load().await
    }

    /// Applies [`apply_tag_update`] for one container and persists the whole map.
    #[instrument(skip(self, desired), fields(tags = desired.len()))]
    pub async fn update(&self, container_id: &str, desired: Vec<Tag>) -> Result<Vec<Tag>> {
        let container_id = container_id.trim();
        if container_id.is_empty() {
            return Err(InventoryError::InvalidInput(
                "containerId is required".to_string(),
            ));
        }
        if let Some(bad) = desired.iter().find(|t| t.name.trim().is_empty()) {
            return Err(InventoryError::InvalidInput(format!(
                "tag name must not be empty (color {})",
                bad.color
            )));
        }

        let key = short_id(container_id).to_string();
        let _guard = self.write_lock.lock().await;

        let mut map = self.store.load().await;
        let existing = map.get(&key).map(Vec::as_slice).unwrap_or(&[]);
        let updated = apply_tag_update(existing, &desired);
        map.insert(key.clone(), updated.clone());
        self.store.save(&map).await?;

        info!(container = %key, count = updated.len(), "Tags updated");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryTagStore;

    fn tags(pairs: &[(&str, &str)]) -> Vec<Tag> {
        pairs.iter().map(|(n, c)| Tag::new(*n, *c)).collect()
    }

    #[test]
    fn test_drop_update_append() {
        let existing = tags(&[("prod", "#ff0000"), ("web", "#00ff00"), ("old", "#000000")]);
        let incoming = tags(&[("WEB", "#0000ff"), ("new", "#111111"), ("prod", "#ff0000")]);

        let result = apply_tag_update(&existing, &incoming);
        assert_eq!(
            result,
            tags(&[("prod", "#ff0000"), ("web", "#0000ff"), ("new", "#111111")])
        );
    }

    #[test]
    fn test_same_list_is_noop() {
        let existing = tags(&[("a", "#111111"), ("b", "#222222")]);
        assert_eq!(apply_tag_update(&existing, &existing), existing);
    }

    #[test]
    fn test_idempotent() {
        let existing = tags(&[("a", "#111111"), ("b", "#222222"), ("c", "#333333")]);
        let incoming = tags(&[("C", "#999999"), ("d", "#444444"), ("d", "#555555")]);

        let once = apply_tag_update(&existing, &incoming);
        let twice = apply_tag_update(&once, &incoming);
        assert_eq!(once, twice);
        // Duplicate collapses onto the first occurrence with the later color
        assert_eq!(once, tags(&[("c", "#999999"), ("d", "#555555")]));
    }

    #[test]
    fn test_case_duplicates_in_stored_tags_collapse() {
        let existing = tags(&[("Prod", "#111111"), ("prod", "#222222")]);

        let result = apply_tag_update(&existing, &existing);
        assert_eq!(result, tags(&[("Prod", "#222222")]));
        assert_eq!(apply_tag_update(&result, &result), result);

        let recolored = apply_tag_update(&existing, &tags(&[("PROD", "#333333")]));
        assert_eq!(recolored, tags(&[("Prod", "#333333")]));
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let input = tags(&[("a", "#111111"), ("B", "#222222"), ("A", "#333333"), ("b", "#444444")]);
        assert_eq!(dedup_tags(&input), tags(&[("a", "#111111"), ("B", "#222222")]));
    }

    #[test]
    fn test_empty_incoming_clears() {
        let existing = tags(&[("a", "#111111")]);
        assert!(apply_tag_update(&existing, &[]).is_empty());
    }

    #[tokio::test]
    async fn test_editor_creates_entry_lazily() {
        let store = Arc::new(InMemoryTagStore::new());
        let editor = TagEditor::new(store.clone());

        let updated = editor
            .update("abc123456789ffff", tags(&[("prod", "#ff0000")]))
            .await
            .unwrap();
        assert_eq!(updated, tags(&[("prod", "#ff0000")]));

        let map = store.load().await;
        assert_eq!(map.len(), 1);
        assert_eq!(map["abc123456789"], tags(&[("prod", "#ff0000")]));
    }

    #[tokio::test]
    async fn test_editor_rejects_blank_input() {
        let editor = TagEditor::new(Arc::new(InMemoryTagStore::new()));
        let err = editor.update("  ", vec![]).await.unwrap_err();
        assert!(matches!(err, InventoryError::InvalidInput(_)));

        let err = editor
            .update("abc", tags(&[(" ", "#ffffff")]))
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_concurrent_updates_do_not_lose_writes() {
        let editor = Arc::new(TagEditor::new(Arc::new(InMemoryTagStore::new())));

        let mut handles = Vec::new();
        for i in 0..8 {
            let editor = editor.clone();
            handles.push(tokio::spawn(async move {
                editor
                    .update(&format!("{i:012x}"), tags(&[("t", "#123456")]))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(editor.all().await.len(), 8);
    }
}
