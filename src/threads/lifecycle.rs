//! Document lifecycle reconciliation
//!
//! Keeps the thread registry consistent with the editor's document set:
//! opened documents get a thread, deleted documents lose theirs (with the
//! active pointer reassigned to the general thread), and on restart the
//! thread list is rebuilt from the persisted history keys.

use super::{ActiveThreadState, ThreadRegistry};
use crate::core::types::{AssistantEvent, DocumentEvent};
use crate::storage::{thread_key_of, KeyValueStore};
use crate::workspace::{extension_of, title_from_uri, WorkspaceSource};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Subscribes to document events and reconciles the registry
pub struct DocumentLifecycle {
    registry: Arc<ThreadRegistry>,
    active: Arc<ActiveThreadState>,
    store: Arc<dyn KeyValueStore>,
    workspace: Arc<dyn WorkspaceSource>,
    supported_extensions: HashSet<String>,
    events: broadcast::Sender<AssistantEvent>,
}

impl DocumentLifecycle {
    pub fn new(
        registry: Arc<ThreadRegistry>,
        active: Arc<ActiveThreadState>,
        store: Arc<dyn KeyValueStore>,
        workspace: Arc<dyn WorkspaceSource>,
        supported_extensions: impl IntoIterator<Item = String>,
        events: broadcast::Sender<AssistantEvent>,
    ) -> Self {
        Self {
            registry,
            active,
            store,
            workspace,
            supported_extensions: supported_extensions
                .into_iter()
                .map(|e| e.to_lowercase())
                .collect(),
            events,
        }
    }

    /// Apply one document event
    pub async fn handle_event(&self, event: DocumentEvent) {
        match event {
            DocumentEvent::Opened { uri, text } => self.on_opened(&uri, &text).await,
            DocumentEvent::Deleted { uri } => self.on_deleted(&uri).await,
        }
    }

    async fn on_opened(&self, uri: &str, text: &str) {
        let supported = extension_of(uri)
            .map(|ext| self.supported_extensions.contains(&ext))
            .unwrap_or(false);
        if !supported {
            return;
        }

        // Repeat opens are harmless: creation is idempotent
        if let Err(err) = self
            .registry
            .create_thread(uri, text, &title_from_uri(uri))
            .await
        {
            tracing::warn!(uri, error = %err, "failed to create thread for opened document");
        }
    }

    async fn on_deleted(&self, uri: &str) {
        if !self.registry.contains(uri) {
            return;
        }

        self.registry.remove_thread(uri).await;

        if self.active.is_active(uri) {
            self.active.reset_to_general();
        }

        let _ = self.events.send(AssistantEvent::StateReset);
    }

    /// Rebuild the thread list from persisted history keys
    ///
    /// Called once at startup. Keys are processed in lexicographic order so
    /// restoration is deterministic. Document text is resolved best-effort;
    /// a document that no longer resolves still gets its thread back, with
    /// empty context.
    pub async fn restore_threads(&self) {
        let stored_keys = match self.store.list_keys() {
            Ok(keys) => keys,
            Err(err) => {
                tracing::warn!(error = %err, "failed to enumerate persisted threads");
                return;
            }
        };

        let mut thread_keys: Vec<String> = stored_keys
            .iter()
            .filter_map(|k| thread_key_of(k))
            .map(String::from)
            .collect();
        thread_keys.sort();

        for key in thread_keys {
            let context = self
                .workspace
                .read_document(&key)
                .await
                .unwrap_or_default();

            if let Err(err) = self
                .registry
                .create_thread(&key, &context, &title_from_uri(&key))
                .await
            {
                tracing::warn!(key, error = %err, "failed to restore thread");
            }
        }
    }
}

#[cfg(all(test, feature = "test-sim"))]
mod tests {
    use super::*;
    use crate::core::types::GENERAL_THREAD_KEY;
    use crate::llm::{DirectSessionFactory, SimProvider};
    use crate::storage::{history_key, ProjectStore};
    use crate::workspace::FsWorkspace;
    use tempfile::TempDir;

    struct Harness {
        _temp: TempDir,
        registry: Arc<ThreadRegistry>,
        active: Arc<ActiveThreadState>,
        lifecycle: DocumentLifecycle,
        store: Arc<dyn KeyValueStore>,
    }

    fn harness() -> Harness {
        let temp = TempDir::new().unwrap();
        let store: Arc<dyn KeyValueStore> = Arc::new(ProjectStore::new(temp.path()).unwrap());
        let factory = Arc::new(DirectSessionFactory::new(Arc::new(SimProvider::echo()), 40));
        let active = Arc::new(ActiveThreadState::new());
        let (events, _) = broadcast::channel(16);
        let registry = Arc::new(ThreadRegistry::new(
            store.clone(),
            factory.clone(),
            factory,
            active.clone(),
            events.clone(),
        ));
        let lifecycle = DocumentLifecycle::new(
            registry.clone(),
            active.clone(),
            store.clone(),
            Arc::new(FsWorkspace::new(temp.path())),
            ["md".to_string(), "txt".to_string()],
            events,
        );
        Harness {
            _temp: temp,
            registry,
            active,
            lifecycle,
            store,
        }
    }

    #[tokio::test]
    async fn test_opened_document_gets_thread() {
        let h = harness();
        h.lifecycle
            .handle_event(DocumentEvent::Opened {
                uri: "file:///docs/guide.md".to_string(),
                text: "# Guide".to_string(),
            })
            .await;

        let thread = h.registry.get("file:///docs/guide.md").unwrap();
        assert_eq!(thread.title(), "guide.md");
    }

    #[tokio::test]
    async fn test_unsupported_extension_ignored() {
        let h = harness();
        h.lifecycle
            .handle_event(DocumentEvent::Opened {
                uri: "file:///src/main.rs".to_string(),
                text: "fn main() {}".to_string(),
            })
            .await;

        assert!(!h.registry.contains("file:///src/main.rs"));
    }

    #[tokio::test]
    async fn test_delete_removes_thread_and_reassigns_active() {
        let h = harness();
        let uri = "file:///docs/guide.md";
        h.lifecycle
            .handle_event(DocumentEvent::Opened {
                uri: uri.to_string(),
                text: String::new(),
            })
            .await;
        h.active.set(uri);

        h.lifecycle
            .handle_event(DocumentEvent::Deleted {
                uri: uri.to_string(),
            })
            .await;

        assert!(!h.registry.contains(uri));
        assert_eq!(h.active.current(), GENERAL_THREAD_KEY);
        assert!(h.store.get(&history_key(uri)).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_of_unknown_document_is_noop() {
        let h = harness();
        h.active.set(GENERAL_THREAD_KEY);
        h.lifecycle
            .handle_event(DocumentEvent::Deleted {
                uri: "file:///docs/never-opened.md".to_string(),
            })
            .await;
        assert_eq!(h.active.current(), GENERAL_THREAD_KEY);
    }

    #[tokio::test]
    async fn test_restore_rebuilds_thread_list() {
        let h = harness();
        for key in ["file:///b.md", "file:///a.md"] {
            h.store
                .set(
                    &history_key(key),
                    &serde_json::json!([{"role": "human", "text": "q"}]),
                )
                .unwrap();
        }

        h.lifecycle.restore_threads().await;

        assert!(h.registry.contains("file:///a.md"));
        assert!(h.registry.contains("file:///b.md"));
        let restored = h.registry.get("file:///a.md").unwrap().history().await;
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].text, "q");
    }
}
