//! Assistant facade - the UI-facing dispatcher
//!
//! Wires the thread registry, document lifecycle, active-thread state, and
//! the suggestion scanner together, and exposes the operations the editor
//! front end calls. External events (documents, user actions, panel
//! refreshes) all enter through this type.

use crate::config::Config;
use crate::core::errors::ThreadError;
use crate::core::types::{
    AssistantEvent, ChatMessage, DocumentEvent, ThreadInfo, ThreadMode, GENERAL_THREAD_KEY,
    GENERAL_THREAD_TITLE,
};
use crate::llm::{
    ChatProvider, DirectSessionFactory, OpenAiCompatConfig, OpenAiCompatProvider, ProviderManager,
    ProviderSessionFactory, SessionFactory,
};
use crate::storage::{KeyValueStore, ProjectStore};
use crate::suggest::SuggestionScan;
use crate::threads::{ActiveThreadState, DocumentLifecycle, ThreadRegistry};
use crate::workspace::{FsWorkspace, WorkspaceSource};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of the notification channel; slow subscribers drop old events
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Editor-integrated assistant core
pub struct Assistant {
    registry: Arc<ThreadRegistry>,
    lifecycle: DocumentLifecycle,
    active: Arc<ActiveThreadState>,
    suggestions: SuggestionScan,
    events: broadcast::Sender<AssistantEvent>,
}

impl Assistant {
    /// Build the full stack for a workspace directory
    ///
    /// Creates the file-backed store, the configured HTTP provider (primary
    /// path) plus the direct fallback, the general-purpose thread, and
    /// restores every persisted thread.
    pub async fn open(workspace_dir: impl AsRef<Path>) -> Result<Self> {
        let workspace_dir = workspace_dir.as_ref();
        let config = Config::load(workspace_dir)?;
        let store: Arc<dyn KeyValueStore> = Arc::new(ProjectStore::new(workspace_dir)?);
        let workspace: Arc<dyn WorkspaceSource> = Arc::new(FsWorkspace::new(workspace_dir));

        let provider_config = OpenAiCompatConfig::new(
            config.provider.name.clone(),
            config.provider.base_url.clone(),
        )
        .with_model(config.provider.model.clone())
        .with_max_tokens(config.provider.max_tokens);
        let provider_config = match std::env::var(&config.provider.api_key_env) {
            Ok(key) => provider_config.with_api_key(key),
            Err(_) => provider_config,
        };
        let provider: Arc<dyn ChatProvider> =
            Arc::new(OpenAiCompatProvider::new(provider_config));

        let mut manager = ProviderManager::new(config.provider.name.clone());
        manager.register(provider.clone());

        let cap = config.threads.history_cap;
        let primary = Arc::new(ProviderSessionFactory::new(Arc::new(manager), cap));
        let fallback = Arc::new(DirectSessionFactory::new(provider.clone(), cap));

        Self::with_parts(config, store, workspace, primary, fallback, provider).await
    }

    /// Build from explicit collaborators (used by tests and embedders)
    pub async fn with_parts(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        workspace: Arc<dyn WorkspaceSource>,
        primary: Arc<dyn SessionFactory>,
        fallback: Arc<dyn SessionFactory>,
        scan_provider: Arc<dyn ChatProvider>,
    ) -> Result<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let active = Arc::new(ActiveThreadState::new());
        let registry = Arc::new(ThreadRegistry::new(
            store.clone(),
            primary,
            fallback,
            active.clone(),
            events.clone(),
        ));
        let lifecycle = DocumentLifecycle::new(
            registry.clone(),
            active.clone(),
            store,
            workspace.clone(),
            config.threads.supported_extensions.clone(),
            events.clone(),
        );
        let suggestions = SuggestionScan::new(scan_provider, workspace);

        let assistant = Self {
            registry,
            lifecycle,
            active,
            suggestions,
            events,
        };

        // The general thread exists before anything else happens
        assistant
            .registry
            .create_thread(GENERAL_THREAD_KEY, "", GENERAL_THREAD_TITLE)
            .await?;
        assistant.lifecycle.restore_threads().await;

        Ok(assistant)
    }

    /// Subscribe to assistant notifications
    pub fn subscribe(&self) -> broadcast::Receiver<AssistantEvent> {
        self.events.subscribe()
    }

    /// Apply one document lifecycle event
    pub async fn handle_document_event(&self, event: DocumentEvent) {
        self.lifecycle.handle_event(event).await;
    }

    /// Create a thread explicitly (idempotent)
    pub async fn create_thread(
        &self,
        key: &str,
        context: &str,
        title: &str,
    ) -> Result<(), ThreadError> {
        self.registry.create_thread(key, context, title).await
    }

    /// Focus a thread for UI dispatch
    ///
    /// A no-op when `key` is not registered, which covers the race where a
    /// thread was removed between the user's action and its dispatch. Emits
    /// the new thread's persisted history to subscribers.
    pub async fn set_active_thread(&self, key: &str) {
        if !self.registry.contains(key) {
            return;
        }
        self.active.set(key);
        let _ = self.events.send(AssistantEvent::ActiveThreadChanged {
            history: self.registry.persisted_history(key),
        });
    }

    /// Key of the currently focused thread
    pub fn active_thread(&self) -> String {
        self.active.current()
    }

    /// Send a prompt to a thread and return the reply
    pub async fn send_message(&self, key: &str, prompt: &str) -> Result<String, ThreadError> {
        self.registry.send_message(key, prompt).await
    }

    /// Clear a thread's conversation
    pub async fn reset_thread(&self, key: &str) {
        self.registry.reset_thread(key).await;
    }

    /// Switch a document thread's persona mode
    pub async fn set_thread_mode(&self, key: &str, mode: ThreadMode) {
        self.registry.set_thread_mode(key, mode).await;
    }

    /// Snapshots of all registered threads
    pub fn threads(&self) -> Vec<ThreadInfo> {
        self.registry.thread_infos()
    }

    /// Current history of a thread; `None` for unknown keys
    pub async fn history(&self, key: &str) -> Option<Vec<ChatMessage>> {
        match self.registry.get(key) {
            Some(thread) => Some(thread.history().await),
            None => None,
        }
    }

    /// Names of standard documents missing from the workspace
    pub async fn missing_doc_suggestions(&self) -> Vec<String> {
        self.suggestions.missing_docs().await
    }

    /// The underlying registry, for embedders that need direct access
    pub fn registry(&self) -> &Arc<ThreadRegistry> {
        &self.registry
    }
}
