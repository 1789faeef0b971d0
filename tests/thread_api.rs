//! Integration tests for the thread coordination API
//!
//! Exercises the assistant facade end-to-end against the file-backed store
//! and the scripted simulation provider.

#![cfg(feature = "test-sim")]

use docwright::llm::{DirectSessionFactory, SimProvider};
use docwright::storage::{history_key, KeyValueStore, ProjectStore};
use docwright::workspace::FsWorkspace;
use docwright::{
    Assistant, AssistantEvent, ChatRole, Config, DocumentEvent, ThreadMode, GENERAL_THREAD_KEY,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const GUIDE_URI: &str = "file:///docs/guide.md";

struct TestBed {
    _temp: TempDir,
    store: Arc<dyn KeyValueStore>,
    assistant: Assistant,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

async fn open_assistant(dir: &Path) -> (Arc<dyn KeyValueStore>, Assistant) {
    init_tracing();
    let store: Arc<dyn KeyValueStore> = Arc::new(ProjectStore::new(dir).unwrap());
    let factory = Arc::new(DirectSessionFactory::new(Arc::new(SimProvider::echo()), 40));
    let assistant = Assistant::with_parts(
        Config::default(),
        store.clone(),
        Arc::new(FsWorkspace::new(dir)),
        factory.clone(),
        factory,
        Arc::new(SimProvider::echo()),
    )
    .await
    .unwrap();
    (store, assistant)
}

async fn test_bed() -> TestBed {
    let temp = TempDir::new().unwrap();
    let (store, assistant) = open_assistant(temp.path()).await;
    TestBed {
        _temp: temp,
        store,
        assistant,
    }
}

async fn open_guide(bed: &TestBed) {
    bed.assistant
        .handle_document_event(DocumentEvent::Opened {
            uri: GUIDE_URI.to_string(),
            text: "# Guide".to_string(),
        })
        .await;
}

#[tokio::test]
async fn test_general_thread_exists_on_startup() {
    let bed = test_bed().await;

    let threads = bed.assistant.threads();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].key, GENERAL_THREAD_KEY);
    assert_eq!(threads[0].mode, None);
    assert_eq!(bed.assistant.active_thread(), GENERAL_THREAD_KEY);
}

#[tokio::test]
async fn test_opened_document_appears_in_thread_list() {
    let bed = test_bed().await;
    let mut events = bed.assistant.subscribe();

    open_guide(&bed).await;

    let threads = bed.assistant.threads();
    assert!(threads.iter().any(|t| t.key == GUIDE_URI));

    match events.recv().await.unwrap() {
        AssistantEvent::ThreadListChanged {
            threads,
            active_key,
        } => {
            assert!(threads.iter().any(|t| t.key == GUIDE_URI));
            assert_eq!(active_key, GENERAL_THREAD_KEY);
        }
        other => panic!("expected ThreadListChanged, got {other:?}"),
    }
}

#[tokio::test]
async fn test_exchange_is_persisted_before_returning() {
    let bed = test_bed().await;
    open_guide(&bed).await;

    let reply = bed.assistant.send_message(GUIDE_URI, "what is this?").await.unwrap();

    let value = bed.store.get(&history_key(GUIDE_URI)).unwrap().unwrap();
    let persisted: Vec<docwright::ChatMessage> = serde_json::from_value(value).unwrap();
    let [.., prompt_msg, reply_msg] = persisted.as_slice() else {
        panic!("persisted history too short");
    };
    assert_eq!(prompt_msg.role, ChatRole::Human);
    assert_eq!(prompt_msg.text, "what is this?");
    assert_eq!(reply_msg.role, ChatRole::Assistant);
    assert_eq!(reply_msg.text, reply);
}

#[tokio::test]
async fn test_threads_survive_restart() {
    let temp = TempDir::new().unwrap();

    {
        let (_store, assistant) = open_assistant(temp.path()).await;
        assistant
            .handle_document_event(DocumentEvent::Opened {
                uri: GUIDE_URI.to_string(),
                text: "# Guide".to_string(),
            })
            .await;
        assistant.send_message(GUIDE_URI, "remember me").await.unwrap();
    }

    // Fresh stack over the same workspace directory
    let (_store, assistant) = open_assistant(temp.path()).await;

    let threads = assistant.threads();
    assert!(threads.iter().any(|t| t.key == GUIDE_URI));

    let history = assistant.history(GUIDE_URI).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].text, "remember me");
}

#[tokio::test]
async fn test_delete_reassigns_active_thread() {
    let bed = test_bed().await;
    open_guide(&bed).await;
    bed.assistant.send_message(GUIDE_URI, "hello").await.unwrap();
    bed.assistant.set_active_thread(GUIDE_URI).await;
    assert_eq!(bed.assistant.active_thread(), GUIDE_URI);

    let mut events = bed.assistant.subscribe();
    bed.assistant
        .handle_document_event(DocumentEvent::Deleted {
            uri: GUIDE_URI.to_string(),
        })
        .await;

    assert_eq!(bed.assistant.active_thread(), GENERAL_THREAD_KEY);
    assert!(bed.assistant.history(GUIDE_URI).await.is_none());
    assert!(bed.store.get(&history_key(GUIDE_URI)).unwrap().is_none());

    // Removal notifies the thread list change, then the state reset
    let mut saw_reset = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, AssistantEvent::StateReset) {
            saw_reset = true;
        }
    }
    assert!(saw_reset);
}

#[tokio::test]
async fn test_reset_clears_history_but_keeps_thread() {
    let bed = test_bed().await;
    open_guide(&bed).await;
    bed.assistant.send_message(GUIDE_URI, "hello").await.unwrap();

    bed.assistant.reset_thread(GUIDE_URI).await;

    assert!(bed.assistant.history(GUIDE_URI).await.unwrap().is_empty());
    assert!(bed.assistant.threads().iter().any(|t| t.key == GUIDE_URI));
    let value = bed.store.get(&history_key(GUIDE_URI)).unwrap().unwrap();
    assert_eq!(value, serde_json::json!([]));
}

#[tokio::test]
async fn test_mode_switch_preserves_history() {
    let bed = test_bed().await;
    open_guide(&bed).await;
    bed.assistant.send_message(GUIDE_URI, "hello").await.unwrap();
    let before = bed.assistant.history(GUIDE_URI).await.unwrap();

    bed.assistant
        .set_thread_mode(GUIDE_URI, ThreadMode::Beginner)
        .await;

    assert_eq!(bed.assistant.history(GUIDE_URI).await.unwrap(), before);
    let info = bed
        .assistant
        .threads()
        .into_iter()
        .find(|t| t.key == GUIDE_URI)
        .unwrap();
    assert_eq!(info.mode, Some(ThreadMode::Beginner));
}

#[tokio::test]
async fn test_set_active_thread_on_unknown_key_is_noop() {
    let bed = test_bed().await;

    bed.assistant.set_active_thread("file:///removed.md").await;

    assert_eq!(bed.assistant.active_thread(), GENERAL_THREAD_KEY);
}

#[tokio::test]
async fn test_set_active_thread_emits_persisted_history() {
    let bed = test_bed().await;
    open_guide(&bed).await;
    bed.assistant.send_message(GUIDE_URI, "hello").await.unwrap();

    let mut events = bed.assistant.subscribe();
    bed.assistant.set_active_thread(GUIDE_URI).await;

    match events.recv().await.unwrap() {
        AssistantEvent::ActiveThreadChanged { history } => {
            assert_eq!(history.len(), 2);
            assert_eq!(history[0].text, "hello");
        }
        other => panic!("expected ActiveThreadChanged, got {other:?}"),
    }
}

#[tokio::test]
async fn test_send_message_to_unknown_thread_fails() {
    let bed = test_bed().await;
    let result = bed.assistant.send_message("file:///nope.md", "hi").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_concurrent_suggestion_scans_coalesce() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("main.rs"), "fn main() {}").unwrap();

    let store: Arc<dyn KeyValueStore> = Arc::new(ProjectStore::new(temp.path()).unwrap());
    let factory = Arc::new(DirectSessionFactory::new(Arc::new(SimProvider::echo()), 40));
    let scan_provider = Arc::new(
        SimProvider::scripted(["README.md\nCONTRIBUTING.md"]).with_delay(Duration::from_millis(50)),
    );
    let assistant = Assistant::with_parts(
        Config::default(),
        store,
        Arc::new(FsWorkspace::new(temp.path())),
        factory.clone(),
        factory,
        scan_provider.clone(),
    )
    .await
    .unwrap();

    let (a, b, c) = tokio::join!(
        assistant.missing_doc_suggestions(),
        assistant.missing_doc_suggestions(),
        assistant.missing_doc_suggestions(),
    );

    assert_eq!(scan_provider.calls(), 1);
    assert_eq!(a, vec!["README.md".to_string(), "CONTRIBUTING.md".to_string()]);
    assert_eq!(a, b);
    assert_eq!(b, c);
}
