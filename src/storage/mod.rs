//! Persistent storage for thread histories
//!
//! Layout (workspace-scoped):
//!
//! .docwright/                        # Project-level storage
//! ├── config.toml                    # Assistant settings
//! └── threads/                       # One JSON file per persisted key
//!     └── {escaped-key}.json
//!
//! Keys follow the `thread-history-<threadKey>` convention; `threadKey` for
//! document threads is the document's canonical URI string, which is what
//! makes restart-time correlation possible.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Project-level storage directory name
pub const DOCWRIGHT_DIR: &str = ".docwright";

/// Prefix for persisted thread history keys
pub const HISTORY_KEY_PREFIX: &str = "thread-history-";

/// Build the store key for a thread's persisted history
pub fn history_key(thread_key: &str) -> String {
    format!("{HISTORY_KEY_PREFIX}{thread_key}")
}

/// Extract the thread key from a persisted history key
pub fn thread_key_of(store_key: &str) -> Option<&str> {
    store_key.strip_prefix(HISTORY_KEY_PREFIX)
}

/// Durable string-keyed value store, scoped to the current workspace
///
/// Writes are best-effort from the coordination core's point of view: a
/// failed write is logged and the in-memory thread keeps functioning.
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `None` if the key is absent
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;

    /// Write a value, overwriting any previous one
    fn set(&self, key: &str, value: &serde_json::Value) -> Result<()>;

    /// Remove a key; absent keys are a no-op
    fn remove(&self, key: &str) -> Result<()>;

    /// Enumerate all stored keys
    fn list_keys(&self) -> Result<Vec<String>>;
}

/// File-backed store: one pretty-printed JSON file per key
pub struct ProjectStore {
    threads_dir: PathBuf,
}

impl ProjectStore {
    /// Initialize storage under `<workspace>/.docwright/`
    pub fn new(workspace_dir: impl AsRef<Path>) -> Result<Self> {
        let root = workspace_dir.as_ref().join(DOCWRIGHT_DIR);
        let threads_dir = root.join("threads");
        std::fs::create_dir_all(&threads_dir)
            .with_context(|| format!("Failed to create {}", threads_dir.display()))?;
        Ok(Self { threads_dir })
    }

    /// Storage under the user config directory, for sessions opened outside
    /// any workspace
    pub fn default_location() -> Result<Self> {
        let base = dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        let threads_dir = base.join("docwright").join("threads");
        std::fs::create_dir_all(&threads_dir)
            .with_context(|| format!("Failed to create {}", threads_dir.display()))?;
        Ok(Self { threads_dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.threads_dir.join(format!("{}.json", escape_key(key)))
    }
}

impl KeyValueStore for ProjectStore {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(value))
    }

    fn set(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let path = self.path_for(key);
        let content = serde_json::to_string_pretty(value)?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in std::fs::read_dir(&self.threads_dir)?.flatten() {
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    if let Some(key) = unescape_key(stem) {
                        keys.push(key);
                    }
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Escape an arbitrary key into a safe file name
///
/// Alphanumerics plus `.`, `-`, `_` pass through; every other byte becomes
/// `%XX`. The mapping is reversible so URI keys survive a round trip.
fn escape_key(key: &str) -> String {
    let mut escaped = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'.' | b'-' | b'_' => {
                escaped.push(byte as char)
            }
            _ => escaped.push_str(&format!("%{byte:02X}")),
        }
    }
    escaped
}

fn unescape_key(escaped: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(escaped.len());
    let mut chars = escaped.bytes();
    while let Some(b) = chars.next() {
        if b == b'%' {
            let hi = chars.next()?;
            let lo = chars.next()?;
            let hex = [hi, lo];
            let hex = std::str::from_utf8(&hex).ok()?;
            bytes.push(u8::from_str_radix(hex, 16).ok()?);
        } else {
            bytes.push(b);
        }
    }
    String::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, ProjectStore) {
        let temp = TempDir::new().unwrap();
        let store = ProjectStore::new(temp.path()).unwrap();
        (temp, store)
    }

    #[test]
    fn test_get_set_round_trip() {
        let (_temp, store) = create_test_store();
        let value = serde_json::json!([{"role": "human", "text": "hi"}]);

        store.set("thread-history-file:///a.md", &value).unwrap();
        let loaded = store.get("thread-history-file:///a.md").unwrap();
        assert_eq!(loaded, Some(value));
    }

    #[test]
    fn test_get_absent_key() {
        let (_temp, store) = create_test_store();
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (_temp, store) = create_test_store();
        store.set("k", &serde_json::json!(1)).unwrap();
        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_list_keys_sorted() {
        let (_temp, store) = create_test_store();
        store.set("thread-history-b", &serde_json::json!([])).unwrap();
        store.set("thread-history-a", &serde_json::json!([])).unwrap();
        store.set("other", &serde_json::json!(0)).unwrap();

        let keys = store.list_keys().unwrap();
        assert_eq!(keys, vec!["other", "thread-history-a", "thread-history-b"]);
    }

    #[test]
    fn test_uri_keys_survive_escaping() {
        let (_temp, store) = create_test_store();
        let key = "thread-history-file:///My Docs/crash course (draft).md";
        store.set(key, &serde_json::json!([])).unwrap();

        let keys = store.list_keys().unwrap();
        assert_eq!(keys, vec![key.to_string()]);
    }

    proptest::proptest! {
        #[test]
        fn prop_escape_round_trips(key in "\\PC*") {
            let escaped = escape_key(&key);
            prop_assert!(escaped
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_' | b'%')));
            prop_assert_eq!(unescape_key(&escaped), Some(key));
        }
    }

    use proptest::prelude::{prop_assert, prop_assert_eq};

    #[test]
    fn test_history_key_helpers() {
        let key = history_key("file:///a.md");
        assert_eq!(key, "thread-history-file:///a.md");
        assert_eq!(thread_key_of(&key), Some("file:///a.md"));
        assert_eq!(thread_key_of("unrelated"), None);
    }
}
