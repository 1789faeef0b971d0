//! Workspace capabilities injected into the coordination core
//!
//! Components that need document text or a file listing receive a
//! [`WorkspaceSource`] at construction time instead of reaching for the
//! filesystem themselves.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use url::Url;
use walkdir::WalkDir;

/// Capability to resolve documents and enumerate workspace files
#[async_trait]
pub trait WorkspaceSource: Send + Sync {
    /// Current text of the document at `uri`; `None` if unresolvable
    async fn read_document(&self, uri: &str) -> Option<String>;

    /// Relative paths of all files in the workspace
    async fn list_files(&self) -> Vec<String>;
}

/// Filesystem-backed workspace rooted at a directory
pub struct FsWorkspace {
    root: PathBuf,
}

impl FsWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn uri_to_path(uri: &str) -> Option<PathBuf> {
        let url = Url::parse(uri).ok()?;
        url.to_file_path().ok()
    }
}

#[async_trait]
impl WorkspaceSource for FsWorkspace {
    async fn read_document(&self, uri: &str) -> Option<String> {
        let path = Self::uri_to_path(uri)?;
        tokio::fs::read_to_string(path).await.ok()
    }

    async fn list_files(&self) -> Vec<String> {
        let root = self.root.clone();
        // Directory walking is blocking work
        tokio::task::spawn_blocking(move || {
            WalkDir::new(&root)
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()))
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter_map(|e| {
                    e.path()
                        .strip_prefix(&root)
                        .ok()
                        .map(|p| p.to_string_lossy().into_owned())
                })
                .collect()
        })
        .await
        .unwrap_or_default()
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

/// Derive a display title from a document URI (its file name)
pub fn title_from_uri(uri: &str) -> String {
    if let Ok(url) = Url::parse(uri) {
        if let Some(name) = url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        {
            return name.to_string();
        }
    }
    uri.rsplit('/').next().unwrap_or(uri).to_string()
}

/// Extract the lowercase file extension from a document URI
pub fn extension_of(uri: &str) -> Option<String> {
    let path = Url::parse(uri)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| uri.to_string());
    Path::new(&path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}
