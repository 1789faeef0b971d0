//! Missing-documentation suggestions
//!
//! Asks the chat backend which standard project documents the workspace
//! lacks. The computation is expensive and gets triggered from several
//! places (background scans, panel refreshes), so it runs behind the
//! single-flight coalescer: concurrent triggers share one backend call, and
//! a failed or unparseable answer degrades to the last good one.

use crate::core::prompts;
use crate::llm::ChatProvider;
use crate::single_flight::SingleFlight;
use crate::workspace::WorkspaceSource;
use crate::ChatMessage;
use std::sync::Arc;

/// Suggestions returned when no scan has ever succeeded
const DEFAULT_SUGGESTIONS: &[&str] = &["README.md", "CONTRIBUTING.md", "CHANGELOG.md"];

/// Coalescing key; there is one global scan per workspace
const SCAN_KEY: &str = "missing-docs";

/// Workspace documentation scanner
pub struct SuggestionScan {
    provider: Arc<dyn ChatProvider>,
    workspace: Arc<dyn WorkspaceSource>,
    flight: SingleFlight<Vec<String>>,
}

impl SuggestionScan {
    pub fn new(provider: Arc<dyn ChatProvider>, workspace: Arc<dyn WorkspaceSource>) -> Self {
        let default = DEFAULT_SUGGESTIONS.iter().map(|s| s.to_string()).collect();
        Self {
            provider,
            workspace,
            flight: SingleFlight::new(default, |v: &Vec<String>| !v.is_empty()),
        }
    }

    /// Names of standard documents missing from the workspace
    ///
    /// Never fails and never returns an empty list: backend errors and
    /// malformed answers fall back to the last good result, or to the fixed
    /// default when there is none.
    pub async fn missing_docs(&self) -> Vec<String> {
        let provider = self.provider.clone();
        let workspace = self.workspace.clone();

        self.flight
            .invoke(SCAN_KEY, async move {
                let files = workspace.list_files().await;
                let prompt = prompts::missing_docs_prompt(&files);
                let answer = provider
                    .complete("", &[ChatMessage::human(prompt)])
                    .await?;
                Ok(parse_doc_list(&answer))
            })
            .await
    }

    /// Number of scan invocations so far (coalesced ones included)
    pub fn scan_calls(&self) -> u64 {
        self.flight.calls()
    }
}

/// Parse a model answer expected to be one file name per line
///
/// Tolerates bullets, numbering, and comma-separated lists. An answer with
/// no recognizable entries yields an empty vector, which the caller treats
/// as a failed scan.
fn parse_doc_list(answer: &str) -> Vec<String> {
    answer
        .split(['\n', ','])
        .map(|line| {
            line.trim()
                .trim_start_matches(['-', '*', '•'])
                .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ')')
                .trim()
        })
        .filter(|entry| !entry.is_empty() && !entry.contains(' '))
        .map(String::from)
        .collect()
}
