//! System-message builders for thread personas
//!
//! A thread's system message is assembled from its title, the backing
//! document's text, and the persona mode. It is rebuilt on mode switches
//! without touching the conversation history.

use super::types::ThreadMode;

/// Maximum number of characters of document text embedded in a persona
const CONTEXT_LIMIT: usize = 4000;

/// Build the persona preamble for a document thread
pub fn document_system_message(title: &str, context: &str, mode: ThreadMode) -> String {
    let persona = match mode {
        ThreadMode::Developer => format!(
            "You are a documentation assistant for \"{title}\". \
             The user is a professional software developer. Answer precisely \
             and concisely, using standard technical terminology."
        ),
        ThreadMode::Beginner => format!(
            "You are a documentation assistant for \"{title}\". \
             The user is new to this material. Use plain language, avoid \
             jargon, and explain things step by step."
        ),
    };

    if context.is_empty() {
        return persona;
    }

    let excerpt = truncate(context, CONTEXT_LIMIT);
    format!("{persona}\n\nCurrent document content:\n---\n{excerpt}\n---")
}

/// Build the preamble for the general-purpose thread
pub fn general_system_message() -> String {
    "You are a documentation assistant for this project. Answer questions \
     about documentation practices, project structure, and writing style."
        .to_string()
}

/// Build the prompt for the missing-documentation scan
pub fn missing_docs_prompt(files: &[String]) -> String {
    format!(
        "The project workspace contains the following files:\n{}\n\n\
         Which standard project documents (for example README, CONTRIBUTING, \
         CHANGELOG, LICENSE) are missing? Respond with only the missing file \
         names, one per line.",
        files.join("\n")
    )
}

fn truncate(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    // Back off to a char boundary
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
