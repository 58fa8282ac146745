//! Prompt assembly for the generation step
//!
//! Knowledge prompts place retrieved chunks first, best-first, each block
//! separated by [`CONTEXT_DELIMITER`], followed by the question. When
//! retrieval found nothing the context section holds [`NO_CONTEXT_MARKER`].

use qr_core::{ConversationTurn, RetrievedChunk};

/// Separator between context blocks
pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

/// Stands in for the context section when retrieval returned no chunks
pub const NO_CONTEXT_MARKER: &str = "[no context found]";

/// Prompt for KNOWLEDGE_SEARCH
pub fn knowledge_prompt(query: &str, chunks: &[RetrievedChunk]) -> String {
    let context = if chunks.is_empty() {
        NO_CONTEXT_MARKER.to_string()
    } else {
        chunks
            .iter()
            .map(|chunk| format!("Document: {}\n{}", chunk.title, chunk.text))
            .collect::<Vec<_>>()
            .join(CONTEXT_DELIMITER)
    };

    format!(
        "Context from knowledge base:\n\
         {}\n\
         \n\
         Question: {}\n\
         \n\
         Answer clearly and concisely using the context above. \
         If the context does not contain the answer, say so.",
        context,
        query.trim()
    )
}

/// One line per turn, oldest first: `USER: ...` / `ASSISTANT: ...`
pub fn serialize_turns(turns: &[ConversationTurn]) -> String {
    turns
        .iter()
        .map(|turn| format!("{}: {}", turn.role.as_str().to_uppercase(), turn.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt for SUMMARIZATION
pub fn summary_prompt(turns: &[ConversationTurn]) -> String {
    format!(
        "Please provide a brief 2-3 sentence summary of this conversation:\n\
         \n\
         {}\n\
         \n\
         Summary:",
        serialize_turns(turns)
    )
}

/// Prompt for GENERAL_CHAT; recent turns travel separately as context
pub fn chat_prompt(query: &str) -> String {
    query.trim().to_string()
}
