use anyhow::{Context, Result};

use super::ChatModel;
use crate::models::{ChatMessage, RetrievedCandidate};

/// Literal reply the model is told to give when the context has no answer.
pub const NOT_AVAILABLE: &str = "Data Not Available";

const SYSTEM_PROMPT: &str = "\
INSTRUCTIONS:
1. You are an assistant who helps users answer their queries.
2. Always answer the user's query from the given documents. The user will provide documents.
3. Give the answer in step by step format if required.
4. Keep your answer concise with all required and requested details, based solely on the information given in the documents.
5. Do not create or derive your own answer. If the answer is not directly available in the documents, just reply stating 'Data Not Available'.";

/// Ask the model for an answer grounded in `candidates`.
///
/// The reply is forwarded as-is, including the refusal string.
pub async fn synthesize_answer(
    chat: &dyn ChatModel,
    temperature: f32,
    query: &str,
    candidates: &[RetrievedCandidate],
) -> Result<String> {
    let messages = build_messages(query, candidates);
    chat.complete(&messages, temperature, false)
        .await
        .context("Answer synthesis call failed")
}

fn build_context_block(candidates: &[RetrievedCandidate]) -> String {
    candidates
        .iter()
        .map(|c| c.unit.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn build_messages(query: &str, candidates: &[RetrievedCandidate]) -> Vec<ChatMessage> {
    let context = build_context_block(candidates);
    let rule = "-".repeat(42);
    let user = format!("Documents\n{rule}\n{context}\n{rule}\n\n\n**Query:**\n{query}\n");
    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)]
}
