use anyhow::{Context, Result};
use serde::Deserialize;

use super::ChatModel;
use crate::models::ChatMessage;

/// Structured single-field response requested from the model.
#[derive(Debug, Deserialize)]
struct AlternateQuestion {
    question: String,
}

/// Expand a question into `[question, paraphrase]`.
///
/// `index` is the newline-joined list of document headings; it gives the model
/// the document's own vocabulary (jargon, acronyms, section names). A failed call
/// or a malformed response is an error: there is no fallback list.
pub async fn expand_query(
    chat: &dyn ChatModel,
    temperature: f32,
    question: &str,
    index: &str,
) -> Result<Vec<String>> {
    let messages = vec![ChatMessage::system(build_expansion_prompt(question, index))];

    let response = chat
        .complete(&messages, temperature, true)
        .await
        .context("Query expansion call failed")?;

    let alternate = parse_alternate_question(&response)?;
    tracing::info!("Query expanded: {question:?} -> {alternate:?}");

    Ok(vec![question.to_string(), alternate])
}

fn build_expansion_prompt(question: &str, index: &str) -> String {
    let rule = "-".repeat(96);
    format!(
        "You are an AI language model assistant. Your task is to generate one alternate version \
         of the given user question to retrieve relevant documents from a vector database.\n\
         By generating another perspective on the user question, your goal is to help the user \
         overcome some of the limitations of distance-based similarity search and keyword search.\n\n\
         Note: Refer to the provided document index from the vector database to generate the \
         alternate question. The index contains domain-specific jargon, terminology, acronyms, \
         and synonyms that will help you write a contextually accurate question.\n\n\
         # Document index\n{rule}\n{index}\n{rule}\n\n\
         Original question: {question}\n\n\
         Respond with ONLY a JSON object with a single field, for example:\n\
         {{\"question\": \"alternate question\"}}"
    )
}

fn parse_alternate_question(content: &str) -> Result<String> {
    // Extract the JSON object from the response
    let json_str = match (content.find('{'), content.rfind('}')) {
        (Some(start), Some(end)) if start < end => &content[start..=end],
        _ => content,
    };

    let parsed: AlternateQuestion = serde_json::from_str(json_str)
        .with_context(|| format!("Malformed query expansion response: {content}"))?;

    let question = parsed.question.trim();
    if question.is_empty() {
        anyhow::bail!("Query expansion returned an empty question");
    }
    Ok(question.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedChat {
        reply: Result<String, String>,
        seen: Mutex<Vec<ChatMessage>>,
    }

    #[async_trait]
    impl ChatModel for ScriptedChat {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            _temperature: f32,
            json_response: bool,
        ) -> Result<String> {
            assert!(json_response);
            self.seen.lock().unwrap().extend(messages.iter().cloned());
            self.reply.clone().map_err(|e| anyhow::anyhow!(e))
        }
    }

    #[test]
    fn test_parse_clean_object() {
        let alt = parse_alternate_question(r#"{"question": "Who leads the company?"}"#).unwrap();
        assert_eq!(alt, "Who leads the company?");
    }

    #[test]
    fn test_parse_object_in_code_fence() {
        let input = "```json\n{\"question\": \"What is the PTO allowance?\"}\n```";
        assert_eq!(
            parse_alternate_question(input).unwrap(),
            "What is the PTO allowance?"
        );
    }

    #[test]
    fn test_parse_missing_field_is_error() {
        assert!(parse_alternate_question(r#"{"questions": ["a"]}"#).is_err());
        assert!(parse_alternate_question(r#"{"question": "   "}"#).is_err());
        assert!(parse_alternate_question("I don't understand.").is_err());
        assert!(parse_alternate_question("").is_err());
    }

    #[test]
    fn test_prompt_contains_index_and_question() {
        let prompt = build_expansion_prompt("What is PTO?", "# Handbook\n## Paid Time Off");
        assert!(prompt.contains("# Handbook\n## Paid Time Off"));
        assert!(prompt.contains("Original question: What is PTO?"));
        assert!(prompt.contains("\"question\""));
    }

    #[tokio::test]
    async fn test_expand_returns_original_first() {
        let chat = ScriptedChat {
            reply: Ok(r#"{"question": "Who is the chief executive?"}"#.to_string()),
            seen: Mutex::new(Vec::new()),
        };
        let queries = expand_query(&chat, 0.075, "Who is the CEO?", "# Company")
            .await
            .unwrap();
        assert_eq!(queries, vec!["Who is the CEO?", "Who is the chief executive?"]);

        let seen = chat.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].role, "system");
    }

    #[tokio::test]
    async fn test_expand_propagates_call_failure() {
        let chat = ScriptedChat {
            reply: Err("connection refused".to_string()),
            seen: Mutex::new(Vec::new()),
        };
        let err = expand_query(&chat, 0.075, "q", "").await.unwrap_err();
        assert!(format!("{err:#}").contains("connection refused"));
    }
}
