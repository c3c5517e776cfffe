use axum::body::Bytes;
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::Instrument;

use crate::document::render::pdf_to_markdown;
use crate::pipeline::DocumentSession;
use crate::state::AppState;

/// Why a `questions` value was rejected. The messages are part of the API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuestionListError {
    #[error("Invalid format for the list of strings, expected [\"Q1\", \"Q2\"]")]
    Malformed,
    #[error("The provided list is not valid. It should be a list of strings.")]
    NotStringList,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnswerParams {
    pub questions: Option<String>,
}

struct PdfUpload {
    content_type: Option<String>,
    bytes: Bytes,
}

impl PdfUpload {
    fn is_pdf(&self) -> bool {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/pdf"))
    }
}

/// POST /get_answer - Answer a batch of questions about one uploaded PDF:
///   1. Read the multipart form (`pdf_file`, `questions`)
///   2. Validate the question list, then the file type
///   3. Extract the PDF as Markdown-like text
///   4. Section, index and answer each question in order
pub async fn get_answer(
    State(state): State<AppState>,
    Query(params): Query<AnswerParams>,
    multipart: Multipart,
) -> Result<Json<Value>, (StatusCode, String)> {
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("get_answer", %request_id);
    answer_request(state, params, multipart)
        .instrument(span)
        .await
}

async fn answer_request(
    state: AppState,
    params: AnswerParams,
    mut multipart: Multipart,
) -> Result<Json<Value>, (StatusCode, String)> {
    // ── Step 1: Read the form ────────────────────────────────
    let mut questions_raw = params.questions;
    let mut upload: Option<PdfUpload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (e.status(), e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "questions" => {
                let text = field.text().await.map_err(|e| (e.status(), e.body_text()))?;
                questions_raw = Some(text);
            }
            "pdf_file" => {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(|e| (e.status(), e.body_text()))?;
                upload = Some(PdfUpload {
                    content_type,
                    bytes,
                });
            }
            other => {
                tracing::debug!("Ignoring unexpected form field {other:?}");
            }
        }
    }

    // ── Step 2: Validate questions, then the file ────────────
    let questions = match parse_question_list(questions_raw.as_deref().unwrap_or_default()) {
        Ok(questions) => questions,
        Err(e) => {
            tracing::info!("Rejected question list: {e}");
            return Ok(Json(json!({ "error": e.to_string() })));
        }
    };

    let upload = upload.filter(PdfUpload::is_pdf).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            "Only PDF files are supported.".to_string(),
        )
    })?;

    // ── Step 3: Extract text ─────────────────────────────────
    let bytes = upload.bytes;
    let markdown = tokio::task::spawn_blocking(move || pdf_to_markdown(&bytes))
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("PDF extraction task failed: {e}"),
            )
        })?
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("{e:#}")))?;

    tracing::info!(
        "Extracted {} chars for {} questions",
        markdown.len(),
        questions.len()
    );

    // ── Step 4: Index and answer ─────────────────────────────
    let session = DocumentSession::prepare(
        &markdown,
        &state.services,
        &state.config.llm,
        &state.config.retrieval,
    )
    .await
    .map_err(|e| (StatusCode::BAD_GATEWAY, format!("{e:#}")))?;

    let answers = session
        .answer_all(&questions)
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))?;

    Ok(Json(Value::Object(answers)))
}

/// Parse a question list given as a JSON array or a Python-style literal list.
///
/// Python literals go through JSON5 (single quotes, trailing commas) after
/// [`python_to_json5`] rewrites the few tokens JSON5 does not know.
pub fn parse_question_list(raw: &str) -> Result<Vec<String>, QuestionListError> {
    let value = match serde_json::from_str::<Value>(raw) {
        Ok(value) => value,
        Err(_) => {
            let value: Value = json5::from_str(&python_to_json5(raw))
                .map_err(|_| QuestionListError::Malformed)?;
            // A tuple is a valid literal but not a list.
            if raw.trim_start().starts_with('(') {
                return Err(QuestionListError::NotStringList);
            }
            value
        }
    };

    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                _ => Err(QuestionListError::NotStringList),
            })
            .collect(),
        _ => Err(QuestionListError::NotStringList),
    }
}

/// Map `None`/`True`/`False` to their JSON5 spelling and tuple brackets to
/// array brackets. Quoted text is copied untouched.
fn python_to_json5(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut word = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in raw.chars() {
        if let Some(q) = quote {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        if c.is_alphanumeric() || c == '_' {
            word.push(c);
            continue;
        }
        flush_word(&mut out, &mut word);
        match c {
            '\'' | '"' => {
                quote = Some(c);
                out.push(c);
            }
            '(' => out.push('['),
            ')' => out.push(']'),
            _ => out.push(c),
        }
    }
    flush_word(&mut out, &mut word);
    out
}

fn flush_word(out: &mut String, word: &mut String) {
    out.push_str(match word.as_str() {
        "None" => "null",
        "True" => "true",
        "False" => "false",
        other => other,
    });
    word.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_list() {
        let qs = parse_question_list(r#"["Who is the CEO?", "What is revenue?"]"#).unwrap();
        assert_eq!(qs, vec!["Who is the CEO?", "What is revenue?"]);
    }

    #[test]
    fn test_python_literal_list() {
        let qs = parse_question_list(r#"['Who is the CEO?', "It's fine", 'a \'quoted\' word']"#)
            .unwrap();
        assert_eq!(qs, vec!["Who is the CEO?", "It's fine", "a 'quoted' word"]);
    }

    #[test]
    fn test_python_trailing_comma_and_empty() {
        assert_eq!(parse_question_list("['q1', ]").unwrap(), vec!["q1"]);
        assert!(parse_question_list("[]").unwrap().is_empty());
    }

    #[test]
    fn test_not_a_string_list() {
        assert_eq!(
            parse_question_list("[1, 2]"),
            Err(QuestionListError::NotStringList)
        );
        assert_eq!(
            parse_question_list(r#"{"q": "x"}"#),
            Err(QuestionListError::NotStringList)
        );
        assert_eq!(
            parse_question_list("['a', None]"),
            Err(QuestionListError::NotStringList)
        );
        assert_eq!(
            parse_question_list("'just one'"),
            Err(QuestionListError::NotStringList)
        );
    }

    #[test]
    fn test_python_non_list_literals() {
        for raw in ["('a', 'b')", "('a',)", "{'q': 'x'}", "[True, False]", "['a', ('b',)]"] {
            assert_eq!(
                parse_question_list(raw),
                Err(QuestionListError::NotStringList),
                "input {raw:?}"
            );
        }
    }

    #[test]
    fn test_python_keywords_inside_quotes_untouched() {
        let qs = parse_question_list(r#"['Is None (or True) allowed?', "it's False"]"#).unwrap();
        assert_eq!(qs, vec!["Is None (or True) allowed?", "it's False"]);
    }

    #[test]
    fn test_malformed() {
        for raw in ["", "[", "['unterminated]", "Who is the CEO?", "['a' 'b']", "['a'] x"] {
            assert_eq!(
                parse_question_list(raw),
                Err(QuestionListError::Malformed),
                "input {raw:?}"
            );
        }
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            QuestionListError::Malformed.to_string(),
            "Invalid format for the list of strings, expected [\"Q1\", \"Q2\"]"
        );
        assert_eq!(
            QuestionListError::NotStringList.to_string(),
            "The provided list is not valid. It should be a list of strings."
        );
    }

    #[test]
    fn test_pdf_content_type() {
        let upload = |ct: Option<&str>| PdfUpload {
            content_type: ct.map(str::to_string),
            bytes: Bytes::new(),
        };
        assert!(upload(Some("application/pdf")).is_pdf());
        assert!(upload(Some("Application/PDF; charset=binary")).is_pdf());
        assert!(!upload(Some("text/plain")).is_pdf());
        assert!(!upload(None).is_pdf());
    }
}
