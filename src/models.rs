use serde::{Deserialize, Serialize};

/// Snapshot of the four open heading levels at a section boundary.
///
/// Each field is either absent or a multi-line string whose first line is the
/// heading itself (with its `#` markers) and whose remaining lines are the body
/// accumulated under that heading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRecord {
    pub parent_title: Option<String>,
    pub child_title: Option<String>,
    pub grand_child_title: Option<String>,
    pub great_grand_child_title: Option<String>,
}

impl SectionRecord {
    /// The four level fields, shallowest first.
    pub fn levels(&self) -> [Option<&str>; 4] {
        [
            self.parent_title.as_deref(),
            self.child_title.as_deref(),
            self.grand_child_title.as_deref(),
            self.great_grand_child_title.as_deref(),
        ]
    }
}

/// 1-based inclusive page range covered by a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpan {
    pub start_page: usize,
    pub end_page: usize,
}

/// The atomic text + metadata object indexed and retrieved against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievableUnit {
    /// 1-based position in emission order. Stable identity across queries.
    pub sequence_id: u64,
    pub content: String,
    pub page_span: PageSpan,
    /// Breadcrumb of the headings this unit sits under.
    pub index_path: String,
}

/// A unit returned by the hybrid retriever for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedCandidate {
    pub unit: RetrievableUnit,
    pub relevance_score: f32,
}

impl RetrievedCandidate {
    pub fn sequence_id(&self) -> u64 {
        self.unit.sequence_id
    }
}

/// A single chat turn sent to the language model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Structured error payload returned in place of an answer map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
