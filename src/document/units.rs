//! Flattening section records into retrievable units with page spans.

use std::collections::HashSet;

use super::PAGE_BREAK;
use crate::models::{PageSpan, RetrievableUnit, SectionRecord};

/// Heading titles seen so far in one document, in first-seen order.
///
/// Owned by a single [`UnitBuilder`] run; a title that is already present only
/// contributes its heading line to later units.
#[derive(Debug, Default, Clone)]
pub struct TitleIndex {
    seen: HashSet<String>,
    ordered: Vec<String>,
}

impl TitleIndex {
    /// Record `title`; returns true the first time it is seen.
    pub fn insert(&mut self, title: &str) -> bool {
        if self.seen.contains(title) {
            return false;
        }
        self.seen.insert(title.to_string());
        self.ordered.push(title.to_string());
        true
    }

    pub fn titles(&self) -> &[String] {
        &self.ordered
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Newline-joined titles; the document vocabulary handed to query expansion.
    pub fn breadcrumb(&self) -> String {
        self.ordered.join("\n")
    }
}

/// Builds units from records in order, tracking titles and the running page.
#[derive(Debug)]
pub struct UnitBuilder {
    titles: TitleIndex,
    page_number: usize,
    next_id: u64,
}

impl Default for UnitBuilder {
    fn default() -> Self {
        Self {
            titles: TitleIndex::default(),
            page_number: 1,
            next_id: 1,
        }
    }
}

impl UnitBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: &SectionRecord) -> RetrievableUnit {
        let mut content = String::new();
        let mut index_path = String::new();

        // Once any level leaves the content ending on a page break, the next
        // unit starts on the following page.
        let mut carry = false;
        for field in record.levels().into_iter().flatten() {
            let title = field.split('\n').next().unwrap_or_default();
            index_path.push_str("\n\n");
            index_path.push_str(title);

            content.push('\n');
            if self.titles.insert(title) {
                content.push_str(field);
            } else {
                content.push_str(title);
            }
            carry |= ends_with_page_break(&content);
        }

        let page_span = page_span(&content, self.page_number);
        self.page_number = page_span.end_page + usize::from(carry);

        let unit = RetrievableUnit {
            sequence_id: self.next_id,
            content,
            page_span,
            index_path,
        };
        self.next_id += 1;
        unit
    }

    pub fn finish(self) -> TitleIndex {
        self.titles
    }
}

/// Build all units for a document, returning them with the title index.
pub fn build_units(records: &[SectionRecord]) -> (Vec<RetrievableUnit>, TitleIndex) {
    let mut builder = UnitBuilder::new();
    let units = records.iter().map(|r| builder.push(r)).collect();
    (units, builder.finish())
}

/// Page span of `content` starting on `start_page`. A trailing page break is
/// not counted.
fn page_span(content: &str, start_page: usize) -> PageSpan {
    let mut breaks = content.matches(PAGE_BREAK).count();
    if ends_with_page_break(content) {
        breaks -= 1;
    }
    PageSpan {
        start_page,
        end_page: start_page + breaks,
    }
}

/// True when the last page break is followed only by non-letter characters.
fn ends_with_page_break(content: &str) -> bool {
    content
        .rfind(PAGE_BREAK)
        .map(|pos| {
            !content[pos + PAGE_BREAK.len()..]
                .chars()
                .any(|c| c.is_ascii_alphabetic())
        })
        .unwrap_or(false)
}
