//! Document sectioning: Markdown-rendered text → heading-hierarchy records → retrievable units.

pub mod render;
pub mod units;

use crate::models::SectionRecord;

/// Literal page separator emitted between rendered pages.
pub const PAGE_BREAK: &str = "\n-----\n";

/// The four fixed heading depths tracked by the sectioner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HeadingLevel {
    Parent,
    Child,
    GrandChild,
    GreatGrandChild,
}

impl HeadingLevel {
    /// Deepest first; the order in which body text looks for an open section.
    const DEEPEST_FIRST: [HeadingLevel; 4] = [
        HeadingLevel::GreatGrandChild,
        HeadingLevel::GrandChild,
        HeadingLevel::Child,
        HeadingLevel::Parent,
    ];

    fn slot(self) -> usize {
        match self {
            HeadingLevel::Parent => 0,
            HeadingLevel::Child => 1,
            HeadingLevel::GrandChild => 2,
            HeadingLevel::GreatGrandChild => 3,
        }
    }

    /// Markdown depth (1-4).
    pub fn depth(self) -> usize {
        self.slot() + 1
    }

    /// The `#` run that opens a heading at this level.
    pub fn marker(self) -> String {
        "#".repeat(self.depth())
    }

    pub fn from_depth(depth: usize) -> Option<Self> {
        match depth {
            1 => Some(HeadingLevel::Parent),
            2 => Some(HeadingLevel::Child),
            3 => Some(HeadingLevel::GrandChild),
            4 => Some(HeadingLevel::GreatGrandChild),
            _ => None,
        }
    }
}

/// Classification of a single stripped input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Heading(HeadingLevel),
    Body,
}

impl LineKind {
    pub fn classify(line: &str) -> Self {
        if line.starts_with("# ") {
            LineKind::Heading(HeadingLevel::Parent)
        } else if line.starts_with("## ") {
            LineKind::Heading(HeadingLevel::Child)
        } else if line.starts_with("### ") {
            LineKind::Heading(HeadingLevel::GrandChild)
        } else if line.starts_with("#### ") {
            LineKind::Heading(HeadingLevel::GreatGrandChild)
        } else {
            LineKind::Body
        }
    }
}

/// Streaming sectioner holding one accumulator per heading level.
#[derive(Debug, Default)]
pub struct Sectioner {
    open: [Option<String>; 4],
    records: Vec<SectionRecord>,
}

impl Sectioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_line(&mut self, raw: &str) {
        let line = raw.trim();
        match LineKind::classify(line) {
            LineKind::Heading(level) => self.open_heading(level, line),
            LineKind::Body => self.append_body(line),
        }
    }

    /// Close the document. Only emits if a top-level section is open.
    pub fn finish(mut self) -> Vec<SectionRecord> {
        if self.open[HeadingLevel::Parent.slot()].is_some() {
            self.emit();
        }
        self.records
    }

    /// The deepest level currently holding text, if any.
    pub fn deepest_open(&self) -> Option<HeadingLevel> {
        HeadingLevel::DEEPEST_FIRST
            .into_iter()
            .find(|level| self.open[level.slot()].is_some())
    }

    fn open_heading(&mut self, level: HeadingLevel, line: &str) {
        if self.open[level.slot()].is_some() {
            self.emit();
        }
        self.open[level.slot()] = Some(line.to_string());
        for deeper in &mut self.open[level.slot() + 1..] {
            *deeper = None;
        }
    }

    fn append_body(&mut self, line: &str) {
        // Text before the first heading has nowhere to go.
        if let Some(level) = self.deepest_open() {
            if let Some(section) = self.open[level.slot()].as_mut() {
                section.push('\n');
                section.push_str(line);
            }
        }
    }

    fn emit(&mut self) {
        let [parent, child, grand_child, great_grand_child] = self.open.clone();
        self.records.push(SectionRecord {
            parent_title: parent,
            child_title: child,
            grand_child_title: grand_child,
            great_grand_child_title: great_grand_child,
        });
    }
}

/// Split a Markdown-rendered document into section records, in document order.
pub fn parse_sections(text: &str) -> Vec<SectionRecord> {
    let mut sectioner = Sectioner::new();
    for line in text.lines() {
        sectioner.push_line(line);
    }
    sectioner.finish()
}
