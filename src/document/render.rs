//! PDF → Markdown-like text for the sectioner.
//!
//! Text is extracted page by page. Lines that look like headings (explicit
//! `#` markers, numbered section titles, short ALL-CAPS lines) are promoted to
//! Markdown headings and every page is followed by the `-----` separator that
//! the unit builder counts as a page boundary.

use anyhow::{Context, Result};

use super::HeadingLevel;

/// Separator written after every page; contains [`super::PAGE_BREAK`].
const PAGE_SEPARATOR: &str = "\n\n-----\n\n";

const MAX_NUMBERED_HEADING_CHARS: usize = 80;
const MAX_NUMBERED_HEADING_WORDS: usize = 12;
const MAX_CAPS_HEADING_CHARS: usize = 60;
const MAX_CAPS_HEADING_WORDS: usize = 8;

/// Extract and render a PDF held in memory.
pub fn pdf_to_markdown(bytes: &[u8]) -> Result<String> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .context("Failed to extract text from PDF")?;
    tracing::debug!("Extracted {} pages", pages.len());
    Ok(render_pages(&pages))
}

/// Render already-extracted page texts.
pub fn render_pages<S: AsRef<str>>(pages: &[S]) -> String {
    let mut out = String::new();
    let mut saw_heading = false;

    for page in pages {
        for line in page.as_ref().lines() {
            let line = line.trim();
            match promote_heading(line) {
                Some(heading) => {
                    saw_heading = true;
                    out.push_str(&heading);
                }
                None => out.push_str(line),
            }
            out.push('\n');
        }
        out.push_str(PAGE_SEPARATOR);
    }

    if !saw_heading && !out.trim().is_empty() {
        out.insert_str(0, "# Document\n");
    }
    out
}

/// Return the Markdown heading form of `line`, or None for body text.
pub fn promote_heading(line: &str) -> Option<String> {
    if line.is_empty() {
        return None;
    }
    if line.starts_with('#') {
        // Already Markdown; the sectioner decides whether the depth is usable.
        return line.contains("# ").then(|| line.to_string());
    }
    if let Some(level) = numbered_heading_level(line) {
        return Some(format!("{} {}", level.marker(), line));
    }
    if is_caps_heading(line) {
        return Some(format!("{} {line}", HeadingLevel::Parent.marker()));
    }
    None
}

/// Level of a numbered section title such as `2.1 Scope` or `3. Leave Policy`.
fn numbered_heading_level(line: &str) -> Option<HeadingLevel> {
    if line.chars().count() > MAX_NUMBERED_HEADING_CHARS {
        return None;
    }
    let (number, title) = line.split_once(' ')?;
    let title = title.trim();

    let number = number.strip_suffix('.').unwrap_or(number);
    let parts: Vec<&str> = number.split('.').collect();
    if parts.is_empty()
        || !parts
            .iter()
            .all(|p| !p.is_empty() && p.len() <= 3 && p.chars().all(|c| c.is_ascii_digit()))
    {
        return None;
    }

    let starts_upper = title.chars().next().is_some_and(|c| c.is_uppercase());
    let ends_like_sentence = title.ends_with(['.', ',', ';', ':', '?', '!']);
    let words = title.split_whitespace().count();
    if !starts_upper || ends_like_sentence || words == 0 || words > MAX_NUMBERED_HEADING_WORDS {
        return None;
    }

    HeadingLevel::from_depth(parts.len())
}

fn is_caps_heading(line: &str) -> bool {
    if line.chars().count() > MAX_CAPS_HEADING_CHARS
        || line.split_whitespace().count() > MAX_CAPS_HEADING_WORDS
    {
        return false;
    }
    let letters: Vec<char> = line.chars().filter(|c| c.is_alphabetic()).collect();
    letters.len() >= 2 && letters.iter().all(|c| c.is_uppercase())
}
