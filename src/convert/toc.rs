//! Table of contents generation

use crate::convert::is_fence;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+?)\s*#*\s*$").expect("heading pattern is valid"));

/// Heading line of the generated table of contents
pub const TOC_HEADING: &str = "# Table of Contents";

/// A Markdown heading found outside code fences
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: usize,
    pub text: String,
}

/// Collects ATX headings, skipping fenced code blocks
pub fn collect_headings(markdown: &str) -> Vec<Heading> {
    let mut in_fence = false;
    let mut headings = Vec::new();

    for line in markdown.lines() {
        if is_fence(line) {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(caps) = HEADING_RE.captures(line) {
            headings.push(Heading {
                level: caps[1].len(),
                text: caps[2].to_string(),
            });
        }
    }

    headings
}

/// Turns heading text into an anchor: lowercase, spaces to hyphens, punctuation dropped
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .replace(' ', "-")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Builds the table of contents, or `None` when the document has no headings
pub fn generate_toc(markdown: &str) -> Option<String> {
    let headings = collect_headings(markdown);
    if headings.is_empty() {
        return None;
    }

    let mut used: HashMap<String, usize> = HashMap::new();
    let mut lines = vec![TOC_HEADING.to_string(), String::new()];

    for heading in headings {
        let mut anchor = slugify(&heading.text);
        let count = used.entry(anchor.clone()).or_insert(0);
        *count += 1;
        if *count > 1 {
            anchor = format!("{}-{}", anchor, count);
        }

        let indent = "  ".repeat(heading.level - 1);
        lines.push(format!("{}- [{}](#{})", indent, heading.text, anchor));
    }

    Some(lines.join("\n"))
}

/// Prepends the table of contents to the document, if it has headings
pub fn with_toc(markdown: &str) -> String {
    match generate_toc(markdown) {
        Some(toc) => format!("{}\n\n{}", toc, markdown),
        None => markdown.to_string(),
    }
}
