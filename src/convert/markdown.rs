//! HTML to Markdown
//!
//! `html2md` does the conversion; the functions here select content beforehand and
//! clean up the Markdown afterwards.

use crate::config::FormatOptions;
use crate::convert::is_fence;
use crate::ConversionError;
use regex::{Captures, Regex};
use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::warn;

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(!?)\[([^\]]*)\]\(([^)\s]*)(?:\s+"[^"]*")?\)"#)
        .expect("link pattern is valid")
});

static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"!\[[^\]]*\]\([^)\s]*(?:\s+"[^"]*")?\)"#).expect("image pattern is valid")
});

static BLANK_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank run pattern is valid"));

static LIST_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*(?:[-*+]|\d+[.)])\s+)").expect("list marker pattern is valid")
});

/// Zero-width and byte-order-mark characters
const INVISIBLE_CHARS: &[char] = &['\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}'];

/// Converts HTML to Markdown, applying every option except the table of contents
pub fn html_to_markdown(html: &str, options: &FormatOptions) -> Result<String, ConversionError> {
    let document = Html::parse_document(html);
    markdown_from_document(&document, html, options)
}

pub(crate) fn markdown_from_document(
    document: &Html,
    html: &str,
    options: &FormatOptions,
) -> Result<String, ConversionError> {
    let selected = match options.css_selector.as_deref() {
        Some(selector) => select_content(document, selector)?,
        None => None,
    };

    let mut markdown = html2md::parse_html(selected.as_deref().unwrap_or(html));
    markdown = normalize_setext_headings(&markdown);

    // Images first: `![alt](src)` also matches the link pattern
    if !options.include_images {
        markdown = strip_images(&markdown);
    }
    if !options.include_links {
        markdown = strip_links(&markdown);
    }

    markdown = remove_invisible(&markdown);

    if options.compact {
        markdown = collapse_blank_lines(&markdown);
    }
    if options.width > 0 {
        markdown = wrap_paragraphs(&markdown, options.width);
    }

    Ok(markdown)
}

/// Returns the outer HTML of every element matching `selector`
///
/// `Ok(None)` when nothing matched; the caller then converts the whole page.
fn select_content(document: &Html, selector: &str) -> Result<Option<String>, ConversionError> {
    let trimmed = selector.trim();
    if trimmed.is_empty() {
        return Err(ConversionError::InvalidSelector {
            selector: selector.to_string(),
            message: "selector is empty".to_string(),
        });
    }

    let parsed = Selector::parse(trimmed).map_err(|e| ConversionError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })?;

    let fragments: Vec<String> = document.select(&parsed).map(|el| el.html()).collect();
    if fragments.is_empty() {
        warn!(
            "CSS selector '{}' did not match any elements, converting the whole page",
            trimmed
        );
        return Ok(None);
    }

    Ok(Some(fragments.concat()))
}

/// Rewrites `Title\n=====` and `Title\n-----` headings as `# Title` and `## Title`
pub fn normalize_setext_headings(markdown: &str) -> String {
    let lines: Vec<&str> = markdown.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut in_fence = false;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        if is_fence(line) {
            in_fence = !in_fence;
            out.push(line.to_string());
            i += 1;
            continue;
        }

        if !in_fence && i + 1 < lines.len() {
            let text = line.trim();
            let marker = lines[i + 1].trim();
            let is_text = !text.is_empty()
                && !text.starts_with('#')
                && !LIST_MARKER_RE.is_match(line)
                && !text.starts_with('|');

            if is_text && !marker.is_empty() {
                let level = if marker.chars().all(|c| c == '=') {
                    Some("#")
                } else if marker.chars().all(|c| c == '-') {
                    Some("##")
                } else {
                    None
                };
                if let Some(hashes) = level {
                    out.push(format!("{} {}", hashes, text));
                    i += 2;
                    continue;
                }
            }
        }

        out.push(line.to_string());
        i += 1;
    }

    let mut result = out.join("\n");
    if markdown.ends_with('\n') {
        result.push('\n');
    }
    result
}

/// Replaces `[text](url)` with `text`, leaving images alone
pub fn strip_links(markdown: &str) -> String {
    LINK_RE
        .replace_all(markdown, |caps: &Captures| {
            if &caps[1] == "!" {
                caps[0].to_string()
            } else {
                caps[2].to_string()
            }
        })
        .into_owned()
}

/// Removes `![alt](src)` images
pub fn strip_images(markdown: &str) -> String {
    IMAGE_RE.replace_all(markdown, "").into_owned()
}

pub fn remove_invisible(markdown: &str) -> String {
    markdown.chars().filter(|c| !INVISIBLE_CHARS.contains(c)).collect()
}

/// Collapses three or more consecutive newlines into two
pub fn collapse_blank_lines(markdown: &str) -> String {
    BLANK_RUN_RE.replace_all(markdown, "\n\n").into_owned()
}

/// Wraps prose lines longer than `width` columns
///
/// Headings, table rows, quotes, indented code and fenced code are left untouched.
/// List items keep their marker and continue with a hanging indent.
pub fn wrap_paragraphs(markdown: &str, width: usize) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut in_fence = false;

    for line in markdown.lines() {
        if is_fence(line) {
            in_fence = !in_fence;
            out.push(line.to_string());
            continue;
        }

        let trimmed = line.trim_start();
        let untouchable = in_fence
            || line.chars().count() <= width
            || trimmed.starts_with('#')
            || trimmed.starts_with('|')
            || trimmed.starts_with('>')
            || line.starts_with("    ")
            || line.starts_with('\t');

        if untouchable {
            out.push(line.to_string());
            continue;
        }

        let (first_prefix, rest) = match LIST_MARKER_RE.find(line) {
            Some(m) => (m.as_str().to_string(), &line[m.end()..]),
            None => {
                let indent_len = line.len() - trimmed.len();
                (line[..indent_len].to_string(), trimmed)
            }
        };
        let hanging = " ".repeat(first_prefix.chars().count());

        out.extend(wrap_words(rest, width, &first_prefix, &hanging));
    }

    let mut result = out.join("\n");
    if markdown.ends_with('\n') {
        result.push('\n');
    }
    result
}

fn wrap_words(text: &str, width: usize, first_prefix: &str, hanging: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = first_prefix.to_string();
    let mut current_len = current.chars().count();
    let mut has_word = false;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if has_word && current_len + 1 + word_len > width {
            lines.push(std::mem::replace(&mut current, hanging.to_string()));
            current_len = hanging.chars().count();
            has_word = false;
        }
        if has_word {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
        has_word = true;
    }

    if has_word {
        lines.push(current);
    }
    lines
}
