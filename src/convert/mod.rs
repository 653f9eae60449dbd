//! Page converter
//!
//! Turns fetched HTML into Markdown or Claude XML according to [`FormatOptions`].
//!
//! # Example
//!
//! ```
//! use url::Url;
//! use webdown::config::FormatOptions;
//! use webdown::convert::convert;
//!
//! let url = Url::parse("https://example.com/").unwrap();
//! let page = convert("<h1>Hello</h1><p>World</p>", &url, &FormatOptions::default()).unwrap();
//! assert!(page.content.contains("Hello"));
//! assert_eq!(page.title.as_deref(), Some("Hello"));
//! ```

mod markdown;
mod toc;
mod xml;

pub use markdown::{
    collapse_blank_lines, html_to_markdown, normalize_setext_headings, remove_invisible,
    strip_images, strip_links, wrap_paragraphs,
};
pub use toc::{collect_headings, generate_toc, slugify, with_toc, Heading, TOC_HEADING};
pub use xml::markdown_to_claude_xml;

use crate::config::{FormatOptions, OutputFormat};
use crate::ConversionError;
use scraper::{Html, Selector};
use url::Url;

/// Converter output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converted {
    /// Markdown or Claude XML, per the requested format
    pub content: String,
    /// First level-one heading, or the HTML `<title>` when there is none
    pub title: Option<String>,
}

/// Converts an HTML page
///
/// # Errors
///
/// `ConversionError::InvalidSelector` when the CSS selector cannot be parsed.
pub fn convert(
    html: &str,
    source_url: &Url,
    options: &FormatOptions,
) -> Result<Converted, ConversionError> {
    let document = Html::parse_document(html);
    let mut markdown = markdown::markdown_from_document(&document, html, options)?;

    let title = extract_markdown_title(&markdown).or_else(|| html_title(&document));

    if options.include_toc {
        markdown = with_toc(&markdown);
    }

    let content = match options.format {
        OutputFormat::Markdown => markdown,
        OutputFormat::ClaudeXml => markdown_to_claude_xml(
            &markdown,
            Some(source_url.as_str()),
            title.as_deref(),
            options,
        ),
    };

    Ok(Converted { content, title })
}

/// Text of the first `# ` heading outside code fences
pub fn extract_markdown_title(markdown: &str) -> Option<String> {
    collect_headings(markdown)
        .into_iter()
        .find(|h| h.level == 1)
        .map(|h| h.text)
}

fn html_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Whether a line opens or closes a fenced code block
pub(crate) fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

/// Language named after an opening fence, if any
pub(crate) fn fence_language(line: &str) -> Option<String> {
    let info = line.trim_start().trim_start_matches(['`', '~']).trim();
    info.split_whitespace()
        .next()
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
}
