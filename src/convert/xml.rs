//! Markdown to Claude XML
//!
//! Produces a `<claude_documentation>` document: an optional `<metadata>` block, then
//! `<content>` holding free text, code blocks and one `<section>` per heading.

use crate::config::{FormatOptions, CLAUDE_DOC_TAG};
use crate::convert::{fence_language, is_fence};
use chrono::Utc;
use quick_xml::escape::escape;
use regex::Regex;
use std::sync::LazyLock;

static ATX_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,6}\s+(.+?)\s*#*\s*$").expect("heading pattern is valid"));

#[derive(Debug, PartialEq, Eq)]
enum Block {
    Text(String),
    Code { language: Option<String>, code: String },
}

#[derive(Debug, Default)]
struct Section {
    heading: Option<String>,
    blocks: Vec<Block>,
}

/// Indented line writer
struct XmlWriter {
    lines: Vec<String>,
}

impl XmlWriter {
    fn new() -> Self {
        Self { lines: Vec::new() }
    }

    fn line(&mut self, level: usize, text: impl AsRef<str>) {
        self.lines
            .push(format!("{}{}", "  ".repeat(level), text.as_ref()));
    }

    fn element(&mut self, level: usize, tag: &str, text: &str) {
        self.line(level, format!("<{tag}>{}</{tag}>", escape(text)));
    }

    fn finish(self) -> String {
        self.lines.join("\n")
    }
}

/// Converts Markdown to Claude XML
///
/// # Arguments
///
/// * `markdown` - Markdown to convert
/// * `source_url` - Written to `<source>` in the metadata
/// * `title` - Written to `<title>` in the metadata
/// * `options` - `include_metadata` and `add_date` are honored
pub fn markdown_to_claude_xml(
    markdown: &str,
    source_url: Option<&str>,
    title: Option<&str>,
    options: &FormatOptions,
) -> String {
    let mut w = XmlWriter::new();
    w.line(0, format!("<{}>", CLAUDE_DOC_TAG));

    if options.include_metadata {
        write_metadata(&mut w, title, source_url, options.add_date);
    }

    w.line(1, "<content>");
    for section in parse_sections(markdown) {
        match &section.heading {
            Some(heading) => {
                w.line(2, "<section>");
                w.element(3, "heading", heading);
                write_blocks(&mut w, 3, &section.blocks);
                w.line(2, "</section>");
            }
            None => write_blocks(&mut w, 2, &section.blocks),
        }
    }
    w.line(1, "</content>");

    w.line(0, format!("</{}>", CLAUDE_DOC_TAG));
    w.finish()
}

fn write_metadata(w: &mut XmlWriter, title: Option<&str>, source: Option<&str>, add_date: bool) {
    let date = add_date.then(|| Utc::now().format("%Y-%m-%d").to_string());
    if title.is_none() && source.is_none() && date.is_none() {
        return;
    }

    w.line(1, "<metadata>");
    if let Some(title) = title {
        w.element(2, "title", title);
    }
    if let Some(source) = source {
        w.element(2, "source", source);
    }
    if let Some(date) = &date {
        w.element(2, "date", date);
    }
    w.line(1, "</metadata>");
}

fn write_blocks(w: &mut XmlWriter, level: usize, blocks: &[Block]) {
    for block in blocks {
        match block {
            Block::Text(text) => w.element(level, "text", text),
            Block::Code { language, code } => {
                match language {
                    Some(lang) => w.line(level, format!("<code language=\"{}\">", escape(lang.as_str()))),
                    None => w.line(level, "<code>"),
                }
                for code_line in code.lines() {
                    w.line(level + 1, escape(code_line));
                }
                w.line(level, "</code>");
            }
        }
    }
}

/// Splits Markdown into a heading-less preamble and one section per heading
fn parse_sections(markdown: &str) -> Vec<Section> {
    let mut sections = vec![Section::default()];
    let mut paragraph: Vec<&str> = Vec::new();
    let mut code: Option<(Option<String>, Vec<&str>)> = None;

    fn flush(paragraph: &mut Vec<&str>, section: &mut Section) {
        let text = paragraph.join("\n");
        let text = text.trim();
        if !text.is_empty() {
            section.blocks.push(Block::Text(text.to_string()));
        }
        paragraph.clear();
    }

    for line in markdown.lines() {
        if let Some((language, body)) = code.as_mut() {
            if is_fence(line) {
                let block = Block::Code {
                    language: language.take(),
                    code: body.join("\n"),
                };
                if let Some(section) = sections.last_mut() {
                    section.blocks.push(block);
                }
                code = None;
            } else {
                body.push(line);
            }
            continue;
        }

        let Some(section) = sections.last_mut() else {
            continue;
        };

        if is_fence(line) {
            flush(&mut paragraph, section);
            code = Some((fence_language(line), Vec::new()));
        } else if let Some(caps) = ATX_HEADING_RE.captures(line) {
            flush(&mut paragraph, section);
            sections.push(Section {
                heading: Some(caps[1].to_string()),
                blocks: Vec::new(),
            });
        } else if line.trim().is_empty() {
            flush(&mut paragraph, section);
        } else {
            paragraph.push(line);
        }
    }

    // Unterminated fence: keep its content as code
    if let Some((language, body)) = code {
        if let Some(section) = sections.last_mut() {
            section.blocks.push(Block::Code {
                language,
                code: body.join("\n"),
            });
        }
    }
    if let Some(section) = sections.last_mut() {
        flush(&mut paragraph, section);
    }

    sections
}
