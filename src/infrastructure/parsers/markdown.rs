//! Markdown document parser

use async_trait::async_trait;
use once_cell::sync::Lazy;
use pulldown_cmark::{Event, Parser, Tag};
use regex::Regex;

use super::encoding::decode_best_effort;
use crate::domain::ingestion::{
    DocumentMetadata, DocumentParser, DocumentSection, ParsedDocument, ParserContent, ParserInput,
    ParserType,
};
use crate::domain::RagError;

static HEADER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("header pattern is valid"));

/// Parser for Markdown files
#[derive(Debug, Clone, Default)]
pub struct MarkdownParser;

impl MarkdownParser {
    /// Create a new Markdown parser
    pub fn new() -> Self {
        Self
    }

    fn extract_text_and_title(markdown: &str) -> (String, Option<String>) {
        let parser = Parser::new(markdown);
        let mut text = String::new();
        let mut title: Option<String> = None;
        let mut in_heading = false;
        let mut heading_level: i32 = 0;
        let mut current_heading = String::new();

        for event in parser {
            match event {
                Event::Start(Tag::Heading(level, ..)) => {
                    in_heading = true;
                    heading_level = level as i32;
                    current_heading.clear();
                }
                Event::End(Tag::Heading(..)) => {
                    if heading_level == 1 && title.is_none() {
                        title = Some(current_heading.trim().to_string());
                    }

                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(&current_heading);
                    text.push('\n');
                    in_heading = false;
                    current_heading.clear();
                }
                Event::Text(t) | Event::Code(t) => {
                    if in_heading {
                        current_heading.push_str(&t);
                    } else {
                        text.push_str(&t);
                    }
                }
                Event::SoftBreak | Event::HardBreak => {
                    if in_heading {
                        current_heading.push(' ');
                    } else {
                        text.push(' ');
                    }
                }
                Event::Start(Tag::Paragraph) => {
                    if !text.is_empty() && !text.ends_with('\n') {
                        text.push('\n');
                    }
                }
                Event::End(Tag::Paragraph) => {
                    text.push('\n');
                }
                Event::Start(Tag::Item) => {
                    if !text.is_empty() && !text.ends_with('\n') {
                        text.push('\n');
                    }
                    text.push_str("• ");
                }
                Event::End(Tag::Item) => {
                    if !text.ends_with('\n') {
                        text.push('\n');
                    }
                }
                Event::Start(Tag::CodeBlock(_)) => {
                    if !text.is_empty() && !text.ends_with('\n') {
                        text.push('\n');
                    }
                }
                Event::End(Tag::CodeBlock(_)) => {
                    text.push('\n');
                }
                _ => {}
            }
        }

        let text = text
            .lines()
            .map(|l| l.trim())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string();

        (text, title)
    }

    /// ATX-header sections over the raw markdown, in document order.
    /// Content before the first header is not a section of its own.
    fn extract_sections(markdown: &str) -> Vec<DocumentSection> {
        let mut sections = Vec::new();
        let mut current: Option<(String, u8, Vec<&str>)> = None;

        for line in markdown.lines() {
            if let Some(captures) = HEADER_PATTERN.captures(line) {
                if let Some((title, level, lines)) = current.take() {
                    sections.push(DocumentSection::titled(
                        title,
                        level,
                        lines.join("\n").trim().to_string(),
                    ));
                }

                let level = captures[1].len() as u8;
                let title = captures[2].trim().to_string();
                current = Some((title, level, Vec::new()));
            } else if let Some((_, _, ref mut lines)) = current {
                lines.push(line);
            }
        }

        if let Some((title, level, lines)) = current {
            sections.push(DocumentSection::titled(
                title,
                level,
                lines.join("\n").trim().to_string(),
            ));
        }

        sections
    }
}

#[async_trait]
impl DocumentParser for MarkdownParser {
    fn parser_type(&self) -> ParserType {
        ParserType::Markdown
    }

    fn supported_extensions(&self) -> &[&str] {
        &["md", "markdown", "mdown"]
    }

    fn supported_mime_types(&self) -> &[&str] {
        &["text/markdown", "text/x-markdown"]
    }

    async fn parse(&self, input: ParserInput) -> Result<ParsedDocument, RagError> {
        let mut metadata = DocumentMetadata::new().with_mime_type("text/markdown");

        let raw_content = match &input.content {
            ParserContent::Text(s) => s.clone(),
            ParserContent::Bytes(b) => {
                let decoded = decode_best_effort(b);
                metadata = metadata
                    .with_encoding(decoded.encoding)
                    .with_lossy_decode(decoded.lossy);
                decoded.text
            }
        };

        let (content, title) = Self::extract_text_and_title(&raw_content);
        let sections = Self::extract_sections(&raw_content);

        if let Some(t) = title {
            metadata = metadata.with_title(t);
        }

        if let Some(ref filename) = input.filename {
            metadata = metadata.with_source(filename.clone());
        }

        for (key, value) in input.metadata {
            metadata = metadata.with_custom(key, value);
        }

        Ok(ParsedDocument::new(content, metadata, ParserType::Markdown).with_sections(sections))
    }
}
