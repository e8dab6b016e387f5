//! HTML document parser

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use super::encoding::decode_best_effort;
use crate::domain::ingestion::{
    DocumentMetadata, DocumentParser, DocumentSection, ParsedDocument, ParserContent, ParserInput,
    ParserType,
};
use crate::domain::RagError;

/// Parser for HTML files
#[derive(Debug, Clone, Default)]
pub struct HtmlParser;

impl HtmlParser {
    /// Create a new HTML parser
    pub fn new() -> Self {
        Self
    }

    fn extract_title(document: &Html) -> Option<String> {
        let title_selector = Selector::parse("title").ok()?;
        document
            .select(&title_selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn extract_text(document: &Html) -> String {
        let body_selector = Selector::parse("body").ok();

        let root = if let Some(ref sel) = body_selector {
            document.select(sel).next()
        } else {
            None
        };

        let text = if let Some(body) = root {
            Self::extract_element_text(&body)
        } else {
            document.root_element().text().collect::<String>()
        };

        Self::normalize_text(&text)
    }

    fn extract_element_text(element: &ElementRef) -> String {
        let mut text = String::new();

        for node in element.children() {
            if let Some(el) = ElementRef::wrap(node) {
                let tag_name = el.value().name();

                if matches!(tag_name, "script" | "style" | "noscript" | "head") {
                    continue;
                }

                if matches!(
                    tag_name,
                    "p" | "div"
                        | "h1"
                        | "h2"
                        | "h3"
                        | "h4"
                        | "h5"
                        | "h6"
                        | "br"
                        | "li"
                        | "tr"
                        | "td"
                        | "th"
                ) {
                    if !text.is_empty() && !text.ends_with('\n') {
                        text.push('\n');
                    }
                }

                text.push_str(&Self::extract_element_text(&el));

                if matches!(tag_name, "p" | "div" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6") {
                    text.push('\n');
                }
            } else if let Some(txt) = node.value().as_text() {
                text.push_str(txt);
            }
        }

        text
    }

    fn normalize_text(text: &str) -> String {
        let lines: Vec<&str> = text
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect();

        lines.join("\n")
    }

    fn heading_level(tag_name: &str) -> Option<u8> {
        match tag_name {
            "h1" => Some(1),
            "h2" => Some(2),
            "h3" => Some(3),
            "h4" => Some(4),
            "h5" => Some(5),
            "h6" => Some(6),
            _ => None,
        }
    }

    /// Header-delimited sections: each `<h1..h6>` starts a section holding
    /// the text of its following siblings up to the next header.
    fn extract_sections(document: &Html) -> Vec<DocumentSection> {
        let Ok(header_selector) = Selector::parse("h1, h2, h3, h4, h5, h6") else {
            return Vec::new();
        };

        let mut sections = Vec::new();

        for header in document.select(&header_selector) {
            let Some(level) = Self::heading_level(header.value().name()) else {
                continue;
            };

            let title = header.text().collect::<String>().trim().to_string();
            let mut content_parts = Vec::new();

            for sibling in header.next_siblings() {
                if let Some(el) = ElementRef::wrap(sibling) {
                    if Self::heading_level(el.value().name()).is_some() {
                        break;
                    }

                    let text = Self::normalize_text(&Self::extract_element_text(&el));
                    if !text.is_empty() {
                        content_parts.push(text);
                    }
                } else if let Some(txt) = sibling.value().as_text() {
                    let trimmed = txt.trim();
                    if !trimmed.is_empty() {
                        content_parts.push(trimmed.to_string());
                    }
                }
            }

            sections.push(DocumentSection::titled(title, level, content_parts.join("\n")));
        }

        sections
    }

    fn extract_meta_tags(document: &Html) -> Vec<(String, String)> {
        let Ok(meta_selector) = Selector::parse("meta") else {
            return Vec::new();
        };

        document
            .select(&meta_selector)
            .filter_map(|meta| {
                let name = meta
                    .value()
                    .attr("name")
                    .or_else(|| meta.value().attr("property"))?;
                let content = meta.value().attr("content")?;
                Some((name.to_string(), content.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl DocumentParser for HtmlParser {
    fn parser_type(&self) -> ParserType {
        ParserType::Html
    }

    fn supported_extensions(&self) -> &[&str] {
        &["html", "htm", "xhtml"]
    }

    fn supported_mime_types(&self) -> &[&str] {
        &["text/html", "application/xhtml+xml"]
    }

    async fn parse(&self, input: ParserInput) -> Result<ParsedDocument, RagError> {
        let mut metadata = DocumentMetadata::new().with_mime_type("text/html");

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

        let document = Html::parse_document(&raw_content);

        let content = Self::extract_text(&document);
        let sections = Self::extract_sections(&document);

        if let Some(title) = Self::extract_title(&document) {
            metadata = metadata.with_title(title);
        }

        for (name, value) in Self::extract_meta_tags(&document) {
            metadata = metadata.with_custom(
                format!("meta_{}", name),
                serde_json::Value::String(value),
            );
        }

        if let Some(ref filename) = input.filename {
            metadata = metadata.with_source(filename.clone());
        }

        for (key, value) in input.metadata {
            metadata = metadata.with_custom(key, value);
        }

        Ok(ParsedDocument::new(content, metadata, ParserType::Html).with_sections(sections))
    }
}
