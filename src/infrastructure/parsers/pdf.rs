//! PDF document parser

use async_trait::async_trait;
use lopdf::{Document, Object};

use crate::domain::ingestion::{
    DocumentMetadata, DocumentParser, DocumentSection, ParsedDocument, ParserContent, ParserInput,
    ParserType,
};
use crate::domain::RagError;

/// Parser for PDF files. Extracts text page by page, emitting one section
/// per non-empty page so chunks can carry their page number.
#[derive(Debug, Clone, Default)]
pub struct PdfParser;

impl PdfParser {
    /// Create a new PDF parser
    pub fn new() -> Self {
        Self
    }

    fn info_string(document: &Document, key: &[u8]) -> Option<String> {
        let info = document.trailer.get(b"Info").ok()?;
        let info = match info {
            Object::Reference(id) => document.get_object(*id).ok()?,
            other => other,
        };
        let dict = info.as_dict().ok()?;
        let value = dict.get(key).ok()?;

        match value {
            Object::String(bytes, _) => {
                let s = String::from_utf8_lossy(bytes).trim().to_string();
                (!s.is_empty()).then_some(s)
            }
            _ => None,
        }
    }
}

#[async_trait]
impl DocumentParser for PdfParser {
    fn parser_type(&self) -> ParserType {
        ParserType::Pdf
    }

    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }

    fn supported_mime_types(&self) -> &[&str] {
        &["application/pdf"]
    }

    async fn parse(&self, input: ParserInput) -> Result<ParsedDocument, RagError> {
        let bytes = input.content.as_bytes();

        let document = Document::load_mem(&bytes)
            .map_err(|e| RagError::malformed_input(format!("Failed to load PDF: {}", e)))?;

        let pages = document.get_pages();
        let total_pages = pages.len();

        let mut full_text = Vec::new();
        let mut sections = Vec::new();

        for page_number in pages.keys() {
            let page_text = match document.extract_text(&[*page_number]) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(page = page_number, error = %e, "Failed to extract PDF page text");
                    continue;
                }
            };

            let page_text = page_text.trim().to_string();
            if page_text.is_empty() {
                continue;
            }

            full_text.push(page_text.clone());
            sections.push(
                DocumentSection::page(*page_number, page_text)
                    .with_metadata("total_pages", serde_json::json!(total_pages)),
            );
        }

        let mut metadata = DocumentMetadata::new()
            .with_mime_type("application/pdf")
            .with_custom("pages", serde_json::json!(total_pages));

        if let Some(title) = Self::info_string(&document, b"Title") {
            metadata = metadata.with_title(title);
        }

        if let Some(author) = Self::info_string(&document, b"Author") {
            metadata = metadata.with_author(author);
        }

        if let Some(ref filename) = input.filename {
            metadata = metadata.with_source(filename.clone());
        }

        for (key, value) in input.metadata {
            metadata = metadata.with_custom(key, value);
        }

        Ok(
            ParsedDocument::new(full_text.join("\n\n"), metadata, ParserType::Pdf)
                .with_sections(sections),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_parse_invalid_pdf_is_malformed() {
        let parser = PdfParser::new();
        let input = ParserInput::from_bytes(b"not a pdf at all".to_vec());

        let result = parser.parse(input).await;

        assert!(matches!(result, Err(RagError::MalformedInput { .. })));
    }

    #[test]
    fn test_supports_file() {
        let parser = PdfParser::new();
        assert!(parser.supports_file("report.pdf"));
        assert!(parser.supports_file("REPORT.PDF"));
        assert!(!parser.supports_file("report.txt"));
    }

    #[test]
    fn test_supports_mime() {
        let parser = PdfParser::new();
        assert!(parser.supports_mime("application/pdf"));
        assert!(!parser.supports_mime("application/json"));
    }
}
