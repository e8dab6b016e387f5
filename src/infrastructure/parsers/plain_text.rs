//! Plain text document parser

use async_trait::async_trait;

use super::encoding::decode_best_effort;
use crate::domain::ingestion::{
    DocumentMetadata, DocumentParser, ParsedDocument, ParserContent, ParserInput, ParserType,
};
use crate::domain::RagError;

/// Parser for plain text files. Terminal fallback in the selection order.
#[derive(Debug, Clone, Default)]
pub struct PlainTextParser;

impl PlainTextParser {
    /// Create a new plain text parser
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentParser for PlainTextParser {
    fn parser_type(&self) -> ParserType {
        ParserType::PlainText
    }

    fn supported_extensions(&self) -> &[&str] {
        &["txt", "text", "log", "csv", "tsv"]
    }

    fn supported_mime_types(&self) -> &[&str] {
        &["text/plain", "text/csv"]
    }

    async fn parse(&self, input: ParserInput) -> Result<ParsedDocument, RagError> {
        let mut metadata = DocumentMetadata::new().with_mime_type("text/plain");

        let content = match &input.content {
            ParserContent::Text(s) => s.clone(),
            ParserContent::Bytes(b) => {
                let decoded = decode_best_effort(b);
                metadata = metadata
                    .with_encoding(decoded.encoding)
                    .with_lossy_decode(decoded.lossy);
                decoded.text
            }
        };

        if let Some(ref filename) = input.filename {
            metadata = metadata.with_source(filename.clone());
        }

        for (key, value) in input.metadata {
            metadata = metadata.with_custom(key, value);
        }

        Ok(ParsedDocument::new(content, metadata, ParserType::PlainText))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_parse_text_content() {
        let parser = PlainTextParser::new();
        let input = ParserInput::from_text("Hello, World!");

        let result = parser.parse(input).await.unwrap();

        assert_eq!(result.content, "Hello, World!");
        assert_eq!(result.metadata.mime_type, Some("text/plain".to_string()));
        assert!(!result.has_sections());
    }

    #[tokio::test]
    async fn test_parse_bytes_records_encoding() {
        let parser = PlainTextParser::new();
        let input = ParserInput::from_bytes(b"Hello from bytes".to_vec());

        let result = parser.parse(input).await.unwrap();

        assert_eq!(result.content, "Hello from bytes");
        assert!(result.metadata.encoding.is_some());
        assert!(!result.metadata.lossy_decode);
    }

    #[tokio::test]
    async fn test_parse_non_utf8_never_fails() {
        let parser = PlainTextParser::new();
        // "café" in ISO-8859-1
        let input = ParserInput::from_bytes(vec![0x63, 0x61, 0x66, 0xe9]);

        let result = parser.parse(input).await.unwrap();
        assert!(result.content.contains("caf"));
    }

    #[tokio::test]
    async fn test_parse_with_filename() {
        let parser = PlainTextParser::new();
        let input = ParserInput::from_text("content").with_filename("test.txt");

        let result = parser.parse(input).await.unwrap();

        assert_eq!(result.metadata.source, Some("test.txt".to_string()));
    }

    #[test]
    fn test_supports_file() {
        let parser = PlainTextParser::new();
        assert!(parser.supports_file("document.txt"));
        assert!(parser.supports_file("document.TXT"));
        assert!(parser.supports_file("server.log"));
        assert!(!parser.supports_file("document.md"));
    }

    #[test]
    fn test_supports_mime() {
        let parser = PlainTextParser::new();
        assert!(parser.supports_mime("text/plain"));
        assert!(parser.supports_mime("text/plain; charset=utf-8"));
        assert!(!parser.supports_mime("text/html"));
    }
}
