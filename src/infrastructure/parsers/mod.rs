//! Document parser family and capability-based selection

pub mod docx;
pub mod encoding;
pub mod html;
pub mod markdown;
pub mod pdf;
pub mod plain_text;
pub mod source_code;

pub use docx::DocxParser;
pub use html::HtmlParser;
pub use markdown::MarkdownParser;
pub use pdf::PdfParser;
pub use plain_text::PlainTextParser;
pub use source_code::SourceCodeParser;

use crate::domain::ingestion::{
    DocumentParser, ParsedDocument, ParserContent, ParserInput, ParserType,
};
use crate::domain::RagError;

/// Capability-based parser selection.
///
/// Selection is a pure function from declared/detected type to a
/// `ParserType` variant, evaluated most-specific first with plain text as
/// the terminal fallback, so ambiguous MIME types resolve identically on
/// every run.
#[derive(Debug, Default)]
pub struct ParserFactory;

impl ParserFactory {
    /// Create a new factory
    pub fn new() -> Self {
        Self
    }

    /// Instantiate the parser for a format
    pub fn create(parser_type: ParserType) -> Box<dyn DocumentParser> {
        match parser_type {
            ParserType::PlainText => Box::new(PlainTextParser::new()),
            ParserType::Markdown => Box::new(MarkdownParser::new()),
            ParserType::Html => Box::new(HtmlParser::new()),
            ParserType::Pdf => Box::new(PdfParser::new()),
            ParserType::Docx => Box::new(DocxParser::new()),
            ParserType::SourceCode => Box::new(SourceCodeParser::new()),
        }
    }

    /// Determine the format for an input: declared MIME type first, then
    /// the filename (explicit extension tables, then `mime_guess`), then
    /// content sniffing for container formats.
    pub fn detect(input: &ParserInput) -> Result<ParserType, RagError> {
        let candidates: Vec<Box<dyn DocumentParser>> = ParserType::SELECTION_ORDER
            .iter()
            .map(|t| Self::create(*t))
            .collect();

        if let Some(ref mime) = input.declared_mime {
            for parser in &candidates {
                if parser.supports_mime(mime) {
                    return Ok(parser.parser_type());
                }
            }
        }

        if let Some(ref filename) = input.filename {
            for parser in &candidates {
                if parser.supports_file(filename) {
                    return Ok(parser.parser_type());
                }
            }

            if let Some(guessed) = mime_guess::from_path(filename).first() {
                let guessed = guessed.essence_str().to_string();
                for parser in &candidates {
                    if parser.supports_mime(&guessed) {
                        return Ok(parser.parser_type());
                    }
                }
            }
        }

        match &input.content {
            ParserContent::Bytes(bytes) => {
                if bytes.starts_with(b"%PDF-") {
                    return Ok(ParserType::Pdf);
                }

                if bytes.starts_with(b"PK\x03\x04") {
                    return Ok(ParserType::Docx);
                }

                // Binary content no parser claims is unsupported rather
                // than silently mangled by the text fallback.
                if bytes.contains(&0u8) {
                    return Err(RagError::unsupported_format(format!(
                        "no parser claims binary input ({} bytes)",
                        bytes.len()
                    )));
                }

                Ok(ParserType::PlainText)
            }
            ParserContent::Text(_) => Ok(ParserType::PlainText),
        }
    }

    /// Detect the format and parse in one step
    pub async fn parse(&self, input: ParserInput) -> Result<ParsedDocument, RagError> {
        let parser_type = Self::detect(&input)?;
        Self::create(parser_type).parse(input).await
    }

    /// Parse with an explicit format, bypassing detection
    pub async fn parse_as(
        &self,
        parser_type: ParserType,
        input: ParserInput,
    ) -> Result<ParsedDocument, RagError> {
        Self::create(parser_type).parse(input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_declared_mime() {
        let input = ParserInput::from_text("# md").with_declared_mime("text/markdown");
        assert_eq!(ParserFactory::detect(&input).unwrap(), ParserType::Markdown);

        let input = ParserInput::from_bytes(b"%PDF-1.7".to_vec())
            .with_declared_mime("application/pdf");
        assert_eq!(ParserFactory::detect(&input).unwrap(), ParserType::Pdf);
    }

    #[test]
    fn test_detect_by_extension() {
        let input = ParserInput::from_text("body").with_filename("page.html");
        assert_eq!(ParserFactory::detect(&input).unwrap(), ParserType::Html);

        let input = ParserInput::from_text("fn x() {}").with_filename("lib.rs");
        assert_eq!(ParserFactory::detect(&input).unwrap(), ParserType::SourceCode);
    }

    #[test]
    fn test_detect_falls_back_to_plain_text() {
        let input = ParserInput::from_text("just words");
        assert_eq!(ParserFactory::detect(&input).unwrap(), ParserType::PlainText);

        let input = ParserInput::from_text("words").with_filename("unknown.zzz");
        assert_eq!(ParserFactory::detect(&input).unwrap(), ParserType::PlainText);
    }

    #[test]
    fn test_detect_by_magic_bytes() {
        let input = ParserInput::from_bytes(b"%PDF-1.4 rest".to_vec());
        assert_eq!(ParserFactory::detect(&input).unwrap(), ParserType::Pdf);

        let input = ParserInput::from_bytes(b"PK\x03\x04rest".to_vec());
        assert_eq!(ParserFactory::detect(&input).unwrap(), ParserType::Docx);
    }

    #[test]
    fn test_detect_rejects_unclaimed_binary() {
        let input = ParserInput::from_bytes(vec![0x00, 0x01, 0x02, 0x00]);
        let result = ParserFactory::detect(&input);

        assert!(matches!(result, Err(RagError::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_detection_is_deterministic() {
        // .html is in both the HTML and code extension tables; selection
        // order must resolve it to HTML every time.
        for _ in 0..5 {
            let input = ParserInput::from_text("<html></html>").with_filename("index.html");
            assert_eq!(ParserFactory::detect(&input).unwrap(), ParserType::Html);
        }
    }

    #[tokio::test]
    async fn test_parse_end_to_end() {
        let factory = ParserFactory::new();
        let input = ParserInput::from_text("# Title\n\nBody text.").with_filename("doc.md");

        let result = factory.parse(input).await.unwrap();

        assert_eq!(result.source_type, ParserType::Markdown);
        assert!(result.content.contains("Body text"));
    }

    #[tokio::test]
    async fn test_parse_as_overrides_detection() {
        let factory = ParserFactory::new();
        let input = ParserInput::from_text("# Not treated as markdown").with_filename("doc.md");

        let result = factory.parse_as(ParserType::PlainText, input).await.unwrap();

        assert_eq!(result.source_type, ParserType::PlainText);
        assert!(result.content.starts_with("# Not"));
    }
}
