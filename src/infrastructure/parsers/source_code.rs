//! Source code parser

use async_trait::async_trait;

use super::encoding::decode_best_effort;
use crate::domain::ingestion::{
    DocumentMetadata, DocumentParser, ParsedDocument, ParserContent, ParserInput, ParserType,
};
use crate::domain::RagError;

/// Extension to language table for source files
const LANGUAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("py", "python"),
    ("js", "javascript"),
    ("ts", "typescript"),
    ("jsx", "jsx"),
    ("tsx", "tsx"),
    ("java", "java"),
    ("cpp", "cpp"),
    ("c", "c"),
    ("cs", "csharp"),
    ("php", "php"),
    ("rb", "ruby"),
    ("go", "go"),
    ("rs", "rust"),
    ("swift", "swift"),
    ("kt", "kotlin"),
    ("scala", "scala"),
    ("sql", "sql"),
    ("sh", "bash"),
    ("ps1", "powershell"),
    ("yaml", "yaml"),
    ("yml", "yaml"),
    ("json", "json"),
    ("xml", "xml"),
    ("css", "css"),
    ("scss", "scss"),
    ("vue", "vue"),
];

/// Parser for source code files.
///
/// Emits no sections: code structure belongs to the code-aware chunker,
/// which splits at function/class boundaries instead.
#[derive(Debug, Clone, Default)]
pub struct SourceCodeParser;

impl SourceCodeParser {
    /// Create a new source code parser
    pub fn new() -> Self {
        Self
    }

    /// Language for a filename extension, if known
    pub fn language_for(filename: &str) -> Option<&'static str> {
        let ext = filename.rsplit('.').next()?.to_lowercase();
        LANGUAGE_EXTENSIONS
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, lang)| *lang)
    }

    fn extensions() -> Vec<&'static str> {
        LANGUAGE_EXTENSIONS.iter().map(|(e, _)| *e).collect()
    }
}

#[async_trait]
impl DocumentParser for SourceCodeParser {
    fn parser_type(&self) -> ParserType {
        ParserType::SourceCode
    }

    fn supported_extensions(&self) -> &[&str] {
        // Static view of the table's extension column
        const EXTENSIONS: &[&str] = &[
            "py", "js", "ts", "jsx", "tsx", "java", "cpp", "c", "cs", "php", "rb", "go", "rs",
            "swift", "kt", "scala", "sql", "sh", "ps1", "yaml", "yml", "json", "xml", "css",
            "scss", "vue",
        ];
        EXTENSIONS
    }

    fn supported_mime_types(&self) -> &[&str] {
        &[
            "text/x-python",
            "text/x-java",
            "text/x-c",
            "text/x-rust",
            "application/javascript",
            "application/json",
            "application/xml",
            "text/x-sql",
        ]
    }

    async fn parse(&self, input: ParserInput) -> Result<ParsedDocument, RagError> {
        let mut metadata = DocumentMetadata::new();

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

        let language = input
            .filename
            .as_deref()
            .and_then(Self::language_for)
            .unwrap_or("unknown");

        metadata = metadata
            .with_language(language)
            .with_custom("lines", serde_json::json!(content.lines().count()));

        if let Some(ref filename) = input.filename {
            metadata = metadata.with_source(filename.clone());
        }

        for (key, value) in input.metadata {
            metadata = metadata.with_custom(key, value);
        }

        Ok(ParsedDocument::new(content, metadata, ParserType::SourceCode))
    }
}
