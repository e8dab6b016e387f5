//! Document parser trait and types

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;

use crate::domain::RagError;

/// Content input for document parsing
#[derive(Debug, Clone)]
pub enum ParserContent {
    /// Text content (already decoded)
    Text(String),
    /// Binary content (needs decoding)
    Bytes(Vec<u8>),
}

impl ParserContent {
    /// Create text content
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    /// Create binary content
    pub fn bytes(content: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(content.into())
    }

    /// Get content as text, requiring strict UTF-8 for binary input.
    /// Parsers that tolerate unknown encodings use the best-effort decoder
    /// in the infrastructure layer instead.
    pub fn as_text(&self) -> Result<String, RagError> {
        match self {
            Self::Text(s) => Ok(s.clone()),
            Self::Bytes(b) => String::from_utf8(b.clone())
                .map_err(|e| RagError::malformed_input(format!("Invalid UTF-8: {}", e))),
        }
    }

    /// Get the raw bytes, encoding text as UTF-8
    pub fn as_bytes(&self) -> Vec<u8> {
        match self {
            Self::Text(s) => s.as_bytes().to_vec(),
            Self::Bytes(b) => b.clone(),
        }
    }

    /// Byte length of the content
    pub fn len(&self) -> usize {
        match self {
            Self::Text(s) => s.len(),
            Self::Bytes(b) => b.len(),
        }
    }

    /// Check if the content is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Input for document parsing
#[derive(Debug, Clone)]
pub struct ParserInput {
    /// Document content (text or bytes)
    pub content: ParserContent,
    /// Optional filename for type detection
    pub filename: Option<String>,
    /// Optional declared MIME type for type detection
    pub declared_mime: Option<String>,
    /// Additional metadata to include
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ParserInput {
    /// Create input from text content
    pub fn from_text(content: impl Into<String>) -> Self {
        Self {
            content: ParserContent::text(content),
            filename: None,
            declared_mime: None,
            metadata: HashMap::new(),
        }
    }

    /// Create input from binary content
    pub fn from_bytes(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: ParserContent::bytes(content),
            filename: None,
            declared_mime: None,
            metadata: HashMap::new(),
        }
    }

    /// Set the filename
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Set the declared MIME type
    pub fn with_declared_mime(mut self, mime: impl Into<String>) -> Self {
        self.declared_mime = Some(mime.into());
        self
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Metadata extracted from a document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Document title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Document author
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Creation timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Source file or URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// MIME type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Detected text encoding
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    /// True when decoding substituted replacement characters.
    /// Downstream quality scoring may discount such documents.
    #[serde(default)]
    pub lossy_decode: bool,
    /// Programming language for source files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Custom metadata fields
    #[serde(flatten)]
    pub custom: HashMap<String, serde_json::Value>,
}

impl DocumentMetadata {
    /// Create empty metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Set title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set author
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set source
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set MIME type
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Set detected encoding
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// Mark the decode as lossy
    pub fn with_lossy_decode(mut self, lossy: bool) -> Self {
        self.lossy_decode = lossy;
        self
    }

    /// Set the source language
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Add custom metadata
    pub fn with_custom(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.custom.insert(key.into(), value);
        self
    }

    /// Convert to JSON value map
    pub fn to_json_map(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();

        if let Some(ref title) = self.title {
            map.insert("title".to_string(), serde_json::Value::String(title.clone()));
        }

        if let Some(ref author) = self.author {
            map.insert("author".to_string(), serde_json::Value::String(author.clone()));
        }

        if let Some(ref created_at) = self.created_at {
            map.insert(
                "created_at".to_string(),
                serde_json::Value::String(created_at.to_rfc3339()),
            );
        }

        if let Some(ref source) = self.source {
            map.insert("source".to_string(), serde_json::Value::String(source.clone()));
        }

        if let Some(ref mime_type) = self.mime_type {
            map.insert(
                "mime_type".to_string(),
                serde_json::Value::String(mime_type.clone()),
            );
        }

        if let Some(ref encoding) = self.encoding {
            map.insert(
                "encoding".to_string(),
                serde_json::Value::String(encoding.clone()),
            );
        }

        if self.lossy_decode {
            map.insert("lossy_decode".to_string(), serde_json::Value::Bool(true));
        }

        if let Some(ref language) = self.language {
            map.insert(
                "language".to_string(),
                serde_json::Value::String(language.clone()),
            );
        }

        for (key, value) in &self.custom {
            map.insert(key.clone(), value.clone());
        }

        map
    }
}

/// A structural section of a parsed document, aligned to the plain-text output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSection {
    /// Section title (None for untitled sections such as PDF pages)
    pub title: Option<String>,
    /// Heading level (1-6 for headers, 0 for pages)
    pub level: u8,
    /// Section text content
    pub content: String,
    /// Page number for page-based sections
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    /// Section-specific metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl DocumentSection {
    /// Create a titled section
    pub fn titled(title: impl Into<String>, level: u8, content: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            level,
            content: content.into(),
            page_number: None,
            metadata: HashMap::new(),
        }
    }

    /// Create a page section
    pub fn page(page_number: u32, content: impl Into<String>) -> Self {
        Self {
            title: None,
            level: 0,
            content: content.into(),
            page_number: Some(page_number),
            metadata: HashMap::new(),
        }
    }

    /// Add section metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Result of parsing a document
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// Extracted plain text content
    pub content: String,
    /// Extracted metadata
    pub metadata: DocumentMetadata,
    /// Structural sections, in document order. Empty for unstructured
    /// formats (plain text, source code).
    pub sections: Vec<DocumentSection>,
    /// The format this document was parsed as
    pub source_type: super::ParserType,
}

impl ParsedDocument {
    /// Create a parsed document
    pub fn new(
        content: impl Into<String>,
        metadata: DocumentMetadata,
        source_type: super::ParserType,
    ) -> Self {
        Self {
            content: content.into(),
            metadata,
            sections: Vec::new(),
            source_type,
        }
    }

    /// Attach structural sections
    pub fn with_sections(mut self, sections: Vec<DocumentSection>) -> Self {
        self.sections = sections;
        self
    }

    /// Check whether the document carries structural sections
    pub fn has_sections(&self) -> bool {
        !self.sections.is_empty()
    }
}

/// Trait for document parsers
#[async_trait]
pub trait DocumentParser: Send + Sync + Debug {
    /// The format this parser handles
    fn parser_type(&self) -> super::ParserType;

    /// Get supported file extensions (e.g., ["txt", "text"])
    fn supported_extensions(&self) -> &[&str];

    /// Get supported MIME types (e.g., ["text/plain"])
    fn supported_mime_types(&self) -> &[&str];

    /// Parse a document and extract text content, metadata, and sections
    async fn parse(&self, input: ParserInput) -> Result<ParsedDocument, RagError>;

    /// Check if this parser supports a given filename
    fn supports_file(&self, filename: &str) -> bool {
        let ext = filename
            .rsplit('.')
            .next()
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        self.supported_extensions()
            .iter()
            .any(|e| e.eq_ignore_ascii_case(&ext))
    }

    /// Check if this parser supports a given MIME type
    fn supports_mime(&self, mime: &str) -> bool {
        self.supported_mime_types()
            .iter()
            .any(|m| mime.starts_with(*m))
    }
}
