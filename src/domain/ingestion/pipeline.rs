//! Ingestion pipeline types and configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::chunker::{ChunkingConfig, ChunkingType};

/// Type of document parser to use
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParserType {
    /// Plain text files
    PlainText,
    /// Markdown files
    Markdown,
    /// HTML files
    Html,
    /// PDF files
    Pdf,
    /// DOCX files
    Docx,
    /// Source code files
    SourceCode,
}

impl ParserType {
    /// Deterministic selection order: most specific first, plain text last
    pub const SELECTION_ORDER: [ParserType; 6] = [
        ParserType::Pdf,
        ParserType::Docx,
        ParserType::Html,
        ParserType::Markdown,
        ParserType::SourceCode,
        ParserType::PlainText,
    ];

    /// The chunking strategy a document of this type defaults to
    pub fn default_chunking(&self) -> ChunkingType {
        match self {
            Self::Markdown => ChunkingType::Markdown,
            Self::SourceCode => ChunkingType::Code,
            _ => ChunkingType::Semantic,
        }
    }
}

/// Configuration for document ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Parser type (auto-detected from filename/MIME if None)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parser_type: Option<ParserType>,
    /// Chunking strategy (derived from the parsed content type if None)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunking_type: Option<ChunkingType>,
    /// Chunking configuration
    #[serde(flatten)]
    pub chunking: ChunkingConfig,
    /// Number of chunks embedded and persisted per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    10
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            parser_type: None,
            chunking_type: None,
            chunking: ChunkingConfig::default(),
            batch_size: default_batch_size(),
        }
    }
}

impl IngestionConfig {
    /// Create a new ingestion configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the parser type
    pub fn with_parser_type(mut self, parser_type: ParserType) -> Self {
        self.parser_type = Some(parser_type);
        self
    }

    /// Set the chunking type
    pub fn with_chunking_type(mut self, chunking_type: ChunkingType) -> Self {
        self.chunking_type = Some(chunking_type);
        self
    }

    /// Set max tokens per chunk
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.chunking.max_tokens = max_tokens;
        self
    }

    /// Set chunk overlap in tokens
    pub fn with_overlap_tokens(mut self, overlap: usize) -> Self {
        self.chunking.overlap_tokens = overlap;
        self
    }

    /// Set minimum chunk size in tokens
    pub fn with_min_tokens(mut self, min_tokens: usize) -> Self {
        self.chunking.min_tokens = min_tokens;
        self
    }

    /// Set batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// Accumulated result of one ingestion call.
///
/// Counters are append-only; the pipeline never rolls a batch back once it
/// has been persisted. Non-zero `failed_chunks` with non-zero
/// `successful_chunks` means a partial ingestion, which is a tolerated
/// outcome rather than an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestionReport {
    /// Total chunks produced by the chunker
    pub total_chunks: usize,
    /// Chunks embedded and persisted
    pub successful_chunks: usize,
    /// Chunks that failed embedding or persistence
    pub failed_chunks: usize,
    /// Error messages accumulated along the way
    pub errors: Vec<String>,
    /// IDs of persisted chunks, in chunk order
    pub document_ids: Vec<String>,
    /// Wall-clock processing time in seconds
    pub processing_time_secs: f64,
}

impl IngestionReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Check if every chunk was ingested successfully
    pub fn is_success(&self) -> bool {
        self.failed_chunks == 0 && self.errors.is_empty()
    }

    /// Fraction of chunks ingested successfully
    pub fn success_rate(&self) -> f64 {
        if self.total_chunks == 0 {
            0.0
        } else {
            self.successful_chunks as f64 / self.total_chunks as f64
        }
    }

    /// Convert to a JSON value map for metadata records
    pub fn to_json_map(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("total_chunks".to_string(), self.total_chunks.into());
        map.insert(
            "successful_chunks".to_string(),
            self.successful_chunks.into(),
        );
        map.insert("failed_chunks".to_string(), self.failed_chunks.into());
        map.insert(
            "errors".to_string(),
            serde_json::Value::Array(
                self.errors
                    .iter()
                    .map(|e| serde_json::Value::String(e.clone()))
                    .collect(),
            ),
        );
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_order_ends_with_plain_text() {
        assert_eq!(
            ParserType::SELECTION_ORDER.last(),
            Some(&ParserType::PlainText)
        );
    }

    #[test]
    fn test_default_chunking_per_type() {
        assert_eq!(ParserType::Markdown.default_chunking(), ChunkingType::Markdown);
        assert_eq!(ParserType::SourceCode.default_chunking(), ChunkingType::Code);
        assert_eq!(ParserType::Pdf.default_chunking(), ChunkingType::Semantic);
        assert_eq!(ParserType::PlainText.default_chunking(), ChunkingType::Semantic);
    }

    #[test]
    fn test_ingestion_config_builder() {
        let config = IngestionConfig::new()
            .with_parser_type(ParserType::Markdown)
            .with_chunking_type(ChunkingType::Sentence)
            .with_max_tokens(256)
            .with_overlap_tokens(32)
            .with_min_tokens(10)
            .with_batch_size(5);

        assert_eq!(config.parser_type, Some(ParserType::Markdown));
        assert_eq!(config.chunking_type, Some(ChunkingType::Sentence));
        assert_eq!(config.chunking.max_tokens, 256);
        assert_eq!(config.chunking.overlap_tokens, 32);
        assert_eq!(config.batch_size, 5);
    }

    #[test]
    fn test_default_batch_size() {
        assert_eq!(IngestionConfig::default().batch_size, 10);
    }

    #[test]
    fn test_report_accounting() {
        let mut report = IngestionReport::new();
        report.total_chunks = 3;
        report.successful_chunks = 2;
        report.failed_chunks = 1;
        report.add_error("chunk 1: embedding failed");

        assert!(!report.is_success());
        assert!((report.success_rate() - 2.0 / 3.0).abs() < f64::EPSILON);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn test_report_success() {
        let mut report = IngestionReport::new();
        report.total_chunks = 2;
        report.successful_chunks = 2;

        assert!(report.is_success());
    }

    #[test]
    fn test_report_serialization() {
        let mut report = IngestionReport::new();
        report.total_chunks = 1;
        report.successful_chunks = 1;

        let json = serde_json::to_string(&report).unwrap();
        let parsed: IngestionReport = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.total_chunks, 1);
        assert!(parsed.is_success());
    }
}
