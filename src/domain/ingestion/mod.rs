//! Document ingestion domain: parsing, chunking, and pipeline accounting

pub mod chunker;
pub mod parser;
pub mod pipeline;
pub mod tokenizer;

pub use chunker::{
    renumber, Chunk, ChunkContext, ChunkingConfig, ChunkingStrategy, ChunkingType,
};
pub use parser::{
    DocumentMetadata, DocumentParser, DocumentSection, ParsedDocument, ParserContent, ParserInput,
};
pub use pipeline::{IngestionConfig, IngestionReport, ParserType};
