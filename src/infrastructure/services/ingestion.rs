//! Document ingestion pipeline

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::domain::cache::{Cache, CacheKey};
use crate::domain::embedding::EmbeddingProvider;
use crate::domain::ingestion::{
    renumber, Chunk, ChunkContext, ChunkingConfig, ChunkingStrategy, ChunkingType,
    IngestionConfig, IngestionReport, ParsedDocument, ParserContent, ParserInput, ParserType,
};
use crate::domain::store::{ScopeId, StoredChunk, VectorStore};
use crate::domain::RagError;
use crate::infrastructure::chunkers::ChunkerFactory;
use crate::infrastructure::parsers::ParserFactory;

/// Above this content size, chunking is dispatched to a blocking worker so
/// tokenization does not stall the async scheduler.
const DEFAULT_BLOCKING_THRESHOLD: usize = 64 * 1024;

const DOCUMENT_RECORD_TTL: Duration = Duration::from_secs(30 * 24 * 3600);

/// Request to ingest one document into a scope
#[derive(Debug, Clone)]
pub struct IngestRequest {
    /// Raw document content
    pub content: ParserContent,
    /// Optional filename for format detection
    pub filename: Option<String>,
    /// Optional declared MIME type for format detection
    pub declared_mime: Option<String>,
    /// Scope the chunks are stored under
    pub scope: ScopeId,
    /// Custom metadata attached to every chunk
    pub metadata: HashMap<String, serde_json::Value>,
    /// Source identifier recorded on every chunk
    pub source_id: Option<String>,
    /// Per-request parser override
    pub parser_type: Option<ParserType>,
    /// Per-request chunking override
    pub chunking_type: Option<ChunkingType>,
}

impl IngestRequest {
    /// Create a request from text content
    pub fn from_text(content: impl Into<String>, scope: ScopeId) -> Self {
        Self {
            content: ParserContent::text(content),
            filename: None,
            declared_mime: None,
            scope,
            metadata: HashMap::new(),
            source_id: None,
            parser_type: None,
            chunking_type: None,
        }
    }

    /// Create a request from raw bytes
    pub fn from_bytes(content: impl Into<Vec<u8>>, scope: ScopeId) -> Self {
        Self {
            content: ParserContent::bytes(content),
            filename: None,
            declared_mime: None,
            scope,
            metadata: HashMap::new(),
            source_id: None,
            parser_type: None,
            chunking_type: None,
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

    /// Add custom metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Set the source identifier
    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// Override the parser
    pub fn with_parser_type(mut self, parser_type: ParserType) -> Self {
        self.parser_type = Some(parser_type);
        self
    }

    /// Override the chunking strategy
    pub fn with_chunking_type(mut self, chunking_type: ChunkingType) -> Self {
        self.chunking_type = Some(chunking_type);
        self
    }
}

/// One-shot batch pipeline: parse, chunk, embed in batches, persist.
///
/// Failure policy: a parse failure aborts only this document, recorded in
/// the report; an embedding or persistence failure marks only the affected
/// batch's chunks as failed and the pipeline continues. Committed batches
/// are never rolled back, which also makes cancellation at any await safe.
#[derive(Debug)]
pub struct IngestionPipeline {
    parser_factory: ParserFactory,
    embedding: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    cache: Option<Arc<dyn Cache>>,
    config: IngestionConfig,
    blocking_threshold: usize,
}

impl IngestionPipeline {
    /// Create a pipeline. Fails fast when the embedding dimension does not
    /// match what the store expects.
    pub fn new(
        embedding: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Result<Self, RagError> {
        if embedding.dimension() != store.dimension() {
            return Err(RagError::configuration(format!(
                "embedding dimension {} does not match store dimension {}",
                embedding.dimension(),
                store.dimension()
            )));
        }

        Ok(Self {
            parser_factory: ParserFactory::new(),
            embedding,
            store,
            cache: None,
            config: IngestionConfig::default(),
            blocking_threshold: DEFAULT_BLOCKING_THRESHOLD,
        })
    }

    /// Attach a cache for per-document ingestion records
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the default ingestion configuration
    pub fn with_config(mut self, config: IngestionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the content size above which chunking runs on a blocking worker
    pub fn with_blocking_threshold(mut self, threshold: usize) -> Self {
        self.blocking_threshold = threshold;
        self
    }

    /// Ingest one document. Returns `Err` only for invalid configuration;
    /// document-level problems are recorded in the report instead.
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestionReport, RagError> {
        let started = Instant::now();
        let mut report = IngestionReport::new();

        self.config.chunking.validate()?;

        let content_bytes = request.content.as_bytes();
        let scope = request.scope.clone();

        tracing::info!(
            scope = scope.as_str(),
            filename = request.filename.as_deref().unwrap_or("<raw>"),
            size = content_bytes.len(),
            "Ingesting document"
        );

        let input = ParserInput {
            content: request.content.clone(),
            filename: request.filename.clone(),
            declared_mime: request.declared_mime.clone(),
            metadata: HashMap::new(),
        };

        let parse_result = match request.parser_type.or(self.config.parser_type) {
            Some(parser_type) => self.parser_factory.parse_as(parser_type, input).await,
            None => self.parser_factory.parse(input).await,
        };

        let parsed = match parse_result {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(scope = scope.as_str(), error = %e, "Document parse failed");
                report.add_error(format!("parse: {}", e));
                report.processing_time_secs = started.elapsed().as_secs_f64();
                return Ok(report);
            }
        };

        let document_metadata = Self::document_metadata_value(&parsed, &request);

        let chunking_type = request
            .chunking_type
            .or(self.config.chunking_type)
            .unwrap_or_else(|| ChunkerFactory::for_document(&parsed));
        let strategy = ChunkerFactory::create(chunking_type);

        let chunks = match self.chunk_document(strategy, parsed).await {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::warn!(scope = scope.as_str(), error = %e, "Chunking failed");
                report.add_error(format!("chunk: {}", e));
                report.processing_time_secs = started.elapsed().as_secs_f64();
                return Ok(report);
            }
        };

        report.total_chunks = chunks.len();

        if chunks.is_empty() {
            report.processing_time_secs = started.elapsed().as_secs_f64();
            return Ok(report);
        }

        for batch in chunks.chunks(self.config.batch_size.max(1)) {
            self.process_batch(&scope, batch, &document_metadata, &request, &mut report)
                .await;
        }

        self.record_document(&scope, &content_bytes, &report).await;

        report.processing_time_secs = started.elapsed().as_secs_f64();

        tracing::info!(
            scope = scope.as_str(),
            total = report.total_chunks,
            successful = report.successful_chunks,
            failed = report.failed_chunks,
            "Ingestion finished"
        );

        Ok(report)
    }

    /// Chunk the parsed document, dispatching to a blocking worker for
    /// large inputs. Section-structured documents are chunked section by
    /// section so titles and page numbers ride along.
    async fn chunk_document(
        &self,
        strategy: Arc<dyn ChunkingStrategy>,
        parsed: ParsedDocument,
    ) -> Result<Vec<Chunk>, RagError> {
        let config = self.config.chunking.clone();

        if parsed.content.len() > self.blocking_threshold {
            tokio::task::spawn_blocking(move || Self::run_chunking(&strategy, &parsed, &config))
                .await
                .map_err(|e| RagError::internal(format!("chunking task failed: {}", e)))?
        } else {
            Self::run_chunking(&strategy, &parsed, &config)
        }
    }

    fn run_chunking(
        strategy: &Arc<dyn ChunkingStrategy>,
        parsed: &ParsedDocument,
        config: &ChunkingConfig,
    ) -> Result<Vec<Chunk>, RagError> {
        // Parsers that emit sections (markdown, HTML, PDF pages, DOCX
        // headings) already isolated the structure; chunk each section so
        // titles and page numbers ride along. The markdown strategy still
        // protects code fences inside each section body.
        let section_aware = matches!(strategy.name(), "semantic" | "sentence" | "markdown");

        if parsed.has_sections() && section_aware {
            let mut all = Vec::new();

            for section in &parsed.sections {
                let mut ctx = ChunkContext::new();
                if let Some(ref title) = section.title {
                    ctx.section_title = Some(title.clone());
                }
                ctx.page_number = section.page_number;

                all.extend(strategy.chunk(&section.content, &ctx, config)?);
            }

            renumber(&mut all);
            Ok(all)
        } else {
            let mut ctx = ChunkContext::new();
            ctx.language = parsed.metadata.language.clone();

            strategy.chunk(&parsed.content, &ctx, config)
        }
    }

    fn document_metadata_value(
        parsed: &ParsedDocument,
        request: &IngestRequest,
    ) -> serde_json::Value {
        let mut value = serde_json::Map::new();

        for (key, json) in parsed.metadata.to_json_map() {
            value.insert(key, json);
        }

        if let Some(ref filename) = request.filename {
            value
                .entry("source".to_string())
                .or_insert_with(|| serde_json::json!(filename));
        }

        value.insert(
            "ingested_at".to_string(),
            serde_json::json!(chrono::Utc::now().to_rfc3339()),
        );

        serde_json::Value::Object(value)
    }

    fn chunk_metadata(
        chunk: &Chunk,
        document_metadata: &serde_json::Value,
        request: &IngestRequest,
    ) -> HashMap<String, serde_json::Value> {
        let mut metadata = HashMap::new();

        metadata.insert(
            "chunk".to_string(),
            serde_json::json!({
                "id": chunk.id,
                "index": chunk.index,
                "start_offset": chunk.start_offset,
                "end_offset": chunk.end_offset,
                "word_count": chunk.word_count,
                "token_count": chunk.token_count,
                "has_code": chunk.has_code,
                "section_title": chunk.section_title,
                "page_number": chunk.page_number,
            }),
        );

        metadata.insert("document".to_string(), document_metadata.clone());

        if !request.metadata.is_empty() {
            metadata.insert("custom".to_string(), serde_json::json!(request.metadata));
        }

        if let Some(ref source_id) = request.source_id {
            metadata.insert("source_id".to_string(), serde_json::json!(source_id));
        }

        metadata
    }

    /// Embed and persist one batch. A wholesale batch failure degrades to
    /// per-chunk embedding so a single bad chunk does not take down its
    /// batch-mates.
    async fn process_batch(
        &self,
        scope: &ScopeId,
        batch: &[Chunk],
        document_metadata: &serde_json::Value,
        request: &IngestRequest,
        report: &mut IngestionReport,
    ) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();

        let embedded: Vec<(usize, Vec<f32>)> = match self.embedding.embed_many(&texts).await {
            Ok(vectors) => (0..batch.len()).zip(vectors).collect(),
            Err(batch_error) => {
                tracing::warn!(
                    error = %batch_error,
                    batch_size = batch.len(),
                    "Batch embedding failed, retrying chunks individually"
                );

                let mut embedded = Vec::new();
                for (i, chunk) in batch.iter().enumerate() {
                    match self.embedding.embed_one(&chunk.text).await {
                        Ok(vector) => embedded.push((i, vector)),
                        Err(e) => {
                            report.failed_chunks += 1;
                            report.add_error(format!("chunk {}: embed: {}", chunk.index, e));
                        }
                    }
                }
                embedded
            }
        };

        if embedded.is_empty() {
            return;
        }

        let records: Vec<StoredChunk> = embedded
            .iter()
            .map(|(i, vector)| {
                let chunk = &batch[*i];
                StoredChunk::new(chunk.id.to_string(), chunk.text.clone(), vector.clone())
                    .with_metadata(Self::chunk_metadata(chunk, document_metadata, request))
            })
            .collect();

        match self.store.add_chunks(scope, records).await {
            Ok(ids) => {
                report.successful_chunks += ids.len();
                report.document_ids.extend(ids);
            }
            Err(e) => {
                tracing::warn!(error = %e, batch_size = embedded.len(), "Batch persist failed");
                report.failed_chunks += embedded.len();
                report.add_error(format!("persist: {}", e));
            }
        }
    }

    /// Best-effort per-document ingestion record; cache failures are
    /// absorbed.
    async fn record_document(&self, scope: &ScopeId, content: &[u8], report: &IngestionReport) {
        let Some(ref cache) = self.cache else {
            return;
        };

        let key = CacheKey::document(scope.as_str(), content);
        let record = report.to_json_map();

        match serde_json::to_vec(&record) {
            Ok(bytes) => {
                if let Err(e) = cache.set(&key, &bytes, DOCUMENT_RECORD_TTL).await {
                    tracing::warn!(key = %key, error = %e, "Failed to record document metadata");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode document record");
            }
        }
    }
}
