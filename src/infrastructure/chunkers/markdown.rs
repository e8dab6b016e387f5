//! Markdown-aware chunking strategy

use once_cell::sync::Lazy;
use regex::Regex;

use super::semantic::SemanticChunker;
use crate::domain::ingestion::{renumber, Chunk, ChunkContext, ChunkingConfig, ChunkingStrategy};
use crate::domain::RagError;

static CODE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```[\s\S]*?```").expect("code block pattern is valid"));
static HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("header pattern is valid"));

struct MarkdownSection {
    title: Option<String>,
    body: String,
    offset: usize,
}

/// Chunking strategy for Markdown documents.
///
/// Fenced code blocks are lifted out behind placeholders before header
/// splitting so a fence is never fragmented, then restored into the chunks
/// last. Each chunk is tagged with its nearest enclosing section title and
/// section bodies are sub-chunked with the semantic strategy.
#[derive(Debug, Clone, Default)]
pub struct MarkdownChunker;

impl MarkdownChunker {
    /// Create a new markdown chunker
    pub fn new() -> Self {
        Self
    }

    fn placeholder(index: usize) -> String {
        format!("__CODE_BLOCK_{}__", index)
    }

    fn extract_code_blocks(text: &str) -> (String, Vec<String>) {
        let mut blocks = Vec::new();
        let replaced = CODE_BLOCK
            .replace_all(text, |caps: &regex::Captures| {
                blocks.push(caps[0].to_string());
                Self::placeholder(blocks.len() - 1)
            })
            .into_owned();

        (replaced, blocks)
    }

    fn restore_code_blocks(text: &str, blocks: &[String]) -> String {
        let mut restored = text.to_string();
        for (i, block) in blocks.iter().enumerate() {
            restored = restored.replace(&Self::placeholder(i), block);
        }
        restored
    }

    fn split_sections(text: &str) -> Vec<MarkdownSection> {
        let mut sections = Vec::new();
        let mut title: Option<String> = None;
        let mut body: Vec<&str> = Vec::new();
        let mut offset = 0usize;
        let mut section_offset = 0usize;

        for line in text.lines() {
            if let Some(captures) = HEADER.captures(line) {
                if !body.is_empty() || title.is_some() {
                    sections.push(MarkdownSection {
                        title: title.take(),
                        body: body.join("\n"),
                        offset: section_offset,
                    });
                    body.clear();
                }

                title = Some(captures[2].trim().to_string());
                section_offset = offset;
            } else {
                body.push(line);
            }

            offset += line.len() + 1;
        }

        if !body.is_empty() || title.is_some() {
            sections.push(MarkdownSection {
                title,
                body: body.join("\n"),
                offset: section_offset,
            });
        }

        sections
    }
}

impl ChunkingStrategy for MarkdownChunker {
    fn chunk(
        &self,
        text: &str,
        ctx: &ChunkContext,
        config: &ChunkingConfig,
    ) -> Result<Vec<Chunk>, RagError> {
        config.validate()?;

        if text.trim().is_empty() {
            return Ok(vec![]);
        }

        let (without_code, code_blocks) = Self::extract_code_blocks(text);
        let sections = Self::split_sections(&without_code);
        let semantic = SemanticChunker::new();

        let mut chunks: Vec<Chunk> = Vec::new();

        for section in sections {
            let restored = Self::restore_code_blocks(&section.body, &code_blocks);
            if restored.trim().is_empty() {
                continue;
            }

            let mut section_ctx = ctx.clone();
            if let Some(ref title) = section.title {
                section_ctx.section_title = Some(title.clone());
            }

            let mut inner = semantic.chunk(&restored, &section_ctx, config)?;
            for chunk in &mut inner {
                chunk.start_offset += section.offset;
                chunk.end_offset += section.offset;
            }
            chunks.extend(inner);
        }

        renumber(&mut chunks);

        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "markdown"
    }
}
