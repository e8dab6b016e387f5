//! Code-aware chunking strategy

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::ingestion::tokenizer::count_tokens;
use crate::domain::ingestion::{renumber, Chunk, ChunkContext, ChunkingConfig, ChunkingStrategy};
use crate::domain::RagError;

static PYTHON_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(async\s+def|def|class)\s+\w").expect("pattern is valid"));
static RUST_BOUNDARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(pub(\([^)]*\))?\s+)?(fn|struct|enum|trait|impl|mod)\s").expect("pattern is valid")
});
static JS_BOUNDARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(export\s+)?(default\s+)?(async\s+)?(function|class)\s").expect("pattern is valid")
});
static GO_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(func|type)\s+\w").expect("pattern is valid"));
static JAVA_BOUNDARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s{0,4}(public|private|protected|static)\s.*[({]\s*$").expect("pattern is valid")
});

/// Chunking strategy for source code.
///
/// Known languages split at function/class boundaries matched structurally
/// (not a full parse). Oversized structures are split by line, never by
/// character, so syntax survives as far as possible. Unknown languages fall
/// back to fixed-size line windows.
#[derive(Debug, Clone, Default)]
pub struct CodeChunker;

impl CodeChunker {
    /// Create a new code chunker
    pub fn new() -> Self {
        Self
    }

    fn boundary_pattern(language: &str) -> Option<&'static Regex> {
        match language {
            "python" => Some(&PYTHON_BOUNDARY),
            "rust" => Some(&RUST_BOUNDARY),
            "javascript" | "typescript" | "jsx" | "tsx" => Some(&JS_BOUNDARY),
            "go" => Some(&GO_BOUNDARY),
            "java" | "csharp" => Some(&JAVA_BOUNDARY),
            _ => None,
        }
    }

    /// Split a segment into line windows within the token budget
    fn line_windows(
        text: &str,
        base_offset: usize,
        ctx: &ChunkContext,
        config: &ChunkingConfig,
        chunks: &mut Vec<Chunk>,
    ) {
        let mut current_lines: Vec<&str> = Vec::new();
        let mut current_tokens = 0usize;
        let mut window_offset = base_offset;
        let mut consumed = 0usize;

        for line in text.lines() {
            let line_tokens = count_tokens(line).max(1);

            if current_tokens + line_tokens > config.max_tokens && !current_lines.is_empty() {
                let window = current_lines.join("\n");
                chunks.push(Chunk::with_context(window, 0, window_offset, ctx));

                window_offset = base_offset + consumed;
                current_lines = vec![line];
                current_tokens = line_tokens;
            } else {
                current_lines.push(line);
                current_tokens += line_tokens;
            }

            consumed += line.len() + 1;
        }

        if !current_lines.is_empty() {
            let window = current_lines.join("\n");
            if !window.trim().is_empty() {
                chunks.push(Chunk::with_context(window, 0, window_offset, ctx));
            }
        }
    }

    /// Split code into segments at structure boundaries, keeping the
    /// pre-structure header (imports, module docs) as its own segment
    fn split_at_boundaries<'a>(text: &'a str, pattern: &Regex) -> Vec<(&'a str, usize)> {
        let mut boundaries = Vec::new();
        let mut offset = 0usize;

        for line in text.lines() {
            if pattern.is_match(line) {
                boundaries.push(offset);
            }
            offset += line.len() + 1;
        }

        if boundaries.is_empty() {
            return vec![(text, 0)];
        }

        let mut segments = Vec::new();

        if boundaries[0] > 0 {
            segments.push((&text[..boundaries[0]], 0));
        }

        for (i, start) in boundaries.iter().enumerate() {
            let end = boundaries
                .get(i + 1)
                .copied()
                .unwrap_or(text.len())
                .min(text.len());
            segments.push((&text[*start..end], *start));
        }

        segments
    }
}

impl ChunkingStrategy for CodeChunker {
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

        let language = ctx.language.as_deref().unwrap_or("unknown");
        let mut chunks: Vec<Chunk> = Vec::new();

        match Self::boundary_pattern(language) {
            Some(pattern) => {
                for (segment, offset) in Self::split_at_boundaries(text, pattern) {
                    if segment.trim().is_empty() {
                        continue;
                    }

                    if count_tokens(segment) > config.max_tokens {
                        Self::line_windows(segment, offset, ctx, config, &mut chunks);
                    } else {
                        chunks.push(Chunk::with_context(
                            segment.trim_end_matches('\n'),
                            0,
                            offset,
                            ctx,
                        ));
                    }
                }
            }
            None => {
                Self::line_windows(text, 0, ctx, config, &mut chunks);
            }
        }

        renumber(&mut chunks);

        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "code"
    }
}
