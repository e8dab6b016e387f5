//! BM25 scoring over a per-request candidate pool

use super::text::tokenize;

/// BM25 scorer with standard parameters.
///
/// Corpus statistics (document frequency, average length) are computed over
/// the candidate pool of one search call, not a global index; scores are
/// therefore only comparable within that call. The IDF uses the
/// `ln(1 + ...)` form so it is never negative and adding a query-token
/// occurrence can never lower a score.
#[derive(Debug, Clone)]
pub struct Bm25Scorer {
    k1: f32,
    b: f32,
}

impl Default for Bm25Scorer {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

impl Bm25Scorer {
    /// Create a scorer with standard parameters (k1=1.2, b=0.75)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scorer with explicit parameters
    pub fn with_params(k1: f32, b: f32) -> Self {
        Self { k1, b }
    }

    /// Score every candidate against the query tokens. Returns one score
    /// per candidate, in input order.
    pub fn score_pool(&self, query_tokens: &[String], contents: &[&str]) -> Vec<f32> {
        if contents.is_empty() || query_tokens.is_empty() {
            return vec![0.0; contents.len()];
        }

        let tokenized: Vec<Vec<String>> = contents.iter().map(|c| tokenize(c)).collect();

        let n = tokenized.len() as f32;
        let avg_len = tokenized.iter().map(|t| t.len()).sum::<usize>() as f32 / n;

        let document_frequency: Vec<f32> = query_tokens
            .iter()
            .map(|token| {
                tokenized
                    .iter()
                    .filter(|doc| doc.iter().any(|t| t == token))
                    .count() as f32
            })
            .collect();

        tokenized
            .iter()
            .map(|doc_tokens| {
                let doc_len = doc_tokens.len() as f32;
                if doc_len == 0.0 {
                    return 0.0;
                }

                let mut score = 0.0;

                for (token, df) in query_tokens.iter().zip(&document_frequency) {
                    let tf = doc_tokens.iter().filter(|t| *t == token).count() as f32;
                    if tf == 0.0 {
                        continue;
                    }

                    let idf = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();
                    let numerator = tf * (self.k1 + 1.0);
                    let denominator =
                        tf + self.k1 * (1.0 - self.b + self.b * (doc_len / avg_len.max(1.0)));

                    score += idf * (numerator / denominator);
                }

                score
            })
            .collect()
    }
}
