//! Highlight extraction around query-token matches

const CONTEXT_WORDS: usize = 10;
const MAX_HIGHLIGHTS: usize = 5;
const MAX_PER_TOKEN: usize = 3;

/// Extract up to five deduplicated context windows around query-token
/// matches, with ellipsis markers where a window truncates the document.
pub fn extract_highlights(content: &str, query_tokens: &[String]) -> Vec<String> {
    if content.is_empty() || query_tokens.is_empty() {
        return Vec::new();
    }

    let words: Vec<&str> = content.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let lowered: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();

    let mut highlights = Vec::new();

    for token in query_tokens {
        let mut found = 0usize;

        for (i, word) in lowered.iter().enumerate() {
            if !word.contains(token.as_str()) {
                continue;
            }

            let start = i.saturating_sub(CONTEXT_WORDS);
            let end = (i + CONTEXT_WORDS + 1).min(words.len());

            let mut highlight = words[start..end].join(" ");
            if start > 0 {
                highlight = format!("...{}", highlight);
            }
            if end < words.len() {
                highlight = format!("{}...", highlight);
            }

            highlights.push(highlight);

            found += 1;
            if found >= MAX_PER_TOKEN {
                break;
            }
        }
    }

    // Order-preserving dedup
    let mut seen = std::collections::HashSet::new();
    highlights.retain(|h| seen.insert(h.clone()));
    highlights.truncate(MAX_HIGHLIGHTS);

    highlights
}
