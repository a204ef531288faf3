//! Parsing the generation service's response and resolving citations

use regex::Regex;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::retrieval::RetrievedEvidence;
use crate::types::Citation;

/// Citation as emitted by the model, before resolution
#[derive(Debug, Clone, Deserialize)]
pub struct RawCitation {
    /// Source tag, e.g. "S2"
    pub source: String,
    /// Supporting quote, if the model provided one
    #[serde(default)]
    pub snippet: Option<String>,
    /// Per-citation confidence, unused beyond validation
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// Answer as emitted by the model
#[derive(Debug, Clone, Deserialize)]
pub struct RawAnswer {
    /// Answer text
    pub answer: String,
    /// Self-reported overall confidence, if any
    #[serde(default)]
    pub confidence: Option<f32>,
    /// Citations referencing source tags
    #[serde(default)]
    pub citations: Vec<RawCitation>,
}

/// Parse the raw completion into a structured answer.
///
/// Models wrap JSON in prose or code fences often enough that a single
/// `from_str` is not good enough; strategies are tried in order:
/// direct parse, fence-stripped parse, then the first brace-to-brace
/// span. Anything else is a `Generation` error.
pub fn parse_answer(raw: &str) -> Result<RawAnswer> {
    let trimmed = raw.trim();

    if let Ok(parsed) = serde_json::from_str::<RawAnswer>(trimmed) {
        return Ok(parsed);
    }

    let unfenced = strip_code_fence(trimmed);
    if let Ok(parsed) = serde_json::from_str::<RawAnswer>(unfenced.trim()) {
        return Ok(parsed);
    }

    let brace_span = Regex::new(r"(?s)\{.*\}").expect("valid regex");
    if let Some(m) = brace_span.find(trimmed) {
        if let Ok(parsed) = serde_json::from_str::<RawAnswer>(m.as_str()) {
            return Ok(parsed);
        }
    }

    Err(Error::generation(format!(
        "response is not the expected JSON shape: {}",
        truncate_snippet(trimmed, 120)
    )))
}

fn strip_code_fence(text: &str) -> &str {
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text)
}

/// Resolve raw citations against the evidence that was actually given
/// to the model. A citation whose tag does not name a supplied evidence
/// item is dropped: the model cannot introduce sources it was not shown.
pub fn resolve_citations(raw: &[RawCitation], evidence: &[RetrievedEvidence]) -> Vec<Citation> {
    let tag = Regex::new(r"^[Ss](\d+)$").expect("valid regex");
    let mut citations: Vec<Citation> = Vec::new();

    for citation in raw {
        let source = citation.source.trim();
        let index = tag
            .captures(source)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<usize>().ok())
            .and_then(|n| n.checked_sub(1));

        let item = match index.and_then(|i| evidence.get(i)) {
            Some(item) => item,
            None => {
                tracing::debug!("Dropping citation with unknown source tag '{}'", source);
                continue;
            }
        };

        if citations.iter().any(|c| c.chunk_id == item.chunk_id) {
            continue;
        }

        let snippet = citation
            .snippet
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .unwrap_or_else(|| truncate_snippet(&item.text, 200));

        citations.push(Citation {
            chunk_id: item.chunk_id,
            document_id: item.document_id,
            filename: item.filename.clone(),
            locator: item.locator.label(),
            snippet,
            score: item.score,
        });
    }

    citations
}

/// Truncate a snippet to `max_len` bytes, preferring a word boundary
pub fn truncate_snippet(snippet: &str, max_len: usize) -> String {
    if snippet.len() <= max_len {
        return snippet.to_string();
    }

    let mut end = max_len;
    while end > 0 && !snippet.is_char_boundary(end) {
        end -= 1;
    }

    if let Some(pos) = snippet[..end].rfind(' ') {
        return format!("{}...", &snippet[..pos]);
    }

    format!("{}...", &snippet[..end])
}
