//! Answer composition: grounded prompt, generation call, citation linking

use std::sync::Arc;

use crate::error::Result;
use crate::providers::GenerationProvider;
use crate::retrieval::RetrievedEvidence;
use crate::types::StructuredAnswer;

use super::citation;
use super::prompt::PromptBuilder;

/// Builds a grounded prompt from an evidence set, invokes the generation
/// service, and parses the result into a structured answer.
pub struct AnswerComposer {
    llm: Arc<dyn GenerationProvider>,
    max_context_chars: usize,
}

impl AnswerComposer {
    /// Create a new composer
    pub fn new(llm: Arc<dyn GenerationProvider>, max_context_chars: usize) -> Self {
        Self {
            llm,
            max_context_chars,
        }
    }

    /// Compose an answer for a query from retrieved evidence.
    ///
    /// Empty evidence is a defined terminal state: the generation
    /// service is not called and the answer states that nothing relevant
    /// was found, with confidence 0 and no citations.
    ///
    /// Confidence is the model's self-reported value when present,
    /// otherwise the maximum similarity among cited evidence; both are
    /// clamped to [0, 1].
    pub async fn compose(
        &self,
        query: &str,
        evidence: &[RetrievedEvidence],
    ) -> Result<StructuredAnswer> {
        if evidence.is_empty() {
            return Ok(StructuredAnswer::no_evidence());
        }

        let context = PromptBuilder::build_context(evidence, self.max_context_chars);
        let prompt = PromptBuilder::build_answer_prompt(query, &context);

        let raw_text = self.llm.complete(&prompt).await?;
        let raw = citation::parse_answer(&raw_text)?;

        let citations = citation::resolve_citations(&raw.citations, evidence);
        let confidence = match raw.confidence {
            Some(reported) => reported.clamp(0.0, 1.0),
            None => citations
                .iter()
                .map(|c| c.score)
                .fold(0.0_f32, f32::max)
                .clamp(0.0, 1.0),
        };

        tracing::debug!(
            "Composed answer with {} citations (model: {}, confidence: {:.2})",
            citations.len(),
            self.llm.model(),
            confidence
        );

        Ok(StructuredAnswer {
            answer: raw.answer,
            citations,
            confidence,
        })
    }
}
