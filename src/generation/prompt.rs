//! Prompt templates for grounded answer generation

use crate::retrieval::RetrievedEvidence;

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the sources section from retrieved evidence, in rank order.
    /// Each item is tagged `S1..Sn` so the model can cite it; items past
    /// the character budget are dropped from the context (never from the
    /// evidence set itself).
    pub fn build_context(evidence: &[RetrievedEvidence], max_chars: usize) -> String {
        let mut context = String::new();

        for (i, item) in evidence.iter().enumerate() {
            let entry = format!(
                "[S{}] {} ({}):\n{}\n\n",
                i + 1,
                item.filename,
                item.locator.label(),
                item.text
            );
            if !context.is_empty() && context.len() + entry.len() > max_chars {
                tracing::debug!("Context budget reached, dropping sources S{}..", i + 1);
                break;
            }
            context.push_str(&entry);
        }

        context
    }

    /// Build the full answer prompt with strict grounding and a JSON
    /// response contract.
    pub fn build_answer_prompt(question: &str, context: &str) -> String {
        format!(
            r#"You are a document-grounded assistant. Answer ONLY from the numbered sources below.

Respond with valid JSON and nothing else, in exactly this shape:
{{
  "answer": "complete answer grounded in the sources",
  "confidence": 0.0,
  "citations": [
    {{"source": "S1", "snippet": "short supporting quote", "confidence": 0.9}}
  ]
}}

Rules:
- Every factual claim must be backed by a citation whose "source" is one of the tags below.
- Never cite a tag that does not appear in the SOURCES section.
- Keep each snippet under 200 characters and copy it from the source text.
- "confidence" is your overall confidence in the answer, between 0.0 and 1.0.
- If the sources do not contain the answer, say so in "answer" and return an empty citations array.

SOURCES:
{context}

QUESTION: {question}

JSON response:"#,
            context = context,
            question = question
        )
    }
}
