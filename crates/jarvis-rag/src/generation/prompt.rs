//! Prompt templates for RAG generation

use once_cell::sync::Lazy;
use regex::Regex;

use super::citation::RetrievedChunk;

/// What the model is told to say when the documents do not cover the question
pub const UNCOVERED_QUESTION_REPLY: &str = "I couldn't find information about this in the \
    uploaded documents. Please upload the relevant documents containing this information.";

const ANSWER_CUE: &str = "ANSWER (based ONLY on the documents above):";

static ANSWER_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*answer(\s*\(based only on the documents above\))?\s*:\s*")
        .expect("valid regex")
});

static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n{3,}").expect("valid regex")
});

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Number each retrieved chunk and label it with its source file
    pub fn build_context(chunks: &[RetrievedChunk]) -> String {
        chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                format!(
                    "[Document {} | Source: {}]\n{}",
                    i + 1,
                    chunk.citation.document_name,
                    chunk.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n---\n\n")
    }

    /// Build the full RAG prompt with strict grounding
    pub fn build_rag_prompt(question: &str, chunks: &[RetrievedChunk]) -> String {
        format!(
            r#"You are an intelligent enterprise AI assistant. Your task is to answer questions accurately based ONLY on the provided company documents.

CRITICAL INSTRUCTIONS:
1. Answer ONLY using information from the documents below - DO NOT use any external knowledge
2. If the information is NOT found in the documents, you MUST respond: "{not_found}"
3. NEVER make up or hallucinate information
4. Be specific and cite relevant details from the documents
5. Keep answers concise but complete
6. Use professional, clear language
7. If partially relevant information exists, provide what you can and indicate what's missing

COMPANY DOCUMENTS:
{context}

QUESTION: {question}

{cue}"#,
            not_found = UNCOVERED_QUESTION_REPLY,
            context = Self::build_context(chunks),
            question = question.trim(),
            cue = ANSWER_CUE,
        )
    }
}

/// Strip echoed answer labels and collapse runs of blank lines
pub fn clean_response(response: &str) -> String {
    let trimmed = response.trim();
    let without_label = ANSWER_LABEL.replace(trimmed, "");
    EXCESS_NEWLINES
        .replace_all(&without_label, "\n\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Citation;

    fn chunk(name: &str, text: &str) -> RetrievedChunk {
        RetrievedChunk {
            citation: Citation {
                chunk_id: format!("{}_0", name),
                document_id: name.to_string(),
                document_name: name.to_string(),
                chunk_index: 0,
                snippet: text.to_string(),
                score: 0.9,
            },
            text: text.to_string(),
        }
    }

    #[test]
    fn test_prompt_contains_context_and_question() {
        let chunks = vec![
            chunk("leave.txt", "Employees receive 15 vacation days per year."),
            chunk("travel.txt", "Economy class for flights under 6 hours."),
        ];
        let prompt = PromptBuilder::build_rag_prompt("How many vacation days?", &chunks);

        assert!(prompt.contains("[Document 1 | Source: leave.txt]\nEmployees receive 15"));
        assert!(prompt.contains("\n\n---\n\n[Document 2 | Source: travel.txt]"));
        assert!(prompt.contains("QUESTION: How many vacation days?"));
        assert!(prompt.ends_with(ANSWER_CUE));
    }

    #[test]
    fn test_clean_response() {
        assert_eq!(clean_response("ANSWER: 15 days."), "15 days.");
        assert_eq!(
            clean_response("Answer (based ONLY on the documents above): 15"),
            "15"
        );
        assert_eq!(clean_response("Line one\n\n\n\nLine two"), "Line one\n\nLine two");
        assert_eq!(clean_response("  The answer is 15.  "), "The answer is 15.");
    }
}
