use serde::{Deserialize, Serialize};

pub const CONTEXT_HEADING: &str = "Context extracted from the manuals:";
pub const QUESTION_LABEL: &str = "User question:";

/// A manual fragment selected for a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedFragment {
    pub position: usize,
    pub id: String,
    pub text: String,
    /// Squared L2 distance to the question embedding
    pub distance: f32,
}

/// Everything the generation service needs to answer one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundingPrompt {
    pub system_prompt: String,
    pub question: String,
    /// Closest first
    pub fragments: Vec<RetrievedFragment>,
}

impl GroundingPrompt {
    pub fn new(system_context: &str, question: &str, fragments: Vec<RetrievedFragment>) -> Self {
        let docs = join_fragments(&fragments);
        Self {
            system_prompt: build_prompt(system_context, question, &docs),
            question: question.to_string(),
            fragments,
        }
    }
}

fn join_fragments(fragments: &[RetrievedFragment]) -> String {
    fragments
        .iter()
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// System context, a blank line, the labeled fragments, a blank line, the question.
#[must_use]
pub fn build_prompt(system_context: &str, question: &str, docs: &str) -> String {
    format!("{system_context}\n\n{CONTEXT_HEADING}\n{docs}\n\n{QUESTION_LABEL} {question}\n")
}
