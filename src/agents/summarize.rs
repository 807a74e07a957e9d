//! Executive summarization

use crate::llm::{LlmClient, LlmError};

const SUMMARIZE_PROMPT: &str = "You are an executive summary specialist for legal documents.

Create a clear, concise summary of the following contract excerpts for a non-lawyer audience.

Document Context:
{context}

Write a 3-paragraph summary:
1. OVERVIEW: What type of agreement is this and who are the parties?
2. KEY TERMS: What are the most important obligations, deadlines, and conditions?
3. ACTION ITEMS: What should the reader pay attention to or do next?

Use plain language. Avoid legal jargon. Be specific about numbers and dates.";

/// Generate an executive summary of the retrieved context
pub async fn summarize_document(llm: &dyn LlmClient, context: &str) -> Result<String, LlmError> {
    let prompt = SUMMARIZE_PROMPT.replace("{context}", context);
    let response = llm.complete(&prompt).await?;
    Ok(response.trim().to_string())
}
