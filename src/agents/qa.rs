//! General question answering over retrieved context

use crate::llm::{LlmClient, LlmError};

const QA_PROMPT: &str = "Based on the following document excerpts, answer the user's question.

Document Context:
{context}

Question: {question}

Provide a clear, direct answer. If the answer is not in the context, say so.";

/// Answer a free-form question grounded in the retrieved context
pub async fn answer_question(
    llm: &dyn LlmClient,
    context: &str,
    question: &str,
) -> Result<String, LlmError> {
    let prompt = QA_PROMPT
        .replace("{context}", context)
        .replace("{question}", question);
    let response = llm.complete(&prompt).await?;
    Ok(response.trim().to_string())
}
