//! Clause extraction
//!
//! Pulls structured information about one clause type out of retrieved
//! context. The model response is scanned line by line for `KEY: value`
//! pairs; missing keys fall back to named defaults rather than failing.

use crate::llm::{LlmClient, LlmError};
use serde::Serialize;
use std::collections::HashMap;

/// Structured representation of an extracted clause
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClauseInfo {
    pub clause_type: String,
    pub summary: String,
    pub key_terms: Vec<String>,
    pub page_reference: String,
}

/// Clause types recognized in query text, scanned in order
pub const CLAUSE_TYPES: [&str; 5] = [
    "termination",
    "liability",
    "payment",
    "confidentiality",
    "indemnification",
];

const CLAUSE_PROMPT: &str = "You are a legal clause extraction specialist.

Given the following document excerpts, extract information about {clause_type} clauses.

Document Context:
{context}

Provide your analysis in this exact format:
CLAUSE_TYPE: {clause_type}
SUMMARY: [1-2 sentence summary of the clause]
KEY_TERMS: [comma-separated list of key terms, numbers, or conditions]
PAGE_REFERENCE: [page numbers where this clause appears]

If the clause type is not found, respond with:
CLAUSE_TYPE: {clause_type}
SUMMARY: Not found in the provided document sections.
KEY_TERMS: N/A
PAGE_REFERENCE: N/A
";

/// Sniff a clause type out of the query text, defaulting to "general"
pub fn detect_clause_type(query: &str) -> &'static str {
    let query_lower = query.to_lowercase();
    CLAUSE_TYPES
        .iter()
        .find(|ct| query_lower.contains(**ct))
        .copied()
        .unwrap_or("general")
}

/// Parse a clause analysis out of a raw model response
///
/// Pure function; unrecognized lines are ignored.
pub fn parse_clause_response(response: &str, clause_type: &str) -> ClauseInfo {
    let mut parsed: HashMap<String, String> = HashMap::new();

    for line in response.lines() {
        if let Some((key, value)) = line.split_once(':') {
            parsed.insert(key.trim().to_uppercase(), value.trim().to_string());
        }
    }

    let summary = parsed.remove("SUMMARY").unwrap_or_else(|| {
        tracing::warn!("Clause response missing SUMMARY, using default");
        "Unable to extract".to_string()
    });

    let key_terms = parsed
        .remove("KEY_TERMS")
        .map(|terms| {
            terms
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    ClauseInfo {
        clause_type: parsed
            .remove("CLAUSE_TYPE")
            .unwrap_or_else(|| clause_type.to_string()),
        summary,
        key_terms,
        page_reference: parsed
            .remove("PAGE_REFERENCE")
            .unwrap_or_else(|| "Unknown".to_string()),
    }
}

/// Extract clause information from retrieved context
pub async fn analyze_clause(
    llm: &dyn LlmClient,
    context: &str,
    clause_type: &str,
) -> Result<ClauseInfo, LlmError> {
    let prompt = CLAUSE_PROMPT
        .replace("{clause_type}", clause_type)
        .replace("{context}", context);
    let response = llm.complete(&prompt).await?;

    Ok(parse_clause_response(&response, clause_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_complete_response() {
        let response = "CLAUSE_TYPE: termination
SUMMARY: Either party may terminate with 30 days written notice.
KEY_TERMS: 30 days, written notice, material breach
PAGE_REFERENCE: Pages 4-5";

        let info = parse_clause_response(response, "termination");

        assert_eq!(info.clause_type, "termination");
        assert_eq!(
            info.summary,
            "Either party may terminate with 30 days written notice."
        );
        assert_eq!(
            info.key_terms,
            vec!["30 days", "written notice", "material breach"]
        );
        assert_eq!(info.page_reference, "Pages 4-5");
    }

    #[test]
    fn test_parse_missing_keys_default() {
        let info = parse_clause_response("The model rambled instead.", "liability");

        assert_eq!(info.clause_type, "liability");
        assert_eq!(info.summary, "Unable to extract");
        assert!(info.key_terms.is_empty());
        assert_eq!(info.page_reference, "Unknown");
    }

    #[test]
    fn test_parse_ignores_unrecognized_lines() {
        let response = "Here is my analysis.
CLAUSE_TYPE: payment
SUMMARY: Net 30 terms apply.
Some commentary in between.
PAGE_REFERENCE: Page 2";

        let info = parse_clause_response(response, "payment");
        assert_eq!(info.summary, "Net 30 terms apply.");
        assert_eq!(info.page_reference, "Page 2");
    }

    #[test]
    fn test_key_terms_empty_entries_dropped() {
        let response = "KEY_TERMS: penalty, , interest,\nSUMMARY: ok";
        let info = parse_clause_response(response, "payment");
        assert_eq!(info.key_terms, vec!["penalty", "interest"]);
    }

    #[test]
    fn test_detect_clause_type() {
        assert_eq!(
            detect_clause_type("What happens if we terminate early? Termination terms?"),
            "termination"
        );
        assert_eq!(
            detect_clause_type("Is there a LIABILITY cap?"),
            "liability"
        );
        assert_eq!(detect_clause_type("What is the governing law?"), "general");
    }
}
