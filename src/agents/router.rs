//! Query routing
//!
//! Classifies a free-text query into one of a closed set of intents. The
//! classification itself is delegated to the language model; parsing its
//! response is deliberately permissive because models pad answers with prose.

use crate::llm::{LlmClient, LlmError};
use serde::Serialize;
use std::fmt;

/// Query intent, selecting which specialist analyzer runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Route {
    ClauseSearch,
    RiskAnalysis,
    Summarize,
    GeneralQa,
}

impl Route {
    /// Candidate scan order; when a verbose response mentions several labels,
    /// the first match in this order wins. This order is the documented
    /// tie-break.
    pub const ALL: [Route; 4] = [
        Route::ClauseSearch,
        Route::RiskAnalysis,
        Route::Summarize,
        Route::GeneralQa,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Route::ClauseSearch => "CLAUSE_SEARCH",
            Route::RiskAnalysis => "RISK_ANALYSIS",
            Route::Summarize => "SUMMARIZE",
            Route::GeneralQa => "GENERAL_QA",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const ROUTER_PROMPT: &str = "You are a query classifier for a legal document analysis system.

Classify the user's query into ONE of these categories:
- CLAUSE_SEARCH: Looking for specific clauses (termination, liability, payment, etc.)
- RISK_ANALYSIS: Wants to identify potential legal risks or red flags
- SUMMARIZE: Wants a summary or overview of the document
- GENERAL_QA: General question that needs to be answered from the document

User Query: {query}

Respond with ONLY the category name, nothing else.";

/// Parse a route out of a raw classifier response
///
/// Case-normalized substring match against each label, falling back to
/// `GeneralQa`. Total for any input.
pub fn parse_route(response: &str) -> Route {
    let normalized = response.trim().to_uppercase();

    for route in Route::ALL {
        if normalized.contains(route.label()) {
            return route;
        }
    }

    tracing::warn!("No route label in classifier response, falling back to GENERAL_QA");
    Route::GeneralQa
}

/// Classify a query through the language model
pub async fn route_query(llm: &dyn LlmClient, query: &str) -> Result<Route, LlmError> {
    let prompt = ROUTER_PROMPT.replace("{query}", query);
    let response = llm.complete(&prompt).await?;

    let route = parse_route(&response);
    tracing::debug!("Routed query to {}", route);

    Ok(route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct ScriptedLlm(String);

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_parse_exact_labels() {
        assert_eq!(parse_route("CLAUSE_SEARCH"), Route::ClauseSearch);
        assert_eq!(parse_route("RISK_ANALYSIS"), Route::RiskAnalysis);
        assert_eq!(parse_route("SUMMARIZE"), Route::Summarize);
        assert_eq!(parse_route("GENERAL_QA"), Route::GeneralQa);
    }

    #[test]
    fn test_parse_verbose_response() {
        assert_eq!(
            parse_route("The category is SUMMARIZE, since the user wants an overview."),
            Route::Summarize
        );
        assert_eq!(parse_route("  risk_analysis\n"), Route::RiskAnalysis);
    }

    #[test]
    fn test_parse_tie_break_is_scan_order() {
        // Both labels present; the first in Route::ALL wins
        assert_eq!(
            parse_route("Could be CLAUSE_SEARCH or GENERAL_QA."),
            Route::ClauseSearch
        );
        assert_eq!(
            parse_route("SUMMARIZE unless RISK_ANALYSIS fits better"),
            Route::RiskAnalysis
        );
    }

    #[test]
    fn test_parse_is_total() {
        assert_eq!(parse_route(""), Route::GeneralQa);
        assert_eq!(parse_route("no label here"), Route::GeneralQa);
        assert_eq!(parse_route("CLAUSE SEARCH"), Route::GeneralQa);
    }

    #[tokio::test]
    async fn test_route_query_with_model() {
        let llm = ScriptedLlm("CLAUSE_SEARCH".to_string());
        let route = route_query(&llm, "What happens if we terminate early?")
            .await
            .unwrap();
        assert_eq!(route, Route::ClauseSearch);
    }
}
