//! Pipeline orchestration
//!
//! A linear state machine with one conditional fan-out:
//! router → retriever → specialist (by route) → done. Every query gets a
//! fresh, independently owned state value; the only shared resource is the
//! store handle inside the retriever, which is internally locked.

use crate::agents::{self, ClauseInfo, RiskReport, Route};
use crate::llm::{LlmClient, LlmError};
use crate::retrieval::{format_context, RetrieveError, Retriever};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Query routing failed: {0}")]
    Routing(#[source] LlmError),

    #[error("Context retrieval failed: {0}")]
    Retrieval(#[from] RetrieveError),

    #[error("Analysis failed: {0}")]
    Analysis(#[source] LlmError),
}

/// Per-query state threaded through the stages
///
/// Constructed fresh inside every `run` call and destroyed when the response
/// is returned; never reused across queries.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub query: String,
    pub route: Option<Route>,
    pub context: String,
    pub citations: Vec<String>,
    pub response: String,
}

impl PipelineState {
    fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            route: None,
            context: String::new(),
            citations: Vec::new(),
            response: String::new(),
        }
    }
}

/// Pipeline stages; the fan-out into specialists is an exhaustive match on
/// the closed `Route` set
#[derive(Debug, Clone, Copy, PartialEq)]
enum Stage {
    Router,
    Retriever,
    Specialist(Route),
    Done,
}

/// The query-side pipeline: classification, retrieval, analysis
pub struct Pipeline {
    llm: Arc<dyn LlmClient>,
    retriever: Retriever,
    top_k: usize,
}

impl Pipeline {
    pub fn new(llm: Arc<dyn LlmClient>, retriever: Retriever, top_k: usize) -> Self {
        Self {
            llm,
            retriever,
            top_k,
        }
    }

    /// Run the full pipeline for one query and return the response
    pub async fn run(&self, query: &str) -> Result<String, PipelineError> {
        let mut state = PipelineState::new(query);
        let mut stage = Stage::Router;

        loop {
            stage = match stage {
                Stage::Router => {
                    let route = agents::route_query(self.llm.as_ref(), &state.query)
                        .await
                        .map_err(PipelineError::Routing)?;
                    state.route = Some(route);
                    Stage::Retriever
                }
                Stage::Retriever => {
                    // Retrieval keys on the original query text; route and
                    // context are independent derivations of the same input
                    let results = self.retriever.retrieve(&state.query, self.top_k)?;
                    state.citations = results.iter().map(|r| r.to_citation()).collect();
                    state.context = format_context(&results);

                    // A missing route would mean a stage-ordering bug;
                    // degrade to general QA, mirroring the router's fallback
                    Stage::Specialist(state.route.unwrap_or(Route::GeneralQa))
                }
                Stage::Specialist(route) => {
                    state.response = self
                        .run_specialist(route, &state)
                        .await
                        .map_err(PipelineError::Analysis)?;
                    Stage::Done
                }
                Stage::Done => break,
            };
        }

        Ok(state.response)
    }

    async fn run_specialist(
        &self,
        route: Route,
        state: &PipelineState,
    ) -> Result<String, LlmError> {
        let llm = self.llm.as_ref();

        match route {
            Route::ClauseSearch => {
                let clause_type = agents::detect_clause_type(&state.query);
                let info = agents::analyze_clause(llm, &state.context, clause_type).await?;
                Ok(format_clause_response(&info))
            }
            Route::RiskAnalysis => {
                let report = agents::assess_risks(llm, &state.context).await?;
                Ok(format_risk_report(&report))
            }
            Route::Summarize => {
                let summary = agents::summarize_document(llm, &state.context).await?;
                Ok(format!("**Executive Summary**\n\n{}", summary))
            }
            Route::GeneralQa => {
                let answer = agents::answer_question(llm, &state.context, &state.query).await?;
                Ok(format_qa_response(&answer, &state.citations))
            }
        }
    }
}

fn format_clause_response(info: &ClauseInfo) -> String {
    let key_terms = if info.key_terms.is_empty() {
        "N/A".to_string()
    } else {
        info.key_terms.join(", ")
    };

    format!(
        "**{} Clause Analysis**\n\n**Summary:** {}\n\n**Key Terms:** {}\n\n**Source:** {}\n",
        title_case(&info.clause_type),
        info.summary,
        key_terms,
        info.page_reference
    )
}

fn format_risk_report(report: &RiskReport) -> String {
    let mut risk_lines = Vec::new();
    for risk in &report.risks {
        risk_lines.push(format!("- **{}** ({})", risk.risk_title, risk.severity));
        if !risk.description.is_empty() {
            risk_lines.push(format!("  {}", risk.description));
        }
        if !risk.recommendation.is_empty() {
            risk_lines.push(format!("  Mitigation: {}", risk.recommendation));
        }
    }

    let risks_block = if risk_lines.is_empty() {
        "No specific risks identified.".to_string()
    } else {
        risk_lines.join("\n")
    };

    format!(
        "**Risk Assessment Report**\n\n**Overall Risk Level:** {}\n\n**Identified Risks:**\n{}\n\n**Summary:** {}\n",
        report.overall_risk_level, risks_block, report.summary
    )
}

fn format_qa_response(answer: &str, citations: &[String]) -> String {
    if citations.is_empty() {
        return answer.to_string();
    }
    format!("{}\n\n**Sources:**\n{}", answer, citations.join("\n"))
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
