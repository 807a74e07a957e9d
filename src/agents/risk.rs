//! Risk assessment
//!
//! Scans retrieved contract excerpts for red flags. The model response is a
//! sequence of `RISK:`-delimited records plus trailing overall fields; the
//! parser segments records on the `RISK:` key and flushes the final
//! in-progress record after the scan ends.

use crate::llm::{LlmClient, LlmError};
use serde::Serialize;

/// A single identified risk
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskItem {
    pub risk_title: String,
    /// Uppercased; HIGH/MEDIUM/LOW expected, unrecognized values pass
    /// through verbatim
    pub severity: String,
    pub description: String,
    pub recommendation: String,
}

/// Complete risk assessment report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskReport {
    pub overall_risk_level: String,
    pub risks: Vec<RiskItem>,
    pub summary: String,
}

const KNOWN_SEVERITIES: [&str; 3] = ["HIGH", "MEDIUM", "LOW"];

const DEFAULT_SEVERITY: &str = "MEDIUM";

const RISK_PROMPT: &str = "You are a legal risk assessment specialist.

Analyze the following contract excerpts for potential legal risks and red flags.

Document Context:
{context}

Identify risks such as:
- Unlimited liability clauses
- Auto-renewal traps
- Missing termination rights
- Unfavorable payment terms
- Broad indemnification requirements
- One-sided dispute resolution

For each risk found, provide:
RISK: [Title]
SEVERITY: [HIGH/MEDIUM/LOW]
DESCRIPTION: [What the risk is]
RECOMMENDATION: [How to mitigate]

End with:
OVERALL_RISK: [HIGH/MEDIUM/LOW]
SUMMARY: [1-2 sentence overall assessment]
";

/// Risk record under construction during the scan
#[derive(Default)]
struct PartialRisk {
    title: Option<String>,
    severity: Option<String>,
    description: Option<String>,
    recommendation: Option<String>,
}

impl PartialRisk {
    /// Convert into a RiskItem if a title was seen, applying field defaults
    fn take_item(&mut self) -> Option<RiskItem> {
        let partial = std::mem::take(self);
        let title = partial.title?;

        Some(RiskItem {
            risk_title: title,
            severity: partial.severity.unwrap_or_else(|| {
                tracing::warn!("Risk record missing SEVERITY, defaulting to MEDIUM");
                DEFAULT_SEVERITY.to_string()
            }),
            description: partial.description.unwrap_or_default(),
            recommendation: partial.recommendation.unwrap_or_default(),
        })
    }
}

fn normalize_severity(value: &str) -> String {
    let severity = value.trim().to_uppercase();
    if !KNOWN_SEVERITIES.contains(&severity.as_str()) {
        tracing::warn!("Unrecognized severity '{}', passing through", severity);
    }
    severity
}

/// Parse a risk report out of a raw model response
///
/// Pure function. A `RISK:` line starts a new record, flushing the previous
/// one if it had a title; the final record is flushed unconditionally after
/// the scan.
pub fn parse_risk_report(response: &str) -> RiskReport {
    let mut risks = Vec::new();
    let mut current = PartialRisk::default();
    let mut overall_risk = None;
    let mut summary = None;

    for line in response.lines() {
        let line = line.trim();

        if let Some(value) = line.strip_prefix("RISK:") {
            if let Some(item) = current.take_item() {
                risks.push(item);
            }
            current.title = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("SEVERITY:") {
            current.severity = Some(normalize_severity(value));
        } else if let Some(value) = line.strip_prefix("DESCRIPTION:") {
            current.description = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("RECOMMENDATION:") {
            current.recommendation = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("OVERALL_RISK:") {
            overall_risk = Some(normalize_severity(value));
        } else if let Some(value) = line.strip_prefix("SUMMARY:") {
            summary = Some(value.trim().to_string());
        }
    }

    // The last record has no following RISK: line to flush it
    if let Some(item) = current.take_item() {
        risks.push(item);
    }

    RiskReport {
        overall_risk_level: overall_risk.unwrap_or_else(|| DEFAULT_SEVERITY.to_string()),
        risks,
        summary: summary.unwrap_or_else(|| "Risk assessment completed.".to_string()),
    }
}

/// Assess retrieved context for legal risks
pub async fn assess_risks(llm: &dyn LlmClient, context: &str) -> Result<RiskReport, LlmError> {
    let prompt = RISK_PROMPT.replace("{context}", context);
    let response = llm.complete(&prompt).await?;

    let report = parse_risk_report(&response);
    tracing::debug!("Parsed {} risks from assessment", report.risks.len());

    Ok(report)
}
