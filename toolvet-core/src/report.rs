//! Report assembly and rendering.
//!
//! A run produces one [`ToolVerdict`] per discovered tool, in
//! discovery order. [`assemble_report`] folds those into a
//! [`RunReport`], which can then be rendered into one of three
//! external JSON shapes.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

/// The verdict for a single tool.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolVerdict {
    /// Tool name as reported by the server.
    pub name: String,
    /// Whether the tool behaved correctly under test.
    pub passed: bool,
    /// Human-readable explanation of the verdict.
    pub detail: String,
}

impl ToolVerdict {
    pub fn passing(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            detail: detail.into(),
        }
    }

    pub fn failing(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            detail: detail.into(),
        }
    }
}

/// The complete outcome of one run.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// The endpoint that was tested.
    pub mcp_url: String,
    /// True when every verdict passed (vacuously true with no tools).
    pub all_passed: bool,
    /// One verdict per discovered tool, in discovery order.
    pub verdicts: Vec<ToolVerdict>,
    /// Set when the run has something unusual to say, e.g. the server
    /// exposed no tools at all.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub note: Option<String>,
}

/// How [`RunReport::render`] shapes the report for external consumers.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// The bare array of per-tool verdicts.
    Verdicts,
    /// `{mcpUrl, worksCorrectly, report}` with a prose report.
    #[default]
    Rollup,
    /// `{mcpUrl, allTestsPassed, toolsStatus}` keyed by tool name.
    Status,
}

/// Folds per-tool verdicts into a [`RunReport`]. Pure: calling it
/// twice with the same input yields the same report.
pub fn assemble_report(mcp_url: &str, verdicts: Vec<ToolVerdict>) -> RunReport {
    let all_passed = verdicts.iter().all(|verdict| verdict.passed);
    let note = verdicts
        .is_empty()
        .then(|| "no tools were discovered on this server".to_string());
    RunReport {
        mcp_url: mcp_url.to_string(),
        all_passed,
        verdicts,
        note,
    }
}

impl RunReport {
    /// Renders the report into the requested external JSON shape.
    pub fn render(&self, mode: OutputMode) -> JsonValue {
        match mode {
            OutputMode::Verdicts => json!(self.verdicts),
            OutputMode::Rollup => json!({
                "mcpUrl": self.mcp_url,
                "worksCorrectly": self.all_passed,
                "report": self.rollup_prose(),
            }),
            OutputMode::Status => {
                let mut status = serde_json::Map::new();
                for verdict in &self.verdicts {
                    status.insert(
                        verdict.name.clone(),
                        json!({"passed": verdict.passed, "detail": verdict.detail}),
                    );
                }
                json!({
                    "mcpUrl": self.mcp_url,
                    "allTestsPassed": self.all_passed,
                    "toolsStatus": status,
                })
            }
        }
    }

    fn rollup_prose(&self) -> String {
        let mut lines = Vec::new();
        let passed = self.verdicts.iter().filter(|verdict| verdict.passed).count();
        let failed = self.verdicts.len() - passed;
        lines.push(format!(
            "Tested {} tool(s) against {}: {} passed, {} failed.",
            self.verdicts.len(),
            self.mcp_url,
            passed,
            failed
        ));
        if let Some(note) = &self.note {
            lines.push(format!("Note: {note}."));
        }
        for verdict in &self.verdicts {
            let outcome = if verdict.passed { "pass" } else { "FAIL" };
            lines.push(format!("- {} [{}]: {}", verdict.name, outcome, verdict.detail));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_verdicts() -> Vec<ToolVerdict> {
        vec![
            ToolVerdict::passing("echo", "echo returned the input unchanged"),
            ToolVerdict::failing("search", "server returned 500"),
        ]
    }

    #[test]
    fn all_passed_is_the_conjunction_of_verdicts() {
        let report = assemble_report("https://mcp.example.com/mcp", sample_verdicts());
        assert!(!report.all_passed);

        let report = assemble_report(
            "https://mcp.example.com/mcp",
            vec![ToolVerdict::passing("echo", "ok")],
        );
        assert!(report.all_passed);
    }

    #[test]
    fn zero_tools_is_a_vacuous_pass_with_a_note() {
        let report = assemble_report("https://mcp.example.com/mcp", Vec::new());
        assert!(report.all_passed);
        assert!(report.verdicts.is_empty());
        assert_eq!(
            report.note.as_deref(),
            Some("no tools were discovered on this server")
        );
    }

    #[test]
    fn assembly_is_idempotent() {
        let first = assemble_report("https://mcp.example.com/mcp", sample_verdicts());
        let second = assemble_report("https://mcp.example.com/mcp", sample_verdicts());
        assert_eq!(first, second);
    }

    #[test]
    fn verdicts_mode_is_the_bare_array() {
        let report = assemble_report("https://mcp.example.com/mcp", sample_verdicts());
        let rendered = report.render(OutputMode::Verdicts);
        let array = rendered.as_array().unwrap();
        assert_eq!(array.len(), 2);
        assert_eq!(array[0]["name"], "echo");
        assert_eq!(array[0]["passed"], true);
        assert_eq!(array[1]["name"], "search");
        assert_eq!(array[1]["detail"], "server returned 500");
    }

    #[test]
    fn rollup_mode_matches_the_actor_record_shape() {
        let report = assemble_report("https://mcp.example.com/mcp", sample_verdicts());
        let rendered = report.render(OutputMode::Rollup);
        assert_eq!(rendered["mcpUrl"], "https://mcp.example.com/mcp");
        assert_eq!(rendered["worksCorrectly"], false);
        let prose = rendered["report"].as_str().unwrap();
        assert!(prose.contains("2 tool(s)"));
        assert!(prose.contains("echo [pass]"));
        assert!(prose.contains("search [FAIL]: server returned 500"));
    }

    #[test]
    fn status_mode_keys_by_tool_name() {
        let report = assemble_report("https://mcp.example.com/mcp", sample_verdicts());
        let rendered = report.render(OutputMode::Status);
        assert_eq!(rendered["allTestsPassed"], false);
        assert_eq!(rendered["toolsStatus"]["echo"]["passed"], true);
        assert_eq!(
            rendered["toolsStatus"]["search"]["detail"],
            "server returned 500"
        );
    }

    #[test]
    fn rollup_prose_mentions_the_zero_tool_note() {
        let report = assemble_report("https://mcp.example.com/mcp", Vec::new());
        let rendered = report.render(OutputMode::Rollup);
        assert_eq!(rendered["worksCorrectly"], true);
        let prose = rendered["report"].as_str().unwrap();
        assert!(prose.contains("no tools were discovered"));
    }

    #[test]
    fn note_round_trips_through_serde() {
        let report = assemble_report("https://mcp.example.com/mcp", Vec::new());
        let json = serde_json::to_string(&report).unwrap();
        let back: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
