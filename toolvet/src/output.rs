use std::process::ExitCode;

use serde::Serialize;
use toolvet_core::RunReport;

#[derive(Serialize)]
struct CliError<'a> {
    status: &'static str,
    message: &'a str,
}

pub(super) fn error_exit(message: &str, json: bool) -> ExitCode {
    if json {
        let payload = CliError {
            status: "error",
            message,
        };
        let output = serde_json::to_string_pretty(&payload).unwrap_or(message.to_string());
        eprintln!("{output}");
    } else {
        eprintln!("{message}");
    }
    ExitCode::from(2)
}

pub(super) fn run_failure_exit(message: &str, json: bool) -> ExitCode {
    if json {
        let payload = CliError {
            status: "error",
            message,
        };
        let output = serde_json::to_string_pretty(&payload).unwrap_or(message.to_string());
        eprintln!("{output}");
    } else {
        eprintln!("{message}");
    }
    ExitCode::from(1)
}

pub(super) fn exit_code_for_report(report: &RunReport) -> ExitCode {
    if report.all_passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

pub(super) fn format_report_human(report: &RunReport) -> String {
    let mut output = String::new();
    output.push_str(&format!("Server: {}\n", report.mcp_url));
    if report.all_passed {
        output.push_str("Outcome: all tools passed\n");
    } else {
        output.push_str("Outcome: failures detected\n");
    }
    if let Some(note) = &report.note {
        output.push_str(&format!("Note: {note}\n"));
    }
    if !report.verdicts.is_empty() {
        output.push_str("Tools:\n");
        for verdict in &report.verdicts {
            let outcome = if verdict.passed { "pass" } else { "FAIL" };
            output.push_str(&format!("- {} [{}]: {}\n", verdict.name, outcome, verdict.detail));
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolvet_core::{assemble_report, ToolVerdict};

    #[test]
    fn human_format_lists_each_tool() {
        let report = assemble_report(
            "https://mcp.example.com/mcp",
            vec![
                ToolVerdict::passing("echo", "worked"),
                ToolVerdict::failing("search", "broke"),
            ],
        );
        let text = format_report_human(&report);
        assert!(text.contains("Outcome: failures detected"));
        assert!(text.contains("- echo [pass]: worked"));
        assert!(text.contains("- search [FAIL]: broke"));
    }

    #[test]
    fn human_format_mentions_the_zero_tool_note() {
        let report = assemble_report("https://mcp.example.com/mcp", Vec::new());
        let text = format_report_human(&report);
        assert!(text.contains("Outcome: all tools passed"));
        assert!(text.contains("Note: no tools were discovered"));
        assert!(!text.contains("Tools:"));
    }

    #[test]
    fn exit_codes_follow_the_report() {
        let passing = assemble_report("u", vec![ToolVerdict::passing("t", "ok")]);
        assert_eq!(exit_code_for_report(&passing), ExitCode::SUCCESS);
        let failing = assemble_report("u", vec![ToolVerdict::failing("t", "bad")]);
        assert_eq!(exit_code_for_report(&failing), ExitCode::from(1));
    }
}
