//! Command-line interface for toolvet: point it at an MCP server and
//! it reports whether each of the server's tools works, as judged by
//! an LLM agent actually calling them.

use std::collections::BTreeMap;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use toolvet_core::{
    run_http, CheckInput, LlmConfig, OpenAiClient, OutputMode, RunnerOptions,
};

mod output;

use output::{error_exit, exit_code_for_report, format_report_human, run_failure_exit};

const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

/// Checks that an MCP server's tools work, judged by an LLM agent.
#[derive(Debug, Parser)]
#[command(name = "toolvet", version, about)]
pub struct Cli {
    /// URL of the MCP server's streamable-HTTP endpoint.
    #[arg(long, conflicts_with = "input")]
    pub url: Option<String>,

    /// Header attached to every MCP request, as "Name: Value".
    /// Repeatable.
    #[arg(long = "header", value_name = "NAME: VALUE")]
    pub headers: Vec<String>,

    /// Run input as inline JSON or @path to a JSON file, of the form
    /// {"mcpUrl": "...", "headers": {...}}.
    #[arg(long, value_name = "JSON|@PATH")]
    pub input: Option<String>,

    /// Shape of the final report.
    #[arg(long, value_enum, default_value_t = OutputModeArg::Rollup)]
    pub output_mode: OutputModeArg,

    /// Emit machine-readable JSON instead of human-readable text.
    #[arg(long)]
    pub json: bool,

    /// How many tools are tested concurrently.
    #[arg(long, default_value_t = 4)]
    pub concurrency: usize,

    /// Agent turns per tool before its verdict fails.
    #[arg(long, default_value_t = 8)]
    pub max_turns: usize,

    /// Wall-clock budget for the whole run, in seconds.
    #[arg(long, default_value_t = 600)]
    pub timeout_secs: u64,

    /// Base URL of the OpenAI-compatible chat completions endpoint.
    #[arg(long, default_value = DEFAULT_LLM_BASE_URL)]
    pub llm_base_url: String,

    /// Model identifier for the judging agent.
    #[arg(long, default_value = DEFAULT_LLM_MODEL)]
    pub llm_model: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputModeArg {
    /// The bare array of per-tool verdicts.
    Verdicts,
    /// {mcpUrl, worksCorrectly, report} with a prose report.
    Rollup,
    /// {mcpUrl, allTestsPassed, toolsStatus} keyed by tool name.
    Status,
}

impl From<OutputModeArg> for OutputMode {
    fn from(mode: OutputModeArg) -> Self {
        match mode {
            OutputModeArg::Verdicts => OutputMode::Verdicts,
            OutputModeArg::Rollup => OutputMode::Rollup,
            OutputModeArg::Status => OutputMode::Status,
        }
    }
}

pub async fn run(cli: Cli) -> ExitCode {
    let input = match resolve_input(&cli) {
        Ok(input) => input,
        Err(message) => return error_exit(&message, cli.json),
    };
    let config = match input.into_run_config() {
        Ok(config) => config,
        Err(error) => return error_exit(&error.to_string(), cli.json),
    };
    let api_key = match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => key,
        _ => {
            return error_exit(
                "OPENAI_API_KEY must be set so the judging agent can reach its model",
                cli.json,
            )
        }
    };
    let judge = OpenAiClient::new(LlmConfig::new(
        cli.llm_base_url.clone(),
        api_key,
        cli.llm_model.clone(),
    ));
    let options = RunnerOptions {
        concurrency: cli.concurrency,
        max_turns: cli.max_turns,
        timeout: Duration::from_secs(cli.timeout_secs),
    };

    let report = match run_http(&config, &judge, &options).await {
        Ok(report) => report,
        Err(error) => return run_failure_exit(&error.to_string(), cli.json),
    };

    let usage = judge.usage();
    log::info!(
        "token usage: {} prompt + {} completion = {} total",
        usage.prompt_tokens,
        usage.completion_tokens,
        usage.total()
    );

    if cli.json {
        let rendered = report.render(cli.output_mode.into());
        let payload =
            serde_json::to_string_pretty(&rendered).unwrap_or("<failed to serialize report>".to_string());
        println!("{payload}");
    } else {
        print!("{}", format_report_human(&report));
    }
    exit_code_for_report(&report)
}

fn resolve_input(cli: &Cli) -> Result<CheckInput, String> {
    match (&cli.input, &cli.url) {
        (Some(raw), None) => {
            if !cli.headers.is_empty() {
                return Err("--header cannot be combined with --input".to_string());
            }
            parse_check_input(raw)
        }
        (None, Some(url)) => {
            let mut input = CheckInput::new(url.clone());
            input.headers = parse_headers(&cli.headers)?;
            Ok(input)
        }
        (None, None) => Err("either --url or --input is required".to_string()),
        (Some(_), Some(_)) => Err("--url cannot be combined with --input".to_string()),
    }
}

/// Parses a `--input` value: inline JSON, or `@path` to read JSON
/// from a file.
fn parse_check_input(raw: &str) -> Result<CheckInput, String> {
    let payload = if let Some(path) = raw.strip_prefix('@') {
        std::fs::read_to_string(path)
            .map_err(|error| format!("failed to read input file '{path}': {error}"))?
    } else {
        raw.to_string()
    };
    serde_json::from_str(&payload).map_err(|error| format!("invalid run input: {error}"))
}

/// Parses repeated `--header "Name: Value"` flags.
fn parse_headers(entries: &[String]) -> Result<BTreeMap<String, String>, String> {
    let mut headers = BTreeMap::new();
    for entry in entries {
        let (name, value) = entry
            .split_once(':')
            .ok_or_else(|| format!("invalid header '{entry}': expected \"Name: Value\""))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("invalid header '{entry}': empty name"));
        }
        headers.insert(name.to_string(), value.trim().to_string());
    }
    Ok(headers)
}
