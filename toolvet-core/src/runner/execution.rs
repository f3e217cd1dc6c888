//! The run loop: one judging-agent conversation per discovered tool,
//! a bounded number of tools in flight at once, verdicts reported in
//! discovery order.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use rmcp::model::Tool;

use crate::judgment::parse_judgment;
use crate::llm::{ChatMessage, ChatReply, LlmClient, ToolCallRequest, ToolSpec};
use crate::report::{assemble_report, RunReport, ToolVerdict};
use crate::runner::prompt::{task_description, SYSTEM_PROMPT};
use crate::session::SessionDriver;
use crate::{RunConfig, RunError};

/// Knobs for one run.
#[derive(Clone, Debug)]
pub struct RunnerOptions {
    /// How many tools are tested concurrently.
    pub concurrency: usize,
    /// Agent turns per tool before the verdict fails outright.
    pub max_turns: usize,
    /// Wall-clock budget for discovery plus testing.
    pub timeout: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_turns: 8,
            timeout: Duration::from_secs(600),
        }
    }
}

/// Runs a complete check against a streamable-HTTP MCP endpoint:
/// connect, discover, test every tool, assemble the report, close.
pub async fn run_http(
    config: &RunConfig,
    judge: &dyn LlmClient,
    options: &RunnerOptions,
) -> Result<RunReport, RunError> {
    let session = SessionDriver::connect_http(config)
        .await
        .map_err(RunError::Connect)?;
    log::info!("connected to MCP server at {}", config.mcp_url);
    let result = run_with_session(&session, &config.mcp_url, judge, options).await;
    if let Err(error) = session.close().await {
        log::warn!("session close failed: {error}");
    }
    result
}

/// Runs discovery plus testing over an already-connected session.
/// Enforces the run's wall-clock budget; on timeout the in-flight
/// agent conversations are dropped and no partial report is produced.
pub async fn run_with_session(
    session: &SessionDriver,
    mcp_url: &str,
    judge: &dyn LlmClient,
    options: &RunnerOptions,
) -> Result<RunReport, RunError> {
    let limit = options.timeout;
    match tokio::time::timeout(limit, test_all_tools(session, mcp_url, judge, options)).await {
        Ok(result) => result,
        Err(_) => Err(RunError::Timeout { limit }),
    }
}

async fn test_all_tools(
    session: &SessionDriver,
    mcp_url: &str,
    judge: &dyn LlmClient,
    options: &RunnerOptions,
) -> Result<RunReport, RunError> {
    let tools = session.list_tools().await.map_err(RunError::Discovery)?;
    log::info!("discovered {} tool(s)", tools.len());
    // `buffered` (not `buffer_unordered`) keeps verdicts in discovery
    // order regardless of which agent conversation finishes first.
    let verdicts: Vec<ToolVerdict> = stream::iter(tools.iter())
        .map(|tool| test_tool(session, judge, tool, options))
        .buffered(options.concurrency.max(1))
        .collect()
        .await;
    Ok(assemble_report(mcp_url, verdicts))
}

/// Runs one judging-agent conversation about one tool. Never fails the
/// run: every problem becomes a failing verdict for this tool.
async fn test_tool(
    session: &SessionDriver,
    judge: &dyn LlmClient,
    tool: &Tool,
    options: &RunnerOptions,
) -> ToolVerdict {
    let name = tool.name.to_string();
    log::debug!("testing tool '{name}'");
    let specs = vec![ToolSpec::from_tool(tool)];
    let mut messages = vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(task_description(tool)),
    ];
    for _ in 0..options.max_turns.max(1) {
        let reply = match judge.chat(&messages, &specs).await {
            Ok(reply) => reply,
            Err(error) => {
                return ToolVerdict::failing(name, format!("judging agent failed: {error}"))
            }
        };
        match reply {
            ChatReply::Final(answer) => {
                return match parse_judgment(&answer) {
                    Ok(judgment) => ToolVerdict {
                        name,
                        passed: judgment.passed,
                        detail: judgment.detail,
                    },
                    Err(error) => ToolVerdict::failing(
                        name,
                        format!("unreadable final answer ({error}): {answer}"),
                    ),
                };
            }
            ChatReply::ToolCalls(calls) => {
                for call in calls {
                    let evidence = invoke_for_evidence(session, &name, &call).await;
                    messages.push(ChatMessage::assistant(format!(
                        "Called tool '{}' with arguments {}",
                        call.name, call.arguments
                    )));
                    messages.push(ChatMessage::user(evidence));
                }
            }
        }
    }
    ToolVerdict::failing(
        name,
        format!(
            "agent did not reach a verdict within {} turns",
            options.max_turns
        ),
    )
}

/// Executes one requested tool call and renders the outcome as text
/// for the agent. Invocation failures are evidence, not run failures.
async fn invoke_for_evidence(
    session: &SessionDriver,
    tool_name: &str,
    call: &ToolCallRequest,
) -> String {
    if call.name != tool_name {
        return format!(
            "Refusing to call '{}': only '{tool_name}' is under test.",
            call.name
        );
    }
    let arguments = match &call.arguments {
        serde_json::Value::Object(map) => Some(map.clone()),
        serde_json::Value::Null => None,
        other => {
            return format!("Tool arguments must be a JSON object, got: {other}");
        }
    };
    match session.call_tool(tool_name, arguments).await {
        Ok(result) => match serde_json::to_value(&result) {
            Ok(value) => format!("Tool result: {value}"),
            Err(error) => format!("Tool returned a result that could not be serialized: {error}"),
        },
        Err(error) => format!("Tool call failed: {error}"),
    }
}
