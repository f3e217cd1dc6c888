//! Core library for toolvet: connect to an MCP server, discover its
//! tools, exercise each one with an LLM-driven agent, and report a
//! pass/fail verdict per tool plus a run-level rollup.
//!
//! The entry point for most callers is [`run_http`], which performs a
//! whole run against a streamable-HTTP MCP endpoint. Finer-grained
//! pieces (session management, judgment parsing, report assembly) are
//! exposed for embedding and testing.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod input;
pub mod judgment;
pub mod llm;
pub mod report;
mod runner;
pub mod session;

pub use input::{CheckInput, ConfigError};
pub use judgment::{parse_judgment, Judgment, JudgmentParseError};
pub use llm::{
    ChatMessage, ChatReply, LlmClient, LlmConfig, LlmError, OpenAiClient, Role, TokenUsage,
    ToolCallRequest, ToolSpec,
};
pub use report::{assemble_report, OutputMode, RunReport, ToolVerdict};
pub use runner::{run_http, run_with_session, RunnerOptions};
pub use session::{SessionDriver, SessionError};

// Re-exported so downstream crates can match on MCP-level results and
// errors without depending on rmcp directly.
pub use rmcp::model::{CallToolResult, Tool};
pub use rmcp::service::{ClientInitializeError, ServiceError};

/// Immutable configuration for one checker run: where the MCP server
/// lives and which HTTP headers accompany every request to it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    /// URL of the MCP server's streamable-HTTP endpoint.
    pub mcp_url: String,
    /// Headers attached to every request, typically for authentication.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl RunConfig {
    /// Creates a run configuration for the given endpoint with no
    /// extra headers.
    pub fn new(mcp_url: impl Into<String>) -> Self {
        Self {
            mcp_url: mcp_url.into(),
            headers: BTreeMap::new(),
        }
    }

    /// Adds a header sent with every MCP request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// A fatal, run-level failure. Per-tool problems never surface here;
/// they are absorbed into failing [`ToolVerdict`]s instead.
#[derive(Debug)]
pub enum RunError {
    /// The server could not be reached or the MCP handshake failed.
    Connect(SessionError),
    /// The session came up but tool discovery failed.
    Discovery(SessionError),
    /// The run exceeded its wall-clock budget.
    Timeout { limit: Duration },
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Connect(error) => {
                write!(f, "failed to connect to the MCP server: {error}")
            }
            RunError::Discovery(error) => write!(f, "failed to list tools: {error}"),
            RunError::Timeout { limit } => {
                write!(f, "run exceeded the {}s time budget", limit.as_secs())
            }
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Connect(error) | RunError::Discovery(error) => Some(error),
            RunError::Timeout { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_config_builder_collects_headers() {
        let config = RunConfig::new("https://mcp.example.com/mcp")
            .with_header("Authorization", "Bearer token")
            .with_header("X-Tenant", "acme");
        assert_eq!(config.mcp_url, "https://mcp.example.com/mcp");
        assert_eq!(
            config.headers.get("Authorization").map(String::as_str),
            Some("Bearer token")
        );
        assert_eq!(config.headers.len(), 2);
    }

    #[test]
    fn run_config_serializes_camel_case() {
        let config = RunConfig::new("https://mcp.example.com/mcp");
        let value = serde_json::to_value(&config).unwrap();
        assert!(value.get("mcpUrl").is_some());
        assert!(value.get("headers").is_some());
    }

    #[test]
    fn timeout_error_names_the_budget() {
        let error = RunError::Timeout {
            limit: Duration::from_secs(600),
        };
        assert_eq!(error.to_string(), "run exceeded the 600s time budget");
    }
}
