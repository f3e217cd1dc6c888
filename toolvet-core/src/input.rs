//! External run input: the JSON object a caller hands the checker and
//! the validation that turns it into a [`RunConfig`].

use std::collections::BTreeMap;
use std::fmt;

use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::RunConfig;

/// The external input object, as submitted by a caller:
/// `{"mcpUrl": "...", "headers": {"Name": "Value", ...}}`.
///
/// `headers` may be omitted entirely, which is the same as an empty
/// map. Unknown fields are rejected so that a typo like `mcpURL` fails
/// loudly instead of silently testing the wrong thing.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CheckInput {
    /// URL of the MCP server under test.
    pub mcp_url: String,
    /// Headers attached to every MCP request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl CheckInput {
    pub fn new(mcp_url: impl Into<String>) -> Self {
        Self {
            mcp_url: mcp_url.into(),
            headers: BTreeMap::new(),
        }
    }

    /// Validates the input and freezes it into a [`RunConfig`].
    pub fn into_run_config(self) -> Result<RunConfig, ConfigError> {
        validate_mcp_url(&self.mcp_url)?;
        for (name, value) in &self.headers {
            validate_header(name, value)?;
        }
        Ok(RunConfig {
            mcp_url: self.mcp_url,
            headers: self.headers,
        })
    }
}

/// Rejected run input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    /// The MCP URL was empty or missing.
    MissingUrl,
    /// The MCP URL did not parse as an absolute http(s) URL.
    InvalidUrl { url: String, reason: String },
    /// A header name or value is not legal HTTP.
    InvalidHeader { name: String, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingUrl => write!(f, "an MCP server URL is required"),
            ConfigError::InvalidUrl { url, reason } => {
                write!(f, "invalid MCP server URL '{url}': {reason}")
            }
            ConfigError::InvalidHeader { name, reason } => {
                write!(f, "invalid header '{name}': {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

fn validate_mcp_url(raw: &str) -> Result<(), ConfigError> {
    if raw.trim().is_empty() {
        return Err(ConfigError::MissingUrl);
    }
    let url = Url::parse(raw).map_err(|error| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: error.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ConfigError::InvalidUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme '{other}'"),
            })
        }
    }
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: "URL has no host".to_string(),
        });
    }
    Ok(())
}

fn validate_header(name: &str, value: &str) -> Result<(), ConfigError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|error| ConfigError::InvalidHeader {
        name: name.to_string(),
        reason: error.to_string(),
    })?;
    HeaderValue::from_str(value).map_err(|error| ConfigError::InvalidHeader {
        name: name.to_string(),
        reason: error.to_string(),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_url_and_headers() {
        let input: CheckInput = serde_json::from_str(
            r#"{"mcpUrl": "https://mcp.example.com/mcp", "headers": {"Authorization": "Bearer t"}}"#,
        )
        .unwrap();
        let config = input.into_run_config().unwrap();
        assert_eq!(config.mcp_url, "https://mcp.example.com/mcp");
        assert_eq!(
            config.headers.get("Authorization").map(String::as_str),
            Some("Bearer t")
        );
    }

    #[test]
    fn missing_headers_means_empty_map() {
        let input: CheckInput =
            serde_json::from_str(r#"{"mcpUrl": "http://localhost:3000/mcp"}"#).unwrap();
        let config = input.into_run_config().unwrap();
        assert!(config.headers.is_empty());
    }

    #[test]
    fn rejects_unknown_fields() {
        let result: Result<CheckInput, _> =
            serde_json::from_str(r#"{"mcpURL": "http://localhost:3000/mcp"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_empty_url() {
        let input = CheckInput::new("   ");
        assert_eq!(input.into_run_config(), Err(ConfigError::MissingUrl));
    }

    #[test]
    fn rejects_relative_url() {
        let input = CheckInput::new("mcp.example.com/mcp");
        assert!(matches!(
            input.into_run_config(),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn rejects_non_http_scheme() {
        let input = CheckInput::new("ftp://mcp.example.com/mcp");
        let error = input.into_run_config().unwrap_err();
        assert!(error.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn rejects_header_name_with_spaces() {
        let mut input = CheckInput::new("https://mcp.example.com/mcp");
        input
            .headers
            .insert("Bad Header".to_string(), "v".to_string());
        assert!(matches!(
            input.into_run_config(),
            Err(ConfigError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn rejects_header_value_with_newline() {
        let mut input = CheckInput::new("https://mcp.example.com/mcp");
        input
            .headers
            .insert("X-Key".to_string(), "a\nb".to_string());
        assert!(matches!(
            input.into_run_config(),
            Err(ConfigError::InvalidHeader { .. })
        ));
    }
}
