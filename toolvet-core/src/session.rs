//! MCP session management: connecting to a server, listing its tools,
//! and invoking them.
//!
//! [`SessionDriver`] wraps an initialized rmcp client service. All
//! request methods take `&self`; rmcp multiplexes concurrent requests
//! over the one connection by JSON-RPC id, so the driver can be shared
//! across the per-tool workers.

use std::fmt;
use std::time::Duration;

use rmcp::model::{CallToolRequestParam, CallToolResult, JsonObject, Tool};
use rmcp::service::{ClientInitializeError, RoleClient, RunningService, ServiceError};
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::{IntoTransport, StreamableHttpClientTransport};
use rmcp::ServiceExt;

use crate::RunConfig;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A failure at the MCP session layer.
#[derive(Debug)]
pub enum SessionError {
    /// The HTTP transport could not be constructed.
    Transport(String),
    /// The MCP initialize handshake failed.
    Initialize(ClientInitializeError),
    /// A request on an established session failed. Covers both
    /// transport drops and JSON-RPC error responses from the server.
    Service(ServiceError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Transport(message) => write!(f, "transport error: {message}"),
            SessionError::Initialize(error) => write!(f, "initialization failed: {error}"),
            SessionError::Service(error) => write!(f, "request failed: {error}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Transport(_) => None,
            SessionError::Initialize(error) => Some(error),
            SessionError::Service(error) => Some(error),
        }
    }
}

/// An initialized MCP client session.
pub struct SessionDriver {
    service: RunningService<RoleClient, ()>,
}

impl SessionDriver {
    /// Connects to a streamable-HTTP MCP endpoint and performs the
    /// initialize handshake. The configured headers are attached to
    /// every request the transport makes.
    pub async fn connect_http(config: &RunConfig) -> Result<Self, SessionError> {
        let mut headers = reqwest::header::HeaderMap::new();
        for (name, value) in &config.headers {
            let name: reqwest::header::HeaderName =
                name.parse().map_err(|error| {
                    SessionError::Transport(format!("invalid header name '{name}': {error}"))
                })?;
            let value = reqwest::header::HeaderValue::from_str(value).map_err(|error| {
                SessionError::Transport(format!("invalid value for header '{name:?}': {error}"))
            })?;
            headers.insert(name, value);
        }
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|error| {
                SessionError::Transport(format!("failed to build HTTP client: {error}"))
            })?;
        let transport = StreamableHttpClientTransport::with_client(
            client,
            StreamableHttpClientTransportConfig::with_uri(config.mcp_url.clone()),
        );
        Self::connect_with_transport(transport).await
    }

    /// Performs the initialize handshake over an arbitrary transport.
    /// This is the seam tests use to drive the session against a
    /// scripted in-process server.
    pub async fn connect_with_transport<T, E, A>(transport: T) -> Result<Self, SessionError>
    where
        T: IntoTransport<RoleClient, E, A>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let service = ()
            .serve(transport)
            .await
            .map_err(SessionError::Initialize)?;
        Ok(Self { service })
    }

    /// Lists every tool the server exposes, following pagination, in
    /// the order the server reports them.
    pub async fn list_tools(&self) -> Result<Vec<Tool>, SessionError> {
        self.service
            .list_all_tools()
            .await
            .map_err(SessionError::Service)
    }

    /// Invokes one tool. A `CallToolResult` with `is_error` set is a
    /// successful invocation at this layer; it is the caller's job to
    /// interpret it.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, SessionError> {
        self.service
            .call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments,
            })
            .await
            .map_err(SessionError::Service)
    }

    /// Shuts the session down.
    pub async fn close(self) -> Result<(), SessionError> {
        self.service
            .cancel()
            .await
            .map(|_| ())
            .map_err(|error| SessionError::Transport(format!("failed to close session: {error}")))
    }
}
