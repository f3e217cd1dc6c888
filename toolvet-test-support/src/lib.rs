//! Test fixtures shared by the toolvet crates: an in-process scripted
//! MCP server transport and a scripted judging agent.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ctor::ctor;

#[ctor]
fn init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default())
        .is_test(true)
        .try_init();
}

use async_trait::async_trait;
use rmcp::model::{
    CallToolResult, ClientJsonRpcMessage, ClientRequest, ErrorData, InitializeResult,
    JsonRpcMessage, JsonRpcResponse, JsonRpcVersion2_0, RequestId, ServerJsonRpcMessage,
    ServerResult, Tool,
};
use rmcp::service::RoleClient;
use rmcp::transport::Transport;
use serde_json::json;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use toolvet_core::{ChatMessage, ChatReply, LlmClient, LlmError, ToolSpec};

/// A tool with an empty object schema and a stock description.
pub fn stub_tool(name: &str) -> Tool {
    Tool::new(
        name.to_string(),
        "stub tool",
        json!({ "type": "object" }).as_object().cloned().unwrap(),
    )
}

/// A tool with a real description and input schema, for tests that
/// care about what the agent is told.
pub fn described_tool(name: &str, description: &str, input_schema: serde_json::Value) -> Tool {
    Tool::new(
        name.to_string(),
        description.to_string(),
        input_schema.as_object().cloned().expect("object schema"),
    )
}

fn response(id: RequestId, result: ServerResult) -> ServerJsonRpcMessage {
    ServerJsonRpcMessage::Response(JsonRpcResponse {
        jsonrpc: JsonRpcVersion2_0,
        id,
        result,
    })
}

fn init_response(id: RequestId) -> ServerJsonRpcMessage {
    response(id, ServerResult::InitializeResult(InitializeResult::default()))
}

fn list_tools_response(id: RequestId, tools: Vec<Tool>) -> ServerJsonRpcMessage {
    response(
        id,
        ServerResult::ListToolsResult(rmcp::model::ListToolsResult {
            tools,
            next_cursor: None,
        }),
    )
}

fn call_tool_response(id: RequestId, result: CallToolResult) -> ServerJsonRpcMessage {
    response(id, ServerResult::CallToolResult(result))
}

/// An in-process MCP server: answers initialize, lists a fixed tool
/// set, and resolves tool calls from a per-tool script. Unknown tools
/// and unscripted calls get a JSON-RPC error. Records every call's
/// tool name for assertions.
pub struct ScriptedServerTransport {
    tools: Vec<Tool>,
    call_results: HashMap<String, Result<CallToolResult, ErrorData>>,
    list_tools_error: Option<ErrorData>,
    calls: Arc<Mutex<Vec<String>>>,
    responses: Arc<AsyncMutex<mpsc::UnboundedReceiver<ServerJsonRpcMessage>>>,
    response_tx: mpsc::UnboundedSender<ServerJsonRpcMessage>,
}

impl ScriptedServerTransport {
    pub fn new(tools: Vec<Tool>) -> Self {
        let (response_tx, response_rx) = mpsc::unbounded_channel();
        Self {
            tools,
            call_results: HashMap::new(),
            list_tools_error: None,
            calls: Arc::new(Mutex::new(Vec::new())),
            responses: Arc::new(AsyncMutex::new(response_rx)),
            response_tx,
        }
    }

    /// Scripts the response for calls to `tool`.
    pub fn with_call_result(
        mut self,
        tool: &str,
        result: Result<CallToolResult, ErrorData>,
    ) -> Self {
        self.call_results.insert(tool.to_string(), result);
        self
    }

    /// Makes tools/list fail with the given error.
    pub fn with_list_tools_error(mut self, error: ErrorData) -> Self {
        self.list_tools_error = Some(error);
        self
    }

    /// Shared handle to the names of tools called so far, in call
    /// order. Grab it before handing the transport to the session.
    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }
}

impl Transport<RoleClient> for ScriptedServerTransport {
    type Error = std::convert::Infallible;

    fn send(
        &mut self,
        item: ClientJsonRpcMessage,
    ) -> impl std::future::Future<Output = Result<(), Self::Error>> + Send + 'static {
        let response_tx = self.response_tx.clone();
        let tools = self.tools.clone();
        let list_tools_error = self.list_tools_error.clone();
        if let JsonRpcMessage::Request(request) = &item {
            let id = request.id.clone();
            let server_message = match &request.request {
                ClientRequest::InitializeRequest(_) => Some(init_response(id)),
                ClientRequest::ListToolsRequest(_) => Some(match list_tools_error {
                    Some(error) => ServerJsonRpcMessage::error(error, id),
                    None => list_tools_response(id, tools),
                }),
                ClientRequest::CallToolRequest(call) => {
                    let name = call.params.name.to_string();
                    self.calls.lock().expect("calls").push(name.clone());
                    let scripted = self.call_results.get(&name).cloned().unwrap_or_else(|| {
                        Err(ErrorData::internal_error(
                            format!("no scripted result for tool '{name}'"),
                            None,
                        ))
                    });
                    Some(match scripted {
                        Ok(result) => call_tool_response(id, result),
                        Err(error) => ServerJsonRpcMessage::error(error, id),
                    })
                }
                _ => None,
            };
            if let Some(message) = server_message {
                let _ = response_tx.send(message);
            }
        }
        std::future::ready(Ok(()))
    }

    fn receive(&mut self) -> impl std::future::Future<Output = Option<ServerJsonRpcMessage>> {
        let responses = Arc::clone(&self.responses);
        async move {
            let mut receiver = responses.lock().await;
            receiver.recv().await
        }
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// An error type for transports that are scripted to fail.
#[derive(Debug)]
pub struct TransportFault(pub &'static str);

impl std::fmt::Display for TransportFault {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0)
    }
}

impl std::error::Error for TransportFault {}

/// A transport whose very first send fails, so the initialize
/// handshake can never complete.
pub struct RefusingTransport;

impl Transport<RoleClient> for RefusingTransport {
    type Error = TransportFault;

    fn send(
        &mut self,
        _item: ClientJsonRpcMessage,
    ) -> impl std::future::Future<Output = Result<(), Self::Error>> + Send + 'static {
        std::future::ready(Err(TransportFault("connection refused")))
    }

    fn receive(&mut self) -> impl std::future::Future<Output = Option<ServerJsonRpcMessage>> {
        std::future::pending()
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// A scripted judging agent. Replies are keyed by the name of the
/// (single) tool offered in each chat call and consumed front to
/// back; running out of script is an error reply.
pub struct ScriptedJudge {
    scripts: Mutex<HashMap<String, VecDeque<Result<ChatReply, LlmError>>>>,
    delays: HashMap<String, Duration>,
}

impl ScriptedJudge {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            delays: HashMap::new(),
        }
    }

    /// Scripts the sequence of replies for conversations about `tool`.
    pub fn with_script(self, tool: &str, replies: Vec<Result<ChatReply, LlmError>>) -> Self {
        self.scripts
            .lock()
            .expect("scripts")
            .insert(tool.to_string(), replies.into());
        self
    }

    /// Shorthand for a one-reply script: an immediate final answer.
    pub fn with_final_answer(self, tool: &str, answer: &str) -> Self {
        self.with_script(tool, vec![Ok(ChatReply::Final(answer.to_string()))])
    }

    /// Delays every reply about `tool`, for tests that make later
    /// tools finish first.
    pub fn with_delay(mut self, tool: &str, delay: Duration) -> Self {
        self.delays.insert(tool.to_string(), delay);
        self
    }
}

impl Default for ScriptedJudge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for ScriptedJudge {
    async fn chat(
        &self,
        _messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<ChatReply, LlmError> {
        let tool = tools
            .first()
            .map(|spec| spec.name.clone())
            .unwrap_or_default();
        if let Some(delay) = self.delays.get(&tool) {
            tokio::time::sleep(*delay).await;
        }
        let next = self
            .scripts
            .lock()
            .expect("scripts")
            .get_mut(&tool)
            .and_then(VecDeque::pop_front);
        next.unwrap_or_else(|| {
            Err(LlmError::Response(format!(
                "no scripted reply left for tool '{tool}'"
            )))
        })
    }
}
