//! Prompts for the judging agent.

use rmcp::model::Tool;

pub(super) const SYSTEM_PROMPT: &str = "\
You are a quality engineer testing a single tool exposed by an MCP \
(Model Context Protocol) server. Invent realistic arguments that fit \
the tool's JSON schema, call the tool, and judge from the actual \
responses whether it works correctly. A tool that returns an error for \
well-formed input, returns nonsense, or contradicts its own \
description does not work correctly. When you have seen enough, stop \
calling the tool and deliver your verdict.";

/// Builds the per-tool task message: what the tool claims to do and
/// the exact shape the final answer must take.
pub(super) fn task_description(tool: &Tool) -> String {
    let description = tool
        .description
        .as_deref()
        .unwrap_or("(no description provided)");
    let schema = serde_json::to_string_pretty(tool.input_schema.as_ref())
        .unwrap_or_else(|_| "{}".to_string());
    format!(
        "Test the tool '{name}'.\n\
         Description: {description}\n\
         Input schema:\n{schema}\n\n\
         Call the tool with arguments you judge representative. You may \
         call it more than once if the first response is ambiguous. \
         Then answer with ONLY a JSON object of the form \
         {{\"passed\": <boolean>, \"detail\": \"<one or two sentences \
         explaining the verdict>\"}} and no other text.",
        name = tool.name,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_description_names_the_tool_and_schema() {
        let schema = json!({
            "type": "object",
            "properties": { "query": { "type": "string" } }
        });
        let tool = Tool::new(
            "search",
            "Searches the knowledge base",
            schema.as_object().cloned().unwrap(),
        );
        let task = task_description(&tool);
        assert!(task.contains("'search'"));
        assert!(task.contains("Searches the knowledge base"));
        assert!(task.contains("\"query\""));
        assert!(task.contains("\"passed\""));
    }

    #[test]
    fn missing_description_is_called_out() {
        let schema = json!({ "type": "object" });
        let mut tool = Tool::new("bare", "x", schema.as_object().cloned().unwrap());
        tool.description = None;
        assert!(task_description(&tool).contains("(no description provided)"));
    }
}
