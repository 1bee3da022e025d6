use std::sync::Arc;

use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::llm::LlmClient;
use crate::tools::ToolRegistry;

const EMPTY_MESSAGE_REPLY: &str = "Was there something you wanted to ask?";

/// A structured tool invocation, either produced by the LLM translator or
/// supplied directly by the caller.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Dispatches conversation turns to tools. The runtime never interprets
/// free text itself: a message either comes with a structured tool call,
/// or the LLM translates it into one.
pub struct AgentRuntime {
    registry: ToolRegistry,
    llm: Option<Arc<dyn LlmClient>>,
}

impl AgentRuntime {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry, llm: None }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Executes a structured tool call and formats the reply.
    pub async fn handle_tool_call(&self, call: &ToolCall) -> Result<Value> {
        self.registry.dispatch(&call.tool, call.arguments.clone()).await
    }

    /// Handles a free-text turn: the LLM picks a tool, the registry runs
    /// it. Without an LLM configured the runtime can only ask for a
    /// structured call.
    pub async fn handle_message(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(EMPTY_MESSAGE_REPLY.to_string());
        }

        let Some(llm) = &self.llm else {
            return Ok(
                "No language model is configured; send a structured tool call instead."
                    .to_string(),
            );
        };

        let prompt = self.tool_prompt(text);
        let completion = llm.complete(&prompt).await?;

        let Some(call) = parse_tool_call(&completion) else {
            // The model answered in prose; relay it rather than failing
            // the turn.
            warn!(event_name = "agent.untranslated_reply", "llm reply was not a tool call");
            return Ok(completion.trim().to_string());
        };

        debug!(event_name = "agent.tool_selected", tool = %call.tool, "llm selected tool");
        let value = self.handle_tool_call(&call).await?;
        Ok(format_reply(&value))
    }

    fn tool_prompt(&self, text: &str) -> String {
        let mut prompt = String::from(
            "You translate shipping questions into tool calls. Reply with a single JSON \
             object: {\"tool\": <name>, \"arguments\": {…}}. Available tools:\n",
        );
        for (name, description) in self.registry.descriptors() {
            prompt.push_str(&format!("- {name}: {description}\n"));
        }
        prompt.push_str("\nUser message:\n");
        prompt.push_str(text);
        prompt
    }
}

/// Extracts a tool call from an LLM completion. Tolerates prose or code
/// fences around the JSON object; returns `None` when no parseable call
/// is present.
pub fn parse_tool_call(completion: &str) -> Option<ToolCall> {
    let trimmed = completion.trim();
    if let Ok(call) = serde_json::from_str::<ToolCall>(trimmed) {
        return Some(call);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<ToolCall>(&trimmed[start..=end]).ok()
}

/// Prefers a tool-provided summary line; falls back to the raw payload.
fn format_reply(value: &Value) -> String {
    if let Some(summary) = value.get("summary").and_then(Value::as_str) {
        return summary.to_string();
    }
    if let Some(error) = value.get("message").and_then(Value::as_str) {
        return error.to_string();
    }
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
