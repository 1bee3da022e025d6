//! The conversational boundary: one text-in/text-out endpoint. Structured
//! tool calls may be supplied directly; everything else goes through the
//! agent runtime.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use freightprint_agent::runtime::{AgentRuntime, ToolCall};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Clone)]
pub struct ChatState {
    runtime: Arc<AgentRuntime>,
}

#[derive(Debug, Deserialize)]
pub struct ChatPayload {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub arguments: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

pub fn router(runtime: Arc<AgentRuntime>) -> Router {
    Router::new().route("/api/v1/chat", post(chat)).with_state(ChatState { runtime })
}

pub async fn chat(
    State(state): State<ChatState>,
    Json(payload): Json<ChatPayload>,
) -> (StatusCode, Json<ChatResponse>) {
    let correlation_id = Uuid::new_v4().simple().to_string();

    if let Some(tool) = payload.tool {
        let call = ToolCall { tool, arguments: payload.arguments.unwrap_or(Value::Null) };
        info!(
            event_name = "chat.tool_call",
            correlation_id = %correlation_id,
            tool = %call.tool,
            "received structured tool call"
        );

        return match state.runtime.handle_tool_call(&call).await {
            Ok(value) => {
                let reply = value
                    .get("summary")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string());
                (StatusCode::OK, Json(ChatResponse { reply, raw: Some(value) }))
            }
            Err(error) => (
                StatusCode::BAD_REQUEST,
                Json(ChatResponse { reply: error.to_string(), raw: None }),
            ),
        };
    }

    let message = payload.message.unwrap_or_default();
    info!(
        event_name = "chat.message",
        correlation_id = %correlation_id,
        "received chat message"
    );

    match state.runtime.handle_message(&message).await {
        Ok(reply) => (StatusCode::OK, Json(ChatResponse { reply, raw: None })),
        Err(failure) => {
            error!(
                event_name = "chat.error",
                correlation_id = %correlation_id,
                error = %failure,
                "chat turn failed"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ChatResponse {
                    reply: "An unexpected internal error occurred.".to_string(),
                    raw: None,
                }),
            )
        }
    }
}
