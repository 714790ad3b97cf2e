//! sw_message tool implementation.
//!
//! Posts a client message to the worker and reports the registration afterwards.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use super::sw_status::{SwStatusOutput, snapshot};
use crate::handler::WorkerHost;

/// Parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message payload, e.g. {"type": "SKIP_WAITING"}.
    pub payload: serde_json::Value,
}

/// Output from the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageOutput {
    /// Whether the worker recognised the message.
    pub handled: bool,
    pub status: SwStatusOutput,
}

/// Implementation of the sw_message tool.
pub async fn message_impl(host: &WorkerHost, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let handled = host.registration.post_message(params.payload).await?;
    let output = SwMessageOutput { handled, status: snapshot(host).await };
    json_result(&output)
}
