//! sw_status tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::OfflineWorker;

use super::json_result;
use crate::handler::WorkerHost;

/// One worker as seen by the registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WorkerStatus {
    pub version: String,
    pub state: String,
    pub skip_waiting: bool,
    pub clients_claimed: bool,
}

impl WorkerStatus {
    pub fn of(worker: &OfflineWorker) -> Self {
        let lifecycle = worker.lifecycle();
        Self {
            version: worker.version().to_string(),
            state: lifecycle.state().to_string(),
            skip_waiting: lifecycle.skip_waiting_requested(),
            clients_claimed: lifecycle.clients_claimed(),
        }
    }
}

/// Output structure for the sw_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwStatusOutput {
    pub scope: String,
    pub active: Option<WorkerStatus>,
    pub waiting: Option<WorkerStatus>,
    pub clients: usize,
}

/// Snapshot the registration.
pub async fn snapshot(host: &WorkerHost) -> SwStatusOutput {
    let registration = &host.registration;
    SwStatusOutput {
        scope: host.config.scope.to_string(),
        active: registration.active().await.as_deref().map(WorkerStatus::of),
        waiting: registration.waiting().await.as_deref().map(WorkerStatus::of),
        clients: registration.client_count().await,
    }
}

/// Implementation of the sw_status tool.
pub async fn status_impl(host: &WorkerHost) -> Result<CallToolResult, McpError> {
    json_result(&snapshot(host).await)
}
