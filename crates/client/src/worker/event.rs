//! Events dispatched to the worker and what handling them produced.

use serde::Deserialize;
use serde_json::Value;

use crate::http::{Request, Response};

/// Lifecycle and network events a worker responds to.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(Request),
    Message(Value),
}

/// Commands a page can post to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    SkipWaiting,
}

impl WorkerMessage {
    /// Parse a posted payload; anything unrecognised is None.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        if !payload.is_object() {
            return None;
        }
        WorkerMessage::deserialize(payload).ok()
    }
}

/// Where a fetch was answered from.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The worker did not intercept the request.
    Passthrough,
    /// The host fetched a request the worker did not intercept.
    Bypassed(Response),
    Cache(Response),
    Network(Response),
    /// Cached shell page served to an offline navigation.
    OfflineFallback(Response),
    /// Intercepted but nothing could answer it.
    NoResponse,
}

impl FetchOutcome {
    pub fn source(&self) -> &'static str {
        match self {
            FetchOutcome::Passthrough => "passthrough",
            FetchOutcome::Bypassed(_) => "bypass",
            FetchOutcome::Cache(_) => "cache",
            FetchOutcome::Network(_) => "network",
            FetchOutcome::OfflineFallback(_) => "offline-fallback",
            FetchOutcome::NoResponse => "none",
        }
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchOutcome::Bypassed(r)
            | FetchOutcome::Cache(r)
            | FetchOutcome::Network(r)
            | FetchOutcome::OfflineFallback(r) => Some(r),
            FetchOutcome::Passthrough | FetchOutcome::NoResponse => None,
        }
    }

    pub fn into_response(self) -> Option<Response> {
        match self {
            FetchOutcome::Bypassed(r)
            | FetchOutcome::Cache(r)
            | FetchOutcome::Network(r)
            | FetchOutcome::OfflineFallback(r) => Some(r),
            FetchOutcome::Passthrough | FetchOutcome::NoResponse => None,
        }
    }
}

/// Result of dispatching one [`WorkerEvent`].
#[derive(Debug, Clone)]
pub enum EventOutcome {
    Installed { cached: usize },
    Activated { evicted: Vec<String> },
    Fetched(FetchOutcome),
    Message { handled: bool },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_skip_waiting_payload() {
        let msg = WorkerMessage::from_payload(&json!({ "type": "SKIP_WAITING" }));
        assert_eq!(msg, Some(WorkerMessage::SkipWaiting));
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let msg = WorkerMessage::from_payload(&json!({ "type": "SKIP_WAITING", "from": "update-banner" }));
        assert_eq!(msg, Some(WorkerMessage::SkipWaiting));
    }

    #[test]
    fn test_unrecognised_payloads() {
        assert_eq!(WorkerMessage::from_payload(&json!({ "type": "CLAIM" })), None);
        assert_eq!(WorkerMessage::from_payload(&json!({ "kind": "SKIP_WAITING" })), None);
        assert_eq!(WorkerMessage::from_payload(&json!("SKIP_WAITING")), None);
        assert_eq!(WorkerMessage::from_payload(&Value::Null), None);
    }
}
