//! Host-side registration: which worker is active, which is waiting.
//!
//! A newly installed worker waits while pages controlled by the previous
//! worker are open, unless it asked to skip waiting (after a successful
//! install, or through a `SKIP_WAITING` message). Promotion runs the new
//! worker's activation and retires the previous one.

use std::sync::Arc;

use serde_json::Value;
use swcache_core::Error;
use tokio::sync::Mutex;

use crate::fetch::Network;
use crate::http::Request;
use crate::worker::{EventOutcome, FetchOutcome, OfflineWorker, WorkerEvent, WorkerState};

/// Result of registering a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterOutcome {
    /// Assets cached at install; None when population failed.
    pub cached: Option<usize>,
    /// Worker state once registration settled.
    pub state: WorkerState,
}

#[derive(Default)]
struct Slots {
    active: Option<Arc<OfflineWorker>>,
    waiting: Option<Arc<OfflineWorker>>,
    clients: usize,
}

/// Registration of offline workers for one scope.
pub struct Registration {
    network: Arc<dyn Network>,
    slots: Mutex<Slots>,
}

impl Registration {
    /// `network` answers requests no active worker intercepts.
    pub fn new(network: Arc<dyn Network>) -> Self {
        Self { network, slots: Mutex::new(Slots::default()) }
    }

    /// Install `worker` and promote it if nothing holds it back.
    ///
    /// Install failures are logged and leave the worker waiting; they are
    /// not retried.
    pub async fn register(&self, worker: Arc<OfflineWorker>) -> Result<RegisterOutcome, Error> {
        let cached = match worker.handle(WorkerEvent::Install).await {
            Ok(EventOutcome::Installed { cached }) => Some(cached),
            Ok(_) => None,
            Err(e @ Error::CachePopulation(_)) => {
                tracing::warn!(version = %worker.version(), error = %e, "worker installed without offline assets");
                None
            }
            Err(e) => return Err(e),
        };

        let mut slots = self.slots.lock().await;
        if let Some(previous) = slots.waiting.replace(worker.clone()) {
            previous.lifecycle().mark_redundant();
        }
        Self::maybe_promote(&mut slots).await?;

        Ok(RegisterOutcome { cached, state: worker.lifecycle().state() })
    }

    /// Deliver a client message to the waiting worker, or the active one.
    ///
    /// Returns whether the worker recognised the message.
    pub async fn post_message(&self, payload: Value) -> Result<bool, Error> {
        let mut slots = self.slots.lock().await;
        let Some(target) = slots.waiting.clone().or_else(|| slots.active.clone()) else {
            return Ok(false);
        };

        let handled = target.on_message(&payload);
        Self::maybe_promote(&mut slots).await?;
        Ok(handled)
    }

    /// Route a page request through the active worker.
    ///
    /// Requests the worker does not intercept, and requests made while no
    /// worker is active, go straight to the network.
    pub async fn fetch(&self, request: Request) -> Result<FetchOutcome, Error> {
        let active = self.slots.lock().await.active.clone();

        let outcome = match active {
            Some(worker) => worker.on_fetch(&request).await?,
            None => FetchOutcome::Passthrough,
        };

        match outcome {
            FetchOutcome::Passthrough => Ok(FetchOutcome::Bypassed(self.network.fetch(&request).await?)),
            other => Ok(other),
        }
    }

    /// A page in scope opened.
    pub async fn open_client(&self) {
        self.slots.lock().await.clients += 1;
    }

    /// A page in scope closed. Closing the last one lets a waiting worker activate.
    pub async fn close_client(&self) -> Result<(), Error> {
        let mut slots = self.slots.lock().await;
        slots.clients = slots.clients.saturating_sub(1);
        Self::maybe_promote(&mut slots).await
    }

    pub async fn client_count(&self) -> usize {
        self.slots.lock().await.clients
    }

    pub async fn active(&self) -> Option<Arc<OfflineWorker>> {
        self.slots.lock().await.active.clone()
    }

    pub async fn waiting(&self) -> Option<Arc<OfflineWorker>> {
        self.slots.lock().await.waiting.clone()
    }

    async fn maybe_promote(slots: &mut Slots) -> Result<(), Error> {
        let Some(waiting) = slots.waiting.as_ref() else {
            return Ok(());
        };

        let ready = slots.active.is_none() || slots.clients == 0 || waiting.lifecycle().skip_waiting_requested();
        if !ready {
            tracing::debug!(
                version = %waiting.version(),
                clients = slots.clients,
                "worker waiting for clients to close"
            );
            return Ok(());
        }

        let Some(worker) = slots.waiting.take() else {
            return Ok(());
        };
        if let Some(previous) = slots.active.replace(worker.clone()) {
            tracing::info!(from = %previous.version(), to = %worker.version(), "replacing active worker");
            previous.lifecycle().mark_redundant();
        }

        worker.handle(WorkerEvent::Activate).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedNetwork;
    use crate::worker::WorkerConfig;
    use reqwest::Method;
    use serde_json::json;
    use swcache_core::CacheDb;
    use url::Url;

    const SCOPE: &str = "https://labels.example/app/";
    const INDEX: &str = "https://labels.example/app/index.html";

    fn network() -> Arc<ScriptedNetwork> {
        let network = Arc::new(ScriptedNetwork::new());
        network.respond(INDEX, 200, "<html>shell</html>");
        network
    }

    fn worker(version: &str, db: &CacheDb, network: &Arc<ScriptedNetwork>) -> Arc<OfflineWorker> {
        let config = WorkerConfig::new(version, Url::parse(SCOPE).unwrap(), &["./index.html"], "./index.html").unwrap();
        Arc::new(OfflineWorker::new(config, db.clone(), network.clone()))
    }

    #[tokio::test]
    async fn test_first_worker_activates_immediately() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = network();
        let registration = Registration::new(network.clone());

        let outcome = registration.register(worker("v1", &db, &network)).await.unwrap();

        assert_eq!(outcome, RegisterOutcome { cached: Some(1), state: WorkerState::Activated });
        assert_eq!(registration.active().await.unwrap().version(), "v1");
        assert!(registration.waiting().await.is_none());
    }

    #[tokio::test]
    async fn test_successful_install_skips_waiting() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = network();
        let registration = Registration::new(network.clone());
        let v1 = worker("v1", &db, &network);
        registration.register(v1.clone()).await.unwrap();
        registration.open_client().await;

        let outcome = registration.register(worker("v2", &db, &network)).await.unwrap();

        assert_eq!(outcome.state, WorkerState::Activated);
        assert_eq!(v1.lifecycle().state(), WorkerState::Redundant);
        assert_eq!(db.store_names().await.unwrap(), vec!["v2".to_string()]);
    }

    #[tokio::test]
    async fn test_skip_waiting_message_promotes_with_open_clients() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = network();
        let registration = Registration::new(network.clone());
        registration.register(worker("v1", &db, &network)).await.unwrap();
        registration.open_client().await;
        registration.open_client().await;

        network.set_offline(true);
        let v2 = worker("v2", &db, &network);
        let outcome = registration.register(v2.clone()).await.unwrap();
        assert_eq!(outcome, RegisterOutcome { cached: None, state: WorkerState::Installed });
        assert_eq!(registration.active().await.unwrap().version(), "v1");

        let handled = registration.post_message(json!({ "type": "SKIP_WAITING" })).await.unwrap();

        assert!(handled);
        assert_eq!(registration.client_count().await, 2);
        assert_eq!(registration.active().await.unwrap().version(), "v2");
        assert_eq!(v2.lifecycle().state(), WorkerState::Activated);
        assert!(registration.waiting().await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_message_keeps_worker_waiting() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = network();
        let registration = Registration::new(network.clone());
        registration.register(worker("v1", &db, &network)).await.unwrap();
        registration.open_client().await;

        network.set_offline(true);
        registration.register(worker("v2", &db, &network)).await.unwrap();

        assert!(!registration.post_message(json!({ "type": "REFRESH" })).await.unwrap());
        assert_eq!(registration.waiting().await.unwrap().version(), "v2");
    }

    #[tokio::test]
    async fn test_closing_last_client_promotes_waiting() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = network();
        let registration = Registration::new(network.clone());
        registration.register(worker("v1", &db, &network)).await.unwrap();
        registration.open_client().await;

        network.set_offline(true);
        registration.register(worker("v2", &db, &network)).await.unwrap();
        assert_eq!(registration.active().await.unwrap().version(), "v1");

        registration.close_client().await.unwrap();

        assert_eq!(registration.active().await.unwrap().version(), "v2");
    }

    #[tokio::test]
    async fn test_fetch_through_active_worker() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = network();
        let registration = Registration::new(network.clone());
        registration.register(worker("v1", &db, &network)).await.unwrap();
        network.set_offline(true);

        let outcome = registration.fetch(Request::get(Url::parse(INDEX).unwrap())).await.unwrap();

        assert!(matches!(outcome, FetchOutcome::Cache(_)));
    }

    #[tokio::test]
    async fn test_passthrough_goes_to_network() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = network();
        let registration = Registration::new(network.clone());
        registration.register(worker("v1", &db, &network)).await.unwrap();

        let api = Url::parse("https://labels.example/app/api").unwrap();
        let request = Request::new(Method::POST, api.clone(), crate::http::Destination::Empty);
        let outcome = registration.fetch(request).await.unwrap();

        assert!(matches!(outcome, FetchOutcome::Bypassed(_)));
        assert_eq!(network.calls().last().unwrap(), &(Method::POST, api.to_string()));
    }

    #[tokio::test]
    async fn test_fetch_without_active_worker() {
        let network = network();
        let registration = Registration::new(network.clone());

        let outcome = registration.fetch(Request::get(Url::parse(INDEX).unwrap())).await.unwrap();

        assert!(matches!(outcome, FetchOutcome::Bypassed(_)));
        assert!(registration.post_message(json!({ "type": "SKIP_WAITING" })).await.is_ok());
    }
}
