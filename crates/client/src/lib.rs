//! Client code for swcache.
//!
//! This crate provides the request/response model, the network fetch
//! capability, the offline cache worker and the registration that hosts it.

pub mod fetch;
pub mod http;
pub mod registration;
pub mod worker;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use fetch::{FetchClient, FetchConfig, Network};
pub use http::{Destination, Request, Response, ResponseType};
pub use registration::{RegisterOutcome, Registration};
pub use worker::{EventOutcome, FetchOutcome, OfflineWorker, WorkerConfig, WorkerEvent, WorkerMessage, WorkerState};
