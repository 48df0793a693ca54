//! Client library for the VanaDristi plant-monitoring service.
//!
//! This crate talks to the VanaDristi REST API and keeps server data in a
//! local cache so that views can read it cheaply and refresh it when it
//! changes.
//!
//! # Features
//!
//! - **API client**: one typed method per endpoint ([`ApiClient`])
//! - **Query cache**: stale times, prefix invalidation, deduplicated fetches
//!   ([`QueryCache`], [`QueryClient`])
//! - **Observers**: background refetching published over a watch channel
//! - **Mutations**: writes that invalidate the data they change
//! - **Image capture**: camera and file paths to an upload payload
//! - **Workflows**: identification, observation target and chat state machines
//!
//! # Architecture
//!
//! ```text
//!   views / CLI
//!       |
//!   QueryClient ---- QueryCache (keys, freshness, events)
//!       |
//!   ApiClient (reqwest) ---- VanaDristi REST API
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use vanadristi_core::{ClientConfig, QueryClient};
//! use vanadristi_core::queries::{GetLatestSensorData, GetObservationTarget};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = QueryClient::from_config(&ClientConfig::default())?;
//!
//!     if let Some(target) = client.fetch(&GetObservationTarget).await?.as_ref() {
//!         let reading = client.fetch(&GetLatestSensorData::new(&target.id)).await?;
//!         println!("{:?} °C", reading.temperature);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod capture;
pub mod client;
pub mod config;
pub mod error;
pub mod keys;
pub mod mutation;
pub mod mutations;
pub mod queries;
pub mod query;
pub mod retry;
pub mod sync;
pub mod view;
pub mod workflow;

pub use cache::{CacheConfig, CacheEvent, QueryCache, QueryKey};
pub use capture::{
    Camera, CameraStream, CaptureConstraints, CaptureSession, FacingMode, Frame, ImagePayload,
    MockCamera,
};
pub use client::ApiClient;
pub use config::{ClientConfig, DEFAULT_BASE_URL};
pub use error::{CaptureError, Error, Result};
pub use mutation::Mutation;
pub use query::{Query, Refetching};
pub use retry::{RetryConfig, is_transient, with_retry};
pub use sync::{MutationHandle, MutationState, QueryClient, QueryError, QueryObserver, QueryState};
pub use view::{Dashboard, DetailView, ListView, SensorSummary};
pub use workflow::{ChatSession, IdentificationState, IdentificationWorkflow, TargetSelection};

// Re-export types for convenience
pub use vanadristi_types;
