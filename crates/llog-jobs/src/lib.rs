//! # llog-jobs
//!
//! Background processing for llog: a polling worker over the
//! [`llog_core::JobQueue`] trait, the [`handler::JobHandler`] seam it
//! dispatches through, and the refresh handler that re-fetches item
//! content from its origin.
//!
//! ## Example
//!
//! ```ignore
//! use llog_jobs::{RefreshHandler, WorkerBuilder, WorkerConfig};
//! use std::sync::Arc;
//!
//! let worker = WorkerBuilder::new(jobs.clone())
//!     .with_config(WorkerConfig::from_env())
//!     .with_handler(RefreshHandler::new(items.clone(), fetcher.clone()))
//!     .build()
//!     .await;
//!
//! let handle = worker.start();
//!
//! let mut events = handle.events();
//! while let Ok(event) = events.recv().await {
//!     tracing::debug!(?event, "worker event");
//! }
//!
//! handle.shutdown().await?;
//! ```

pub mod handler;
pub mod refresh;
pub mod worker;

pub use llog_core::*;

pub use handler::{JobContext, JobHandler, JobResult, NoOpHandler, ProgressCallback};
pub use refresh::RefreshHandler;
pub use worker::{JobWorker, WorkerBuilder, WorkerConfig, WorkerEvent, WorkerHandle};
