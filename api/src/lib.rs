//! # Wallflower API
//!
//! Generic HTTP request service with error classification.
//!
//! This crate is the imperative shell between the reducers and a JSON
//! backend. It provides:
//!
//! - **`SourceService`**: a reusable request pipeline bound to one backend
//!   resource, with token injection, timeouts, and optional retry
//! - **`ServiceConfig`**: declarative endpoint resolution and operation bindings
//! - **`Notifier`**: classification of raw API failures into user-facing notices
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   call/bound    ┌───────────────┐   HTTP   ┌─────────┐
//! │  Reducers  │ ──────────────► │ SourceService │ ───────► │ Backend │
//! └────────────┘                 └───────┬───────┘          └─────────┘
//!        ▲                               │ publish(ApiError)
//!        │                               ▼
//!        │                       ┌───────────────┐
//!        │                       │   EventBus    │
//!        │                       └───────┬───────┘
//!        │                               │ bridge
//!        │                               ▼
//!        │                       ┌───────────────┐
//!        └── ErrorNotice ◄────── │   Notifier    │
//!                                └───────────────┘
//! ```
//!
//! Failures never flow back through return values as errors: a failed call
//! resolves to `None` and the failure detail travels on the error bus.

pub mod config;
pub mod error;
pub mod notify;
pub mod service;

pub use config::{BindingOverrides, Bindings, Endpoint, Operation, ServiceConfig, ServiceSpec};
pub use error::ConfigError;
pub use notify::{ErrorKind, ErrorNotice, Notifier, Severity};
pub use service::{ApiError, CallBuilder, RetryFn, SourceService};
