//! # Host Bridge Traits
//!
//! Capability contracts between the storage core and the host that embeds it.
//!
//! ## Overview
//!
//! The core never talks to the network, the filesystem or a cache directly.
//! Each of those is a trait here, implemented per host (`bridge-desktop`
//! ships the desktop defaults) or by test doubles.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Request executor; owns transport and authentication
//! - [`ByteSource`](storage::ByteSource) - Sequential chunked reads for uploads
//! - [`PathStore`](storage::PathStore) - Path-to-metadata cache with get/put/forget
//! - [`LoggerSink`](log::LoggerSink) - Forward structured logs to host logging
//!
//! ## Records
//!
//! [`FileAttributes`](storage::FileAttributes) is the canonical metadata
//! record every storage operation reports in, with
//! [`Visibility`](storage::Visibility) and [`EntryKind`](storage::EntryKind).
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it and keep messages actionable.
//!
//! ## Thread Safety
//!
//! Shared collaborators (`HttpClient`, `PathStore`, `LoggerSink`) require
//! `Send + Sync`; the core adds no locking of its own.
//!
//! ## Example
//!
//! ```ignore
//! use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//!
//! pub struct MyHttpClient {
//!     client: reqwest::Client,
//! }
//!
//! #[async_trait]
//! impl HttpClient for MyHttpClient {
//!     async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
//!         todo!()
//!     }
//! }
//! ```

pub mod error;
pub mod http;
pub mod log;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use log::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use storage::{
    ByteSource, BytesSource, EntryKind, FileAttributes, MemoryPathStore, PathStore, Visibility,
};
