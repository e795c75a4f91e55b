//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`, targeting Microsoft Graph
//! - `ByteSource` over local files using `tokio::fs`
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{FileByteSource, ReqwestHttpClient};
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let http_client = ReqwestHttpClient::new()?.with_access_token(token);
//!     let source = FileByteSource::open("report.pdf").await?;
//!     // Hand both to the storage driver
//!     Ok(())
//! }
//! ```

mod filesystem;
mod http;

pub use filesystem::FileByteSource;
pub use http::{ReqwestHttpClient, GRAPH_BASE_URL};
