//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the drive storage core:
//! - Logging and tracing infrastructure
//! - Configuration management
//!
//! ## Overview
//!
//! Other crates depend on this one for the logging conventions and the
//! validated [`DriveConfig`](config::DriveConfig) they are constructed from.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{ConflictBehavior, DriveConfig, DriveConfigBuilder, DriveSettings};
pub use error::{Error, Result};
