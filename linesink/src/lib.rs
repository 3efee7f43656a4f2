//! # Linesink
//!
//! Main library for the linesink batch runner.
//!
//! This crate provides the entry point and configuration for running the
//! exactly-once line ingestion pipeline against Kafka and SQLite.

pub mod config;

pub use config::Dependencies;

use linesink_pipeline::PipelineError;
use linesink_repository::StoreError;
use thiserror::Error;

/// Errors that can occur during run initialization or execution.
#[derive(Error, Debug)]
pub enum RunError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] PipelineError),

    /// Store error.
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl RunError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
