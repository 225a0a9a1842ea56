//! Markdown to PDF conversion for mdpdf
//!
//! This crate provides:
//! - The `Converter` trait consumed by the watcher core
//! - A pandoc-backed implementation with toolchain detection
//! - The conversion error taxonomy

pub mod pandoc;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Re-exports
pub use pandoc::PandocConverter;

/// Errors produced by a conversion attempt
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Input file disappeared between the change event and the conversion
    #[error("input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// External toolchain exited with a failure status
    #[error("conversion failed: {stderr}")]
    ToolFailed {
        status: Option<i32>,
        stderr: String,
    },

    /// External toolchain binary could not be executed at all
    #[error("conversion tool not available: {0}")]
    MissingTool(String),

    /// I/O failure while invoking the toolchain
    #[error("i/o error during conversion: {0}")]
    Io(#[from] std::io::Error),
}

/// Opaque document conversion collaborator
///
/// The watcher core only decides *when* to convert; implementations of
/// this trait decide *how*, including the output path convention.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Convert `input` to PDF, returning the path of the generated file
    async fn convert(&self, input: &Path) -> Result<PathBuf, ConvertError>;
}
