//! Error types emitted by the tiletex CLI.

use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;
use tiletex::{PipelineError, RasterError};
use tiletex_core::{CacheError, CacheKeyError};
use tiletex_data::TransportBuildError;

use crate::RequestError;

/// Errors emitted by the tiletex CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Opening the render request file failed.
    #[error("failed to open render request at {path:?}: {source}")]
    OpenRequest {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Render request JSON could not be decoded.
    #[error("failed to parse render request JSON at {path:?}: {source}")]
    ParseRequest {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The render request failed validation.
    #[error("render request in {path:?} failed validation: {source}")]
    InvalidRequest {
        path: Utf8PathBuf,
        #[source]
        source: RequestError,
    },
    /// The cache directory could not be opened.
    #[error("failed to open cache directory {path:?}: {source}")]
    OpenCache {
        path: Utf8PathBuf,
        #[source]
        source: CacheError,
    },
    /// The HTTP transport could not be constructed.
    #[error(transparent)]
    BuildTransport(#[from] TransportBuildError),
    /// A pipeline stage failed.
    #[error("render failed: {0}")]
    Render(#[from] PipelineError),
    /// Writing the PNG failed.
    #[error(transparent)]
    SaveTile(RasterError),
    /// A cache entry name could not be decoded.
    #[error("{name:?} is not a cache key: {source}")]
    InvalidCacheKey {
        name: String,
        #[source]
        source: CacheKeyError,
    },
    /// Writing command output failed.
    #[error("failed to write command output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
