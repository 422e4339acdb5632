//! Render command implementation for the tiletex CLI.

use std::io::Write;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::debug;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use tiletex::{
    DEFAULT_ENDPOINTS, DEFAULT_TILE_SIZE, DatasetFetcher, DirectoryCache, FetcherConfig,
    ReqwestTransport, TilePipeline, TileSettings, Transport, TransportConfig,
};

use crate::request::load_request;
use crate::{
    ARG_CACHE_DIR, ARG_CONNECT_TIMEOUT, ARG_ENDPOINT, ARG_HEIGHT, ARG_NO_CACHE, ARG_OUTPUT,
    ARG_READ_TIMEOUT, ARG_REQUEST, ARG_WIDTH, ARG_WORK_DIR, CliError, ENV_REQUEST,
};

const DEFAULT_CACHE_DIR: &str = ".tiletex/cache";
const DEFAULT_WORK_DIR: &str = ".tiletex/work";

/// CLI arguments for the `render` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Render a ground-texture tile for the area and entity \
                 definitions in a JSON render request. OSM data is fetched \
                 from Overpass unless the cache already holds it.",
    about = "Render a tile from a JSON request"
)]
#[ortho_config(prefix = "TILETEX")]
pub(crate) struct RenderArgs {
    /// Path to a JSON file containing a render request.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) request_path: Option<Utf8PathBuf>,
    /// Directory holding compressed Overpass responses.
    #[arg(long = ARG_CACHE_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) cache_dir: Option<Utf8PathBuf>,
    /// Directory decompressed documents are written to.
    #[arg(long = ARG_WORK_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) work_dir: Option<Utf8PathBuf>,
    /// Output PNG path. Defaults to the request path with a `.png` extension.
    #[arg(long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
    /// Tile width in pixels.
    #[arg(long = ARG_WIDTH, value_name = "px")]
    #[serde(default)]
    pub(crate) width: Option<u32>,
    /// Tile height in pixels.
    #[arg(long = ARG_HEIGHT, value_name = "px")]
    #[serde(default)]
    pub(crate) height: Option<u32>,
    /// Do not write downloads back to the cache.
    #[arg(long = ARG_NO_CACHE)]
    #[serde(default)]
    pub(crate) no_cache: bool,
    /// Overpass interpreter URL; repeat to set the failover order.
    #[arg(long = ARG_ENDPOINT, value_name = "url")]
    #[serde(default)]
    pub(crate) endpoints: Vec<String>,
    /// Connect timeout per endpoint attempt.
    #[arg(long = ARG_CONNECT_TIMEOUT, value_name = "secs")]
    #[serde(default)]
    pub(crate) connect_timeout_secs: Option<u64>,
    /// Read timeout per endpoint attempt.
    #[arg(long = ARG_READ_TIMEOUT, value_name = "secs")]
    #[serde(default)]
    pub(crate) read_timeout_secs: Option<u64>,
}

impl RenderArgs {
    pub(crate) fn into_config(self) -> Result<RenderConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        RenderConfig::try_from(merged)
    }
}

/// Resolved `render` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RenderConfig {
    pub(crate) request_path: Utf8PathBuf,
    pub(crate) cache_dir: Utf8PathBuf,
    pub(crate) work_dir: Utf8PathBuf,
    pub(crate) output: Utf8PathBuf,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) cache_writes: bool,
    pub(crate) endpoints: Vec<String>,
    pub(crate) transport: TransportConfig,
}

impl RenderConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        Self::require_existing(&self.request_path, ARG_REQUEST)
    }

    fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
        match tiletex_fs::file_is_file(path) {
            Ok(true) => Ok(()),
            Ok(false) if path.exists() => Err(CliError::SourcePathNotFile {
                field,
                path: path.to_path_buf(),
            }),
            Ok(false) => Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            }),
            Err(source) => Err(CliError::InspectSourcePath {
                field,
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig::new(self.work_dir.clone())
            .with_endpoints(self.endpoints.iter().cloned())
            .with_cache_writes(self.cache_writes)
    }
}

impl TryFrom<RenderArgs> for RenderConfig {
    type Error = CliError;

    fn try_from(args: RenderArgs) -> Result<Self, Self::Error> {
        let request_path = args.request_path.ok_or(CliError::MissingArgument {
            field: ARG_REQUEST,
            env: ENV_REQUEST,
        })?;
        let output = args
            .output
            .unwrap_or_else(|| request_path.with_extension("png"));
        let endpoints = if args.endpoints.is_empty() {
            DEFAULT_ENDPOINTS.iter().map(|&e| e.to_owned()).collect()
        } else {
            args.endpoints
        };
        let mut transport = TransportConfig::default();
        if let Some(secs) = args.connect_timeout_secs {
            transport = transport.with_connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = args.read_timeout_secs {
            transport = transport.with_read_timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            request_path,
            cache_dir: args
                .cache_dir
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_CACHE_DIR)),
            work_dir: args
                .work_dir
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_WORK_DIR)),
            output,
            width: args.width.unwrap_or(DEFAULT_TILE_SIZE),
            height: args.height.unwrap_or(DEFAULT_TILE_SIZE),
            cache_writes: !args.no_cache,
            endpoints,
            transport,
        })
    }
}

/// Builds the transport for the current render invocation.
pub(super) trait RenderTransportBuilder {
    fn build<'a>(&'a self, config: &RenderConfig) -> Result<Box<dyn Transport + 'a>, CliError>;
}

pub(super) struct DefaultRenderTransportBuilder;

impl RenderTransportBuilder for DefaultRenderTransportBuilder {
    fn build<'a>(&'a self, config: &RenderConfig) -> Result<Box<dyn Transport + 'a>, CliError> {
        let transport = ReqwestTransport::new(config.transport.clone())?;
        Ok(Box::new(transport))
    }
}

pub(super) fn run_render(args: RenderArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    run_render_with(args, &DefaultRenderTransportBuilder, writer)
}

pub(super) fn run_render_with(
    args: RenderArgs,
    builder: &dyn RenderTransportBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    render_with_config(&config, builder, writer)
}

pub(super) fn render_with_config(
    config: &RenderConfig,
    builder: &dyn RenderTransportBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let request = load_request(&config.request_path)?
        .resolve()
        .map_err(|source| CliError::InvalidRequest {
            path: config.request_path.clone(),
            source,
        })?;
    debug!(
        "resolved {} entity definitions from {}",
        request.defs.len(),
        config.request_path
    );
    let cache =
        DirectoryCache::open(config.cache_dir.clone()).map_err(|source| CliError::OpenCache {
            path: config.cache_dir.clone(),
            source,
        })?;
    let transport = builder.build(config)?;
    let fetcher = DatasetFetcher::new(cache, transport, config.fetcher_config());
    let settings = TileSettings::default()
        .with_size(config.width, config.height)
        .with_background(request.background);
    let mut pipeline = TilePipeline::new(fetcher, settings);
    let tile = pipeline.render(&request.area, &request.defs, request.scope)?;
    tile.raster
        .save_png(&config.output)
        .map_err(CliError::SaveTile)?;
    writeln!(
        writer,
        "wrote {} ({}x{}, {} primitives from {} matching definitions, key {})",
        config.output, config.width, config.height, tile.stats.drawn, tile.containers, tile.key
    )
    .map_err(CliError::WriteOutput)
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<RenderConfig, CliError> {
    let merged = RenderArgs::merge_from_layers(layers).map_err(CliError::from)?;
    RenderConfig::try_from(merged)
}
