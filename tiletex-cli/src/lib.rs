//! Command-line interface for rendering tiletex ground-texture tiles.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

mod error;
mod inspect;
mod render;
mod request;

pub use error::CliError;
pub use request::{AreaSpec, EntitySpec, RenderRequest, RequestError, ResolvedRequest};

use inspect::InspectKeyArgs;
use render::RenderArgs;

const ARG_REQUEST: &str = "request";
const ARG_CACHE_DIR: &str = "cache-dir";
const ARG_WORK_DIR: &str = "work-dir";
const ARG_OUTPUT: &str = "output";
const ARG_WIDTH: &str = "width";
const ARG_HEIGHT: &str = "height";
const ARG_NO_CACHE: &str = "no-cache";
const ARG_ENDPOINT: &str = "endpoint";
const ARG_CONNECT_TIMEOUT: &str = "connect-timeout-secs";
const ARG_READ_TIMEOUT: &str = "read-timeout-secs";
const ENV_REQUEST: &str = "TILETEX_CMDS_RENDER_REQUEST_PATH";

/// Run the tiletex CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Command::Render(args) => render::run_render(args, &mut stdout),
        Command::InspectKey(args) => inspect::run_inspect(&args, &mut stdout),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "tiletex",
    about = "Render OpenStreetMap ground-texture tiles from Overpass data",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render a tile described by a JSON request.
    Render(RenderArgs),
    /// Show the area and filter hash encoded in a cache entry name.
    InspectKey(InspectKeyArgs),
}

#[cfg(test)]
mod tests;
