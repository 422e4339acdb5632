//! `inspect-key` command: decode a cache entry name.

use std::io::Write;

use clap::Parser;
use tiletex_core::CacheKey;

use crate::CliError;

/// CLI arguments for the `inspect-key` subcommand.
#[derive(Debug, Clone, Parser)]
#[command(
    long_about = "Decode a cache key or cache entry file name (e.g. \
                 osm-<location>-<entities>.xml.zip) and print the area it \
                 was fetched for.",
    about = "Show the area encoded in a cache key"
)]
pub(crate) struct InspectKeyArgs {
    /// Cache key (`<location>-<entities>`) or cache entry file name.
    #[arg(value_name = "key")]
    pub(crate) key: String,
}

pub(crate) fn run_inspect(args: &InspectKeyArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let invalid = |source| CliError::InvalidCacheKey {
        name: args.key.clone(),
        source,
    };
    let key = if args.key.starts_with("osm-") {
        CacheKey::from_file_name(&args.key)
    } else {
        CacheKey::parse(&args.key)
    }
    .map_err(invalid)?;
    let area = key.area().map_err(invalid)?;
    let center = area.center();
    let scope = if key.is_full_dataset() {
        "full dataset"
    } else {
        "filtered"
    };
    let report = format!(
        "key: {key}\n\
         entities: {} ({scope})\n\
         bounds: {}\n\
         center: {:.6}, {:.6}\n\
         size: {:.3} km x {:.3} km\n",
        key.entity_hash(),
        area.bounds_token(),
        center.y,
        center.x,
        area.width_km(),
        area.height_km(),
    );
    writer
        .write_all(report.as_bytes())
        .map_err(CliError::WriteOutput)
}
