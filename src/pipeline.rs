//! End-to-end rendering of one tile request.

use camino::Utf8PathBuf;
use log::{debug, info};
use thiserror::Error;
use tiletex_core::{
    Cache, CacheKey, CacheKeyDeriver, CacheKeyError, EntityDef, EntityFilterEngine, FilterError,
    GeoArea, QueryBuilder, Rgba,
};
use tiletex_data::{DatasetFetcher, DocumentError, FetchError, Transport, parse_document};
use tiletex_render::{RasterError, RasterStats, TileRasterizer};

/// Default tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 2048;

/// Which data the remote query asks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchScope {
    /// Only entities selected by the definitions; keyed by their hash.
    #[default]
    Filtered,
    /// Every node and way in the area; keyed as the full dataset so one
    /// download serves any definition list.
    Full,
}

/// Canvas parameters for rendered tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSettings {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Colour of unpainted pixels.
    pub background: Rgba,
}

impl Default for TileSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_TILE_SIZE,
            height: DEFAULT_TILE_SIZE,
            background: Rgba::WHITE,
        }
    }
}

impl TileSettings {
    /// Set the canvas size.
    #[must_use]
    pub const fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the background colour.
    #[must_use]
    pub const fn with_background(mut self, background: Rgba) -> Self {
        self.background = background;
        self
    }
}

/// Terminal failure of a render request, tagged by the stage that failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Deriving the cache key failed.
    #[error("failed to derive cache key: {0}")]
    Key(#[from] CacheKeyError),
    /// The definitions could not be compiled or applied.
    #[error("failed to filter entities: {0}")]
    Filter(#[from] FilterError),
    /// No document could be obtained from the cache or any endpoint.
    #[error("failed to fetch OSM data: {0}")]
    Fetch(#[from] FetchError),
    /// The fetched document could not be parsed.
    #[error("failed to read OSM document: {0}")]
    Document(#[from] DocumentError),
    /// The canvas could not be allocated.
    #[error("failed to rasterise tile: {0}")]
    Raster(#[from] RasterError),
}

/// A finished tile and how it was produced.
#[derive(Debug)]
pub struct RenderedTile {
    /// Key the source document is cached under.
    pub key: CacheKey,
    /// Decompressed source document; `None` when nothing had to be fetched.
    pub document: Option<Utf8PathBuf>,
    /// Non-empty containers painted.
    pub containers: usize,
    /// Primitive counts.
    pub stats: RasterStats,
    /// The painted canvas.
    pub raster: TileRasterizer,
}

/// Runs cache key derivation, fetching, parsing, filtering and
/// rasterisation in sequence. Either a complete tile or a single
/// [`PipelineError`] is returned.
#[derive(Debug)]
pub struct TilePipeline<C, T> {
    fetcher: DatasetFetcher<C, T>,
    deriver: CacheKeyDeriver,
    settings: TileSettings,
}

impl<C: Cache, T: Transport> TilePipeline<C, T> {
    /// Assemble a pipeline around `fetcher`.
    #[must_use]
    pub fn new(fetcher: DatasetFetcher<C, T>, settings: TileSettings) -> Self {
        Self {
            fetcher,
            deriver: CacheKeyDeriver::default(),
            settings,
        }
    }

    /// The fetcher collaborator.
    #[must_use]
    pub const fn fetcher(&self) -> &DatasetFetcher<C, T> {
        &self.fetcher
    }

    /// Canvas parameters.
    #[must_use]
    pub const fn settings(&self) -> &TileSettings {
        &self.settings
    }

    /// Render `defs` over `area`, drawing later definitions on top.
    ///
    /// # Errors
    /// Returns the [`PipelineError`] variant of the first stage that fails.
    /// Definitions are compiled before any network access. A filtered render
    /// without definitions paints the background and fetches nothing.
    pub fn render(
        &mut self,
        area: &GeoArea,
        defs: &[EntityDef],
        scope: FetchScope,
    ) -> Result<RenderedTile, PipelineError> {
        let engine = EntityFilterEngine::new(defs.to_vec())?;
        let selection = match scope {
            FetchScope::Filtered => Some(defs),
            FetchScope::Full => None,
        };
        let key = self.deriver.derive_for(area, selection)?;
        let (document, containers) = if selection.is_some_and(<[EntityDef]>::is_empty) {
            debug!("no definitions for {key}, skipping the fetch");
            (None, Vec::new())
        } else {
            let query = QueryBuilder::new(area).build_for(selection);
            let document = self.fetcher.fetch(&key, &query)?;
            let index = parse_document(&document)?;
            (Some(document), engine.apply(&index)?)
        };
        let mut raster = TileRasterizer::new(
            *area,
            self.settings.width,
            self.settings.height,
            self.settings.background,
        )?;
        let stats = raster.render(&containers);
        info!(
            "rendered {key} at {}x{} from {} containers",
            self.settings.width,
            self.settings.height,
            containers.len()
        );
        Ok(RenderedTile {
            key,
            document,
            containers: containers.len(),
            stats,
            raster,
        })
    }
}
