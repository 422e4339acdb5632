//! Rasterisation of tiletex render containers into ground-texture tiles.
//!
//! [`TileRasterizer`] projects each primitive's degrees into canvas pixels
//! with [`Projection`] and paints it with tiny-skia.

mod projection;
mod raster;

pub use projection::Projection;
pub use raster::{RasterError, RasterStats, TileRasterizer};
pub use tiny_skia::Pixmap;
