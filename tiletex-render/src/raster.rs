//! Painting render containers onto a tiny-skia pixmap.

use camino::{Utf8Path, Utf8PathBuf};
use geo::Coord;
use log::{debug, info};
use thiserror::Error;
use tiletex_core::{GeoArea, RenderContainer, RenderPrimitive, Rgba};
use tiny_skia::{
    Color, FillRule, LineCap, LineJoin, Paint, Path, PathBuilder, Pixmap, Shader, Stroke,
    Transform,
};

use crate::Projection;

/// Errors raised while preparing or exporting a raster.
#[derive(Debug, Error)]
pub enum RasterError {
    /// The requested canvas had a zero dimension or was too large.
    #[error("cannot allocate a {width}x{height} canvas")]
    InvalidCanvas {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },
    /// PNG encoding failed.
    #[error("failed to encode PNG: {message}")]
    Encode {
        /// Encoder message.
        message: String,
    },
    /// The PNG could not be written.
    #[error("failed to write PNG to {path}: {message}")]
    Save {
        /// Destination path.
        path: Utf8PathBuf,
        /// Encoder or I/O message.
        message: String,
    },
}

/// Counts reported by [`TileRasterizer::render`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RasterStats {
    /// Primitives painted.
    pub drawn: usize,
    /// Degenerate primitives left out.
    pub skipped: usize,
}

/// Fixed-size canvas bound to the [`GeoArea`] it projects.
///
/// Containers are painted in slice order, so later containers cover earlier
/// ones. Every paint is anti-aliased and uses the high-quality pipeline.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use tiletex_core::{GeoArea, GeometryKind, RenderContainer, RenderPrimitive, Rgba};
/// use tiletex_render::TileRasterizer;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let area = GeoArea::new(48.0, 11.0, 48.01, 11.01)?;
/// let mut raster = TileRasterizer::new(area, 64, 64, Rgba::WHITE)?;
/// let road = RenderContainer {
///     def_index: 0,
///     kind: GeometryKind::Polyline,
///     primitives: vec![RenderPrimitive::Polyline {
///         coords: vec![Coord { x: 11.0, y: 48.005 }, Coord { x: 11.01, y: 48.005 }],
///         color: Rgba::opaque(255, 0, 0),
///         stroke_width: 3.0,
///     }],
/// };
/// let stats = raster.render(&[road]);
/// assert_eq!(stats.drawn, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TileRasterizer {
    projection: Projection,
    pixmap: Pixmap,
}

impl TileRasterizer {
    /// Allocate a `width` by `height` canvas filled with `background`.
    pub fn new(
        area: GeoArea,
        width: u32,
        height: u32,
        background: Rgba,
    ) -> Result<Self, RasterError> {
        let mut pixmap =
            Pixmap::new(width, height).ok_or(RasterError::InvalidCanvas { width, height })?;
        pixmap.fill(to_color(background));
        Ok(Self {
            projection: Projection::new(area, width, height),
            pixmap,
        })
    }

    /// Canvas width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    /// Canvas height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Projection from degrees to canvas pixels.
    #[must_use]
    pub const fn projection(&self) -> &Projection {
        &self.projection
    }

    /// The canvas as painted so far.
    #[must_use]
    pub const fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Release the canvas.
    #[must_use]
    pub fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }

    /// Paint every primitive of every container, in order.
    pub fn render(&mut self, containers: &[RenderContainer]) -> RasterStats {
        let mut stats = RasterStats::default();
        for container in containers {
            let before = stats;
            for primitive in &container.primitives {
                if self.draw(primitive) {
                    stats.drawn += 1;
                } else {
                    stats.skipped += 1;
                }
            }
            debug!(
                "definition {}: drew {} {} primitives, skipped {}",
                container.def_index,
                stats.drawn - before.drawn,
                container.kind,
                stats.skipped - before.skipped
            );
        }
        info!(
            "rasterised {} primitives from {} containers ({} skipped)",
            stats.drawn,
            containers.len(),
            stats.skipped
        );
        stats
    }

    /// Paint one primitive. Returns `false` when it is too degenerate to draw.
    pub fn draw(&mut self, primitive: &RenderPrimitive) -> bool {
        match primitive {
            RenderPrimitive::Point {
                coord,
                color,
                radius,
            } => {
                let (x, y) = self.projection.project(*coord);
                let Some(circle) = PathBuilder::from_circle(x, y, *radius) else {
                    return false;
                };
                self.fill(&circle, *color);
                true
            }
            RenderPrimitive::Polyline {
                coords,
                color,
                stroke_width,
            } => {
                let Some(path) = self.trace(coords, false) else {
                    return false;
                };
                self.stroke(&path, *color, *stroke_width);
                true
            }
            RenderPrimitive::Polygon {
                coords,
                color,
                stroke_width,
            } => {
                let Some(path) = self.trace(coords, true) else {
                    return false;
                };
                self.fill(&path, *color);
                self.stroke(&path, *color, *stroke_width);
                true
            }
        }
    }

    /// Encode the canvas as PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>, RasterError> {
        self.pixmap.encode_png().map_err(|err| RasterError::Encode {
            message: err.to_string(),
        })
    }

    /// Write the canvas to `path` as PNG.
    pub fn save_png(&self, path: &Utf8Path) -> Result<(), RasterError> {
        self.pixmap
            .save_png(path.as_std_path())
            .map_err(|err| RasterError::Save {
                path: path.to_owned(),
                message: err.to_string(),
            })
    }

    fn trace(&self, coords: &[Coord<f64>], closed: bool) -> Option<Path> {
        let (first, rest) = coords.split_first()?;
        if rest.is_empty() {
            return None;
        }
        let mut builder = PathBuilder::new();
        let (x, y) = self.projection.project(*first);
        builder.move_to(x, y);
        for coord in rest {
            let (x, y) = self.projection.project(*coord);
            builder.line_to(x, y);
        }
        if closed {
            builder.close();
        }
        builder.finish()
    }

    fn fill(&mut self, path: &Path, color: Rgba) {
        self.pixmap.fill_path(
            path,
            &paint(color),
            FillRule::Winding,
            Transform::identity(),
            None,
        );
    }

    fn stroke(&mut self, path: &Path, color: Rgba, width: f32) {
        if width <= 0.0 {
            return;
        }
        let stroke = Stroke {
            width,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        self.pixmap
            .stroke_path(path, &paint(color), &stroke, Transform::identity(), None);
    }
}

fn to_color(color: Rgba) -> Color {
    Color::from_rgba8(color.r, color.g, color.b, color.a)
}

fn paint(color: Rgba) -> Paint<'static> {
    Paint {
        shader: Shader::SolidColor(to_color(color)),
        anti_alias: true,
        force_hq_pipeline: true,
        ..Paint::default()
    }
}
