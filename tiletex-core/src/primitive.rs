//! Coloured shapes ready for rasterisation.

use geo::Coord;

use crate::{GeometryKind, Rgba};

/// One shape to draw. Coordinates are in degrees (`x = lon`, `y = lat`).
#[derive(Debug, Clone, PartialEq)]
pub enum RenderPrimitive {
    /// Filled circle.
    Point {
        /// Centre.
        coord: Coord<f64>,
        /// Fill colour.
        color: Rgba,
        /// Radius in pixels.
        radius: f32,
    },
    /// Stroked open path.
    Polyline {
        /// Vertices in order.
        coords: Vec<Coord<f64>>,
        /// Stroke colour.
        color: Rgba,
        /// Stroke width in pixels.
        stroke_width: f32,
    },
    /// Filled closed shape with an outline.
    Polygon {
        /// Ring vertices in order; closing is implicit.
        coords: Vec<Coord<f64>>,
        /// Fill and outline colour.
        color: Rgba,
        /// Outline width in pixels.
        stroke_width: f32,
    },
}

impl RenderPrimitive {
    /// Geometry of this primitive.
    #[must_use]
    pub const fn kind(&self) -> GeometryKind {
        match self {
            Self::Point { .. } => GeometryKind::Point,
            Self::Polyline { .. } => GeometryKind::Polyline,
            Self::Polygon { .. } => GeometryKind::Polygon,
        }
    }

    /// Draw colour.
    #[must_use]
    pub const fn color(&self) -> Rgba {
        match self {
            Self::Point { color, .. } | Self::Polyline { color, .. } | Self::Polygon { color, .. } => {
                *color
            }
        }
    }
}

/// Same-kind primitives produced by one definition, in match order.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContainer {
    /// Position of the originating definition in the declared list.
    pub def_index: usize,
    /// Geometry shared by every primitive.
    pub kind: GeometryKind,
    /// Shapes to draw.
    pub primitives: Vec<RenderPrimitive>,
}

impl RenderContainer {
    /// Number of primitives.
    #[must_use]
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    /// Whether the container holds no primitives.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }
}
