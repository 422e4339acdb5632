//! Linear lon/lat to pixel mapping within a [`GeoArea`].

use geo::Coord;
use tiletex_core::GeoArea;

/// Equirectangular projection of a [`GeoArea`] onto a `width` by `height`
/// canvas with north at the top.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use tiletex_core::GeoArea;
/// use tiletex_render::Projection;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let area = GeoArea::new(48.0, 11.0, 48.01, 11.01)?;
/// let projection = Projection::new(area, 100, 100);
/// let (x, y) = projection.project(Coord { x: 11.0, y: 48.01 });
/// assert_eq!((x, y), (0.0, 0.0));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    area: GeoArea,
    width: f64,
    height: f64,
}

impl Projection {
    /// Map `area` onto a canvas of the given pixel size.
    #[must_use]
    pub fn new(area: GeoArea, width: u32, height: u32) -> Self {
        Self {
            area,
            width: f64::from(width),
            height: f64::from(height),
        }
    }

    /// Area being projected.
    #[must_use]
    pub const fn area(&self) -> &GeoArea {
        &self.area
    }

    /// Canvas position of `coord`. Coordinates outside the area land outside
    /// the canvas.
    #[must_use]
    pub fn project(&self, coord: Coord<f64>) -> (f32, f32) {
        let x = (coord.x - self.area.min_lon()) / self.area.lon_span() * self.width;
        let y = (self.area.max_lat() - coord.y) / self.area.lat_span() * self.height;
        (x as f32, y as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn projection() -> Projection {
        let area = GeoArea::new(48.0, 11.0, 48.01, 11.01).expect("valid area");
        Projection::new(area, 200, 100)
    }

    #[rstest]
    #[case(Coord { x: 11.0, y: 48.01 }, (0.0, 0.0))]
    #[case(Coord { x: 11.01, y: 48.0 }, (200.0, 100.0))]
    #[case(Coord { x: 11.005, y: 48.005 }, (100.0, 50.0))]
    fn maps_corners_and_centre(
        projection: Projection,
        #[case] coord: Coord<f64>,
        #[case] expected: (f32, f32),
    ) {
        let (x, y) = projection.project(coord);
        assert!((x - expected.0).abs() < 1e-3, "x {x} vs {}", expected.0);
        assert!((y - expected.1).abs() < 1e-3, "y {y} vs {}", expected.1);
    }

    #[rstest]
    fn north_is_up(projection: Projection) {
        let (_, north) = projection.project(Coord { x: 11.005, y: 48.009 });
        let (_, south) = projection.project(Coord { x: 11.005, y: 48.001 });
        assert!(north < south);
    }
}
