//! Rectangular WGS84 bounding boxes.
//!
//! A [`GeoArea`] is the unit every render request is scoped to: it names the
//! slice of the world that gets queried, cached and projected onto a canvas.
//! Coordinates follow the `geo` convention of `x = longitude`, `y = latitude`.

use geo::Coord;
use thiserror::Error;

/// Mean Earth radius in kilometres used for equirectangular distances.
const EARTH_RADIUS_KM: f64 = 6_371.008_8;

/// Decimal places emitted by [`GeoArea::bounds_token`].
const BOUNDS_TOKEN_PRECISION: usize = 6;

/// Errors returned when constructing a [`GeoArea`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoAreaError {
    /// A coordinate was NaN or infinite.
    #[error("coordinate {value} is not a finite number")]
    NonFinite {
        /// Offending value.
        value: f64,
    },
    /// A latitude fell outside `[-90, 90]`.
    #[error("latitude {value} lies outside [-90, 90]")]
    LatitudeOutOfRange {
        /// Offending value.
        value: f64,
    },
    /// A longitude fell outside `[-180, 180]`.
    #[error("longitude {value} lies outside [-180, 180]")]
    LongitudeOutOfRange {
        /// Offending value.
        value: f64,
    },
    /// The minimum bound was not strictly below the maximum bound.
    #[error("{axis} bounds are empty or inverted (min {min}, max {max})")]
    EmptyExtent {
        /// Either `"latitude"` or `"longitude"`.
        axis: &'static str,
        /// Supplied lower bound.
        min: f64,
        /// Supplied upper bound.
        max: f64,
    },
}

/// Immutable bounding box in degrees.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use tiletex_core::GeoArea;
///
/// # fn main() -> Result<(), tiletex_core::GeoAreaError> {
/// let area = GeoArea::from_corners(
///     Coord { x: 11.01, y: 48.01 },
///     Coord { x: 11.00, y: 48.00 },
/// )?;
/// assert_eq!(area.min_lat(), 48.00);
/// assert_eq!(area.bounds_token(), "48.000000,11.000000,48.010000,11.010000");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoArea {
    min_lat: f64,
    min_lon: f64,
    max_lat: f64,
    max_lon: f64,
}

impl GeoArea {
    /// Validates and constructs a [`GeoArea`] from explicit bounds.
    ///
    /// The bounds must be finite, within WGS84 ranges and strictly ordered.
    pub fn new(
        min_lat: f64,
        min_lon: f64,
        max_lat: f64,
        max_lon: f64,
    ) -> Result<Self, GeoAreaError> {
        for lat in [min_lat, max_lat] {
            validate_latitude(lat)?;
        }
        for lon in [min_lon, max_lon] {
            validate_longitude(lon)?;
        }
        if min_lat >= max_lat {
            return Err(GeoAreaError::EmptyExtent {
                axis: "latitude",
                min: min_lat,
                max: max_lat,
            });
        }
        if min_lon >= max_lon {
            return Err(GeoAreaError::EmptyExtent {
                axis: "longitude",
                min: min_lon,
                max: max_lon,
            });
        }
        Ok(Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        })
    }

    /// Constructs a [`GeoArea`] from two opposite corners in any order.
    pub fn from_corners(a: Coord<f64>, b: Coord<f64>) -> Result<Self, GeoAreaError> {
        Self::new(a.y.min(b.y), a.x.min(b.x), a.y.max(b.y), a.x.max(b.x))
    }

    /// Southern bound in degrees.
    #[must_use]
    pub const fn min_lat(&self) -> f64 {
        self.min_lat
    }

    /// Western bound in degrees.
    #[must_use]
    pub const fn min_lon(&self) -> f64 {
        self.min_lon
    }

    /// Northern bound in degrees.
    #[must_use]
    pub const fn max_lat(&self) -> f64 {
        self.max_lat
    }

    /// Eastern bound in degrees.
    #[must_use]
    pub const fn max_lon(&self) -> f64 {
        self.max_lon
    }

    /// Latitude extent in degrees.
    #[must_use]
    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Longitude extent in degrees.
    #[must_use]
    pub fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Midpoint of the box.
    #[must_use]
    pub fn center(&self) -> Coord<f64> {
        Coord {
            x: (self.min_lon + self.max_lon) / 2.0,
            y: (self.min_lat + self.max_lat) / 2.0,
        }
    }

    /// East-west extent in kilometres, measured along the central parallel.
    #[must_use]
    pub fn width_km(&self) -> f64 {
        let scale = self.center().y.to_radians().cos();
        self.lon_span().to_radians() * EARTH_RADIUS_KM * scale
    }

    /// North-south extent in kilometres.
    #[must_use]
    pub fn height_km(&self) -> f64 {
        self.lat_span().to_radians() * EARTH_RADIUS_KM
    }

    /// Whether `coord` lies inside the box, bounds included.
    #[must_use]
    pub fn contains(&self, coord: Coord<f64>) -> bool {
        (self.min_lat..=self.max_lat).contains(&coord.y)
            && (self.min_lon..=self.max_lon).contains(&coord.x)
    }

    /// Compact `minLat,minLon,maxLat,maxLon` fragment for query embedding.
    #[must_use]
    pub fn bounds_token(&self) -> String {
        let p = BOUNDS_TOKEN_PRECISION;
        format!(
            "{:.p$},{:.p$},{:.p$},{:.p$}",
            self.min_lat, self.min_lon, self.max_lat, self.max_lon
        )
    }
}

fn validate_latitude(value: f64) -> Result<(), GeoAreaError> {
    if !value.is_finite() {
        return Err(GeoAreaError::NonFinite { value });
    }
    if !(-90.0..=90.0).contains(&value) {
        return Err(GeoAreaError::LatitudeOutOfRange { value });
    }
    Ok(())
}

fn validate_longitude(value: f64) -> Result<(), GeoAreaError> {
    if !value.is_finite() {
        return Err(GeoAreaError::NonFinite { value });
    }
    if !(-180.0..=180.0).contains(&value) {
        return Err(GeoAreaError::LongitudeOutOfRange { value });
    }
    Ok(())
}
