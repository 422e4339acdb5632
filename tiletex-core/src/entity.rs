//! Declarative entity selection rules.
//!
//! An [`EntityDef`] names which OSM entities to select (geometry kind plus a
//! tag predicate) and how to draw them (colour and stroke width or radius).
//! The order of a definition list is significant: it is both the order of
//! clauses in the remote query and the z-order on the canvas, with later
//! definitions drawn on top.

use thiserror::Error;

/// Shape an [`EntityDef`] renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum GeometryKind {
    /// A single node drawn as a filled circle.
    Point,
    /// An open way drawn as a stroked line.
    Polyline,
    /// A closed way drawn as a filled shape with an outline.
    Polygon,
}

impl GeometryKind {
    /// The kind of raw OSM entity this geometry is sourced from.
    #[must_use]
    pub const fn source_kind(self) -> crate::EntityKind {
        match self {
            Self::Point => crate::EntityKind::Point,
            Self::Polyline | Self::Polygon => crate::EntityKind::Way,
        }
    }

    const fn tag(self) -> u8 {
        match self {
            Self::Point => 0,
            Self::Polyline => 1,
            Self::Polygon => 2,
        }
    }
}

impl std::fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Point => "point",
            Self::Polyline => "polyline",
            Self::Polygon => "polygon",
        })
    }
}

/// How a tag value must look for an entity to be selected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ValueMatch {
    /// Any value is accepted as long as the key is present.
    Any,
    /// The value must equal this string.
    Exact(String),
    /// The value must contain a match for this regular expression.
    Regex(String),
}

impl ValueMatch {
    const fn tag(&self) -> u8 {
        match self {
            Self::Any => 0,
            Self::Exact(_) => 1,
            Self::Regex(_) => 2,
        }
    }
}

/// Straight-alpha RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel, `255` is opaque.
    pub a: u8,
}

impl Rgba {
    /// Opaque black.
    pub const BLACK: Self = Self::opaque(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::opaque(255, 255, 255);

    /// Construct a colour from all four channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Construct a fully opaque colour.
    #[must_use]
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Parse `#rrggbb` or `#rrggbbaa` (the leading `#` is optional).
    ///
    /// # Examples
    /// ```
    /// use tiletex_core::Rgba;
    ///
    /// assert_eq!(Rgba::from_hex("#ff000080"), Some(Rgba::new(255, 0, 0, 128)));
    /// assert_eq!(Rgba::from_hex("00ff00"), Some(Rgba::opaque(0, 255, 0)));
    /// assert_eq!(Rgba::from_hex("#nope"), None);
    /// ```
    #[must_use]
    pub fn from_hex(raw: &str) -> Option<Self> {
        let digits = raw.strip_prefix('#').unwrap_or(raw);
        if !digits.is_ascii() || !matches!(digits.len(), 6 | 8) {
            return None;
        }
        let channel = |at: usize| {
            digits
                .get(at..at + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
        };
        let alpha = if digits.len() == 8 { channel(6)? } else { 255 };
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?, alpha))
    }
}

/// Errors returned by the [`EntityDef`] constructors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EntityDefError {
    /// The tag key was empty.
    #[error("entity definition requires a non-empty tag key")]
    EmptyKey,
    /// The stroke width or radius was not a positive finite number.
    #[error("{what} must be a positive finite number, got {value}")]
    InvalidSize {
        /// `"radius"` or `"stroke width"`.
        what: &'static str,
        /// Offending value.
        value: f32,
    },
}

/// A rule selecting OSM entities and describing how to draw them.
///
/// # Examples
/// ```
/// use tiletex_core::{EntityDef, GeometryKind, Rgba, ValueMatch};
///
/// # fn main() -> Result<(), tiletex_core::EntityDefError> {
/// let roads = EntityDef::polyline(
///     "highway",
///     ValueMatch::Exact("primary".into()),
///     Rgba::opaque(255, 0, 0),
///     1.0,
/// )?;
/// assert_eq!(roads.kind(), GeometryKind::Polyline);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDef {
    kind: GeometryKind,
    key: String,
    value: ValueMatch,
    color: Rgba,
    size: f32,
}

impl EntityDef {
    /// Validates and constructs a definition of any kind.
    ///
    /// `size` is the radius for [`GeometryKind::Point`] and the stroke width
    /// otherwise.
    pub fn new(
        kind: GeometryKind,
        key: impl Into<String>,
        value: ValueMatch,
        color: Rgba,
        size: f32,
    ) -> Result<Self, EntityDefError> {
        let key = key.into();
        if key.is_empty() {
            return Err(EntityDefError::EmptyKey);
        }
        if !(size.is_finite() && size > 0.0) {
            let what = match kind {
                GeometryKind::Point => "radius",
                GeometryKind::Polyline | GeometryKind::Polygon => "stroke width",
            };
            return Err(EntityDefError::InvalidSize { what, value: size });
        }
        Ok(Self {
            kind,
            key,
            value,
            color,
            size,
        })
    }

    /// A point definition drawn as a circle of `radius` pixels.
    pub fn point(
        key: impl Into<String>,
        value: ValueMatch,
        color: Rgba,
        radius: f32,
    ) -> Result<Self, EntityDefError> {
        Self::new(GeometryKind::Point, key, value, color, radius)
    }

    /// A line definition stroked `stroke_width` pixels wide.
    pub fn polyline(
        key: impl Into<String>,
        value: ValueMatch,
        color: Rgba,
        stroke_width: f32,
    ) -> Result<Self, EntityDefError> {
        Self::new(GeometryKind::Polyline, key, value, color, stroke_width)
    }

    /// An area definition, filled and outlined `stroke_width` pixels wide.
    pub fn polygon(
        key: impl Into<String>,
        value: ValueMatch,
        color: Rgba,
        stroke_width: f32,
    ) -> Result<Self, EntityDefError> {
        Self::new(GeometryKind::Polygon, key, value, color, stroke_width)
    }

    /// Geometry the definition renders as.
    #[must_use]
    pub const fn kind(&self) -> GeometryKind {
        self.kind
    }

    /// Tag key that must be present.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Value predicate applied to the tag.
    #[must_use]
    pub const fn value(&self) -> &ValueMatch {
        &self.value
    }

    /// Resolved draw colour.
    #[must_use]
    pub const fn color(&self) -> Rgba {
        self.color
    }

    /// Radius for points, stroke width for lines and areas.
    #[must_use]
    pub const fn size(&self) -> f32 {
        self.size
    }

    /// Stable byte encoding of the selection part of the definition.
    ///
    /// Rendering parameters are excluded: two definitions that select the
    /// same entities share a dataset regardless of how they are drawn.
    #[must_use]
    pub fn selection_bytes(&self) -> Vec<u8> {
        let value = match &self.value {
            ValueMatch::Any => "",
            ValueMatch::Exact(value) | ValueMatch::Regex(value) => value.as_str(),
        };
        let mut bytes = Vec::with_capacity(2 + 8 + self.key.len() + value.len());
        bytes.push(self.kind.tag());
        push_len_prefixed(&mut bytes, self.key.as_bytes());
        bytes.push(self.value.tag());
        push_len_prefixed(&mut bytes, value.as_bytes());
        bytes
    }
}

fn push_len_prefixed(bytes: &mut Vec<u8>, field: &[u8]) {
    let len = u32::try_from(field.len()).unwrap_or(u32::MAX);
    bytes.extend_from_slice(&len.to_be_bytes());
    bytes.extend_from_slice(field);
}
