//! JSON render requests and their resolution into domain values.

use std::collections::BTreeMap;
use std::io::BufReader;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tiletex::FetchScope;
use tiletex_core::{
    EntityDef, EntityDefError, GeoArea, GeoAreaError, GeometryKind, Rgba, ValueMatch,
};
use tiletex_fs::open_utf8_file;

use crate::CliError;

/// Bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AreaSpec {
    /// Southern bound.
    pub min_lat: f64,
    /// Western bound.
    pub min_lon: f64,
    /// Northern bound.
    pub max_lat: f64,
    /// Eastern bound.
    pub max_lon: f64,
}

/// One entity definition as written in a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntitySpec {
    /// `point`, `polyline` or `polygon`.
    pub kind: GeometryKind,
    /// Tag key to select on.
    pub key: String,
    /// `"any"`, `{"exact": ".."}` or `{"regex": ".."}`.
    #[serde(default = "any_value", rename = "match")]
    pub value: ValueMatch,
    /// Palette name or `#rrggbb[aa]` literal.
    pub color: String,
    /// Stroke width, or radius for points, in pixels.
    pub size: f32,
}

fn any_value() -> ValueMatch {
    ValueMatch::Any
}

fn white() -> String {
    "#ffffff".to_owned()
}

/// A render request file.
///
/// Colours are referenced by palette name or given inline as hex. Entity
/// order is the drawing order, so later entries are painted on top.
///
/// ```json
/// {
///   "area": { "min_lat": 48.0, "min_lon": 11.0, "max_lat": 48.01, "max_lon": 11.01 },
///   "background": "grass",
///   "palette": { "grass": "#7fa35b", "road": "#5a5a5a" },
///   "entities": [
///     { "kind": "polyline", "key": "highway", "match": { "exact": "primary" },
///       "color": "road", "size": 6.0 }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderRequest {
    /// Area to render.
    pub area: AreaSpec,
    /// Colour of unpainted pixels.
    #[serde(default = "white")]
    pub background: String,
    /// Named colours.
    #[serde(default)]
    pub palette: BTreeMap<String, String>,
    /// Fetch every node and way in the area instead of only the selected
    /// entities.
    #[serde(default)]
    pub full_dataset: bool,
    /// Definitions in drawing order.
    #[serde(default)]
    pub entities: Vec<EntitySpec>,
}

/// Validation failures for a [`RenderRequest`].
#[derive(Debug, Error)]
pub enum RequestError {
    /// The area bounds were invalid.
    #[error("invalid area: {0}")]
    Area(#[from] GeoAreaError),
    /// A palette entry was not a hex colour.
    #[error("palette colour {name:?} has invalid value {value:?}")]
    InvalidPaletteColor {
        /// Palette name.
        name: String,
        /// Offending value.
        value: String,
    },
    /// A colour reference named no palette entry and was not a hex literal.
    #[error("unknown colour {reference:?}")]
    UnknownColor {
        /// The reference as written.
        reference: String,
    },
    /// An entity definition was rejected.
    #[error("entity {index} ({key}) is invalid: {source}")]
    Entity {
        /// Position in the entity list.
        index: usize,
        /// Tag key of the entity.
        key: String,
        /// Underlying failure.
        #[source]
        source: EntityDefError,
    },
}

/// A validated request ready for the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRequest {
    /// Area to render.
    pub area: GeoArea,
    /// Background colour.
    pub background: Rgba,
    /// Definitions in drawing order.
    pub defs: Vec<EntityDef>,
    /// What the remote query should select.
    pub scope: FetchScope,
}

impl RenderRequest {
    /// Validate the request and resolve colour references via the palette.
    pub fn resolve(&self) -> Result<ResolvedRequest, RequestError> {
        let AreaSpec {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        } = self.area;
        let area = GeoArea::new(min_lat, min_lon, max_lat, max_lon)?;
        let background = self.color(&self.background)?;
        let defs = self
            .entities
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                let color = self.color(&spec.color)?;
                EntityDef::new(spec.kind, spec.key.clone(), spec.value.clone(), color, spec.size)
                    .map_err(|source| RequestError::Entity {
                        index,
                        key: spec.key.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let scope = if self.full_dataset {
            FetchScope::Full
        } else {
            FetchScope::Filtered
        };
        Ok(ResolvedRequest {
            area,
            background,
            defs,
            scope,
        })
    }

    fn color(&self, reference: &str) -> Result<Rgba, RequestError> {
        if let Some(value) = self.palette.get(reference) {
            return Rgba::from_hex(value).ok_or_else(|| RequestError::InvalidPaletteColor {
                name: reference.to_owned(),
                value: value.clone(),
            });
        }
        reference
            .starts_with('#')
            .then(|| Rgba::from_hex(reference))
            .flatten()
            .ok_or_else(|| RequestError::UnknownColor {
                reference: reference.to_owned(),
            })
    }
}

/// Loads a JSON-encoded [`RenderRequest`] from disk.
pub(crate) fn load_request(path: &Utf8Path) -> Result<RenderRequest, CliError> {
    let file = open_utf8_file(path).map_err(|source| CliError::OpenRequest {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(|source| CliError::ParseRequest {
        path: path.to_path_buf(),
        source,
    })
}
