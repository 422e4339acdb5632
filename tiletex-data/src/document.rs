//! OSM XML document parsing into an [`OsmDatasetIndex`].
//!
//! Documents may be stored plain or wrapped in a zip, bzip2 or gzip container;
//! the container is chosen from the file name suffix.

use std::io::{self, BufRead, BufReader};

use bzip2::read::BzDecoder;
use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::GzDecoder;
use geo::Coord;
use log::{info, warn};
use quick_xml::DeError;
use serde::Deserialize;
use thiserror::Error;
use tiletex_core::{OsmDatasetIndex, OsmPoint, OsmWay, Tags};
use tiletex_fs::open_utf8_file;
use zip::ZipArchive;
use zip::result::ZipError;

/// Errors raised while reading an OSM document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The document could not be opened.
    #[error("failed to open OSM document {path}: {source}")]
    Open {
        /// Document path.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// The zip container could not be read.
    #[error("failed to read zip container {path}: {source}")]
    Archive {
        /// Document path.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: ZipError,
    },
    /// The XML was malformed or truncated.
    #[error("failed to parse OSM document {path}: {source}")]
    Parse {
        /// Document path.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: DeError,
    },
    /// A node carried a coordinate outside WGS84 ranges.
    #[error("node {id} in {path} has invalid coordinate ({lat}, {lon})")]
    InvalidCoordinate {
        /// Document path.
        path: Utf8PathBuf,
        /// Node id.
        id: i64,
        /// Latitude as parsed.
        lat: f64,
        /// Longitude as parsed.
        lon: f64,
    },
}

/// Container format inferred from a document's file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Plain XML.
    Plain,
    /// Single-entry zip archive.
    Zip,
    /// bzip2 stream.
    Bzip2,
    /// gzip stream.
    Gzip,
}

impl Compression {
    /// Classify `path` by its final extension.
    #[must_use]
    pub fn from_path(path: &Utf8Path) -> Self {
        match path.extension().map(str::to_ascii_lowercase).as_deref() {
            Some("zip") => Self::Zip,
            Some("bz2") => Self::Bzip2,
            Some("gz") => Self::Gzip,
            _ => Self::Plain,
        }
    }
}

#[derive(Debug, Deserialize)]
struct XmlDocument {
    #[serde(default)]
    node: Vec<XmlNode>,
    #[serde(default)]
    way: Vec<XmlWay>,
    #[serde(default)]
    relation: Vec<XmlRelation>,
}

#[derive(Debug, Deserialize)]
struct XmlNode {
    #[serde(rename = "@id")]
    id: i64,
    #[serde(rename = "@lat")]
    lat: f64,
    #[serde(rename = "@lon")]
    lon: f64,
    #[serde(default)]
    tag: Vec<XmlTag>,
}

#[derive(Debug, Deserialize)]
struct XmlWay {
    #[serde(rename = "@id")]
    id: i64,
    #[serde(default)]
    nd: Vec<XmlNodeRef>,
    #[serde(default)]
    tag: Vec<XmlTag>,
}

#[derive(Debug, Deserialize)]
struct XmlNodeRef {
    #[serde(rename = "@ref")]
    reference: i64,
}

#[derive(Debug, Deserialize)]
struct XmlTag {
    #[serde(rename = "@k")]
    key: String,
    #[serde(rename = "@v")]
    value: String,
}

#[derive(Debug, Deserialize)]
struct XmlRelation {}

fn collect_tags(tags: Vec<XmlTag>) -> Tags {
    tags.into_iter().map(|tag| (tag.key, tag.value)).collect()
}

/// A node whose coordinate failed validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BadCoordinate {
    /// Node id.
    pub id: i64,
    /// Latitude as parsed.
    pub lat: f64,
    /// Longitude as parsed.
    pub lon: f64,
}

impl XmlDocument {
    fn into_index(self) -> Result<OsmDatasetIndex, BadCoordinate> {
        let mut index = OsmDatasetIndex::default();
        for node in self.node {
            let valid = node.lat.is_finite()
                && node.lon.is_finite()
                && (-90.0..=90.0).contains(&node.lat)
                && (-180.0..=180.0).contains(&node.lon);
            if !valid {
                return Err(BadCoordinate {
                    id: node.id,
                    lat: node.lat,
                    lon: node.lon,
                });
            }
            index.push_point(OsmPoint {
                id: node.id,
                location: Coord {
                    x: node.lon,
                    y: node.lat,
                },
                tags: collect_tags(node.tag),
            });
        }
        for way in self.way {
            index.push_way(OsmWay {
                id: way.id,
                refs: way.nd.into_iter().map(|nd| nd.reference).collect(),
                tags: collect_tags(way.tag),
            });
        }
        for _ in self.relation {
            index.note_relation();
        }
        Ok(index)
    }
}

/// Outcome of [`parse_reader`].
#[derive(Debug, Error)]
pub enum ReadError {
    /// The XML was malformed or truncated.
    #[error(transparent)]
    Xml(#[from] DeError),
    /// A node carried a coordinate outside WGS84 ranges.
    #[error("node {} has invalid coordinate ({}, {})", .0.id, .0.lat, .0.lon)]
    Coordinate(BadCoordinate),
}

/// Parse an uncompressed OSM XML stream.
///
/// # Examples
/// ```
/// use tiletex_data::parse_reader;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let xml = r#"<osm version="0.6">
///   <node id="1" lat="48.0" lon="11.0"><tag k="amenity" v="cafe"/></node>
/// </osm>"#;
/// let index = parse_reader(xml.as_bytes())?;
/// assert_eq!(index.points().len(), 1);
/// # Ok(())
/// # }
/// ```
pub fn parse_reader<R: BufRead>(reader: R) -> Result<OsmDatasetIndex, ReadError> {
    let document: XmlDocument = quick_xml::de::from_reader(reader)?;
    document.into_index().map_err(ReadError::Coordinate)
}

/// Open, decompress and parse the document at `path`.
pub fn parse_document(path: &Utf8Path) -> Result<OsmDatasetIndex, DocumentError> {
    let file = open_utf8_file(path)
        .map_err(|source| DocumentError::Open {
            path: path.to_owned(),
            source,
        })?
        .into_std();
    let parsed = match Compression::from_path(path) {
        Compression::Plain => parse_reader(BufReader::new(file)),
        Compression::Bzip2 => parse_reader(BufReader::new(BzDecoder::new(file))),
        Compression::Gzip => parse_reader(BufReader::new(GzDecoder::new(file))),
        Compression::Zip => {
            let archive_error = |source| DocumentError::Archive {
                path: path.to_owned(),
                source,
            };
            let mut archive = ZipArchive::new(file).map_err(archive_error)?;
            let entry = archive.by_index(0).map_err(archive_error)?;
            parse_reader(BufReader::new(entry))
        }
    };
    let index = parsed.map_err(|err| match err {
        ReadError::Xml(source) => DocumentError::Parse {
            path: path.to_owned(),
            source,
        },
        ReadError::Coordinate(BadCoordinate { id, lat, lon }) => DocumentError::InvalidCoordinate {
            path: path.to_owned(),
            id,
            lat,
            lon,
        },
    })?;
    if index.relation_count() > 0 {
        warn!(
            "ignoring {} relations in {path}; relations are not rendered",
            index.relation_count()
        );
    }
    info!(
        "indexed {} points and {} ways from {path}",
        index.points().len(),
        index.ways().len()
    );
    Ok(index)
}
