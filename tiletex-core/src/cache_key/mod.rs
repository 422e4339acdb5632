//! Content-addressed names for fetched datasets.
//!
//! A [`CacheKey`] combines two independent hashes:
//!
//! - a reversible *location hash* that bit-packs the [`GeoArea`] so the area
//!   a cache entry covers can be recovered from its name alone; and
//! - an irreversible, order-sensitive *entity hash* over the selection part of
//!   the [`EntityDef`] list, or the literal `all` for unfiltered fetches.
//!
//! The textual form `<location>-<entities>` names cache entries
//! `osm-<key>.xml.zip` and their decompressed working copies `osm-<key>.xml`.

mod digest;
mod location;

use std::fmt;

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use thiserror::Error;

use crate::{EntityDef, GeoArea, GeoAreaError};

pub use digest::{DigestFunction, Xxh3Digest};
pub use location::{
    FIELD_BITS, LOCATION_HASH_LEN, LOCATION_MULTIPLIER, decode_location, encode_location,
};

/// Entity hash used when no filtering is applied.
pub const FULL_DATASET_TOKEN: &str = "all";

/// Number of digest bytes kept in the entity hash.
pub const ENTITY_HASH_BYTES: usize = 3;

const CACHE_FILE_PREFIX: &str = "osm-";
const ARCHIVE_SUFFIX: &str = ".xml.zip";
const DOCUMENT_SUFFIX: &str = ".xml";

/// URL-safe base64 that never emits padding and accepts it either way.
pub(crate) const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Errors raised while deriving or parsing cache keys.
///
/// Encoding failures indicate an internal fault: every valid [`GeoArea`] fits
/// the packed representation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CacheKeyError {
    /// A scaled coordinate did not fit its packed field.
    #[error("coordinate {value} does not fit a {bits}-bit location field")]
    CoordinateOutOfRange {
        /// Coordinate in degrees.
        value: f64,
        /// Field width in bits.
        bits: u32,
    },
    /// The location hash was not valid base64url.
    #[error("location hash {hash:?} is not valid base64url: {source}")]
    LocationEncoding {
        /// Hash as supplied.
        hash: String,
        /// Decoder failure.
        #[source]
        source: base64::DecodeError,
    },
    /// The location hash decoded to the wrong number of bytes.
    #[error("location hash decodes to {found} bytes, expected {expected}")]
    LocationLength {
        /// Required byte count.
        expected: usize,
        /// Decoded byte count.
        found: usize,
    },
    /// The decoded bounds do not form a valid area.
    #[error("location hash {hash:?} decodes to an invalid area: {source}")]
    DecodedArea {
        /// Hash as supplied.
        hash: String,
        /// Validation failure.
        #[source]
        source: GeoAreaError,
    },
    /// The text is not shaped like `<location>-<entities>`.
    #[error("{text:?} is not a cache key")]
    Malformed {
        /// Text as supplied.
        text: String,
    },
}

/// Composite identifier naming one cached fetch result.
///
/// # Examples
/// ```
/// use tiletex_core::{CacheKey, CacheKeyDeriver, GeoArea};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let area = GeoArea::new(48.0, 11.0, 48.01, 11.01)?;
/// let key = CacheKeyDeriver::default().derive_full(&area)?;
/// assert!(key.file_name().ends_with("-all.xml.zip"));
///
/// let parsed = CacheKey::from_file_name(&key.file_name())?;
/// assert_eq!(parsed, key);
/// assert!((parsed.area()?.min_lat() - 48.0).abs() < 1.0e-3);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    location_hash: String,
    entity_hash: String,
    is_full_dataset: bool,
}

impl CacheKey {
    /// Reversible encoding of the area.
    #[must_use]
    pub fn location_hash(&self) -> &str {
        &self.location_hash
    }

    /// Digest of the entity filter, or [`FULL_DATASET_TOKEN`].
    #[must_use]
    pub fn entity_hash(&self) -> &str {
        &self.entity_hash
    }

    /// Whether the key names an unfiltered fetch.
    #[must_use]
    pub const fn is_full_dataset(&self) -> bool {
        self.is_full_dataset
    }

    /// Recover the area this key was derived from, to within one
    /// quantisation step.
    pub fn area(&self) -> Result<GeoArea, CacheKeyError> {
        decode_location(&self.location_hash)
    }

    /// Name of the compressed cache entry: `osm-<key>.xml.zip`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{CACHE_FILE_PREFIX}{self}{ARCHIVE_SUFFIX}")
    }

    /// Name of the decompressed working copy: `osm-<key>.xml`.
    #[must_use]
    pub fn working_file_name(&self) -> String {
        format!("{CACHE_FILE_PREFIX}{self}{DOCUMENT_SUFFIX}")
    }

    /// Parse the textual form `<location>-<entities>`.
    ///
    /// The location hash has a fixed width, so the `-` that base64url may
    /// place inside it never confuses the split.
    pub fn parse(text: &str) -> Result<Self, CacheKeyError> {
        let malformed = || CacheKeyError::Malformed {
            text: text.to_owned(),
        };
        let location_hash = text.get(..LOCATION_HASH_LEN).ok_or_else(malformed)?;
        let entity_hash = text
            .get(LOCATION_HASH_LEN..)
            .and_then(|rest| rest.strip_prefix('-'))
            .filter(|rest| !rest.is_empty())
            .ok_or_else(malformed)?;
        decode_location(location_hash)?;
        Ok(Self {
            location_hash: location_hash.to_owned(),
            entity_hash: entity_hash.to_owned(),
            is_full_dataset: entity_hash == FULL_DATASET_TOKEN,
        })
    }

    /// Parse a cache entry or working copy file name.
    pub fn from_file_name(name: &str) -> Result<Self, CacheKeyError> {
        let stem = name
            .strip_prefix(CACHE_FILE_PREFIX)
            .and_then(|rest| {
                rest.strip_suffix(ARCHIVE_SUFFIX)
                    .or_else(|| rest.strip_suffix(DOCUMENT_SUFFIX))
            })
            .ok_or_else(|| CacheKeyError::Malformed {
                text: name.to_owned(),
            })?;
        Self::parse(stem)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.location_hash, self.entity_hash)
    }
}

/// Builds [`CacheKey`] values with an injected [`DigestFunction`].
#[derive(Debug, Clone)]
pub struct CacheKeyDeriver<D = Xxh3Digest> {
    digest: D,
}

impl Default for CacheKeyDeriver<Xxh3Digest> {
    fn default() -> Self {
        Self::new(Xxh3Digest)
    }
}

impl<D: DigestFunction> CacheKeyDeriver<D> {
    /// Create a deriver using `digest` for the entity hash.
    pub const fn new(digest: D) -> Self {
        Self { digest }
    }

    /// Key for a fetch filtered by `defs`.
    pub fn derive(&self, area: &GeoArea, defs: &[EntityDef]) -> Result<CacheKey, CacheKeyError> {
        Ok(CacheKey {
            location_hash: encode_location(area)?,
            entity_hash: self.entity_hash(defs),
            is_full_dataset: false,
        })
    }

    /// Key for an unfiltered fetch of everything inside `area`.
    pub fn derive_full(&self, area: &GeoArea) -> Result<CacheKey, CacheKeyError> {
        Ok(CacheKey {
            location_hash: encode_location(area)?,
            entity_hash: FULL_DATASET_TOKEN.to_owned(),
            is_full_dataset: true,
        })
    }

    /// Key for either kind of fetch; `None` means unfiltered.
    pub fn derive_for(
        &self,
        area: &GeoArea,
        defs: Option<&[EntityDef]>,
    ) -> Result<CacheKey, CacheKeyError> {
        match defs {
            Some(defs) => self.derive(area, defs),
            None => self.derive_full(area),
        }
    }

    /// Order-sensitive digest of the definitions' selection rules.
    ///
    /// Each definition contributes the 64-bit identity of its selection bytes;
    /// the identity sequence is digested again and truncated to
    /// [`ENTITY_HASH_BYTES`].
    #[must_use]
    pub fn entity_hash(&self, defs: &[EntityDef]) -> String {
        let mut identities = Vec::with_capacity(defs.len() * 8);
        for def in defs {
            let identity = self.digest.digest128(&def.selection_bytes()) as u64;
            identities.extend_from_slice(&identity.to_be_bytes());
        }
        let digest = self.digest.digest128(&identities).to_be_bytes();
        let (prefix, _) = digest.split_at(ENTITY_HASH_BYTES);
        URL_SAFE_LENIENT.encode(prefix)
    }
}
