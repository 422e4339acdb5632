//! Reversible bit-packed encoding of a [`GeoArea`].
//!
//! Each bound is scaled by [`LOCATION_MULTIPLIER`], rounded and stored as an
//! 18-bit two's-complement field. The four fields (min lat, min lon, max lat,
//! max lon, most significant first) fill exactly 72 bits, i.e. nine bytes,
//! which base64url-encode to twelve characters without padding.
//!
//! The quantisation step is `1 / 728` degree, roughly 150 m of latitude.
//! Areas whose bounds round to the same fields share a location hash, and
//! hence a cache entry: a request for one is answered with the document
//! fetched for the other.

use base64::Engine as _;

use super::{CacheKeyError, URL_SAFE_LENIENT};
use crate::GeoArea;

/// Scale applied to degrees before quantisation.
///
/// The largest integer `m` with `180 * m` inside the signed 18-bit range.
pub const LOCATION_MULTIPLIER: f64 = 728.0;

/// Width of each packed coordinate field, sign bit included.
pub const FIELD_BITS: u32 = 18;

/// Length in characters of an encoded location hash.
pub const LOCATION_HASH_LEN: usize = 12;

const FIELD_COUNT: u32 = 4;
const PACKED_BYTES: usize = 9;
const FIELD_MASK: u128 = (1 << FIELD_BITS) - 1;
const SIGN_BIT: u128 = 1 << (FIELD_BITS - 1);
const FIELD_MAX: i64 = (1 << (FIELD_BITS - 1)) - 1;
const FIELD_MIN: i64 = -(1 << (FIELD_BITS - 1));

/// Encode `area` into its location hash.
pub fn encode_location(area: &GeoArea) -> Result<String, CacheKeyError> {
    let mut packed: u128 = 0;
    for value in [area.min_lat(), area.min_lon(), area.max_lat(), area.max_lon()] {
        let field = quantise(value)?;
        packed = (packed << FIELD_BITS) | (to_twos_complement(field) & FIELD_MASK);
    }
    let wide = packed.to_be_bytes();
    let (_, tail) = wide.split_at(wide.len() - PACKED_BYTES);
    Ok(URL_SAFE_LENIENT.encode(tail))
}

/// Recover the [`GeoArea`] encoded in `hash`.
///
/// The result matches the original bounds to within half a quantisation step
/// (`0.5 / LOCATION_MULTIPLIER` degrees).
pub fn decode_location(hash: &str) -> Result<GeoArea, CacheKeyError> {
    let bytes = URL_SAFE_LENIENT
        .decode(hash)
        .map_err(|source| CacheKeyError::LocationEncoding {
            hash: hash.to_owned(),
            source,
        })?;
    if bytes.len() != PACKED_BYTES {
        return Err(CacheKeyError::LocationLength {
            expected: PACKED_BYTES,
            found: bytes.len(),
        });
    }
    let packed = bytes
        .iter()
        .fold(0_u128, |acc, byte| (acc << 8) | u128::from(*byte));

    let mut bounds = [0.0_f64; 4];
    for (slot, bound) in (0..FIELD_COUNT).rev().zip(bounds.iter_mut()) {
        let raw = (packed >> (slot * FIELD_BITS)) & FIELD_MASK;
        *bound = dequantise(from_twos_complement(raw));
    }
    let [min_lat, min_lon, max_lat, max_lon] = bounds;
    GeoArea::new(min_lat, min_lon, max_lat, max_lon).map_err(|source| {
        CacheKeyError::DecodedArea {
            hash: hash.to_owned(),
            source,
        }
    })
}

fn quantise(value: f64) -> Result<i64, CacheKeyError> {
    let scaled = (value * LOCATION_MULTIPLIER).round();
    let in_range = scaled.is_finite()
        && scaled >= FIELD_MIN as f64
        && scaled <= FIELD_MAX as f64;
    if !in_range {
        return Err(CacheKeyError::CoordinateOutOfRange {
            value,
            bits: FIELD_BITS,
        });
    }
    Ok(scaled as i64)
}

fn dequantise(field: i64) -> f64 {
    field as f64 / LOCATION_MULTIPLIER
}

const fn to_twos_complement(field: i64) -> u128 {
    field as u128
}

/// `raw` must already be masked to [`FIELD_BITS`].
const fn from_twos_complement(raw: u128) -> i64 {
    let value = raw as i64;
    if raw & SIGN_BIT == 0 {
        value
    } else {
        value - (1 << FIELD_BITS)
    }
}
