//! Tag predicates compiled from [`EntityDef`] selection rules.

use regex::Regex;
use thiserror::Error;

use crate::{EntityDef, EntityKind, RawEntity, Tags, ValueMatch};

/// Errors raised while compiling a [`TagMatcher`].
#[derive(Debug, Error)]
pub enum MatcherError {
    /// The definition's regular expression did not compile.
    #[error("invalid pattern {pattern:?} for tag {key:?}: {source}")]
    InvalidPattern {
        /// Tag key the pattern applies to.
        key: String,
        /// Pattern as supplied.
        pattern: String,
        /// Compilation failure.
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone)]
enum CompiledValue {
    Any,
    Exact(String),
    Regex(Regex),
}

impl CompiledValue {
    fn accepts(&self, value: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => expected == value,
            Self::Regex(pattern) => pattern.is_match(value),
        }
    }
}

/// Predicate testing whether an entity satisfies one [`EntityDef`].
///
/// An entity matches when its kind is the definition's source kind and its
/// tag under the definition's key has an accepted value. Regular expressions
/// search the value rather than matching it entirely.
///
/// # Examples
/// ```
/// use tiletex_core::{EntityDef, EntityKind, Rgba, Tags, TagMatcher, ValueMatch};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let def = EntityDef::polyline("highway", ValueMatch::Exact("primary".into()), Rgba::BLACK, 1.0)?;
/// let matcher = TagMatcher::new(&def)?;
/// let tags = Tags::from([("highway".to_owned(), "primary".to_owned())]);
/// assert!(matcher.matches_tags(EntityKind::Way, &tags));
/// assert!(!matcher.matches_tags(EntityKind::Point, &tags));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TagMatcher {
    kind: EntityKind,
    key: String,
    value: CompiledValue,
}

impl TagMatcher {
    /// Compile the selection rule of `def`.
    pub fn new(def: &EntityDef) -> Result<Self, MatcherError> {
        let value = match def.value() {
            ValueMatch::Any => CompiledValue::Any,
            ValueMatch::Exact(expected) => CompiledValue::Exact(expected.clone()),
            ValueMatch::Regex(pattern) => {
                let compiled =
                    Regex::new(pattern).map_err(|source| MatcherError::InvalidPattern {
                        key: def.key().to_owned(),
                        pattern: pattern.clone(),
                        source,
                    })?;
                CompiledValue::Regex(compiled)
            }
        };
        Ok(Self {
            kind: def.kind().source_kind(),
            key: def.key().to_owned(),
            value,
        })
    }

    /// Entity kind this matcher accepts.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Test a borrowed entity.
    #[must_use]
    pub fn matches(&self, entity: &RawEntity<'_>) -> bool {
        self.matches_tags(entity.kind(), entity.tags())
    }

    /// Test an entity given its kind and tags.
    #[must_use]
    pub fn matches_tags(&self, kind: EntityKind, tags: &Tags) -> bool {
        kind == self.kind
            && tags
                .get(&self.key)
                .is_some_and(|value| self.value.accepts(value))
    }
}
