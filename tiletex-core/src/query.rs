//! Overpass QL query construction.
//!
//! A query is a union of one clause per [`EntityDef`], each scoped to the
//! bounding box, followed by a recursion step that pulls in the nodes ways
//! depend on and a request for metadata output:
//!
//! ```text
//! (way["highway"="primary"](48.000000,11.000000,48.010000,11.010000););(._;>;);out meta;
//! ```

use crate::{EntityDef, EntityKind, GeoArea, ValueMatch};

const RECURSE_AND_PRINT: &str = "(._;>;);out meta;";

/// Renders [`EntityDef`] lists into Overpass QL.
///
/// # Examples
/// ```
/// use tiletex_core::{EntityDef, GeoArea, QueryBuilder, Rgba, ValueMatch};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let area = GeoArea::new(48.0, 11.0, 48.01, 11.01)?;
/// let defs = [EntityDef::point("amenity", ValueMatch::Any, Rgba::BLACK, 2.0)?];
/// let query = QueryBuilder::new(&area).build(&defs);
/// assert_eq!(
///     query,
///     "(node[\"amenity\"](48.000000,11.000000,48.010000,11.010000););(._;>;);out meta;"
/// );
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    bounds: String,
}

impl QueryBuilder {
    /// Create a builder scoped to `area`.
    #[must_use]
    pub fn new(area: &GeoArea) -> Self {
        Self {
            bounds: area.bounds_token(),
        }
    }

    /// Query selecting what `defs` select, clauses in declaration order.
    #[must_use]
    pub fn build(&self, defs: &[EntityDef]) -> String {
        let mut query = String::from("(");
        for def in defs {
            self.push_clause(&mut query, def);
        }
        query.push(')');
        query.push(';');
        query.push_str(RECURSE_AND_PRINT);
        query
    }

    /// Query selecting every node and way in the box.
    #[must_use]
    pub fn build_full(&self) -> String {
        format!(
            "(node({bounds});way({bounds}););{RECURSE_AND_PRINT}",
            bounds = self.bounds
        )
    }

    /// Dispatch on the filter's presence; `None` selects everything.
    #[must_use]
    pub fn build_for(&self, defs: Option<&[EntityDef]>) -> String {
        defs.map_or_else(|| self.build_full(), |defs| self.build(defs))
    }

    fn push_clause(&self, query: &mut String, def: &EntityDef) {
        let element = match def.kind().source_kind() {
            EntityKind::Point => "node",
            EntityKind::Way => "way",
        };
        let key = escape(def.key());
        let selector = match def.value() {
            ValueMatch::Any => format!("{element}[\"{key}\"]"),
            ValueMatch::Exact(value) => format!("{element}[\"{key}\"=\"{}\"]", escape(value)),
            ValueMatch::Regex(pattern) => {
                format!("{element}[\"{key}\"~\"{}\"]", escape(pattern))
            }
        };
        query.push_str(&selector);
        query.push('(');
        query.push_str(&self.bounds);
        query.push_str(");");
    }
}

/// Escape `raw` for embedding inside a double-quoted Overpass QL string.
#[must_use]
pub fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            '"' => escaped.push_str("\\\""),
            '\'' => escaped.push_str("\\'"),
            '\\' => escaped.push_str("\\\\"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Rgba;
    use rstest::{fixture, rstest};

    const BOUNDS: &str = "(48.000000,11.000000,48.010000,11.010000)";

    #[fixture]
    fn builder() -> QueryBuilder {
        let area = GeoArea::new(48.0, 11.0, 48.01, 11.01).expect("valid area");
        QueryBuilder::new(&area)
    }

    #[rstest]
    fn clauses_follow_declaration_order(builder: QueryBuilder) {
        let defs = [
            EntityDef::polygon(
                "landuse",
                ValueMatch::Exact("forest".into()),
                Rgba::BLACK,
                1.0,
            )
            .expect("valid def"),
            EntityDef::polyline(
                "highway",
                ValueMatch::Regex("^(primary|secondary)$".into()),
                Rgba::BLACK,
                1.0,
            )
            .expect("valid def"),
            EntityDef::point("amenity", ValueMatch::Any, Rgba::BLACK, 1.0).expect("valid def"),
        ];
        let expected = format!(
            "(way[\"landuse\"=\"forest\"]{BOUNDS};\
             way[\"highway\"~\"^(primary|secondary)$\"]{BOUNDS};\
             node[\"amenity\"]{BOUNDS};);(._;>;);out meta;"
        );
        assert_eq!(builder.build(&defs), expected);
    }

    #[rstest]
    fn full_query_selects_nodes_and_ways(builder: QueryBuilder) {
        assert_eq!(
            builder.build_full(),
            format!("(node{BOUNDS};way{BOUNDS};);(._;>;);out meta;")
        );
        assert_eq!(builder.build_for(None), builder.build_full());
    }

    #[rstest]
    fn empty_definition_list_is_an_empty_union(builder: QueryBuilder) {
        assert_eq!(builder.build(&[]), "();(._;>;);out meta;");
    }

    #[rstest]
    #[case("plain", "plain")]
    #[case("a\"b", "a\\\"b")]
    #[case("it's", "it\\'s")]
    #[case("line\nbreak\ttab", "line\\nbreak\\ttab")]
    #[case("\\d+", "\\\\d+")]
    fn escapes_special_characters(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(escape(raw), expected);
    }

    #[rstest]
    fn escapes_keys_and_values(builder: QueryBuilder) {
        let def = EntityDef::point(
            "name:\"en\"",
            ValueMatch::Exact("O'Brien\\".into()),
            Rgba::BLACK,
            1.0,
        )
        .expect("valid def");
        let query = builder.build(&[def]);
        assert!(query.starts_with("(node[\"name:\\\"en\\\"\"=\"O\\'Brien\\\\\"]"));
    }
}
