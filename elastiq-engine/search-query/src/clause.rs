use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value as JsonValue};

/// The expansion bound used for phrase-prefix matching.
pub const PHRASE_PREFIX_MAX_EXPANSIONS: u32 = 200;

/// One backend-native query fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Matches every document.
    MatchAll,

    /// Matches no documents.
    MatchNone,

    /// The field must contain exactly the given value.
    Term { field: String, value: JsonValue },

    /// The field must contain at least one of the given values.
    Terms { field: String, values: Vec<JsonValue> },

    /// The field must be within the given bounds.
    Range { field: String, bounds: RangeBounds },

    /// The analyzed field must contain the given phrase.
    MatchPhrase { field: String, query: String },

    /// A query expressed in the backend's query string syntax.
    QueryString { fields: Vec<String>, query: String },

    /// A match query run across one or more fields.
    MultiMatch {
        fields: Vec<String>,
        query: String,
        kind: MultiMatchKind,
        max_expansions: Option<u32>,
    },

    /// The field must be present and non-null.
    Exists { field: String },

    /// A boolean combination of other clauses.
    Bool(BoolClause),
}

impl Clause {
    /// All of the given clauses must match.
    pub fn must(clauses: Vec<Clause>) -> Self {
        Self::Bool(BoolClause {
            must: clauses,
            ..BoolClause::default()
        })
    }

    /// None of the given clauses may match.
    pub fn must_not(clauses: Vec<Clause>) -> Self {
        Self::Bool(BoolClause {
            must_not: clauses,
            ..BoolClause::default()
        })
    }

    /// At least one of the given clauses must match.
    pub fn should(clauses: Vec<Clause>) -> Self {
        Self::Bool(BoolClause {
            should: clauses,
            ..BoolClause::default()
        })
    }

    /// The backend's name for this kind of clause.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::MatchAll => "match_all",
            Self::MatchNone => "match_none",
            Self::Term { .. } => "term",
            Self::Terms { .. } => "terms",
            Self::Range { .. } => "range",
            Self::MatchPhrase { .. } => "match_phrase",
            Self::QueryString { .. } => "query_string",
            Self::MultiMatch { .. } => "multi_match",
            Self::Exists { .. } => "exists",
            Self::Bool(_) => "bool",
        }
    }

    /// Renders the clause in the backend's query syntax.
    pub fn to_json(&self) -> JsonValue {
        let body = match self {
            Self::MatchAll | Self::MatchNone => json!({}),
            Self::Term { field, value } => json!({ field.as_str(): { "value": value } }),
            Self::Terms { field, values } => json!({ field.as_str(): values }),
            Self::Range { field, bounds } => json!({ field.as_str(): bounds.to_json() }),
            Self::MatchPhrase { field, query } => {
                json!({ field.as_str(): { "query": query } })
            },
            Self::QueryString { fields, query } => {
                json!({ "fields": fields, "query": query })
            },
            Self::MultiMatch {
                fields,
                query,
                kind,
                max_expansions,
            } => {
                let mut body = json!({
                    "fields": fields,
                    "query": query,
                    "type": kind.as_str(),
                });
                if let Some(limit) = max_expansions {
                    body["max_expansions"] = json!(limit);
                }
                body
            },
            Self::Exists { field } => json!({ "field": field }),
            Self::Bool(inner) => inner.to_json(),
        };

        let mut outer = Map::with_capacity(1);
        outer.insert(self.kind_name().to_string(), body);
        JsonValue::Object(outer)
    }
}

impl Serialize for Clause {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

/// The occurrence lists of a `bool` clause.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoolClause {
    pub must: Vec<Clause>,
    pub must_not: Vec<Clause>,
    pub should: Vec<Clause>,
}

impl BoolClause {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.must_not.is_empty() && self.should.is_empty()
    }

    fn to_json(&self) -> JsonValue {
        let mut body = Map::new();
        if !self.must.is_empty() {
            body.insert("must".to_string(), json!(self.must));
        }

        if !self.must_not.is_empty() {
            body.insert("must_not".to_string(), json!(self.must_not));
        }

        if !self.should.is_empty() {
            body.insert("should".to_string(), json!(self.should));

            // Once `must` or `must_not` are present the backend treats
            // `should` as optional.
            if !self.must.is_empty() || !self.must_not.is_empty() {
                body.insert("minimum_should_match".to_string(), json!(1));
            }
        }

        JsonValue::Object(body)
    }
}

/// The bounds of a `range` clause.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeBounds {
    pub gt: Option<JsonValue>,
    pub gte: Option<JsonValue>,
    pub lt: Option<JsonValue>,
    pub lte: Option<JsonValue>,
}

impl RangeBounds {
    /// Bounds matching exactly the given value.
    pub fn exactly(value: JsonValue) -> Self {
        Self {
            gte: Some(value.clone()),
            lte: Some(value),
            ..Self::default()
        }
    }

    fn to_json(&self) -> JsonValue {
        let mut body = Map::new();
        let bounds = [
            ("gt", &self.gt),
            ("gte", &self.gte),
            ("lt", &self.lt),
            ("lte", &self.lte),
        ];

        for (name, bound) in bounds.iter() {
            if let Some(value) = bound {
                body.insert(name.to_string(), value.clone());
            }
        }

        JsonValue::Object(body)
    }
}

/// The matching strategy of a `multi_match` clause.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MultiMatchKind {
    /// The terms must appear in order, the last one as a prefix.
    PhrasePrefix,
}

impl MultiMatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PhrasePrefix => "phrase_prefix",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_omits_empty_lists() {
        let clause = Clause::must_not(vec![Clause::Exists {
            field: "folderId".into(),
        }]);

        assert_eq!(
            clause.to_json(),
            json!({ "bool": { "must_not": [ { "exists": { "field": "folderId" } } ] } })
        );
    }

    #[test]
    fn test_mixed_bool_requires_a_should_match() {
        let clause = Clause::Bool(BoolClause {
            must: vec![Clause::MatchAll],
            should: vec![Clause::MatchNone],
            ..BoolClause::default()
        });

        assert_eq!(
            clause.to_json(),
            json!({ "bool": {
                "must": [ { "match_all": {} } ],
                "should": [ { "match_none": {} } ],
                "minimum_should_match": 1,
            } })
        );
    }

    #[test]
    fn test_leaf_rendering() {
        let range = Clause::Range {
            field: "age".into(),
            bounds: RangeBounds {
                gt: Some(json!(3)),
                ..RangeBounds::default()
            },
        };
        assert_eq!(range.to_json(), json!({ "range": { "age": { "gt": 3 } } }));

        let multi = Clause::MultiMatch {
            fields: vec!["name".into()],
            query: "hello wor".into(),
            kind: MultiMatchKind::PhrasePrefix,
            max_expansions: Some(PHRASE_PREFIX_MAX_EXPANSIONS),
        };
        assert_eq!(
            multi.to_json(),
            json!({ "multi_match": {
                "fields": ["name"],
                "query": "hello wor",
                "type": "phrase_prefix",
                "max_expansions": 200,
            } })
        );

        let terms = Clause::Terms {
            field: "typeId".into(),
            values: vec![json!("a"), json!("b")],
        };
        assert_eq!(terms.to_json(), json!({ "terms": { "typeId": ["a", "b"] } }));
    }
}
