use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::json;

use search_query::{Clause, Sort};

/// The largest window of results the backend serves without paging.
pub const DEFAULT_MAX_RESULT_WINDOW: usize = 10_000;

/// The prefix given to every composite aggregation source.
pub static GROUP_SOURCE_PREFIX: &str = "group_by_";

/// The name of the composite aggregation.
pub static COMPOSITE_AGGREGATION: &str = "composite";

/// The name of the per-bucket top hits aggregation.
pub static BUCKET_HITS_AGGREGATION: &str = "data_composite";

/// A complete search request against one index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    /// The index the request targets, this is part of the request path.
    #[serde(skip)]
    pub index: String,

    pub query: Clause,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<usize>,

    pub size: usize,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortField>,

    #[serde(rename = "_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceFilter>,

    #[serde(
        rename = "aggregations",
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_aggregations"
    )]
    pub aggregation: Option<CompositeAggregation>,
}

/// A count request, only the filter is relevant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountRequest {
    #[serde(skip)]
    pub index: String,

    pub query: Clause,
}

/// One entry of the sort list.
#[derive(Debug, Clone, PartialEq)]
pub struct SortField {
    pub field: String,
    pub sort: Sort,
}

impl Serialize for SortField {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.field, &json!({ "order": self.sort.as_str() }))?;
        map.end()
    }
}

/// Restricts the returned document source to the given fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceFilter {
    pub includes: Vec<String>,
}

/// A composite aggregation bucketing documents by one or more fields,
/// with the top hits of every bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeAggregation {
    pub sources: Vec<CompositeSource>,

    /// The number of buckets per page, the backend default when unset.
    pub size: Option<usize>,

    /// The number of documents fetched per bucket, the backend
    /// default when unset.
    pub hits_size: Option<usize>,

    /// The order of the documents within every bucket.
    pub sort: Vec<SortField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeSource {
    /// The source name, this is the group property prefixed
    /// with [`GROUP_SOURCE_PREFIX`].
    pub name: String,

    /// The field the source reads its values from.
    pub field: String,
}

impl CompositeSource {
    pub fn new(property: &str, field: String) -> Self {
        Self {
            name: format!("{}{}", GROUP_SOURCE_PREFIX, property),
            field,
        }
    }
}

impl Serialize for CompositeAggregation {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sources: Vec<_> = self
            .sources
            .iter()
            .map(|source| json!({ source.name.as_str(): { "terms": { "field": source.field } } }))
            .collect();

        let mut composite = json!({ "sources": sources });
        if let Some(size) = self.size {
            composite["size"] = json!(size);
        }

        let mut top_hits = json!({});
        if let Some(size) = self.hits_size {
            top_hits["size"] = json!(size);
        }
        if !self.sort.is_empty() {
            top_hits["sort"] = json!(self.sort);
        }

        json!({
            "composite": composite,
            "aggregations": {
                BUCKET_HITS_AGGREGATION: { "top_hits": top_hits },
            },
        })
        .serialize(serializer)
    }
}

fn serialize_aggregations<S>(
    aggregation: &Option<CompositeAggregation>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry(COMPOSITE_AGGREGATION, aggregation)?;
    map.end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_request_body() {
        let request = SearchRequest {
            index: "people".into(),
            query: Clause::MatchAll,
            from: Some(5),
            size: 10,
            sort: vec![SortField {
                field: "name.keyword".into(),
                sort: Sort::Desc,
            }],
            source: Some(SourceFilter {
                includes: vec!["name".into()],
            }),
            aggregation: None,
        };

        assert_eq!(
            serde_json::to_value(&request).ok(),
            Some(json!({
                "query": { "match_all": {} },
                "from": 5,
                "size": 10,
                "sort": [ { "name.keyword": { "order": "desc" } } ],
                "_source": { "includes": ["name"] },
            }))
        );
    }

    #[test]
    fn test_composite_aggregation_body() {
        let request = SearchRequest {
            index: "people".into(),
            query: Clause::MatchAll,
            from: None,
            size: 0,
            sort: vec![],
            source: None,
            aggregation: Some(CompositeAggregation {
                sources: vec![CompositeSource::new("Age", "age".into())],
                size: Some(50),
                hits_size: None,
                sort: vec![],
            }),
        };

        assert_eq!(
            serde_json::to_value(&request).ok(),
            Some(json!({
                "query": { "match_all": {} },
                "size": 0,
                "aggregations": {
                    "composite": {
                        "composite": {
                            "sources": [ { "group_by_Age": { "terms": { "field": "age" } } } ],
                            "size": 50,
                        },
                        "aggregations": {
                            "data_composite": { "top_hits": {} },
                        },
                    },
                },
            }))
        );
    }

    #[test]
    fn test_bucket_hits_sort() {
        let aggregation = CompositeAggregation {
            sources: vec![CompositeSource::new("Age", "age".into())],
            size: None,
            hits_size: Some(5),
            sort: vec![SortField {
                field: "id".into(),
                sort: Sort::Desc,
            }],
        };

        assert_eq!(
            serde_json::to_value(&aggregation).ok(),
            Some(json!({
                "composite": {
                    "sources": [ { "group_by_Age": { "terms": { "field": "age" } } } ],
                },
                "aggregations": {
                    "data_composite": { "top_hits": {
                        "size": 5,
                        "sort": [ { "id": { "order": "desc" } } ],
                    } },
                },
            }))
        );
    }
}
