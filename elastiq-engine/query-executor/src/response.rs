use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// The raw response of a search request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: Hits,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<Aggregations>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Hits {
    #[serde(default)]
    pub hits: Vec<Hit>,
}

/// A single returned document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hit {
    #[serde(rename = "_id", default)]
    pub id: String,

    #[serde(rename = "_source", default)]
    pub source: JsonValue,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Aggregations {
    pub composite: CompositeResult,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompositeResult {
    /// Set when more buckets than the returned page are available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_key: Option<Map<String, JsonValue>>,

    #[serde(default)]
    pub buckets: Vec<Bucket>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bucket {
    /// The bucket's source values keyed by source name.
    pub key: Map<String, JsonValue>,

    #[serde(default)]
    pub doc_count: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_composite: Option<TopHits>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopHits {
    #[serde(default)]
    pub hits: Hits,
}

/// The raw response of a count request.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_deserialize_grouped_response() -> Result<()> {
        let response: SearchResponse = serde_json::from_value(json!({
            "took": 3,
            "hits": { "total": { "value": 2 }, "hits": [] },
            "aggregations": {
                "composite": {
                    "after_key": { "group_by_Age": 4 },
                    "buckets": [
                        {
                            "key": { "group_by_Age": 4 },
                            "doc_count": 2,
                            "data_composite": {
                                "hits": { "hits": [
                                    { "_id": "a", "_source": { "age": 4 } },
                                    { "_id": "b", "_source": { "age": 4 } },
                                ] }
                            }
                        }
                    ]
                }
            }
        }))?;

        let composite = response.aggregations.map(|a| a.composite).unwrap_or_default();
        assert!(composite.after_key.is_some());
        assert_eq!(composite.buckets.len(), 1);
        assert_eq!(composite.buckets[0].doc_count, 2);
        assert_eq!(
            composite.buckets[0]
                .data_composite
                .as_ref()
                .map(|top| top.hits.hits.len()),
            Some(2)
        );

        Ok(())
    }
}
