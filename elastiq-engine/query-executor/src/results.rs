use serde::de::DeserializeOwned;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value as JsonValue;

/// The key of one group, ordered the same way as the group-by properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupKey(Vec<(String, JsonValue)>);

impl GroupKey {
    pub(crate) fn new(entries: Vec<(String, JsonValue)>) -> Self {
        Self(entries)
    }

    /// The raw value of the given group-by property.
    pub fn get(&self, property: &str) -> Option<&JsonValue> {
        self.0
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value)
    }

    /// Decodes the value of the given group-by property.
    pub fn decode<K: DeserializeOwned>(&self, property: &str) -> Result<Option<K>, serde_json::Error> {
        self.get(property)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for GroupKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in self.0.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// One group of a grouped result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grouping<D> {
    pub key: GroupKey,
    pub members: Vec<D>,
}

/// The materialized result of a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExecutionResult<D> {
    /// Every matching record.
    Collection(Vec<D>),

    /// A single record, `None` when nothing matched and that was allowed.
    Single(Option<D>),

    /// The number of matching documents.
    Count(u64),

    /// The matching records grouped by their group key.
    Grouped(Vec<Grouping<D>>),
}
