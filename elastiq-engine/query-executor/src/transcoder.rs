use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

/// Converts raw backend values into typed records.
///
/// The same transcoder decodes whole documents, projected values
/// and the individual values of group keys.
pub trait Transcoder<T> {
    fn decode(&self, raw: JsonValue) -> Result<T, serde_json::Error>;
}

/// Decodes records through their `Deserialize` implementation.
pub struct SerdeTranscoder<T>(PhantomData<fn() -> T>);

impl<T> Default for SerdeTranscoder<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T: DeserializeOwned> Transcoder<T> for SerdeTranscoder<T> {
    #[inline]
    fn decode(&self, raw: JsonValue) -> Result<T, serde_json::Error> {
        serde_json::from_value(raw)
    }
}

impl<T, F> Transcoder<T> for F
where
    F: Fn(JsonValue) -> Result<T, serde_json::Error>,
{
    #[inline]
    fn decode(&self, raw: JsonValue) -> Result<T, serde_json::Error> {
        (self)(raw)
    }
}
