use search_query::QueryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("{0}")]
    Query(#[from] QueryError),

    #[error("the search backend rejected the request: {0:#}")]
    Transport(anyhow::Error),

    #[error("the query returned no results")]
    NotFound,

    #[error("expected a single result but the query returned {0}")]
    MultipleResults(usize),

    #[error("failed to decode the returned document: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("the count {count} cannot be represented as a {target}")]
    CountOutOfRange { count: u64, target: &'static str },
}
