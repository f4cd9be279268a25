use anyhow::Result;

use crate::request::{CountRequest, SearchRequest};
use crate::response::SearchResponse;

/// The backend client a query is executed through.
///
/// Implementations own retries, timeouts and connection handling,
/// any failure is returned unchanged to the caller of the executor.
pub trait Transport {
    fn search(&self, request: &SearchRequest) -> Result<SearchResponse>;

    fn count(&self, request: &CountRequest) -> Result<u64>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        (**self).search(request)
    }

    fn count(&self, request: &CountRequest) -> Result<u64> {
        (**self).count(request)
    }
}
