use anyhow::{anyhow, Context, Result};
use hyper::client::HttpConnector;
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Client, Method, Request};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::runtime::{Builder, Runtime};

use crate::request::{CountRequest, SearchRequest};
use crate::response::{CountResponse, SearchResponse};
use crate::transport::Transport;

/// A blocking transport talking to the backend's HTTP API.
pub struct HttpTransport {
    base_url: String,
    client: Client<HttpConnector>,
    runtime: Runtime,
}

impl HttpTransport {
    /// Creates a new transport for the given base url,
    /// e.g. `http://127.0.0.1:9200`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to build the transport runtime")?;

        let base_url = base_url.into();
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            runtime,
        })
    }

    #[instrument(name = "http-request", level = "debug", skip(self, body))]
    fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let uri = format!("{}/{}", self.base_url, path);
        let body = serde_json::to_vec(body)?;

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri.as_str())
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .with_context(|| format!("invalid request uri {:?}", uri))?;

        let (status, body) = self.runtime.block_on(async {
            let response = self.client.request(request).await?;
            let status = response.status();
            let body = hyper::body::to_bytes(response.into_body()).await?;

            Ok::<_, hyper::Error>((status, body))
        })?;

        if !status.is_success() {
            return Err(anyhow!(
                "backend responded with {}: {}",
                status,
                String::from_utf8_lossy(&body)
            ));
        }

        serde_json::from_slice(&body).context("failed to deserialize the backend response")
    }
}

impl Transport for HttpTransport {
    fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        self.post(&format!("{}/_search", request.index), request)
    }

    fn count(&self, request: &CountRequest) -> Result<u64> {
        let response: CountResponse = self.post(&format!("{}/_count", request.index), request)?;
        Ok(response.count)
    }
}
