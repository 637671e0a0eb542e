//! HTTP client implementation

use std::time::Duration;

use http::Method;
use reqwest::{header, Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::errors::ApiError;
use openapi_client::models::ApiResponse;

const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// HTTP client for the SQD cloud API
pub struct HttpClient {
    client: Client,
    stream_client: Client,
    base_url: Url,
    token: Option<SecretString>,
}

impl HttpClient {
    /// Create a new HTTP client
    ///
    /// Regular requests time out after 30 seconds. Log streams have no client
    /// side timeout; the server closes idle streams itself.
    pub fn new(base_url: &str, token: Option<SecretString>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let stream_client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            client,
            stream_client,
            base_url,
            token,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an API url from path segments and query parameters
    pub fn url<S: AsRef<str>>(
        &self,
        segments: &[S],
        query: &[(String, String)],
    ) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments.iter().map(AsRef::as_ref));
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Make a GET request and unwrap the response payload
    ///
    /// Returns `None` when the server answers without a payload.
    pub async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>, ApiError> {
        let request = self.authorize(self.client.get(url.clone()), &url);
        let response = check_status(Method::GET, &url, request.send().await?).await?;

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        let envelope: ApiResponse<T> = serde_json::from_str(&body)?;
        Ok(envelope.payload)
    }

    /// Open a long-lived GET response whose body is read incrementally
    pub async fn get_stream(&self, url: Url) -> Result<Response, ApiError> {
        let request = self
            .authorize(self.stream_client.get(url.clone()), &url)
            .header(header::ACCEPT, "application/x-ndjson");
        check_status(Method::GET, &url, request.send().await?).await
    }

    fn authorize(&self, request: RequestBuilder, url: &Url) -> RequestBuilder {
        let request_id = Uuid::new_v4();
        debug!("GET {} ({})", url, request_id);

        let request = request.header(REQUEST_ID_HEADER, request_id.to_string());
        match &self.token {
            Some(token) => request.header(
                header::AUTHORIZATION,
                format!("token {}", token.expose_secret()),
            ),
            None => request,
        }
    }
}

async fn check_status(method: Method, url: &Url, response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    debug!("HTTP {} {} failed: {} - {}", method, url, status, body);
    Err(ApiError::status(method, url.path(), status, body))
}
