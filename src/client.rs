use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method, StatusCode, Uri};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::ClientResult;
use crate::config::ShortenerConfig;
use crate::error::ClientError;
use crate::logging::LoggingInterceptor;
use crate::request::OutboundRequest;
use crate::retry::{RetryInterceptor, RetryPolicy};
use crate::transport::{HttpTransport, Transport};
use crate::util::{resolve_base_uri, truncate_body};

const OP_SHORTEN_URL: &str = "clients.shorten_url";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_MAX_RETRIES: usize = 3;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShortenRequest {
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub alias: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortenResponse {
    pub url: String,
    pub alias: String,
}

pub struct ShortenerClientBuilder {
    base_url: String,
    timeout: Duration,
    max_retries: usize,
    retry_policy: Option<RetryPolicy>,
    transport: Option<Arc<dyn Transport>>,
}

impl ShortenerClientBuilder {
    pub(crate) fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_policy: None,
            transport: None,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.max(Duration::from_millis(1));
        self
    }

    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = Some(retry_policy);
        self
    }

    /// Replaces the platform transport at the bottom of the chain. Intended
    /// for tests and for callers that tune their own connector.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn try_build(self) -> ClientResult<ShortenerClient> {
        let base_uri = resolve_base_uri(&self.base_url)?;
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(self.timeout)?),
        };
        let policy = self
            .retry_policy
            .unwrap_or_else(|| RetryPolicy::new(self.max_retries, self.timeout));

        // Retry wraps logging so every individual attempt gets its own
        // start/finish record.
        let chain: Arc<dyn Transport> = Arc::new(RetryInterceptor::new(
            policy,
            Arc::new(LoggingInterceptor::new(transport)),
        ));

        Ok(ShortenerClient { base_uri, chain })
    }
}

/// Client for the upstream url-shortener service. Cheap to clone; the
/// interceptor chain is built once and shared read-only across calls.
#[derive(Clone)]
pub struct ShortenerClient {
    base_uri: Uri,
    chain: Arc<dyn Transport>,
}

impl std::fmt::Debug for ShortenerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShortenerClient")
            .field("base_uri", &self.base_uri)
            .finish_non_exhaustive()
    }
}

impl ShortenerClient {
    pub fn builder(base_url: impl Into<String>) -> ShortenerClientBuilder {
        ShortenerClientBuilder::new(base_url)
    }

    pub fn from_config(config: &ShortenerConfig) -> ClientResult<Self> {
        Self::builder(config.base_url.clone())
            .timeout(config.timeout)
            .max_retries(config.max_retries)
            .try_build()
    }

    pub async fn shorten_url(
        &self,
        cancellation: CancellationToken,
        original_url: &str,
        alias: &str,
    ) -> ClientResult<ShortenResponse> {
        let payload = ShortenRequest {
            url: original_url.to_owned(),
            alias: alias.to_owned(),
        };
        let body = serde_json::to_vec(&payload)
            .map_err(|source| operation_error(ClientError::Serialize { source }))?;

        let producer_payload = payload.clone();
        let request = OutboundRequest::post(self.base_uri.clone(), body)
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_operation(OP_SHORTEN_URL)
            .with_cancellation(cancellation)
            .with_body_producer(Arc::new(move || {
                serde_json::to_vec(&producer_payload)
                    .map(Bytes::from)
                    .map_err(Into::into)
            }));

        let response = self.chain.send(request).await.map_err(operation_error)?;

        if response.status() != StatusCode::OK {
            return Err(operation_error(ClientError::HttpStatus {
                status: response.status().as_u16(),
                method: Method::POST,
                uri: self.base_uri.to_string(),
                body: truncate_body(response.body()),
            }));
        }

        let shortened: ShortenResponse = response.json().map_err(operation_error)?;
        debug!(alias = %shortened.alias, url = %original_url, "url shortened");
        Ok(shortened)
    }
}

fn operation_error(source: ClientError) -> ClientError {
    ClientError::Operation {
        operation: OP_SHORTEN_URL,
        source: Box::new(source),
    }
}
