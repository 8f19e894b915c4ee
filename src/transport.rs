use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::Request;
use http_body_util::{BodyExt, Full};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tokio::time::timeout;

use crate::ClientResult;
use crate::error::ClientError;
use crate::request::OutboundRequest;
use crate::response::OutboundResponse;
use crate::util::classify_transport_error;

/// The one capability every link of the chain implements: send one request,
/// get one response or a transport-level error. Interceptors wrap an inner
/// `Transport` and delegate through it.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> ClientResult<OutboundResponse>;
}

const DEFAULT_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

type PooledClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

pub struct HttpTransport {
    client: PooledClient,
    request_timeout: Duration,
}

impl HttpTransport {
    pub fn new(request_timeout: Duration) -> ClientResult<Self> {
        let https = HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())
            .map_err(|source| ClientError::TlsInit {
                message: source.to_string(),
            })?
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();
        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(DEFAULT_POOL_IDLE_TIMEOUT)
            .build(https);
        Ok(Self {
            client,
            request_timeout: request_timeout.max(Duration::from_millis(1)),
        })
    }
}

fn build_http_request(request: &OutboundRequest) -> Result<Request<Full<Bytes>>, ClientError> {
    let mut http_request = Request::builder()
        .method(request.method().clone())
        .uri(request.uri().clone())
        .body(Full::new(request.body().clone()))
        .map_err(|source| ClientError::RequestBuild { source })?;
    *http_request.headers_mut() = request.headers().clone();
    Ok(http_request)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: OutboundRequest) -> ClientResult<OutboundResponse> {
        let method = request.method().clone();
        let uri = request.uri_text().to_owned();
        let http_request = build_http_request(&request)?;

        let response = match timeout(self.request_timeout, self.client.request(http_request)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(source)) => {
                return Err(ClientError::Transport {
                    kind: classify_transport_error(&source),
                    method,
                    uri,
                    source: Box::new(source),
                });
            }
            Err(_) => {
                return Err(ClientError::Timeout {
                    timeout_ms: self.request_timeout.as_millis(),
                    method,
                    uri,
                });
            }
        };

        let status = response.status();
        let headers = response.headers().clone();
        // The body is drained in full for every status, so an attempt that is
        // later abandoned for a retry never leaves the pooled connection dirty.
        let body = match timeout(self.request_timeout, response.into_body().collect()).await {
            Ok(Ok(collected)) => collected.to_bytes(),
            Ok(Err(source)) => {
                return Err(ClientError::ReadBody {
                    method,
                    uri,
                    source: Box::new(source),
                });
            }
            Err(_) => {
                return Err(ClientError::Timeout {
                    timeout_ms: self.request_timeout.as_millis(),
                    method,
                    uri,
                });
            }
        };

        Ok(OutboundResponse::new(status, headers, body))
    }
}
