use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, Uri};
use tokio_util::sync::CancellationToken;

/// Regenerates the request body for a retry attempt. Must be idempotent and
/// side-effect free: it may run once per attempt and its output replaces
/// whatever the previous attempt consumed.
pub type BodyProducer =
    Arc<dyn Fn() -> Result<Bytes, Box<dyn std::error::Error + Send + Sync>> + Send + Sync>;

/// One outbound call, alive across all of its retry attempts.
#[derive(Clone)]
pub struct OutboundRequest {
    method: Method,
    uri: Uri,
    uri_text: String,
    headers: HeaderMap,
    body: Bytes,
    body_producer: Option<BodyProducer>,
    operation: &'static str,
    cancellation: CancellationToken,
}

impl OutboundRequest {
    pub fn new(method: Method, uri: Uri, body: impl Into<Bytes>) -> Self {
        let uri_text = uri.to_string();
        Self {
            method,
            uri,
            uri_text,
            headers: HeaderMap::new(),
            body: body.into(),
            body_producer: None,
            operation: "",
            cancellation: CancellationToken::new(),
        }
    }

    pub fn post(uri: Uri, body: impl Into<Bytes>) -> Self {
        Self::new(Method::POST, uri, body)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_operation(mut self, operation: &'static str) -> Self {
        self.operation = operation;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn with_body_producer(mut self, body_producer: BodyProducer) -> Self {
        self.body_producer = Some(body_producer);
        self
    }

    pub(crate) fn with_body(&self, body: Bytes) -> Self {
        let mut request = self.clone();
        request.body = body;
        request
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn uri_text(&self) -> &str {
        &self.uri_text
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn body_producer(&self) -> Option<&BodyProducer> {
        self.body_producer.as_ref()
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

impl fmt::Debug for OutboundRequest {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("OutboundRequest")
            .field("method", &self.method)
            .field("uri", &self.uri_text)
            .field("operation", &self.operation)
            .field("body_len", &self.body.len())
            .field("replayable", &self.body_producer.is_some())
            .finish()
    }
}
