use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::ClientResult;
use crate::request::OutboundRequest;
use crate::response::OutboundResponse;
use crate::transport::Transport;

/// Records every attempt that passes through it. Purely observational: the
/// request and the outcome are forwarded unchanged.
pub struct LoggingInterceptor {
    next: Arc<dyn Transport>,
}

impl LoggingInterceptor {
    pub fn new(next: Arc<dyn Transport>) -> Self {
        Self { next }
    }
}

#[async_trait]
impl Transport for LoggingInterceptor {
    async fn send(&self, request: OutboundRequest) -> ClientResult<OutboundResponse> {
        let method = request.method().clone();
        let uri = request.uri_text().to_owned();
        let operation = request.operation();

        debug!(method = %method, uri = %uri, operation, "http request started");
        let started = Instant::now();

        let result = self.next.send(request).await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(response) => debug!(
                method = %method,
                uri = %uri,
                status = response.status().as_u16(),
                elapsed_ms,
                "http request completed"
            ),
            Err(source) => error!(
                method = %method,
                uri = %uri,
                error = %source,
                elapsed_ms,
                "http request failed"
            ),
        }

        result
    }
}
