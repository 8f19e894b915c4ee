use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::ClientResult;
use crate::error::ClientError;
use crate::request::OutboundRequest;
use crate::response::OutboundResponse;
use crate::transport::Transport;

const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Immutable per-client retry configuration. The inter-attempt delay is
/// derived from the client timeout: half of it.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_retries: usize,
    retry_delay: Duration,
    retryable_statuses: BTreeSet<u16>,
}

impl RetryPolicy {
    pub fn new(max_retries: usize, client_timeout: Duration) -> Self {
        Self {
            max_retries,
            retry_delay: client_timeout / 2,
            retryable_statuses: RETRYABLE_STATUSES.into_iter().collect(),
        }
    }

    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn retryable_statuses<I>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = u16>,
    {
        self.retryable_statuses = statuses.into_iter().collect();
        self
    }

    pub fn max_attempts(&self) -> usize {
        self.max_retries + 1
    }

    pub fn is_retryable_status(&self, status: StatusCode) -> bool {
        self.retryable_statuses.contains(&status.as_u16())
    }

    pub(crate) fn classify(
        &self,
        result: Result<OutboundResponse, ClientError>,
    ) -> AttemptOutcome {
        match result {
            Ok(response) if self.is_retryable_status(response.status()) => {
                AttemptOutcome::RetryableResponse(response)
            }
            Ok(response) => AttemptOutcome::Delivered(response),
            Err(error) if error.is_transient() => AttemptOutcome::RetryableError(error),
            Err(error) => AttemptOutcome::Fatal(error),
        }
    }
}

/// What one send-and-classify cycle produced.
#[derive(Debug)]
pub(crate) enum AttemptOutcome {
    /// Terminal response, returned to the caller as-is.
    Delivered(OutboundResponse),
    RetryableResponse(OutboundResponse),
    RetryableError(ClientError),
    Fatal(ClientError),
}

/// Bounds and drives retry attempts around an inner transport. Attempts
/// within one call are strictly sequential; the envelope's cancellation
/// token preempts both the inter-attempt wait and the delegated send.
pub struct RetryInterceptor {
    next: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl RetryInterceptor {
    pub fn new(policy: RetryPolicy, next: Arc<dyn Transport>) -> Self {
        Self { next, policy }
    }
}

#[async_trait]
impl Transport for RetryInterceptor {
    async fn send(&self, request: OutboundRequest) -> ClientResult<OutboundResponse> {
        let method = request.method().clone();
        let uri = request.uri_text().to_owned();
        let cancellation = request.cancellation().clone();
        let mut body = request.body().clone();
        let mut last_response: Option<OutboundResponse> = None;
        let mut last_error: Option<ClientError> = None;

        for attempt in 0..=self.policy.max_retries {
            if attempt > 0 {
                debug!(attempt, uri = %uri, "retrying http request");
                tokio::select! {
                    biased;
                    () = cancellation.cancelled() => {
                        return Err(ClientError::Cancelled { method, uri });
                    }
                    () = sleep(self.policy.retry_delay) => {}
                }

                // The prior attempt may have consumed the body; regenerate it
                // when a producer is available. A failing producer is not
                // fatal: the previous body is reused.
                if let Some(producer) = request.body_producer() {
                    match producer() {
                        Ok(fresh) => body = fresh,
                        Err(source) => warn!(
                            uri = %uri,
                            error = %source,
                            "request body regeneration failed, reusing previous body"
                        ),
                    }
                }
            }

            let result = tokio::select! {
                biased;
                () = cancellation.cancelled() => {
                    return Err(ClientError::Cancelled { method, uri });
                }
                result = self.next.send(request.with_body(body.clone())) => result,
            };

            match self.policy.classify(result) {
                AttemptOutcome::Delivered(response) => {
                    return Ok(response.on_attempt(attempt + 1));
                }
                AttemptOutcome::RetryableResponse(response) => {
                    warn!(
                        status = response.status().as_u16(),
                        attempt,
                        uri = %uri,
                        "http request returned retryable status"
                    );
                    last_response = Some(response.on_attempt(attempt + 1));
                }
                AttemptOutcome::RetryableError(error) => {
                    warn!(error = %error, attempt, uri = %uri, "http request failed, will retry");
                    last_error = Some(error);
                }
                AttemptOutcome::Fatal(error) => return Err(error),
            }
        }

        // A concrete upstream response, however unsuccessful, beats an opaque
        // exhaustion error: the caller keeps the upstream's own payload.
        if let Some(response) = last_response {
            return Ok(response);
        }

        Err(ClientError::AttemptsExhausted {
            attempts: self.policy.max_attempts(),
            method,
            uri,
            source: last_error.map(Box::new),
        })
    }
}
