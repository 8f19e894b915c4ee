//! `urlsaver` is the domain core of a url-saving service: a resilient client
//! for the upstream url-shortener, built from a composable chain of transport
//! interceptors (bounded retry around per-attempt logging), plus the storage
//! and service contracts that surround it.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use tokio_util::sync::CancellationToken;
//! use urlsaver::prelude::ShortenerClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ShortenerClient::builder("https://shortener.example.com/api/shorten")
//!         .timeout(Duration::from_secs(5))
//!         .max_retries(3)
//!         .try_build()?;
//!
//!     let shortened = client
//!         .shorten_url(
//!             CancellationToken::new(),
//!             "https://example.com/some/long/path",
//!             "demo",
//!         )
//!         .await?;
//!
//!     println!("alias={} url={}", shortened.alias, shortened.url);
//!     Ok(())
//! }
//! ```
//!
//! Transient failures (connect errors, transport timeouts, and the
//! 429/500/502/503/504 statuses) are retried up to the configured bound with
//! half the client timeout between attempts; any other response is returned
//! after a single attempt. Cancelling the token aborts the call at the next
//! suspension point.

mod client;
mod config;
mod error;
mod logging;
mod request;
mod response;
mod retry;
mod service;
mod storage;
mod transport;
mod util;

pub use crate::client::{
    ShortenRequest, ShortenResponse, ShortenerClient, ShortenerClientBuilder,
};
pub use crate::config::ShortenerConfig;
pub use crate::error::{ClientError, ErrorCode, TransportErrorKind};
pub use crate::logging::LoggingInterceptor;
pub use crate::request::{BodyProducer, OutboundRequest};
pub use crate::response::OutboundResponse;
pub use crate::retry::{RetryInterceptor, RetryPolicy};
pub use crate::service::{SavedUrl, ServiceError, UrlSaverService};
pub use crate::storage::{StorageError, UrlRecord, UrlStore};
pub use crate::transport::{HttpTransport, Transport};

pub type ClientResult<T> = std::result::Result<T, ClientError>;

pub mod prelude {
    pub use crate::{
        ClientError, ClientResult, ErrorCode, OutboundRequest, OutboundResponse, RetryPolicy,
        ShortenResponse, ShortenerClient, Transport,
    };
}
