use async_trait::async_trait;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UrlRecord {
    pub id: i64,
    pub url: String,
    pub alias: String,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("alias exists")]
    AliasExists,
    #[error("alias not found")]
    AliasNotFound,
    #[error("url is invalid")]
    InvalidUrl,
    #[error("storage backend failure: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// The narrow persistence contract the domain service consumes. Concrete
/// backends live outside this crate.
#[async_trait]
pub trait UrlStore: Send + Sync {
    async fn save_url(&self, url: &str, alias: &str) -> Result<i64, StorageError>;

    async fn url_by_alias(&self, alias: &str) -> Result<UrlRecord, StorageError>;

    async fn list_urls(&self, alias: &str) -> Result<Vec<UrlRecord>, StorageError>;

    async fn update_url(&self, url_id: i64, alias: &str) -> Result<(), StorageError>;

    async fn remove_url(&self, alias: &str) -> Result<(), StorageError>;
}
