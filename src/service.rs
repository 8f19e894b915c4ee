use std::sync::Arc;

use thiserror::Error;
use tracing::error;

use crate::storage::{StorageError, UrlRecord, UrlStore};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServiceError {
    #[error("alias already exists")]
    AliasExists,
    #[error("operation is not implemented: {operation}")]
    NotImplemented { operation: &'static str },
    #[error("storage failure: {source}")]
    Storage {
        #[source]
        source: StorageError,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedUrl {
    pub id: i64,
    pub alias: String,
}

/// Domain service over the url store. Only `save` is live today; the other
/// operations surface `NotImplemented` instead of aborting so callers can
/// map them to their own "unsupported" responses.
pub struct UrlSaverService {
    store: Arc<dyn UrlStore>,
}

impl UrlSaverService {
    pub fn new(store: Arc<dyn UrlStore>) -> Self {
        Self { store }
    }

    pub async fn save(&self, url: &str, alias: &str) -> Result<SavedUrl, ServiceError> {
        match self.store.save_url(url, alias).await {
            Ok(id) => Ok(SavedUrl {
                id,
                alias: alias.to_owned(),
            }),
            Err(StorageError::AliasExists) => Err(ServiceError::AliasExists),
            Err(source) => {
                error!(error = %source, alias, "failed to save url");
                Err(ServiceError::Storage { source })
            }
        }
    }

    pub async fn get(&self, _alias: &str) -> Result<UrlRecord, ServiceError> {
        Err(ServiceError::NotImplemented {
            operation: "urlsaver.get",
        })
    }

    pub async fn update_by_id(
        &self,
        _url_id: i64,
        _new_url: &str,
        _new_alias: &str,
    ) -> Result<UrlRecord, ServiceError> {
        Err(ServiceError::NotImplemented {
            operation: "urlsaver.update_by_id",
        })
    }

    pub async fn update_by_alias(
        &self,
        _alias: &str,
        _new_url: &str,
        _new_alias: &str,
    ) -> Result<UrlRecord, ServiceError> {
        Err(ServiceError::NotImplemented {
            operation: "urlsaver.update_by_alias",
        })
    }

    pub async fn remove_by_id(&self, _url_id: i64) -> Result<i64, ServiceError> {
        Err(ServiceError::NotImplemented {
            operation: "urlsaver.remove_by_id",
        })
    }

    pub async fn remove_by_alias(&self, _alias: &str) -> Result<i64, ServiceError> {
        Err(ServiceError::NotImplemented {
            operation: "urlsaver.remove_by_alias",
        })
    }

    pub async fn list(
        &self,
        _page_token: &str,
        _page_size: i32,
    ) -> Result<(Vec<UrlRecord>, String), ServiceError> {
        Err(ServiceError::NotImplemented {
            operation: "urlsaver.list",
        })
    }
}
