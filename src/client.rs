use std::marker::PhantomData;

use anyhow::Result;
use async_trait::async_trait;

use crate::api_client::{ApiClient, ApiConfig};
use crate::error::ApiError;
use crate::models::{AdminUser, Constable, Duty, Station};
use crate::record::Record;

/// Remote side of a record collection.
///
/// The list controller only talks to the server through this trait, so tests
/// and alternative transports can stand in for the REST API.
#[async_trait]
pub trait RecordBackend<R: Record>: Send + Sync {
    /// `GET /<collection>`
    async fn list(&self) -> Result<Vec<R>, ApiError>;

    /// `POST /<collection>`; the server echoes the record with its new id.
    async fn create(&self, draft: &R) -> Result<R, ApiError>;

    /// `PUT /<collection>/:id`; the server echoes the updated record.
    async fn update(&self, id: &str, record: &R) -> Result<R, ApiError>;

    /// `DELETE /<collection>/:id`
    async fn delete(&self, id: &str) -> Result<(), ApiError>;
}

/// REST implementation of [`RecordBackend`] for one collection.
#[derive(Debug, Clone)]
pub struct RestCollection<R> {
    api: ApiClient,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> RestCollection<R> {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            _record: PhantomData,
        }
    }
}

#[async_trait]
impl<R: Record> RecordBackend<R> for RestCollection<R> {
    async fn list(&self) -> Result<Vec<R>, ApiError> {
        self.api.get(R::COLLECTION).await
    }

    async fn create(&self, draft: &R) -> Result<R, ApiError> {
        self.api.post(R::COLLECTION, draft).await
    }

    async fn update(&self, id: &str, record: &R) -> Result<R, ApiError> {
        self.api.put(self.api.item_url(R::COLLECTION, id)?, record).await
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.api.delete(self.api.item_url(R::COLLECTION, id)?).await
    }
}

/// Entry point handing out one REST collection per administered entity.
#[derive(Debug, Clone)]
pub struct DutyDeskClient {
    api: ApiClient,
}

impl DutyDeskClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(config)?,
        })
    }

    /// Builds a client from `DUTY_DESK_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(ApiConfig::from_env()?)
    }

    pub fn config(&self) -> &ApiConfig {
        self.api.config()
    }

    pub fn collection<R: Record>(&self) -> RestCollection<R> {
        RestCollection::new(self.api.clone())
    }

    pub fn stations(&self) -> RestCollection<Station> {
        self.collection()
    }

    pub fn constables(&self) -> RestCollection<Constable> {
        self.collection()
    }

    pub fn duties(&self) -> RestCollection<Duty> {
        self.collection()
    }

    pub fn admins(&self) -> RestCollection<AdminUser> {
        self.collection()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_urls_escape_ids() {
        let client = DutyDeskClient::new(ApiConfig::new("http://localhost:5000/api").unwrap()).unwrap();
        assert_eq!(
            client.api.item_url(Station::COLLECTION, "a b/c").unwrap().as_str(),
            "http://localhost:5000/api/stations/a%20b%2Fc"
        );
        assert_eq!(
            client.api.item_url(Duty::COLLECTION, "665f1c2a").unwrap().as_str(),
            "http://localhost:5000/api/duties/665f1c2a"
        );
    }

    #[test]
    fn client_urls_follow_collections() {
        let client = DutyDeskClient::new(ApiConfig::new("http://localhost:5000/api").unwrap()).unwrap();
        assert_eq!(
            client.api.url(Constable::COLLECTION).unwrap().as_str(),
            "http://localhost:5000/api/constables"
        );
    }
}
