//! HTTP Remote Store
//!
//! REST client for the remote entity store:
//!
//! - `POST   {server}/api/{collection}`       create, responds with the canonical record
//! - `PUT    {server}/api/{collection}/{id}`  update with the full payload
//! - `DELETE {server}/api/{collection}/{id}`  delete
//!
//! Every request carries the configured bearer token and is bounded by the
//! configured request timeout.

use crate::client::remote::RemoteEntityStore;
use crate::shared::config::SyncConfig;
use crate::shared::entities::SyncEntity;
use crate::shared::error::RemoteError;
use crate::shared::operation::EntityType;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};

/// HTTP remote store client
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    config: SyncConfig,
    client: Client,
}

impl HttpRemoteStore {
    pub fn new(config: SyncConfig) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| RemoteError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn collection_url(&self, entity_type: EntityType) -> String {
        self.config.api_url(&format!("/api/{}", entity_type.collection()))
    }

    fn record_url(&self, entity_type: EntityType, id: &str) -> String {
        format!("{}/{}", self.collection_url(entity_type), id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = self.authorize(request).send().await.map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_else(|_| status.to_string());
        Err(RemoteError::from_status(status.as_u16(), body))
    }
}

fn transport_error(error: reqwest::Error) -> RemoteError {
    if error.is_timeout() {
        RemoteError::Timeout
    } else if error.is_decode() {
        RemoteError::Decode(error.to_string())
    } else {
        RemoteError::Network(error.to_string())
    }
}

#[async_trait]
impl<E: SyncEntity> RemoteEntityStore<E> for HttpRemoteStore {
    async fn create(&self, entity: &E) -> Result<E, RemoteError> {
        let url = self.collection_url(E::ENTITY_TYPE);
        tracing::debug!(%url, entity_id = entity.id(), "POST");

        let response = self.send(self.client.post(&url).json(entity)).await?;
        response
            .json::<E>()
            .await
            .map_err(|e| RemoteError::Decode(format!("Failed to parse {} record: {}", E::ENTITY_TYPE, e)))
    }

    async fn update(&self, entity: &E) -> Result<(), RemoteError> {
        let url = self.record_url(E::ENTITY_TYPE, entity.id());
        tracing::debug!(%url, "PUT");

        self.send(self.client.put(&url).json(entity)).await?;
        Ok(())
    }

    async fn delete(&self, entity_id: &str) -> Result<(), RemoteError> {
        let url = self.record_url(E::ENTITY_TYPE, entity_id);
        tracing::debug!(%url, "DELETE");

        self.send(self.client.delete(&url)).await?;
        Ok(())
    }
}
