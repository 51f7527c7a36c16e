use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::config::{self, ScopePath};

use super::{listen, NewProject, ProjectStore, StoreError, Subscription, Task};

/// Buffer for in-flight snapshot deliveries per subscription
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// HTTP client for a remote document-store deployment.
///
/// Writes go through short-lived JSON requests; reads arrive over a
/// Server-Sent-Events channel that pushes the full collection on every
/// change (see [`listen`]).
pub struct RestStore {
    client: Client,
    /// Separate client for event streams: no overall request timeout, which
    /// would sever a long-lived SSE connection.
    stream_client: Client,
    base_url: String,
    api_token: Option<String>,
}

#[derive(Deserialize)]
struct CreatedDocument {
    id: String,
}

impl RestStore {
    pub fn new(base_url: impl Into<String>, api_token: Option<String>) -> Result<Self, StoreError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(StoreError::InvalidUrl(
                "URL must start with http:// or https://".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()?;

        let stream_client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            stream_client,
            base_url,
            api_token,
        })
    }

    /// Build a client from the process-wide [`config`].
    pub fn from_config() -> Result<Self, StoreError> {
        let config = config::get()?;
        Self::new(config.base_url.clone(), config.api_token.clone())
    }

    fn documents_url(&self, scope: &ScopePath) -> String {
        format!("{}/collections/{}/documents", self.base_url, scope)
    }

    fn document_url(&self, scope: &ScopePath, id: &str) -> String {
        format!("{}/{}", self.documents_url(scope), id)
    }

    fn events_url(&self, scope: &ScopePath) -> String {
        format!("{}/collections/{}/events", self.base_url, scope)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Map a non-success write response to a store error
    async fn check_write(
        response: reqwest::Response,
        path: &str,
    ) -> Result<reqwest::Response, StoreError> {
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(StoreError::AuthFailed),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(path.to_string())),
            status if !status.is_success() => Err(StoreError::Server {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            }),
            _ => Ok(response),
        }
    }
}

#[async_trait::async_trait]
impl ProjectStore for RestStore {
    fn subscribe(&self, scope: &ScopePath) -> Subscription {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let request = self.authorize(self.stream_client.get(self.events_url(scope)));
        listen::spawn_snapshot_listener(request, scope.to_string(), events_tx, shutdown_rx);

        Subscription::new(events_rx, shutdown_tx)
    }

    async fn create(&self, scope: &ScopePath, fields: NewProject) -> Result<String, StoreError> {
        let url = self.documents_url(scope);

        let response = self
            .authorize(self.client.post(&url))
            .json(&fields)
            .send()
            .await?;
        let response = Self::check_write(response, &url).await?;

        let created: CreatedDocument = response.json().await?;
        log::info!("store: created project {} in {}", created.id, scope);
        Ok(created.id)
    }

    async fn update_tasks(
        &self,
        scope: &ScopePath,
        id: &str,
        tasks: Vec<Task>,
    ) -> Result<(), StoreError> {
        let url = self.document_url(scope, id);

        let response = self
            .authorize(self.client.patch(&url))
            .json(&serde_json::json!({ "tasks": tasks }))
            .send()
            .await?;
        Self::check_write(response, &url).await?;

        log::debug!("store: wrote {} task(s) to project {}", tasks.len(), id);
        Ok(())
    }

    async fn delete(&self, scope: &ScopePath, id: &str) -> Result<(), StoreError> {
        let url = self.document_url(scope, id);

        let response = self.authorize(self.client.delete(&url)).send().await?;
        Self::check_write(response, &url).await?;

        log::info!("store: deleted project {} from {}", id, scope);
        Ok(())
    }
}
