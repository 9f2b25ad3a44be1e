//! HTTP entry store
//!
//! REST client for the entries resource:
//!
//! - `GET    {base}/entries`      - list, newest first
//! - `POST   {base}/entries`      - insert one
//! - `DELETE {base}/entries/{id}` - delete by id

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};

use super::{sort_newest_first, EntryStore};
use crate::entries::{StoreError, StoreResult, TruckEntry};

/// Configuration for the HTTP store
#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    /// Base URL of the backend (e.g., "http://localhost:3001")
    pub base_url: String,
    /// Credential sent as bearer token and `apikey` header
    pub api_key: Option<String>,
    /// Per-request timeout; `None` waits for the transport to give up
    pub request_timeout_secs: Option<u64>,
}

impl Default for HttpStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001".to_string(),
            api_key: None,
            request_timeout_secs: None,
        }
    }
}

/// Entry store backed by a REST API
pub struct HttpEntryStore {
    client: Client,
    config: HttpStoreConfig,
}

impl HttpEntryStore {
    /// Create a new HTTP store with the given configuration
    pub fn new(config: HttpStoreConfig) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    pub fn config(&self) -> &HttpStoreConfig {
        &self.config
    }

    fn entries_url(&self) -> String {
        format!("{}/entries", self.config.base_url.trim_end_matches('/'))
    }

    fn entry_url(&self, id: &str) -> String {
        format!("{}/{}", self.entries_url(), id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key).header("apikey", key),
            None => request,
        }
    }
}

#[async_trait]
impl EntryStore for HttpEntryStore {
    async fn save(&self, entry: &TruckEntry) -> StoreResult<()> {
        let request = self.authorize(self.client.post(self.entries_url()).json(entry));

        let result = match request.send().await {
            Ok(response) => expect_success(response).await,
            Err(e) => Err(describe_transport_error(&e)),
        };

        result.map_err(|message| {
            tracing::error!(entry_id = %entry.id, error = %message, "Error saving entry");
            StoreError::Persistence(message)
        })
    }

    async fn remove(&self, id: &str) -> StoreResult<()> {
        let request = self.authorize(self.client.delete(self.entry_url(id)));

        let result = match request.send().await {
            Ok(response) => expect_success(response).await,
            Err(e) => Err(describe_transport_error(&e)),
        };

        result.map_err(|message| {
            tracing::error!(entry_id = %id, error = %message, "Error deleting entry");
            StoreError::Persistence(message)
        })
    }

    async fn list_all(&self) -> StoreResult<Vec<TruckEntry>> {
        let request = self.authorize(self.client.get(self.entries_url()));

        let result = async {
            let response = request
                .send()
                .await
                .map_err(|e| describe_transport_error(&e))?;
            let response = error_for_status(response).await?;
            response
                .json::<Vec<TruckEntry>>()
                .await
                .map_err(|e| format!("Invalid entries payload: {}", e))
        }
        .await;

        match result {
            Ok(mut entries) => {
                sort_newest_first(&mut entries);
                Ok(entries)
            }
            Err(message) => {
                tracing::error!(error = %message, "Error fetching entries");
                Err(StoreError::Fetch(message))
            }
        }
    }
}

async fn expect_success(response: Response) -> Result<(), String> {
    error_for_status(response).await.map(|_| ())
}

async fn error_for_status(response: Response) -> Result<Response, String> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    Err(format!("API error {}: {}", status.as_u16(), text))
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        format!("Backend unavailable: {}", e)
    } else {
        format!("Request failed: {}", e)
    }
}
