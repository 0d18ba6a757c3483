pub mod archive;
pub mod cleanup;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::core::error::BridgeError;
use types::TaskStatusRecord;

/// A record as returned by the list-by-owner call, with the metadata used
/// for recency sorting.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    pub label: String,
    pub value: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Persistence boundary for task status records. The production
/// implementation talks to the external memory service; tests swap in an
/// in-memory double.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Create the record and return the store-assigned id. This is the one
    /// store call whose failure the engine must see.
    async fn create_record(&self, record: &TaskStatusRecord) -> Result<String>;
    async fn update_record(&self, record_id: &str, record: &TaskStatusRecord) -> Result<()>;
    async fn delete_record(&self, record_id: &str) -> Result<()>;
    async fn attach_record(&self, agent_id: &str, record_id: &str) -> Result<()>;
    async fn detach_record(&self, agent_id: &str, record_id: &str) -> Result<()>;
    async fn list_records(&self, agent_id: &str) -> Result<Vec<StoredRecord>>;
    /// Submit an immutable long-form entry to archival storage.
    async fn archive(&self, agent_id: &str, text: &str) -> Result<()>;
}

/// HTTP client for the external memory service.
pub struct StatusStoreClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct CreatedRecord {
    id: String,
}

impl StatusStoreClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn expect_ok(resp: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(BridgeError::store(format!(
                "{} failed with status {}",
                what,
                resp.status()
            )))
        }
    }
}

#[async_trait]
impl StatusStore for StatusStoreClient {
    async fn create_record(&self, record: &TaskStatusRecord) -> Result<String> {
        let value = serde_json::to_string(record)?;
        let resp = self
            .request(reqwest::Method::POST, "/v1/blocks")
            .json(&json!({ "label": record.label(), "value": value }))
            .send()
            .await
            .map_err(|e| BridgeError::store(format!("create record: {}", e)))?;
        let resp = Self::expect_ok(resp, "create record").await?;
        let created: CreatedRecord = resp
            .json()
            .await
            .map_err(|e| BridgeError::store(format!("create record response: {}", e)))?;
        debug!("Created status record {} for {}", created.id, record.task_id);
        Ok(created.id)
    }

    async fn update_record(&self, record_id: &str, record: &TaskStatusRecord) -> Result<()> {
        let value = serde_json::to_string(record)?;
        let resp = self
            .request(reqwest::Method::PATCH, &format!("/v1/blocks/{}", record_id))
            .json(&json!({ "value": value }))
            .send()
            .await
            .map_err(|e| BridgeError::store(format!("update record: {}", e)))?;
        Self::expect_ok(resp, "update record").await?;
        Ok(())
    }

    async fn delete_record(&self, record_id: &str) -> Result<()> {
        let resp = self
            .request(reqwest::Method::DELETE, &format!("/v1/blocks/{}", record_id))
            .send()
            .await
            .map_err(|e| BridgeError::store(format!("delete record: {}", e)))?;
        Self::expect_ok(resp, "delete record").await?;
        Ok(())
    }

    async fn attach_record(&self, agent_id: &str, record_id: &str) -> Result<()> {
        let path = format!(
            "/v1/agents/{}/core-memory/blocks/attach/{}",
            agent_id, record_id
        );
        let resp = self
            .request(reqwest::Method::PATCH, &path)
            .send()
            .await
            .map_err(|e| BridgeError::store(format!("attach record: {}", e)))?;
        Self::expect_ok(resp, "attach record").await?;
        Ok(())
    }

    async fn detach_record(&self, agent_id: &str, record_id: &str) -> Result<()> {
        let path = format!(
            "/v1/agents/{}/core-memory/blocks/detach/{}",
            agent_id, record_id
        );
        let resp = self
            .request(reqwest::Method::PATCH, &path)
            .send()
            .await
            .map_err(|e| BridgeError::store(format!("detach record: {}", e)))?;
        Self::expect_ok(resp, "detach record").await?;
        Ok(())
    }

    async fn list_records(&self, agent_id: &str) -> Result<Vec<StoredRecord>> {
        let path = format!("/v1/agents/{}/core-memory/blocks", agent_id);
        let resp = self
            .request(reqwest::Method::GET, &path)
            .send()
            .await
            .map_err(|e| BridgeError::store(format!("list records: {}", e)))?;
        let resp = Self::expect_ok(resp, "list records").await?;
        let records: Vec<StoredRecord> = resp
            .json()
            .await
            .map_err(|e| BridgeError::store(format!("list records response: {}", e)))?;
        Ok(records)
    }

    async fn archive(&self, agent_id: &str, text: &str) -> Result<()> {
        let path = format!("/v1/agents/{}/archival-memory", agent_id);
        let resp = self
            .request(reqwest::Method::POST, &path)
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(|e| BridgeError::store(format!("archive entry: {}", e)))?;
        Self::expect_ok(resp, "archive entry").await?;
        Ok(())
    }
}
