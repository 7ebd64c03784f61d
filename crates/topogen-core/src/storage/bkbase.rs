//! BKBase client: the same statements routed through the unified query API.

use reqwest::Client;
use serde_json::{json, Value};

use async_trait::async_trait;

use crate::config::BkBaseConfig;

use super::{StorageClient, StorageError, REQUEST_TIMEOUT};

/// Client for SurrealDB access through the BKBase unified query API.
///
/// The statement is forwarded verbatim inside a JSON envelope together
/// with the app credentials, so the idempotence semantics are exactly
/// those of the direct client.
pub struct BkBaseClient {
    api_url: String,
    username: String,
    app_code: String,
    app_secret: String,
    result_table_id: String,
    auth_method: String,
    prefer_storage: String,
    client: Client,
}

impl BkBaseClient {
    /// Build the client, validating required settings up front.
    ///
    /// Fails with [`StorageError::Configuration`] before any network call
    /// when the endpoint, app secret, or result table id is absent.
    pub fn new(config: &BkBaseConfig) -> Result<Self, StorageError> {
        if config.api_url.is_empty() {
            return Err(StorageError::Configuration(
                "bkbase.api_url is required for the bkbase backend".to_string(),
            ));
        }
        if config.app_secret.is_empty() {
            return Err(StorageError::Configuration(
                "bkbase.app_secret is required for the bkbase backend".to_string(),
            ));
        }
        if config.result_table_id.is_empty() {
            return Err(StorageError::Configuration(
                "bkbase.result_table_id is required for the bkbase backend".to_string(),
            ));
        }

        tracing::info!("BKBase client initialized: {}", config.api_url);
        tracing::info!("  Result table id: {}", config.result_table_id);
        tracing::info!("  Prefer storage: {}", config.prefer_storage);

        Ok(Self {
            api_url: config.api_url.clone(),
            username: config.username.clone(),
            app_code: config.app_code.clone(),
            app_secret: config.app_secret.clone(),
            result_table_id: config.result_table_id.clone(),
            auth_method: config.auth_method.clone(),
            prefer_storage: config.prefer_storage.clone(),
            client: Client::new(),
        })
    }
}

#[async_trait]
impl StorageClient for BkBaseClient {
    async fn execute(&self, statement: &str) -> Result<Vec<Value>, StorageError> {
        let envelope = json!({
            "dsl": statement,
            "result_table_id": self.result_table_id,
        });
        let payload = json!({
            "sql": envelope.to_string(),
            "bkdata_authentication_method": self.auth_method,
            "prefer_storage": self.prefer_storage,
            "bk_username": self.username,
            "bk_app_code": self.app_code,
            "bk_app_secret": self.app_secret,
        });

        tracing::debug!("Executing statement via BKBase: {:.120}", statement);

        let response = self
            .client
            .post(&self.api_url)
            .timeout(REQUEST_TIMEOUT)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::query(status.as_u16().to_string(), body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| StorageError::Parse(e.to_string()))?;

        if !body.get("result").and_then(Value::as_bool).unwrap_or(false) {
            let message = body
                .get("message")
                .or_else(|| body.get("errors"))
                .map(|v| v.to_string())
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(StorageError::query("rejected", message));
        }

        let records = body
            .pointer("/data/list")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));

        // One payload for the whole request, mirroring the contract shape.
        Ok(vec![records])
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.execute("SELECT * FROM pod LIMIT 1;").await.map(|_| ())
    }
}
