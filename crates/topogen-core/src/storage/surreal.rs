//! Direct SurrealDB client over the HTTP `/sql` endpoint.

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use async_trait::async_trait;

use crate::config::SurrealConfig;

use super::{StorageClient, StorageError, REQUEST_TIMEOUT};

/// SurrealDB HTTP REST API client.
///
/// The underlying HTTP connection is reused across calls within a run but
/// is not meant to be shared across threads.
pub struct SurrealClient {
    url: String,
    username: String,
    password: String,
    namespace: String,
    database: String,
    client: Client,
}

impl SurrealClient {
    pub fn new(config: &SurrealConfig) -> Self {
        let url = config.url.trim_end_matches('/').to_string();
        tracing::info!(
            "SurrealDB client initialized: {}/{}/{}",
            url,
            config.namespace,
            config.database
        );

        Self {
            url,
            username: config.username.clone(),
            password: config.password.clone(),
            namespace: config.namespace.clone(),
            database: config.database.clone(),
            client: Client::new(),
        }
    }
}

/// One per-statement result as returned by the `/sql` endpoint.
#[derive(Debug, Deserialize)]
struct SqlResult {
    #[serde(default)]
    status: String,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    detail: Option<String>,
}

#[async_trait]
impl StorageClient for SurrealClient {
    async fn execute(&self, statement: &str) -> Result<Vec<Value>, StorageError> {
        // Namespace/database selection travels with every request.
        let full = format!(
            "USE NS {} DB {}; {}",
            self.namespace, self.database, statement
        );
        tracing::debug!("Executing statement: {:.120}", statement);

        let response = self
            .client
            .post(format!("{}/sql", self.url))
            .timeout(REQUEST_TIMEOUT)
            .header("Content-Type", "text/plain; charset=utf-8")
            .header("Accept", "application/json")
            .basic_auth(&self.username, Some(&self.password))
            .body(full)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::query(status.as_u16().to_string(), body));
        }

        let results: Vec<SqlResult> = response
            .json()
            .await
            .map_err(|e| StorageError::Parse(e.to_string()))?;

        for (i, result) in results.iter().enumerate() {
            if result.status == "ERR" {
                let detail = result
                    .detail
                    .clone()
                    .unwrap_or_else(|| result.result.to_string());
                return Err(StorageError::query(
                    "ERR",
                    format!("statement {i}: {detail}"),
                ));
            }
        }

        // The first result belongs to the USE statement; drop it.
        let skip = usize::from(results.len() > 1);
        Ok(results.into_iter().skip(skip).map(|r| r.result).collect())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.execute("INFO FOR DB;").await.map(|_| ())
    }
}
