use async_trait::async_trait;
use elasticsearch::{
    http::{
        request::JsonBody,
        transport::{SingleNodeConnectionPool, TransportBuilder},
        StatusCode, Url,
    },
    BulkParts, Elasticsearch, ExistsParts,
};
use nt_core::{BulkItemResult, Error, IndexAction, Result, SearchBackend};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ElasticConfig {
    pub url: String,
    pub timeout: Duration,
}

impl ElasticConfig {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

/// One client, and so one connection pool, for the whole run.
pub struct ElasticBackend {
    client: Elasticsearch,
}

impl ElasticBackend {
    pub fn new(config: &ElasticConfig) -> Result<Self> {
        let url = Url::parse(&config.url)
            .map_err(|e| Error::Configuration(format!("invalid elasticsearch url {:?}: {}", config.url, e)))?;
        let transport = TransportBuilder::new(SingleNodeConnectionPool::new(url))
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build elasticsearch client: {}", e)))?;
        Ok(Self {
            client: Elasticsearch::new(transport),
        })
    }
}

#[async_trait]
impl SearchBackend for ElasticBackend {
    fn name(&self) -> &str {
        "elasticsearch"
    }

    async fn exists(&self, id: &str, partition: &str) -> Result<bool> {
        let response = self
            .client
            .exists(ExistsParts::IndexId(partition, id))
            .send()
            .await
            .map_err(|e| Error::Storage(format!("existence check for {} failed: {}", id, e)))?;

        match response.status_code() {
            status if status.is_success() => Ok(true),
            // Also returned when the partition index does not exist yet.
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(Error::Storage(format!(
                "existence check for {} returned {}",
                id, status
            ))),
        }
    }

    async fn bulk_write(&self, batch: &[IndexAction]) -> Result<Vec<BulkItemResult>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let body: Vec<JsonBody<Value>> = bulk_lines(batch)?.into_iter().map(JsonBody::new).collect();
        debug!(count = batch.len(), lines = body.len(), "sending bulk request");

        let response = self
            .client
            .bulk(BulkParts::None)
            .body(body)
            .send()
            .await
            .map_err(|e| Error::BackendWrite(format!("bulk request failed: {}", e)))?;

        let status = response.status_code();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::BackendWrite(format!("bulk request returned {}: {}", status, text)));
        }

        let parsed: BulkResponse = response
            .json()
            .await
            .map_err(|e| Error::BackendWrite(format!("unreadable bulk response: {}", e)))?;
        Ok(parsed.into_results())
    }
}

/// Action/document pairs in `_bulk` order, one JSON value per NDJSON line.
pub(crate) fn bulk_lines(batch: &[IndexAction]) -> Result<Vec<Value>> {
    let mut lines = Vec::with_capacity(batch.len() * 2);
    for action in batch {
        lines.push(json!({ "index": { "_index": action.partition, "_id": action.id } }));
        lines.push(serde_json::to_value(&action.document)?);
    }
    Ok(lines)
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    items: Vec<BulkResponseItem>,
}

#[derive(Debug, Deserialize)]
struct BulkResponseItem {
    index: BulkItemStatus,
}

#[derive(Debug, Deserialize)]
struct BulkItemStatus {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    error: Option<Value>,
}

impl BulkResponse {
    fn into_results(self) -> Vec<BulkItemResult> {
        self.items
            .into_iter()
            .map(|item| match item.index.error {
                None => BulkItemResult::ok(item.index.id),
                Some(error) => {
                    let reason = error
                        .get("reason")
                        .and_then(|r| r.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| error.to_string());
                    BulkItemResult::failed(item.index.id, reason)
                }
            })
            .collect()
    }
}
