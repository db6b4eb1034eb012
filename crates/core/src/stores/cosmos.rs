use crate::error::PipelineError;
use crate::models::DocumentRecord;
use crate::store::DocumentStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use url::Url;

/// Document store backed by a Cosmos-style NoSQL container: documents are
/// partitioned by owner and queried with SQL-over-JSON.
pub struct CosmosStore {
    endpoint: String,
    database: String,
    container: String,
    api_key: String,
    client: Client,
}

impl CosmosStore {
    pub fn new(
        endpoint: impl Into<String>,
        database: impl Into<String>,
        container: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, PipelineError> {
        let endpoint = endpoint.into();
        Url::parse(&endpoint)?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            database: database.into(),
            container: container.into(),
            api_key: api_key.into(),
            client: Client::new(),
        })
    }

    fn docs_url(&self) -> String {
        format!(
            "{}/dbs/{}/colls/{}/docs",
            self.endpoint, self.database, self.container
        )
    }

    async fn query_owner_documents(&self, owner: &str) -> Result<Vec<Value>, PipelineError> {
        let response = self
            .client
            .post(self.docs_url())
            .bearer_auth(&self.api_key)
            .header("x-ms-documentdb-isquery", "true")
            .json(&json!({
                "query": "SELECT * FROM c WHERE c.partitionKey = @owner",
                "parameters": [{ "name": "@owner", "value": owner }],
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::Store {
                backend: "cosmos".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        Ok(parsed
            .pointer("/Documents")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl DocumentStore for CosmosStore {
    async fn fetch_texts(&self, owner: &str) -> Result<BTreeMap<String, String>, PipelineError> {
        let documents = self.query_owner_documents(owner).await?;

        let mut texts = BTreeMap::new();
        for document in documents {
            let id = document
                .pointer("/id")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if id.is_empty() {
                continue;
            }

            let text = document
                .pointer("/text")
                .and_then(Value::as_str)
                .unwrap_or_default();
            texts.insert(id.to_string(), text.to_string());
        }

        Ok(texts)
    }

    async fn list_documents(&self, owner: &str) -> Result<Vec<DocumentRecord>, PipelineError> {
        let documents = self.query_owner_documents(owner).await?;

        let mut records = Vec::new();
        for document in documents {
            let id = document
                .pointer("/id")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if id.is_empty() {
                continue;
            }

            let uploaded_at = document
                .pointer("/uploadedAt")
                .and_then(Value::as_str)
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|parsed| parsed.with_timezone(&Utc))
                .unwrap_or_else(Utc::now);

            records.push(DocumentRecord {
                document_id: id.to_string(),
                owner: owner.to_string(),
                filename: document
                    .pointer("/filename")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                text: document
                    .pointer("/text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                checksum: document
                    .pointer("/checksum")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                uploaded_at,
            });
        }

        records.sort_by(|left, right| left.document_id.cmp(&right.document_id));
        Ok(records)
    }

    async fn put_document(&self, record: &DocumentRecord) -> Result<(), PipelineError> {
        let response = self
            .client
            .post(self.docs_url())
            .bearer_auth(&self.api_key)
            .json(&json!({
                "id": record.document_id,
                "partitionKey": record.owner,
                "filename": record.filename,
                "text": record.text,
                "checksum": record.checksum,
                "uploadedAt": record.uploaded_at.to_rfc3339(),
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::Store {
                backend: "cosmos".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(())
    }
}
