//! Cloud Firestore over its REST API (`documents:runQuery`, `documents:commit`).

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::backend::{
    BackendError, Document, DocumentStore, FieldValue, IdTokenSlot, PageQuery, WriteBatch,
};
use crate::config::Config;

pub struct FirestoreClient {
    client: Client,
    base_url: String,
    project_id: String,
    database: String,
    api_key: Option<String>,
    id_token: IdTokenSlot,
}

#[derive(Deserialize)]
struct RunQueryItem {
    document: Option<RawDocument>,
}

#[derive(Serialize, Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: BTreeMap<String, FieldValue>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl FirestoreClient {
    pub fn new(config: &Config, id_token: IdTokenSlot) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| BackendError::unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.firestore_base_url.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            database: config.database.clone(),
            api_key: config.firebase_api_key.clone(),
            id_token,
        })
    }

    fn documents_root(&self) -> String {
        format!(
            "projects/{}/databases/{}/documents",
            self.project_id, self.database
        )
    }

    fn document_name(&self, collection: &str, document_id: &str) -> String {
        format!("{}/{}/{}", self.documents_root(), collection, document_id)
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/v1/{}:{}", self.base_url, self.documents_root(), method)
    }

    fn post(&self, url: &str) -> RequestBuilder {
        let mut request = self.client.post(url);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key)]);
        }
        if let Some(token) = self.id_token.read().as_deref() {
            request = request.bearer_auth(token);
        }
        request
    }

    fn structured_query(query: &PageQuery) -> serde_json::Value {
        let mut structured = json!({
            "from": [{ "collectionId": query.collection }],
            "orderBy": [{
                "field": { "fieldPath": query.order_by },
                "direction": "ASCENDING"
            }],
            "limit": query.limit,
        });

        // `word` is unique, so the ordering value alone pins the position.
        if let Some(cursor) = &query.start_after {
            structured["startAt"] = json!({
                "values": [cursor.key],
                "before": false,
            });
        }

        json!({ "structuredQuery": structured })
    }
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn run_query(&self, query: &PageQuery) -> Result<Vec<Document>, BackendError> {
        let response = self
            .post(&self.endpoint("runQuery"))
            .json(&Self::structured_query(query))
            .send()
            .await
            .map_err(|e| BackendError::unavailable(e.to_string()))?;

        let response = check_status(response).await?;
        let items: Vec<RunQueryItem> = response
            .json()
            .await
            .map_err(|e| BackendError::new("data-loss", e.to_string()))?;

        let documents: Vec<Document> = items
            .into_iter()
            .filter_map(|item| item.document)
            .map(|raw| Document {
                id: raw.name.rsplit('/').next().unwrap_or_default().to_string(),
                fields: raw.fields,
            })
            .collect();

        tracing::debug!(
            collection = %query.collection,
            count = documents.len(),
            "firestore query completed"
        );

        Ok(documents)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), BackendError> {
        batch.check_size()?;
        let count = batch.len();

        let writes: Vec<serde_json::Value> = batch
            .into_writes()
            .into_iter()
            .map(|write| {
                let update = RawDocument {
                    name: self.document_name(&write.collection, &write.document_id),
                    fields: write.fields,
                };
                json!({ "update": update })
            })
            .collect();

        let response = self
            .post(&self.endpoint("commit"))
            .json(&json!({ "writes": writes }))
            .send()
            .await
            .map_err(|e| BackendError::unavailable(e.to_string()))?;

        check_status(response).await?;
        tracing::debug!(writes = count, "firestore batch committed");
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response, BackendError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(parse_error(status.as_u16(), &body))
}

/// Maps `{"error": {"status": "PERMISSION_DENIED", ...}}` onto the SDK's
/// code spelling (`permission-denied`).
fn parse_error(http_status: u16, body: &str) -> BackendError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.status.is_empty() => BackendError::new(
            envelope.error.status.to_ascii_lowercase().replace('_', "-"),
            envelope.error.message,
        ),
        _ => BackendError::new("unknown", format!("HTTP {http_status}: {body}")),
    }
}
