use crate::config::FirestoreConfig;
use crate::models::Document;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::info;

const FIRESTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const JWT_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

#[derive(Debug, Error)]
pub enum FirestoreError {
    #[error("failed to read service account key {path}: {source}")]
    Credentials {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid service account key: {0}")]
    InvalidKey(#[from] jsonwebtoken::errors::Error),
    #[error("token exchange failed: {0}")]
    TokenExchange(String),
    #[error("firestore request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Read side of the pipeline: anything that can list a collection of
/// documents. The trainer only ever reads whole collections.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>>;
}

#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    project_id: String,
    client_email: String,
    private_key: String,
    token_uri: String,
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: HashMap<String, serde_json::Value>,
}

impl RawDocument {
    fn into_document(self) -> Document {
        // the document id is the last segment of the resource name
        let id = self
            .name
            .rsplit('/')
            .next()
            .unwrap_or(self.name.as_str())
            .to_string();
        Document::new(id, self.fields)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    next_page_token: Option<String>,
}

/// Authenticated Firestore REST client. Construction performs the full
/// service-account handshake; any failure there is fatal to the run.
pub struct FirestoreClient {
    http: reqwest::Client,
    access_token: String,
    project_id: String,
    page_size: usize,
}

impl FirestoreClient {
    pub async fn connect(config: &FirestoreConfig) -> Result<Self> {
        let raw = std::fs::read_to_string(&config.credentials_path).map_err(|source| {
            FirestoreError::Credentials {
                path: config.credentials_path.clone(),
                source,
            }
        })?;
        let key: ServiceAccountKey =
            serde_json::from_str(&raw).context("malformed service account key")?;

        let http = reqwest::Client::new();
        let access_token = exchange_token(&http, &key).await?;
        let project_id = config
            .project_id
            .clone()
            .unwrap_or_else(|| key.project_id.clone());

        info!("Authenticated to Firestore project {}", project_id);

        Ok(Self {
            http,
            access_token,
            project_id,
            page_size: config.page_size,
        })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "https://firestore.googleapis.com/v1/projects/{}/databases/(default)/documents/{}",
            self.project_id, collection
        )
    }

    async fn fetch_page(
        &self,
        collection: &str,
        page_token: Option<&str>,
    ) -> Result<(Vec<Document>, Option<String>)> {
        let mut request = self
            .http
            .get(self.collection_url(collection))
            .bearer_auth(&self.access_token)
            .query(&[("pageSize", self.page_size.to_string())]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(FirestoreError::Request)?;
        let body: ListDocumentsResponse = response.json().await.map_err(FirestoreError::Request)?;

        let documents = body
            .documents
            .into_iter()
            .map(RawDocument::into_document)
            .collect();
        Ok((documents, body.next_page_token))
    }

    /// Pages through a collection lazily. The stream is finite and not
    /// restartable; a fresh call starts a new read.
    pub fn stream_documents<'a>(&'a self, collection: &'a str) -> BoxStream<'a, Result<Document>> {
        // state: Some(page token to fetch with) or None once drained
        stream::try_unfold(Some(None::<String>), move |state| async move {
            let Some(token) = state else { return Ok::<_, anyhow::Error>(None) };
            let (documents, next_token) = self.fetch_page(collection, token.as_deref()).await?;
            Ok(Some((
                stream::iter(documents.into_iter().map(Ok)),
                next_token.map(Some),
            )))
        })
        .try_flatten()
        .boxed()
    }
}

#[async_trait]
impl DocumentSource for FirestoreClient {
    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>> {
        self.stream_documents(collection).try_collect().await
    }
}

async fn exchange_token(
    http: &reqwest::Client,
    key: &ServiceAccountKey,
) -> Result<String, FirestoreError> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        iss: &key.client_email,
        scope: FIRESTORE_SCOPE,
        aud: &key.token_uri,
        iat: now,
        exp: now + 3600,
    };
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
    let assertion = encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)?;

    let params = [
        ("grant_type", JWT_GRANT_TYPE),
        ("assertion", assertion.as_str()),
    ];
    let response = http.post(&key.token_uri).form(&params).send().await?;
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(FirestoreError::TokenExchange(format!("{status}: {body}")));
    }

    let token: TokenResponse = response.json().await?;
    Ok(token.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_id_from_resource_name() {
        let raw = RawDocument {
            name: "projects/homeswipe/databases/(default)/documents/homes/12345".to_string(),
            fields: HashMap::new(),
        };
        assert_eq!(raw.into_document().id, "12345");
    }

    #[test]
    fn test_list_response_decodes_typed_fields() {
        let body = json!({
            "documents": [{
                "name": "projects/p/databases/(default)/documents/swipes/s1",
                "fields": {
                    "userId": {"stringValue": "A"},
                    "action": {"stringValue": "like"}
                }
            }],
            "nextPageToken": "tok"
        });

        let parsed: ListDocumentsResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.next_page_token.as_deref(), Some("tok"));
        let doc = parsed.documents.into_iter().next().unwrap().into_document();
        assert_eq!(doc.id, "s1");
        assert_eq!(doc.string_field("userId"), Some("A"));
        assert_eq!(doc.string_field("action"), Some("like"));
    }

    #[test]
    fn test_empty_collection_response() {
        let parsed: ListDocumentsResponse = serde_json::from_value(json!({})).unwrap();
        assert!(parsed.documents.is_empty());
        assert!(parsed.next_page_token.is_none());
    }
}
