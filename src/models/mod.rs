use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One document read from Firestore: its id plus the raw field map.
///
/// Home documents use the Zillow zpid as the document id; swipe documents
/// carry `userId`, `homeId` and `action` fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: HashMap<String, serde_json::Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: HashMap<String, serde_json::Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Reads a string field, accepting both plain JSON strings and
    /// Firestore's typed wrapper (`{"stringValue": "..."}`).
    pub fn string_field(&self, name: &str) -> Option<&str> {
        match self.fields.get(name)? {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Object(map) => map.get("stringValue").and_then(|v| v.as_str()),
            _ => None,
        }
    }
}

/// A normalized swipe: the action field collapsed to a binary rating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwipeRecord {
    pub user_id: String,
    pub home_id: String,
    pub rating: f32,
}

/// A swipe with both identifiers resolved to dense embedding-table indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingTriple {
    pub user_idx: usize,
    pub home_idx: usize,
    pub rating: f32,
}

/// The exported model: both embedding tables plus the id vocabularies
/// (in index order) the browser runtime needs to resolve indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub embedding_dim: usize,
    pub user_ids: Vec<String>,
    pub home_ids: Vec<String>,
    pub user_embedding_weights: Vec<Vec<f32>>,
    pub home_embedding_weights: Vec<Vec<f32>>,
}
