use crate::models::{Document, SwipeRecord, TrainingTriple};
use std::collections::HashMap;
use tracing::warn;

/// Filters malformed swipe documents and collapses the action field to a
/// binary rating. Documents missing any of `userId`, `homeId` or `action`
/// are skipped and counted, with a warning naming the document.
#[derive(Debug, Default)]
pub struct SwipeNormalizer {
    records: Vec<SwipeRecord>,
    skipped: usize,
}

impl SwipeNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, doc: &Document) {
        let (Some(user_id), Some(home_id), Some(action)) = (
            doc.string_field("userId"),
            doc.string_field("homeId"),
            doc.string_field("action"),
        ) else {
            warn!(
                "Skipping swipe doc {}: missing one of userId/homeId/action",
                doc.id
            );
            self.skipped += 1;
            return;
        };

        self.records.push(SwipeRecord {
            user_id: user_id.to_string(),
            home_id: home_id.to_string(),
            rating: if action == "like" { 1.0 } else { 0.0 },
        });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn finish(self) -> (Vec<SwipeRecord>, usize) {
        (self.records, self.skipped)
    }
}

/// Insertion-ordered bijection from opaque string identifiers onto the
/// contiguous range [0, len).
#[derive(Debug, Clone, Default)]
pub struct IdIndex {
    forward: HashMap<String, usize>,
    order: Vec<String>,
}

impl IdIndex {
    pub fn from_ids<I>(ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut index = Self::default();
        for id in ids {
            index.insert(id.into());
        }
        index
    }

    fn insert(&mut self, id: String) {
        if !self.forward.contains_key(&id) {
            self.forward.insert(id.clone(), self.order.len());
            self.order.push(id);
        }
    }

    pub fn get(&self, id: &str) -> Option<usize> {
        self.forward.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Identifiers in index order.
    pub fn ids(&self) -> &[String] {
        &self.order
    }
}

/// The triples table plus the index mappings it was built with.
#[derive(Debug, Clone)]
pub struct TrainingFrame {
    pub triples: Vec<TrainingTriple>,
    pub user_index: IdIndex,
    pub home_index: IdIndex,
}

/// Builds both index mappings (users from the swipes, homes from the full
/// catalog) and resolves every record to a training triple. Records whose
/// user or home id is not in its mapping are dropped.
pub fn build_training_frame(records: &[SwipeRecord], home_ids: &[String]) -> TrainingFrame {
    let user_index = IdIndex::from_ids(records.iter().map(|r| r.user_id.clone()));
    let home_index = IdIndex::from_ids(home_ids.iter().cloned());

    let triples = records
        .iter()
        .filter_map(|record| {
            let user_idx = user_index.get(&record.user_id)?;
            let home_idx = home_index.get(&record.home_id)?;
            Some(TrainingTriple {
                user_idx,
                home_idx,
                rating: record.rating,
            })
        })
        .collect();

    TrainingFrame {
        triples,
        user_index,
        home_index,
    }
}
