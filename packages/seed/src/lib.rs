//! Seeds the `vocabulary` collection from the bundled word list.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use lexideck_client::backend::{
    BackendError, DocumentStore, WriteBatch, MAX_BATCH_WRITES, VOCABULARY_COLLECTION,
};
use lexideck_client::models::VocabularyEntry;

const VOCABULARY_JSON: &str = include_str!("../data/vocabulary.json");

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("invalid vocabulary data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("batch {batch} failed: {source}")]
    Upload {
        batch: usize,
        #[source]
        source: BackendError,
    },
}

/// One row of the bundled word list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeedWord {
    pub word: String,
    #[serde(default)]
    pub adjective: Option<String>,
    #[serde(default)]
    pub noun: Option<String>,
    #[serde(default)]
    pub example: Option<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

impl SeedWord {
    pub fn into_entry(self) -> VocabularyEntry {
        VocabularyEntry {
            adjective: self.adjective,
            noun: self.noun,
            example: self.example,
            synonyms: self.synonyms,
            ..VocabularyEntry::new(self.word)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub total: usize,
    pub batches: usize,
    pub uploaded: Vec<String>,
}

pub fn load_vocabulary() -> Result<Vec<SeedWord>, SeedError> {
    parse_vocabulary(VOCABULARY_JSON)
}

pub fn parse_vocabulary(json: &str) -> Result<Vec<SeedWord>, SeedError> {
    Ok(serde_json::from_str(json)?)
}

/// Keeps the first occurrence of every word.
pub fn dedupe_by_word(words: Vec<SeedWord>) -> Vec<SeedWord> {
    let mut seen = HashSet::new();
    words
        .into_iter()
        .filter(|item| {
            let first = seen.insert(item.word.clone());
            if !first {
                warn!(word = %item.word, "duplicate found, skipping");
            }
            first
        })
        .collect()
}

/// Writes `words` (deduplicated) in batches of at most `batch_size`,
/// each document keyed by its word.
pub async fn upload(
    store: &dyn DocumentStore,
    words: Vec<SeedWord>,
    batch_size: usize,
    now: DateTime<Utc>,
) -> Result<SeedReport, SeedError> {
    let total = words.len();
    info!(total, "vocabulary loaded");

    let entries: Vec<VocabularyEntry> = dedupe_by_word(words)
        .into_iter()
        .map(SeedWord::into_entry)
        .collect();
    info!(unique = entries.len(), "uploading unique words");

    let batch_size = batch_size.clamp(1, MAX_BATCH_WRITES);
    let mut uploaded = Vec::with_capacity(entries.len());
    let mut batches = 0;

    for (index, chunk) in entries.chunks(batch_size).enumerate() {
        let mut batch = WriteBatch::new();
        for entry in chunk {
            batch.set(VOCABULARY_COLLECTION, &entry.id, entry.to_fields(now));
        }

        let batch_no = index + 1;
        store
            .commit(batch)
            .await
            .map_err(|source| SeedError::Upload {
                batch: batch_no,
                source,
            })?;

        batches = batch_no;
        uploaded.extend(chunk.iter().map(|entry| entry.word.clone()));
        info!(batch = batch_no, words = chunk.len(), "batch uploaded");
        info!(
            uploaded = uploaded.len(),
            unique = entries.len(),
            "upload progress"
        );
    }

    info!(count = uploaded.len(), "all vocabulary data uploaded");
    for (index, word) in uploaded.iter().enumerate() {
        info!("{}. {}", index + 1, word);
    }

    Ok(SeedReport {
        total,
        batches,
        uploaded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(w: &str, example: &str) -> SeedWord {
        SeedWord {
            word: w.to_string(),
            adjective: None,
            noun: None,
            example: Some(example.to_string()),
            synonyms: Vec::new(),
        }
    }

    #[test]
    fn first_occurrence_wins() {
        let words = vec![word("a", "first"), word("b", "only"), word("a", "second")];
        let unique = dedupe_by_word(words);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0], word("a", "first"));
        assert_eq!(unique[1].word, "b");
    }

    #[test]
    fn bundled_list_parses_and_is_unique() {
        let words = load_vocabulary().unwrap();
        assert!(!words.is_empty());
        assert_eq!(dedupe_by_word(words.clone()).len(), words.len());
        assert!(words.iter().all(|w| !w.word.is_empty()));
    }

    #[test]
    fn into_entry_keys_by_word() {
        let entry = word("focus", "Please focus.").into_entry();
        assert_eq!(entry.id, "focus");
        assert_eq!(entry.example.as_deref(), Some("Please focus."));
    }
}
