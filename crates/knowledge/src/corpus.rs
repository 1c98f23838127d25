//! Study corpus lookups.

use crate::types::StudyRecord;
use std::collections::HashMap;
use std::path::Path;
use studyqa_core::{AppError, AppResult};

/// Read-only source of authoritative study records.
#[async_trait::async_trait]
pub trait StudyCorpus: Send + Sync {
    /// Look up a study by its identifier. `Ok(None)` when unknown.
    async fn lookup(&self, study_id: &str) -> AppResult<Option<StudyRecord>>;

    /// Number of studies available.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Corpus backed by a JSON array of `{StudyId, StudyName, Description}`.
///
/// The file is read once and indexed by id; the first record wins when an
/// id repeats.
#[derive(Debug, Default)]
pub struct JsonStudyCorpus {
    studies: HashMap<String, StudyRecord>,
}

impl JsonStudyCorpus {
    /// Load and index the corpus file.
    pub fn load(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Corpus(format!("Failed to read studies file {:?}: {}", path, e))
        })?;

        let records: Vec<StudyRecord> = serde_json::from_str(&contents).map_err(|e| {
            AppError::Corpus(format!("Failed to parse studies file {:?}: {}", path, e))
        })?;

        let corpus = Self::from_records(records);
        tracing::info!(studies = corpus.len(), "Loaded study corpus from {:?}", path);
        Ok(corpus)
    }

    /// Index records already in memory.
    pub fn from_records(records: impl IntoIterator<Item = StudyRecord>) -> Self {
        let mut studies = HashMap::new();
        for record in records {
            if studies.contains_key(&record.study_id) {
                tracing::warn!(study_id = %record.study_id, "Duplicate study id in corpus; keeping first");
                continue;
            }
            studies.insert(record.study_id.clone(), record);
        }
        Self { studies }
    }
}

#[async_trait::async_trait]
impl StudyCorpus for JsonStudyCorpus {
    async fn lookup(&self, study_id: &str) -> AppResult<Option<StudyRecord>> {
        Ok(self.studies.get(study_id).cloned())
    }

    fn len(&self) -> usize {
        self.studies.len()
    }
}
