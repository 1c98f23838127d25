//! Core types for study retrieval.

use serde::{Deserialize, Serialize};

/// One result of a similarity search, before hydration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedHit {
    /// Index-assigned point identifier
    pub point_id: String,

    /// `"<study_id>.<suffix>"` identifier read from the hit payload,
    /// `None` when the payload field is missing or not a string
    pub external_id: Option<String>,

    /// Similarity score reported by the index
    pub relevance_score: f32,

    /// Free-form metadata stored alongside the point
    pub raw_metadata: serde_json::Value,
}

/// Authoritative study description from the corpus file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyRecord {
    #[serde(rename = "StudyId")]
    pub study_id: String,

    #[serde(rename = "StudyName", default)]
    pub name: String,

    #[serde(rename = "Description", default)]
    pub description: String,
}

impl StudyRecord {
    /// Text block shown to the model for this study.
    pub fn to_context_block(&self) -> String {
        format!("{} ({}): \n {}", self.name, self.study_id, self.description)
    }
}

/// Provenance attached to a hydrated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub relevance_score: f32,
    pub study_id: String,
    pub source_collection: String,
    pub point_id: String,

    /// Payload metadata as stored in the index
    #[serde(default)]
    pub raw: serde_json::Value,
}

/// A retrieval hit joined to its study record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydratedDocument {
    pub study_id: String,

    /// Formatted study block, empty when the corpus has no such study
    pub content: String,

    pub metadata: DocumentMetadata,
}
