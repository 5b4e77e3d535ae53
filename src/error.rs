use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ResolverError {
    #[error("invalid rank: {0}")]
    InvalidRank(String),

    #[error("invalid taxonomic status: {0}")]
    InvalidStatus(String),

    #[error("invalid stage order: {0}")]
    InvalidStageOrder(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("checklist download failed: {0}")]
    ChecklistHttp(String),

    #[error("checklist server returned status {status}: {message}")]
    ChecklistStatus { status: u16, message: String },

    #[error("checklist archive contains no checklist table: {0}")]
    ChecklistMissing(String),

    #[error("failed to parse checklist: {0}")]
    ChecklistParse(String),

    #[error("checklist id {id} maps to {count} records")]
    #[diagnostic(help("the checklist must guarantee id uniqueness; re-download or repair it"))]
    DuplicateChecklistId { id: String, count: usize },

    #[error("no parent derivation rule for {id} (status {status}, rank {rank}): {reason}")]
    #[diagnostic(help("the checklist contains a rank/status combination the resolver does not model"))]
    UnmodeledTaxonState {
        id: String,
        status: String,
        rank: String,
        reason: String,
    },

    #[error("name matching request failed: {0}")]
    MatcherHttp(String),

    #[error("name matching service returned status {status}: {message}")]
    MatcherStatus { status: u16, message: String },

    #[error("name matching service returned an unreadable response: {0}")]
    MatcherResponse(String),

    #[error("column not found in {file}: {column}")]
    MissingColumn { file: String, column: String },

    #[error("failed to read table: {0}")]
    TableRead(String),

    #[error("failed to write table: {0}")]
    TableWrite(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl ResolverError {
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            ResolverError::DuplicateChecklistId { .. } | ResolverError::UnmodeledTaxonState { .. }
        )
    }
}
