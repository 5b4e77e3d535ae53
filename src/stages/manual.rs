use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use super::{Stage, StageContext, StageKind, StageOutcome};
use crate::canonical::id_lookup;
use crate::domain::Submission;
use crate::error::ResolverError;
use crate::normalize::normalize_submission;

#[derive(Debug, Deserialize)]
struct OverrideRow {
    submitted: String,
    resolution_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualOverrides {
    entries: HashMap<String, String>,
}

impl ManualOverrides {
    /// A missing file is an empty table.
    pub fn read(path: &Path) -> Result<Self, ResolverError> {
        if !path.exists() {
            warn!(path = %path.display(), "manual override table not found, continuing without it");
            return Ok(Self::default());
        }
        let file = fs::File::open(path)
            .map_err(|err| ResolverError::TableRead(format!("{}: {err}", path.display())))?;
        let overrides = Self::from_reader(file)?;
        info!(path = %path.display(), entries = overrides.len(), "loaded manual overrides");
        Ok(overrides)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ResolverError> {
        let mut entries = HashMap::new();
        for row in csv::Reader::from_reader(reader).deserialize::<OverrideRow>() {
            let row = row.map_err(|err| ResolverError::TableRead(err.to_string()))?;
            let id = row.resolution_id.trim();
            if id.is_empty() {
                continue;
            }
            entries.insert(normalize_submission(&row.submitted), id.to_string());
        }
        Ok(Self { entries })
    }

    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(submitted, id)| (normalize_submission(submitted), id.to_string()))
                .collect(),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct ManualStage<'a> {
    overrides: &'a ManualOverrides,
}

impl<'a> ManualStage<'a> {
    pub fn new(overrides: &'a ManualOverrides) -> Self {
        Self { overrides }
    }
}

impl Stage for ManualStage<'_> {
    fn kind(&self) -> StageKind {
        StageKind::Manual
    }

    fn attempt(
        &self,
        ctx: &StageContext<'_>,
        unresolved: Vec<Submission>,
    ) -> Result<StageOutcome, ResolverError> {
        let mut outcome = StageOutcome::default();
        for submission in unresolved {
            match self.overrides.lookup(&submission.name) {
                Some(id) => {
                    let taxon = id_lookup(ctx.full_checklist, id)?;
                    outcome.settle(submission, taxon, StageKind::Manual);
                }
                None => outcome.unresolved.push(submission),
            }
        }
        Ok(outcome)
    }
}
