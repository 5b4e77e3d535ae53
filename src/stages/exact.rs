use tracing::debug;

use super::{Stage, StageContext, StageKind, StageOutcome};
use crate::canonical::canonicalize_record;
use crate::checklist::Checklist;
use crate::domain::{ChecklistRecord, Submission};
use crate::error::ResolverError;
use crate::normalize::strip_bracketed;

pub struct ExactStage;

impl ExactStage {
    fn single_hit<'a>(checklist: &'a Checklist, name: &str) -> Option<&'a ChecklistRecord> {
        let mut hits = checklist.records_named(name);
        if hits.is_empty() {
            let stripped = strip_bracketed(name);
            if stripped != name {
                hits = checklist.records_named(&stripped);
            }
        }
        match hits.as_slice() {
            [record] => Some(record),
            [] => None,
            _ => {
                debug!(name, hits = hits.len(), "several checklist records share the name");
                None
            }
        }
    }
}

impl Stage for ExactStage {
    fn kind(&self) -> StageKind {
        StageKind::Exact
    }

    fn attempt(
        &self,
        ctx: &StageContext<'_>,
        unresolved: Vec<Submission>,
    ) -> Result<StageOutcome, ResolverError> {
        let mut outcome = StageOutcome::default();
        for submission in unresolved {
            match Self::single_hit(ctx.checklist, &submission.name) {
                Some(record) => {
                    let taxon = canonicalize_record(ctx.checklist, record)?;
                    outcome.settle(submission, taxon, StageKind::Exact);
                }
                None => outcome.unresolved.push(submission),
            }
        }
        Ok(outcome)
    }
}
