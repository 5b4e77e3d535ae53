use std::collections::BTreeSet;

use tracing::debug;

use super::{Stage, StageContext, StageKind, StageOutcome};
use crate::canonical::canonicalize_record;
use crate::diagnostics::UNMATCHED_TO_AUTORESOLVE;
use crate::domain::{ChecklistRecord, Rank, Submission};
use crate::error::ResolverError;

/// Accepts the most specific accepted name found inside the submission,
/// e.g. `Aspidosperma album var. tenax` in
/// `Aspidosperma album var. tenax (Mart.) Lundell, det. 1987`.
pub struct ContainmentStage;

impl ContainmentStage {
    fn contained<'a>(ctx: &StageContext<'a>, name: &str) -> Vec<&'a ChecklistRecord> {
        ctx.checklist
            .accepted()
            .filter(|record| record.rank.specificity().is_some())
            .filter(|record| in_scope(ctx.ranks, &record.rank))
            .filter(|record| name.contains(record.name.as_str()))
            .collect()
    }

    fn pick<'a>(name: &str, mut candidates: Vec<&'a ChecklistRecord>) -> Option<&'a ChecklistRecord> {
        if name.contains(' ') {
            candidates.retain(|record| record.rank != Rank::Genus);
        }
        let tier = candidates
            .iter()
            .filter_map(|record| record.rank.specificity())
            .min()?;
        let best: Vec<&ChecklistRecord> = candidates
            .into_iter()
            .filter(|record| record.rank.specificity() == Some(tier))
            .collect();
        let ids: BTreeSet<&str> = best.iter().map(|record| record.id.as_str()).collect();
        if ids.len() == 1 {
            best.first().copied()
        } else {
            debug!(name, candidates = ids.len(), "contained names are ambiguous");
            None
        }
    }
}

fn in_scope(ranks: Option<&[Rank]>, rank: &Rank) -> bool {
    ranks.is_none_or(|ranks| ranks.contains(rank))
}

impl Stage for ContainmentStage {
    fn kind(&self) -> StageKind {
        StageKind::Containment
    }

    fn attempt(
        &self,
        ctx: &StageContext<'_>,
        unresolved: Vec<Submission>,
    ) -> Result<StageOutcome, ResolverError> {
        let entering: Vec<Vec<String>> = unresolved
            .iter()
            .map(|submission| vec![submission.raw.clone(), submission.name.clone()])
            .collect();
        ctx.diagnostics
            .report(UNMATCHED_TO_AUTORESOLVE, &["submitted", "normalized"], &entering)?;

        let mut outcome = StageOutcome::default();
        for submission in unresolved {
            let candidates = Self::contained(ctx, &submission.name);
            match Self::pick(&submission.name, candidates) {
                Some(record) => {
                    let taxon = canonicalize_record(ctx.checklist, record)?;
                    outcome.settle(submission, taxon, StageKind::Containment);
                }
                None => outcome.unresolved.push(submission),
            }
        }
        Ok(outcome)
    }
}
