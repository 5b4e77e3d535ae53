use std::collections::{BTreeSet, HashMap};

use tracing::{debug, error, info};

use super::{Candidate, Stage, StageContext, StageKind, StageOutcome, disambiguate};
use crate::canonical::id_lookup;
use crate::diagnostics::UNMATCHED_MULTIPLE_HITS;
use crate::domain::{ResolvedTaxon, Submission};
use crate::error::ResolverError;
use crate::matcher::{MatchRecord, MatchState, NameMatcher};

pub struct RemoteStage<'a> {
    matcher: &'a dyn NameMatcher,
}

impl<'a> RemoteStage<'a> {
    pub fn new(matcher: &'a dyn NameMatcher) -> Self {
        Self { matcher }
    }
}

impl Stage for RemoteStage<'_> {
    fn kind(&self) -> StageKind {
        StageKind::Remote
    }

    fn attempt(
        &self,
        ctx: &StageContext<'_>,
        unresolved: Vec<Submission>,
    ) -> Result<StageOutcome, ResolverError> {
        if unresolved.is_empty() {
            return Ok(StageOutcome::default());
        }
        let names: Vec<String> = unresolved
            .iter()
            .map(|submission| submission.name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        info!(names = names.len(), "matching names remotely");
        let records = self.matcher.match_names(&names).inspect_err(|err| {
            error!(error = %err, "remote name matching failed");
        })?;

        let mut groups: HashMap<&str, Vec<&MatchRecord>> = HashMap::new();
        for record in &records {
            groups
                .entry(record.submitted.as_str())
                .or_default()
                .push(record);
        }

        let mut outcome = StageOutcome::default();
        let mut ambiguous = Vec::new();
        for submission in unresolved {
            let Some(group) = groups.get(submission.name.as_str()) else {
                debug!(name = %submission.name, "matcher returned nothing for name");
                outcome.unresolved.push(submission);
                continue;
            };
            match group[0].match_state {
                MatchState::Single => {
                    let taxon = match group[0].external_id.as_deref() {
                        Some(id) => id_lookup(ctx.checklist, id)?,
                        None => ResolvedTaxon::unresolved(),
                    };
                    outcome.settle(submission, taxon, StageKind::Remote);
                }
                MatchState::Multiple => {
                    let candidates = group
                        .iter()
                        .filter_map(|record| record.external_id.as_deref())
                        .map(|id| {
                            id_lookup(ctx.checklist, id).map(|taxon| Candidate {
                                external_id: id.to_string(),
                                taxon,
                            })
                        })
                        .collect::<Result<Vec<_>, ResolverError>>()?;
                    match disambiguate(&submission.name, &candidates) {
                        Some(taxon) => outcome.settle(submission, taxon, StageKind::Disambiguated),
                        None => {
                            ambiguous.extend(group.iter().map(|record| {
                                vec![
                                    submission.raw.clone(),
                                    record.submitted.clone(),
                                    record.external_id.clone().unwrap_or_default(),
                                    record.matched_name.clone().unwrap_or_default(),
                                ]
                            }));
                            outcome.unresolved.push(submission);
                        }
                    }
                }
                MatchState::NoMatch => outcome.unresolved.push(submission),
            }
        }

        ctx.diagnostics.report(
            UNMATCHED_MULTIPLE_HITS,
            &["submitted", "normalized", "external_id", "matched_name"],
            &ambiguous,
        )?;
        Ok(outcome)
    }
}
