use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::ContentStore;
use crate::checklist::{Checklist, ChecklistFilter};
use crate::diagnostics::{DiagnosticLog, UNMATCHED_SAMPLES};
use crate::domain::{ResolveScope, ResolvedTaxon, Submission};
use crate::error::ResolverError;
use crate::matcher::NameMatcher;
use crate::stages::{ManualOverrides, StageContext, StageKind, StageOrder, stage_chain};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRow {
    pub index: usize,
    pub submitted: Option<String>,
    #[serde(flatten)]
    pub taxon: ResolvedTaxon,
    pub stage: Option<StageKind>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionSummary {
    pub rows: usize,
    pub empty_rows: usize,
    pub distinct_names: usize,
    pub resolved_by: BTreeMap<StageKind, usize>,
    pub unresolved_names: usize,
    pub diagnostics: Vec<String>,
}

impl ResolutionSummary {
    pub fn resolved_names(&self) -> usize {
        self.resolved_by.values().sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolutionTable {
    pub rows: Vec<ResolvedRow>,
    pub summary: ResolutionSummary,
}

impl ResolutionTable {
    pub fn taxa(&self) -> impl Iterator<Item = (usize, &ResolvedTaxon)> {
        self.rows.iter().map(|row| (row.index, &row.taxon))
    }
}

pub struct Resolver<M: NameMatcher> {
    checklist: Checklist,
    matcher: M,
    overrides: ManualOverrides,
    diagnostics: Arc<dyn ContentStore>,
    stage_order: StageOrder,
    keep_unmatched: bool,
}

impl<M: NameMatcher> Resolver<M> {
    pub fn new(checklist: Checklist, matcher: M, diagnostics: Arc<dyn ContentStore>) -> Self {
        Self {
            checklist,
            matcher,
            overrides: ManualOverrides::default(),
            diagnostics,
            stage_order: StageOrder::default(),
            keep_unmatched: true,
        }
    }

    pub fn with_overrides(mut self, overrides: ManualOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_stage_order(mut self, order: StageOrder) -> Self {
        self.stage_order = order;
        self
    }

    pub fn keep_unmatched(mut self, keep: bool) -> Self {
        self.keep_unmatched = keep;
        self
    }

    pub fn checklist(&self) -> &Checklist {
        &self.checklist
    }

    pub fn resolve(
        &self,
        rows: &[Option<String>],
        scope: &ResolveScope,
    ) -> Result<ResolutionTable, ResolverError> {
        let mut summary = ResolutionSummary {
            rows: rows.len(),
            ..ResolutionSummary::default()
        };

        let mut distinct: Vec<Submission> = Vec::new();
        let mut row_names: Vec<Option<String>> = Vec::with_capacity(rows.len());
        let mut seen: HashMap<String, usize> = HashMap::new();
        for row in rows {
            let raw = row.as_deref().map(str::trim).filter(|raw| !raw.is_empty());
            let Some(raw) = raw else {
                summary.empty_rows += 1;
                row_names.push(None);
                continue;
            };
            let submission = Submission::new(raw);
            if !seen.contains_key(&submission.name) {
                seen.insert(submission.name.clone(), distinct.len());
                distinct.push(submission.clone());
            }
            row_names.push(Some(submission.name));
        }
        if summary.empty_rows > 0 {
            warn!(rows = summary.empty_rows, "empty submissions skipped");
        }
        summary.distinct_names = distinct.len();

        let scoped;
        let checklist = match &scope.families {
            Some(families) => {
                scoped = self.checklist.filtered(&ChecklistFilter {
                    families: Some(families.clone()),
                    ..ChecklistFilter::default()
                });
                info!(families = ?families, records = scoped.len(), "scoped checklist");
                &scoped
            }
            None => &self.checklist,
        };
        let diagnostics = DiagnosticLog::new(self.diagnostics.clone());
        let ctx = StageContext {
            checklist,
            full_checklist: &self.checklist,
            ranks: scope.ranks.as_deref(),
            diagnostics: &diagnostics,
        };

        let mut resolved: HashMap<String, (ResolvedTaxon, StageKind)> = HashMap::new();
        let mut pending = distinct;
        for stage in stage_chain(self.stage_order, &self.matcher, &self.overrides) {
            if pending.is_empty() {
                break;
            }
            let entering = pending.len();
            let outcome = stage.attempt(&ctx, pending)?;
            debug!(
                stage = %stage.kind(),
                entering,
                resolved = outcome.resolved.len(),
                "stage finished"
            );
            for resolution in outcome.resolved {
                *summary.resolved_by.entry(resolution.stage).or_insert(0) += 1;
                resolved.insert(
                    resolution.submission.name,
                    (resolution.taxon, resolution.stage),
                );
            }
            pending = outcome.unresolved;
        }

        summary.unresolved_names = pending.len();
        let unmatched: Vec<Vec<String>> = pending
            .iter()
            .map(|submission| vec![submission.raw.clone(), submission.name.clone()])
            .collect();
        diagnostics.report(UNMATCHED_SAMPLES, &["submitted", "normalized"], &unmatched)?;
        summary.diagnostics = diagnostics.written();

        let mut output = Vec::with_capacity(rows.len());
        for (index, name) in row_names.into_iter().enumerate() {
            let found = name.as_ref().and_then(|name| resolved.get(name));
            let row = match found {
                Some((taxon, stage)) => ResolvedRow {
                    index,
                    submitted: rows[index].clone(),
                    taxon: taxon.clone(),
                    stage: Some(*stage),
                },
                None if self.keep_unmatched => ResolvedRow {
                    index,
                    submitted: rows[index].clone(),
                    taxon: ResolvedTaxon::unresolved(),
                    stage: None,
                },
                None => continue,
            };
            output.push(row);
        }
        info!(
            rows = summary.rows,
            resolved = summary.resolved_names(),
            unresolved = summary.unresolved_names,
            "resolution finished"
        );

        Ok(ResolutionTable {
            rows: output,
            summary,
        })
    }
}
