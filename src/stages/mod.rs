mod containment;
mod disambiguate;
mod exact;
mod manual;
mod remote;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

pub use containment::ContainmentStage;
pub use disambiguate::{Candidate, disambiguate};
pub use exact::ExactStage;
pub use manual::{ManualOverrides, ManualStage};
pub use remote::RemoteStage;

use crate::checklist::Checklist;
use crate::diagnostics::DiagnosticLog;
use crate::domain::{Rank, ResolvedTaxon, Submission};
use crate::error::ResolverError;
use crate::matcher::NameMatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Exact,
    Remote,
    Disambiguated,
    Containment,
    Manual,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageKind::Exact => "exact",
            StageKind::Remote => "remote",
            StageKind::Disambiguated => "disambiguated",
            StageKind::Containment => "containment",
            StageKind::Manual => "manual",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageOrder {
    #[default]
    ContainmentFirst,
    ManualFirst,
}

impl FromStr for StageOrder {
    type Err = ResolverError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "containment-first" => Ok(StageOrder::ContainmentFirst),
            "manual-first" => Ok(StageOrder::ManualFirst),
            _ => Err(ResolverError::InvalidStageOrder(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub submission: Submission,
    pub taxon: ResolvedTaxon,
    pub stage: StageKind,
}

#[derive(Debug, Default)]
pub struct StageOutcome {
    pub resolved: Vec<Resolution>,
    pub unresolved: Vec<Submission>,
}

impl StageOutcome {
    fn settle(&mut self, submission: Submission, taxon: ResolvedTaxon, stage: StageKind) {
        if taxon.is_resolved() {
            self.resolved.push(Resolution {
                submission,
                taxon,
                stage,
            });
        } else {
            self.unresolved.push(submission);
        }
    }
}

pub struct StageContext<'a> {
    pub checklist: &'a Checklist,
    /// Unscoped checklist, for manual overrides.
    pub full_checklist: &'a Checklist,
    pub ranks: Option<&'a [Rank]>,
    pub diagnostics: &'a DiagnosticLog,
}

pub trait Stage {
    fn kind(&self) -> StageKind;

    fn attempt(
        &self,
        ctx: &StageContext<'_>,
        unresolved: Vec<Submission>,
    ) -> Result<StageOutcome, ResolverError>;
}

pub fn stage_chain<'a>(
    order: StageOrder,
    matcher: &'a dyn NameMatcher,
    overrides: &'a ManualOverrides,
) -> Vec<Box<dyn Stage + 'a>> {
    let mut stages: Vec<Box<dyn Stage + 'a>> =
        vec![Box::new(ExactStage), Box::new(RemoteStage::new(matcher))];
    match order {
        StageOrder::ContainmentFirst => {
            stages.push(Box::new(ContainmentStage));
            stages.push(Box::new(ManualStage::new(overrides)));
        }
        StageOrder::ManualFirst => {
            stages.push(Box::new(ManualStage::new(overrides)));
            stages.push(Box::new(ContainmentStage));
        }
    }
    stages
}
