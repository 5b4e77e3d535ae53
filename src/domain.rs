use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ResolverError;

pub const IPNI_URN_PREFIX: &str = "urn:lsid:ipni.org:names:";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Rank {
    Genus,
    Species,
    Subspecies,
    Variety,
    Subvariety,
    Form,
    Subform,
    Other(String),
}

impl Rank {
    pub fn is_infraspecific(&self) -> bool {
        matches!(
            self,
            Rank::Subspecies | Rank::Variety | Rank::Subvariety | Rank::Form | Rank::Subform
        )
    }

    /// Lower is more specific. Ranks outside genus..infraspecies have no tier.
    pub fn specificity(&self) -> Option<u8> {
        match self {
            rank if rank.is_infraspecific() => Some(0),
            Rank::Species => Some(1),
            Rank::Genus => Some(2),
            _ => None,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rank::Genus => write!(f, "Genus"),
            Rank::Species => write!(f, "Species"),
            Rank::Subspecies => write!(f, "Subspecies"),
            Rank::Variety => write!(f, "Variety"),
            Rank::Subvariety => write!(f, "Subvariety"),
            Rank::Form => write!(f, "Form"),
            Rank::Subform => write!(f, "Subform"),
            Rank::Other(value) => write!(f, "{value}"),
        }
    }
}

impl FromStr for Rank {
    type Err = ResolverError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ResolverError::InvalidRank(value.to_string()));
        }
        let rank = match trimmed.to_lowercase().as_str() {
            "genus" | "gen." => Rank::Genus,
            "species" | "sp." => Rank::Species,
            "subspecies" | "subsp." | "ssp." => Rank::Subspecies,
            "variety" | "var." => Rank::Variety,
            "subvariety" | "subvar." => Rank::Subvariety,
            "form" | "forma" | "f." => Rank::Form,
            "subform" | "subforma" | "subf." => Rank::Subform,
            _ => Rank::Other(trimmed.to_string()),
        };
        Ok(rank)
    }
}

impl From<Rank> for String {
    fn from(value: Rank) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for Rank {
    type Error = ResolverError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum TaxonomicStatus {
    Accepted,
    Synonym,
    HomotypicSynonym,
    Unplaced,
    Other(String),
}

impl TaxonomicStatus {
    pub fn is_accepted(&self) -> bool {
        matches!(self, TaxonomicStatus::Accepted)
    }
}

impl fmt::Display for TaxonomicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaxonomicStatus::Accepted => write!(f, "Accepted"),
            TaxonomicStatus::Synonym => write!(f, "Synonym"),
            TaxonomicStatus::HomotypicSynonym => write!(f, "Homotypic_Synonym"),
            TaxonomicStatus::Unplaced => write!(f, "Unplaced"),
            TaxonomicStatus::Other(value) => write!(f, "{value}"),
        }
    }
}

impl FromStr for TaxonomicStatus {
    type Err = ResolverError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ResolverError::InvalidStatus(value.to_string()));
        }
        let key = trimmed.to_lowercase().replace([' ', '-'], "_");
        let status = match key.as_str() {
            "accepted" => TaxonomicStatus::Accepted,
            "synonym" => TaxonomicStatus::Synonym,
            "homotypic_synonym" => TaxonomicStatus::HomotypicSynonym,
            "unplaced" => TaxonomicStatus::Unplaced,
            _ => TaxonomicStatus::Other(trimmed.replace(' ', "_")),
        };
        Ok(status)
    }
}

impl From<TaxonomicStatus> for String {
    fn from(value: TaxonomicStatus) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for TaxonomicStatus {
    type Error = ResolverError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

pub fn clean_urn_id(value: &str) -> &str {
    let trimmed = value.trim();
    match trimmed.find(IPNI_URN_PREFIX) {
        Some(pos) => trimmed[pos + IPNI_URN_PREFIX.len()..].trim(),
        None => trimmed,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistRecord {
    pub id: String,
    pub name: String,
    pub authors: Option<String>,
    pub status: TaxonomicStatus,
    pub rank: Rank,
    pub family: String,
    pub accepted_id: Option<String>,
    pub accepted_name: Option<String>,
    pub parent_id: Option<String>,
    pub parent_name: Option<String>,
}

impl ChecklistRecord {
    pub fn accepted(id: &str, name: &str, rank: Rank, family: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            authors: None,
            status: TaxonomicStatus::Accepted,
            rank,
            family: family.to_string(),
            accepted_id: None,
            accepted_name: None,
            parent_id: None,
            parent_name: None,
        }
    }

    pub fn synonym(
        id: &str,
        name: &str,
        rank: Rank,
        family: &str,
        accepted_id: &str,
        accepted_name: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            authors: None,
            status: TaxonomicStatus::Synonym,
            rank,
            family: family.to_string(),
            accepted_id: Some(accepted_id.to_string()),
            accepted_name: Some(accepted_name.to_string()),
            parent_id: None,
            parent_name: None,
        }
    }

    pub fn with_parent(mut self, parent_id: &str, parent_name: &str) -> Self {
        self.parent_id = Some(parent_id.to_string());
        self.parent_name = Some(parent_name.to_string());
        self
    }

    pub fn with_status(mut self, status: TaxonomicStatus) -> Self {
        self.status = status;
        self
    }
}

/// Canonical answer for one submission. All fields empty means unresolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTaxon {
    #[serde(rename = "Accepted_Name")]
    pub accepted_name: Option<String>,
    #[serde(rename = "Accepted_ID")]
    pub accepted_id: Option<String>,
    #[serde(rename = "Accepted_Rank")]
    pub accepted_rank: Option<Rank>,
    #[serde(rename = "Accepted_Species")]
    pub accepted_species: Option<String>,
    #[serde(rename = "Accepted_Species_ID")]
    pub accepted_species_id: Option<String>,
}

impl ResolvedTaxon {
    pub const COLUMNS: [&'static str; 5] = [
        "Accepted_Name",
        "Accepted_ID",
        "Accepted_Rank",
        "Accepted_Species",
        "Accepted_Species_ID",
    ];

    pub fn unresolved() -> Self {
        Self::default()
    }

    pub fn is_resolved(&self) -> bool {
        self.accepted_id.is_some()
    }

    pub fn cells(&self) -> [String; 5] {
        [
            self.accepted_name.clone().unwrap_or_default(),
            self.accepted_id.clone().unwrap_or_default(),
            self.accepted_rank
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            self.accepted_species.clone().unwrap_or_default(),
            self.accepted_species_id.clone().unwrap_or_default(),
        ]
    }
}

/// One distinct submitted name. `raw` is the literal as given, `name` is the
/// normalized form the stages match on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Submission {
    pub raw: String,
    pub name: String,
}

impl Submission {
    pub fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            name: crate::normalize::normalize_submission(raw),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveScope {
    pub families: Option<Vec<String>>,
    pub ranks: Option<Vec<Rank>>,
}

impl ResolveScope {
    pub fn families(families: Vec<String>) -> Self {
        Self {
            families: Some(families),
            ranks: None,
        }
    }

    pub fn is_unscoped(&self) -> bool {
        self.families.is_none() && self.ranks.is_none()
    }
}
