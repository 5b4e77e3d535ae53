use tracing::warn;

use crate::checklist::Checklist;
use crate::domain::{ChecklistRecord, Rank, ResolvedTaxon, clean_urn_id};
use crate::error::ResolverError;

/// Resolves one id. Unknown or blank ids give an unresolved taxon; an id
/// shared by several records, or a record shape with no derivation rule, is
/// an error.
pub fn id_lookup(checklist: &Checklist, given_id: &str) -> Result<ResolvedTaxon, ResolverError> {
    let id = clean_urn_id(given_id);
    if id.is_empty() {
        warn!(given_id, "blank checklist id");
        return Ok(ResolvedTaxon::unresolved());
    }
    let records = checklist.records_with_id(id);
    match records.as_slice() {
        [] => {
            warn!(id, "id not found in checklist");
            Ok(ResolvedTaxon::unresolved())
        }
        [record] => canonicalize_record(checklist, record),
        _ => Err(ResolverError::DuplicateChecklistId {
            id: id.to_string(),
            count: records.len(),
        }),
    }
}

pub fn resolve_ids(
    checklist: &Checklist,
    ids: &[Option<String>],
) -> Result<Vec<ResolvedTaxon>, ResolverError> {
    ids.iter()
        .map(|id| match id {
            Some(id) => id_lookup(checklist, id),
            None => Ok(ResolvedTaxon::unresolved()),
        })
        .collect()
}

pub fn canonicalize_record(
    checklist: &Checklist,
    record: &ChecklistRecord,
) -> Result<ResolvedTaxon, ResolverError> {
    if record.status.is_accepted() {
        return from_accepted(record);
    }

    let Some(accepted_id) = record.accepted_id.as_deref() else {
        warn!(id = %record.id, status = %record.status, "record has no accepted name");
        return Ok(ResolvedTaxon::unresolved());
    };

    let accepted = checklist.records_with_id(accepted_id);
    match accepted.as_slice() {
        [accepted] if accepted.status.is_accepted() => from_accepted(accepted),
        [accepted] => Err(unmodeled(
            record,
            &format!(
                "accepted id {} points at a {} record",
                accepted.id, accepted.status
            ),
        )),
        [] => from_detached_synonym(record, accepted_id),
        _ => Err(ResolverError::DuplicateChecklistId {
            id: accepted_id.to_string(),
            count: accepted.len(),
        }),
    }
}

fn from_accepted(record: &ChecklistRecord) -> Result<ResolvedTaxon, ResolverError> {
    let (species, species_id) = match &record.rank {
        Rank::Species => (Some(record.name.clone()), Some(record.id.clone())),
        Rank::Genus => (None, None),
        rank if rank.is_infraspecific() => match (&record.parent_name, &record.parent_id) {
            (Some(name), Some(id)) => (Some(name.clone()), Some(id.clone())),
            _ => return Err(unmodeled(record, "infraspecific accepted record has no parent")),
        },
        _ => return Err(unmodeled(record, "rank has no species derivation")),
    };
    Ok(ResolvedTaxon {
        accepted_name: Some(record.name.clone()),
        accepted_id: Some(record.id.clone()),
        accepted_rank: Some(record.rank.clone()),
        accepted_species: species,
        accepted_species_id: species_id,
    })
}

// The accepted record is outside the loaded checklist, so only what the
// synonym row itself carries is available.
fn from_detached_synonym(
    record: &ChecklistRecord,
    accepted_id: &str,
) -> Result<ResolvedTaxon, ResolverError> {
    let Some(accepted_name) = record.accepted_name.clone() else {
        warn!(id = %record.id, accepted_id, "synonym has no accepted name");
        return Ok(ResolvedTaxon::unresolved());
    };
    let (species, species_id) = match &record.rank {
        Rank::Species => (Some(accepted_name.clone()), Some(accepted_id.to_string())),
        Rank::Genus => (None, None),
        _ => {
            return Err(unmodeled(
                record,
                &format!("accepted record {accepted_id} is not loaded, parent cannot be derived"),
            ));
        }
    };
    Ok(ResolvedTaxon {
        accepted_name: Some(accepted_name),
        accepted_id: Some(accepted_id.to_string()),
        accepted_rank: Some(record.rank.clone()),
        accepted_species: species,
        accepted_species_id: species_id,
    })
}

fn unmodeled(record: &ChecklistRecord, reason: &str) -> ResolverError {
    ResolverError::UnmodeledTaxonState {
        id: record.id.clone(),
        status: record.status.to_string(),
        rank: record.rank.to_string(),
        reason: reason.to_string(),
    }
}
