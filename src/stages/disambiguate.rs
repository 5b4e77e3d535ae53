use std::collections::BTreeSet;

use crate::domain::ResolvedTaxon;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub external_id: String,
    pub taxon: ResolvedTaxon,
}

/// Picks one accepted taxon out of several remote candidates, or `None`
/// when the candidates stay ambiguous. Rules, first decisive one wins:
///
/// 1. a candidate whose accepted name equals the submission;
/// 2. all candidates agree on one accepted id;
/// 3. all candidates share one rank and exactly one accepted id has a name
///    contained in the submission.
pub fn disambiguate(submission: &str, candidates: &[Candidate]) -> Option<ResolvedTaxon> {
    let resolved: Vec<&ResolvedTaxon> = candidates
        .iter()
        .map(|candidate| &candidate.taxon)
        .filter(|taxon| taxon.is_resolved())
        .collect();
    if resolved.is_empty() {
        return None;
    }

    let verbatim: Vec<&ResolvedTaxon> = resolved
        .iter()
        .copied()
        .filter(|taxon| taxon.accepted_name.as_deref() == Some(submission))
        .collect();
    if let Some(taxon) = unique_taxon(&verbatim) {
        return Some(taxon);
    }

    if let Some(taxon) = unique_taxon(&resolved) {
        return Some(taxon);
    }

    let ranks: BTreeSet<String> = resolved
        .iter()
        .map(|taxon| {
            taxon
                .accepted_rank
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default()
        })
        .collect();
    if ranks.len() == 1 {
        let contained: Vec<&ResolvedTaxon> = resolved
            .iter()
            .copied()
            .filter(|taxon| {
                taxon
                    .accepted_name
                    .as_deref()
                    .is_some_and(|name| submission.contains(name))
            })
            .collect();
        return unique_taxon(&contained);
    }
    None
}

fn unique_taxon(taxa: &[&ResolvedTaxon]) -> Option<ResolvedTaxon> {
    let ids: BTreeSet<&str> = taxa
        .iter()
        .filter_map(|taxon| taxon.accepted_id.as_deref())
        .collect();
    if ids.len() == 1 {
        taxa.first().map(|taxon| (*taxon).clone())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::id_lookup;
    use crate::fixtures::sample_checklist;

    fn candidates(ids: &[&str]) -> Vec<Candidate> {
        let checklist = sample_checklist();
        ids.iter()
            .map(|id| Candidate {
                external_id: id.to_string(),
                taxon: id_lookup(&checklist, id).unwrap(),
            })
            .collect()
    }

    #[test]
    fn condylocarpon_prefers_verbatim_accepted_name() {
        let picked =
            disambiguate("Condylocarpon", &candidates(&["39836-1", "328988-2", "11637-1"]))
                .unwrap();
        assert_eq!(picked.accepted_id.as_deref(), Some("328988-2"));
    }

    #[test]
    fn accepted_homonym_beats_synonym() {
        let picked =
            disambiguate("Asclepias curassavica", &candidates(&["94213-1", "94212-1"])).unwrap();
        assert_eq!(picked.accepted_id.as_deref(), Some("94213-1"));
    }

    #[test]
    fn candidates_agreeing_on_one_taxon() {
        let picked = disambiguate("Coutinia sp.", &candidates(&["41511-1", "2217-1"])).unwrap();
        assert_eq!(picked.accepted_name.as_deref(), Some("Aspidosperma"));
    }

    #[test]
    fn same_rank_contained_name() {
        let picked =
            disambiguate("Richardia scabra", &candidates(&["35260-1", "60-1"])).unwrap();
        assert_eq!(picked.accepted_id.as_deref(), Some("35260-1"));
    }

    #[test]
    fn mixed_ranks_stay_ambiguous() {
        assert!(disambiguate("Capirona sp.", &candidates(&["60-1", "77210192-1"])).is_none());
    }

    #[test]
    fn unresolvable_candidates_are_ignored() {
        assert!(disambiguate("Xyzzy", &candidates(&["missing-1", "missing-2"])).is_none());
        let picked = disambiguate("Pinus x", &candidates(&["26000-1", "missing-1"])).unwrap();
        assert_eq!(picked.accepted_id.as_deref(), Some("26000-1"));
    }
}
