mod common;

use std::sync::Arc;

use taxon_resolver::cache::{FileStore, MemoryStore};
use taxon_resolver::diagnostics::{
    UNMATCHED_MULTIPLE_HITS, UNMATCHED_SAMPLES, UNMATCHED_TO_AUTORESOLVE,
};
use taxon_resolver::domain::{Rank, ResolveScope};
use taxon_resolver::matcher::{CachedMatcher, MATCH_CACHE_TAG};
use taxon_resolver::resolver::Resolver;
use taxon_resolver::stages::{ManualOverrides, StageKind, StageOrder};

use common::{MockMatcher, checklist};

fn rows(values: &[&str]) -> Vec<Option<String>> {
    values.iter().map(|value| Some(value.to_string())).collect()
}

#[test]
fn accepted_names_round_trip_to_their_own_id() {
    let checklist = checklist();
    let accepted: Vec<_> = checklist
        .accepted()
        .filter(|record| checklist.records_named(&record.name).len() == 1)
        .cloned()
        .collect();
    let names: Vec<&str> = accepted.iter().map(|record| record.name.as_str()).collect();

    let resolver = Resolver::new(
        checklist.clone(),
        MockMatcher::default(),
        Arc::new(MemoryStore::new()),
    );
    let table = resolver.resolve(&rows(&names), &ResolveScope::default()).unwrap();
    for (record, row) in accepted.iter().zip(&table.rows) {
        assert_eq!(row.taxon.accepted_id.as_deref(), Some(record.id.as_str()));
        assert_eq!(row.stage, Some(StageKind::Exact));
        if record.rank == Rank::Species {
            assert_eq!(row.taxon.accepted_species, row.taxon.accepted_name);
            assert_eq!(row.taxon.accepted_species_id, row.taxon.accepted_id);
        }
        if record.rank == Rank::Genus {
            assert!(row.taxon.accepted_species.is_none());
        }
    }
}

#[test]
fn condylocarpon_homonyms() {
    let matcher = MockMatcher::default()
        .multiple("Condylocarpon Desf.", &["39836-1", "328988-2", "11637-1"])
        .multiple("Condylocarpus", &["39836-1", "11637-1"]);
    let store = Arc::new(MemoryStore::new());
    let resolver = Resolver::new(checklist(), matcher, store.clone());
    let table = resolver
        .resolve(
            &rows(&["CONDYLOCARPON", "Condylocarpon Desf.", "Condylocarpus"]),
            &ResolveScope::default(),
        )
        .unwrap();

    assert_eq!(table.rows[0].taxon.accepted_id.as_deref(), Some("328988-2"));
    assert_eq!(table.rows[0].stage, Some(StageKind::Exact));
    assert_eq!(table.rows[1].taxon.accepted_id.as_deref(), Some("328988-2"));
    assert_eq!(table.rows[1].stage, Some(StageKind::Disambiguated));
    // Two synonyms pointing at different genera are never guessed.
    assert!(!table.rows[2].taxon.is_resolved());
    assert_eq!(store.keys_tagged(UNMATCHED_MULTIPLE_HITS).len(), 1);
}

#[test]
fn remote_multiple_match_tie_break() {
    let matcher = MockMatcher::default().multiple("Asclepias curassavica", &["94213-1", "94212-1"]);
    let resolver = Resolver::new(checklist(), matcher, Arc::new(MemoryStore::new()));
    let table = resolver
        .resolve(&rows(&["Asclepias curassavica"]), &ResolveScope::default())
        .unwrap();
    assert_eq!(table.rows[0].taxon.accepted_id.as_deref(), Some("94213-1"));
    assert_eq!(table.rows[0].stage, Some(StageKind::Disambiguated));
}

#[test]
fn autoresolve_rejects_genus_for_multi_token_names() {
    let store = Arc::new(MemoryStore::new());
    let resolver = Resolver::new(checklist(), MockMatcher::default(), store.clone());
    let table = resolver
        .resolve(
            &rows(&["Richardia sp. nov.", "Pinus", "Aspidosperma album Vahl"]),
            &ResolveScope::default(),
        )
        .unwrap();
    assert!(!table.rows[0].taxon.is_resolved());
    assert_eq!(table.rows[1].taxon.accepted_rank, Some(Rank::Genus));
    assert_eq!(table.rows[2].taxon.accepted_id.as_deref(), Some("77100-1"));
    assert_eq!(table.rows[2].stage, Some(StageKind::Containment));
    assert_eq!(store.keys_tagged(UNMATCHED_TO_AUTORESOLVE).len(), 1);
    assert_eq!(store.keys_tagged(UNMATCHED_SAMPLES).len(), 1);
}

#[test]
fn keep_unmatched_preserves_row_count_and_order() {
    let resolver = Resolver::new(checklist(), MockMatcher::default(), Arc::new(MemoryStore::new()));
    let input = vec![
        Some("Xyzzy plantae".to_string()),
        None,
        Some("Capirona decorticans".to_string()),
        Some("   ".to_string()),
        Some("Xyzzy plantae".to_string()),
    ];
    let table = resolver.resolve(&input, &ResolveScope::default()).unwrap();
    assert_eq!(table.rows.len(), input.len());
    let indexes: Vec<usize> = table.rows.iter().map(|row| row.index).collect();
    assert_eq!(indexes, vec![0, 1, 2, 3, 4]);
    assert_eq!(table.rows[0].taxon, table.rows[4].taxon);
    assert_eq!(table.rows[2].submitted.as_deref(), Some("Capirona decorticans"));
    assert_eq!(table.summary.unresolved_names, 1);
    assert_eq!(table.summary.empty_rows, 2);

    let dropping = Resolver::new(checklist(), MockMatcher::default(), Arc::new(MemoryStore::new()))
        .keep_unmatched(false);
    let table = dropping.resolve(&input, &ResolveScope::default()).unwrap();
    assert_eq!(table.rows.len(), 1);
    assert_eq!(table.rows[0].index, 2);
}

#[test]
fn resolving_accepted_names_again_is_stable() {
    let matcher = MockMatcher::default().single("Capirona decorticans Standl.", "44583-2");
    let resolver = Resolver::new(checklist(), matcher, Arc::new(MemoryStore::new()));
    let first = resolver
        .resolve(
            &rows(&[
                "Capirona decorticans Standl.",
                "Coutinia",
                "Aspidosperma album subsp. tenax",
                "Aspidosperma album var. tenax (Mart.) Lundell",
            ]),
            &ResolveScope::default(),
        )
        .unwrap();
    assert!(first.rows.iter().all(|row| row.taxon.is_resolved()));

    let accepted: Vec<Option<String>> = first
        .rows
        .iter()
        .map(|row| row.taxon.accepted_name.clone())
        .collect();
    let second = resolver.resolve(&accepted, &ResolveScope::default()).unwrap();
    for (before, after) in first.rows.iter().zip(&second.rows) {
        assert_eq!(before.taxon, after.taxon);
    }
}

#[test]
fn cached_matches_skip_second_remote_call() {
    let temp = tempfile::tempdir().unwrap();
    let cache_dir = camino::Utf8PathBuf::from_path_buf(temp.path().join("cache")).unwrap();
    let inner = MockMatcher::default().single("Capirona decorticans Standl.", "44583-2");
    let matcher = CachedMatcher::new(&inner, Arc::new(FileStore::new(cache_dir.clone())));
    let resolver = Resolver::new(checklist(), matcher, Arc::new(MemoryStore::new()));

    let input = rows(&["Capirona decorticans Standl.", "Xyzzy plantae"]);
    let first = resolver.resolve(&input, &ResolveScope::default()).unwrap();
    let second = resolver.resolve(&input, &ResolveScope::default()).unwrap();
    assert_eq!(first.rows, second.rows);
    assert_eq!(inner.calls().len(), 1);

    let cached: Vec<_> = std::fs::read_dir(cache_dir.as_std_path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(cached.len(), 1);
    assert!(cached[0].starts_with(MATCH_CACHE_TAG));
}

#[test]
fn manual_override_and_stage_order() {
    let overrides = ManualOverrides::from_pairs([
        ("Aspidosperma album sensu lato", "2217-1"),
        ("Tree no. 14", "urn:lsid:ipni.org:names:35260-1"),
    ]);
    let input = rows(&["Aspidosperma album sensu lato", "Tree no. 14"]);

    let containment_first =
        Resolver::new(checklist(), MockMatcher::default(), Arc::new(MemoryStore::new()))
            .with_overrides(overrides.clone());
    let table = containment_first
        .resolve(&input, &ResolveScope::default())
        .unwrap();
    assert_eq!(table.rows[0].taxon.accepted_id.as_deref(), Some("77100-1"));
    assert_eq!(table.rows[0].stage, Some(StageKind::Containment));
    assert_eq!(table.rows[1].taxon.accepted_id.as_deref(), Some("35260-1"));
    assert_eq!(table.rows[1].stage, Some(StageKind::Manual));

    let manual_first =
        Resolver::new(checklist(), MockMatcher::default(), Arc::new(MemoryStore::new()))
            .with_overrides(overrides)
            .with_stage_order(StageOrder::ManualFirst);
    let table = manual_first.resolve(&input, &ResolveScope::default()).unwrap();
    assert_eq!(table.rows[0].taxon.accepted_id.as_deref(), Some("2217-1"));
    assert_eq!(table.rows[0].stage, Some(StageKind::Manual));
}

#[test]
fn family_scope_and_rank_targets() {
    let resolver = Resolver::new(checklist(), MockMatcher::default(), Arc::new(MemoryStore::new()));
    let scope = ResolveScope {
        families: Some(vec!["Apocynaceae".to_string()]),
        ranks: Some(vec![Rank::Species]),
    };
    let table = resolver
        .resolve(
            &rows(&["Aspidosperma album var. tenax, dried leaves", "Pinus"]),
            &scope,
        )
        .unwrap();
    assert_eq!(table.rows[0].taxon.accepted_id.as_deref(), Some("77100-1"));
    assert!(!table.rows[1].taxon.is_resolved());
}

#[test]
fn containment_finds_names_inside_scraped_text() {
    let resolver = Resolver::new(checklist(), MockMatcher::default(), Arc::new(MemoryStore::new()));
    let table = resolver
        .resolve(
            &rows(&[
                "Aspidosperma album var. tenax, dried leaves",
                "Richardia.",
                "Aspidosperma album(Vahl) Benoist",
            ]),
            &ResolveScope::default(),
        )
        .unwrap();
    let ids: Vec<Option<&str>> = table
        .rows
        .iter()
        .map(|row| row.taxon.accepted_id.as_deref())
        .collect();
    assert_eq!(ids, vec![Some("77101-1"), Some("35260-1"), Some("77100-1")]);
    assert!(table.rows.iter().all(|row| row.stage == Some(StageKind::Containment)));
}
