#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use taxon_resolver::checklist::{Checklist, ChecklistDownloader, parse_checklist};
use taxon_resolver::error::ResolverError;
use taxon_resolver::matcher::{MatchRecord, MatchState, NameMatcher};

pub const CHECKLIST: &str = "\
kew_id|family|genus|taxon_name|authors|rank|taxonomic_status|accepted_kew_id|accepted_name|parent_kew_id|parent_name
2217-1|Apocynaceae|Aspidosperma|Aspidosperma|Mart. & Zucc.|Genus|Accepted||||
41511-1|Apocynaceae|Coutinia|Coutinia||Genus|Synonym|2217-1|Aspidosperma||
77100-1|Apocynaceae|Aspidosperma|Aspidosperma album|(Vahl) Benoist|Species|Accepted|||2217-1|Aspidosperma
77101-1|Apocynaceae|Aspidosperma|Aspidosperma album var. tenax||Variety|Accepted|||77100-1|Aspidosperma album
77102-1|Apocynaceae|Aspidosperma|Aspidosperma album subsp. tenax||Subspecies|Synonym|77101-1|Aspidosperma album var. tenax||
35260-1|Rubiaceae|Richardia|Richardia|L.|Genus|Accepted||||
60-1|Rubiaceae|Capirona|Capirona|Spruce|Genus|Accepted||||
77210192-1|Rubiaceae|Capirona|Capirona macrophylla||Species|Accepted|||60-1|Capirona
44583-2|Rubiaceae|Capirona|Capirona decorticans|Spruce|Species|Synonym|77210192-1|Capirona macrophylla||
328988-2|Apocynaceae|Condylocarpon|Condylocarpon|Desf.|Genus|Accepted||||
30000-1|Apiaceae|Tordylium|Tordylium|L.|Genus|Accepted||||
39836-1|Apiaceae|Condylocarpus|Condylocarpus|Hoffm.|Genus|Synonym|30000-1|Tordylium||
26000-1|Pinaceae|Pinus|Pinus|L.|Genus|Accepted||||
11637-1|Pinaceae|Condylocarpus|Condylocarpus|Salisb.|Genus|Synonym|26000-1|Pinus||
2000-1|Apocynaceae|Asclepias|Asclepias|L.|Genus|Accepted||||
94213-1|Apocynaceae|Asclepias|Asclepias curassavica|L.|Species|Accepted|||2000-1|Asclepias
94100-1|Apocynaceae|Asclepias|Asclepias nivea|L.|Species|Accepted|||2000-1|Asclepias
94212-1|Apocynaceae|Asclepias|Asclepias curassavica|Griseb.|Species|Synonym|94100-1|Asclepias nivea||
50-1|Rubiaceae|Coffea|Coffea dubia||Species|Unplaced||||
";

pub fn checklist() -> Checklist {
    parse_checklist(CHECKLIST.as_bytes()).unwrap()
}

pub fn urn(id: &str) -> String {
    format!("urn:lsid:ipni.org:names:{id}")
}

/// Canned name matcher keyed by submitted name; counts calls.
#[derive(Default)]
pub struct MockMatcher {
    responses: HashMap<String, Vec<MatchRecord>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl MockMatcher {
    pub fn single(mut self, name: &str, id: &str) -> Self {
        self.responses.insert(
            name.to_string(),
            vec![MatchRecord {
                submitted: name.to_string(),
                match_state: MatchState::Single,
                external_id: Some(urn(id)),
                matched_name: None,
            }],
        );
        self
    }

    pub fn multiple(mut self, name: &str, ids: &[&str]) -> Self {
        let records = ids
            .iter()
            .map(|id| MatchRecord {
                submitted: name.to_string(),
                match_state: MatchState::Multiple,
                external_id: Some(urn(id)),
                matched_name: None,
            })
            .collect();
        self.responses.insert(name.to_string(), records);
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

impl NameMatcher for MockMatcher {
    fn match_names(&self, names: &[String]) -> Result<Vec<MatchRecord>, ResolverError> {
        self.calls.lock().unwrap().push(names.to_vec());
        Ok(names
            .iter()
            .flat_map(|name| {
                self.responses.get(name).cloned().unwrap_or_else(|| {
                    vec![MatchRecord {
                        submitted: name.clone(),
                        match_state: MatchState::NoMatch,
                        external_id: None,
                        matched_name: None,
                    }]
                })
            })
            .collect())
    }
}

/// Writes the fixture checklist instead of downloading.
#[derive(Default)]
pub struct MockDownloader {
    pub downloads: Mutex<usize>,
}

impl ChecklistDownloader for MockDownloader {
    fn download_archive(&self, _url: &str, destination: &Path) -> Result<(), ResolverError> {
        *self.downloads.lock().unwrap() += 1;
        std::fs::write(destination, CHECKLIST)
            .map_err(|err| ResolverError::Filesystem(err.to_string()))
    }
}
