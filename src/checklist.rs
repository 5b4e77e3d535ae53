use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use camino::Utf8PathBuf;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::ChecklistSettings;
use crate::domain::{ChecklistRecord, Rank, TaxonomicStatus};
use crate::error::ResolverError;
use crate::store::{ChecklistMetadata, Store};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecklistFilter {
    pub families: Option<Vec<String>>,
    pub ranks: Option<Vec<Rank>>,
    pub accepted_only: bool,
}

impl ChecklistFilter {
    pub fn matches(&self, record: &ChecklistRecord) -> bool {
        if self.accepted_only && !record.status.is_accepted() {
            return false;
        }
        if let Some(families) = &self.families {
            if !families.iter().any(|family| family == &record.family) {
                return false;
            }
        }
        if let Some(ranks) = &self.ranks {
            if !ranks.contains(&record.rank) {
                return false;
            }
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_none() && self.ranks.is_none() && !self.accepted_only
    }
}

#[derive(Debug, Clone, Default)]
pub struct Checklist {
    records: Vec<ChecklistRecord>,
    by_id: HashMap<String, Vec<usize>>,
    by_name: HashMap<String, Vec<usize>>,
}

impl Checklist {
    /// Builds the index. Unplaced names are dropped; duplicate ids are kept
    /// so that lookups can report them.
    pub fn from_records(records: Vec<ChecklistRecord>) -> Self {
        let records: Vec<ChecklistRecord> = records
            .into_iter()
            .filter(|record| record.status != TaxonomicStatus::Unplaced)
            .collect();
        let mut by_id: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, record) in records.iter().enumerate() {
            by_id.entry(record.id.clone()).or_default().push(index);
            by_name.entry(record.name.clone()).or_default().push(index);
        }
        Self {
            records,
            by_id,
            by_name,
        }
    }

    pub fn read(path: &Path) -> Result<Self, ResolverError> {
        let file = fs::File::open(path).map_err(|err| {
            ResolverError::Filesystem(format!("open checklist {}: {err}", path.display()))
        })?;
        parse_checklist(file)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ChecklistRecord] {
        &self.records
    }

    pub fn records_with_id(&self, id: &str) -> Vec<&ChecklistRecord> {
        self.lookup(&self.by_id, id)
    }

    pub fn records_named(&self, name: &str) -> Vec<&ChecklistRecord> {
        self.lookup(&self.by_name, name)
    }

    pub fn accepted(&self) -> impl Iterator<Item = &ChecklistRecord> {
        self.records
            .iter()
            .filter(|record| record.status.is_accepted())
    }

    pub fn filtered(&self, filter: &ChecklistFilter) -> Checklist {
        if filter.is_empty() {
            return self.clone();
        }
        Checklist::from_records(
            self.records
                .iter()
                .filter(|record| filter.matches(record))
                .cloned()
                .collect(),
        )
    }

    pub fn summary(&self) -> ChecklistSummary {
        let mut by_status = BTreeMap::new();
        let mut by_rank = BTreeMap::new();
        for record in &self.records {
            *by_status.entry(record.status.to_string()).or_insert(0) += 1;
            *by_rank.entry(record.rank.to_string()).or_insert(0) += 1;
        }
        ChecklistSummary {
            records: self.records.len(),
            by_status,
            by_rank,
        }
    }

    fn lookup(&self, index: &HashMap<String, Vec<usize>>, key: &str) -> Vec<&ChecklistRecord> {
        index
            .get(key)
            .map(|positions| positions.iter().map(|&pos| &self.records[pos]).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChecklistSummary {
    pub records: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_rank: BTreeMap<String, usize>,
}

#[derive(Debug, Deserialize)]
struct ChecklistRow {
    kew_id: String,
    taxon_name: String,
    #[serde(default)]
    authors: Option<String>,
    taxonomic_status: String,
    rank: String,
    #[serde(default)]
    family: Option<String>,
    #[serde(default)]
    accepted_kew_id: Option<String>,
    #[serde(default)]
    accepted_name: Option<String>,
    #[serde(default)]
    parent_kew_id: Option<String>,
    #[serde(default)]
    parent_name: Option<String>,
}

impl ChecklistRow {
    fn into_record(self) -> Result<ChecklistRecord, ResolverError> {
        let status: TaxonomicStatus = self.taxonomic_status.parse()?;
        let rank: Rank = self.rank.parse()?;
        let accepted = status.is_accepted();
        Ok(ChecklistRecord {
            id: self.kew_id.trim().to_string(),
            name: self.taxon_name.trim().to_string(),
            authors: non_empty(self.authors),
            status,
            rank,
            family: non_empty(self.family).unwrap_or_default(),
            accepted_id: non_empty(self.accepted_kew_id).filter(|_| !accepted),
            accepted_name: non_empty(self.accepted_name).filter(|_| !accepted),
            parent_id: non_empty(self.parent_kew_id),
            parent_name: non_empty(self.parent_name),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parses a pipe-delimited checklist. Rows without a usable status or rank
/// are skipped with a warning.
pub fn parse_checklist<R: Read>(reader: R) -> Result<Checklist, ResolverError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'|')
        .quoting(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for row in reader.deserialize::<ChecklistRow>() {
        let row = row.map_err(|err| ResolverError::ChecklistParse(err.to_string()))?;
        match row.into_record() {
            Ok(record) => records.push(record),
            Err(_) => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(skipped, "checklist rows without status or rank were skipped");
    }
    Ok(Checklist::from_records(records))
}

pub trait ChecklistDownloader: Send + Sync {
    fn download_archive(&self, url: &str, destination: &Path) -> Result<(), ResolverError>;
}

impl<T: ChecklistDownloader + ?Sized> ChecklistDownloader for &T {
    fn download_archive(&self, url: &str, destination: &Path) -> Result<(), ResolverError> {
        (**self).download_archive(url, destination)
    }
}

#[derive(Clone)]
pub struct ChecklistHttpClient {
    client: Client,
}

impl ChecklistHttpClient {
    pub fn new() -> Result<Self, ResolverError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("taxon-resolver/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ResolverError::ChecklistHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(600))
            .build()
            .map_err(|err| ResolverError::ChecklistHttp(err.to_string()))?;
        Ok(Self { client })
    }
}

impl ChecklistDownloader for ChecklistHttpClient {
    fn download_archive(&self, url: &str, destination: &Path) -> Result<(), ResolverError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|err| ResolverError::ChecklistHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "checklist request failed".to_string());
            return Err(ResolverError::ChecklistStatus { status, message });
        }
        let mut file = fs::File::create(destination)
            .map_err(|err| ResolverError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, &mut file)
            .map_err(|err| ResolverError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchOutcome {
    pub path: String,
    pub downloaded: bool,
    pub metadata: Option<ChecklistMetadata>,
}

pub struct ChecklistLoader<D: ChecklistDownloader> {
    store: Store,
    settings: ChecklistSettings,
    downloader: D,
}

impl<D: ChecklistDownloader> ChecklistLoader<D> {
    pub fn new(store: Store, settings: ChecklistSettings, downloader: D) -> Self {
        Self {
            store,
            settings,
            downloader,
        }
    }

    pub fn local_path(&self) -> Utf8PathBuf {
        self.store.checklist_path(&self.settings.file_name)
    }

    pub fn fetch(&self, force: bool) -> Result<FetchOutcome, ResolverError> {
        let local = self.local_path();
        let metadata_path = self.store.checklist_metadata_path();
        if !force && local.as_std_path().exists() {
            return Ok(FetchOutcome {
                path: local.to_string(),
                downloaded: false,
                metadata: Store::read_metadata(&metadata_path)?,
            });
        }

        let checklist_dir = self.store.checklist_dir();
        Store::ensure_dir(&checklist_dir)?;
        let temp_dir = tempfile::Builder::new()
            .prefix("taxon-resolver-checklist")
            .tempdir_in(checklist_dir.as_std_path())
            .map_err(|err| ResolverError::Filesystem(err.to_string()))?;

        let url = self.settings.url.as_str();
        let archive_name = url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("checklist.zip");
        let archive_path = temp_dir.path().join(archive_name);
        info!(url, "downloading checklist");
        self.downloader.download_archive(url, &archive_path)?;

        let table = if archive_name.ends_with(".zip") {
            let extract_dir = temp_dir.path().join("extract");
            let tables = crate::fs_util::extract_zip(&archive_path, &extract_dir)?;
            crate::fs_util::find_checklist_table(&tables)?
                .ok_or_else(|| ResolverError::ChecklistMissing(url.to_string()))?
        } else if archive_name.ends_with(".gz") {
            let table = temp_dir.path().join("checklist.txt");
            crate::fs_util::decompress_gzip(&archive_path, &table)?;
            table
        } else {
            archive_path
        };

        let records = Checklist::read(&table)?.len();
        fs::rename(&table, local.as_std_path())
            .map_err(|err| ResolverError::Filesystem(err.to_string()))?;

        let metadata = ChecklistMetadata {
            source: url.to_string(),
            file_name: self.settings.file_name.clone(),
            downloaded_at: chrono::Utc::now().to_rfc3339(),
            tool: format!("taxon-resolver/{}", env!("CARGO_PKG_VERSION")),
            records,
        };
        Store::write_metadata(&metadata_path, &metadata)?;
        info!(path = %local, records, "checklist stored");

        Ok(FetchOutcome {
            path: local.to_string(),
            downloaded: true,
            metadata: Some(metadata),
        })
    }

    pub fn load(&self, filter: &ChecklistFilter) -> Result<Checklist, ResolverError> {
        self.fetch(false)?;
        let checklist = Checklist::read(self.local_path().as_std_path())?;
        Ok(checklist.filtered(filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
kew_id|family|genus|taxon_name|authors|rank|taxonomic_status|accepted_kew_id|accepted_name|parent_kew_id|parent_name
2217-1|Apocynaceae|Aspidosperma|Aspidosperma|Mart. & Zucc.|GENUS|Accepted||||
41511-1|Apocynaceae|Coutinia|Coutinia||Genus|Synonym|2217-1|Aspidosperma||
77210192-1|Rubiaceae|Capirona|Capirona macrophylla||Species|Accepted|||60-1|Capirona
99-9|Rubiaceae|Capirona|Capirona dubia||Species|Unplaced||||
";

    #[test]
    fn parse_drops_unplaced_and_normalizes_rank() {
        let checklist = parse_checklist(SAMPLE.as_bytes()).unwrap();
        assert_eq!(checklist.len(), 3);
        let genus = checklist.records_with_id("2217-1");
        assert_eq!(genus.len(), 1);
        assert_eq!(genus[0].rank, Rank::Genus);
        assert_eq!(genus[0].authors.as_deref(), Some("Mart. & Zucc."));
        assert!(checklist.records_with_id("99-9").is_empty());
    }

    #[test]
    fn synonym_keeps_accepted_pointer() {
        let checklist = parse_checklist(SAMPLE.as_bytes()).unwrap();
        let synonym = checklist.records_named("Coutinia");
        assert_eq!(synonym[0].accepted_id.as_deref(), Some("2217-1"));
        assert_eq!(synonym[0].status, TaxonomicStatus::Synonym);
    }

    #[test]
    fn filter_by_family_and_status() {
        let checklist = parse_checklist(SAMPLE.as_bytes()).unwrap();
        let filter = ChecklistFilter {
            families: Some(vec!["Apocynaceae".to_string()]),
            ranks: None,
            accepted_only: true,
        };
        let scoped = checklist.filtered(&filter);
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped.records()[0].name, "Aspidosperma");
        assert_eq!(checklist.accepted().count(), 2);
    }

    struct ZipDownloader;

    impl ChecklistDownloader for ZipDownloader {
        fn download_archive(&self, _url: &str, destination: &Path) -> Result<(), ResolverError> {
            use std::io::Write;

            let file = fs::File::create(destination).unwrap();
            let mut writer = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("wcvp_distribution.csv", options).unwrap();
            writer
                .write_all(b"plant_locality_id|kew_id|area\n1|2217-1|Bahia\n")
                .unwrap();
            writer.start_file("wcvp_names.csv", options).unwrap();
            writer.write_all(SAMPLE.as_bytes()).unwrap();
            writer.finish().unwrap();
            Ok(())
        }
    }

    #[test]
    fn fetch_stores_names_table_from_multi_member_archive() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let loader = ChecklistLoader::new(
            Store::new_with_root(root),
            ChecklistSettings {
                url: "https://example.org/wcvp.zip".to_string(),
                file_name: "wcvp.txt".to_string(),
            },
            ZipDownloader,
        );

        let outcome = loader.fetch(false).unwrap();
        assert!(outcome.downloaded);
        assert_eq!(outcome.metadata.map(|meta| meta.records), Some(3));
        let checklist = loader.load(&ChecklistFilter::default()).unwrap();
        assert_eq!(checklist.len(), 3);
    }

    #[test]
    fn summary_counts() {
        let checklist = parse_checklist(SAMPLE.as_bytes()).unwrap();
        let summary = checklist.summary();
        assert_eq!(summary.records, 3);
        assert_eq!(summary.by_status.get("Accepted"), Some(&2));
        assert_eq!(summary.by_rank.get("Genus"), Some(&2));
    }
}
