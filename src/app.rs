use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::info;

use crate::cache::{ContentStore, FileStore};
use crate::canonical::resolve_ids;
use crate::checklist::{
    Checklist, ChecklistDownloader, ChecklistFilter, ChecklistLoader, ChecklistSummary,
    FetchOutcome,
};
use crate::config::ResolverConfig;
use crate::domain::{Rank, ResolveScope, ResolvedTaxon, clean_urn_id};
use crate::error::ResolverError;
use crate::matcher::{CachedMatcher, NameMatcher};
use crate::resolver::{ResolutionSummary, Resolver};
use crate::stages::ManualOverrides;
use crate::store::{ChecklistMetadata, Store};
use crate::table::InputTable;

#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub input: Utf8PathBuf,
    pub column: String,
    pub output: Option<Utf8PathBuf>,
    pub families: Vec<String>,
    pub ranks: Vec<Rank>,
    pub drop_unmatched: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolveResult {
    pub input: String,
    pub output: String,
    pub rows_written: usize,
    pub summary: ResolutionSummary,
}

#[derive(Debug, Clone)]
pub struct LookupColumnRequest {
    pub input: Utf8PathBuf,
    pub column: String,
    pub output: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LookupColumnResult {
    pub input: String,
    pub output: String,
    pub rows_written: usize,
    pub resolved: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LookupResult {
    pub items: Vec<LookupItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LookupItem {
    pub id: String,
    #[serde(flatten)]
    pub taxon: ResolvedTaxon,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChecklistInfo {
    pub path: String,
    pub present: bool,
    pub metadata: Option<ChecklistMetadata>,
    pub summary: Option<ChecklistSummary>,
}

pub struct App<D: ChecklistDownloader, M: NameMatcher> {
    store: Store,
    config: ResolverConfig,
    downloader: D,
    matcher: M,
}

impl<D: ChecklistDownloader, M: NameMatcher> App<D, M> {
    pub fn new(store: Store, config: ResolverConfig, downloader: D, matcher: M) -> Self {
        Self {
            store,
            config,
            downloader,
            matcher,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    fn loader(&self) -> ChecklistLoader<&D> {
        ChecklistLoader::new(
            self.store.clone(),
            self.config.checklist.clone(),
            &self.downloader,
        )
    }

    fn load_checklist(&self) -> Result<Checklist, ResolverError> {
        self.loader().load(&ChecklistFilter::default())
    }

    pub fn fetch_checklist(&self, force: bool) -> Result<FetchOutcome, ResolverError> {
        self.loader().fetch(force)
    }

    pub fn checklist_info(&self) -> Result<ChecklistInfo, ResolverError> {
        let loader = self.loader();
        let path = loader.local_path();
        let present = path.as_std_path().exists();
        let metadata = Store::read_metadata(&self.store.checklist_metadata_path())?;
        let summary = if present {
            Some(Checklist::read(path.as_std_path())?.summary())
        } else {
            None
        };
        Ok(ChecklistInfo {
            path: path.to_string(),
            present,
            metadata,
            summary,
        })
    }

    pub fn lookup(&self, ids: &[String]) -> Result<LookupResult, ResolverError> {
        let checklist = self.load_checklist()?;
        let column: Vec<Option<String>> = ids.iter().map(|id| Some(id.clone())).collect();
        let items = ids
            .iter()
            .zip(resolve_ids(&checklist, &column)?)
            .map(|(id, taxon)| LookupItem {
                id: clean_urn_id(id).to_string(),
                taxon,
            })
            .collect();
        Ok(LookupResult { items })
    }

    pub fn lookup_column(
        &self,
        request: &LookupColumnRequest,
    ) -> Result<LookupColumnResult, ResolverError> {
        let table = InputTable::read(request.input.as_std_path())?;
        let ids = table.column(&request.column)?;
        let checklist = self.load_checklist()?;
        let taxa = resolve_ids(&checklist, &ids)?;
        let resolved = taxa.iter().filter(|taxon| taxon.is_resolved()).count();

        let output = output_path(&request.input, request.output.as_ref(), "canonical");
        let rows_written = write_table(&table, &output, taxa.iter().enumerate())?;
        info!(output = %output, rows = rows_written, resolved, "wrote canonical ids");
        Ok(LookupColumnResult {
            input: request.input.to_string(),
            output: output.to_string(),
            rows_written,
            resolved,
        })
    }

    pub fn resolve(&self, request: &ResolveRequest) -> Result<ResolveResult, ResolverError> {
        let table = InputTable::read(request.input.as_std_path())?;
        let names = table.column(&request.column)?;
        let checklist = self.load_checklist()?;

        let overrides = match &self.config.manual_overrides {
            Some(path) => ManualOverrides::read(path.as_std_path())?,
            None => ManualOverrides::default(),
        };
        let cache: Arc<dyn ContentStore> = Arc::new(FileStore::new(self.store.cache_dir()));
        let diagnostics: Arc<dyn ContentStore> =
            Arc::new(FileStore::new(self.store.diagnostics_dir()));
        let matcher = CachedMatcher::new(&self.matcher, cache);
        let resolver = Resolver::new(checklist, matcher, diagnostics)
            .with_overrides(overrides)
            .with_stage_order(self.config.stage_order)
            .keep_unmatched(self.config.keep_unmatched && !request.drop_unmatched);

        let families = if request.families.is_empty() {
            self.config.families.clone()
        } else {
            Some(request.families.clone())
        };
        let scope = ResolveScope {
            families,
            ranks: (!request.ranks.is_empty()).then(|| request.ranks.clone()),
        };
        let resolution = resolver.resolve(&names, &scope)?;

        let output = output_path(&request.input, request.output.as_ref(), "resolved");
        let rows_written = write_table(&table, &output, resolution.taxa())?;
        info!(output = %output, rows = rows_written, "wrote resolved table");
        Ok(ResolveResult {
            input: request.input.to_string(),
            output: output.to_string(),
            rows_written,
            summary: resolution.summary,
        })
    }
}

/// `samples.csv` becomes `samples.<suffix>.csv` next to the input.
fn output_path(input: &Utf8Path, explicit: Option<&Utf8PathBuf>, suffix: &str) -> Utf8PathBuf {
    if let Some(path) = explicit {
        return path.clone();
    }
    let stem = input.file_stem().unwrap_or("table");
    input.with_file_name(format!("{stem}.{suffix}.csv"))
}

fn write_table<'a, I>(table: &InputTable, path: &Utf8Path, rows: I) -> Result<usize, ResolverError>
where
    I: IntoIterator<Item = (usize, &'a ResolvedTaxon)>,
{
    let mut content = Vec::new();
    let written = table.write_resolved(&mut content, rows)?;
    Store::write_bytes_atomic(path, &content)?;
    Ok(written)
}
