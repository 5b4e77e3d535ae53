use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use crate::cache::{ContentKey, ContentStore};
use crate::error::ResolverError;
use crate::table::csv_bytes;

pub const UNMATCHED_TO_AUTORESOLVE: &str = "unmatched_to_autoresolve";
pub const UNMATCHED_MULTIPLE_HITS: &str = "unmatched_samples_with_multiple_knms_hits";
pub const UNMATCHED_SAMPLES: &str = "unmatched_samples";

pub struct DiagnosticLog {
    store: Arc<dyn ContentStore>,
    written: Mutex<Vec<String>>,
}

impl DiagnosticLog {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self {
            store,
            written: Mutex::new(Vec::new()),
        }
    }

    /// Stores `rows` under `tag`, keyed by their content. Nothing is written
    /// for an empty table.
    pub fn report(
        &self,
        tag: &str,
        headers: &[&str],
        rows: &[Vec<String>],
    ) -> Result<Option<String>, ResolverError> {
        if rows.is_empty() {
            return Ok(None);
        }
        let content = csv_bytes(headers, rows)?;
        let key = ContentKey::for_bytes(tag, &content);
        let location = self.store.put(&key, &content)?;
        warn!(tag, rows = rows.len(), file = %location, "wrote diagnostic table");
        self.written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(location.clone());
        Ok(Some(location))
    }

    pub fn written(&self) -> Vec<String> {
        self.written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
