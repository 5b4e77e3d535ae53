use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ResolverError;
use crate::matcher::RateLimit;
use crate::stages::StageOrder;

pub const DEFAULT_CONFIG_FILE: &str = "taxon-resolver.json";
pub const DEFAULT_CHECKLIST_URL: &str =
    "https://sftp.kew.org/pub/data-repositories/WCVP/wcvp.zip";
pub const DEFAULT_CHECKLIST_FILE: &str = "wcvp.txt";
pub const DEFAULT_MATCHER_URL: &str = "http://namematch.science.kew.org/api/v2/powo/match";
const DEFAULT_DELAY_MS: u64 = 1000;
const DEFAULT_BATCH_SIZE: usize = 1000;
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub checklist: Option<ChecklistEntry>,
    #[serde(default)]
    pub matcher: Option<MatcherEntry>,
    #[serde(default)]
    pub manual_overrides: Option<String>,
    #[serde(default)]
    pub keep_unmatched: Option<bool>,
    #[serde(default)]
    pub stage_order: Option<String>,
    #[serde(default)]
    pub families: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ChecklistEntry {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct MatcherEntry {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub delay_ms: Option<u64>,
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistSettings {
    pub url: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatcherSettings {
    pub url: String,
    pub rate_limit: RateLimit,
    pub batch_size: usize,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub schema_version: u32,
    pub data_dir: Option<Utf8PathBuf>,
    pub checklist: ChecklistSettings,
    pub matcher: MatcherSettings,
    pub manual_overrides: Option<Utf8PathBuf>,
    pub keep_unmatched: bool,
    pub stage_order: StageOrder,
    pub families: Option<Vec<String>>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            data_dir: None,
            checklist: ChecklistSettings {
                url: DEFAULT_CHECKLIST_URL.to_string(),
                file_name: DEFAULT_CHECKLIST_FILE.to_string(),
            },
            matcher: MatcherSettings {
                url: DEFAULT_MATCHER_URL.to_string(),
                rate_limit: RateLimit::from_millis(DEFAULT_DELAY_MS),
                batch_size: DEFAULT_BATCH_SIZE,
                timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            },
            manual_overrides: None,
            keep_unmatched: true,
            stage_order: StageOrder::default(),
            families: None,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolverConfig, ResolverError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ResolverError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| ResolverError::ConfigParse(err.to_string()))?;

        let mut resolved = Self::resolve_config(config)?;
        // Relative override tables live next to the config file.
        if let Some(base) = config_path.parent().and_then(Utf8Path::from_path) {
            resolved.manual_overrides = resolved.manual_overrides.map(|path| {
                if path.is_relative() {
                    base.join(path)
                } else {
                    path
                }
            });
        }
        Ok(resolved)
    }

    pub fn resolve_config(config: Config) -> Result<ResolverConfig, ResolverError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let checklist = config.checklist.unwrap_or_default();
        let checklist = ChecklistSettings {
            url: checklist
                .url
                .unwrap_or_else(|| DEFAULT_CHECKLIST_URL.to_string()),
            file_name: checklist
                .file_name
                .unwrap_or_else(|| DEFAULT_CHECKLIST_FILE.to_string()),
        };

        let matcher = config.matcher.unwrap_or_default();
        let batch_size = matcher.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(ResolverError::ConfigParse(
                "matcher.batch_size must be positive".to_string(),
            ));
        }
        let matcher = MatcherSettings {
            url: matcher
                .url
                .unwrap_or_else(|| DEFAULT_MATCHER_URL.to_string()),
            rate_limit: RateLimit::from_millis(matcher.delay_ms.unwrap_or(DEFAULT_DELAY_MS)),
            batch_size,
            timeout: Duration::from_secs(matcher.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        };

        let stage_order = match config.stage_order {
            Some(value) => value.parse()?,
            None => StageOrder::default(),
        };

        let families = config.families.filter(|families| !families.is_empty());

        Ok(ResolverConfig {
            schema_version,
            data_dir: config.data_dir.map(Utf8PathBuf::from),
            checklist,
            matcher,
            manual_overrides: config.manual_overrides.map(Utf8PathBuf::from),
            keep_unmatched: config.keep_unmatched.unwrap_or(true),
            stage_order,
            families,
        })
    }
}
