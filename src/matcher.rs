use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::cache::{ContentKey, ContentStore};
use crate::config::MatcherSettings;
use crate::error::ResolverError;

pub const MATCH_CACHE_TAG: &str = "knms_matches";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    delay: Duration,
}

impl RateLimit {
    pub fn from_millis(millis: u64) -> Self {
        Self {
            delay: Duration::from_millis(millis),
        }
    }

    pub fn none() -> Self {
        Self::from_millis(0)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[derive(Debug)]
pub struct Throttle {
    policy: RateLimit,
    last_call: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(policy: RateLimit) -> Self {
        Self {
            policy,
            last_call: Mutex::new(None),
        }
    }

    pub fn wait(&self) {
        let mut last_call = self.last_call.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.policy.delay() {
                thread::sleep(self.policy.delay() - elapsed);
            }
        }
        *last_call = Some(Instant::now());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchState {
    #[serde(rename = "true")]
    Single,
    #[serde(rename = "multiple_matches")]
    Multiple,
    #[serde(rename = "false")]
    NoMatch,
}

impl fmt::Display for MatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchState::Single => write!(f, "true"),
            MatchState::Multiple => write!(f, "multiple_matches"),
            MatchState::NoMatch => write!(f, "false"),
        }
    }
}

impl FromStr for MatchState {
    type Err = ResolverError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "true" => Ok(MatchState::Single),
            "multiple_matches" => Ok(MatchState::Multiple),
            "false" => Ok(MatchState::NoMatch),
            other => Err(ResolverError::MatcherResponse(format!(
                "unknown match_state {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub submitted: String,
    pub match_state: MatchState,
    pub external_id: Option<String>,
    pub matched_name: Option<String>,
}

pub trait NameMatcher: Send + Sync {
    fn match_names(&self, names: &[String]) -> Result<Vec<MatchRecord>, ResolverError>;
}

impl<T: NameMatcher + ?Sized> NameMatcher for &T {
    fn match_names(&self, names: &[String]) -> Result<Vec<MatchRecord>, ResolverError> {
        (**self).match_names(names)
    }
}

pub struct KnmsHttpClient {
    client: Client,
    url: String,
    batch_size: usize,
    throttle: Throttle,
}

impl KnmsHttpClient {
    pub fn new(settings: &MatcherSettings) -> Result<Self, ResolverError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("taxon-resolver/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ResolverError::MatcherHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()
            .map_err(|err| ResolverError::MatcherHttp(err.to_string()))?;
        Ok(Self {
            client,
            url: settings.url.clone(),
            batch_size: settings.batch_size.max(1),
            throttle: Throttle::new(settings.rate_limit),
        })
    }

    fn post_batch(&self, names: &[String]) -> Result<Vec<MatchRecord>, ResolverError> {
        let response = self
            .client
            .post(&self.url)
            .json(names)
            .send()
            .map_err(|err| ResolverError::MatcherHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "name matching request failed".to_string());
            return Err(ResolverError::MatcherStatus { status, message });
        }
        let body: Value = response
            .json()
            .map_err(|err| ResolverError::MatcherResponse(err.to_string()))?;
        parse_match_response(&body)
    }
}

impl NameMatcher for KnmsHttpClient {
    fn match_names(&self, names: &[String]) -> Result<Vec<MatchRecord>, ResolverError> {
        match_in_batches(names, self.batch_size, &self.throttle, |batch| {
            self.post_batch(batch)
        })
    }
}

fn match_in_batches<F>(
    names: &[String],
    batch_size: usize,
    throttle: &Throttle,
    mut post: F,
) -> Result<Vec<MatchRecord>, ResolverError>
where
    F: FnMut(&[String]) -> Result<Vec<MatchRecord>, ResolverError>,
{
    let mut records = Vec::new();
    for (index, batch) in names.chunks(batch_size.max(1)).enumerate() {
        throttle.wait();
        debug!(batch = index, size = batch.len(), "posting names to matcher");
        records.extend(post(batch)?);
    }
    Ok(records)
}

/// Reads `{"records": [[submitted, match_state, id, matched_name], ...]}`.
/// Continuation rows of a multi-candidate group leave the first two cells
/// empty, so they are forward-filled.
pub fn parse_match_response(body: &Value) -> Result<Vec<MatchRecord>, ResolverError> {
    let rows = body
        .get("records")
        .and_then(Value::as_array)
        .ok_or_else(|| ResolverError::MatcherResponse("missing records array".to_string()))?;

    let mut records = Vec::with_capacity(rows.len());
    let mut submitted: Option<String> = None;
    let mut state: Option<MatchState> = None;
    for row in rows {
        let cells = row
            .as_array()
            .ok_or_else(|| ResolverError::MatcherResponse("record is not an array".to_string()))?;
        let cell = |index: usize| {
            cells
                .get(index)
                .and_then(value_as_text)
                .filter(|value| !value.is_empty())
        };

        if let Some(value) = cell(0) {
            submitted = Some(value);
        }
        if let Some(value) = cell(1) {
            state = Some(value.parse()?);
        }
        let (Some(submitted), Some(state)) = (submitted.clone(), state) else {
            return Err(ResolverError::MatcherResponse(
                "record without submitted name or match state".to_string(),
            ));
        };
        records.push(MatchRecord {
            submitted,
            match_state: state,
            external_id: cell(2),
            matched_name: cell(3),
        });
    }
    Ok(records)
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

pub struct CachedMatcher<M: NameMatcher> {
    inner: M,
    store: Arc<dyn ContentStore>,
}

impl<M: NameMatcher> CachedMatcher<M> {
    pub fn new(inner: M, store: Arc<dyn ContentStore>) -> Self {
        Self { inner, store }
    }
}

impl<M: NameMatcher> NameMatcher for CachedMatcher<M> {
    fn match_names(&self, names: &[String]) -> Result<Vec<MatchRecord>, ResolverError> {
        let key = ContentKey::for_names(MATCH_CACHE_TAG, names);
        if let Some(content) = self.store.get(&key)? {
            debug!(key = %key.file_name(), "using cached name matches");
            return decode_records(&content);
        }
        let records = self.inner.match_names(names)?;
        let content = encode_records(&records)?;
        let location = self.store.put(&key, &content)?;
        info!(file = %location, records = records.len(), "cached name matches");
        Ok(records)
    }
}

fn encode_records(records: &[MatchRecord]) -> Result<Vec<u8>, ResolverError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer
            .serialize(record)
            .map_err(|err| ResolverError::TableWrite(err.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|err| ResolverError::TableWrite(err.to_string()))
}

fn decode_records(content: &[u8]) -> Result<Vec<MatchRecord>, ResolverError> {
    csv::Reader::from_reader(content)
        .deserialize()
        .collect::<Result<Vec<MatchRecord>, _>>()
        .map_err(|err| ResolverError::TableRead(err.to_string()))
}
