use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::config::Config;
use crate::error::SyncError;
use crate::http_client::http_client;
use crate::resolve::{Field, resolve_array, resolve_bool, resolve_or_empty, resolve_str};
use crate::score::team_score;
use crate::state::{CanonicalMatch, CanonicalSeries, DEFAULT_TOURNAMENT_NAME, SOURCE_NAME};
use crate::status::{MatchStatus, classify_status};

pub const DEFAULT_BASE_URL: &str = "https://api.cricapi.com/v1";
const PLACEHOLDER_KEY: &str = "YOUR_CRICAPI_KEY";

/// Source of raw provider records. Implementations return the `data` array
/// of a successful response.
pub trait Provider: Send + Sync {
    fn fetch_matches(&self) -> Result<Vec<Value>, SyncError>;
    fn fetch_series(&self) -> Result<Vec<Value>, SyncError>;
}

pub struct CricApi {
    base_url: String,
    api_key: Option<String>,
}

impl CricApi {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty() && !key.contains(PLACEHOLDER_KEY));
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.base_url.clone(), config.api_key.clone())
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn get_data(&self, endpoint: &str, extra: &[(&str, &str)]) -> Result<Vec<Value>, SyncError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(SyncError::Provider("CricAPI key is not configured".to_string()));
        };
        let client = http_client().map_err(|err| SyncError::Network(format!("{err:#}")))?;
        let url = format!("{}/{endpoint}", self.base_url);

        let resp = client
            .get(&url)
            .query(&[("apikey", key)])
            .query(extra)
            .send()
            .map_err(|err| SyncError::Network(format!("{endpoint}: {err}")))?;
        let status = resp.status();
        let body = resp
            .text()
            .map_err(|err| SyncError::Network(format!("{endpoint}: failed reading body: {err}")))?;
        if !status.is_success() {
            return Err(SyncError::Provider(format!("{endpoint}: http {status}")));
        }
        parse_envelope_json(&body)
    }
}

impl Provider for CricApi {
    fn fetch_matches(&self) -> Result<Vec<Value>, SyncError> {
        self.get_data("currentMatches", &[("offset", "0")])
    }

    fn fetch_series(&self) -> Result<Vec<Value>, SyncError> {
        self.get_data("series", &[])
    }
}

/// Unwraps a `{status, data[]}` envelope.
pub fn parse_envelope_json(raw: &str) -> Result<Vec<Value>, SyncError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(SyncError::MalformedResponse("empty body".to_string()));
    }
    let root: Value = serde_json::from_str(trimmed)
        .map_err(|err| SyncError::MalformedResponse(format!("invalid json: {err}")))?;
    if !root.is_object() {
        return Err(SyncError::MalformedResponse(
            "expected a json object".to_string(),
        ));
    }
    if let Some(status) = root.get("status") {
        let status = status.as_str().unwrap_or_default();
        if !status.eq_ignore_ascii_case("success") {
            let reason = root
                .get("reason")
                .or_else(|| root.get("message"))
                .and_then(Value::as_str)
                .unwrap_or(status);
            return Err(SyncError::Provider(format!("status {status:?}: {reason}")));
        }
    }
    match root.get("data") {
        Some(Value::Array(items)) => Ok(items.clone()),
        _ => Err(SyncError::MalformedResponse(
            "missing data array".to_string(),
        )),
    }
}

pub fn parse_matches_json(raw: &str, now: DateTime<Utc>) -> Result<Vec<CanonicalMatch>, SyncError> {
    let items = parse_envelope_json(raw)?;
    Ok(normalize_matches(&items, now))
}

pub fn parse_series_json(raw: &str) -> Result<Vec<CanonicalSeries>, SyncError> {
    let items = parse_envelope_json(raw)?;
    Ok(normalize_series_batch(&items))
}

/// Normalizes a batch, dropping records without both teams and repeated
/// external ids.
pub fn normalize_matches(items: &[Value], now: DateTime<Utc>) -> Vec<CanonicalMatch> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(|item| normalize_match(item, now))
        .filter(|m| seen.insert(m.external_id.clone()))
        .collect()
}

pub fn normalize_match(raw: &Value, now: DateTime<Utc>) -> Option<CanonicalMatch> {
    if !raw.is_object() {
        return None;
    }
    let team_a = resolve_str(raw, Field::team(0))?;
    let team_b = resolve_str(raw, Field::team(1))?;

    let tournament_name =
        resolve_str(raw, Field::Tournament).unwrap_or_else(|| DEFAULT_TOURNAMENT_NAME.to_string());
    let match_name =
        resolve_str(raw, Field::MatchName).unwrap_or_else(|| format!("{team_a} vs {team_b}"));
    let start_time = resolve_str(raw, Field::KickoffGmt)
        .and_then(|gmt| parse_instant(&gmt))
        .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Millis, true))
        .or_else(|| resolve_str(raw, Field::StartTime))
        .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Millis, true));

    let status_text = resolve_or_empty(raw, Field::Status);
    let status = if status_text.is_empty() {
        if resolve_bool(raw, "matchStarted") {
            MatchStatus::Live
        } else {
            MatchStatus::Upcoming
        }
    } else {
        classify_status(&status_text)
    };

    let scores = resolve_array(raw, Field::Scores);
    let score_a = team_score(scores, &team_a, 0);
    let score_b = team_score(scores, &team_b, 1);

    let external_id = resolve_str(raw, Field::ExternalId)
        .unwrap_or_else(|| format!("{team_a}-{team_b}-{start_time}"));

    let mut out = CanonicalMatch {
        id: String::new(),
        tournament_id: String::new(),
        external_id,
        external_source: Some(SOURCE_NAME.to_string()),
        tournament_name,
        match_name,
        team_a,
        team_b,
        start_time,
        end_time: String::new(),
        status_text: if status_text.is_empty() {
            status.label().to_string()
        } else {
            status_text
        },
        status,
        score_a,
        score_b,
        venue: resolve_or_empty(raw, Field::Venue),
        summary: String::new(),
    };
    out.summary = fallback_summary(&out);
    Some(out)
}

pub fn normalize_series_batch(items: &[Value]) -> Vec<CanonicalSeries> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(normalize_series)
        .filter(|s| seen.insert(s.id.clone()))
        .collect()
}

/// Id comes from the provider, else the slugified name, else a hash of the
/// name. Records with neither an id nor a name have no stable identity and
/// are dropped.
pub fn normalize_series(raw: &Value) -> Option<CanonicalSeries> {
    if !raw.is_object() {
        return None;
    }
    let provider_id = resolve_str(raw, Field::SeriesId);
    let name = resolve_str(raw, Field::SeriesName);
    let (id, full_name) = match (provider_id, name) {
        (Some(id), Some(name)) => (id, name),
        (Some(id), None) => {
            let name = format!("Series {id}");
            (id, name)
        }
        (None, Some(name)) => (series_id_from_name(&name), name),
        (None, None) => return None,
    };

    Some(CanonicalSeries {
        id,
        full_name,
        short_name: resolve_or_empty(raw, Field::SeriesShortName),
        start_date: resolve_or_empty(raw, Field::SeriesStart),
        end_date: resolve_or_empty(raw, Field::SeriesEnd),
        kind: resolve_or_empty(raw, Field::SeriesType),
        active: false,
        location: String::new(),
        description: String::new(),
    })
}

fn series_id_from_name(name: &str) -> String {
    let slug = slugify(name);
    if !slug.is_empty() {
        return slug;
    }
    // FNV-1a, so names without ascii alphanumerics still map to the same id.
    let hash = name.trim().bytes().fold(0xcbf2_9ce4_8422_2325_u64, |acc, byte| {
        (acc ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    });
    format!("series-{hash:016x}")
}

pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.trim().to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

pub fn fallback_summary(m: &CanonicalMatch) -> String {
    let extra = m.status_text.trim();
    match m.status {
        MatchStatus::Completed => {
            format!("{} and {} completed their clash. {extra}", m.team_a, m.team_b)
                .trim()
                .to_string()
        }
        MatchStatus::Live => format!("{} vs {} is currently live. {extra}", m.team_a, m.team_b)
            .trim()
            .to_string(),
        _ => format!("{} vs {} is coming up soon.", m.team_a, m.team_b),
    }
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ts.with_timezone(&Utc));
    }
    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ];
    for fmt in FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
