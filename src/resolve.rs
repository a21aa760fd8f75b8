//! Ordered-candidate field lookup over provider JSON.
//!
//! Each logical field owns one list of candidate paths. The first path that
//! lands on a present, non-empty value wins. Missing or null intermediate
//! nodes simply fail that candidate.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seg {
    Key(&'static str),
    Index(usize),
}

pub type Path = &'static [Seg];

use Seg::{Index, Key};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    TeamA,
    TeamB,
    Tournament,
    MatchName,
    KickoffGmt,
    StartTime,
    Venue,
    Status,
    Scores,
    ExternalId,
    SeriesId,
    SeriesName,
    SeriesShortName,
    SeriesStart,
    SeriesEnd,
    SeriesType,
}

const TEAM_A: &[Path] = &[
    &[Key("teamInfo"), Index(0), Key("name")],
    &[Key("teams"), Index(0)],
    &[Key("team"), Index(0)],
    &[Key("teamA")],
];
const TEAM_B: &[Path] = &[
    &[Key("teamInfo"), Index(1), Key("name")],
    &[Key("teams"), Index(1)],
    &[Key("team"), Index(1)],
    &[Key("teamB")],
];
const TOURNAMENT: &[Path] = &[
    &[Key("series")],
    &[Key("matchType")],
    &[Key("tournament")],
    &[Key("event")],
];
const MATCH_NAME: &[Path] = &[&[Key("name")], &[Key("matchName")]];
const KICKOFF_GMT: &[Path] = &[&[Key("dateTimeGMT")]];
const START_TIME: &[Path] = &[&[Key("startTime")], &[Key("startDate")], &[Key("date")]];
const VENUE: &[Path] = &[
    &[Key("venue")],
    &[Key("ground")],
    &[Key("location")],
    &[Key("stadium")],
];
const STATUS: &[Path] = &[&[Key("status")], &[Key("statusText")]];
const SCORES: &[Path] = &[&[Key("score")], &[Key("scores")]];
const EXTERNAL_ID: &[Path] = &[
    &[Key("id")],
    &[Key("matchId")],
    &[Key("unique_id")],
    &[Key("matchIdNew")],
];
const SERIES_ID: &[Path] = &[
    &[Key("id")],
    &[Key("series_id")],
    &[Key("seriesId")],
    &[Key("unique_id")],
    &[Key("identifier")],
    &[Key("guid")],
];
const SERIES_NAME: &[Path] = &[
    &[Key("name")],
    &[Key("fullName")],
    &[Key("title")],
    &[Key("seriesName")],
    &[Key("series_title")],
    &[Key("tournament")],
    &[Key("tournamentName")],
];
const SERIES_SHORT_NAME: &[Path] = &[&[Key("shortName")], &[Key("short_name")]];
const SERIES_START: &[Path] = &[
    &[Key("startDate")],
    &[Key("start_date")],
    &[Key("startdate")],
    &[Key("start_time")],
    &[Key("startTime")],
];
const SERIES_END: &[Path] = &[
    &[Key("endDate")],
    &[Key("end_date")],
    &[Key("enddate")],
    &[Key("end_time")],
    &[Key("endTime")],
];
const SERIES_TYPE: &[Path] = &[
    &[Key("type")],
    &[Key("seriesType")],
    &[Key("category")],
    &[Key("gameType")],
];

impl Field {
    pub fn candidates(self) -> &'static [Path] {
        match self {
            Field::TeamA => TEAM_A,
            Field::TeamB => TEAM_B,
            Field::Tournament => TOURNAMENT,
            Field::MatchName => MATCH_NAME,
            Field::KickoffGmt => KICKOFF_GMT,
            Field::StartTime => START_TIME,
            Field::Venue => VENUE,
            Field::Status => STATUS,
            Field::Scores => SCORES,
            Field::ExternalId => EXTERNAL_ID,
            Field::SeriesId => SERIES_ID,
            Field::SeriesName => SERIES_NAME,
            Field::SeriesShortName => SERIES_SHORT_NAME,
            Field::SeriesStart => SERIES_START,
            Field::SeriesEnd => SERIES_END,
            Field::SeriesType => SERIES_TYPE,
        }
    }

    pub fn team(index: usize) -> Self {
        if index == 0 { Field::TeamA } else { Field::TeamB }
    }
}

pub fn lookup<'a>(value: &'a Value, path: &[Seg]) -> Option<&'a Value> {
    path.iter().try_fold(value, |node, seg| match seg {
        Seg::Key(key) => node.get(*key),
        Seg::Index(idx) => node.get(*idx),
    })
}

/// First candidate that renders as non-empty text.
pub fn resolve_str(value: &Value, field: Field) -> Option<String> {
    field
        .candidates()
        .iter()
        .filter_map(|path| lookup(value, path))
        .find_map(as_text)
}

/// `resolve_str` with an empty-string fallback.
pub fn resolve_or_empty(value: &Value, field: Field) -> String {
    resolve_str(value, field).unwrap_or_default()
}

/// First candidate that is a JSON array.
pub fn resolve_array(value: &Value, field: Field) -> &[Value] {
    field
        .candidates()
        .iter()
        .filter_map(|path| lookup(value, path))
        .find_map(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

pub fn resolve_bool(value: &Value, key: &str) -> bool {
    match value.get(key) {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes"),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        _ => false,
    }
}

pub fn as_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Object(map) => {
            let name = map.get("name").or_else(|| map.get("shortname"));
            match name {
                Some(Value::String(s)) => s.trim().to_string(),
                _ => return None,
            }
        }
        _ => return None,
    };
    if text.is_empty() { None } else { Some(text) }
}
