use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::status::MatchStatus;

pub const DEFAULT_TOURNAMENT_NAME: &str = "Cricscanner Fixtures";
pub const SOURCE_NAME: &str = "cricapi";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalMatch {
    /// Cache id; assigned by the reconciler and kept across refreshes.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub tournament_id: String,
    #[serde(default)]
    pub external_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_source: Option<String>,
    #[serde(default)]
    pub tournament_name: String,
    #[serde(default)]
    pub match_name: String,
    pub team_a: String,
    pub team_b: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(default)]
    pub status: MatchStatus,
    #[serde(default)]
    pub status_text: String,
    #[serde(default)]
    pub score_a: String,
    #[serde(default)]
    pub score_b: String,
    #[serde(default, alias = "location")]
    pub venue: String,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalSeries {
    pub id: String,
    #[serde(alias = "name")]
    pub full_name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
}

impl CanonicalSeries {
    pub fn named(id: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            full_name: full_name.into(),
            ..Self::default()
        }
    }

    pub fn display_name(&self) -> &str {
        if self.short_name.trim().is_empty() {
            &self.full_name
        } else {
            &self.short_name
        }
    }
}

/// Partial admin update for a series. `None` leaves the field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesEdit {
    pub short_name: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedState {
    #[serde(default)]
    pub tournaments: Vec<CanonicalSeries>,
    #[serde(default)]
    pub matches: Vec<CanonicalMatch>,
    /// Lowercase ids and names of tournaments an admin deleted. Polls never
    /// recreate them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dismissed: Vec<String>,
}

impl CachedState {
    pub fn tournament(&self, id: &str) -> Option<&CanonicalSeries> {
        self.tournaments.iter().find(|t| t.id == id)
    }

    pub fn find_match(&self, id: &str) -> Option<&CanonicalMatch> {
        self.matches.iter().find(|m| m.id == id)
    }

    pub fn matches_for(&self, tournament_id: &str) -> Vec<&CanonicalMatch> {
        self.matches
            .iter()
            .filter(|m| m.tournament_id == tournament_id)
            .collect()
    }

    pub fn active_tournaments(&self) -> Vec<&CanonicalSeries> {
        self.tournaments.iter().filter(|t| t.active).collect()
    }

    pub fn live_matches(&self) -> Vec<&CanonicalMatch> {
        self.matches.iter().filter(|m| m.status.is_live()).collect()
    }

    /// Case-insensitive search over full name, short name and type, sorted by
    /// full name. An empty query returns everything.
    pub fn search_series(&self, query: &str) -> Vec<&CanonicalSeries> {
        let query = query.trim().to_lowercase();
        let mut out: Vec<&CanonicalSeries> = self
            .tournaments
            .iter()
            .filter(|series| {
                query.is_empty()
                    || [&series.full_name, &series.short_name, &series.kind]
                        .iter()
                        .any(|value| value.to_lowercase().contains(&query))
            })
            .collect();
        out.sort_by_key(|series| series.full_name.to_lowercase());
        out
    }

    pub fn is_dismissed(&self, key: &str) -> bool {
        let key = key.trim().to_lowercase();
        !key.is_empty() && self.dismissed.iter().any(|d| *d == key)
    }
}

/// Presentation-side model: the last reconciled cache plus an event log.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub data: CachedState,
    pub logs: VecDeque<String>,
    pub last_synced: Option<SystemTime>,
    pub save_error: Option<String>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }
}

#[derive(Debug, Clone)]
pub enum Delta {
    /// Full snapshot after a successful reconciliation or admin save.
    SetState(CachedState),
    SaveFailed {
        action: String,
        error: String,
    },
    Log(String),
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    PollNow,
    RefreshSeries,
    EditSeries { id: String, edit: SeriesEdit },
    DeleteTournament { id: String },
    DeleteMatch { id: String },
    Shutdown,
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::SetState(data) => {
            state.data = data;
            state.last_synced = Some(SystemTime::now());
            state.save_error = None;
        }
        Delta::SaveFailed { action, error } => {
            state.push_log(format!("[ALERT] {action} failed: {error}"));
            state.save_error = Some(error);
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}

/// `<prefix>-<random>-<millis>`, both parts base36.
pub fn generate_id(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let random = to_base36(rng.gen_range(0..36u64.pow(6)));
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();
    format!("{prefix}-{random}-{}", to_base36(millis))
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Bundled data used when nothing usable is cached yet.
pub fn seed_state() -> CachedState {
    CachedState {
        tournaments: vec![
            CanonicalSeries {
                location: "Global Venues".to_string(),
                description: "Top-ranked nations compete across the globe.".to_string(),
                ..CanonicalSeries::named("tour-1", "World Test Championship")
            },
            CanonicalSeries {
                location: "United States".to_string(),
                description: "A high-octane franchise tournament under the lights.".to_string(),
                ..CanonicalSeries::named("tour-2", "Champions T20 League")
            },
        ],
        matches: vec![
            seed_match(SeedMatch {
                id: "match-1",
                tournament_id: "tour-1",
                teams: ("India", "Australia"),
                start: "2024-07-20T09:00:00-04:00",
                end: "2024-07-24T17:00:00-04:00",
                scores: ("325 & 210/3", "287 & 198"),
                venue: "Lord's, London",
                status: MatchStatus::Completed,
            }),
            seed_match(SeedMatch {
                id: "match-2",
                tournament_id: "tour-2",
                teams: ("Seattle Strikers", "Miami Thunder"),
                start: "2024-07-18T19:30:00-04:00",
                end: "2024-07-18T22:30:00-04:00",
                scores: ("182/5", "179/7"),
                venue: "Lumen Field, Seattle",
                status: MatchStatus::Completed,
            }),
            seed_match(SeedMatch {
                id: "match-3",
                tournament_id: "tour-2",
                teams: ("Austin Comets", "Boston Blazers"),
                start: "2024-07-28T18:00:00-04:00",
                end: "",
                scores: ("", ""),
                venue: "Q2 Stadium, Austin",
                status: MatchStatus::Upcoming,
            }),
        ],
        dismissed: Vec::new(),
    }
}

struct SeedMatch {
    id: &'static str,
    tournament_id: &'static str,
    teams: (&'static str, &'static str),
    start: &'static str,
    end: &'static str,
    scores: (&'static str, &'static str),
    venue: &'static str,
    status: MatchStatus,
}

fn seed_match(seed: SeedMatch) -> CanonicalMatch {
    CanonicalMatch {
        id: seed.id.to_string(),
        tournament_id: seed.tournament_id.to_string(),
        team_a: seed.teams.0.to_string(),
        team_b: seed.teams.1.to_string(),
        match_name: format!("{} vs {}", seed.teams.0, seed.teams.1),
        start_time: seed.start.to_string(),
        end_time: seed.end.to_string(),
        score_a: seed.scores.0.to_string(),
        score_b: seed.scores.1.to_string(),
        venue: seed.venue.to_string(),
        status_text: seed.status.label().to_string(),
        status: seed.status,
        ..CanonicalMatch::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_carry_prefix_and_differ() {
        let a = generate_id("match");
        let b = generate_id("match");
        assert!(a.starts_with("match-"));
        assert_eq!(a.split('-').count(), 3);
        assert_ne!(a, b);
    }

    #[test]
    fn base36_encodes() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn seed_matches_reference_seed_tournaments() {
        let seed = seed_state();
        for m in &seed.matches {
            assert!(seed.tournament(&m.tournament_id).is_some());
        }
        assert_eq!(seed.matches_for("tour-2").len(), 2);
    }

    #[test]
    fn search_is_case_insensitive_and_sorted() {
        let mut state = seed_state();
        state.tournaments[1].kind = "T20".to_string();
        let hits = state.search_series("t20");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "tour-2");

        let all = state.search_series("  ");
        assert_eq!(all[0].full_name, "Champions T20 League");
        assert_eq!(all[1].full_name, "World Test Championship");
    }

    #[test]
    fn active_tournaments_follow_the_flag() {
        let mut state = seed_state();
        assert!(state.active_tournaments().is_empty());
        state.tournaments[1].active = true;
        let active: Vec<&str> = state.active_tournaments().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(active, vec!["tour-2"]);
    }

    #[test]
    fn save_failure_is_kept_for_display() {
        let mut state = AppState::new();
        apply_delta(
            &mut state,
            Delta::SaveFailed {
                action: "Delete tournament".to_string(),
                error: "disk full".to_string(),
            },
        );
        assert_eq!(state.save_error.as_deref(), Some("disk full"));
        assert!(state.logs.back().is_some_and(|l| l.starts_with("[ALERT]")));

        apply_delta(&mut state, Delta::SetState(seed_state()));
        assert!(state.save_error.is_none());
        assert!(state.last_synced.is_some());
    }
}
