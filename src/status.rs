use serde::{Deserialize, Serialize};

const COMPLETED_KEYWORDS: &[&str] = &[
    "abandon",
    "won",
    "lost",
    "draw",
    "tie",
    "stumps",
    "no result",
    "end of",
];
const LIVE_KEYWORDS: &[&str] = &["live", "in progress", "session", "day", "break"];
const UPCOMING_KEYWORDS: &[&str] = &[
    "scheduled",
    "not started",
    "upcoming",
    "to be played",
    "starts",
];

/// Canonical match phase. Provider text that fits none of the keyword groups
/// is kept as a lowercase `Other` label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MatchStatus {
    #[default]
    Upcoming,
    Live,
    Completed,
    Other(String),
}

impl MatchStatus {
    pub fn label(&self) -> &str {
        match self {
            MatchStatus::Upcoming => "upcoming",
            MatchStatus::Live => "live",
            MatchStatus::Completed => "completed",
            MatchStatus::Other(label) => label,
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "" | "upcoming" => MatchStatus::Upcoming,
            "live" => MatchStatus::Live,
            "completed" => MatchStatus::Completed,
            other => MatchStatus::Other(other.to_string()),
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, MatchStatus::Live)
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, MatchStatus::Completed)
    }

    /// Unrecognised labels are grouped with upcoming fixtures.
    pub fn is_upcoming(&self) -> bool {
        matches!(self, MatchStatus::Upcoming | MatchStatus::Other(_))
    }
}

impl From<String> for MatchStatus {
    fn from(label: String) -> Self {
        MatchStatus::from_label(&label)
    }
}

impl From<MatchStatus> for String {
    fn from(status: MatchStatus) -> Self {
        match status {
            MatchStatus::Other(label) => label,
            other => other.label().to_string(),
        }
    }
}

pub fn classify_status(raw: &str) -> MatchStatus {
    let value = raw.trim().to_lowercase();
    if value.is_empty() {
        return MatchStatus::Upcoming;
    }
    if contains_any(&value, COMPLETED_KEYWORDS) {
        return MatchStatus::Completed;
    }
    if contains_any(&value, LIVE_KEYWORDS) {
        return MatchStatus::Live;
    }
    if contains_any(&value, UPCOMING_KEYWORDS) {
        return MatchStatus::Upcoming;
    }
    MatchStatus::Other(value)
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_are_completed() {
        assert_eq!(
            classify_status("India won by 6 wickets"),
            MatchStatus::Completed
        );
        assert_eq!(classify_status("Match ABANDONED"), MatchStatus::Completed);
        assert_eq!(classify_status("No Result"), MatchStatus::Completed);
        assert_eq!(
            classify_status("Day 2: Stumps - Australia lead"),
            MatchStatus::Completed
        );
    }

    #[test]
    fn in_play_text_is_live() {
        assert_eq!(classify_status("Live"), MatchStatus::Live);
        assert_eq!(classify_status("Innings break"), MatchStatus::Live);
        assert_eq!(classify_status("Day 3 - Session 2"), MatchStatus::Live);
    }

    #[test]
    fn empty_and_scheduled_are_upcoming() {
        assert_eq!(classify_status(""), MatchStatus::Upcoming);
        assert_eq!(classify_status("   "), MatchStatus::Upcoming);
        assert_eq!(classify_status("Match not started"), MatchStatus::Upcoming);
        assert_eq!(classify_status("Scheduled"), MatchStatus::Upcoming);
    }

    #[test]
    fn unknown_text_passes_through_lowercase() {
        let status = classify_status("Toss Delayed");
        assert_eq!(status, MatchStatus::Other("toss delayed".to_string()));
        assert!(status.is_upcoming());
        assert_eq!(status.label(), "toss delayed");
    }

    #[test]
    fn completed_keywords_win_over_live() {
        // "won" and "live" both present; completed is checked first.
        assert_eq!(
            classify_status("Live updates: Pakistan won"),
            MatchStatus::Completed
        );
    }

    #[test]
    fn labels_round_trip_through_serde() {
        let json = serde_json::to_string(&MatchStatus::Live).unwrap();
        assert_eq!(json, "\"live\"");
        let back: MatchStatus = serde_json::from_str("\"rain delay\"").unwrap();
        assert_eq!(back, MatchStatus::Other("rain delay".to_string()));
    }
}
