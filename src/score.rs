use std::fmt::Write as _;

use serde_json::Value;

use crate::resolve::as_text;

/// Renders one innings entry as `runs/wickets (overs ov)`.
///
/// Parts that are missing are left out. With no runs or wickets the literal
/// `score` field is used, and an empty string comes back when that is absent too.
pub fn format_score(entry: &Value) -> String {
    if !entry.is_object() {
        return String::new();
    }
    let runs = pick_count(entry, &["runs", "r"]);
    let wickets = pick_count(entry, &["wickets", "w"]);
    let overs = pick_overs(entry);

    let mut out = String::new();
    if let Some(runs) = runs {
        let _ = write!(out, "{runs}");
    }
    if let Some(wickets) = wickets {
        if out.is_empty() {
            let _ = write!(out, "{wickets}");
        } else {
            let _ = write!(out, "/{wickets}");
        }
    }
    if out.is_empty() {
        return entry.get("score").and_then(as_text).unwrap_or_default();
    }
    if let Some(overs) = overs {
        let _ = write!(out, " ({overs} ov)");
    }
    out
}

/// Picks the innings entry for `team`, matching on the `inning` label and
/// falling back to the entry at `position`.
pub fn score_entry_for<'a>(scores: &'a [Value], team: &str, position: usize) -> Option<&'a Value> {
    let needle = team.trim().to_lowercase();
    let by_inning = if needle.is_empty() {
        None
    } else {
        scores.iter().find(|entry| {
            entry
                .get("inning")
                .and_then(Value::as_str)
                .is_some_and(|inning| inning.to_lowercase().contains(&needle))
        })
    };
    by_inning.or_else(|| scores.get(position))
}

pub fn team_score(scores: &[Value], team: &str, position: usize) -> String {
    score_entry_for(scores, team, position)
        .map(format_score)
        .unwrap_or_default()
}

// A numeric zero means no overs were bowled; the string "0" is kept as given.
fn pick_overs(entry: &Value) -> Option<String> {
    ["overs", "o"]
        .iter()
        .filter_map(|key| entry.get(*key))
        .filter(|value| !matches!(value, Value::Number(n) if n.as_f64() == Some(0.0)))
        .find_map(as_text)
}

fn pick_count(entry: &Value, keys: &[&str]) -> Option<i64> {
    keys.iter()
        .filter_map(|key| entry.get(*key))
        .find_map(parse_count)
}

fn parse_count(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let trimmed = s.trim();
            let end = trimmed
                .char_indices()
                .find(|(idx, c)| !(c.is_ascii_digit() || (*idx == 0 && *c == '-')))
                .map(|(idx, _)| idx)
                .unwrap_or(trimmed.len());
            trimmed[..end].parse::<i64>().ok()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_innings_line() {
        let entry = json!({"runs": 182, "wickets": 5, "overs": 20});
        assert_eq!(format_score(&entry), "182/5 (20 ov)");
    }

    #[test]
    fn runs_only() {
        assert_eq!(format_score(&json!({"runs": 150})), "150");
    }

    #[test]
    fn literal_score_fallback() {
        assert_eq!(format_score(&json!({"score": "145 all out"})), "145 all out");
        assert_eq!(format_score(&json!({})), "");
        assert_eq!(format_score(&Value::Null), "");
    }

    #[test]
    fn short_keys_and_string_numbers() {
        let entry = json!({"r": "201", "w": "8", "o": 19.4});
        assert_eq!(format_score(&entry), "201/8 (19.4 ov)");
    }

    #[test]
    fn only_numeric_zero_overs_are_dropped() {
        assert_eq!(format_score(&json!({"r": 0, "w": 0, "o": 0})), "0/0");
        assert_eq!(format_score(&json!({"r": 0, "w": 0, "o": 0.0})), "0/0");
        assert_eq!(format_score(&json!({"r": 4, "w": 0, "o": "0"})), "4/0 (0 ov)");
    }

    #[test]
    fn picks_entry_by_inning_label() {
        let scores = vec![
            json!({"inning": "Australia Inning 1", "r": 287, "w": 10, "o": 88.2}),
            json!({"inning": "India Inning 1", "r": 325, "w": 10, "o": 101}),
        ];
        assert_eq!(team_score(&scores, "India", 0), "325/10 (101 ov)");
        assert_eq!(team_score(&scores, "England", 1), "325/10 (101 ov)");
        assert_eq!(team_score(&scores, "England", 4), "");
    }
}
