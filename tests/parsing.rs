use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use cricscanner::cricapi::{parse_envelope_json, parse_matches_json, parse_series_json};
use cricscanner::error::SyncError;
use cricscanner::state::SOURCE_NAME;
use cricscanner::status::MatchStatus;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-12-21T00:00:00Z")
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

#[test]
fn parses_current_matches_fixture() {
    let raw = read_fixture("current_matches.json");
    let matches = parse_matches_json(&raw, now()).expect("fixture should parse");
    // One record has no teams, one repeats an external id.
    assert_eq!(matches.len(), 3);

    let test = &matches[0];
    assert_eq!(test.external_id, "a1f0c2d4-0001");
    assert_eq!(test.team_a, "India");
    assert_eq!(test.team_b, "Australia");
    assert_eq!(test.status, MatchStatus::Completed);
    assert_eq!(test.status_text, "India won by 6 wkts");
    assert_eq!(test.start_time, "2024-12-06T03:30:00.000Z");
    assert_eq!(test.score_a, "337/10 (87.3 ov)");
    assert_eq!(test.score_b, "180/10 (44.1 ov)");
    assert_eq!(test.venue, "Adelaide Oval, Adelaide");
    assert_eq!(test.external_source.as_deref(), Some(SOURCE_NAME));
}

#[test]
fn alternate_field_names_resolve() {
    let raw = read_fixture("current_matches.json");
    let matches = parse_matches_json(&raw, now()).expect("fixture should parse");

    let live = &matches[1];
    assert_eq!(live.external_id, "90211");
    assert_eq!(live.team_a, "Melbourne Stars");
    assert_eq!(live.team_b, "Sydney Sixers");
    assert_eq!(live.tournament_name, "Big Bash League 2024-25");
    assert_eq!(live.match_name, "Melbourne Stars vs Sydney Sixers");
    assert!(live.status.is_live());
    assert_eq!(live.start_time, "2024-12-20T08:15:00Z");
    assert_eq!(live.score_a, "142/3 (16.2 ov)");
    assert_eq!(live.score_b, "");
    assert_eq!(live.venue, "MCG, Melbourne");

    let upcoming = &matches[2];
    assert_eq!(upcoming.team_a, "Perth Scorchers");
    assert_eq!(upcoming.team_b, "Hobart Hurricanes");
    assert_eq!(upcoming.status, MatchStatus::Upcoming);
    assert_eq!(upcoming.summary, "Perth Scorchers vs Hobart Hurricanes is coming up soon.");
}

#[test]
fn parses_series_fixture() {
    let raw = read_fixture("series.json");
    let series = parse_series_json(&raw).expect("fixture should parse");
    // The record with neither id nor name is dropped, as is the repeated id.
    assert_eq!(series.len(), 3);

    assert_eq!(series[0].id, "bbl-2024");
    assert_eq!(series[0].start_date, "2024-12-15");
    assert_eq!(series[0].end_date, "Jan 27");

    assert_eq!(series[1].id, "wtc-25");
    assert_eq!(series[1].full_name, "World Test Championship");
    assert_eq!(series[1].kind, "test");

    assert_eq!(series[2].id, "women-s-premier-league");
    assert!(series.iter().all(|s| !s.active));
}

#[test]
fn failure_payload_is_a_provider_error() {
    let raw = read_fixture("failure.json");
    let err = parse_envelope_json(&raw).expect_err("failure status should not parse");
    match err {
        SyncError::Provider(msg) => assert!(msg.contains("hits limit")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn malformed_payloads_are_reported() {
    for raw in ["", "null", "[1,2]", "{\"status\":\"success\",\"data\":{}}", "<html>"] {
        let err = parse_envelope_json(raw).expect_err("should be rejected");
        assert!(
            matches!(err, SyncError::MalformedResponse(_)),
            "{raw:?} gave {err:?}"
        );
    }
}

#[test]
fn missing_status_is_tolerated() {
    let items = parse_envelope_json(r#"{"data":[{"teams":["A","B"]}]}"#).expect("should parse");
    assert_eq!(items.len(), 1);
}
