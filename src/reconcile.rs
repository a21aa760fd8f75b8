//! Merging freshly normalized records into the cached state.
//!
//! Incoming data wins on data fields. Admin-owned fields (`shortName`,
//! `active`) survive every refresh and change only through `apply_series_edit`.
//! Cached records the provider stopped returning are kept.

use std::collections::HashMap;

use crate::cricapi::slugify;
use crate::state::{
    CachedState, CanonicalMatch, CanonicalSeries, DEFAULT_TOURNAMENT_NAME, SeriesEdit,
    generate_id,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub tournaments_added: usize,
}

pub fn merge_series(saved: &[CanonicalSeries], incoming: Vec<CanonicalSeries>) -> Vec<CanonicalSeries> {
    let mut used = vec![false; saved.len()];
    let mut merged = Vec::with_capacity(saved.len().max(incoming.len()));

    for entry in incoming {
        let hit = find_saved_by_id(saved, &used, &entry.id)
            .or_else(|| find_saved_by_name(saved, &used, &entry));
        match hit {
            Some(idx) => {
                used[idx] = true;
                merged.push(merge_series_entry(&saved[idx], entry));
            }
            None => merged.push(entry),
        }
    }

    for (idx, entry) in saved.iter().enumerate() {
        if !used[idx] {
            merged.push(restore_saved_series(entry));
        }
    }

    dedupe_by_id(merged)
}

/// `merge_series` against the cached tournaments, leaving dismissed series out.
/// The report counts tournaments by id before and after the merge.
pub fn merge_series_into(state: &mut CachedState, incoming: Vec<CanonicalSeries>) -> MergeReport {
    let incoming: Vec<CanonicalSeries> = incoming
        .into_iter()
        .filter(|s| !state.is_dismissed(&s.id) && !state.is_dismissed(&s.full_name))
        .collect();
    let before: HashMap<String, CanonicalSeries> = state
        .tournaments
        .iter()
        .map(|t| (t.id.clone(), t.clone()))
        .collect();
    state.tournaments = merge_series(&state.tournaments, incoming);

    let mut report = MergeReport::default();
    for tournament in &state.tournaments {
        match before.get(&tournament.id) {
            None => {
                report.added += 1;
                report.tournaments_added += 1;
            }
            Some(prev) if prev != tournament => report.updated += 1,
            Some(_) => report.unchanged += 1,
        }
    }
    report
}

fn find_saved_by_id(saved: &[CanonicalSeries], used: &[bool], id: &str) -> Option<usize> {
    if id.trim().is_empty() {
        return None;
    }
    saved
        .iter()
        .enumerate()
        .find(|(idx, s)| !used[*idx] && s.id == id)
        .map(|(idx, _)| idx)
}

fn find_saved_by_name(
    saved: &[CanonicalSeries],
    used: &[bool],
    incoming: &CanonicalSeries,
) -> Option<usize> {
    let keys = lowercase_keys(&[&incoming.id, &incoming.full_name]);
    if keys.is_empty() {
        return None;
    }
    saved
        .iter()
        .enumerate()
        .find(|(idx, s)| {
            !used[*idx]
                && lowercase_keys(&[&s.id, &s.full_name, &s.short_name])
                    .iter()
                    .any(|key| keys.contains(key))
        })
        .map(|(idx, _)| idx)
}

fn lowercase_keys(values: &[&String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

// The saved id is kept even when the entry was found by name, so matches
// that point at it stay attached.
fn merge_series_entry(saved: &CanonicalSeries, incoming: CanonicalSeries) -> CanonicalSeries {
    CanonicalSeries {
        id: saved.id.clone(),
        full_name: prefer(incoming.full_name, &saved.full_name),
        short_name: prefer(saved.short_name.clone(), &incoming.short_name),
        start_date: prefer(incoming.start_date, &saved.start_date),
        end_date: prefer(incoming.end_date, &saved.end_date),
        kind: prefer(incoming.kind, &saved.kind),
        active: saved.active,
        location: prefer(incoming.location, &saved.location),
        description: prefer(incoming.description, &saved.description),
    }
}

fn restore_saved_series(entry: &CanonicalSeries) -> CanonicalSeries {
    let mut out = entry.clone();
    if out.id.trim().is_empty() {
        let slug = slugify(&out.full_name);
        out.id = if slug.is_empty() {
            generate_id("saved")
        } else {
            slug
        };
    }
    if out.full_name.trim().is_empty() {
        out.full_name = if out.short_name.trim().is_empty() {
            out.id.clone()
        } else {
            out.short_name.clone()
        };
    }
    out
}

fn prefer(primary: String, fallback: &str) -> String {
    if primary.trim().is_empty() {
        fallback.to_string()
    } else {
        primary
    }
}

fn dedupe_by_id(items: Vec<CanonicalSeries>) -> Vec<CanonicalSeries> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|s| seen.insert(s.id.clone()))
        .collect()
}

/// Merges normalized matches into `state`, attaching each to a tournament by
/// name and creating the tournament when it is new. Matches whose tournament
/// was dismissed are skipped.
pub fn merge_matches(state: &mut CachedState, incoming: Vec<CanonicalMatch>) -> MergeReport {
    let mut report = MergeReport::default();
    let mut by_external: HashMap<String, usize> = state
        .matches
        .iter()
        .enumerate()
        .filter(|(_, m)| !m.external_id.is_empty())
        .map(|(idx, m)| (m.external_id.clone(), idx))
        .collect();
    let mut tournaments_by_name = tournament_name_index(&state.tournaments);

    for mut candidate in incoming {
        let Some(tournament_id) =
            ensure_tournament(state, &mut tournaments_by_name, &candidate.tournament_name, &mut report)
        else {
            report.skipped += 1;
            continue;
        };
        candidate.tournament_id = tournament_id;

        let existing = by_external
            .get(&candidate.external_id)
            .copied()
            .or_else(|| {
                if candidate.id.is_empty() {
                    None
                } else {
                    state.matches.iter().position(|m| m.id == candidate.id)
                }
            });

        match existing {
            Some(idx) => {
                let next = merge_match_entry(&state.matches[idx], candidate);
                if next == state.matches[idx] {
                    report.unchanged += 1;
                } else {
                    state.matches[idx] = next;
                    report.updated += 1;
                }
            }
            None => {
                if candidate.id.is_empty() {
                    candidate.id = match_id_for(state, &candidate.external_id);
                }
                if !candidate.external_id.is_empty() {
                    by_external.insert(candidate.external_id.clone(), state.matches.len());
                }
                state.matches.push(candidate);
                report.added += 1;
            }
        }
    }

    report
}

fn merge_match_entry(existing: &CanonicalMatch, incoming: CanonicalMatch) -> CanonicalMatch {
    CanonicalMatch {
        id: existing.id.clone(),
        end_time: prefer(incoming.end_time, &existing.end_time),
        venue: prefer(incoming.venue, &existing.venue),
        summary: prefer(incoming.summary, &existing.summary),
        external_source: incoming.external_source.or_else(|| existing.external_source.clone()),
        ..incoming
    }
}

// `match-<slug>`, with a numeric suffix when that id already belongs to
// another match.
fn match_id_for(state: &CachedState, external_id: &str) -> String {
    let slug = slugify(external_id);
    if slug.is_empty() {
        return generate_id("match");
    }
    let base = format!("match-{slug}");
    let mut id = base.clone();
    let mut n = 2;
    while state.find_match(&id).is_some() {
        id = format!("{base}-{n}");
        n += 1;
    }
    id
}

fn tournament_name_index(tournaments: &[CanonicalSeries]) -> HashMap<String, String> {
    let mut index = HashMap::new();
    for t in tournaments {
        for name in [&t.full_name, &t.short_name] {
            let key = name.trim().to_lowercase();
            if !key.is_empty() {
                index.entry(key).or_insert_with(|| t.id.clone());
            }
        }
    }
    index
}

fn ensure_tournament(
    state: &mut CachedState,
    by_name: &mut HashMap<String, String>,
    name: &str,
    report: &mut MergeReport,
) -> Option<String> {
    let name = if name.trim().is_empty() {
        DEFAULT_TOURNAMENT_NAME
    } else {
        name.trim()
    };
    let key = name.to_lowercase();
    if let Some(id) = by_name.get(&key) {
        return Some(id.clone());
    }

    let slug = slugify(name);
    let id = if slug.is_empty() {
        generate_id("tour")
    } else {
        format!("tour-{slug}")
    };
    // The derived id may belong to a tournament an admin renamed since.
    if state.tournament(&id).is_some() {
        by_name.insert(key, id.clone());
        return Some(id);
    }
    if state.is_dismissed(&key) || state.is_dismissed(&id) {
        return None;
    }

    state.tournaments.push(CanonicalSeries::named(id.clone(), name));
    by_name.insert(key, id.clone());
    report.tournaments_added += 1;
    Some(id)
}

/// Removes the tournament and every match that references it. Returns the
/// number of matches removed, or `None` when no such tournament exists.
pub fn delete_tournament(state: &mut CachedState, id: &str) -> Option<usize> {
    let idx = state.tournaments.iter().position(|t| t.id == id)?;
    let removed = state.tournaments.remove(idx);

    for key in [&removed.id, &removed.full_name] {
        let key = key.trim().to_lowercase();
        if !key.is_empty() && !state.dismissed.contains(&key) {
            state.dismissed.push(key);
        }
    }

    let before = state.matches.len();
    state.matches.retain(|m| m.tournament_id != id);
    Some(before - state.matches.len())
}

pub fn delete_match(state: &mut CachedState, id: &str) -> bool {
    let before = state.matches.len();
    state.matches.retain(|m| m.id != id);
    before != state.matches.len()
}

/// Inserts or replaces a tournament by id. Re-adding a dismissed tournament
/// lifts the dismissal.
pub fn upsert_tournament(state: &mut CachedState, tournament: CanonicalSeries) {
    let keys = lowercase_keys(&[&tournament.id, &tournament.full_name]);
    state.dismissed.retain(|d| !keys.contains(d));
    match state.tournaments.iter_mut().find(|t| t.id == tournament.id) {
        Some(existing) => *existing = tournament,
        None => state.tournaments.push(tournament),
    }
}

/// Inserts or replaces a match by id; a match without an id gets a fresh one.
pub fn upsert_match(state: &mut CachedState, mut candidate: CanonicalMatch) -> String {
    if candidate.id.trim().is_empty() {
        candidate.id = generate_id("match");
    }
    let id = candidate.id.clone();
    match state.matches.iter_mut().find(|m| m.id == id) {
        Some(existing) => *existing = candidate,
        None => state.matches.push(candidate),
    }
    id
}

pub fn apply_series_edit(state: &mut CachedState, id: &str, edit: &SeriesEdit) -> bool {
    let Some(series) = state.tournaments.iter_mut().find(|t| t.id == id) else {
        return false;
    };
    if let Some(short_name) = &edit.short_name {
        series.short_name = short_name.trim().to_string();
    }
    if let Some(active) = edit.active {
        series.active = active;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefer_keeps_fallback_for_blank() {
        assert_eq!(prefer("  ".to_string(), "saved"), "saved");
        assert_eq!(prefer("new".to_string(), "saved"), "new");
    }

    #[test]
    fn name_match_ignores_case_and_keeps_saved_id() {
        let saved = vec![CanonicalSeries {
            short_name: "WTC".to_string(),
            active: true,
            ..CanonicalSeries::named("tour-1", "World Test Championship")
        }];
        let incoming = vec![CanonicalSeries::named("c1f2", "WORLD TEST CHAMPIONSHIP")];
        let merged = merge_series(&saved, incoming);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, "tour-1");
        assert_eq!(merged[0].full_name, "WORLD TEST CHAMPIONSHIP");
        assert_eq!(merged[0].short_name, "WTC");
        assert!(merged[0].active);
    }

    #[test]
    fn saved_entry_is_claimed_once() {
        let saved = vec![CanonicalSeries::named("s1", "Asia Cup")];
        let incoming = vec![
            CanonicalSeries::named("x", "Asia Cup"),
            CanonicalSeries::named("y", "asia cup"),
        ];
        let merged = merge_series(&saved, incoming);
        let ids: Vec<&str> = merged.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "y"]);
    }

    #[test]
    fn saved_entries_without_id_get_one() {
        let saved = vec![CanonicalSeries {
            short_name: "IPL".to_string(),
            ..CanonicalSeries::named("", "")
        }];
        let merged = merge_series(&saved, Vec::new());
        assert_eq!(merged[0].full_name, "IPL");
        assert!(merged[0].id.starts_with("saved-"));
    }

    #[test]
    fn edits_only_touch_named_fields() {
        let mut state = CachedState {
            tournaments: vec![CanonicalSeries::named("s1", "Big Bash League")],
            ..CachedState::default()
        };
        let edit = SeriesEdit {
            short_name: Some(" BBL ".to_string()),
            active: None,
        };
        assert!(apply_series_edit(&mut state, "s1", &edit));
        assert_eq!(state.tournaments[0].short_name, "BBL");
        assert!(!state.tournaments[0].active);
        assert!(!apply_series_edit(&mut state, "missing", &edit));
    }
}
