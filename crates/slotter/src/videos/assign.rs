//! Choosing which country's video fills each placeholder.
//!
//! Each placeholder may show any country playing in the match it precedes.
//! The choice minimises the total value score with each video used at most
//! once; when there are not enough distinct videos, the least-used
//! candidate is repeated.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, info, warn};

use super::dataset::{VideoDataset, VideoEntry};
use super::slots::PlaceholderSlot;
use crate::country::{format_codes, normalize_code};

/// Cost of a pairing that is not allowed.
pub const INFEASIBLE_COST: f64 = 1e12;

/// Cost of leaving a placeholder for the duplicate pass.
pub const DUPLICATE_COST: f64 = 1e11;

const TIE_BREAK: f64 = 1e-6;

/// A placeholder and the video chosen for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment<'a> {
    /// The placeholder.
    pub slot: &'a PlaceholderSlot,
    /// Alpha-3 code of the chosen country.
    pub code: &'static str,
    /// The chosen video.
    pub video: &'a VideoEntry,
}

/// Solve the rectangular assignment problem for `cost` (rows ≤ columns),
/// minimising the total cost.
///
/// Returns the column chosen for each row, or `None` when there are fewer
/// columns than rows.
#[must_use]
pub fn hungarian(cost: &[Vec<f64>]) -> Option<Vec<Option<usize>>> {
    let rows = cost.len();
    if rows == 0 {
        return Some(Vec::new());
    }
    let cols = cost[0].len();
    if cols < rows {
        return None;
    }

    // Potentials and matching are 1-based; index 0 is the virtual column.
    let mut u = vec![0.0_f64; rows + 1];
    let mut v = vec![0.0_f64; cols + 1];
    let mut p = vec![0_usize; cols + 1];
    let mut way = vec![0_usize; cols + 1];

    for i in 1..=rows {
        p[0] = i;
        let mut min_v = vec![f64::INFINITY; cols + 1];
        let mut used = vec![false; cols + 1];
        let mut j0 = 0;
        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0;
            for j in 1..=cols {
                if used[j] {
                    continue;
                }
                let current = cost[i0 - 1][j - 1] - u[i0] - v[j];
                if current < min_v[j] {
                    min_v[j] = current;
                    way[j] = j0;
                }
                if min_v[j] < delta {
                    delta = min_v[j];
                    j1 = j;
                }
            }
            if delta.is_infinite() {
                break;
            }
            for j in 0..=cols {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    min_v[j] -= delta;
                }
            }
            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut assignment = vec![None; rows];
    for (column, &row) in p.iter().enumerate().skip(1) {
        if row != 0 {
            assignment[row - 1] = Some(column - 1);
        }
    }
    Some(assignment)
}

fn tie_break(index: usize) -> f64 {
    f64::from(u32::try_from(index).unwrap_or(u32::MAX)) * TIE_BREAK
}

fn slot_label(slot: &PlaceholderSlot) -> String {
    format!("match #{} on sheet {}", slot.match_number, slot.sheet_title)
}

/// Candidate countries for each slot, with diagnostics for slots that have
/// none.
fn candidates<'a>(
    slots: &'a [PlaceholderSlot],
    match_countries: &BTreeMap<u32, Vec<&str>>,
    dataset: &VideoDataset,
    diagnostics: &mut Vec<String>,
) -> Vec<(&'a PlaceholderSlot, Vec<&'static str>)> {
    let mut result = Vec::new();
    let mut logged = HashSet::new();
    let mut unresolved_logged = HashSet::new();
    let mut missing_logged = HashSet::new();

    for slot in slots {
        let n = slot.match_number;
        let countries = match_countries.get(&n).map(Vec::as_slice).unwrap_or_default();
        if countries.is_empty() {
            diagnostics.push(format!(
                "Match #{n} on sheet {} is missing country data in the imported schedule.",
                slot.sheet_title
            ));
            continue;
        }

        let key = (slot.sheet_title.as_str(), n);
        let mut codes: Vec<&'static str> = Vec::new();
        let mut unresolved: Vec<String> = Vec::new();
        for raw in countries {
            match normalize_code(raw) {
                Some(code) if !codes.contains(&code) => codes.push(code),
                Some(_) => {}
                None => {
                    let trimmed = raw.trim();
                    let label = if trimmed.is_empty() { "(blank)" } else { trimmed };
                    unresolved.push(label.to_string());
                }
            }
        }

        if !unresolved.is_empty() && unresolved_logged.insert(key) {
            unresolved.sort();
            unresolved.dedup();
            diagnostics.push(format!(
                "Unrecognized country codes in schedule for match #{n}: {}.",
                unresolved.join(", ")
            ));
        }
        if codes.is_empty() {
            diagnostics.push(format!(
                "Match #{n} on sheet {} has country entries, but none could be normalized.",
                slot.sheet_title
            ));
            continue;
        }
        if logged.insert(key) {
            info!("Match #{n} schedule countries: {}", format_codes(&codes));
        }

        let mut valid = Vec::new();
        let mut missing = Vec::new();
        let mut without_value = Vec::new();
        for code in codes {
            match dataset.find_entry(code) {
                None => missing.push(code),
                Some(entry) if entry.value.is_none() => without_value.push(code),
                Some(_) => valid.push(code),
            }
        }

        if !missing.is_empty() {
            missing.sort_unstable();
            let formatted = format_codes(&missing);
            if missing_logged.insert(key) {
                diagnostics.push(format!(
                    "No videos found for countries {formatted} in match #{n}."
                ));
            }
            info!("Missing videos for match #{n}: {formatted}");
        }
        if valid.is_empty() {
            diagnostics.push(format!(
                "Match #{n} on sheet {} has no assignable countries with videos.",
                slot.sheet_title
            ));
            continue;
        }
        if !without_value.is_empty() {
            without_value.sort_unstable();
            let formatted = format_codes(&without_value);
            diagnostics.push(format!(
                "Countries {formatted} in match #{n} lack value scores and were ignored."
            ));
            info!("Ignored countries without value scores for match #{n}: {formatted}");
        }

        result.push((slot, valid));
    }
    result
}

/// Assign a video to every slot whose match has countries with videos.
///
/// Returns the assignments in slot order and the diagnostics gathered on
/// the way.
#[must_use]
pub fn assign<'a>(
    slots: &'a [PlaceholderSlot],
    match_countries: &BTreeMap<u32, Vec<&str>>,
    dataset: &'a VideoDataset,
) -> (Vec<Assignment<'a>>, Vec<String>) {
    let mut diagnostics = Vec::new();
    let slot_candidates = candidates(slots, match_countries, dataset, &mut diagnostics);
    if slot_candidates.is_empty() {
        return (Vec::new(), diagnostics);
    }

    info!("Slot candidates and available country videos:");
    for (slot, codes) in &slot_candidates {
        let mut sorted = codes.clone();
        sorted.sort_unstable();
        info!(
            "  - Sheet='{}', match #{}, placeholder index {}: {}",
            slot.sheet_title,
            slot.match_number,
            slot.index,
            sorted.join(", ")
        );
    }

    let mut unique: Vec<&'static str> = slot_candidates
        .iter()
        .flat_map(|(_, codes)| codes.iter().copied())
        .collect();
    unique.sort_unstable();
    unique.dedup();
    info!(
        "Unique country videos identified: {}",
        if unique.is_empty() { "(none)".to_string() } else { unique.join(", ") }
    );
    if unique.len() < slot_candidates.len() {
        diagnostics.push(format!(
            "{} placeholders reached assignment, but only {} unique country videos were available.",
            slot_candidates.len(),
            unique.len()
        ));
        diagnostics.push(
            "Fewer unique country videos are available than placeholders; \
             duplicates may be required."
                .to_string(),
        );
    }

    // Dummy columns let the solver leave a slot for the duplicate pass.
    let mut columns: Vec<Option<&'static str>> = unique.iter().copied().map(Some).collect();
    columns.resize(columns.len().max(slot_candidates.len()), None);

    let cost: Vec<Vec<f64>> = slot_candidates
        .iter()
        .map(|(slot, codes)| {
            columns
                .iter()
                .map(|column| match column {
                    None => DUPLICATE_COST + tie_break(slot.index),
                    Some(code) if codes.contains(code) => dataset
                        .find_entry(code)
                        .and_then(|entry| entry.value)
                        .map_or(INFEASIBLE_COST, |value| value + tie_break(slot.index)),
                    Some(_) => INFEASIBLE_COST,
                })
                .collect()
        })
        .collect();

    let Some(solution) = hungarian(&cost) else {
        diagnostics.push(
            "Unable to compute assignments because there are fewer available countries \
             than placeholders."
                .to_string(),
        );
        return (Vec::new(), diagnostics);
    };

    let mut results: BTreeMap<usize, Assignment<'a>> = BTreeMap::new();
    let mut unmatched = Vec::new();
    let mut assigned: HashMap<&'static str, usize> = HashMap::new();

    for (row, (slot, _)) in slot_candidates.iter().enumerate() {
        let Some(column) = solution
            .get(row)
            .copied()
            .flatten()
            .filter(|c| *c < columns.len())
        else {
            diagnostics.push(format!(
                "No available country could be assigned to placeholder before {}.",
                slot_label(slot)
            ));
            unmatched.push(row);
            continue;
        };
        if cost[row][column] >= INFEASIBLE_COST {
            diagnostics.push(format!(
                "No valid assignment found for placeholder before {}.",
                slot_label(slot)
            ));
            unmatched.push(row);
            continue;
        }
        let Some(code) = columns[column] else {
            unmatched.push(row);
            continue;
        };
        let Some(video) = dataset.find_entry(code).filter(|entry| entry.value.is_some()) else {
            unmatched.push(row);
            continue;
        };
        if assigned.get(code).copied().unwrap_or_default() > 0 {
            unmatched.push(row);
            continue;
        }
        *assigned.entry(code).or_default() += 1;
        results.insert(row, Assignment { slot, code, video });
    }

    let mut duplicate_messages = Vec::new();
    for row in unmatched {
        let (slot, codes) = &slot_candidates[row];
        let best = codes
            .iter()
            .filter_map(|code| {
                let video = dataset.find_entry(code)?;
                let value = video.value?;
                Some((assigned.get(code).copied().unwrap_or_default(), value, *code, video))
            })
            .min_by(|a, b| {
                a.0.cmp(&b.0)
                    .then_with(|| a.1.total_cmp(&b.1))
                    .then_with(|| a.2.cmp(b.2))
            });
        let Some((uses, _, code, video)) = best else {
            diagnostics.push(format!(
                "Unable to assign any video to placeholder before {}, \
                 even after allowing duplicates.",
                slot_label(slot)
            ));
            continue;
        };
        assigned.insert(code, uses + 1);
        if uses > 0 {
            duplicate_messages.push(format!(
                "Duplicate assignment: country {code} reused for match #{}.",
                slot.match_number
            ));
        }
        results.insert(row, Assignment { slot, code, video });
    }

    let ordered: Vec<Assignment<'a>> = results.into_values().collect();

    let mut matches_by_code: BTreeMap<&str, Vec<u32>> = BTreeMap::new();
    for assignment in &ordered {
        matches_by_code
            .entry(assignment.code)
            .or_default()
            .push(assignment.slot.match_number);
    }
    for (code, mut matches) in matches_by_code {
        if matches.len() > 1 {
            matches.sort_unstable();
            matches.dedup();
            let list: Vec<String> = matches.iter().map(ToString::to_string).collect();
            warn!("Duplicate video required: {code} assigned to matches {}.", list.join(", "));
        }
    }

    duplicate_messages.sort();
    diagnostics.extend(duplicate_messages);
    debug!(assigned = ordered.len(), "Computed team video assignments");
    (ordered, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{spreadsheet, videos_tab};
    use pretty_assertions::assert_eq;

    fn slot(sheet: &str, row: usize, match_number: u32, index: usize) -> PlaceholderSlot {
        PlaceholderSlot {
            sheet_title: sheet.to_string(),
            row,
            task_column: 2,
            match_number,
            index,
            video_number_column: Some(1),
            duration_column: Some(0),
        }
    }

    fn dataset() -> VideoDataset {
        let ros = spreadsheet("ROS", vec![("Videos", videos_tab())]);
        VideoDataset::from_spreadsheet(&ros).0
    }

    #[test]
    fn test_hungarian_minimises_total() {
        let cost = vec![
            vec![4.0, 1.0, 3.0],
            vec![2.0, 0.0, 5.0],
            vec![3.0, 2.0, 2.0],
        ];
        assert_eq!(hungarian(&cost), Some(vec![Some(1), Some(0), Some(2)]));
    }

    #[test]
    fn test_hungarian_rectangular() {
        let cost = vec![vec![5.0, 1.0, 9.0], vec![5.0, 2.0, 9.0]];
        assert_eq!(hungarian(&cost), Some(vec![Some(1), Some(0)]));
        assert_eq!(hungarian(&[vec![1.0], vec![2.0]]), None);
        assert_eq!(hungarian(&[]), Some(vec![]));
    }

    #[test]
    fn test_assign_prefers_lower_values() {
        let dataset = dataset();
        let slots = vec![slot("Day 1", 1, 1, 0), slot("Day 1", 2, 1, 1)];
        let mut countries = BTreeMap::new();
        countries.insert(1, vec!["FRA", "JPN", "KEN"]);

        let (assignments, diagnostics) = assign(&slots, &countries, &dataset);
        let codes: Vec<&str> = assignments.iter().map(|a| a.code).collect();
        assert_eq!(codes.len(), 2);
        assert!(codes.contains(&"FRA"));
        assert!(codes.contains(&"JPN"));
        assert_eq!(
            diagnostics,
            vec![
                "Countries KEN (Kenya) in match #1 lack value scores and were ignored.".to_string()
            ]
        );
    }

    #[test]
    fn test_assign_reuses_when_short() {
        let dataset = dataset();
        let slots = vec![slot("Day 1", 1, 1, 0), slot("Day 1", 5, 2, 0)];
        let mut countries = BTreeMap::new();
        countries.insert(1, vec!["FRA"]);
        countries.insert(2, vec!["fr", "BRA"]);

        let (assignments, diagnostics) = assign(&slots, &countries, &dataset);
        assert_eq!(assignments.len(), 2);
        assert!(assignments.iter().all(|a| a.code == "FRA"));
        assert!(diagnostics.contains(
            &"Duplicate assignment: country FRA reused for match #2.".to_string()
        ));
        assert!(diagnostics.contains(
            &"No videos found for countries BRA (Brazil) in match #2.".to_string()
        ));
        assert!(diagnostics.contains(
            &"2 placeholders reached assignment, but only 1 unique country videos were available."
                .to_string()
        ));
    }

    #[test]
    fn test_assign_missing_countries() {
        let dataset = dataset();
        let slots = vec![slot("Day 1", 1, 7, 0), slot("Day 1", 2, 8, 0)];
        let mut countries = BTreeMap::new();
        countries.insert(8, vec!["??"]);

        let (assignments, diagnostics) = assign(&slots, &countries, &dataset);
        assert!(assignments.is_empty());
        assert_eq!(
            diagnostics,
            vec![
                "Match #7 on sheet Day 1 is missing country data in the imported schedule."
                    .to_string(),
                "Unrecognized country codes in schedule for match #8: ??.".to_string(),
                "Match #8 on sheet Day 1 has country entries, but none could be normalized."
                    .to_string(),
            ]
        );
    }
}
