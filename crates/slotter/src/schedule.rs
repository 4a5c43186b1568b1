//! Match schedule import.
//!
//! The event's match schedule is a JSON export with a top-level `matches`
//! list. Entries are loosely structured: match numbers and countries appear
//! under several different keys depending on the export, so the accessors
//! here are deliberately tolerant.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::country;
use crate::error::{Error, Result};

/// A schedule entry.
pub type Match = Map<String, Value>;

/// Lowest and highest field numbers at the event.
pub const FIELD_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

const NUMBER_KEYS: &[&str] = &[
    "matchNumber",
    "match_number",
    "matchNumberDisplay",
    "matchnumber",
    "matchNo",
    "id",
];
const NUMBER_FALLBACK_KEYS: &[&str] = &["matchKey", "match"];
const COUNTRY_KEYS: &[&str] = &[
    "country",
    "countryCode",
    "country_code",
    "countrycode",
    "teamCountry",
];
const TEAM_LIST_KEYS: &[&str] = &[
    "countries",
    "countryCodes",
    "teams",
    "participants",
    "alliances",
    "blueAllianceTeams",
    "redAllianceTeams",
];
const MAX_COUNTRY_DEPTH: usize = 6;

static DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));
static DATE_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));

/// Check that `field` is a field number used at the event.
///
/// # Errors
///
/// Returns an error when the field is outside 1..=5.
pub fn validate_field(field: u8) -> Result<u8> {
    if FIELD_RANGE.contains(&field) {
        Ok(field)
    } else {
        Err(Error::schedule(
            "Select a valid field number between 1 and 5.",
        ))
    }
}

/// An imported match schedule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schedule {
    matches: Vec<Value>,
}

impl Schedule {
    /// Parse a schedule export.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not JSON or has no `matches` list.
    pub fn from_json(text: &str) -> Result<Self> {
        let data: Value = serde_json::from_str(text)
            .map_err(|e| Error::schedule(format!("Failed to parse JSON: {e}")))?;
        match data.get("matches") {
            Some(Value::Array(matches)) => Ok(Self {
                matches: matches.clone(),
            }),
            _ => Err(Error::schedule(
                "JSON file does not contain a 'matches' list.",
            )),
        }
    }

    /// Read and parse a schedule export from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                Error::schedule("Selected file could not be found.")
            } else {
                Error::FileRead {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let schedule = Self::from_json(&text)?;
        debug!(path = %path.display(), matches = schedule.len(), "Loaded match schedule");
        Ok(schedule)
    }

    /// Total number of entries, on every field.
    #[must_use]
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Whether the schedule has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Entries played on `field`, in file order.
    #[must_use]
    pub fn matches_for_field(&self, field: u8) -> Vec<&Match> {
        self.matches
            .iter()
            .filter_map(Value::as_object)
            .filter(|m| is_on_field(m, field))
            .collect()
    }

    /// Number of matches per date on `field`, dates ascending.
    #[must_use]
    pub fn counts_by_date(&self, field: u8) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for m in self.dated_matches(field) {
            *counts.entry(m.0).or_insert(0) += 1;
        }
        counts
    }

    /// Matches on `field` grouped by date, dates ascending and matches in
    /// play order.
    #[must_use]
    pub fn matches_by_date(&self, field: u8) -> Vec<(String, Vec<&Match>)> {
        let mut grouped: BTreeMap<String, Vec<&Match>> = BTreeMap::new();
        for (date, m) in self.dated_matches(field) {
            grouped.entry(date).or_default().push(m);
        }
        grouped
            .into_iter()
            .map(|(date, mut matches)| {
                matches.sort_by(|a, b| compare_matches(a, b));
                (date, matches)
            })
            .collect()
    }

    /// The import summary: totals, then one line per date.
    #[must_use]
    pub fn summary(&self, field: u8) -> Vec<String> {
        let counts = self.counts_by_date(field);
        let field_total: usize = counts.values().sum();
        let mut lines = Vec::with_capacity(counts.len() + 1);
        if counts.is_empty() {
            lines.push(format!(
                "Imported {} matches. No matches found on Field {field}.",
                self.len()
            ));
            lines.push(format!("No matches on Field {field} were found."));
        } else {
            lines.push(format!(
                "Imported {} matches. {field_total} occur on Field {field}.",
                self.len()
            ));
            lines.extend(
                counts
                    .iter()
                    .map(|(date, total)| format!("{date} has {total} matches on Field {field}")),
            );
        }
        lines
    }

    fn dated_matches(&self, field: u8) -> impl Iterator<Item = (String, &Match)> {
        self.matches_for_field(field).into_iter().filter_map(|m| {
            let timestamp = m.get("scheduledTime")?.as_str()?;
            Some((date_of(timestamp)?, m))
        })
    }
}

fn is_on_field(m: &Match, field: u8) -> bool {
    m.get("field")
        .and_then(Value::as_f64)
        .is_some_and(|value| (value - f64::from(field)).abs() < f64::EPSILON)
}

/// Parse an ISO-8601 timestamp.
///
/// Returns the timestamp in its own offset and, when it carried one, the
/// same instant in UTC.
fn parse_timestamp(timestamp: &str) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let text = timestamp.trim();
    if text.is_empty() {
        return None;
    }
    let with_offset = text.replace('Z', "+00:00");
    for format in ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z", "%Y-%m-%d %H:%M:%S%.f%:z"] {
        if let Ok(parsed) = DateTime::parse_from_str(&with_offset, format) {
            return Some((parsed.naive_local(), parsed.naive_utc()));
        }
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some((parsed, parsed));
        }
    }
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some((midnight, midnight))
}

/// The calendar date of a schedule timestamp, as `YYYY-MM-DD`.
///
/// The date is taken in the timestamp's own offset.
#[must_use]
pub fn date_of(timestamp: &str) -> Option<String> {
    if let Some((local, _)) = parse_timestamp(timestamp) {
        return Some(local.date().format("%Y-%m-%d").to_string());
    }
    let (prefix, _) = timestamp.trim().split_once('T')?;
    DATE_PREFIX_RE
        .is_match(prefix)
        .then(|| prefix.to_string())
}

/// Play order: scheduled UTC time, then match number, then a descriptive
/// key. Entries without a usable time sort last.
fn compare_matches(a: &Match, b: &Match) -> Ordering {
    let time = |m: &Match| {
        m.get("scheduledTime")
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
            .map(|(_, utc)| utc)
    };
    let time_order = match (time(a), time(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    let number_order = match (match_number(a), match_number(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    time_order
        .then(number_order)
        .then_with(|| fallback_key(a).cmp(fallback_key(b)))
}

fn fallback_key(m: &Match) -> &str {
    ["matchKey", "description", "name"]
        .iter()
        .filter_map(|key| m.get(*key).and_then(Value::as_str))
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

/// The match number of a schedule entry.
#[must_use]
pub fn match_number(m: &Match) -> Option<u32> {
    NUMBER_KEYS
        .iter()
        .chain(NUMBER_FALLBACK_KEYS)
        .find_map(|key| m.get(*key).and_then(coerce_number))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn coerce_number(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => {
            if let Some(n) = number.as_u64() {
                return u32::try_from(n).ok();
            }
            let f = number.as_f64()?;
            (f.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&f)).then(|| f as u32)
        }
        Value::String(text) => {
            let last = DIGITS_RE.find_iter(text.trim()).last()?;
            last.as_str().parse().ok()
        }
        _ => None,
    }
}

fn format_detail(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Number(number) => Some(match number.as_f64() {
            Some(f) if number.is_f64() && f.fract() == 0.0 => format!("{f:.0}"),
            _ => number.to_string(),
        }),
        Value::String(text) => {
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        _ => None,
    }
}

/// A one-line description of a schedule entry for diagnostics.
#[must_use]
pub fn describe(m: &Match) -> String {
    let mut details = Vec::new();
    if let Some((label, value)) = ["matchKey", "description", "name", "id"]
        .iter()
        .find_map(|label| format_detail(m.get(*label)).map(|value| (label, value)))
    {
        details.push(format!("{label}={value}"));
    }
    if let Some(value) = format_detail(m.get("scheduledTime")) {
        details.push(format!("scheduledTime={value}"));
    }
    if let Some(value) = format_detail(m.get("field")) {
        details.push(format!("field={value}"));
    }
    if !details.is_empty() {
        return details.join(", ");
    }

    let mut keys: Vec<&str> = m.keys().map(String::as_str).collect();
    if keys.is_empty() {
        return "no additional details available".to_string();
    }
    keys.sort_unstable();
    format!("available keys: {}", keys.join(", "))
}

/// Countries found in a schedule entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchCountries {
    /// The strings that resolved to a country, as written.
    pub raw: Vec<String>,
    /// Resolved alpha-3 codes in first-seen order.
    pub codes: Vec<&'static str>,
}

impl MatchCountries {
    fn visit(&mut self, value: &Value, depth: usize, seen_raw: &mut HashSet<String>) {
        if depth > MAX_COUNTRY_DEPTH {
            return;
        }
        match value {
            Value::String(text) => {
                let Some(code) = country::normalize_code(text) else {
                    return;
                };
                let stripped = text.trim();
                if !stripped.is_empty() && seen_raw.insert(stripped.to_string()) {
                    self.raw.push(stripped.to_string());
                }
                if !self.codes.contains(&code) {
                    self.codes.push(code);
                }
            }
            Value::Object(object) => {
                for key in COUNTRY_KEYS {
                    if let Some(inner) = object.get(*key) {
                        self.visit(inner, depth + 1, seen_raw);
                    }
                }
                for inner in object.values() {
                    if inner.is_array() || inner.is_object() {
                        self.visit(inner, depth + 1, seen_raw);
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.visit(item, depth + 1, seen_raw);
                }
            }
            _ => {}
        }
    }
}

/// Collect the countries playing in a schedule entry.
///
/// Team lists are searched first; when they yield nothing, every nested
/// list or object in the entry is searched.
#[must_use]
pub fn countries(m: &Match) -> MatchCountries {
    let mut found = MatchCountries::default();
    let mut seen_raw = HashSet::new();
    for key in TEAM_LIST_KEYS {
        if let Some(value) = m.get(*key) {
            found.visit(value, 0, &mut seen_raw);
        }
    }
    if found.codes.is_empty() {
        for value in m.values() {
            if value.is_array() || value.is_object() {
                found.visit(value, 0, &mut seen_raw);
            }
        }
    }
    found
}

fn bracketed<S: AsRef<str>>(items: &[S]) -> String {
    let joined: Vec<&str> = items.iter().map(AsRef::as_ref).collect();
    format!("[{}]", joined.join(", "))
}

/// Map match numbers to their countries.
///
/// Entries without a number or without countries are skipped with a
/// diagnostic. A later entry with the same number replaces an earlier one.
#[must_use]
pub fn build_match_country_map(
    matches: &[&Match],
) -> (BTreeMap<u32, Vec<&'static str>>, Vec<String>) {
    let mut mapping = BTreeMap::new();
    let mut diagnostics = Vec::new();

    for m in matches {
        let Some(number) = match_number(m) else {
            diagnostics.push(format!(
                "Schedule entry missing match number. Details: {}.",
                describe(m)
            ));
            continue;
        };

        let found = countries(m);
        let display_names: Vec<String> = found
            .codes
            .iter()
            .map(|code| {
                country::display_name(code)
                    .map_or_else(|| format!("(unrecognized {code})"), str::to_string)
            })
            .collect();
        debug!("Match #{number}: raw country values -> {}", bracketed(&found.raw));
        debug!(
            "Match #{number}: normalized country codes -> {}",
            bracketed(&found.codes)
        );
        debug!("Match #{number}: display country names -> {}", bracketed(&display_names));

        if found.codes.is_empty() {
            diagnostics.push(format!(
                "No country entries found for match #{number}. Details: {}.",
                describe(m)
            ));
            continue;
        }
        mapping.insert(number, found.codes);
    }

    info!(matches = mapping.len(), "Built match country map");
    (mapping, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn entry(value: Value) -> Match {
        value.as_object().cloned().unwrap()
    }

    fn sample() -> Schedule {
        Schedule::from_json(
            &json!({
                "matches": [
                    {"matchNumber": 3, "field": 1, "scheduledTime": "2025-10-31T10:00:00Z"},
                    {"matchNumber": 1, "field": 1, "scheduledTime": "2025-10-31T09:00:00Z"},
                    {"matchNumber": 2, "field": 2, "scheduledTime": "2025-10-31T09:00:00Z"},
                    {"matchNumber": 9, "field": 1, "scheduledTime": "2025-11-01T08:00:00+01:00"},
                    {"matchNumber": 8, "field": 1, "scheduledTime": "2025-11-01T07:30:00Z"},
                    {"matchNumber": 4, "field": 1},
                    "not an object"
                ]
            })
            .to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_missing_matches_list() {
        let err = Schedule::from_json(r#"{"games": []}"#).unwrap_err();
        assert_eq!(err.to_string(), "JSON file does not contain a 'matches' list.");
        let err = Schedule::from_json("[1, 2]").unwrap_err();
        assert_eq!(err.to_string(), "JSON file does not contain a 'matches' list.");
        let err = Schedule::from_json("{").unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse JSON"));
    }

    #[test]
    fn test_validate_field() {
        assert_eq!(validate_field(1).unwrap(), 1);
        assert_eq!(validate_field(5).unwrap(), 5);
        assert!(validate_field(0).is_err());
        assert!(validate_field(6).is_err());
    }

    #[test]
    fn test_date_of() {
        assert_eq!(date_of("2025-10-31T23:30:00Z").as_deref(), Some("2025-10-31"));
        assert_eq!(
            date_of("2025-11-01T00:30:00+02:00").as_deref(),
            Some("2025-11-01")
        );
        assert_eq!(date_of("2025-10-31T09:15").as_deref(), Some("2025-10-31"));
        assert_eq!(date_of("2025-10-31").as_deref(), Some("2025-10-31"));
        assert_eq!(date_of("2025-10-31Tmorning").as_deref(), Some("2025-10-31"));
        assert_eq!(date_of("tomorrow"), None);
        assert_eq!(date_of("  "), None);
    }

    #[test]
    fn test_counts_and_grouping() {
        let schedule = sample();
        assert_eq!(schedule.len(), 7);
        assert_eq!(schedule.matches_for_field(1).len(), 5);

        let counts = schedule.counts_by_date(1);
        assert_eq!(counts.get("2025-10-31"), Some(&2));
        assert_eq!(counts.get("2025-11-01"), Some(&2));

        let grouped = schedule.matches_by_date(1);
        let numbers: Vec<(String, Vec<u32>)> = grouped
            .iter()
            .map(|(date, matches)| {
                (
                    date.clone(),
                    matches.iter().filter_map(|m| match_number(m)).collect(),
                )
            })
            .collect();
        assert_eq!(
            numbers,
            vec![
                ("2025-10-31".to_string(), vec![1, 3]),
                ("2025-11-01".to_string(), vec![9, 8]),
            ]
        );
    }

    #[test]
    fn test_summary_lines() {
        let schedule = sample();
        assert_eq!(
            schedule.summary(1),
            vec![
                "Imported 7 matches. 4 occur on Field 1.".to_string(),
                "2025-10-31 has 2 matches on Field 1".to_string(),
                "2025-11-01 has 2 matches on Field 1".to_string(),
            ]
        );
        assert_eq!(
            schedule.summary(4)[0],
            "Imported 7 matches. No matches found on Field 4."
        );
    }

    #[test]
    fn test_match_number_keys_and_coercion() {
        assert_eq!(match_number(&entry(json!({"matchNumber": 12}))), Some(12));
        assert_eq!(match_number(&entry(json!({"id": 7.0}))), Some(7));
        assert_eq!(match_number(&entry(json!({"id": 7.5}))), None);
        assert_eq!(match_number(&entry(json!({"matchKey": "Q-2025-014"}))), Some(14));
        assert_eq!(match_number(&entry(json!({"matchNo": true, "match": "M5"}))), Some(5));
        assert_eq!(match_number(&entry(json!({"matchNumber": "  "}))), None);
        assert_eq!(match_number(&entry(json!({}))), None);
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            describe(&entry(json!({
                "description": "Qualification 3",
                "id": 3,
                "scheduledTime": "2025-10-31T09:00:00Z",
                "field": 2.0
            }))),
            "description=Qualification 3, scheduledTime=2025-10-31T09:00:00Z, field=2"
        );
        assert_eq!(
            describe(&entry(json!({"teams": [], "alliances": null}))),
            "available keys: alliances, teams"
        );
        assert_eq!(describe(&entry(json!({}))), "no additional details available");
    }

    #[test]
    fn test_countries_walk() {
        let m = entry(json!({
            "alliances": {
                "blue": {"teams": [
                    {"teamCountry": "usa", "name": "USA Robotics"},
                    {"country": "JP"}
                ]},
                "red": {"teams": [{"countryCode": "USA"}, {"countryCode": "BRA"}]}
            }
        }));
        let found = countries(&m);
        assert_eq!(found.codes, vec!["USA", "JPN", "BRA"]);
        assert_eq!(found.raw, vec!["usa", "JP", "USA", "BRA"]);
    }

    #[test]
    fn test_countries_fallback_searches_other_keys() {
        let m = entry(json!({
            "teams": ["Atlantis"],
            "lineup": [{"country": "GHA"}],
            "note": "KEN"
        }));
        assert_eq!(countries(&m).codes, vec!["GHA"]);
    }

    #[test]
    fn test_build_match_country_map_diagnostics() {
        let with_countries = entry(json!({"matchNumber": 4, "countries": ["CAN", "MEX"]}));
        let without_number = entry(json!({"countries": ["CAN"], "name": "Practice"}));
        let without_countries = entry(json!({"matchNumber": 5, "field": 1}));
        let (mapping, diagnostics) =
            build_match_country_map(&[&with_countries, &without_number, &without_countries]);
        assert_eq!(mapping.get(&4), Some(&vec!["CAN", "MEX"]));
        assert_eq!(mapping.len(), 1);
        assert_eq!(
            diagnostics,
            vec![
                "Schedule entry missing match number. Details: name=Practice.".to_string(),
                "No country entries found for match #5. Details: field=1.".to_string(),
            ]
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Schedule::load(&dir.path().join("missing.json")).unwrap_err();
        assert_eq!(err.to_string(), "Selected file could not be found.");
    }
}
