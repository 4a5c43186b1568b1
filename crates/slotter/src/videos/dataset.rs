//! The `Videos` tab: one row per team video with its value score.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use slotter_google::{CellData, Spreadsheet};

use crate::country;
use crate::report::plural;
use crate::sheet::{cell_number, cell_text, collect_rows};
use crate::text::{
    normalize_header, normalize_video_number, strip_country_noise, strip_leading_flag,
};

static PARENTHESISED_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([A-Z]{3})\)").expect("valid regex"));

static CODE_IN_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]{3})\b").expect("valid regex"));

const TEAM_HEADERS: &[&str] = &["team"];
const VALUE_HEADERS: &[&str] = &["value", "score"];
const VIDEO_ID_HEADERS: &[&str] = &["video id", "id", "video"];
const TIME_HEADERS: &[&str] = &["time", "start time", "scheduled"];
const MATCH_HEADERS: &[&str] = &[
    "match",
    "match #",
    "match number",
    "match no",
    "match nº",
    "match n°",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Header {
    Team,
    Value,
    VideoId,
    Time,
    Match,
}

const HEADERS: &[(Header, &[&str])] = &[
    (Header::Team, TEAM_HEADERS),
    (Header::Value, VALUE_HEADERS),
    (Header::VideoId, VIDEO_ID_HEADERS),
    (Header::Time, TIME_HEADERS),
    (Header::Match, MATCH_HEADERS),
];

/// Whether `text` is one of `aliases` once both are folded.
pub(crate) fn header_matches(text: &str, aliases: &[&str], uppercase: bool) -> bool {
    let normalized = normalize_header(text, uppercase);
    aliases
        .iter()
        .any(|alias| normalize_header(alias, uppercase) == normalized)
}

/// One team video.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoEntry {
    /// Team name without flag or "Team"/"Delegation" decoration.
    pub team_name: String,
    /// Comparison key of the raw team cell.
    pub normalized_name: String,
    /// Value score; lower is preferred.
    pub value: Option<f64>,
    /// Optional video identifier.
    pub video_id: Option<String>,
    /// Optional scheduled time.
    pub time: Option<String>,
    /// Zero-based row on the Videos tab.
    pub row: usize,
    /// Video number with leading zeros removed.
    pub video_number: Option<String>,
    /// Duration as typed.
    pub duration: Option<String>,
    /// The team cell as typed.
    pub team_cell_text: String,
}

/// Every team video plus lookup tables by country code and name.
#[derive(Debug, Clone, Default)]
pub struct VideoDataset {
    entries: Vec<VideoEntry>,
    by_code: HashMap<&'static str, usize>,
    by_name: HashMap<String, usize>,
    /// Title of the Videos tab.
    pub sheet_title: String,
    /// Column holding team names.
    pub team_column: Option<usize>,
    /// Column holding video numbers (left of the team column).
    pub video_number_column: Option<usize>,
    /// Column holding durations (two right of the team column).
    pub duration_column: Option<usize>,
    /// Column that records which matches use each video.
    pub match_column: Option<usize>,
}

fn optional_text(cells: &BTreeMap<usize, &CellData>, column: Option<usize>) -> Option<String> {
    let text = cell_text(cells.get(&column?)?);
    (!text.is_empty()).then_some(text)
}

/// The ISO code a Videos row refers to: a parenthesised code, then any
/// known code in the text, then a name lookup.
fn entry_code(team_text: &str) -> Option<&'static str> {
    let parenthesised = PARENTHESISED_CODE_RE
        .captures(team_text)
        .and_then(|caps| caps.get(1))
        .and_then(|code| country::normalize_code(code.as_str()));
    if parenthesised.is_some() {
        return parenthesised;
    }

    let upper = team_text.to_uppercase();
    CODE_IN_TEXT_RE
        .captures_iter(&upper)
        .filter_map(|caps| caps.get(1))
        .find_map(|code| country::normalize_code(code.as_str()))
        .or_else(|| country::lookup_code(team_text))
}

impl VideoDataset {
    /// Read the `Videos` tab.
    ///
    /// Returns an empty dataset and a diagnostic when the tab or its
    /// headers are missing.
    #[must_use]
    pub fn from_spreadsheet(spreadsheet: &Spreadsheet) -> (Self, Vec<String>) {
        let mut dataset = Self::default();
        let mut diagnostics = Vec::new();

        let Some(sheet) = spreadsheet
            .sheets
            .iter()
            .find(|sheet| sheet.title().to_lowercase() == "videos")
        else {
            diagnostics.push("No sheet named 'Videos' was found in the spreadsheet.".to_string());
            return (dataset, diagnostics);
        };
        if sheet.data.is_empty() {
            diagnostics.push("Videos sheet does not contain any data.".to_string());
            return (dataset, diagnostics);
        }

        let rows = collect_rows(&sheet.data);
        let header = rows.iter().find_map(|(row, cells)| {
            let mut detected: HashMap<Header, usize> = HashMap::new();
            for (column, cell) in cells {
                let text = cell_text(cell);
                if text.is_empty() {
                    continue;
                }
                for (key, aliases) in HEADERS {
                    if header_matches(&text, aliases, false) {
                        detected.insert(*key, *column);
                    }
                }
            }
            (detected.contains_key(&Header::Team) && detected.contains_key(&Header::Value))
                .then_some((*row, detected))
        });
        let Some((header_row, columns)) = header else {
            diagnostics.push("Videos sheet is missing 'Team' and 'Value' headers.".to_string());
            return (dataset, diagnostics);
        };

        let team_column = columns[&Header::Team];
        let value_column = columns[&Header::Value];
        dataset.sheet_title = sheet.title().to_string();
        dataset.team_column = Some(team_column);
        dataset.video_number_column = team_column.checked_sub(1);
        dataset.duration_column = Some(team_column + 2);
        dataset.match_column = columns.get(&Header::Match).copied();

        for (row, cells) in rows.range(header_row + 1..) {
            let Some(team_text) = optional_text(cells, Some(team_column)) else {
                continue;
            };

            let cleaned = strip_leading_flag(&team_text);
            let display = strip_country_noise(&cleaned);
            let team_name = if display.is_empty() {
                if cleaned.is_empty() {
                    team_text.clone()
                } else {
                    cleaned.clone()
                }
            } else {
                display
            };

            let video_number = optional_text(cells, dataset.video_number_column)
                .map(|text| normalize_video_number(&text).unwrap_or(text));

            let entry = VideoEntry {
                team_name,
                normalized_name: country::lookup_key(&team_text),
                value: cells.get(&value_column).and_then(|cell| cell_number(cell)),
                video_id: optional_text(cells, columns.get(&Header::VideoId).copied()),
                time: optional_text(cells, columns.get(&Header::Time).copied()),
                row: *row,
                video_number,
                duration: optional_text(cells, dataset.duration_column),
                team_cell_text: team_text.clone(),
            };
            dataset.push(entry, &cleaned, entry_code(&team_text));
        }

        diagnostics.push(format!(
            "Videos sheet: processed {}.",
            plural(dataset.entries.len(), "row", "rows")
        ));
        (dataset, diagnostics)
    }

    fn push(&mut self, entry: VideoEntry, cleaned_team: &str, code: Option<&'static str>) {
        let index = self.entries.len();
        for key in [entry.normalized_name.clone(), country::normalize_name(cleaned_team)] {
            if !key.is_empty() {
                self.by_name.entry(key).or_insert(index);
            }
        }
        if let Some(code) = code {
            self.by_code.entry(code).or_insert(index);
        }
        self.entries.push(entry);
    }

    /// All entries in sheet order.
    #[must_use]
    pub fn entries(&self) -> &[VideoEntry] {
        &self.entries
    }

    /// Whether the tab yielded no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The video for a country: by code, then by display name or alias,
    /// then by the code appearing as a word in the team name.
    #[must_use]
    pub fn find_entry(&self, code: &str) -> Option<&VideoEntry> {
        let code = code.to_uppercase();
        if let Some(&index) = self.by_code.get(code.as_str()) {
            return self.entries.get(index);
        }

        let names = country::display_name(&code)
            .into_iter()
            .chain(country::aliases(&code).iter().copied());
        for name in names {
            let keys = [
                country::lookup_key(name),
                country::normalize_name(&strip_leading_flag(name)),
            ];
            for key in keys.iter().filter(|key| !key.is_empty()) {
                if let Some(&index) = self.by_name.get(key) {
                    return self.entries.get(index);
                }
            }
        }

        let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(&code))).ok()?;
        self.entries
            .iter()
            .find(|entry| pattern.is_match(&entry.team_name.to_uppercase()))
    }
}
