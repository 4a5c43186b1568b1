//! Optimize Team Videos.
//!
//! Fills every `TEAM VIDEO PLACEHOLDER` in the ROS with the team video of a
//! country playing in the following ranking match, preferring low value
//! scores and avoiding repeats. The chosen video number and duration are
//! copied next to the placeholder, and the Videos tab records which matches
//! use each video.

mod assign;
mod dataset;
mod slots;

pub use assign::{assign, hungarian, Assignment, DUPLICATE_COST, INFEASIBLE_COST};
pub use dataset::{VideoDataset, VideoEntry};
pub use slots::{collect_slots, PlaceholderSlot};

use std::collections::BTreeMap;

use slotter_google::GoogleApi;
use tracing::{debug, info};

use crate::country;
use crate::error::{Error, Result};
use crate::report::{plural, UpdateSet};
use crate::schedule::{build_match_country_map, Match, Schedule};
use crate::sheet::a1;
use crate::text::strip_leading_flag;

/// Header printed above the list of written cells.
pub const SUCCESS_HEADER: &str = "Team video assignments applied:";

/// Printed when nothing was written.
pub const EMPTY_MESSAGE: &str = "No TEAM VIDEO PLACEHOLDER entries were updated.";

/// The text written over a placeholder for `code`.
fn placeholder_text(code: &str, video: &VideoEntry) -> String {
    if let Some(name) = country::display_name(code) {
        return name.to_string();
    }
    let stripped = strip_leading_flag(&video.team_name);
    if stripped.is_empty() {
        code.to_string()
    } else {
        stripped
    }
}

/// Turn assignments into cell writes.
#[must_use]
pub fn plan_updates(assignments: &[Assignment<'_>], dataset: &VideoDataset) -> UpdateSet {
    let mut updates = UpdateSet::new();
    let mut matches_by_row: BTreeMap<usize, Vec<u32>> = BTreeMap::new();

    for Assignment { slot, code, video } in assignments {
        let sheet = slot.sheet_title.as_str();
        let text = placeholder_text(code, video);
        let task_cell = a1(slot.row, slot.task_column);
        updates.write(sheet, &task_cell, text.clone(), format!("{task_cell}: {text}"));

        matches_by_row
            .entry(video.row)
            .or_default()
            .push(slot.match_number);

        let video_number = video.video_number.as_deref().map(str::trim).unwrap_or_default();
        let video_number_column = slot
            .video_number_column
            .or_else(|| slot.task_column.checked_sub(1));
        debug!(
            sheet,
            column = ?video_number_column,
            value = video_number,
            source_row = video.row + 1,
            "Video number inputs"
        );
        if let Some(column) = video_number_column.filter(|_| !video_number.is_empty()) {
            let cell = a1(slot.row, column);
            updates.write(sheet, &cell, video_number, format!("{cell}: Video Nº {video_number}"));
        }

        let duration = video.duration.as_deref().map(str::trim).unwrap_or_default();
        let duration_column = slot
            .duration_column
            .or_else(|| slot.task_column.checked_sub(2));
        debug!(
            sheet,
            column = ?duration_column,
            value = duration,
            source_row = video.row + 1,
            "Duration inputs"
        );
        if let Some(column) = duration_column.filter(|_| !duration.is_empty()) {
            let cell = a1(slot.row, column);
            updates.write(sheet, &cell, duration, format!("{cell}: Duration {duration}"));
        }
    }

    if let Some(match_column) = dataset.match_column {
        for (row, mut numbers) in matches_by_row {
            numbers.sort_unstable();
            numbers.dedup();
            let value = numbers
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            let cell = a1(row, match_column);
            let entry = format!("{cell}: Match {value}");
            updates.write(&dataset.sheet_title, &cell, value, entry);
        }
    }

    updates.report_mut().sort_by_sheet();
    updates
}

/// The result of [`run`].
#[derive(Debug, Clone, Default)]
pub struct OptimizeRun {
    /// Spreadsheet title.
    pub title: String,
    /// Everything noticed along the way.
    pub diagnostics: Vec<String>,
    /// The writes, once assignments were made.
    pub updates: UpdateSet,
}

impl OptimizeRun {
    /// One-line summary for the status bar.
    #[must_use]
    pub fn status(&self) -> String {
        let report = self.updates.report();
        if report.is_empty() {
            return EMPTY_MESSAGE.to_string();
        }
        format!(
            "Updated {} across {}.",
            plural(report.entry_count(), "placeholder", "placeholders"),
            plural(report.sheet_count(), "sheet", "sheets")
        )
    }

    /// The full report with diagnostics.
    #[must_use]
    pub fn render(&self) -> String {
        self.updates
            .report()
            .format(&self.diagnostics, SUCCESS_HEADER, EMPTY_MESSAGE)
    }
}

/// The schedule's matches on `field`.
///
/// # Errors
///
/// Returns an error when no schedule was given or it has nothing for the
/// field.
pub fn schedule_matches(schedule: Option<&Schedule>, field: u8) -> Result<Vec<&Match>> {
    let schedule = schedule.ok_or_else(|| {
        Error::schedule("Import a match schedule JSON before optimizing team videos.")
    })?;
    let matches = schedule.matches_for_field(field);
    if matches.is_empty() {
        return Err(Error::schedule(
            "The imported schedule does not include matches for the selected field.",
        ));
    }
    Ok(matches)
}

/// Fetch the ROS, assign videos to placeholders, and write the result.
///
/// Missing data ends the run early with a diagnostic rather than an error.
///
/// # Errors
///
/// Returns an error if the spreadsheet cannot be fetched or written.
pub async fn run(
    api: &dyn GoogleApi,
    spreadsheet_id: &str,
    matches: &[&Match],
    dry_run: bool,
) -> Result<OptimizeRun> {
    info!("Contacting Google Sheets API...");
    let spreadsheet = api.get_spreadsheet(spreadsheet_id).await?;
    let mut result = OptimizeRun {
        title: spreadsheet.title().to_string(),
        ..OptimizeRun::default()
    };

    let (dataset, diagnostics) = VideoDataset::from_spreadsheet(&spreadsheet);
    result.diagnostics.extend(diagnostics);
    if dataset.is_empty() {
        result
            .diagnostics
            .push("No video entries were found on the Videos sheet.".to_string());
        return Ok(result);
    }

    let (slots, diagnostics) = collect_slots(&spreadsheet);
    result.diagnostics.extend(diagnostics);
    if slots.is_empty() {
        result
            .diagnostics
            .push("No TEAM VIDEO PLACEHOLDER entries were found.".to_string());
        return Ok(result);
    }

    let (match_countries, diagnostics) = build_match_country_map(matches);
    result.diagnostics.extend(diagnostics);
    if match_countries.is_empty() {
        result.diagnostics.push(
            "The imported match schedule did not include country assignments.".to_string(),
        );
        return Ok(result);
    }

    let (assignments, diagnostics) = assign(&slots, &match_countries, &dataset);
    result.diagnostics.extend(diagnostics);
    if assignments.is_empty() {
        result.diagnostics.push(
            "Unable to assign videos to any placeholders with the available data.".to_string(),
        );
        return Ok(result);
    }

    result.updates = plan_updates(&assignments, &dataset);
    result.updates.apply(api, spreadsheet_id, dry_run).await?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{spreadsheet, videos_tab, FakeGoogle};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use slotter_google::Spreadsheet;

    fn ros() -> Spreadsheet {
        spreadsheet(
            "Run Of Show",
            vec![
                (
                    "Day 1",
                    vec![
                        vec!["Duration", "Video #", "TASK"],
                        vec!["", "", "TEAM VIDEO PLACEHOLDER AAA"],
                        vec!["", "", "TEAM VIDEO PLACEHOLDER AAB"],
                        vec!["", "", "RANKING MATCH #1"],
                    ],
                ),
                ("Videos", videos_tab()),
            ],
        )
    }

    fn fixture_matches() -> Vec<Match> {
        vec![json!({"matchNumber": 1, "alliances": {"red": ["FRA"], "blue": ["JPN"]}})
            .as_object()
            .cloned()
            .unwrap()]
    }

    #[tokio::test]
    async fn test_run_assigns_and_writes() {
        let fake = FakeGoogle::with_spreadsheet("abc", ros());
        let matches = fixture_matches();
        let refs: Vec<&Match> = matches.iter().collect();

        let result = run(&fake, "abc", &refs, false).await.unwrap();
        assert_eq!(result.title, "Run Of Show");

        let report = result.updates.report();
        let day1 = report.entries("Day 1").unwrap();
        let placed = |team: &str| {
            [format!("C2: {team}"), format!("C3: {team}")]
                .iter()
                .any(|entry| day1.contains(entry))
        };
        assert!(placed("France"));
        assert!(placed("Japan"));
        assert!(day1.iter().any(|entry| entry.ends_with("Video Nº 7")));
        assert!(day1.iter().any(|entry| entry.ends_with("Duration 0:30")));
        assert_eq!(
            report.entries("Videos").unwrap(),
            ["E3: Match 1", "E4: Match 1"]
        );
        assert_eq!(result.status(), "Updated 8 placeholders across 2 sheets.");
        assert_eq!(fake.written().len(), 8);
    }

    #[tokio::test]
    async fn test_run_without_placeholders() {
        let ros = spreadsheet(
            "ROS",
            vec![("Day 1", vec![vec!["TASK"], vec!["RANKING MATCH #1"]]), ("Videos", videos_tab())],
        );
        let fake = FakeGoogle::with_spreadsheet("abc", ros);
        let matches = fixture_matches();
        let refs: Vec<&Match> = matches.iter().collect();

        let result = run(&fake, "abc", &refs, false).await.unwrap();
        assert_eq!(result.status(), EMPTY_MESSAGE);
        assert_eq!(
            result.diagnostics.last().map(String::as_str),
            Some("No TEAM VIDEO PLACEHOLDER entries were found.")
        );
        assert!(fake.written().is_empty());
    }

    #[test]
    fn test_schedule_matches_preconditions() {
        let err = schedule_matches(None, 1).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Import a match schedule JSON before optimizing team videos."
        );

        let schedule =
            Schedule::from_json(r#"{"matches": [{"matchNumber": 1, "field": 2}]}"#).unwrap();
        assert!(schedule_matches(Some(&schedule), 1).is_err());
        assert_eq!(schedule_matches(Some(&schedule), 2).unwrap().len(), 1);
    }

    #[test]
    fn test_placeholder_text_falls_back_to_team_name() {
        let video = VideoEntry {
            team_name: "🇫🇷 Les Bleus".to_string(),
            ..VideoEntry::default()
        };
        assert_eq!(placeholder_text("FRA", &video), "France");
        assert_eq!(placeholder_text("ZZZ", &video), "Les Bleus");
        assert_eq!(placeholder_text("ZZZ", &VideoEntry::default()), "ZZZ");
    }
}
