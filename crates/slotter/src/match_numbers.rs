//! Match number generator.
//!
//! Every `RANKING MATCH` cell in the ROS is rewritten to
//! `RANKING MATCH #<n>`, where the numbers come from the imported schedule:
//! the first show day with matches takes the first schedule date, and so on.

use std::collections::BTreeMap;

use slotter_google::{GoogleApi, Spreadsheet};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::report::{plural, UpdateSet};
use crate::schedule::{describe, match_number, Match, Schedule};
use crate::sheet::{a1, cell_text, collect_rows};

const RANKING_MATCH: &str = "RANKING MATCH";
const NUMBERED_PREFIX: &str = "RANKING MATCH #";

/// Header printed above the list of renumbered cells.
pub const SUCCESS_HEADER: &str = "Ranking match numbers applied:";

/// Printed when no cell was rewritten.
pub const EMPTY_MESSAGE: &str = "No RANKING MATCH cells were updated.";

/// Status after the schedule and the ROS disagree.
pub const MISMATCH_STATUS: &str = "Match schedule does not match the ROS document.";

/// A `RANKING MATCH` cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingSlot {
    /// Zero-based row.
    pub row: usize,
    /// Zero-based column.
    pub column: usize,
    /// Trimmed cell text.
    pub text: String,
}

/// The ranking match cells found on one tab.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetMatches {
    /// Tab title.
    pub title: String,
    /// Tab position.
    pub index: usize,
    /// Cells in row then column order.
    pub slots: Vec<RankingSlot>,
    /// Notes about this tab.
    pub diagnostics: Vec<String>,
}

/// What [`inspect`] found across the spreadsheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inspection {
    /// One entry per tab, in spreadsheet order.
    pub sheets: Vec<SheetMatches>,
    /// Whether any cell already carries a number.
    pub existing_numbers: bool,
}

impl Inspection {
    /// Total ranking match cells.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.sheets.iter().map(|sheet| sheet.slots.len()).sum()
    }

    /// Per-tab diagnostics, flattened.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<String> {
        self.sheets
            .iter()
            .flat_map(|sheet| sheet.diagnostics.iter().cloned())
            .collect()
    }
}

/// Find every ranking match cell.
#[must_use]
pub fn inspect(spreadsheet: &Spreadsheet) -> Inspection {
    let mut inspection = Inspection::default();

    for sheet in &spreadsheet.sheets {
        let title = sheet.title().to_string();
        let mut entry = SheetMatches {
            title: title.clone(),
            index: sheet.properties.index,
            ..SheetMatches::default()
        };

        if sheet.data.is_empty() {
            entry
                .diagnostics
                .push(format!("{title}: No data available to inspect."));
            inspection.sheets.push(entry);
            continue;
        }

        for (row, cells) in collect_rows(&sheet.data) {
            for (column, cell) in cells {
                let text = cell_text(cell);
                let upper = text.to_uppercase();
                let numbered = upper.starts_with(NUMBERED_PREFIX);
                if upper == RANKING_MATCH || numbered {
                    inspection.existing_numbers |= numbered;
                    entry.slots.push(RankingSlot { row, column, text });
                }
            }
        }

        if entry.slots.is_empty() {
            entry
                .diagnostics
                .push(format!("{title}: No RANKING MATCH cells found."));
        }
        inspection.sheets.push(entry);
    }

    inspection
}

/// Schedule numbers per tab, plus the notes produced while pairing them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alignment {
    /// Match numbers keyed by tab title.
    pub numbers: BTreeMap<String, Vec<u32>>,
    /// One "Verified ..." line per paired date.
    pub notes: Vec<String>,
}

fn count_mismatch(count: usize, date: &str, sheet: &str) -> Error {
    Error::schedule(format!(
        "The number of matches ({count}) in the schedule for {date} \
         doesn't match the number of RANKING MATCH slots in {sheet}."
    ))
}

/// Pair schedule dates with the tabs that hold ranking matches.
///
/// # Errors
///
/// Returns an error when the number of dates and tabs differ, a date's
/// match count differs from its tab's slot count, or a schedule entry has
/// no match number.
pub fn derive_assignments(
    sheets: &[SheetMatches],
    schedule_by_date: &[(String, Vec<&Match>)],
) -> Result<Alignment> {
    let with_matches: Vec<&SheetMatches> =
        sheets.iter().filter(|sheet| !sheet.slots.is_empty()).collect();

    if let Some((date, matches)) = schedule_by_date.get(with_matches.len()) {
        return Err(count_mismatch(matches.len(), date, "N/A (no sheet available)"));
    }
    if let Some(sheet) = with_matches.get(schedule_by_date.len()) {
        return Err(count_mismatch(0, "N/A", &sheet.title));
    }

    let mut alignment = Alignment::default();
    for ((date, matches), sheet) in schedule_by_date.iter().zip(with_matches) {
        alignment.notes.push(format!(
            "Verified {} matches for {date} align with sheet {}.",
            matches.len(),
            sheet.title
        ));
        if matches.len() != sheet.slots.len() {
            return Err(count_mismatch(matches.len(), date, &sheet.title));
        }

        let numbers = matches
            .iter()
            .map(|m| {
                match_number(m).ok_or_else(|| {
                    Error::schedule(format!(
                        "The imported schedule entry is missing a match number. \
                         Date: {date}. Match details: {}. \
                         Ensure this entry includes an 'id' or 'matchNumber' value.",
                        describe(m)
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        alignment.numbers.insert(sheet.title.clone(), numbers);
    }
    Ok(alignment)
}

/// Build the cell rewrites.
///
/// Tabs are processed by position. A tab without schedule numbers is
/// numbered from a running counter. Cells that already read correctly are
/// left alone unless `renumber_all` is set.
#[must_use]
pub fn plan_updates(
    sheets: &[SheetMatches],
    numbers: &BTreeMap<String, Vec<u32>>,
    renumber_all: bool,
) -> (UpdateSet, Vec<String>) {
    let mut updates = UpdateSet::new();
    let mut diagnostics = Vec::new();
    let mut counter = 1;

    let mut ordered: Vec<&SheetMatches> = sheets.iter().collect();
    ordered.sort_by(|a, b| (a.index, &a.title).cmp(&(b.index, &b.title)));

    for sheet in ordered {
        if sheet.slots.is_empty() {
            continue;
        }
        let provided = numbers.get(&sheet.title).filter(|list| !list.is_empty());
        if let Some(provided) = provided {
            if provided.len() != sheet.slots.len() {
                diagnostics.push(format!(
                    "{}: Provided match numbers ({}) do not match the number of slots ({}).",
                    sheet.title,
                    provided.len(),
                    sheet.slots.len()
                ));
                continue;
            }
        }

        let mut slots: Vec<&RankingSlot> = sheet.slots.iter().collect();
        slots.sort_by_key(|slot| (slot.row, slot.column));

        let mut updated = 0;
        for (position, slot) in slots.into_iter().enumerate() {
            let number = match provided {
                Some(provided) => provided[position],
                None => {
                    let next = counter;
                    counter += 1;
                    next
                }
            };
            let text = format!("{NUMBERED_PREFIX}{number}");
            if renumber_all || slot.text != text {
                let cell = a1(slot.row, slot.column);
                let entry = format!("{cell}: {text}");
                updates.write(&sheet.title, &cell, text, entry);
                updated += 1;
            }
        }

        diagnostics.push(format!(
            "{}: Numbered {} RANKING MATCH cell(s); updated {updated} of them.",
            sheet.title,
            sheet.slots.len()
        ));
    }

    (updates, diagnostics)
}

/// How a match numbering run ended.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The ROS has no ranking match cells.
    NoSlots,
    /// Numbers already exist and renumbering was not requested.
    LeftUnchanged,
    /// Rewrites were planned (and applied unless dry-running).
    Applied(UpdateSet),
}

/// The result of [`run`].
#[derive(Debug, Clone)]
pub struct MatchNumberRun {
    /// Spreadsheet title.
    pub title: String,
    /// Pairing notes.
    pub notes: Vec<String>,
    /// Inspection and numbering diagnostics.
    pub diagnostics: Vec<String>,
    /// What happened.
    pub outcome: Outcome,
}

impl MatchNumberRun {
    /// One-line summary for the status bar.
    #[must_use]
    pub fn status(&self) -> String {
        match &self.outcome {
            Outcome::NoSlots => EMPTY_MESSAGE.to_string(),
            Outcome::LeftUnchanged => "Existing match numbers left unchanged.".to_string(),
            Outcome::Applied(updates) if updates.report().is_empty() => EMPTY_MESSAGE.to_string(),
            Outcome::Applied(updates) => {
                let report = updates.report();
                format!(
                    "Ranking match numbers applied to {} across {}. {}",
                    plural(report.entry_count(), "cell", "cells"),
                    plural(report.sheet_count(), "sheet", "sheets"),
                    report.breakdown("applied")
                )
            }
        }
    }

    /// The report of rewritten cells.
    #[must_use]
    pub fn render(&self) -> String {
        let empty: [&str; 0] = [];
        match &self.outcome {
            Outcome::Applied(updates) => {
                updates
                    .report()
                    .format(&empty, SUCCESS_HEADER, EMPTY_MESSAGE)
            }
            _ => self.status(),
        }
    }
}

/// The schedule's matches for `field` grouped by date.
///
/// # Errors
///
/// Returns an error when no schedule was given or it has no matches on
/// the field.
pub fn schedule_for_field(
    schedule: Option<&Schedule>,
    field: u8,
) -> Result<Vec<(String, Vec<&Match>)>> {
    let schedule = schedule.ok_or_else(|| {
        Error::schedule("Import a match schedule JSON before generating match numbers.")
    })?;
    let by_date = schedule.matches_by_date(field);
    if by_date.is_empty() {
        return Err(Error::schedule(format!(
            "The imported schedule does not include matches for Field {field}."
        )));
    }
    Ok(by_date)
}

/// Number the ranking matches in the ROS from the schedule.
///
/// # Errors
///
/// Returns an error if the spreadsheet cannot be fetched or written, or the
/// schedule does not line up with the ROS.
pub async fn run(
    api: &dyn GoogleApi,
    spreadsheet_id: &str,
    schedule_by_date: &[(String, Vec<&Match>)],
    renumber: bool,
    dry_run: bool,
) -> Result<MatchNumberRun> {
    info!("Contacting Google Sheets API...");
    let spreadsheet = api.get_spreadsheet(spreadsheet_id).await?;
    let inspection = inspect(&spreadsheet);
    let mut result = MatchNumberRun {
        title: spreadsheet.title().to_string(),
        notes: Vec::new(),
        diagnostics: inspection.diagnostics(),
        outcome: Outcome::NoSlots,
    };

    if inspection.slot_count() == 0 {
        return Ok(result);
    }

    let alignment = derive_assignments(&inspection.sheets, schedule_by_date).inspect_err(|_| {
        warn!("{MISMATCH_STATUS}");
    })?;
    for note in &alignment.notes {
        info!("{note}");
    }
    result.notes = alignment.notes;

    if inspection.existing_numbers && !renumber {
        info!("Existing match numbers found; pass --renumber to replace them");
        result.outcome = Outcome::LeftUnchanged;
        return Ok(result);
    }

    info!("Applying ranking match numbers...");
    let (updates, diagnostics) =
        plan_updates(&inspection.sheets, &alignment.numbers, inspection.existing_numbers);
    debug!(cells = updates.data().len(), "Planned ranking match numbers");
    result.diagnostics.extend(diagnostics);
    updates.apply(api, spreadsheet_id, dry_run).await?;
    result.outcome = Outcome::Applied(updates);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{spreadsheet, FakeGoogle};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn ros() -> Spreadsheet {
        spreadsheet(
            "ROS",
            vec![
                (
                    "Day 1",
                    vec![
                        vec!["TASK"],
                        vec!["RANKING MATCH"],
                        vec!["Video"],
                        vec!["ranking match"],
                    ],
                ),
                ("Notes", vec![vec!["nothing here"]]),
                ("Day 2", vec![vec!["TASK"], vec!["RANKING MATCH"]]),
            ],
        )
    }

    fn matches(numbers: &[Value]) -> Vec<Match> {
        numbers
            .iter()
            .map(|n| json!({"matchNumber": n}).as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn test_inspect() {
        let inspection = inspect(&ros());
        assert_eq!(inspection.slot_count(), 3);
        assert!(!inspection.existing_numbers);
        assert_eq!(inspection.sheets[0].slots[1].row, 3);
        assert_eq!(
            inspection.diagnostics(),
            vec!["Notes: No RANKING MATCH cells found.".to_string()]
        );

        let numbered = spreadsheet("ROS", vec![("Day 1", vec![vec!["Ranking Match #4"]])]);
        assert!(inspect(&numbered).existing_numbers);
    }

    #[test]
    fn test_derive_assignments_pairs_dates_with_sheets() {
        let inspection = inspect(&ros());
        let day1 = matches(&[json!(11), json!("12")]);
        let day2 = matches(&[json!(13)]);
        let by_date = vec![
            ("2025-10-31".to_string(), day1.iter().collect()),
            ("2025-11-01".to_string(), day2.iter().collect()),
        ];

        let alignment = derive_assignments(&inspection.sheets, &by_date).unwrap();
        assert_eq!(alignment.numbers["Day 1"], vec![11, 12]);
        assert_eq!(alignment.numbers["Day 2"], vec![13]);
        assert_eq!(
            alignment.notes[0],
            "Verified 2 matches for 2025-10-31 align with sheet Day 1."
        );
    }

    #[test]
    fn test_derive_assignments_mismatches() {
        let inspection = inspect(&ros());
        let one = matches(&[json!(1)]);

        let by_date = vec![("2025-10-31".to_string(), one.iter().collect())];
        let err = derive_assignments(&inspection.sheets, &by_date).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The number of matches (0) in the schedule for N/A doesn't match the number \
             of RANKING MATCH slots in Day 2."
        );

        let by_date = vec![
            ("2025-10-31".to_string(), one.iter().collect()),
            ("2025-11-01".to_string(), one.iter().collect()),
            ("2025-11-02".to_string(), one.iter().collect()),
        ];
        let err = derive_assignments(&inspection.sheets, &by_date).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The number of matches (1) in the schedule for 2025-11-02 doesn't match the \
             number of RANKING MATCH slots in N/A (no sheet available)."
        );

        let by_date = vec![
            ("2025-10-31".to_string(), one.iter().collect()),
            ("2025-11-01".to_string(), one.iter().collect()),
        ];
        let err = derive_assignments(&inspection.sheets, &by_date).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The number of matches (1) in the schedule for 2025-10-31 doesn't match the \
             number of RANKING MATCH slots in Day 1."
        );
    }

    #[test]
    fn test_derive_assignments_missing_number() {
        let inspection = inspect(&spreadsheet("ROS", vec![("Day 1", vec![vec!["RANKING MATCH"]])]));
        let entry = json!({"description": "Qualifier"}).as_object().cloned().unwrap();
        let by_date = vec![("2025-10-31".to_string(), vec![&entry])];

        let err = derive_assignments(&inspection.sheets, &by_date).unwrap_err();
        assert!(err.to_string().starts_with(
            "The imported schedule entry is missing a match number. Date: 2025-10-31."
        ));
        assert!(err.to_string().contains("Qualifier"));
    }

    #[test]
    fn test_plan_updates_uses_numbers_and_counter() {
        let inspection = inspect(&ros());
        let mut numbers = BTreeMap::new();
        numbers.insert("Day 2".to_string(), vec![40]);

        let (updates, diagnostics) = plan_updates(&inspection.sheets, &numbers, false);
        let report = updates.report();
        assert_eq!(
            report.entries("Day 1").unwrap(),
            ["A2: RANKING MATCH #1", "A4: RANKING MATCH #2"]
        );
        assert_eq!(report.entries("Day 2").unwrap(), ["A2: RANKING MATCH #40"]);
        assert_eq!(
            diagnostics[0],
            "Day 1: Numbered 2 RANKING MATCH cell(s); updated 2 of them."
        );
    }

    #[test]
    fn test_plan_updates_skips_unchanged_cells() {
        let ros = spreadsheet(
            "ROS",
            vec![("Day 1", vec![vec!["RANKING MATCH #1"], vec!["RANKING MATCH"]])],
        );
        let inspection = inspect(&ros);
        let numbers = BTreeMap::new();

        let (updates, diagnostics) = plan_updates(&inspection.sheets, &numbers, false);
        assert_eq!(updates.report().entries("Day 1").unwrap(), ["A2: RANKING MATCH #2"]);
        assert_eq!(
            diagnostics,
            vec!["Day 1: Numbered 2 RANKING MATCH cell(s); updated 1 of them.".to_string()]
        );

        let (updates, _) = plan_updates(&inspection.sheets, &numbers, true);
        assert_eq!(updates.data().len(), 2);
    }

    #[test]
    fn test_plan_updates_wrong_count() {
        let inspection = inspect(&ros());
        let mut numbers = BTreeMap::new();
        numbers.insert("Day 1".to_string(), vec![5]);

        let (updates, diagnostics) = plan_updates(&inspection.sheets, &numbers, false);
        assert!(updates.report().entries("Day 1").is_none());
        assert_eq!(
            diagnostics[0],
            "Day 1: Provided match numbers (1) do not match the number of slots (2)."
        );
    }

    #[test]
    fn test_schedule_for_field() {
        let err = schedule_for_field(None, 1).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Import a match schedule JSON before generating match numbers."
        );

        let schedule = Schedule::from_json(r#"{"matches": []}"#).unwrap();
        let err = schedule_for_field(Some(&schedule), 3).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The imported schedule does not include matches for Field 3."
        );
    }

    #[tokio::test]
    async fn test_run_applies_numbers() {
        let fake = FakeGoogle::with_spreadsheet("abc", ros());
        let day1 = matches(&[json!(1), json!(2)]);
        let day2 = matches(&[json!(3)]);
        let by_date = vec![
            ("2025-10-31".to_string(), day1.iter().collect()),
            ("2025-11-01".to_string(), day2.iter().collect()),
        ];

        let result = run(&fake, "abc", &by_date, false, false).await.unwrap();
        assert_eq!(
            result.status(),
            "Ranking match numbers applied to 3 cells across 2 sheets. \
             2 cells applied on sheet (Day 1), 1 cell applied on sheet (Day 2)"
        );
        assert_eq!(fake.written().len(), 3);
        assert!(result.render().starts_with(SUCCESS_HEADER));
    }

    #[tokio::test]
    async fn test_run_leaves_existing_numbers() {
        let ros = spreadsheet("ROS", vec![("Day 1", vec![vec!["RANKING MATCH #7"]])]);
        let fake = FakeGoogle::with_spreadsheet("abc", ros);
        let day1 = matches(&[json!(1)]);
        let by_date = vec![("2025-10-31".to_string(), day1.iter().collect())];

        let result = run(&fake, "abc", &by_date, false, false).await.unwrap();
        assert!(matches!(result.outcome, Outcome::LeftUnchanged));
        assert_eq!(result.status(), "Existing match numbers left unchanged.");
        assert!(fake.written().is_empty());

        let result = run(&fake, "abc", &by_date, true, false).await.unwrap();
        assert_eq!(
            result.status().split(". ").next(),
            Some("Ranking match numbers applied to 1 cell across 1 sheet")
        );
        assert_eq!(fake.written()[0].values, vec![vec!["RANKING MATCH #1".to_string()]]);
    }

    #[tokio::test]
    async fn test_run_without_slots() {
        let ros = spreadsheet("ROS", vec![("Day 1", vec![vec!["TASK"]])]);
        let fake = FakeGoogle::with_spreadsheet("abc", ros);
        let result = run(&fake, "abc", &[], false, false).await.unwrap();
        assert!(matches!(result.outcome, Outcome::NoSlots));
        assert_eq!(result.status(), EMPTY_MESSAGE);
    }
}
