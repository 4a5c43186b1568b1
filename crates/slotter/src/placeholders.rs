//! ROS placeholder generator.
//!
//! Rows whose TASK cell starts with a flag emoji are the hand-entered team
//! video slots. Each one is rewritten to `TEAM VIDEO PLACEHOLDER <code>`,
//! where the code is the sheet's letter followed by a two-letter sequence.

use std::sync::LazyLock;

use regex::Regex;
use slotter_google::{GoogleApi, Sheet, Spreadsheet};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::report::{plural, UpdateSet};
use crate::sheet::{a1, cell_text, column_cells, column_letter, find_task_column};
use crate::text::starts_with_flag;

static PLACEHOLDER_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^TEAM VIDEO PLACEHOLDER ([A-Z]{3})\b").expect("valid regex")
});

/// Two-letter suffixes available per sheet (`AA` through `ZZ`).
pub const CODES_PER_SHEET: usize = 26 * 26;

const SAMPLE_ROWS: usize = 5;
const PREVIEW_CHARS: usize = 40;

/// Header printed above the list of rewritten cells.
pub const SUCCESS_HEADER: &str = "Placeholder updates applied:";

/// Printed when no cell was rewritten.
pub const EMPTY_MESSAGE: &str = "No matching placeholders were found.";

/// Placeholder rewrites for a whole spreadsheet.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderPlan {
    /// Cell writes and their per-sheet report.
    pub updates: UpdateSet,
    /// How each sheet was inspected.
    pub diagnostics: Vec<String>,
}

impl PlaceholderPlan {
    /// One-line summary for the status bar.
    #[must_use]
    pub fn status(&self) -> String {
        let report = self.updates.report();
        if report.is_empty() {
            return EMPTY_MESSAGE.to_string();
        }
        format!(
            "Placeholder updates applied to {} across {}. {}",
            plural(report.entry_count(), "cell", "cells"),
            plural(report.sheet_count(), "sheet", "sheets"),
            report.breakdown("updated")
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

/// The placeholder code for `index` within the sheet whose letter is
/// `prefix`: 0 → `AAA`, 27 → `ABB`.
#[must_use]
pub fn placeholder_code(prefix: char, index: usize) -> Option<String> {
    if index >= CODES_PER_SHEET {
        return None;
    }
    let letter = |n: usize| char::from(b'A' + u8::try_from(n).unwrap_or_default());
    Some(format!("{prefix}{}{}", letter(index / 26), letter(index % 26)))
}

/// The existing code in a `TEAM VIDEO PLACEHOLDER XYZ` cell, uppercased.
#[must_use]
pub fn existing_code(text: &str) -> Option<String> {
    PLACEHOLDER_CODE_RE
        .captures(text.trim())
        .and_then(|caps| caps.get(1))
        .map(|code| code.as_str().to_uppercase())
}

/// Position of the highest existing code with `prefix`, if any.
#[must_use]
pub fn highest_code_index<'a>(
    codes: impl IntoIterator<Item = &'a String>,
    prefix: char,
) -> Option<usize> {
    codes
        .into_iter()
        .filter_map(|code| {
            let mut chars = code.chars();
            if chars.next() != Some(prefix) {
                return None;
            }
            let first = chars.next()?;
            let second = chars.next()?;
            if chars.next().is_some() || !first.is_ascii_uppercase() || !second.is_ascii_uppercase()
            {
                return None;
            }
            let offset = |c: char| usize::from(u8::try_from(c).unwrap_or(b'A') - b'A');
            Some(offset(first) * 26 + offset(second))
        })
        .max()
}

fn sheet_prefix(sheet: &Sheet) -> Result<char> {
    u32::try_from(sheet.properties.index)
        .ok()
        .and_then(|index| u32::from('A').checked_add(index))
        .and_then(char::from_u32)
        .ok_or_else(|| {
            Error::sheet(format!(
                "{}: sheet index {} has no placeholder letter.",
                sheet.title(),
                sheet.properties.index
            ))
        })
}

/// Rows flagged for replacement and the codes already present in the column.
fn scan_column(
    sheet: &Sheet,
    task_column: usize,
    diagnostics: &mut Vec<String>,
) -> (Vec<usize>, Vec<String>) {
    let title = sheet.title();
    let mut rows = Vec::new();
    let mut codes = Vec::new();

    for (row, cell) in column_cells(&sheet.data, task_column) {
        let text = cell_text(cell);
        if text.is_empty() {
            continue;
        }
        if let Some(code) = existing_code(&text) {
            codes.push(code);
        }
        if !starts_with_flag(&text) {
            continue;
        }
        rows.push(row);
        if rows.len() <= SAMPLE_ROWS {
            let preview: String = text
                .lines()
                .next()
                .unwrap_or_default()
                .chars()
                .take(PREVIEW_CHARS)
                .collect();
            diagnostics.push(format!(
                "{title}: Row {} flagged for placeholder replacement with value '{preview}'.",
                row + 1
            ));
        }
    }
    (rows, codes)
}

/// Work out every placeholder rewrite without touching the spreadsheet.
///
/// # Errors
///
/// Returns an error when a sheet runs out of codes or has no letter.
pub fn plan(spreadsheet: &Spreadsheet, skip_marker: &str) -> Result<PlaceholderPlan> {
    let mut plan = PlaceholderPlan {
        diagnostics: vec![
            "Placeholder detection looks for rows whose TASK value begins with an emoji flag."
                .to_string(),
        ],
        ..PlaceholderPlan::default()
    };

    for sheet in &spreadsheet.sheets {
        let title = sheet.title();
        if title.contains(skip_marker) {
            plan.diagnostics.push(format!(
                "{title}: Skipped because the sheet name contains '{skip_marker}'."
            ));
            continue;
        }
        if sheet.data.is_empty() {
            continue;
        }
        let prefix = sheet_prefix(sheet)?;

        let Some(task_column) = find_task_column(&sheet.data) else {
            plan.diagnostics
                .push(format!("{title}: No TASK column found within the first 10 rows."));
            continue;
        };
        let letter = column_letter(task_column);
        plan.diagnostics.push(format!(
            "{title}: TASK column located at index {task_column} (column {letter})."
        ));

        let (rows, codes) = scan_column(sheet, task_column, &mut plan.diagnostics);
        if rows.is_empty() {
            plan.diagnostics.push(format!(
                "{title}: No cells beginning with a flag emoji were found in column {letter}."
            ));
            continue;
        }

        let start = highest_code_index(&codes, prefix).map_or(0, |highest| highest + 1);
        debug!(sheet = title, rows = rows.len(), start, "Numbering placeholders");
        for (offset, row) in rows.into_iter().enumerate() {
            let code = placeholder_code(prefix, start + offset).ok_or_else(|| {
                Error::PlaceholderCodesExhausted {
                    sheet: title.to_string(),
                    limit: CODES_PER_SHEET,
                }
            })?;
            let cell = a1(row, task_column);
            let text = format!("TEAM VIDEO PLACEHOLDER {code}");
            let entry = format!("{cell}: {text}");
            plan.updates.write(title, &cell, text, entry);
        }
    }

    Ok(plan)
}

/// Fetch the ROS spreadsheet, plan the rewrites, and apply them.
///
/// Returns the spreadsheet title alongside the plan.
///
/// # Errors
///
/// Returns an error if fetching, planning, or writing fails.
pub async fn run(
    api: &dyn GoogleApi,
    spreadsheet_id: &str,
    skip_marker: &str,
    dry_run: bool,
) -> Result<(String, PlaceholderPlan)> {
    info!("Contacting Google Sheets API...");
    let spreadsheet = api.get_spreadsheet(spreadsheet_id).await?;
    let plan = plan(&spreadsheet, skip_marker)?;
    plan.updates.apply(api, spreadsheet_id, dry_run).await?;
    Ok((spreadsheet.title().to_string(), plan))
}
