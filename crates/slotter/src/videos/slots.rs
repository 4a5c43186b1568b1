//! Team video placeholder slots in the show-day tabs.

use slotter_google::{Sheet, Spreadsheet};

use super::dataset::header_matches;
use crate::sheet::{cell_text, collect_rows, find_task_column};
use crate::text::extract_match_number;

const VIDEO_NUMBER_HEADERS: &[&str] = &[
    "VIDEO #",
    "VIDEO NO",
    "VIDEO N°",
    "VIDEO Nº",
    "VIDEO NUMBER",
    "VIDEO NUM",
    "VIDEO N",
];

const DURATION_HEADERS: &[&str] = &["DURATION", "DURACION", "DURACIÓN", "LENGTH"];

const PLACEHOLDER_PREFIX: &str = "TEAM VIDEO PLACEHOLDER";
const RANKING_MATCH_PREFIX: &str = "RANKING MATCH";

/// A `TEAM VIDEO PLACEHOLDER` row and the match it leads into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderSlot {
    /// Tab title.
    pub sheet_title: String,
    /// Zero-based row.
    pub row: usize,
    /// The TASK column.
    pub task_column: usize,
    /// The ranking match that follows the placeholder.
    pub match_number: u32,
    /// Position among the placeholders before that match.
    pub index: usize,
    /// Where the video number goes.
    pub video_number_column: Option<usize>,
    /// Where the duration goes.
    pub duration_column: Option<usize>,
}

/// Video number and duration columns, from their headers or relative to
/// TASK.
fn output_columns(sheet: &Sheet, task_column: usize) -> (Option<usize>, Option<usize>) {
    let mut video_number = None;
    let mut duration = None;

    for (_, cells) in collect_rows(&sheet.data) {
        for (column, cell) in cells {
            let text = cell_text(cell);
            if text.is_empty() {
                continue;
            }
            if video_number.is_none() && header_matches(&text, VIDEO_NUMBER_HEADERS, true) {
                video_number = Some(column);
            }
            if duration.is_none() && header_matches(&text, DURATION_HEADERS, true) {
                duration = Some(column);
            }
        }
        if video_number.is_some() && duration.is_some() {
            break;
        }
    }

    (
        video_number.or_else(|| task_column.checked_sub(1)),
        duration.or_else(|| task_column.checked_sub(2)),
    )
}

/// Every placeholder slot, ordered by tab title, row, and position.
///
/// Placeholders accumulate until the next `RANKING MATCH <n>` row claims
/// them. A ranking match without a readable number drops the pending
/// placeholders.
#[must_use]
pub fn collect_slots(spreadsheet: &Spreadsheet) -> (Vec<PlaceholderSlot>, Vec<String>) {
    let mut slots = Vec::new();
    let mut diagnostics = Vec::new();

    for sheet in &spreadsheet.sheets {
        if sheet.data.is_empty() {
            continue;
        }
        let Some(task_column) = find_task_column(&sheet.data) else {
            continue;
        };
        let title = sheet.title();
        let (video_number_column, duration_column) = output_columns(sheet, task_column);

        let mut pending: Vec<usize> = Vec::new();
        for (row, cells) in collect_rows(&sheet.data) {
            let Some(cell) = cells.get(&task_column) else {
                continue;
            };
            let text = cell_text(cell);
            let upper = text.to_uppercase();

            if upper.starts_with(PLACEHOLDER_PREFIX) {
                pending.push(row);
                continue;
            }
            if !upper.starts_with(RANKING_MATCH_PREFIX) {
                continue;
            }

            let Some(match_number) = extract_match_number(&text) else {
                diagnostics.push(format!(
                    "{title}: Unable to extract match number from cell value '{text}'."
                ));
                pending.clear();
                continue;
            };
            slots.extend(pending.drain(..).enumerate().map(|(index, row)| PlaceholderSlot {
                sheet_title: title.to_string(),
                row,
                task_column,
                match_number,
                index,
                video_number_column,
                duration_column,
            }));
        }

        if !pending.is_empty() {
            diagnostics.push(format!(
                "{title}: {} TEAM VIDEO PLACEHOLDER row(s) without a following \
                 RANKING MATCH were ignored.",
                pending.len()
            ));
        }
    }

    slots.sort_by(|a, b| {
        (&a.sheet_title, a.row, a.index).cmp(&(&b.sheet_title, b.row, b.index))
    });
    (slots, diagnostics)
}
