//! Helpers for reading spreadsheet grid data.
//!
//! A tab can come back from the API as several grid blocks, each with its
//! own row and column offset. The helpers here flatten those into global
//! coordinates and read cell values the way a person sees them.

use std::collections::BTreeMap;

use slotter_google::{CellData, GridData};

use crate::text::normalize_header;

/// Rows in a flattened grid: `row → (column → cell)`, both zero-based.
pub type Rows<'a> = BTreeMap<usize, BTreeMap<usize, &'a CellData>>;

/// How many leading rows are searched for the `TASK` header.
const TASK_HEADER_ROWS: usize = 10;

/// The text a person sees in the cell, trimmed.
#[must_use]
pub fn cell_text(cell: &CellData) -> String {
    let candidates = [
        cell.formatted_value.as_deref(),
        cell.user_entered_value
            .as_ref()
            .and_then(|v| v.string_value.as_deref()),
        cell.effective_value
            .as_ref()
            .and_then(|v| v.string_value.as_deref()),
    ];
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|text| !text.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// The numeric value of a cell, falling back to parsing its text.
#[must_use]
pub fn cell_number(cell: &CellData) -> Option<f64> {
    let typed = cell
        .effective_value
        .as_ref()
        .and_then(|v| v.number_value)
        .or_else(|| cell.user_entered_value.as_ref().and_then(|v| v.number_value));
    if typed.is_some() {
        return typed;
    }
    let text = cell_text(cell).replace(',', "");
    if text.is_empty() {
        return None;
    }
    text.parse().ok()
}

/// Merge grid blocks into global row and column coordinates.
#[must_use]
pub fn collect_rows(grid: &[GridData]) -> Rows<'_> {
    let mut rows: Rows<'_> = BTreeMap::new();
    for block in grid {
        for (row_offset, row) in block.row_data.iter().enumerate() {
            let entry = rows.entry(block.start_row + row_offset).or_default();
            for (col_offset, cell) in row.values.iter().enumerate() {
                entry.insert(block.start_column + col_offset, cell);
            }
        }
    }
    rows
}

/// Every `(row, cell)` in one column, in row order.
#[must_use]
pub fn column_cells(grid: &[GridData], column: usize) -> Vec<(usize, &CellData)> {
    collect_rows(grid)
        .into_iter()
        .filter_map(|(row, cells)| cells.get(&column).map(|cell| (row, *cell)))
        .collect()
}

/// Locate the column headed `TASK` within the first rows of the grid.
#[must_use]
pub fn find_task_column(grid: &[GridData]) -> Option<usize> {
    let rows = collect_rows(grid);
    rows.range(..TASK_HEADER_ROWS).find_map(|(_, cells)| {
        cells.iter().find_map(|(col, cell)| {
            let raw = cell
                .formatted_value
                .as_deref()
                .filter(|s| !s.is_empty())
                .or_else(|| {
                    cell.user_entered_value
                        .as_ref()
                        .and_then(|v| v.string_value.as_deref())
                })?;
            raw.trim().eq_ignore_ascii_case("TASK").then_some(*col)
        })
    })
}

/// Locate the host column: the first header right of `TASK` that mentions
/// `HOST` or `TALENT`, within a few rows of the header row.
#[must_use]
pub fn find_host_column(grid: &[GridData], task_column: usize) -> Option<usize> {
    let rows = collect_rows(grid);
    let header_row = rows.iter().find_map(|(row, cells)| {
        cells
            .get(&task_column)
            .filter(|cell| cell_text(cell).eq_ignore_ascii_case("TASK"))
            .map(|_| *row)
    });
    let limit = header_row.map_or(5, |row| row + 3);

    for (_, cells) in rows.range(..=limit) {
        for (col, cell) in cells.range(task_column + 1..) {
            let header = normalize_header(&cell_text(cell), true);
            if header.contains("HOST") || header.contains("TALENT") {
                return Some(*col);
            }
        }
    }
    None
}

/// Spreadsheet column letters for a zero-based index.
#[must_use]
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + u8::try_from(rem).unwrap_or_default()));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// A1 notation for a zero-based cell: `(4, 2)` → `C5`.
#[must_use]
pub fn a1(row: usize, column: usize) -> String {
    format!("{}{}", column_letter(column), row + 1)
}

/// A single-cell range on a named tab, quoting the title.
#[must_use]
pub fn single_cell_range(sheet_title: &str, cell: &str) -> String {
    format!("'{}'!{cell}:{cell}", sheet_title.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotter_google::sheets::{ExtendedValue, RowData};

    #[test]
    fn test_cell_text_fallbacks() {
        let cell = CellData {
            formatted_value: Some("  ".to_string()),
            effective_value: Some(ExtendedValue {
                string_value: Some(" Effective ".to_string()),
                ..ExtendedValue::default()
            }),
            ..CellData::default()
        };
        assert_eq!(cell_text(&cell), "Effective");
        assert_eq!(cell_text(&CellData::default()), "");
    }

    #[test]
    fn test_cell_number() {
        assert_eq!(cell_number(&CellData::number(4.5)), Some(4.5));
        assert_eq!(cell_number(&CellData::text("1,250")), Some(1250.0));
        assert_eq!(cell_number(&CellData::text("n/a")), None);
        assert_eq!(cell_number(&CellData::default()), None);
    }

    #[test]
    fn test_collect_rows_applies_offsets() {
        let grid = vec![
            GridData::from_rows([vec!["a", "b"]]),
            GridData {
                start_row: 3,
                start_column: 2,
                row_data: vec![RowData {
                    values: vec![CellData::text("c")],
                }],
            },
        ];
        let rows = collect_rows(&grid);
        assert_eq!(cell_text(rows[&0][&1]), "b");
        assert_eq!(cell_text(rows[&3][&2]), "c");
        assert_eq!(column_cells(&grid, 2).len(), 1);
    }

    #[test]
    fn test_find_task_and_host_columns() {
        let grid = vec![GridData::from_rows([
            vec!["", "", "", ""],
            vec!["Time", "Video #", " task ", "Host / Talent"],
            vec!["9:00", "", "RANKING MATCH", "Host 1"],
        ])];
        assert_eq!(find_task_column(&grid), Some(2));
        assert_eq!(find_host_column(&grid, 2), Some(3));
        assert_eq!(find_host_column(&grid, 3), None);
    }

    #[test]
    fn test_task_column_must_be_near_top() {
        let mut rows = vec![vec![""]; 10];
        rows.push(vec!["TASK"]);
        let grid = vec![GridData::from_rows(rows)];
        assert_eq!(find_task_column(&grid), None);
    }

    #[test]
    fn test_task_header_from_entered_value() {
        let header = CellData {
            formatted_value: Some(String::new()),
            user_entered_value: Some(ExtendedValue {
                string_value: Some("TASK".to_string()),
                ..ExtendedValue::default()
            }),
            ..CellData::default()
        };
        let grid = vec![GridData {
            start_row: 0,
            start_column: 0,
            row_data: vec![RowData {
                values: vec![CellData::text("Time"), header],
            }],
        }];
        assert_eq!(find_task_column(&grid), Some(1));
    }

    #[test]
    fn test_column_letter() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(a1(4, 2), "C5");
    }

    #[test]
    fn test_single_cell_range_escapes_quotes() {
        assert_eq!(single_cell_range("Day 1", "C5"), "'Day 1'!C5:C5");
        assert_eq!(single_cell_range("Kid's Day", "A1"), "'Kid''s Day'!A1:A1");
    }
}
