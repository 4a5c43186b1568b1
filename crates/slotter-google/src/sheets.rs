//! Google Sheets v4 wire types.
//!
//! Only the parts of the `spreadsheets.get` response the slotter reads are
//! modelled; everything else is ignored during deserialization.

use serde::{Deserialize, Serialize};

/// Field mask used when fetching a spreadsheet with grid data.
pub const SPREADSHEET_FIELDS: &str = "spreadsheetId,properties(title),\
sheets(properties(title,sheetId,index),\
data(startRow,startColumn,rowData(values(userEnteredValue,effectiveValue,formattedValue))))";

/// A spreadsheet with its tabs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Spreadsheet {
    /// Spreadsheet ID.
    pub spreadsheet_id: String,
    /// Spreadsheet-level properties.
    pub properties: SpreadsheetProperties,
    /// Tabs in the spreadsheet.
    pub sheets: Vec<Sheet>,
}

/// Spreadsheet-level properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpreadsheetProperties {
    /// Title shown in Drive.
    pub title: String,
}

/// One tab of a spreadsheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Sheet {
    /// Tab properties.
    pub properties: SheetProperties,
    /// Grid blocks returned for this tab.
    pub data: Vec<GridData>,
}

/// Tab properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SheetProperties {
    /// Numeric sheet ID.
    pub sheet_id: i64,
    /// Tab title.
    pub title: String,
    /// Zero-based tab position.
    pub index: usize,
}

/// A rectangular block of cells starting at `(start_row, start_column)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridData {
    /// First row of this block (zero-based).
    pub start_row: usize,
    /// First column of this block (zero-based).
    pub start_column: usize,
    /// Rows in this block.
    pub row_data: Vec<RowData>,
}

/// One row of cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RowData {
    /// Cells in column order.
    pub values: Vec<CellData>,
}

/// A single cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CellData {
    /// The value the user typed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_entered_value: Option<ExtendedValue>,
    /// The computed value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_value: Option<ExtendedValue>,
    /// The value as displayed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_value: Option<String>,
}

/// A typed cell value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtendedValue {
    /// Numeric value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_value: Option<f64>,
    /// String value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    /// Boolean value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bool_value: Option<bool>,
    /// Formula source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formula_value: Option<String>,
}

/// A range of values to write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRange {
    /// A1 range such as `'Day 1'!C5:C5`.
    pub range: String,
    /// Row-major values.
    pub values: Vec<Vec<String>>,
}

impl ValueRange {
    /// Build a range that writes a single value.
    #[must_use]
    pub fn single(range: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            range: range.into(),
            values: vec![vec![value.into()]],
        }
    }
}

/// Body of `spreadsheets.values.batchUpdate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateValuesRequest<'a> {
    /// How input is interpreted.
    pub value_input_option: &'static str,
    /// Ranges to write.
    pub data: &'a [ValueRange],
}

impl CellData {
    /// A cell whose displayed value is `text`.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            user_entered_value: Some(ExtendedValue {
                string_value: Some(text.clone()),
                ..ExtendedValue::default()
            }),
            effective_value: None,
            formatted_value: Some(text),
        }
    }

    /// A numeric cell.
    #[must_use]
    pub fn number(value: f64) -> Self {
        Self {
            user_entered_value: Some(ExtendedValue {
                number_value: Some(value),
                ..ExtendedValue::default()
            }),
            effective_value: Some(ExtendedValue {
                number_value: Some(value),
                ..ExtendedValue::default()
            }),
            formatted_value: Some(value.to_string()),
        }
    }
}

impl GridData {
    /// Build a grid block at the origin from rows of display strings.
    ///
    /// Empty strings become empty cells.
    #[must_use]
    pub fn from_rows<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let row_data = rows
            .into_iter()
            .map(|row| RowData {
                values: row
                    .into_iter()
                    .map(|value| {
                        let value = value.as_ref();
                        if value.is_empty() {
                            CellData::default()
                        } else {
                            CellData::text(value)
                        }
                    })
                    .collect(),
            })
            .collect();
        Self {
            start_row: 0,
            start_column: 0,
            row_data,
        }
    }
}

impl Sheet {
    /// Build a tab with a single grid block.
    #[must_use]
    pub fn new(title: impl Into<String>, index: usize, grid: GridData) -> Self {
        Self {
            properties: SheetProperties {
                sheet_id: i64::try_from(index).unwrap_or_default(),
                title: title.into(),
                index,
            },
            data: vec![grid],
        }
    }

    /// The tab title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.properties.title
    }
}

impl Spreadsheet {
    /// Find a tab by title, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn sheet_by_title(&self, title: &str) -> Option<&Sheet> {
        let wanted = title.trim().to_lowercase();
        self.sheets
            .iter()
            .find(|sheet| sheet.properties.title.trim().to_lowercase() == wanted)
    }

    /// The spreadsheet title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.properties.title
    }
}
