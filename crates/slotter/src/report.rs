//! Change reports and batched cell writes.
//!
//! Every sheet tool produces the same two things: a list of value ranges to
//! write and a per-sheet list of human-readable entries describing them.
//! [`UpdateSet`] keeps the two together so they never drift apart.

use slotter_google::{GoogleApi, ValueRange};
use tracing::{debug, info};

use crate::error::Result;
use crate::sheet::single_cell_range;

/// Per-sheet report entries, in the order sheets were first touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    sheets: Vec<(String, Vec<String>)>,
}

impl Report {
    /// Create an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry under `sheet`.
    pub fn push(&mut self, sheet: &str, entry: impl Into<String>) {
        let entry = entry.into();
        if let Some((_, entries)) = self.sheets.iter_mut().find(|(title, _)| title == sheet) {
            entries.push(entry);
        } else {
            self.sheets.push((sheet.to_string(), vec![entry]));
        }
    }

    /// Whether nothing was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Number of sheets with entries.
    #[must_use]
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Total number of entries across sheets.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.sheets.iter().map(|(_, entries)| entries.len()).sum()
    }

    /// Entries for one sheet.
    #[must_use]
    pub fn entries(&self, sheet: &str) -> Option<&[String]> {
        self.sheets
            .iter()
            .find(|(title, _)| title == sheet)
            .map(|(_, entries)| entries.as_slice())
    }

    /// Iterate `(sheet, entries)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.sheets
            .iter()
            .map(|(title, entries)| (title.as_str(), entries.as_slice()))
    }

    /// Order sheets alphabetically.
    pub fn sort_by_sheet(&mut self) {
        self.sheets.sort_by(|a, b| a.0.cmp(&b.0));
    }

    /// `"3 cells updated on sheet (Day 1), 1 cell updated on sheet (Day 2)"`.
    #[must_use]
    pub fn breakdown(&self, verb: &str) -> String {
        self.sheets
            .iter()
            .map(|(title, entries)| {
                format!(
                    "{} {verb} on sheet ({title})",
                    plural(entries.len(), "cell", "cells")
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Render the bullet list shown after every tool run.
    #[must_use]
    pub fn format<S: AsRef<str>>(&self, diagnostics: &[S], header: &str, empty: &str) -> String {
        let mut lines = Vec::new();
        if self.is_empty() {
            lines.push(empty.to_string());
        } else {
            if !header.is_empty() {
                lines.push(header.to_string());
            }
            for (sheet, entries) in &self.sheets {
                lines.push(format!("• {sheet}:"));
                lines.extend(entries.iter().map(|entry| format!("  - {entry}")));
            }
        }

        if !diagnostics.is_empty() {
            lines.push(String::new());
            lines.push("Diagnostics:".to_string());
            lines.extend(diagnostics.iter().map(|d| format!("• {}", d.as_ref())));
        }

        lines.join("\n")
    }
}

/// `"1 cell"`, `"2 cells"`.
#[must_use]
pub fn plural(count: usize, one: &str, many: &str) -> String {
    format!("{count} {}", if count == 1 { one } else { many })
}

/// Cell writes and the report describing them.
#[derive(Debug, Clone, Default)]
pub struct UpdateSet {
    data: Vec<ValueRange>,
    report: Report,
}

impl UpdateSet {
    /// Create an empty update set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a write of `value` to `cell` (A1) on `sheet`, reported as
    /// `entry`.
    pub fn write(
        &mut self,
        sheet: &str,
        cell: &str,
        value: impl Into<String>,
        entry: impl Into<String>,
    ) {
        self.data
            .push(ValueRange::single(single_cell_range(sheet, cell), value));
        self.report.push(sheet, entry);
    }

    /// Queue a write without a report entry.
    pub fn write_silently(&mut self, sheet: &str, cell: &str, value: impl Into<String>) {
        self.data
            .push(ValueRange::single(single_cell_range(sheet, cell), value));
    }

    /// Whether no writes are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Queued writes.
    #[must_use]
    pub fn data(&self) -> &[ValueRange] {
        &self.data
    }

    /// The report.
    #[must_use]
    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Mutable access to the report, for reordering.
    pub fn report_mut(&mut self) -> &mut Report {
        &mut self.report
    }

    /// Send all queued writes in one batch.
    ///
    /// Returns `false` without contacting Google when nothing is queued or
    /// `dry_run` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch update fails.
    pub async fn apply(
        &self,
        api: &dyn GoogleApi,
        spreadsheet_id: &str,
        dry_run: bool,
    ) -> Result<bool> {
        if self.data.is_empty() {
            debug!("No cell updates to send");
            return Ok(false);
        }
        if dry_run {
            info!(ranges = self.data.len(), "Dry run: skipping spreadsheet update");
            return Ok(false);
        }
        api.batch_update_values(spreadsheet_id, &self.data).await?;
        info!(ranges = self.data.len(), "Spreadsheet updated");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeGoogle;

    #[test]
    fn test_report_keeps_first_seen_sheet_order() {
        let mut report = Report::new();
        report.push("Day 2", "C5: TEAM VIDEO PLACEHOLDER BAA");
        report.push("Day 1", "C7: TEAM VIDEO PLACEHOLDER AAA");
        report.push("Day 2", "C9: TEAM VIDEO PLACEHOLDER BAB");
        let sheets: Vec<&str> = report.iter().map(|(sheet, _)| sheet).collect();
        assert_eq!(sheets, vec!["Day 2", "Day 1"]);
        assert_eq!(report.entry_count(), 3);
        assert_eq!(report.sheet_count(), 2);

        report.sort_by_sheet();
        assert_eq!(report.iter().next().map(|(sheet, _)| sheet), Some("Day 1"));
    }

    #[test]
    fn test_format_with_entries_and_diagnostics() {
        let mut report = Report::new();
        report.push("Day 1", "C5: Japan");
        let text = report.format(
            &["Day 2: No TASK column found within the first 10 rows."],
            "Placeholder updates applied:",
            "No matching placeholders were found.",
        );
        assert_eq!(
            text,
            "Placeholder updates applied:\n• Day 1:\n  - C5: Japan\n\nDiagnostics:\n\
             • Day 2: No TASK column found within the first 10 rows."
        );
    }

    #[test]
    fn test_format_empty() {
        let text = Report::new().format::<&str>(&[], "Header:", "Nothing to do.");
        assert_eq!(text, "Nothing to do.");
    }

    #[test]
    fn test_breakdown_and_plural() {
        let mut report = Report::new();
        report.push("Day 1", "a");
        report.push("Day 1", "b");
        report.push("Day 2", "c");
        assert_eq!(
            report.breakdown("updated"),
            "2 cells updated on sheet (Day 1), 1 cell updated on sheet (Day 2)"
        );
        assert_eq!(plural(1, "sheet", "sheets"), "1 sheet");
        assert_eq!(plural(0, "sheet", "sheets"), "0 sheets");
    }

    #[tokio::test]
    async fn test_update_set_apply() {
        let fake = FakeGoogle::default();
        let mut updates = UpdateSet::new();
        assert!(!updates.apply(&fake, "sheet", false).await.unwrap());

        updates.write("Day 1", "C5", "RANKING MATCH #1", "C5: RANKING MATCH #1");
        assert!(!updates.apply(&fake, "sheet", true).await.unwrap());
        assert!(fake.written().is_empty());

        assert!(updates.apply(&fake, "sheet", false).await.unwrap());
        let written = fake.written();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].range, "'Day 1'!C5:C5");
        assert_eq!(updates.report().entries("Day 1").map(<[String]>::len), Some(1));
    }
}
