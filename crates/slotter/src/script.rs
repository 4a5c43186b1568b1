//! Fill Script.
//!
//! A script Google Doc and the ROS both mark sections with
//! `[Block N start]` / `[Block N end]`. For a chosen block, the ROS rows
//! between the markers are turned into host lines, video cues, and
//! interview placeholders, which then replace the text between the same
//! markers in the document.

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use slotter_google::docs::StructuralElement;
use slotter_google::{DocRequest, Document, GoogleApi, Sheet, Spreadsheet};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::report::plural;
use crate::ros_document::extract_document_id;
use crate::sheet::{cell_text, collect_rows, column_cells, find_host_column, find_task_column};
use crate::text::{
    extract_host_number, extract_match_number, normalize_booth_key, normalize_video_number,
    similarity, truncate_chars, MAX_MESSAGE_LEN,
};

static BLOCK_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[Block\s+(\d+)\s+start\]").expect("valid regex"));

static BLOCK_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[Block\s+(\d+)\s+end\]").expect("valid regex"));

static BOOTH_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^BOOTH\s+INTERVIEW\s*[:\-]?\s*(.*)").expect("valid regex")
});

/// Minimum similarity for a booth label to match a Videos tab key.
pub const BOOTH_MATCH_THRESHOLD: f64 = 0.7;

const HOST_CYCLE: [&str; 3] = ["1", "2", "3"];

const TEAM_COLUMNS: (usize, usize, usize) = (0, 1, 5);
const FEATURE_COLUMNS: (usize, usize, usize) = (8, 9, 14);
const BOOTH_COLUMNS: (usize, usize) = (16, 19);

const PRINTED_SUFFIX: &str = "The generated script text has been printed above.";

/// Paragraph alignment of a script line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Alignment {
    /// Document default.
    #[default]
    Left,
    /// Centred.
    Center,
}

impl Alignment {
    /// The Docs API name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "LEFT",
            Self::Center => "CENTER",
        }
    }
}

/// One line of generated script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptLine {
    /// Line text without the trailing newline.
    pub text: String,
    /// Whether the line is bold.
    pub bold: bool,
    /// Paragraph alignment.
    pub alignment: Alignment,
}

impl ScriptLine {
    /// A plain left-aligned line.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// An empty line.
    #[must_use]
    pub fn blank() -> Self {
        Self::default()
    }

    /// A centred line.
    #[must_use]
    pub fn centered(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            alignment: Alignment::Center,
        }
    }

    /// The bold, centred `HOST n` line.
    #[must_use]
    pub fn host(number: &str) -> Self {
        Self {
            text: format!("HOST {number}"),
            bold: true,
            alignment: Alignment::Center,
        }
    }
}

/// Console rendering of a line: `[CENTER, BOLD] text`.
#[must_use]
pub fn format_line(line: &ScriptLine) -> String {
    let mut markers = Vec::new();
    if line.alignment != Alignment::Left {
        markers.push(line.alignment.as_str());
    }
    if line.bold {
        markers.push("BOLD");
    }
    match (markers.is_empty(), line.text.is_empty()) {
        (true, _) => line.text.clone(),
        (false, true) => format!("[{}]", markers.join(", ")),
        (false, false) => format!("[{}] {}", markers.join(", "), line.text),
    }
}

type MarkerPositions<T> = BTreeMap<u32, Vec<T>>;

/// `(block number, marker byte range)` for each marker `re` finds.
fn marker_numbers<'t>(
    re: &'t Regex,
    text: &'t str,
) -> impl Iterator<Item = (u32, Range<usize>)> + 't {
    re.captures_iter(text).filter_map(|caps| {
        let number = caps.get(1)?.as_str().parse().ok()?;
        Some((number, caps.get(0)?.range()))
    })
}

/// Block numbers with a start position before (or, when `inclusive`, at)
/// an end position.
fn matching_blocks<T: Ord + Copy>(
    starts: &MarkerPositions<T>,
    ends: &MarkerPositions<T>,
    inclusive: bool,
) -> Vec<u32> {
    starts
        .iter()
        .filter_map(|(number, start_positions)| {
            let end_positions = ends.get(number)?;
            start_positions
                .iter()
                .any(|start| {
                    end_positions
                        .iter()
                        .any(|end| if inclusive { start <= end } else { start < end })
                })
                .then_some(*number)
        })
        .collect()
}

/// Block numbers in a document's text with a start marker before an end
/// marker. Matching ignores case.
#[must_use]
pub fn find_blocks(text: &str) -> Vec<u32> {
    let mut starts: MarkerPositions<usize> = BTreeMap::new();
    for (number, range) in marker_numbers(&BLOCK_START_RE, text) {
        starts.entry(number).or_default().push(range.start);
    }
    let mut ends: MarkerPositions<usize> = BTreeMap::new();
    for (number, range) in marker_numbers(&BLOCK_END_RE, text) {
        ends.entry(number).or_default().push(range.start);
    }
    matching_blocks(&starts, &ends, false)
}

/// Block markers found in one ROS tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetBlocks {
    /// Tab title.
    pub title: String,
    /// Blocks with matching markers in the TASK column.
    pub blocks: Vec<u32>,
    /// Why the tab could not be scanned.
    pub problem: Option<String>,
}

impl SheetBlocks {
    /// One-line summary.
    #[must_use]
    pub fn status(&self) -> String {
        if let Some(problem) = &self.problem {
            return problem.clone();
        }
        if self.blocks.is_empty() {
            return format!(
                "{}: No matching ROS block tags were found in the TASK column.",
                self.title
            );
        }
        format!(
            "{}: Found {} with matching start and end tags.",
            self.title,
            plural(self.blocks.len(), "ROS block", "ROS blocks")
        )
    }
}

/// Block markers in a ROS tab's TASK column. A start and end on the same
/// row count.
#[must_use]
pub fn ros_blocks(sheet: &Sheet) -> SheetBlocks {
    let title = sheet.title().trim().to_string();
    let mut result = SheetBlocks {
        title: title.clone(),
        blocks: Vec::new(),
        problem: None,
    };
    if sheet.data.is_empty() {
        result.problem = Some(format!(
            "{title}: Sheet data is empty; no ROS block markers found."
        ));
        return result;
    }
    let Some(task_column) = find_task_column(&sheet.data) else {
        result.problem = Some(format!(
            "{title}: No TASK column found when scanning for ROS blocks."
        ));
        return result;
    };

    let mut starts: MarkerPositions<usize> = BTreeMap::new();
    let mut ends: MarkerPositions<usize> = BTreeMap::new();
    for (row, cell) in column_cells(&sheet.data, task_column) {
        let text = cell_text(cell);
        for (number, _) in marker_numbers(&BLOCK_START_RE, &text) {
            starts.entry(number).or_default().push(row);
        }
        for (number, _) in marker_numbers(&BLOCK_END_RE, &text) {
            ends.entry(number).or_default().push(row);
        }
    }
    result.blocks = matching_blocks(&starts, &ends, true);
    result
}

fn find_sheet<'a>(spreadsheet: &'a Spreadsheet, title: &str) -> Option<&'a Sheet> {
    let wanted = title.trim().to_lowercase();
    spreadsheet
        .sheets
        .iter()
        .find(|sheet| sheet.title().trim().to_lowercase() == wanted)
}

/// A team or feature video script from the Videos tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoScript {
    /// Video number without leading zeros.
    pub number: String,
    /// Label used in the cue line.
    pub label: String,
    /// What the host reads.
    pub script: String,
}

/// A booth interview script from the Videos tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoothScript {
    /// Interview key as typed.
    pub key: String,
    /// What the host reads.
    pub script: String,
    /// Comparison key.
    pub normalized_key: String,
}

/// Scripts from the Videos tab: team videos in columns A/B/F, feature
/// videos in I/J/O, booth interviews in Q/T.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptResources {
    /// Team videos by number. The first row for a number wins.
    pub team: HashMap<String, VideoScript>,
    /// Feature videos by number. The first row for a number wins.
    pub feature: HashMap<String, VideoScript>,
    /// Booth interviews in sheet order.
    pub booths: Vec<BoothScript>,
}

impl ScriptResources {
    /// Read the Videos tab.
    #[must_use]
    pub fn from_spreadsheet(spreadsheet: &Spreadsheet) -> (Self, Vec<String>) {
        let mut resources = Self::default();
        let mut diagnostics = Vec::new();

        let Some(sheet) = find_sheet(spreadsheet, "videos") else {
            diagnostics.push("Videos tab not found in the ROS spreadsheet.".to_string());
            return (resources, diagnostics);
        };
        if sheet.data.is_empty() {
            diagnostics.push("Videos tab does not contain any data.".to_string());
            return (resources, diagnostics);
        }

        for cells in collect_rows(&sheet.data).values() {
            let text = |column: usize| {
                cells
                    .get(&column)
                    .map(|cell| cell_text(cell))
                    .unwrap_or_default()
            };

            for ((number, label, script), target) in [
                (TEAM_COLUMNS, &mut resources.team),
                (FEATURE_COLUMNS, &mut resources.feature),
            ] {
                let number_text = text(number);
                let script = text(script);
                let Some(normalized) = normalize_video_number(&number_text) else {
                    continue;
                };
                if script.is_empty() {
                    continue;
                }
                let label = text(label);
                target.entry(normalized.clone()).or_insert(VideoScript {
                    number: normalized,
                    label: if label.is_empty() { number_text } else { label },
                    script,
                });
            }

            let key = text(BOOTH_COLUMNS.0);
            let script = text(BOOTH_COLUMNS.1);
            let normalized_key = normalize_booth_key(&key);
            if !script.is_empty() && !normalized_key.is_empty() {
                resources.booths.push(BoothScript {
                    key,
                    script,
                    normalized_key,
                });
            }
        }

        if resources.team.is_empty() {
            diagnostics.push(
                "Videos tab did not include any team video script entries (columns A/B/F)."
                    .to_string(),
            );
        }
        if resources.feature.is_empty() {
            diagnostics.push(
                "Videos tab did not include any feature video script entries (columns I/J/O)."
                    .to_string(),
            );
        }
        if resources.booths.is_empty() {
            diagnostics.push(
                "Videos tab did not include any booth interview script entries (columns Q/T)."
                    .to_string(),
            );
        }
        (resources, diagnostics)
    }

    /// The booth script for `label`: an exact key match, else the most
    /// similar key above [`BOOTH_MATCH_THRESHOLD`].
    #[must_use]
    pub fn booth(&self, label: &str) -> Option<&BoothScript> {
        let key = normalize_booth_key(label);
        if key.is_empty() {
            return None;
        }
        if let Some(exact) = self.booths.iter().find(|booth| booth.normalized_key == key) {
            return Some(exact);
        }

        let mut best: Option<(&BoothScript, f64)> = None;
        for booth in &self.booths {
            let score = similarity(&key, &booth.normalized_key);
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((booth, score));
            }
        }
        best.filter(|(_, score)| *score >= BOOTH_MATCH_THRESHOLD)
            .map(|(booth, _)| booth)
    }
}

/// First start row and the end row that closes it, as the ROS is read top
/// to bottom.
fn block_rows(sheet: &Sheet, task_column: usize, block: u32) -> Option<(usize, usize)> {
    let mut start_row = None;
    for (row, cell) in column_cells(&sheet.data, task_column) {
        let text = cell_text(cell);
        if text.is_empty() {
            continue;
        }
        if marker_numbers(&BLOCK_START_RE, &text).any(|(number, _)| number == block) {
            start_row = Some(row);
        }
        if let Some(start) = start_row {
            if row >= start
                && marker_numbers(&BLOCK_END_RE, &text).any(|(number, _)| number == block)
            {
                return Some((start, row));
            }
        }
    }
    None
}

/// Generate the script for `block` from the ROS tab `sheet_title`.
#[must_use]
pub fn build_lines(
    spreadsheet: &Spreadsheet,
    sheet_title: &str,
    block: u32,
) -> (Vec<ScriptLine>, Vec<String>) {
    let mut lines = Vec::new();
    let mut diagnostics = Vec::new();

    let Some(sheet) = find_sheet(spreadsheet, sheet_title) else {
        diagnostics.push(format!("Sheet '{sheet_title}' was not found in the ROS spreadsheet."));
        return (lines, diagnostics);
    };
    if sheet.data.is_empty() {
        diagnostics.push(format!("Sheet '{sheet_title}' does not contain any data."));
        return (lines, diagnostics);
    }
    let Some(task_column) = find_task_column(&sheet.data) else {
        diagnostics.push(format!("Sheet '{sheet_title}' is missing a TASK column."));
        return (lines, diagnostics);
    };
    let host_column = find_host_column(&sheet.data, task_column).unwrap_or(task_column + 1);

    let Some((start_row, end_row)) =
        block_rows(sheet, task_column, block).filter(|(start, end)| end > start)
    else {
        diagnostics.push(format!(
            "Block {block} markers were not found or are mismatched in sheet '{sheet_title}'."
        ));
        return (lines, diagnostics);
    };

    let (resources, resource_diagnostics) = ScriptResources::from_spreadsheet(spreadsheet);
    diagnostics.extend(resource_diagnostics);

    let mut eligible = false;
    let mut fallback_hosts = HOST_CYCLE.iter().cycle();
    let rows = collect_rows(&sheet.data);

    for (row, cells) in rows.range(start_row + 1..end_row) {
        let text = |column: usize| {
            cells
                .get(&column)
                .map(|cell| cell_text(cell))
                .unwrap_or_default()
        };
        let task = text(task_column);
        let task_upper = task.to_uppercase();
        let video_text = task_column.checked_sub(1).map(text).unwrap_or_default();

        let host_number = extract_host_number(&text(host_column))
            .or_else(|| fallback_hosts.next().map(|n| (*n).to_string()))
            .unwrap_or_default();

        if task_upper.starts_with("RANKING MATCH") {
            let header = if let Some(number) = extract_match_number(&task) {
                format!("<Ranking Match {number}>")
            } else {
                diagnostics.push(format!(
                    "Row {}: Unable to parse ranking match number from '{task}'.",
                    row + 1
                ));
                "<Ranking Match>".to_string()
            };
            lines.extend([
                ScriptLine::plain(header),
                ScriptLine::blank(),
                ScriptLine::plain("[Match Commentary]"),
                ScriptLine::blank(),
            ]);
            eligible = true;
            continue;
        }
        if task_upper.starts_with("FIELD INTERVIEW") {
            lines.extend([ScriptLine::plain("[Field Interview]"), ScriptLine::blank()]);
            eligible = true;
            continue;
        }
        if task_upper.starts_with("PIT INTERVIEW") {
            lines.extend([ScriptLine::plain("[Pit Interview]"), ScriptLine::blank()]);
            eligible = true;
            continue;
        }
        if task_upper.starts_with("BOOTH INTERVIEW") {
            let label = BOOTH_LABEL_RE
                .captures(&task)
                .and_then(|caps| caps.get(1))
                .map(|label| label.as_str().trim())
                .filter(|label| !label.is_empty())
                .unwrap_or(task.as_str())
                .to_string();
            let display = if label.is_empty() { "Booth Interview" } else { label.as_str() };
            lines.extend([
                ScriptLine::plain(format!("[{display} - See Below]")),
                ScriptLine::blank(),
                ScriptLine::host(&host_number),
            ]);
            match resources.booth(&label) {
                Some(booth) => lines.extend([
                    ScriptLine::centered(booth.script.trim()),
                    ScriptLine::blank(),
                ]),
                None => diagnostics.push(format!(
                    "Row {}: Booth interview '{display}' not found in Videos tab.",
                    row + 1
                )),
            }
            eligible = true;
            continue;
        }

        let Some(video_number) = normalize_video_number(&video_text) else {
            continue;
        };
        let cue = if let Some(entry) = resources.team.get(&video_number) {
            Some((entry, format!("<Team {} Video>", entry.label)))
        } else {
            resources
                .feature
                .get(&video_number)
                .map(|entry| (entry, format!("<Feature Video {}>", entry.label)))
        };
        let Some((entry, cue)) = cue else {
            diagnostics.push(format!(
                "Row {}: Video number '{video_text}' not found in Videos tab columns A or I.",
                row + 1
            ));
            continue;
        };
        lines.extend([
            ScriptLine::host(&host_number),
            ScriptLine::centered(entry.script.trim()),
            ScriptLine::blank(),
            ScriptLine::plain(cue),
            ScriptLine::blank(),
        ]);
        eligible = true;
    }

    if !eligible {
        diagnostics.push(format!(
            "Block {block} in sheet '{sheet_title}' did not contain any eligible rows."
        ));
    }
    debug!(block, sheet = sheet_title, lines = lines.len(), "Built script lines");
    (lines, diagnostics)
}

/// A character of flattened document text and where it lives in the doc.
#[derive(Debug, Clone, Copy)]
struct CharPosition {
    byte: usize,
    index: usize,
    width: usize,
}

fn collect_runs<'a>(elements: &'a [StructuralElement], runs: &mut Vec<(usize, &'a str)>) {
    for element in elements {
        if let Some(paragraph) = &element.paragraph {
            for run in &paragraph.elements {
                let Some(text_run) = &run.text_run else {
                    continue;
                };
                if text_run.content.is_empty() {
                    continue;
                }
                if let Some(start) = run.start_index.or(element.start_index) {
                    runs.push((start, text_run.content.as_str()));
                }
            }
        }
        if let Some(table) = &element.table {
            for row in &table.table_rows {
                for cell in &row.table_cells {
                    collect_runs(&cell.content, runs);
                }
            }
        }
        if let Some(contents) = &element.table_of_contents {
            collect_runs(&contents.content, runs);
        }
    }
}

/// Document text with a UTF-16 index for every character.
fn document_text(document: &Document) -> (String, Vec<CharPosition>) {
    let mut runs = Vec::new();
    collect_runs(&document.body.content, &mut runs);

    let mut text = String::new();
    let mut positions = Vec::new();
    for (start, content) in runs {
        let mut index = start;
        for ch in content.chars() {
            positions.push(CharPosition {
                byte: text.len(),
                index,
                width: ch.len_utf16(),
            });
            text.push(ch);
            index += ch.len_utf16();
        }
    }
    (text, positions)
}

fn doc_index(byte: usize, positions: &[CharPosition]) -> usize {
    let (Some(first), Some(last)) = (positions.first(), positions.last()) else {
        return 1;
    };
    let at = positions.partition_point(|position| position.byte < byte);
    if at == 0 {
        first.index
    } else if at >= positions.len() {
        last.index + last.width
    } else {
        positions[at].index
    }
}

/// The Docs range between the block's markers, excluding newlines right
/// after the start marker.
#[must_use]
pub fn locate_block_range(document: &Document, block: u32) -> Option<(usize, usize)> {
    let (text, positions) = document_text(document);
    if text.is_empty() {
        return None;
    }

    let start = marker_numbers(&BLOCK_START_RE, &text)
        .find(|(number, _)| *number == block)?
        .1
        .end;
    let end = start
        + marker_numbers(&BLOCK_END_RE, &text[start..])
            .find(|(number, _)| *number == block)?
            .1
            .start;

    let content_start = start + text[start..].len()
        - text[start..].trim_start_matches(['\n', '\r']).len();
    let content_end = end.max(content_start);
    Some((doc_index(content_start, &positions), doc_index(content_end, &positions)))
}

/// Requests that replace `range` with `lines`, styled line by line.
#[must_use]
pub fn plan_document_requests(range: (usize, usize), lines: &[ScriptLine]) -> Vec<DocRequest> {
    let (start_index, end_index) = range;
    let texts: Vec<String> = lines
        .iter()
        .map(|line| line.text.replace("\r\n", "\n").replace('\r', "\n"))
        .collect();

    let mut block_text = texts.join("\n");
    let newline_added = !block_text.is_empty() && !block_text.ends_with('\n');
    if newline_added {
        block_text.push('\n');
    }

    let mut requests = Vec::new();
    if end_index > start_index {
        requests.push(DocRequest::delete(start_index, end_index));
    }
    if block_text.is_empty() {
        return requests;
    }
    requests.push(DocRequest::insert(start_index, block_text));

    let mut position = start_index;
    for (i, (line, text)) in lines.iter().zip(&texts).enumerate() {
        let line_start = position;
        let line_end = line_start + text.encode_utf16().count();
        let is_last = i + 1 == lines.len();
        let paragraph_end = if !is_last || newline_added { line_end + 1 } else { line_end };

        if line.alignment != Alignment::Left && paragraph_end > line_start {
            requests.push(DocRequest::align(line_start, paragraph_end, line.alignment.as_str()));
        }
        if line_end > line_start {
            requests.push(DocRequest::bold(line_start, line_end, line.bold));
        }
        position = line_end + 1;
    }
    requests
}

/// Blocks found in a script document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentBlocks {
    /// Document ID from the link.
    pub document_id: String,
    /// Blocks with matching markers.
    pub blocks: Vec<u32>,
    /// Whether the exported text was blank.
    pub empty: bool,
}

impl DocumentBlocks {
    /// One-line summary.
    #[must_use]
    pub fn status(&self) -> String {
        if !self.blocks.is_empty() {
            return format!(
                "Found {} with matching start and end tags.",
                plural(self.blocks.len(), "block", "blocks")
            );
        }
        if self.empty {
            "The document was fetched but appears to be empty.".to_string()
        } else {
            "No matching block tags were found in the document.".to_string()
        }
    }
}

/// Read a script document's block markers.
///
/// # Errors
///
/// Returns an error if the link has no document ID or the export fails.
pub async fn document_blocks(api: &dyn GoogleApi, document_url: &str) -> Result<DocumentBlocks> {
    let url = document_url.trim();
    if url.is_empty() {
        return Err(Error::script("Enter a Google Docs link before reading."));
    }
    let document_id = extract_document_id(url).ok_or_else(|| {
        Error::script("Unable to determine document ID from the provided link.")
    })?;

    info!("Fetching Google Doc...");
    let text = api.export_document_text(&document_id).await.map_err(|e| {
        Error::script(truncate_chars(&format!("Failed to fetch Google Doc: {e}"), MAX_MESSAGE_LEN))
    })?;
    let blocks = find_blocks(&text);
    if !blocks.is_empty() {
        let summary: Vec<String> = blocks.iter().map(ToString::to_string).collect();
        info!("Found block markers: {}", summary.join(", "));
    }
    Ok(DocumentBlocks {
        document_id,
        blocks,
        empty: text.trim().is_empty(),
    })
}

/// Block markers in every ROS tab, or only in `sheet_title`.
///
/// # Errors
///
/// Returns an error if the spreadsheet cannot be fetched or the named tab
/// does not exist.
pub async fn spreadsheet_blocks(
    api: &dyn GoogleApi,
    spreadsheet_id: &str,
    sheet_title: Option<&str>,
) -> Result<Vec<SheetBlocks>> {
    info!("Loading ROS tabs...");
    let spreadsheet = api.get_spreadsheet(spreadsheet_id).await.map_err(|e| {
        Error::script(truncate_chars(
            &format!("Failed to load ROS spreadsheet: {e}"),
            MAX_MESSAGE_LEN,
        ))
    })?;

    if let Some(title) = sheet_title {
        let sheet = find_sheet(&spreadsheet, title).ok_or_else(|| {
            Error::script(format!("Sheet '{title}' was not found in the ROS spreadsheet."))
        })?;
        return Ok(vec![ros_blocks(sheet)]);
    }

    let mut sheets: Vec<&Sheet> = spreadsheet
        .sheets
        .iter()
        .filter(|sheet| !sheet.title().trim().is_empty())
        .collect();
    if sheets.is_empty() {
        return Err(Error::script("No tabs were found in the ROS spreadsheet."));
    }
    sheets.sort_by_key(|sheet| sheet.properties.index);
    Ok(sheets.into_iter().map(ros_blocks).collect())
}

/// Which block to fill, and from where.
#[derive(Debug, Clone, Copy)]
pub struct FillRequest<'a> {
    /// Script document link.
    pub document_url: &'a str,
    /// ROS spreadsheet ID.
    pub spreadsheet_id: &'a str,
    /// ROS tab holding the block.
    pub sheet_title: &'a str,
    /// Block number, the same in the document and the ROS.
    pub block: u32,
}

/// Script text generated for one block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedScript {
    /// Target document.
    pub document_id: String,
    /// Source ROS tab.
    pub sheet_title: String,
    /// Block number.
    pub block: u32,
    /// Generated lines.
    pub lines: Vec<ScriptLine>,
    /// Problems noticed while generating.
    pub diagnostics: Vec<String>,
}

impl GeneratedScript {
    /// The text as printed to the console, with style markers.
    #[must_use]
    pub fn render(&self) -> String {
        let mut output = format!("Block {} text ({}):", self.block, self.sheet_title);
        for line in &self.lines {
            output.push('\n');
            let formatted = format_line(line);
            if !formatted.is_empty() {
                output.push_str("  ");
                output.push_str(&formatted);
            }
        }
        output
    }

    /// Replace the block's content in the document.
    ///
    /// Returns the status message. Nothing is sent when no lines were
    /// generated or `dry_run` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or updated, or its
    /// markers are missing.
    pub async fn insert(&self, api: &dyn GoogleApi, dry_run: bool) -> Result<String> {
        let block = self.block;
        if self.lines.is_empty() {
            return Ok(format!(
                "No eligible rows were found for block {block} on '{}'.",
                self.sheet_title
            ));
        }
        if dry_run {
            return Ok(format!(
                "Dry run: block {block} text was not inserted into the Google Doc."
            ));
        }

        info!(
            "Updating Google Doc block {block} with generated text from '{}'.",
            self.sheet_title
        );
        let document = api.get_document(&self.document_id).await.map_err(|e| {
            let message = truncate_chars(
                &format!("Failed to load Google Doc for update: {e}"),
                MAX_MESSAGE_LEN,
            );
            Error::script(format!("{message} {PRINTED_SUFFIX}"))
        })?;
        let range = locate_block_range(&document, block).ok_or_else(|| {
            Error::script(format!(
                "Block {block} markers were not found or are mismatched in the Google Doc. \
                 {PRINTED_SUFFIX}"
            ))
        })?;

        let requests = plan_document_requests(range, &self.lines);
        if requests.is_empty() {
            return Ok(format!(
                "Block {block} markers were found but no content needed to be inserted."
            ));
        }
        api.batch_update_document(&self.document_id, &requests)
            .await
            .map_err(|e| {
                let message =
                    truncate_chars(&format!("Failed to update Google Doc: {e}"), MAX_MESSAGE_LEN);
                Error::script(format!("{message} {PRINTED_SUFFIX}"))
            })?;
        info!(
            "Block {block} text inserted into the Google Doc from '{}'.",
            self.sheet_title
        );
        Ok(format!(
            "Inserted generated script text for block {block} into the Google Doc."
        ))
    }
}

/// Check that the block exists in both the document and the ROS tab, then
/// generate its script.
///
/// # Errors
///
/// Returns an error if either side cannot be read or lacks the block.
pub async fn generate(api: &dyn GoogleApi, request: FillRequest<'_>) -> Result<GeneratedScript> {
    let block = request.block;
    let document = document_blocks(api, request.document_url).await?;
    if !document.blocks.contains(&block) {
        return Err(Error::script(format!(
            "Block {block} is not available in the scanned Google Doc."
        )));
    }

    let spreadsheet = api
        .get_spreadsheet(request.spreadsheet_id)
        .await
        .map_err(|e| {
            Error::script(truncate_chars(
                &format!("Failed to load ROS spreadsheet: {e}"),
                MAX_MESSAGE_LEN,
            ))
        })?;
    let sheet = find_sheet(&spreadsheet, request.sheet_title).ok_or_else(|| {
        Error::script(format!(
            "Sheet '{}' was not found in the ROS spreadsheet.",
            request.sheet_title
        ))
    })?;
    let sheet_title = sheet.title().trim().to_string();
    if !ros_blocks(sheet).blocks.contains(&block) {
        return Err(Error::script(format!(
            "Block {block} is not available in ROS tab '{sheet_title}'."
        )));
    }

    let (lines, diagnostics) = build_lines(&spreadsheet, &sheet_title, block);
    Ok(GeneratedScript {
        document_id: document.document_id,
        sheet_title,
        block,
        lines,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{spreadsheet, FakeGoogle};
    use pretty_assertions::assert_eq;
    use slotter_google::docs::Body;

    const DOC_URL: &str = "https://docs.google.com/document/d/doc123/edit";

    fn videos_row(cells: &[(usize, &'static str)]) -> Vec<&'static str> {
        let mut row = vec![""; 20];
        for (column, value) in cells {
            row[*column] = value;
        }
        row
    }

    fn ros() -> Spreadsheet {
        spreadsheet(
            "ROS",
            vec![
                (
                    "Day 1",
                    vec![
                        vec!["", "TASK", "Host"],
                        vec!["", "[Block 1 start]", ""],
                        vec!["", "RANKING MATCH #4", ""],
                        vec!["7", "France", "Host 2"],
                        vec!["", "BOOTH INTERVIEW: Coach Smith", ""],
                        vec!["021", "Sponsor reel", ""],
                        vec!["99", "Unknown", ""],
                        vec!["", "FIELD INTERVIEW", ""],
                        vec!["", "[Block 1 end]", ""],
                    ],
                ),
                (
                    "Videos",
                    vec![videos_row(&[
                        (0, "007"),
                        (1, "France"),
                        (5, "Bonjour from France!"),
                        (8, "21"),
                        (9, "Sponsors"),
                        (14, " Thanks to our sponsors. "),
                        (16, "Coach  Smith"),
                        (19, "Meet coach Smith."),
                    ])],
                ),
            ],
        )
    }

    fn document(paragraphs: &[(usize, &str)]) -> Document {
        Document {
            document_id: "doc123".to_string(),
            title: "Script".to_string(),
            body: Body {
                content: paragraphs
                    .iter()
                    .map(|(start, text)| StructuralElement::text(*start, *text))
                    .collect(),
            },
        }
    }

    #[test]
    fn test_find_blocks() {
        let text = "[Block 1 start]\nhello\n[block 1 END]\n\
                    [Block 2 end]\n[Block 2 start]\n[Block 3 start]";
        assert_eq!(find_blocks(text), vec![1]);
        assert!(find_blocks("").is_empty());
    }

    #[test]
    fn test_ros_blocks() {
        let ros = spreadsheet(
            "ROS",
            vec![(
                "Day 1",
                vec![
                    vec!["TASK"],
                    vec!["[Block 1 start] [Block 1 end]"],
                    vec!["[Block 2 end]"],
                    vec!["[Block 2 start]"],
                ],
            )],
        );
        let blocks = ros_blocks(&ros.sheets[0]);
        assert_eq!(blocks.blocks, vec![1]);
        assert_eq!(
            blocks.status(),
            "Day 1: Found 1 ROS block with matching start and end tags."
        );

        let ros = spreadsheet("ROS", vec![("Notes", vec![vec!["hello"]])]);
        assert_eq!(
            ros_blocks(&ros.sheets[0]).status(),
            "Notes: No TASK column found when scanning for ROS blocks."
        );
    }

    #[test]
    fn test_build_lines() {
        let (lines, diagnostics) = build_lines(&ros(), "day 1", 1);
        let formatted: Vec<String> = lines.iter().map(format_line).collect();
        assert_eq!(
            formatted,
            vec![
                "<Ranking Match 4>",
                "",
                "[Match Commentary]",
                "",
                "[CENTER, BOLD] HOST 2",
                "[CENTER] Bonjour from France!",
                "",
                "<Team France Video>",
                "",
                "[Coach Smith - See Below]",
                "",
                "[CENTER, BOLD] HOST 2",
                "[CENTER] Meet coach Smith.",
                "",
                "[CENTER, BOLD] HOST 3",
                "[CENTER] Thanks to our sponsors.",
                "",
                "<Feature Video Sponsors>",
                "",
                "[Field Interview]",
                "",
            ]
        );
        assert_eq!(
            diagnostics,
            vec!["Row 7: Video number '99' not found in Videos tab columns A or I.".to_string()]
        );
    }

    #[test]
    fn test_build_lines_missing_block() {
        let (lines, diagnostics) = build_lines(&ros(), "Day 1", 2);
        assert!(lines.is_empty());
        assert_eq!(
            diagnostics,
            vec!["Block 2 markers were not found or are mismatched in sheet 'Day 1'.".to_string()]
        );
    }

    #[test]
    fn test_booth_lookup_is_fuzzy() {
        let (resources, _) = ScriptResources::from_spreadsheet(&ros());
        assert!(resources.booth("coach smith").is_some());
        assert!(resources.booth("Coach Smyth").is_some());
        assert!(resources.booth("Team Captain").is_none());
        assert!(resources.booth("  ").is_none());
    }

    #[test]
    fn test_format_line() {
        assert_eq!(format_line(&ScriptLine::host("1")), "[CENTER, BOLD] HOST 1");
        assert_eq!(format_line(&ScriptLine::centered("")), "[CENTER]");
        assert_eq!(format_line(&ScriptLine::plain("<Ranking Match 3>")), "<Ranking Match 3>");
        assert_eq!(format_line(&ScriptLine::blank()), "");
    }

    #[test]
    fn test_locate_block_range() {
        let doc = document(&[
            (1, "Intro\n"),
            (7, "[Block 1 start]\n"),
            (23, "old line\n"),
            (32, "[Block 1 end]\n"),
        ]);
        assert_eq!(locate_block_range(&doc, 1), Some((23, 32)));
        assert_eq!(locate_block_range(&doc, 2), None);
    }

    #[test]
    fn test_locate_block_range_counts_utf16() {
        let doc = document(&[(1, "🇫🇷\n"), (6, "[Block 2 start]\nX\n[Block 2 end]\n")]);
        assert_eq!(locate_block_range(&doc, 2), Some((22, 24)));
    }

    #[test]
    fn test_plan_document_requests() {
        let lines = vec![
            ScriptLine::host("1"),
            ScriptLine::centered("Hi"),
            ScriptLine::blank(),
        ];
        assert_eq!(
            plan_document_requests((10, 20), &lines),
            vec![
                DocRequest::delete(10, 20),
                DocRequest::insert(10, "HOST 1\nHi\n"),
                DocRequest::align(10, 17, "CENTER"),
                DocRequest::bold(10, 16, true),
                DocRequest::align(17, 20, "CENTER"),
                DocRequest::bold(17, 19, false),
            ]
        );

        assert_eq!(
            plan_document_requests((5, 5), &[ScriptLine::plain("A")]),
            vec![DocRequest::insert(5, "A\n"), DocRequest::bold(5, 6, false)]
        );
    }

    #[tokio::test]
    async fn test_generate_and_insert() {
        let mut fake = FakeGoogle::with_spreadsheet("ros", ros());
        fake.exports.insert(
            "doc123".to_string(),
            "[Block 1 start]\nold\n[Block 1 end]\n".to_string(),
        );
        fake.documents.insert(
            "doc123".to_string(),
            document(&[(1, "[Block 1 start]\n"), (17, "old\n"), (21, "[Block 1 end]\n")]),
        );

        let request = FillRequest {
            document_url: DOC_URL,
            spreadsheet_id: "ros",
            sheet_title: "Day 1",
            block: 1,
        };
        let script = generate(&fake, request).await.unwrap();
        assert_eq!(script.document_id, "doc123");
        assert!(script.render().starts_with("Block 1 text (Day 1):\n  <Ranking Match 4>\n\n"));

        let status = script.insert(&fake, true).await.unwrap();
        assert!(status.starts_with("Dry run"));
        assert!(fake.requests().is_empty());

        let status = script.insert(&fake, false).await.unwrap();
        assert_eq!(
            status,
            "Inserted generated script text for block 1 into the Google Doc."
        );
        let requests = fake.requests();
        assert_eq!(requests[0], DocRequest::delete(17, 21));
        assert!(matches!(
            &requests[1],
            DocRequest::InsertText { text, .. } if text.starts_with("<Ranking Match 4>\n")
        ));
    }

    #[tokio::test]
    async fn test_generate_requires_block_in_document() {
        let mut fake = FakeGoogle::with_spreadsheet("ros", ros());
        fake.exports
            .insert("doc123".to_string(), "[Block 5 start][Block 5 end]".to_string());

        let request = FillRequest {
            document_url: DOC_URL,
            spreadsheet_id: "ros",
            sheet_title: "Day 1",
            block: 1,
        };
        let err = generate(&fake, request).await.unwrap_err();
        assert_eq!(err.to_string(), "Block 1 is not available in the scanned Google Doc.");

        let err = document_blocks(&fake, "https://example.com").await.unwrap_err();
        assert_eq!(err.to_string(), "Unable to determine document ID from the provided link.");
    }
}
