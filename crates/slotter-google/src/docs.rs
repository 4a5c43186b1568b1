//! Google Docs v1 wire types.
//!
//! Docs addresses content by UTF-16 code unit indexes. Every index in this
//! module follows that convention.

use serde::{Deserialize, Serialize};

/// A Google Doc.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Document {
    /// Document ID.
    pub document_id: String,
    /// Document title.
    pub title: String,
    /// Main body.
    pub body: Body,
}

/// The document body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Body {
    /// Top-level structural elements.
    pub content: Vec<StructuralElement>,
}

/// A paragraph, table, or table of contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StructuralElement {
    /// Start index, absent for the implicit first section break.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_index: Option<usize>,
    /// End index (exclusive).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_index: Option<usize>,
    /// Paragraph content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paragraph: Option<Paragraph>,
    /// Table content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<Table>,
    /// Table of contents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_of_contents: Option<TableOfContents>,
}

/// A paragraph made of runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Paragraph {
    /// Runs in the paragraph.
    pub elements: Vec<ParagraphElement>,
}

/// One run inside a paragraph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParagraphElement {
    /// Start index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_index: Option<usize>,
    /// End index (exclusive).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_index: Option<usize>,
    /// Text content, when this run is text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_run: Option<TextRun>,
}

/// A run of text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextRun {
    /// The text, including any trailing newline.
    pub content: String,
}

/// A table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Table {
    /// Rows.
    pub table_rows: Vec<TableRow>,
}

/// A table row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableRow {
    /// Cells.
    pub table_cells: Vec<TableCell>,
}

/// A table cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableCell {
    /// Nested content.
    pub content: Vec<StructuralElement>,
}

/// A table of contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableOfContents {
    /// Nested content.
    pub content: Vec<StructuralElement>,
}

/// A half-open index range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocRange {
    /// Start index.
    pub start_index: usize,
    /// End index (exclusive).
    pub end_index: usize,
}

/// An insertion point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Index to insert at.
    pub index: usize,
}

/// Paragraph style fields the slotter sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphStyle {
    /// `START`, `CENTER`, `END`, or `JUSTIFIED`.
    pub alignment: String,
}

/// Text style fields the slotter sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStyle {
    /// Bold on or off.
    pub bold: bool,
}

/// A single `documents.batchUpdate` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DocRequest {
    /// Remove a range of content.
    DeleteContentRange {
        /// Range to delete.
        range: DocRange,
    },
    /// Insert text at a location.
    InsertText {
        /// Where to insert.
        location: Location,
        /// Text to insert.
        text: String,
    },
    /// Change paragraph style over a range.
    UpdateParagraphStyle {
        /// Affected range.
        range: DocRange,
        /// New style.
        paragraph_style: ParagraphStyle,
        /// Field mask.
        fields: String,
    },
    /// Change text style over a range.
    UpdateTextStyle {
        /// Affected range.
        range: DocRange,
        /// New style.
        text_style: TextStyle,
        /// Field mask.
        fields: String,
    },
}

impl DocRequest {
    /// Delete `[start, end)`.
    #[must_use]
    pub fn delete(start_index: usize, end_index: usize) -> Self {
        Self::DeleteContentRange {
            range: DocRange {
                start_index,
                end_index,
            },
        }
    }

    /// Insert `text` at `index`.
    #[must_use]
    pub fn insert(index: usize, text: impl Into<String>) -> Self {
        Self::InsertText {
            location: Location { index },
            text: text.into(),
        }
    }

    /// Set paragraph alignment over `[start, end)`.
    #[must_use]
    pub fn align(start_index: usize, end_index: usize, alignment: impl Into<String>) -> Self {
        Self::UpdateParagraphStyle {
            range: DocRange {
                start_index,
                end_index,
            },
            paragraph_style: ParagraphStyle {
                alignment: alignment.into(),
            },
            fields: "alignment".to_string(),
        }
    }

    /// Set bold over `[start, end)`.
    #[must_use]
    pub fn bold(start_index: usize, end_index: usize, bold: bool) -> Self {
        Self::UpdateTextStyle {
            range: DocRange {
                start_index,
                end_index,
            },
            text_style: TextStyle { bold },
            fields: "bold".to_string(),
        }
    }
}

/// Body of `documents.batchUpdate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchUpdateDocumentRequest<'a> {
    /// Requests applied in order.
    pub requests: &'a [DocRequest],
}

impl StructuralElement {
    /// A paragraph holding a single text run starting at `start_index`.
    #[must_use]
    pub fn text(start_index: usize, content: impl Into<String>) -> Self {
        let content = content.into();
        let end_index = start_index + content.encode_utf16().count();
        Self {
            start_index: Some(start_index),
            end_index: Some(end_index),
            paragraph: Some(Paragraph {
                elements: vec![ParagraphElement {
                    start_index: Some(start_index),
                    end_index: Some(end_index),
                    text_run: Some(TextRun { content }),
                }],
            }),
            table: None,
            table_of_contents: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_request_wire_shape() {
        let requests = vec![
            DocRequest::delete(5, 9),
            DocRequest::insert(5, "HOST 1\n"),
            DocRequest::align(5, 12, "CENTER"),
            DocRequest::bold(5, 11, true),
        ];
        let json = serde_json::to_value(BatchUpdateDocumentRequest {
            requests: &requests,
        })
        .unwrap();
        let requests = &json["requests"];
        assert_eq!(requests[0]["deleteContentRange"]["range"]["startIndex"], 5);
        assert_eq!(requests[1]["insertText"]["location"]["index"], 5);
        assert_eq!(requests[1]["insertText"]["text"], "HOST 1\n");
        assert_eq!(
            requests[2]["updateParagraphStyle"]["paragraphStyle"]["alignment"],
            "CENTER"
        );
        assert_eq!(requests[2]["updateParagraphStyle"]["fields"], "alignment");
        assert_eq!(requests[3]["updateTextStyle"]["textStyle"]["bold"], true);
        assert_eq!(requests[3]["updateTextStyle"]["range"]["endIndex"], 11);
    }

    #[test]
    fn test_deserialize_document_with_table() {
        let json = r#"{
            "documentId": "doc1",
            "title": "Script",
            "body": {"content": [
                {"endIndex": 1, "sectionBreak": {}},
                {"startIndex": 1, "endIndex": 8, "paragraph": {"elements": [
                    {"startIndex": 1, "endIndex": 8, "textRun": {"content": "Hello!\n"}}
                ]}},
                {"startIndex": 8, "endIndex": 20, "table": {"tableRows": [
                    {"tableCells": [{"content": [
                        {"startIndex": 10, "paragraph": {"elements": [
                            {"startIndex": 10, "textRun": {"content": "cell\n"}}
                        ]}}
                    ]}]}
                ]}}
            ]}
        }"#;
        let document: Document = serde_json::from_str(json).unwrap();
        assert_eq!(document.title, "Script");
        assert_eq!(document.body.content.len(), 3);
        assert!(document.body.content[0].start_index.is_none());
        let table = document.body.content[2].table.as_ref().unwrap();
        let nested = &table.table_rows[0].table_cells[0].content[0];
        assert_eq!(nested.start_index, Some(10));
    }

    #[test]
    fn test_text_element_uses_utf16_length() {
        let element = StructuralElement::text(1, "🇺🇸\n");
        assert_eq!(element.end_index, Some(6));
    }
}
