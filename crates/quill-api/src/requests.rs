//! The request envelope and its per-operation payloads.

use serde::{Deserialize, Serialize};

use crate::{
    BulletPreset, Location, ParagraphStyle, Range, TableCellStyle, TextStyle,
};

/// One edit request in a batch. Externally tagged, so each serializes as a
/// single-key object (`{"insertText": {...}}` and so on) — the shape the
/// batch endpoint expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Request {
    InsertText(InsertTextRequest),
    UpdateTextStyle(UpdateTextStyleRequest),
    UpdateParagraphStyle(UpdateParagraphStyleRequest),
    CreateParagraphBullets(CreateParagraphBulletsRequest),
    InsertTable(InsertTableRequest),
    UpdateTableCellStyle(UpdateTableCellStyleRequest),
}

/// Places literal text at a single location. The service applies these
/// against its live document in batch order, so locations are computed
/// against the document as it exists after the preceding insertions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertTextRequest {
    pub text: String,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertTableRequest {
    pub rows: i64,
    pub columns: i64,
    pub location: Location,
}

/// `fields` is the service's update mask: a comma-separated list naming
/// exactly the style members being written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTextStyleRequest {
    pub range: Range,
    pub text_style: TextStyle,
    pub fields: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateParagraphStyleRequest {
    pub range: Range,
    pub paragraph_style: ParagraphStyle,
    pub fields: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateParagraphBulletsRequest {
    pub range: Range,
    pub bullet_preset: BulletPreset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTableCellStyleRequest {
    pub table_cell_style: TableCellStyle,
    pub table_range: TableRange,
    pub fields: String,
}

/// A rectangular region of table cells, addressed through the table's own
/// start location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRange {
    pub table_cell_location: TableCellLocation,
    pub row_span: i64,
    pub column_span: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCellLocation {
    pub table_start_location: Location,
    pub row_index: i64,
    pub column_index: i64,
}

impl Request {
    /// The insertion text, for insert-text requests.
    pub fn inserted_text(&self) -> Option<&str> {
        match self {
            Request::InsertText(req) => Some(&req.text),
            _ => None,
        }
    }
}
