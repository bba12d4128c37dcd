//! Wire-level types for the document service's batch-edit endpoint.
//!
//! Everything here serializes to the exact camelCase JSON the service
//! accepts; optional fields are omitted rather than sent as null. The
//! compiler in `quill-markdown` builds these, it never interprets them.

mod requests;
mod style;

pub use requests::*;
pub use style::*;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// A single point in the document, in the service's own addressing scheme
/// (1-based, UTF-16 code units).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub index: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<SmolStr>,
}

/// A half-open offset range `[start_index, end_index)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Range {
    pub start_index: i64,
    pub end_index: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<SmolStr>,
}

impl Range {
    pub fn new(start_index: i64, end_index: i64, tab_id: Option<SmolStr>) -> Self {
        Self {
            start_index,
            end_index,
            tab_id,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start_index >= self.end_index
    }
}
