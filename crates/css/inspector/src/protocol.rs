//! Wire-facing protocol types. The client addresses stylesheet content by
//! zero-based line/column quadruples; conversion to byte offsets happens
//! at the editor boundary via `LineIndex`. Wire framing and session
//! lifecycle live elsewhere; these types only pin the JSON shape.

use serde::{Deserialize, Serialize};

/// A text range addressed in line/column form, start inclusive, end
/// exclusive.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceRange {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl SourceRange {
    /// A collapsed range marking an insertion point.
    pub const fn collapsed(line: u32, column: u32) -> Self {
        Self {
            start_line: line,
            start_column: column,
            end_line: line,
            end_column: column,
        }
    }
}

/// One entry of a batch declaration-block edit.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StyleDeclarationEdit {
    pub style_sheet_id: String,
    pub range: SourceRange,
    pub text: String,
}
