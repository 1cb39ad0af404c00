//! The error taxonomy crossing the inspector boundary. Everything here is
//! a local, reported outcome: a failed operation leaves text, tree and
//! object model untouched, and the caller recovers by re-reading state.

use std::error::Error;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditError {
    /// The addressed range, rule or stylesheet id does not (or no longer)
    /// correspond to a live construct.
    NotFound,
    /// Replacement text failed round-trip verification for the construct
    /// kind being edited. The edit was not applied.
    SyntaxError,
    /// A line/column pair does not address any offset in the current text.
    OutOfBounds,
    /// The stylesheet has no addressable source text.
    ReadOnly,
    /// Range endpoints are inverted, or an insertion point was required
    /// and a non-collapsed range supplied (or vice versa).
    InvalidRange,
}

impl fmt::Display for EditError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::NotFound => "no construct matches the given target",
            Self::SyntaxError => "text does not parse as the edited construct",
            Self::OutOfBounds => "position is outside the stylesheet text",
            Self::ReadOnly => "stylesheet text is not available",
            Self::InvalidRange => "malformed source range",
        };
        formatter.write_str(message)
    }
}

impl Error for EditError {}

pub type EditResult<Value> = Result<Value, EditError>;
