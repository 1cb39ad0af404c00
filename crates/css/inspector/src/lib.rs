//! Inspector-facing CSS editing core: keeps a stylesheet's text, its
//! parsed source-range tree and the live object model continuously
//! consistent, so a devtools client can read and write selectors,
//! declaration blocks, media conditions and keyframe keys by character
//! range — even after script has mutated the object model independently.
//!
//! The two trees are never patched in lockstep. They are reconciled on
//! demand: lookups snapshot the live flat rule list, and when identity or
//! length drifted, an LCS alignment over canonical rule text rebuilds the
//! index maps (`canonical`). Edits are transactional (`sheet`), wrapped
//! in undoable actions with merge coalescing (`history`) and exposed over
//! a line/column-addressed protocol surface (`agent`).

mod agent;
mod canonical;
mod error;
mod history;
mod inline;
mod position;
pub mod protocol;
mod sheet;

pub use agent::{CssAgent, StyleSheetBinding};
pub use canonical::{IndexMapping, align_canonical, canonical_rule_text};
pub use error::{EditError, EditResult};
pub use history::{
    AddRuleAction, DeleteRuleAction, EditAction, EditHistory, ModifyRuleAction,
    SetElementStyleAction, SetSheetTextAction,
};
pub use inline::{InlineEditorHandle, InlineStyleEditor};
pub use position::{LineIndex, TextPosition};
pub use sheet::{
    EditOutcome, EditorHandle, RuleEdit, SheetListener, StyleSheetEditor, notify_if_changed,
};
