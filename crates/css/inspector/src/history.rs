//! Undoable edit actions and the history that chains them.
//!
//! Every action's first `perform` is its `redo`; enough pre-state is
//! captured on the way through to support `undo`. Consecutive actions
//! with the same merge id coalesce into one history entry (keystroke
//! granularity collapses to one undo step) while the earliest old text
//! and range are preserved. Undo markers delimit the client-visible undo
//! steps: `undo` rolls back to the previous marker.

use crate::error::EditResult;
use crate::inline::{InlineEditorHandle, notify_inline_if_changed};
use crate::sheet::{EditorHandle, RuleEdit, notify_if_changed};
use css_om::{RuleHandle, StyleDeclaration};
use css_syntax::SourceRange;
use std::any::Any;

pub trait EditAction: Any {
    fn label(&self) -> &'static str;

    /// First application. Identical to `redo` for every action in this
    /// design; pre-state capture happens inside `redo` itself.
    fn perform(&mut self) -> EditResult<()> {
        self.redo()
    }

    fn undo(&mut self) -> EditResult<()>;

    fn redo(&mut self) -> EditResult<()>;

    /// Actions sharing a merge id coalesce in the history. `None` means
    /// the action never merges.
    fn merge_id(&self) -> Option<String> {
        None
    }

    /// Fold a newer same-merge-id action into this one: adopt its new
    /// text/range, keep this action's old state.
    fn merge(&mut self, _newer: &mut dyn EditAction) {}

    /// A performed action that changed nothing; the history drops it.
    fn is_noop(&self) -> bool {
        false
    }

    fn is_marker(&self) -> bool {
        false
    }

    /// Declaration-block text resulting from the action, for batch edit
    /// responses.
    fn serialized_style(&self) -> Option<String> {
        None
    }

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Replace a stylesheet's whole text.
pub struct SetSheetTextAction {
    editor: EditorHandle,
    text: String,
    old_text: Option<String>,
}

impl SetSheetTextAction {
    pub fn new(editor: EditorHandle, text: &str) -> Self {
        Self {
            editor,
            text: text.to_owned(),
            old_text: None,
        }
    }
}

impl EditAction for SetSheetTextAction {
    fn label(&self) -> &'static str {
        "SetStyleSheetText"
    }

    fn undo(&mut self) -> EditResult<()> {
        if let Some(old) = self.old_text.as_deref() {
            self.editor.borrow_mut().set_text(old);
        }
        notify_if_changed(&self.editor);
        Ok(())
    }

    fn redo(&mut self) -> EditResult<()> {
        {
            let mut editor = self.editor.borrow_mut();
            if self.old_text.is_none() {
                self.old_text = Some(editor.get_text()?.to_owned());
            }
            editor.set_text(&self.text);
        }
        notify_if_changed(&self.editor);
        Ok(())
    }

    fn merge_id(&self) -> Option<String> {
        Some(format!("set-sheet-text:{}", self.editor.borrow().id()))
    }

    fn merge(&mut self, newer: &mut dyn EditAction) {
        if let Some(other) = newer.as_any_mut().downcast_mut::<Self>() {
            self.text = other.text.clone();
        }
    }

    fn is_noop(&self) -> bool {
        self.old_text.as_deref() == Some(self.text.as_str())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Replace one construct of one rule (selector, declaration block, media
/// condition or keyframe key).
pub struct ModifyRuleAction {
    editor: EditorHandle,
    edit: RuleEdit,
    new_text: String,
    old_text: String,
    old_range: SourceRange,
    new_range: SourceRange,
    rule: Option<RuleHandle>,
}

impl ModifyRuleAction {
    pub fn new(editor: EditorHandle, edit: RuleEdit, range: SourceRange, text: &str) -> Self {
        Self {
            editor,
            edit,
            new_text: text.to_owned(),
            old_text: String::new(),
            old_range: range,
            new_range: range,
            rule: None,
        }
    }

    pub fn new_range(&self) -> SourceRange {
        self.new_range
    }

    pub fn take_rule(&mut self) -> Option<RuleHandle> {
        self.rule.take()
    }
}

impl EditAction for ModifyRuleAction {
    fn label(&self) -> &'static str {
        "ModifyRuleAction"
    }

    fn undo(&mut self) -> EditResult<()> {
        self.editor
            .borrow_mut()
            .modify_rule(self.edit, self.new_range, &self.old_text)?;
        notify_if_changed(&self.editor);
        Ok(())
    }

    fn redo(&mut self) -> EditResult<()> {
        let outcome = {
            let mut editor = self.editor.borrow_mut();
            editor.modify_rule(self.edit, self.old_range, &self.new_text)?
        };
        self.new_range = outcome.new_range;
        self.old_text = outcome.old_text;
        self.rule = Some(outcome.rule);
        notify_if_changed(&self.editor);
        Ok(())
    }

    fn merge_id(&self) -> Option<String> {
        Some(format!(
            "modify-rule:{}:{}:{}",
            self.edit.tag(),
            self.editor.borrow().id(),
            self.old_range.start
        ))
    }

    fn merge(&mut self, newer: &mut dyn EditAction) {
        if let Some(other) = newer.as_any_mut().downcast_mut::<Self>() {
            self.new_text = other.new_text.clone();
            self.new_range = other.new_range;
        }
    }

    fn is_noop(&self) -> bool {
        self.old_text == self.new_text
    }

    fn serialized_style(&self) -> Option<String> {
        if self.edit != RuleEdit::StyleText {
            return None;
        }
        self.rule
            .as_ref()
            .and_then(|rule| rule.borrow().style().map(StyleDeclaration::css_text))
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Insert a rule at a collapsed location; undo deletes the added span.
pub struct AddRuleAction {
    editor: EditorHandle,
    rule_text: String,
    location: SourceRange,
    added_range: SourceRange,
    rule: Option<RuleHandle>,
}

impl AddRuleAction {
    pub fn new(editor: EditorHandle, rule_text: &str, location: SourceRange) -> Self {
        Self {
            editor,
            rule_text: rule_text.to_owned(),
            location,
            added_range: location,
            rule: None,
        }
    }

    pub fn added_range(&self) -> SourceRange {
        self.added_range
    }

    pub fn take_rule(&mut self) -> Option<RuleHandle> {
        self.rule.take()
    }
}

impl EditAction for AddRuleAction {
    fn label(&self) -> &'static str {
        "AddRule"
    }

    fn undo(&mut self) -> EditResult<()> {
        self.editor.borrow_mut().delete_rule(self.added_range)?;
        notify_if_changed(&self.editor);
        Ok(())
    }

    fn redo(&mut self) -> EditResult<()> {
        let outcome = {
            let mut editor = self.editor.borrow_mut();
            editor.add_rule(&self.rule_text, self.location)?
        };
        self.added_range = outcome.new_range;
        self.rule = Some(outcome.rule);
        notify_if_changed(&self.editor);
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Delete the rule spanned by a range; undo restores the sheet text
/// captured before the deletion.
pub struct DeleteRuleAction {
    editor: EditorHandle,
    range: SourceRange,
    old_sheet_text: Option<String>,
}

impl DeleteRuleAction {
    pub fn new(editor: EditorHandle, range: SourceRange) -> Self {
        Self {
            editor,
            range,
            old_sheet_text: None,
        }
    }
}

impl EditAction for DeleteRuleAction {
    fn label(&self) -> &'static str {
        "DeleteRule"
    }

    fn undo(&mut self) -> EditResult<()> {
        if let Some(old) = self.old_sheet_text.as_deref() {
            self.editor.borrow_mut().set_text(old);
        }
        notify_if_changed(&self.editor);
        Ok(())
    }

    fn redo(&mut self) -> EditResult<()> {
        {
            let mut editor = self.editor.borrow_mut();
            if self.old_sheet_text.is_none() {
                self.old_sheet_text = Some(editor.get_text()?.to_owned());
            }
            editor.delete_rule(self.range)?;
        }
        notify_if_changed(&self.editor);
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Replace an element's whole style attribute.
pub struct SetElementStyleAction {
    editor: InlineEditorHandle,
    text: String,
    old_text: Option<String>,
}

impl SetElementStyleAction {
    pub fn new(editor: InlineEditorHandle, text: &str) -> Self {
        Self {
            editor,
            text: text.to_owned(),
            old_text: None,
        }
    }
}

impl EditAction for SetElementStyleAction {
    fn label(&self) -> &'static str {
        "SetElementStyleAction"
    }

    fn undo(&mut self) -> EditResult<()> {
        if let Some(old) = self.old_text.clone() {
            self.editor.borrow_mut().set_text(&old);
        }
        notify_inline_if_changed(&self.editor);
        Ok(())
    }

    fn redo(&mut self) -> EditResult<()> {
        {
            let mut editor = self.editor.borrow_mut();
            let old = editor.set_text(&self.text);
            if self.old_text.is_none() {
                self.old_text = Some(old);
            }
        }
        notify_inline_if_changed(&self.editor);
        Ok(())
    }

    fn merge_id(&self) -> Option<String> {
        Some(format!("set-element-style:{}", self.editor.borrow().id()))
    }

    fn merge(&mut self, newer: &mut dyn EditAction) {
        if let Some(other) = newer.as_any_mut().downcast_mut::<Self>() {
            self.text = other.text.clone();
        }
    }

    fn is_noop(&self) -> bool {
        self.old_text.as_deref() == Some(self.text.as_str())
    }

    fn serialized_style(&self) -> Option<String> {
        Some(StyleDeclaration::parse(&self.text).css_text())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Boundary between client-visible undo steps.
struct UndoableStateMark;

impl EditAction for UndoableStateMark {
    fn label(&self) -> &'static str {
        "MarkUndoableState"
    }

    fn undo(&mut self) -> EditResult<()> {
        Ok(())
    }

    fn redo(&mut self) -> EditResult<()> {
        Ok(())
    }

    fn is_marker(&self) -> bool {
        true
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Undo/redo stack with merge coalescing and noop dropping. A failing
/// undo or redo resets the whole history: the document state can no
/// longer be trusted to match any entry.
#[derive(Default)]
pub struct EditHistory {
    actions: Vec<Box<dyn EditAction>>,
    after_last: usize,
}

impl EditHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn perform(&mut self, mut action: Box<dyn EditAction>) -> EditResult<()> {
        action.perform()?;
        self.append_performed(action);
        Ok(())
    }

    /// Chain an already-performed action (batch edits perform first and
    /// append on overall success).
    pub fn append_performed(&mut self, mut action: Box<dyn EditAction>) {
        if action.is_noop() {
            return;
        }
        self.actions.truncate(self.after_last);
        if let Some(merge_id) = action.merge_id()
            && let Some(top) = self.actions.last_mut()
            && top.merge_id().as_deref() == Some(merge_id.as_str())
        {
            top.merge(action.as_mut());
            return;
        }
        self.actions.push(action);
        self.after_last = self.actions.len();
    }

    /// Push a boundary: the next `undo` rolls back everything up to it.
    pub fn mark_undoable_state(&mut self) {
        self.append_marker();
    }

    fn append_marker(&mut self) {
        self.actions.truncate(self.after_last);
        self.actions.push(Box::new(UndoableStateMark));
        self.after_last = self.actions.len();
    }

    /// Roll back to the previous undo marker (or the beginning).
    pub fn undo(&mut self) -> EditResult<()> {
        while self.after_last > 0 && self.actions[self.after_last - 1].is_marker() {
            self.after_last -= 1;
        }
        while self.after_last > 0 {
            let index = self.after_last - 1;
            if let Err(error) = self.actions[index].undo() {
                log::warn!("undo of {} failed: {error}; resetting history", self.actions[index].label());
                self.reset();
                return Err(error);
            }
            self.after_last = index;
            if self.actions[index].is_marker() {
                break;
            }
        }
        Ok(())
    }

    /// Re-apply up to the next undo marker (or the end).
    pub fn redo(&mut self) -> EditResult<()> {
        let total = self.actions.len();
        while self.after_last < total && self.actions[self.after_last].is_marker() {
            self.after_last += 1;
        }
        while self.after_last < total {
            let index = self.after_last;
            if let Err(error) = self.actions[index].redo() {
                log::warn!("redo of {} failed: {error}; resetting history", self.actions[index].label());
                self.reset();
                return Err(error);
            }
            self.after_last = index + 1;
            if self.actions[index].is_marker() {
                break;
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    fn reset(&mut self) {
        self.actions.clear();
        self.after_last = 0;
    }
}
