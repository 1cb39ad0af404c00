//! The range-addressed edit surface the devtools client talks to. Owns
//! the stylesheet registry and the shared edit history; converts protocol
//! line/column quadruples to byte offsets at this boundary and back.

use crate::error::{EditError, EditResult};
use crate::history::{
    AddRuleAction, DeleteRuleAction, EditAction, EditHistory, ModifyRuleAction,
    SetElementStyleAction, SetSheetTextAction,
};
use crate::inline::{InlineEditorHandle, InlineStyleEditor};
use crate::protocol;
use crate::sheet::{EditorHandle, RuleEdit, SheetListener, StyleSheetEditor};
use css_om::{ElementHandle, SheetHandle};
use std::collections::HashMap;
use std::rc::Rc;

/// One registered stylesheet: a real sheet with addressable text, or an
/// element's implicit inline sheet.
#[derive(Clone)]
pub enum StyleSheetBinding {
    Sheet(EditorHandle),
    Inline(InlineEditorHandle),
}

#[derive(Default)]
pub struct CssAgent {
    sheets: HashMap<String, StyleSheetBinding>,
    history: EditHistory,
    next_id: u32,
}

impl CssAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a live stylesheet, with its source text when the origin
    /// allows reading it. Returns the id the client addresses it by.
    pub fn register_sheet(&mut self, sheet: SheetHandle, text: Option<&str>) -> String {
        let id = self.allocate_id();
        let editor = StyleSheetEditor::new_handle(&id, sheet, text);
        self.sheets
            .insert(id.clone(), StyleSheetBinding::Sheet(editor));
        id
    }

    /// Register an element's inline style as an implicit stylesheet.
    pub fn register_inline(&mut self, element: ElementHandle) -> String {
        let id = self.allocate_id();
        let editor = InlineStyleEditor::new_handle(&id, element);
        self.sheets
            .insert(id.clone(), StyleSheetBinding::Inline(editor));
        id
    }

    pub fn binding(&self, sheet_id: &str) -> EditResult<StyleSheetBinding> {
        self.sheets.get(sheet_id).cloned().ok_or(EditError::NotFound)
    }

    /// The sheet editor behind an id; inline bindings are not valid
    /// targets for rule-level operations.
    pub fn sheet_editor(&self, sheet_id: &str) -> EditResult<EditorHandle> {
        match self.sheets.get(sheet_id) {
            Some(StyleSheetBinding::Sheet(editor)) => Ok(Rc::clone(editor)),
            Some(StyleSheetBinding::Inline(_)) | None => Err(EditError::NotFound),
        }
    }

    pub fn set_sheet_listener(
        &self,
        sheet_id: &str,
        listener: Option<Rc<dyn SheetListener>>,
    ) -> EditResult<()> {
        match self.binding(sheet_id)? {
            StyleSheetBinding::Sheet(editor) => editor.borrow_mut().set_listener(listener),
            StyleSheetBinding::Inline(editor) => editor.borrow_mut().set_listener(listener),
        }
        Ok(())
    }

    pub fn get_style_sheet_text(&self, sheet_id: &str) -> EditResult<String> {
        match self.binding(sheet_id)? {
            StyleSheetBinding::Sheet(editor) => {
                let editor = editor.borrow();
                Ok(editor.get_text()?.to_owned())
            }
            StyleSheetBinding::Inline(editor) => Ok(editor.borrow_mut().get_text()),
        }
    }

    /// Whole-text replacement, undoable and coalesced per sheet id.
    pub fn set_style_sheet_text(&mut self, sheet_id: &str, text: &str) -> EditResult<()> {
        let action: Box<dyn EditAction> = match self.binding(sheet_id)? {
            StyleSheetBinding::Sheet(editor) => Box::new(SetSheetTextAction::new(editor, text)),
            StyleSheetBinding::Inline(editor) => {
                Box::new(SetElementStyleAction::new(editor, text))
            }
        };
        self.history.perform(action)
    }

    pub fn set_rule_selector(
        &mut self,
        sheet_id: &str,
        range: &protocol::SourceRange,
        selector: &str,
    ) -> EditResult<(String, protocol::SourceRange)> {
        self.modify_rule(sheet_id, RuleEdit::Selector, range, selector)
    }

    pub fn set_media_text(
        &mut self,
        sheet_id: &str,
        range: &protocol::SourceRange,
        condition: &str,
    ) -> EditResult<(String, protocol::SourceRange)> {
        self.modify_rule(sheet_id, RuleEdit::MediaText, range, condition)
    }

    pub fn set_keyframe_key(
        &mut self,
        sheet_id: &str,
        range: &protocol::SourceRange,
        key: &str,
    ) -> EditResult<(String, protocol::SourceRange)> {
        self.modify_rule(sheet_id, RuleEdit::KeyframeKey, range, key)
    }

    fn modify_rule(
        &mut self,
        sheet_id: &str,
        edit: RuleEdit,
        range: &protocol::SourceRange,
        text: &str,
    ) -> EditResult<(String, protocol::SourceRange)> {
        let editor = self.sheet_editor(sheet_id)?;
        let source_range = editor.borrow().protocol_range_to_source(range)?;
        let mut action = ModifyRuleAction::new(Rc::clone(&editor), edit, source_range, text);
        action.perform()?;
        let new_range = action.new_range();
        self.history.append_performed(Box::new(action));
        let protocol_range = editor.borrow().source_range_to_protocol(new_range)?;
        Ok((text.to_owned(), protocol_range))
    }

    /// Batch declaration-block edit: all edits are independent, performed
    /// in order; the first failure rolls the performed prefix back in
    /// reverse, so the batch is atomic for the caller. Inline targets
    /// become whole-attribute writes. Returns the resulting declaration
    /// text per edit.
    pub fn set_style_texts(
        &mut self,
        edits: &[protocol::StyleDeclarationEdit],
    ) -> EditResult<Vec<String>> {
        if edits.is_empty() {
            return Err(EditError::InvalidRange);
        }
        let mut actions: Vec<Box<dyn EditAction>> = Vec::with_capacity(edits.len());
        for edit in edits {
            match self.binding(&edit.style_sheet_id)? {
                StyleSheetBinding::Sheet(editor) => {
                    let range = editor.borrow().protocol_range_to_source(&edit.range)?;
                    actions.push(Box::new(ModifyRuleAction::new(
                        editor,
                        RuleEdit::StyleText,
                        range,
                        &edit.text,
                    )));
                }
                StyleSheetBinding::Inline(editor) => {
                    editor.borrow_mut().protocol_range_to_source(&edit.range)?;
                    actions.push(Box::new(SetElementStyleAction::new(editor, &edit.text)));
                }
            }
        }

        let mut results = Vec::with_capacity(actions.len());
        for index in 0..actions.len() {
            if let Err(error) = actions[index].perform() {
                for undone in actions[..index].iter_mut().rev() {
                    let rolled_back = undone.undo();
                    debug_assert!(
                        rolled_back.is_ok(),
                        "rollback of a performed edit cannot fail"
                    );
                }
                log::warn!("batch style edit #{index} failed: {error}");
                return Err(error);
            }
            results.push(actions[index].serialized_style().unwrap_or_default());
        }
        for action in actions {
            self.history.append_performed(action);
        }
        Ok(results)
    }

    /// Insert rule text at a collapsed location; returns the added
    /// rule's range in the updated text.
    pub fn add_rule(
        &mut self,
        sheet_id: &str,
        rule_text: &str,
        location: &protocol::SourceRange,
    ) -> EditResult<protocol::SourceRange> {
        let editor = self.sheet_editor(sheet_id)?;
        let source_location = editor.borrow().protocol_range_to_source(location)?;
        let mut action = AddRuleAction::new(Rc::clone(&editor), rule_text, source_location);
        action.perform()?;
        let added = action.added_range();
        self.history.append_performed(Box::new(action));
        editor.borrow().source_range_to_protocol(added)
    }

    /// Delete the rule spanned by `range`.
    pub fn remove_rule(
        &mut self,
        sheet_id: &str,
        range: &protocol::SourceRange,
    ) -> EditResult<()> {
        let editor = self.sheet_editor(sheet_id)?;
        let source_range = editor.borrow().protocol_range_to_source(range)?;
        let mut action = DeleteRuleAction::new(Rc::clone(&editor), source_range);
        action.perform()?;
        self.history.append_performed(Box::new(action));
        Ok(())
    }

    pub fn undo(&mut self) -> EditResult<()> {
        self.history.undo()
    }

    pub fn redo(&mut self) -> EditResult<()> {
        self.history.redo()
    }

    pub fn mark_undoable_state(&mut self) {
        self.history.mark_undoable_state();
    }

    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("style-sheet-{}", self.next_id)
    }
}
