#![cfg(test)]

use css_inspector::{
    AddRuleAction, EditHistory, ModifyRuleAction, RuleEdit, SetSheetTextAction, StyleSheetEditor,
};
use css_inspector::EditorHandle;
use css_om::CssStyleSheet;
use css_syntax::SourceRange;
use std::cell::RefCell;
use std::error::Error;
use std::rc::Rc;

fn editor_for(doc: &str) -> EditorHandle {
    let sheet = Rc::new(RefCell::new(CssStyleSheet::from_text(doc)));
    Rc::new(RefCell::new(StyleSheetEditor::with_text(
        "sheet-1", sheet, doc,
    )))
}

fn text_of(editor: &EditorHandle) -> String {
    editor
        .borrow()
        .get_text()
        .map(str::to_owned)
        .unwrap_or_default()
}

fn range_of(doc: &str, fragment: &str) -> SourceRange {
    let start = doc.find(fragment).expect("fragment present");
    SourceRange::new(start, start + fragment.len())
}

#[test]
fn selector_edit_round_trips_through_undo_and_redo() -> Result<(), Box<dyn Error>> {
    let doc = "div { color: red; }";
    let editor = editor_for(doc);
    let mut history = EditHistory::new();

    history.perform(Box::new(ModifyRuleAction::new(
        Rc::clone(&editor),
        RuleEdit::Selector,
        range_of(doc, "div"),
        "p",
    )))?;
    assert_eq!(text_of(&editor), "p { color: red; }");

    history.undo()?;
    assert_eq!(text_of(&editor), doc);

    history.redo()?;
    assert_eq!(text_of(&editor), "p { color: red; }");
    Ok(())
}

#[test]
fn consecutive_edits_to_one_target_merge_into_one_undo_step() -> Result<(), Box<dyn Error>> {
    let doc = "div { color: red; }";
    let editor = editor_for(doc);
    let mut history = EditHistory::new();
    let body = editor.borrow().flat_source()[0].body_range;

    // Keystroke-granularity edits: each one starts at the same offset.
    history.perform(Box::new(ModifyRuleAction::new(
        Rc::clone(&editor),
        RuleEdit::StyleText,
        body,
        " color: b; ",
    )))?;
    let body_after = editor.borrow().flat_source()[0].body_range;
    history.perform(Box::new(ModifyRuleAction::new(
        Rc::clone(&editor),
        RuleEdit::StyleText,
        body_after,
        " color: blue; ",
    )))?;
    assert_eq!(text_of(&editor), "div { color: blue; }");

    // One undo restores the original, not the intermediate state.
    history.undo()?;
    assert_eq!(text_of(&editor), doc);

    // And one redo lands on the final state again.
    history.redo()?;
    assert_eq!(text_of(&editor), "div { color: blue; }");
    Ok(())
}

#[test]
fn noop_edits_do_not_pollute_the_history() -> Result<(), Box<dyn Error>> {
    let doc = "div { color: red; }";
    let editor = editor_for(doc);
    let mut history = EditHistory::new();

    history.perform(Box::new(ModifyRuleAction::new(
        Rc::clone(&editor),
        RuleEdit::Selector,
        range_of(doc, "div"),
        "div",
    )))?;
    assert!(history.is_empty());

    // Undo over an empty history is a quiet no-op.
    history.undo()?;
    assert_eq!(text_of(&editor), doc);
    Ok(())
}

#[test]
fn undo_rolls_back_to_the_previous_marker() -> Result<(), Box<dyn Error>> {
    let doc = "div { color: red; }";
    let editor = editor_for(doc);
    let mut history = EditHistory::new();

    history.perform(Box::new(ModifyRuleAction::new(
        Rc::clone(&editor),
        RuleEdit::Selector,
        range_of(doc, "div"),
        "p",
    )))?;
    history.mark_undoable_state();

    let interim = text_of(&editor);
    history.perform(Box::new(ModifyRuleAction::new(
        Rc::clone(&editor),
        RuleEdit::Selector,
        SourceRange::new(0, 1),
        "span",
    )))?;
    assert_eq!(text_of(&editor), "span { color: red; }");

    // First undo stops at the marker, keeping the first edit applied.
    history.undo()?;
    assert_eq!(text_of(&editor), interim);

    // Second undo clears the rest.
    history.undo()?;
    assert_eq!(text_of(&editor), doc);
    Ok(())
}

#[test]
fn add_rule_undo_deletes_the_added_span() -> Result<(), Box<dyn Error>> {
    let doc = "a{}";
    let editor = editor_for(doc);
    let mut history = EditHistory::new();

    history.perform(Box::new(AddRuleAction::new(
        Rc::clone(&editor),
        " b {}",
        SourceRange::collapsed(3),
    )))?;
    assert_eq!(text_of(&editor), "a{} b {}");

    history.undo()?;
    assert_eq!(text_of(&editor), "a{}");

    history.redo()?;
    assert_eq!(text_of(&editor), "a{} b {}");
    Ok(())
}

#[test]
fn sheet_text_actions_merge_per_sheet() -> Result<(), Box<dyn Error>> {
    let doc = "a{}";
    let editor = editor_for(doc);
    let mut history = EditHistory::new();

    history.perform(Box::new(SetSheetTextAction::new(
        Rc::clone(&editor),
        "b { top: 0; }",
    )))?;
    history.perform(Box::new(SetSheetTextAction::new(
        Rc::clone(&editor),
        "c { top: 1px; }",
    )))?;
    assert_eq!(text_of(&editor), "c { top: 1px; }");

    history.undo()?;
    assert_eq!(text_of(&editor), doc);
    Ok(())
}
