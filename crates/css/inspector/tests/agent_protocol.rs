#![cfg(test)]

use css_inspector::protocol::{SourceRange, StyleDeclarationEdit};
use css_inspector::{CssAgent, EditError, InlineStyleEditor, SheetListener};
use css_om::{CssStyleSheet, Element, SheetHandle};
use std::cell::RefCell;
use std::error::Error;
use std::rc::Rc;

fn live_sheet(doc: &str) -> SheetHandle {
    Rc::new(RefCell::new(CssStyleSheet::from_text(doc)))
}

fn register(agent: &mut CssAgent, doc: &str) -> (String, SheetHandle) {
    let sheet = live_sheet(doc);
    let id = agent.register_sheet(Rc::clone(&sheet), Some(doc));
    (id, sheet)
}

fn whole_line_range(line: u32, start: u32, end: u32) -> SourceRange {
    SourceRange {
        start_line: line,
        start_column: start,
        end_line: line,
        end_column: end,
    }
}

#[test]
fn selector_edit_addressed_by_line_and_column() -> Result<(), Box<dyn Error>> {
    let doc = "a { top: 0; }\ndiv { color: red; }\n";
    let mut agent = CssAgent::new();
    let (id, _sheet) = register(&mut agent, doc);

    // "div" sits on line 1, columns 0..3.
    let (selector, new_range) =
        agent.set_rule_selector(&id, &whole_line_range(1, 0, 3), "p")?;
    assert_eq!(selector, "p");
    assert_eq!(new_range, whole_line_range(1, 0, 1));
    assert_eq!(
        agent.get_style_sheet_text(&id)?,
        "a { top: 0; }\np { color: red; }\n"
    );
    Ok(())
}

#[test]
fn addresses_outside_the_text_are_rejected() {
    let doc = "a { top: 0; }";
    let mut agent = CssAgent::new();
    let (id, _sheet) = register(&mut agent, doc);

    let past_the_end = agent.set_rule_selector(&id, &whole_line_range(3, 0, 1), "p");
    assert_eq!(past_the_end.err(), Some(EditError::OutOfBounds));

    let inverted = SourceRange {
        start_line: 0,
        start_column: 5,
        end_line: 0,
        end_column: 1,
    };
    let backwards = agent.set_rule_selector(&id, &inverted, "p");
    assert_eq!(backwards.err(), Some(EditError::InvalidRange));
}

#[test]
fn unknown_sheet_ids_are_not_found() {
    let mut agent = CssAgent::new();
    let missing = agent.set_rule_selector("style-sheet-99", &whole_line_range(0, 0, 1), "p");
    assert_eq!(missing.err(), Some(EditError::NotFound));
}

#[test]
fn sheet_without_text_only_accepts_whole_replacement() -> Result<(), Box<dyn Error>> {
    let mut agent = CssAgent::new();
    let sheet = live_sheet("div { color: red; }");
    let id = agent.register_sheet(Rc::clone(&sheet), None);

    assert_eq!(
        agent.get_style_sheet_text(&id).err(),
        Some(EditError::ReadOnly)
    );
    let edit = agent.set_rule_selector(&id, &whole_line_range(0, 0, 3), "p");
    assert_eq!(edit.err(), Some(EditError::ReadOnly));

    // The undoable protocol action needs the old text and fails too; only
    // the model-level replacement (the resource text arriving) lifts the
    // restriction.
    let replace = agent.set_style_sheet_text(&id, "div { color: red; }");
    assert_eq!(replace.err(), Some(EditError::ReadOnly));
    agent
        .sheet_editor(&id)?
        .borrow_mut()
        .set_text("div { color: red; }");
    assert_eq!(agent.get_style_sheet_text(&id)?, "div { color: red; }");
    Ok(())
}

#[test]
fn batch_edit_applies_all_or_nothing() -> Result<(), Box<dyn Error>> {
    let doc_one = "div { color: red; }";
    let doc_two = "p { margin: 0; }";
    let mut agent = CssAgent::new();
    let (id_one, _sheet_one) = register(&mut agent, doc_one);
    let (id_two, _sheet_two) = register(&mut agent, doc_two);

    // Successful batch across two sheets.
    let results = agent.set_style_texts(&[
        StyleDeclarationEdit {
            style_sheet_id: id_one.clone(),
            range: whole_line_range(0, 5, 18),
            text: " color: blue; ".to_owned(),
        },
        StyleDeclarationEdit {
            style_sheet_id: id_two.clone(),
            range: whole_line_range(0, 3, 15),
            text: " margin: 4px; ".to_owned(),
        },
    ])?;
    assert_eq!(results.len(), 2);
    assert_eq!(agent.get_style_sheet_text(&id_one)?, "div { color: blue; }");
    assert_eq!(agent.get_style_sheet_text(&id_two)?, "p { margin: 4px; }");
    Ok(())
}

#[test]
fn failing_batch_edit_rolls_back_the_performed_prefix() -> Result<(), Box<dyn Error>> {
    let doc_one = "div { color: red; }";
    let doc_two = "p { margin: 0; }";
    let mut agent = CssAgent::new();
    let (id_one, _sheet_one) = register(&mut agent, doc_one);
    let (id_two, _sheet_two) = register(&mut agent, doc_two);

    let outcome = agent.set_style_texts(&[
        StyleDeclarationEdit {
            style_sheet_id: id_one.clone(),
            range: whole_line_range(0, 5, 18),
            text: " color: blue; ".to_owned(),
        },
        // Unbalanced replacement: fails verification.
        StyleDeclarationEdit {
            style_sheet_id: id_two.clone(),
            range: whole_line_range(0, 3, 15),
            text: "margin: 1px; } q {".to_owned(),
        },
        StyleDeclarationEdit {
            style_sheet_id: id_one.clone(),
            range: whole_line_range(0, 5, 18),
            text: " color: green; ".to_owned(),
        },
    ]);
    assert_eq!(outcome.err(), Some(EditError::SyntaxError));

    // Both sheets read back exactly as before the batch.
    assert_eq!(agent.get_style_sheet_text(&id_one)?, doc_one);
    assert_eq!(agent.get_style_sheet_text(&id_two)?, doc_two);
    Ok(())
}

#[test]
fn batch_edit_routes_inline_targets_to_the_attribute() -> Result<(), Box<dyn Error>> {
    let element = Element::new_handle();
    element
        .borrow_mut()
        .set_attribute("style", "color: red;");
    let mut agent = CssAgent::new();
    let id = agent.register_inline(Rc::clone(&element));

    let results = agent.set_style_texts(&[StyleDeclarationEdit {
        style_sheet_id: id.clone(),
        range: whole_line_range(0, 0, 11),
        text: "color: blue;".to_owned(),
    }])?;
    assert_eq!(results, vec!["color: blue;".to_owned()]);
    assert_eq!(
        element.borrow().get_attribute("style"),
        Some("color: blue;")
    );

    // Undo restores the attribute through the DOM primitive.
    agent.undo()?;
    assert_eq!(
        element.borrow().get_attribute("style"),
        Some("color: red;")
    );
    Ok(())
}

#[test]
fn empty_batches_are_rejected() {
    let mut agent = CssAgent::new();
    let outcome = agent.set_style_texts(&[]);
    assert_eq!(outcome.err(), Some(EditError::InvalidRange));
}

#[test]
fn inline_editor_follows_external_attribute_writes() {
    let element = Element::new_handle();
    element.borrow_mut().set_attribute("style", "color: red;");
    let mut editor = InlineStyleEditor::new("style-sheet-9", Rc::clone(&element));
    assert_eq!(editor.get_text(), "color: red;");

    let derived = editor.source_data();
    assert_eq!(derived.body_range.start, 0);
    assert_eq!(derived.body_range.end, 11);

    // Script writes the attribute directly; the next read re-derives the
    // implicit rule, commented-out declarations included.
    element
        .borrow_mut()
        .set_attribute("style", "margin: 0; /* color: red; */");
    let rederived = editor.source_data();
    let style = rederived.style.as_ref().expect("declarations");
    assert_eq!(style.properties.len(), 2);
    assert!(!style.properties[0].disabled);
    assert!(style.properties[1].disabled);
    assert_eq!(style.properties[1].name, "color");
}

#[test]
fn add_and_remove_rule_round_trip() -> Result<(), Box<dyn Error>> {
    let doc = "a{}";
    let mut agent = CssAgent::new();
    let (id, sheet) = register(&mut agent, doc);

    let added = agent.add_rule(&id, " b {}", &SourceRange::collapsed(0, 3))?;
    assert_eq!(added, whole_line_range(0, 3, 8));
    assert_eq!(agent.get_style_sheet_text(&id)?, "a{} b {}");
    assert_eq!(sheet.borrow().length(), 2);

    // Deletion removes the rule's own span; the separator space the
    // insertion added stays behind.
    agent.remove_rule(&id, &added)?;
    assert_eq!(agent.get_style_sheet_text(&id)?, "a{} ");
    assert_eq!(sheet.borrow().length(), 1);

    // The whole round trip is two undoable steps.
    agent.undo()?;
    assert_eq!(agent.get_style_sheet_text(&id)?, "a{} b {}");
    agent.undo()?;
    assert_eq!(agent.get_style_sheet_text(&id)?, "a{} ");
    Ok(())
}

struct ReentrantProbe {
    agent_sheet: css_inspector::EditorHandle,
    observed: RefCell<Vec<String>>,
}

impl SheetListener for ReentrantProbe {
    fn style_sheet_changed(&self, sheet_id: &str) {
        // Reentrant read: the editor must already be consistent.
        let text = self
            .agent_sheet
            .borrow()
            .get_text()
            .map(str::to_owned)
            .unwrap_or_default();
        self.observed.borrow_mut().push(format!("{sheet_id}: {text}"));
    }
}

#[test]
fn change_listener_observes_fresh_state() -> Result<(), Box<dyn Error>> {
    let doc = "div { color: red; }";
    let mut agent = CssAgent::new();
    let (id, _sheet) = register(&mut agent, doc);

    let probe = Rc::new(ReentrantProbe {
        agent_sheet: agent.sheet_editor(&id)?,
        observed: RefCell::new(Vec::new()),
    });
    agent.set_sheet_listener(&id, Some(Rc::clone(&probe) as Rc<dyn SheetListener>))?;

    agent.set_rule_selector(&id, &whole_line_range(0, 0, 3), "p")?;
    let observed = probe.observed.borrow();
    assert_eq!(
        observed.as_slice(),
        [format!("{id}: p {{ color: red; }}")]
    );
    Ok(())
}

#[test]
fn protocol_types_serialize_in_camel_case() -> Result<(), Box<dyn Error>> {
    let range = whole_line_range(1, 2, 3);
    let encoded = serde_json::to_string(&range)?;
    assert_eq!(
        encoded,
        "{\"startLine\":1,\"startColumn\":2,\"endLine\":1,\"endColumn\":3}"
    );
    let decoded: SourceRange = serde_json::from_str(&encoded)?;
    assert_eq!(decoded, range);

    let edit = StyleDeclarationEdit {
        style_sheet_id: "style-sheet-1".to_owned(),
        range,
        text: "color: red;".to_owned(),
    };
    let encoded_edit = serde_json::to_string(&edit)?;
    assert!(encoded_edit.contains("\"styleSheetId\":\"style-sheet-1\""));
    Ok(())
}
