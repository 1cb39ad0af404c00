#![cfg(test)]

use css_syntax::{RuleKind, RuleSourceData, SourceRange, flatten_rule_list, parse_sheet_text};
use std::rc::Rc;

fn slice(doc: &str, range: SourceRange) -> &str {
    &doc[range.start..range.end]
}

fn only_rule(rules: &[Rc<RuleSourceData>]) -> &Rc<RuleSourceData> {
    assert_eq!(rules.len(), 1, "expected exactly one top-level rule");
    &rules[0]
}

#[test]
fn style_rule_header_and_body_ranges() {
    let doc = "div { color: red; }";
    let rules = parse_sheet_text(doc);
    let rule = only_rule(&rules);
    assert_eq!(rule.kind, RuleKind::Style);
    assert_eq!(slice(doc, rule.header_range), "div");
    // Body range excludes both braces.
    assert_eq!(slice(doc, rule.body_range), " color: red; ");

    let style = rule.style.as_ref().expect("style rule carries declarations");
    assert_eq!(style.properties.len(), 1);
    let property = &style.properties[0];
    assert_eq!(property.name, "color");
    assert_eq!(property.value, "red");
    assert!(property.parsed_ok);
    assert!(!property.important);
    // The declaration range runs through the terminating semicolon.
    assert_eq!(slice(doc, property.range), "color: red;");
}

#[test]
fn selector_list_records_per_selector_ranges() {
    let doc = "div , span.note { top: 0; }";
    let rules = parse_sheet_text(doc);
    let rule = only_rule(&rules);
    assert_eq!(slice(doc, rule.header_range), "div , span.note");
    let selectors: Vec<&str> = rule
        .selector_ranges
        .iter()
        .map(|range| slice(doc, *range))
        .collect();
    assert_eq!(selectors, vec!["div", "span.note"]);
}

#[test]
fn selector_functions_hide_inner_commas() {
    let doc = ":is(a, b) { top: 0; }";
    let rules = parse_sheet_text(doc);
    let rule = only_rule(&rules);
    assert_eq!(rule.selector_ranges.len(), 1);
    assert_eq!(slice(doc, rule.selector_ranges[0]), ":is(a, b)");
}

#[test]
fn important_is_split_off_the_value() {
    let doc = "p { margin: 0 !important; }";
    let rules = parse_sheet_text(doc);
    let style = only_rule(&rules).style.as_ref().expect("declarations");
    let property = &style.properties[0];
    assert_eq!(property.value, "0");
    assert!(property.important);
    assert_eq!(slice(doc, property.range), "margin: 0 !important;");
}

#[test]
fn commented_out_declaration_surfaces_as_disabled() {
    let doc = "div { /* color: red; */ margin: 0; }";
    let rules = parse_sheet_text(doc);
    let style = only_rule(&rules).style.as_ref().expect("declarations");
    assert_eq!(style.properties.len(), 2);

    let disabled = &style.properties[0];
    assert!(disabled.disabled);
    assert_eq!(disabled.name, "color");
    assert_eq!(disabled.value, "red");
    assert_eq!(slice(doc, disabled.range), "/* color: red; */");

    let enabled = &style.properties[1];
    assert!(!enabled.disabled);
    assert_eq!(enabled.name, "margin");
    assert_eq!(enabled.value, "0");
}

#[test]
fn plain_comments_are_not_declarations() {
    // No trailing semicolon inside the comment, or not a declaration at
    // all: both stay plain comments.
    let doc = "div { /* color: red */ /* layout hack */ margin: 0; }";
    let rules = parse_sheet_text(doc);
    let style = only_rule(&rules).style.as_ref().expect("declarations");
    assert_eq!(style.properties.len(), 1);
    assert_eq!(style.properties[0].name, "margin");
}

#[test]
fn malformed_declaration_keeps_an_addressable_range() {
    let doc = "p { margin; color: blue; }";
    let rules = parse_sheet_text(doc);
    let style = only_rule(&rules).style.as_ref().expect("declarations");
    assert_eq!(style.properties.len(), 2);

    let broken = &style.properties[0];
    assert!(!broken.parsed_ok);
    assert_eq!(broken.name, "margin");
    // The fix-up pass widens the range up to (not past) the next
    // declaration, trailing whitespace excluded.
    assert_eq!(slice(doc, broken.range), "margin;");

    let fine = &style.properties[1];
    assert!(fine.parsed_ok);
    assert_eq!(fine.name, "color");
}

#[test]
fn media_rule_records_queries_and_expressions() {
    let doc = "@media screen and (min-width: 100px), print { a { top: 0; } }";
    let rules = parse_sheet_text(doc);
    let rule = only_rule(&rules);
    assert_eq!(rule.kind, RuleKind::Media);
    assert_eq!(
        slice(doc, rule.header_range),
        "screen and (min-width: 100px), print"
    );

    let media = rule.media.as_ref().expect("media prelude data");
    assert_eq!(media.queries.len(), 2);
    assert_eq!(
        slice(doc, media.queries[0].range),
        "screen and (min-width: 100px)"
    );
    assert_eq!(media.queries[0].expressions.len(), 1);
    assert_eq!(
        slice(doc, media.queries[0].expressions[0]),
        "(min-width: 100px)"
    );
    assert_eq!(slice(doc, media.queries[1].range), "print");

    assert_eq!(rule.child_rules.len(), 1);
    assert_eq!(rule.child_rules[0].kind, RuleKind::Style);
    assert_eq!(slice(doc, rule.child_rules[0].header_range), "a");
}

#[test]
fn keyframes_container_holds_keyframe_children() {
    let doc = "@keyframes spin { from { left: 0; } 50%, 75% { left: 5px; } }";
    let rules = parse_sheet_text(doc);
    let rule = only_rule(&rules);
    assert_eq!(rule.kind, RuleKind::Keyframes);
    assert_eq!(slice(doc, rule.header_range), "spin");
    assert_eq!(rule.child_rules.len(), 2);

    let first = &rule.child_rules[0];
    assert_eq!(first.kind, RuleKind::Keyframe);
    assert_eq!(slice(doc, first.header_range), "from");
    assert!(first.selector_ranges.is_empty());

    let second = &rule.child_rules[1];
    assert_eq!(slice(doc, second.header_range), "50%, 75%");
    let style = second.style.as_ref().expect("keyframe declarations");
    assert_eq!(style.properties[0].name, "left");
}

#[test]
fn import_rule_has_no_body() {
    let doc = "@import url(\"base.css\") screen;\na { top: 0; }";
    let rules = parse_sheet_text(doc);
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0].kind, RuleKind::Import);
    assert_eq!(slice(doc, rules[0].header_range), "url(\"base.css\") screen");
    assert!(rules[0].body_range.is_collapsed());
    assert_eq!(rules[1].kind, RuleKind::Style);
}

#[test]
fn unparseable_sections_become_unknown_spans() {
    let doc = "@bogus screen { x }\ndiv { top: 0; }";
    let rules = parse_sheet_text(doc);
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0].kind, RuleKind::Unknown);
    assert_eq!(rules[1].kind, RuleKind::Style);
}

#[test]
fn flattening_lists_containers_then_their_children() {
    let doc = "a { top: 0; } @media screen { b { top: 0; } c { top: 0; } } d { top: 0; }";
    let rules = parse_sheet_text(doc);
    let flat = flatten_rule_list(&rules);
    let kinds: Vec<RuleKind> = flat.iter().map(|rule| rule.kind).collect();
    assert_eq!(
        kinds,
        vec![
            RuleKind::Style,
            RuleKind::Media,
            RuleKind::Style,
            RuleKind::Style,
            RuleKind::Style,
        ]
    );
    let headers: Vec<&str> = flat.iter().map(|rule| slice(doc, rule.header_range)).collect();
    assert_eq!(headers, vec!["a", "screen", "b", "c", "d"]);
}

#[test]
fn whole_range_covers_braces_and_at_keyword() {
    let doc = "@media screen { a { top: 0; } }";
    let rules = parse_sheet_text(doc);
    let rule = only_rule(&rules);
    let whole = rule.whole_range(doc);
    assert_eq!(slice(doc, whole), doc);
}
