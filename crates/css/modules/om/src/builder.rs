//! Builds live rule objects from parsed source data. Both the live sheet
//! and the detached "as last parsed" tree used for reconciliation go
//! through this one path, so their shapes always agree.

use crate::declaration::StyleDeclaration;
use crate::rule::{
    CssRule, DeclarationRule, GroupRule, ImportRule, KeyframeRule, KeyframesRule, PageRule,
    RuleHandle, StyleRule,
};
use css_syntax::{RuleKind, RuleSourceData, StyleSourceData};
use std::cell::RefCell;
use std::rc::Rc;

/// Build live rules for a parsed rule list. `Unknown` spans have no
/// object-model counterpart and are dropped, matching the flattening
/// filter.
pub fn build_rule_list(doc: &str, source: &[Rc<RuleSourceData>]) -> Vec<RuleHandle> {
    source
        .iter()
        .filter_map(|data| build_rule(doc, data))
        .map(|rule| Rc::new(RefCell::new(rule)))
        .collect()
}

fn build_rule(doc: &str, data: &RuleSourceData) -> Option<CssRule> {
    let header = header_text(doc, data);
    let rule = match data.kind {
        RuleKind::Style => CssRule::Style(StyleRule {
            selector_text: header,
            style: style_of(data.style.as_ref()),
        }),
        RuleKind::Import => CssRule::Import(ImportRule {
            header_text: header,
        }),
        RuleKind::Media => CssRule::Media(GroupRule {
            condition_text: header,
            rules: build_rule_list(doc, &data.child_rules),
        }),
        RuleKind::Supports => CssRule::Supports(GroupRule {
            condition_text: header,
            rules: build_rule_list(doc, &data.child_rules),
        }),
        RuleKind::Page => CssRule::Page(PageRule {
            selector_text: header,
            style: style_of(data.style.as_ref()),
        }),
        RuleKind::FontFace => CssRule::FontFace(DeclarationRule {
            style: style_of(data.style.as_ref()),
        }),
        RuleKind::Viewport => CssRule::Viewport(DeclarationRule {
            style: style_of(data.style.as_ref()),
        }),
        RuleKind::Keyframes => CssRule::Keyframes(KeyframesRule {
            name: header,
            rules: build_rule_list(doc, &data.child_rules),
        }),
        RuleKind::Keyframe => CssRule::Keyframe(KeyframeRule {
            key_text: header,
            style: style_of(data.style.as_ref()),
        }),
        RuleKind::Unknown => return None,
    };
    Some(rule)
}

fn header_text(doc: &str, data: &RuleSourceData) -> String {
    doc.get(data.header_range.start..data.header_range.end)
        .unwrap_or_default()
        .to_owned()
}

fn style_of(source: Option<&StyleSourceData>) -> StyleDeclaration {
    source.map_or_else(StyleDeclaration::new, StyleDeclaration::from_source)
}
