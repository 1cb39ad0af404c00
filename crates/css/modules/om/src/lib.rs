//! Live CSS object model: stylesheets, rules and declaration blocks that
//! script (or the inspector) mutates in place.
//!
//! Everything here is single-threaded by design — handles are
//! `Rc<RefCell<_>>`, and pointer identity is the identity the
//! reconciliation layer snapshots. The builder constructs rule trees from
//! `css_syntax` source data, so a detached "as last parsed" tree and the
//! live sheet always share one shape.

mod builder;
mod declaration;
mod rule;
mod sheet;

pub use builder::build_rule_list;
pub use declaration::{StyleDeclaration, StyleProperty};
pub use rule::{
    CssRule, DeclarationRule, GroupRule, ImportRule, KeyframeRule, KeyframesRule, PageRule,
    RuleHandle, StyleRule, flatten_rules,
};
pub use sheet::{
    CssStyleSheet, Element, ElementHandle, OmError, SheetHandle, delete_child_rule,
    insert_child_rule, parse_single_rule,
};

#[cfg(test)]
mod tests {
    use super::*;
    use css_syntax::RuleKind;

    #[test]
    fn sheet_from_text_builds_nested_rules() {
        let sheet = CssStyleSheet::from_text("a { top: 0; } @media screen { b { left: 1px; } }");
        assert_eq!(sheet.length(), 2);
        let media = sheet.item(1).expect("media rule present");
        assert_eq!(media.borrow().kind(), RuleKind::Media);
        let children = media.borrow().child_rules().map(<[RuleHandle]>::to_vec);
        assert_eq!(children.map(|rules| rules.len()), Some(1));
    }

    #[test]
    fn insert_rule_rejects_multi_rule_text() {
        let mut sheet = CssStyleSheet::from_text("a { top: 0; }");
        let result = sheet.insert_rule("b { left: 0; } c { left: 0; }", 1);
        assert_eq!(result.err(), Some(OmError::Syntax));
        assert_eq!(sheet.length(), 1);
    }

    #[test]
    fn flatten_matches_source_side_ordering() {
        let sheet = CssStyleSheet::from_text(
            "a { top: 0; } @media screen { b { left: 1px; } } c { right: 2px; }",
        );
        let flat = flatten_rules(sheet.rules());
        let kinds: Vec<RuleKind> = flat.iter().map(|rule| rule.borrow().kind()).collect();
        assert_eq!(
            kinds,
            vec![
                RuleKind::Style,
                RuleKind::Media,
                RuleKind::Style,
                RuleKind::Style,
            ]
        );
    }

    #[test]
    fn declaration_lookup_is_last_wins() {
        let style = StyleDeclaration::parse("color: red; color: blue;");
        assert_eq!(style.get_property_value("color"), Some("blue"));
        assert_eq!(style.len(), 2);
    }

    #[test]
    fn css_text_round_trips_through_the_parser() {
        let style = StyleDeclaration::parse("color: red; margin: 0 !important;");
        let reparsed = StyleDeclaration::parse(&style.css_text());
        assert_eq!(style, reparsed);
    }
}
