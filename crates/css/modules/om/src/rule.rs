//! Live rule objects. The set of rule kinds is closed, so rules are a
//! tagged variant matched exhaustively at the few choke points that branch
//! on kind, rather than a trait object per rule.

use crate::declaration::StyleDeclaration;
use css_syntax::RuleKind;
use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

/// Shared, mutable handle to a live rule. Pointer identity
/// (`Rc::ptr_eq`) is what the reconciliation layer uses for its
/// staleness snapshots.
pub type RuleHandle = Rc<RefCell<CssRule>>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleRule {
    pub selector_text: String,
    pub style: StyleDeclaration,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportRule {
    pub header_text: String,
}

/// `@media` / `@supports`: a condition plus nested rules.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupRule {
    pub condition_text: String,
    pub rules: Vec<RuleHandle>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRule {
    pub selector_text: String,
    pub style: StyleDeclaration,
}

/// `@font-face` / `@viewport`: a bare declaration block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeclarationRule {
    pub style: StyleDeclaration,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyframesRule {
    pub name: String,
    pub rules: Vec<RuleHandle>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyframeRule {
    pub key_text: String,
    pub style: StyleDeclaration,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CssRule {
    Style(StyleRule),
    Import(ImportRule),
    Media(GroupRule),
    Supports(GroupRule),
    Page(PageRule),
    FontFace(DeclarationRule),
    Viewport(DeclarationRule),
    Keyframes(KeyframesRule),
    Keyframe(KeyframeRule),
}

impl CssRule {
    pub fn kind(&self) -> RuleKind {
        match self {
            Self::Style(_) => RuleKind::Style,
            Self::Import(_) => RuleKind::Import,
            Self::Media(_) => RuleKind::Media,
            Self::Supports(_) => RuleKind::Supports,
            Self::Page(_) => RuleKind::Page,
            Self::FontFace(_) => RuleKind::FontFace,
            Self::Viewport(_) => RuleKind::Viewport,
            Self::Keyframes(_) => RuleKind::Keyframes,
            Self::Keyframe(_) => RuleKind::Keyframe,
        }
    }

    pub fn style(&self) -> Option<&StyleDeclaration> {
        match self {
            Self::Style(rule) => Some(&rule.style),
            Self::Page(rule) => Some(&rule.style),
            Self::FontFace(rule) | Self::Viewport(rule) => Some(&rule.style),
            Self::Keyframe(rule) => Some(&rule.style),
            _ => None,
        }
    }

    pub fn style_mut(&mut self) -> Option<&mut StyleDeclaration> {
        match self {
            Self::Style(rule) => Some(&mut rule.style),
            Self::Page(rule) => Some(&mut rule.style),
            Self::FontFace(rule) | Self::Viewport(rule) => Some(&mut rule.style),
            Self::Keyframe(rule) => Some(&mut rule.style),
            _ => None,
        }
    }

    pub fn child_rules(&self) -> Option<&[RuleHandle]> {
        match self {
            Self::Media(group) | Self::Supports(group) => Some(&group.rules),
            Self::Keyframes(keyframes) => Some(&keyframes.rules),
            _ => None,
        }
    }

    pub fn child_rules_mut(&mut self) -> Option<&mut Vec<RuleHandle>> {
        match self {
            Self::Media(group) | Self::Supports(group) => Some(&mut group.rules),
            Self::Keyframes(keyframes) => Some(&mut keyframes.rules),
            _ => None,
        }
    }

    pub fn selector_text(&self) -> Option<&str> {
        match self {
            Self::Style(rule) => Some(&rule.selector_text),
            Self::Page(rule) => Some(&rule.selector_text),
            _ => None,
        }
    }

    /// Returns false when the rule kind has no selector.
    pub fn set_selector_text(&mut self, text: &str) -> bool {
        match self {
            Self::Style(rule) => {
                rule.selector_text = text.to_owned();
                true
            }
            Self::Page(rule) => {
                rule.selector_text = text.to_owned();
                true
            }
            _ => false,
        }
    }

    pub fn condition_text(&self) -> Option<&str> {
        match self {
            Self::Media(group) | Self::Supports(group) => Some(&group.condition_text),
            _ => None,
        }
    }

    pub fn set_condition_text(&mut self, text: &str) -> bool {
        match self {
            Self::Media(group) | Self::Supports(group) => {
                group.condition_text = text.to_owned();
                true
            }
            _ => false,
        }
    }

    pub fn key_text(&self) -> Option<&str> {
        match self {
            Self::Keyframe(rule) => Some(&rule.key_text),
            _ => None,
        }
    }

    pub fn set_key_text(&mut self, text: &str) -> bool {
        match self {
            Self::Keyframe(rule) => {
                rule.key_text = text.to_owned();
                true
            }
            _ => false,
        }
    }

    /// Native serialization of the rule, nested rules included.
    pub fn css_text(&self) -> String {
        match self {
            Self::Style(rule) => block_text(&rule.selector_text, &rule.style),
            Self::Import(rule) => format!("@import {};", rule.header_text),
            Self::Media(group) => group_text("@media", &group.condition_text, &group.rules),
            Self::Supports(group) => group_text("@supports", &group.condition_text, &group.rules),
            Self::Page(rule) => {
                if rule.selector_text.is_empty() {
                    block_text("@page", &rule.style)
                } else {
                    block_text(&format!("@page {}", rule.selector_text), &rule.style)
                }
            }
            Self::FontFace(rule) => block_text("@font-face", &rule.style),
            Self::Viewport(rule) => block_text("@viewport", &rule.style),
            Self::Keyframes(keyframes) => {
                group_text("@keyframes", &keyframes.name, &keyframes.rules)
            }
            Self::Keyframe(rule) => block_text(&rule.key_text, &rule.style),
        }
    }
}

fn block_text(prefix: &str, style: &StyleDeclaration) -> String {
    let body = style.css_text();
    if body.is_empty() {
        format!("{prefix} {{ }}")
    } else {
        format!("{prefix} {{ {body} }}")
    }
}

fn group_text(keyword: &str, header: &str, rules: &[RuleHandle]) -> String {
    let mut out = format!("{keyword} {header} {{");
    for rule in rules {
        let _ = write!(out, " {}", rule.borrow().css_text());
    }
    out.push_str(" }");
    out
}

/// Depth-first pre-order linearization of live rules: containers are
/// listed, then recursed into. Mirrors `css_syntax::flatten_rule_list`,
/// branching on the same `RuleKind` predicates so the two sides cannot
/// disagree.
pub fn flatten_rules(rules: &[RuleHandle]) -> Vec<RuleHandle> {
    let mut flat = Vec::new();
    collect_flat(rules, &mut flat);
    flat
}

fn collect_flat(rules: &[RuleHandle], flat: &mut Vec<RuleHandle>) {
    for rule in rules {
        let kind = rule.borrow().kind();
        if kind.is_addressable() {
            flat.push(Rc::clone(rule));
        }
        if kind.is_container() {
            let children: Vec<RuleHandle> = rule
                .borrow()
                .child_rules()
                .map(<[RuleHandle]>::to_vec)
                .unwrap_or_default();
            collect_flat(&children, flat);
        }
    }
}
