//! The live stylesheet and the inline-style host element.

use crate::builder::build_rule_list;
use crate::rule::{CssRule, RuleHandle};
use css_syntax::parse_sheet_text;
use std::cell::RefCell;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::rc::Rc;

/// Shared handle to a live stylesheet, owned by the document.
pub type SheetHandle = Rc<RefCell<CssStyleSheet>>;

/// Shared handle to an element carrying a `style` attribute.
pub type ElementHandle = Rc<RefCell<Element>>;

/// Failures of the object-model mutation API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OmError {
    /// An index does not address a rule slot.
    IndexSize,
    /// Rule text did not parse to exactly one rule.
    Syntax,
}

impl fmt::Display for OmError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexSize => formatter.write_str("index is outside the rule list"),
            Self::Syntax => formatter.write_str("rule text did not parse to a single rule"),
        }
    }
}

impl Error for OmError {}

/// A live, script-mutable stylesheet: an ordered rule list with
/// index-addressed insertion and removal.
#[derive(Clone, Debug, Default)]
pub struct CssStyleSheet {
    rules: Vec<RuleHandle>,
}

impl CssStyleSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_handle() -> SheetHandle {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn from_text(text: &str) -> Self {
        let source = parse_sheet_text(text);
        Self {
            rules: build_rule_list(text, &source),
        }
    }

    pub fn rules(&self) -> &[RuleHandle] {
        &self.rules
    }

    pub fn length(&self) -> usize {
        self.rules.len()
    }

    pub fn item(&self, index: usize) -> Option<RuleHandle> {
        self.rules.get(index).map(Rc::clone)
    }

    /// Parse `text` as a single rule and insert it at `index`.
    pub fn insert_rule(&mut self, text: &str, index: usize) -> Result<RuleHandle, OmError> {
        if index > self.rules.len() {
            return Err(OmError::IndexSize);
        }
        let rule = parse_single_rule(text)?;
        self.rules.insert(index, Rc::clone(&rule));
        Ok(rule)
    }

    pub fn delete_rule(&mut self, index: usize) -> Result<(), OmError> {
        if index >= self.rules.len() {
            return Err(OmError::IndexSize);
        }
        self.rules.remove(index);
        Ok(())
    }

    /// Replace the whole rule list with a reparse of `text`.
    pub fn replace_text(&mut self, text: &str) {
        let source = parse_sheet_text(text);
        self.rules = build_rule_list(text, &source);
    }

    pub fn css_text(&self) -> String {
        let mut out = String::new();
        for rule in &self.rules {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&rule.borrow().css_text());
        }
        out
    }
}

/// Parse rule text that must yield exactly one live rule.
pub fn parse_single_rule(text: &str) -> Result<RuleHandle, OmError> {
    let source = parse_sheet_text(text);
    let mut built = build_rule_list(text, &source);
    if built.len() != 1 || source.len() != 1 {
        log::debug!(
            "rule text produced {} parsed / {} built rules, expected one",
            source.len(),
            built.len()
        );
        return Err(OmError::Syntax);
    }
    built.pop().ok_or(OmError::Syntax)
}

/// Insert a parsed rule into a container rule's child list.
pub fn insert_child_rule(
    container: &mut CssRule,
    text: &str,
    index: usize,
) -> Result<RuleHandle, OmError> {
    let children = container.child_rules_mut().ok_or(OmError::IndexSize)?;
    if index > children.len() {
        return Err(OmError::IndexSize);
    }
    let rule = parse_single_rule(text)?;
    children.insert(index, Rc::clone(&rule));
    Ok(rule)
}

/// Remove a rule from a container rule's child list.
pub fn delete_child_rule(container: &mut CssRule, index: usize) -> Result<(), OmError> {
    let children = container.child_rules_mut().ok_or(OmError::IndexSize)?;
    if index >= children.len() {
        return Err(OmError::IndexSize);
    }
    children.remove(index);
    Ok(())
}

/// A DOM element reduced to what inline-style editing needs: a mutable
/// attribute map.
#[derive(Clone, Debug, Default)]
pub struct Element {
    attributes: HashMap<String, String>,
}

impl Element {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_handle() -> ElementHandle {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) {
        self.attributes.insert(name.to_owned(), value.to_owned());
    }

    pub fn remove_attribute(&mut self, name: &str) {
        self.attributes.remove(name);
    }

    /// The `style` attribute's current text, empty when absent.
    pub fn style_attribute(&self) -> String {
        self.get_attribute("style").unwrap_or_default().to_owned()
    }
}
