//! Declaration blocks of the live object model.

use css_syntax::{StyleSourceData, parse_declaration_list};
use std::fmt::Write as _;

/// One property of a declaration block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleProperty {
    pub name: String,
    pub value: String,
    pub important: bool,
}

/// An ordered, mutable declaration block — the `style` of a rule or of an
/// element. Only declarations that parsed cleanly make it into the object
/// model; disabled (commented-out) entries live in the source data only.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StyleDeclaration {
    properties: Vec<StyleProperty>,
}

impl StyleDeclaration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_source(source: &StyleSourceData) -> Self {
        let properties = source
            .properties
            .iter()
            .filter(|property| property.parsed_ok && !property.disabled)
            .map(|property| StyleProperty {
                name: property.name.clone(),
                value: property.value.clone(),
                important: property.important,
            })
            .collect();
        Self { properties }
    }

    pub fn parse(text: &str) -> Self {
        Self::from_source(&parse_declaration_list(text))
    }

    /// Replace the whole block with a reparse of `text`.
    pub fn set_css_text(&mut self, text: &str) {
        *self = Self::parse(text);
    }

    pub fn properties(&self) -> &[StyleProperty] {
        &self.properties
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Last-wins lookup, matching cascade order within one block.
    pub fn get_property_value(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .rev()
            .find(|property| property.name == name)
            .map(|property| property.value.as_str())
    }

    pub fn property_important(&self, name: &str) -> bool {
        self.properties
            .iter()
            .rev()
            .find(|property| property.name == name)
            .is_some_and(|property| property.important)
    }

    /// Serialize back to declaration-list text.
    pub fn css_text(&self) -> String {
        let mut out = String::new();
        for property in &self.properties {
            if !out.is_empty() {
                out.push(' ');
            }
            let _ = write!(out, "{}: {}", property.name, property.value);
            if property.important {
                out.push_str(" !important");
            }
            out.push(';');
        }
        out
    }
}
