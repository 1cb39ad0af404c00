//! CSS Syntax Module Level 3 — parsing with source-position bookkeeping.
//! Spec: <https://www.w3.org/TR/css-syntax-3/>
//!
//! Parses stylesheet text into a `RuleSourceData` tree where every rule,
//! selector, declaration, media query and comment-disabled declaration
//! carries its byte range in the source. The tree is the textual half of
//! the text ⇄ object-model reconciliation done by `css_inspector`.

mod parser;
mod source_data;

pub use parser::{parse_declaration_list, parse_sheet_text};
pub use source_data::{
    MediaQuerySourceData, MediaSourceData, PropertySourceData, RuleKind, RuleSourceData,
    SourceRange, StyleSourceData, flatten_rule_list,
};
