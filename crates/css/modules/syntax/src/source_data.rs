//! Source-position bookkeeping types produced by the parser.

use smallvec::SmallVec;
use std::rc::Rc;

/// Half-open byte range `[start, end)` into a single text buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SourceRange {
    pub start: usize,
    pub end: usize,
}

impl SourceRange {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// A zero-length range marking an insertion point.
    pub const fn collapsed(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub const fn length(self) -> usize {
        self.end - self.start
    }

    pub const fn is_collapsed(self) -> bool {
        self.start == self.end
    }
}

/// The closed set of rule kinds this engine addresses.
///
/// Both the parsed-tree flattening and the live object-model flattening
/// branch on this one type, so the two sides cannot drift apart on which
/// constructs are listed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleKind {
    Style,
    Import,
    Media,
    Page,
    FontFace,
    Viewport,
    Keyframe,
    Keyframes,
    Supports,
    Unknown,
}

impl RuleKind {
    /// Container kinds are listed in the flat rule list and then recursed into.
    pub const fn is_container(self) -> bool {
        matches!(self, Self::Media | Self::Supports | Self::Keyframes)
    }

    /// Whether the kind appears in the flat rule list at all.
    pub const fn is_addressable(self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Kinds whose body is a declaration block rather than a rule list.
    pub const fn has_declaration_block(self) -> bool {
        matches!(
            self,
            Self::Style | Self::Page | Self::FontFace | Self::Viewport | Self::Keyframe
        )
    }

    /// Kinds that carry a `{ ... }` body in source text.
    pub const fn has_body(self) -> bool {
        !matches!(self, Self::Import | Self::Unknown)
    }
}

/// One declaration observed in a declaration block.
///
/// All offsets are absolute within the buffer the block was parsed from.
/// A `disabled` entry was reconstituted from a `/* name: value; */` comment
/// and its range covers the whole comment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertySourceData {
    pub name: String,
    pub value: String,
    pub important: bool,
    pub disabled: bool,
    pub parsed_ok: bool,
    pub range: SourceRange,
}

/// Declaration-block contents of a rule, in source order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StyleSourceData {
    pub properties: Vec<PropertySourceData>,
}

/// Ranges recorded for one media query: the query itself plus each
/// parenthesized expression inside it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaQuerySourceData {
    pub range: SourceRange,
    pub expressions: SmallVec<SourceRange, 2>,
}

/// Per-query data for a `@media` or `@supports` prelude.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MediaSourceData {
    pub queries: Vec<MediaQuerySourceData>,
}

/// One parsed construct with its source ranges.
///
/// The tree is rebuilt from scratch on every parse of the owning text and
/// is never patched in place; node identity (`Rc` pointer equality) is
/// therefore stable exactly as long as the text is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleSourceData {
    pub kind: RuleKind,
    /// Start of the whole rule, at-keyword included. Equals
    /// `header_range.start` for style rules.
    pub rule_start: usize,
    /// Selector list of a style rule, condition of a media/supports rule,
    /// key list of a keyframe, trailing-whitespace-trimmed.
    pub header_range: SourceRange,
    /// The `{ ... }` body, exclusive of both braces. Collapsed for
    /// block-less rules.
    pub body_range: SourceRange,
    /// Per-selector sub-ranges of the header. Style rules only.
    pub selector_ranges: SmallVec<SourceRange, 2>,
    pub style: Option<StyleSourceData>,
    pub media: Option<MediaSourceData>,
    pub child_rules: Vec<Rc<RuleSourceData>>,
}

impl RuleSourceData {
    pub fn new(kind: RuleKind, rule_start: usize) -> Self {
        Self {
            kind,
            rule_start,
            header_range: SourceRange::collapsed(rule_start),
            body_range: SourceRange::collapsed(rule_start),
            selector_ranges: SmallVec::new(),
            style: None,
            media: None,
            child_rules: Vec::new(),
        }
    }

    /// Full source span of the rule: from the at-keyword (or selector) to
    /// just past the closing brace, or past the terminating semicolon for
    /// block-less rules.
    pub fn whole_range(&self, doc: &str) -> SourceRange {
        let end = if self.kind.has_body() {
            let close = self.body_range.end;
            if doc.as_bytes().get(close) == Some(&b'}') {
                close + 1
            } else {
                close
            }
        } else {
            let bytes = doc.as_bytes();
            let mut cursor = self.header_range.end;
            while bytes.get(cursor).is_some_and(|byte| byte.is_ascii_whitespace()) {
                cursor += 1;
            }
            if bytes.get(cursor) == Some(&b';') {
                cursor + 1
            } else {
                self.header_range.end
            }
        };
        SourceRange::new(self.rule_start, end)
    }
}

/// Depth-first pre-order linearization of a rule tree, restricted to
/// addressable kinds. Containers are listed themselves, then recursed into.
pub fn flatten_rule_list(rules: &[Rc<RuleSourceData>]) -> Vec<Rc<RuleSourceData>> {
    let mut flat = Vec::new();
    collect_flat(rules, &mut flat);
    flat
}

fn collect_flat(rules: &[Rc<RuleSourceData>], flat: &mut Vec<Rc<RuleSourceData>>) {
    for rule in rules {
        if rule.kind.is_addressable() {
            flat.push(Rc::clone(rule));
        }
        if rule.kind.is_container() {
            collect_flat(&rule.child_rules, flat);
        }
    }
}
