//! Drives `cssparser` and records source byte ranges for every construct.
//!
//! The grammar work (tokenization, block matching, error recovery) is
//! entirely `cssparser`'s; this module only observes positions through
//! `ParserState` / `SourcePosition` and assembles the `RuleSourceData`
//! tree. Malformed input never fails a parse: sections `cssparser` skips
//! are recorded as `Unknown` spans so the caller still has an addressable
//! range for them.

use crate::source_data::{
    MediaQuerySourceData, MediaSourceData, PropertySourceData, RuleKind, RuleSourceData,
    SourceRange, StyleSourceData,
};
use cssparser::AtRuleParser as CssAtRuleParser;
use cssparser::BasicParseErrorKind;
use cssparser::CowRcStr;
use cssparser::DeclarationParser as CssDeclarationParser;
use cssparser::ParseError;
use cssparser::Parser;
use cssparser::ParserInput;
use cssparser::ParserState;
use cssparser::QualifiedRuleParser as CssQualifiedRuleParser;
use cssparser::RuleBodyItemParser as CssRuleBodyItemParser;
use cssparser::RuleBodyParser as CssRuleBodyParser;
use cssparser::StyleSheetParser;
use cssparser::Token;
use cssparser::match_ignore_ascii_case;
use smallvec::SmallVec;
use std::mem;
use std::rc::Rc;

/// Sentinel appended when a comment body is re-fed through the declaration
/// parser; a comment only toggles into a disabled property if the sentinel
/// survives intact behind it.
const DISABLED_SENTINEL: &str = "-x-toggle-sentinel";

/// Parse stylesheet text into top-level `RuleSourceData` siblings.
/// Nesting is captured via `child_rules`. Never fails: unparseable
/// sections become `Unknown` spans.
pub fn parse_sheet_text(text: &str) -> Vec<Rc<RuleSourceData>> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let mut top = NestedRuleParser {
        text,
        context: BlockContext::Sheet,
    };
    let mut rules = Vec::new();
    for item in StyleSheetParser::new(&mut parser, &mut top) {
        match item {
            Ok(rule) => rules.push(rule),
            Err((error, slice)) => {
                log::trace!("recovering stylesheet parse error: {:?}", error.kind);
                if let Some(range) = subslice_range(text, slice) {
                    rules.push(Rc::new(unknown_rule(range)));
                }
            }
        }
    }
    rules
}

/// Parse a bare declaration list (an element's style attribute, or a
/// comment body under round-trip verification). Offsets are absolute
/// within `text`.
pub fn parse_declaration_list(text: &str) -> StyleSourceData {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let mut properties = scan_declaration_block(text, &mut parser);
    fix_unparsed_property_ranges(text, text.len(), &mut properties);
    StyleSourceData { properties }
}

/// Which kind of block the parser is currently inside; decides what a
/// qualified rule means (style rule vs. keyframe).
#[derive(Clone, Copy, PartialEq, Eq)]
enum BlockContext {
    Sheet,
    GroupBody,
    KeyframesBody,
}

struct NestedRuleParser<'doc> {
    text: &'doc str,
    context: BlockContext,
}

impl NestedRuleParser<'_> {
    fn parse_child_rules(
        &self,
        input: &mut Parser<'_, '_>,
        context: BlockContext,
    ) -> Vec<Rc<RuleSourceData>> {
        let mut nested = NestedRuleParser {
            text: self.text,
            context,
        };
        let mut children = Vec::new();
        for item in CssRuleBodyParser::new(input, &mut nested) {
            match item {
                Ok(rule) => children.push(rule),
                Err((error, slice)) => {
                    log::trace!("recovering nested rule parse error: {:?}", error.kind);
                    if let Some(range) = subslice_range(self.text, slice) {
                        children.push(Rc::new(unknown_rule(range)));
                    }
                }
            }
        }
        children
    }
}

/// Prelude of a qualified rule: the trimmed header plus its
/// comma-separated segment ranges.
struct RulePrelude {
    header: SourceRange,
    segments: SmallVec<SourceRange, 2>,
}

/// Prelude of an at-rule, with media query data when the rule has any.
struct AtPrelude {
    kind: RuleKind,
    header: SourceRange,
    media: Option<MediaSourceData>,
}

impl<'input> CssQualifiedRuleParser<'input> for NestedRuleParser<'_> {
    type Prelude = RulePrelude;
    type QualifiedRule = Rc<RuleSourceData>;
    type Error = ();

    fn parse_prelude<'tok>(
        &mut self,
        input: &mut Parser<'input, 'tok>,
    ) -> Result<Self::Prelude, ParseError<'input, Self::Error>> {
        let (header, segments) = scan_prelude_segments(input);
        Ok(RulePrelude { header, segments })
    }

    fn parse_block<'tok>(
        &mut self,
        prelude: Self::Prelude,
        start: &ParserState,
        input: &mut Parser<'input, 'tok>,
    ) -> Result<Self::QualifiedRule, ParseError<'input, Self::Error>> {
        let body_start = input.position().byte_index();
        let mut properties = scan_declaration_block(self.text, input);
        let body_end = input.position().byte_index();
        fix_unparsed_property_ranges(self.text, body_end, &mut properties);

        let kind = if self.context == BlockContext::KeyframesBody {
            RuleKind::Keyframe
        } else {
            RuleKind::Style
        };
        let mut data = RuleSourceData::new(kind, start.position().byte_index());
        data.header_range = prelude.header;
        if kind == RuleKind::Style {
            data.selector_ranges = prelude.segments;
        }
        data.body_range = SourceRange::new(body_start, body_end);
        data.style = Some(StyleSourceData { properties });
        Ok(Rc::new(data))
    }
}

impl<'input> CssAtRuleParser<'input> for NestedRuleParser<'_> {
    type Prelude = AtPrelude;
    type AtRule = Rc<RuleSourceData>;
    type Error = ();

    fn parse_prelude<'tok>(
        &mut self,
        name: CowRcStr<'input>,
        input: &mut Parser<'input, 'tok>,
    ) -> Result<Self::Prelude, ParseError<'input, Self::Error>> {
        let kind = at_rule_kind(&name);
        match kind {
            RuleKind::Media | RuleKind::Supports => {
                let (header, media) = scan_condition_prelude(input);
                Ok(AtPrelude {
                    kind,
                    header,
                    media: Some(media),
                })
            }
            RuleKind::Unknown => Err(input.new_error(BasicParseErrorKind::AtRuleInvalid(name))),
            _ => {
                let (header, _segments) = scan_prelude_segments(input);
                Ok(AtPrelude {
                    kind,
                    header,
                    media: None,
                })
            }
        }
    }

    fn parse_block<'tok>(
        &mut self,
        prelude: Self::Prelude,
        start: &ParserState,
        input: &mut Parser<'input, 'tok>,
    ) -> Result<Self::AtRule, ParseError<'input, Self::Error>> {
        let body_start = input.position().byte_index();
        let mut data = RuleSourceData::new(prelude.kind, start.position().byte_index());
        data.header_range = prelude.header;
        data.media = prelude.media;
        match prelude.kind {
            RuleKind::Media | RuleKind::Supports => {
                data.child_rules = self.parse_child_rules(input, BlockContext::GroupBody);
            }
            RuleKind::Keyframes => {
                data.child_rules = self.parse_child_rules(input, BlockContext::KeyframesBody);
            }
            RuleKind::Page | RuleKind::FontFace | RuleKind::Viewport => {
                let mut properties = scan_declaration_block(self.text, input);
                let scan_end = input.position().byte_index();
                fix_unparsed_property_ranges(self.text, scan_end, &mut properties);
                data.style = Some(StyleSourceData { properties });
            }
            _ => return Err(input.new_error(BasicParseErrorKind::AtRuleBodyInvalid)),
        }
        data.body_range = SourceRange::new(body_start, input.position().byte_index());
        Ok(Rc::new(data))
    }

    fn rule_without_block(
        &mut self,
        prelude: Self::Prelude,
        start: &ParserState,
    ) -> Result<Self::AtRule, Self::Error> {
        if prelude.kind == RuleKind::Import {
            let mut data = RuleSourceData::new(RuleKind::Import, start.position().byte_index());
            data.header_range = prelude.header;
            data.body_range = SourceRange::collapsed(prelude.header.end);
            Ok(Rc::new(data))
        } else {
            Err(())
        }
    }
}

/// Required by `RuleBodyParser`; nested rule contexts never yield bare
/// declarations, those are handled by `scan_declaration_block`.
impl<'input> CssDeclarationParser<'input> for NestedRuleParser<'_> {
    type Declaration = Rc<RuleSourceData>;
    type Error = ();

    fn parse_value<'tok>(
        &mut self,
        _name: CowRcStr<'input>,
        input: &mut Parser<'input, 'tok>,
        _decl_start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'input, Self::Error>> {
        Err(input.new_custom_error(()))
    }
}

impl CssRuleBodyItemParser<'_, Rc<RuleSourceData>, ()> for NestedRuleParser<'_> {
    fn parse_declarations(&self) -> bool {
        false
    }
    fn parse_qualified(&self) -> bool {
        true
    }
}

fn at_rule_kind(name: &str) -> RuleKind {
    match_ignore_ascii_case! { name,
        "media" => RuleKind::Media,
        "supports" => RuleKind::Supports,
        "keyframes" | "-webkit-keyframes" => RuleKind::Keyframes,
        "import" => RuleKind::Import,
        "page" => RuleKind::Page,
        "font-face" => RuleKind::FontFace,
        "viewport" | "-ms-viewport" => RuleKind::Viewport,
        _ => RuleKind::Unknown,
    }
}

fn unknown_rule(range: SourceRange) -> RuleSourceData {
    let mut data = RuleSourceData::new(RuleKind::Unknown, range.start);
    data.header_range = range;
    data.body_range = SourceRange::collapsed(range.end);
    data
}

fn token_opens_block(token: &Token<'_>) -> bool {
    matches!(
        token,
        Token::Function(_)
            | Token::ParenthesisBlock
            | Token::SquareBracketBlock
            | Token::CurlyBracketBlock
    )
}

/// Consume a block's contents so the parser position lands just past its
/// closing delimiter.
fn skip_block(input: &mut Parser<'_, '_>) {
    let drained: Result<(), ParseError<'_, ()>> = input.parse_nested_block(|block| {
        while block.next_including_whitespace_and_comments().is_ok() {}
        Ok(())
    });
    debug_assert!(drained.is_ok(), "draining a balanced block cannot fail");
}

/// Scan a delimited prelude, returning the trimmed header range and the
/// ranges of its top-level comma-separated segments.
fn scan_prelude_segments(input: &mut Parser<'_, '_>) -> (SourceRange, SmallVec<SourceRange, 2>) {
    let mut segments: SmallVec<SourceRange, 2> = SmallVec::new();
    let mut header_start: Option<usize> = None;
    let mut segment_start: Option<usize> = None;
    let mut last_end = input.position().byte_index();
    loop {
        let before = input.position().byte_index();
        let token = match input.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        match token {
            Token::WhiteSpace(_) => {}
            Token::Comma => {
                if let Some(start) = segment_start.take() {
                    segments.push(SourceRange::new(start, last_end));
                }
            }
            _ => {
                if token_opens_block(&token) {
                    skip_block(input);
                }
                last_end = input.position().byte_index();
                if header_start.is_none() {
                    header_start = Some(before);
                }
                if segment_start.is_none() {
                    segment_start = Some(before);
                }
            }
        }
    }
    if let Some(start) = segment_start {
        segments.push(SourceRange::new(start, last_end));
    }
    let start = header_start.unwrap_or(last_end);
    (SourceRange::new(start, last_end.max(start)), segments)
}

/// Scan a `@media`/`@supports` prelude, recording per-query ranges and the
/// parenthesized expression ranges within each query.
fn scan_condition_prelude(input: &mut Parser<'_, '_>) -> (SourceRange, MediaSourceData) {
    let mut queries = Vec::new();
    let mut expressions: SmallVec<SourceRange, 2> = SmallVec::new();
    let mut header_start: Option<usize> = None;
    let mut query_start: Option<usize> = None;
    let mut last_end = input.position().byte_index();
    loop {
        let before = input.position().byte_index();
        let token = match input.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        match token {
            Token::WhiteSpace(_) => {}
            Token::Comma => {
                if let Some(start) = query_start.take() {
                    queries.push(MediaQuerySourceData {
                        range: SourceRange::new(start, last_end),
                        expressions: mem::take(&mut expressions),
                    });
                }
            }
            _ => {
                if token_opens_block(&token) {
                    skip_block(input);
                    if matches!(token, Token::ParenthesisBlock) {
                        expressions
                            .push(SourceRange::new(before, input.position().byte_index()));
                    }
                }
                last_end = input.position().byte_index();
                if header_start.is_none() {
                    header_start = Some(before);
                }
                if query_start.is_none() {
                    query_start = Some(before);
                }
            }
        }
    }
    if let Some(start) = query_start {
        queries.push(MediaQuerySourceData {
            range: SourceRange::new(start, last_end),
            expressions,
        });
    }
    let start = header_start.unwrap_or(last_end);
    (
        SourceRange::new(start, last_end.max(start)),
        MediaSourceData { queries },
    )
}

/// Scan a declaration block, observing declarations, malformed items and
/// comments. `doc` is the buffer `input` was created over; all recorded
/// offsets are absolute within it.
fn scan_declaration_block(doc: &str, input: &mut Parser<'_, '_>) -> Vec<PropertySourceData> {
    let mut properties = Vec::new();
    loop {
        let item_start = input.position().byte_index();
        let token = match input.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        match token {
            Token::WhiteSpace(_) | Token::Semicolon => {}
            Token::Comment(_) => {
                let range = SourceRange::new(item_start, input.position().byte_index());
                observe_comment(doc, range, &mut properties);
            }
            Token::Ident(name) => {
                let lowered = name.to_ascii_lowercase();
                scan_declaration_tail(doc, input, item_start, lowered, &mut properties);
            }
            _ => {
                // Not a declaration start. Record the failure point and
                // resynchronize at the next top-level semicolon; the
                // post-pass widens the range to the real end.
                if token_opens_block(&token) {
                    skip_block(input);
                }
                let failure_end = input.position().byte_index();
                consume_to_semicolon(input);
                properties.push(PropertySourceData {
                    name: doc[item_start..failure_end].trim().to_owned(),
                    value: String::new(),
                    important: false,
                    disabled: false,
                    parsed_ok: false,
                    range: SourceRange::new(item_start, failure_end),
                });
            }
        }
    }
    properties
}

fn scan_declaration_tail(
    doc: &str,
    input: &mut Parser<'_, '_>,
    decl_start: usize,
    name: String,
    out: &mut Vec<PropertySourceData>,
) {
    if input.try_parse(Parser::expect_colon).is_err() {
        let failure_end = input.position().byte_index();
        consume_to_semicolon(input);
        out.push(PropertySourceData {
            name,
            value: String::new(),
            important: false,
            disabled: false,
            parsed_ok: false,
            range: SourceRange::new(decl_start, failure_end),
        });
        return;
    }
    input.skip_whitespace();
    let value_start = input.position().byte_index();
    let mut value_end = value_start;
    let mut terminated = false;
    let mut saw_bad_token = false;
    loop {
        let token = match input.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        match token {
            Token::Semicolon => {
                terminated = true;
                break;
            }
            Token::WhiteSpace(_) => {}
            _ => {
                if matches!(token, Token::BadString(_) | Token::BadUrl(_)) {
                    saw_bad_token = true;
                }
                if token_opens_block(&token) {
                    skip_block(input);
                }
                value_end = input.position().byte_index();
            }
        }
    }
    let raw_value = doc[value_start..value_end].trim_end();
    let (value, important) = split_important_tail(raw_value);
    let end = if terminated {
        input.position().byte_index()
    } else {
        value_end
    };
    let parsed_ok = !value.is_empty() && !saw_bad_token;
    out.push(PropertySourceData {
        name,
        value,
        important,
        disabled: false,
        parsed_ok,
        range: SourceRange::new(decl_start, end),
    });
}

fn consume_to_semicolon(input: &mut Parser<'_, '_>) {
    while let Ok(token) = input.next_including_whitespace() {
        if matches!(token, Token::Semicolon) {
            break;
        }
    }
}

/// Parse `!important` off the end of a raw value, returning
/// (`value_without_important`, `important_flag`).
fn split_important_tail(raw: &str) -> (String, bool) {
    let trimmed = raw.trim();
    if let Some(bang) = trimmed.rfind('!')
        && trimmed[bang + 1..].trim().eq_ignore_ascii_case("important")
    {
        return (trimmed[..bang].trim_end().to_owned(), true);
    }
    (trimmed.to_owned(), false)
}

/// A comment of the exact shape `/* name: value; */` that round-trips
/// through the declaration parser (one declaration, sentinel intact behind
/// it) is surfaced as a disabled property spanning the whole comment.
/// Anything else is a plain comment and is dropped.
fn observe_comment(doc: &str, range: SourceRange, out: &mut Vec<PropertySourceData>) {
    let body = &doc[range.start..range.end];
    let Some(inner) = body
        .strip_prefix("/*")
        .and_then(|rest| rest.strip_suffix("*/"))
    else {
        return;
    };
    if inner.contains("/*") {
        return;
    }
    let probe = format!("{} {DISABLED_SENTINEL}: none;", inner.trim());
    let parsed = parse_declaration_list(&probe);
    if parsed.properties.len() != 2 {
        return;
    }
    let sentinel = &parsed.properties[1];
    if sentinel.name != DISABLED_SENTINEL
        || sentinel.value != "none"
        || !sentinel.parsed_ok
        || sentinel.disabled
    {
        return;
    }
    let candidate = &parsed.properties[0];
    if !candidate.parsed_ok || candidate.disabled {
        return;
    }
    out.push(PropertySourceData {
        name: candidate.name.clone(),
        value: candidate.value.clone(),
        important: candidate.important,
        disabled: true,
        parsed_ok: true,
        range,
    });
}

/// Widen the ranges of declarations that failed to parse: the true end of
/// a malformed declaration is just before the next declaration's start
/// (or the body end), backed over trailing whitespace. The value text is
/// recomputed from the corrected range.
fn fix_unparsed_property_ranges(
    doc: &str,
    body_end: usize,
    properties: &mut [PropertySourceData],
) {
    let count = properties.len();
    let bytes = doc.as_bytes();
    for idx in 0..count {
        if properties[idx].parsed_ok || properties[idx].disabled {
            continue;
        }
        let limit = properties
            .get(idx + 1)
            .map_or(body_end, |next| next.range.start);
        let mut end = limit;
        while end > properties[idx].range.start && bytes[end - 1].is_ascii_whitespace() {
            end -= 1;
        }
        if end <= properties[idx].range.start {
            continue;
        }
        let entry = &mut properties[idx];
        entry.range.end = end;
        let raw = &doc[entry.range.start..end];
        if let Some(colon) = raw.find(':') {
            entry.value = raw[colon + 1..]
                .trim()
                .trim_end_matches(';')
                .trim_end()
                .to_owned();
        }
    }
}

/// Byte range of `part` within `doc`, when `part` is a subslice of it.
fn subslice_range(doc: &str, part: &str) -> Option<SourceRange> {
    let offset = (part.as_ptr() as usize).checked_sub(doc.as_ptr() as usize)?;
    (offset + part.len() <= doc.len())
        .then(|| SourceRange::new(offset, offset + part.len()))
}
