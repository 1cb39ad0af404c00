//! The style-sheet text model: owns the authoritative text and the parsed
//! source-data tree, holds a handle to the live stylesheet, and keeps the
//! three consistent across range-addressed edits.
//!
//! The live sheet can drift (script mutates it between edits), so no
//! correspondence is trusted until re-validated: lookups snapshot the live
//! flat rule list, re-diff when identity or length changed, and re-check
//! canonical text before returning a mapping.

use crate::canonical::{IndexMapping, align_canonical, canonical_rule_text};
use crate::error::{EditError, EditResult};
use crate::position::LineIndex;
use crate::protocol;
use css_om::{
    OmError, RuleHandle, SheetHandle, build_rule_list, delete_child_rule, flatten_rules,
    insert_child_rule,
};
use css_syntax::{
    RuleKind, RuleSourceData, SourceRange, flatten_rule_list, parse_sheet_text,
};
use once_cell::unsync::OnceCell;
use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

/// Sentinel property used by round-trip verification: candidate text is
/// wrapped in a minimal synthetic stylesheet with a trailing sentinel,
/// and the edit is rejected unless the sentinel survives parsing intact.
const VERIFY_SENTINEL: &str = "-x-verify-sentinel";

/// Notified after an editor finishes a mutation. Fired only once the
/// internal rebuild is complete, so a reentrant query from the callback
/// observes fresh state.
pub trait SheetListener {
    fn style_sheet_changed(&self, sheet_id: &str);
}

pub type EditorHandle = Rc<RefCell<StyleSheetEditor>>;

/// Which construct of a rule an edit replaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleEdit {
    Selector,
    StyleText,
    MediaText,
    KeyframeKey,
}

impl RuleEdit {
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Selector => "selector",
            Self::StyleText => "style-text",
            Self::MediaText => "media-text",
            Self::KeyframeKey => "keyframe-key",
        }
    }
}

/// Result of a successful range edit.
#[derive(Clone, Debug)]
pub struct EditOutcome {
    pub rule: RuleHandle,
    pub new_range: SourceRange,
    pub old_text: String,
}

/// Cached correspondence between the live flat rule list and the parsed
/// one. Valid until the live list's length or element identity changes.
struct SyncState {
    snapshot: Vec<RuleHandle>,
    mapping: IndexMapping,
}

pub struct StyleSheetEditor {
    id: String,
    sheet: SheetHandle,
    text: Option<String>,
    source_tree: Vec<Rc<RuleSourceData>>,
    source_flat: Vec<Rc<RuleSourceData>>,
    /// Detached rule objects built from the authoritative text; index i
    /// corresponds to `source_flat[i]`.
    parsed_flat: Vec<RuleHandle>,
    parsed_canonical: Vec<String>,
    line_index: OnceCell<LineIndex>,
    sync: Option<SyncState>,
    listener: Option<Rc<dyn SheetListener>>,
    changed: bool,
}

impl StyleSheetEditor {
    /// Bind a live sheet whose source text is unavailable (e.g. an
    /// origin-restricted resource). Range edits fail with `ReadOnly`
    /// until `set_text` provides content.
    pub fn new(id: &str, sheet: SheetHandle) -> Self {
        Self {
            id: id.to_owned(),
            sheet,
            text: None,
            source_tree: Vec::new(),
            source_flat: Vec::new(),
            parsed_flat: Vec::new(),
            parsed_canonical: Vec::new(),
            line_index: OnceCell::new(),
            sync: None,
            listener: None,
            changed: false,
        }
    }

    /// Bind a live sheet together with its known source text. The live
    /// sheet is left untouched; correspondence is established lazily by
    /// the diff.
    pub fn with_text(id: &str, sheet: SheetHandle, text: &str) -> Self {
        let mut editor = Self::new(id, sheet);
        editor.text = Some(text.to_owned());
        editor.reparse();
        editor
    }

    pub fn new_handle(id: &str, sheet: SheetHandle, text: Option<&str>) -> EditorHandle {
        let editor = match text {
            Some(text) => Self::with_text(id, sheet, text),
            None => Self::new(id, sheet),
        };
        Rc::new(RefCell::new(editor))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sheet(&self) -> SheetHandle {
        Rc::clone(&self.sheet)
    }

    pub fn set_listener(&mut self, listener: Option<Rc<dyn SheetListener>>) {
        self.listener = listener;
    }

    pub fn listener(&self) -> Option<Rc<dyn SheetListener>> {
        self.listener.as_ref().map(Rc::clone)
    }

    /// Whether a mutation happened since the last `take_changed`.
    pub fn take_changed(&mut self) -> bool {
        mem::take(&mut self.changed)
    }

    pub fn get_text(&self) -> EditResult<&str> {
        self.text.as_deref().ok_or(EditError::ReadOnly)
    }

    /// The flattened parse of the current text, for range discovery.
    pub fn flat_source(&self) -> &[Rc<RuleSourceData>] {
        &self.source_flat
    }

    /// Replace the whole text: full reparse, full reapply to the live
    /// sheet, all caches invalidated. The parse pipeline accepts any
    /// input, so this cannot fail on content.
    pub fn set_text(&mut self, text: &str) {
        self.text = Some(text.to_owned());
        self.reparse();
        self.sheet.borrow_mut().replace_text(text);
        self.sync = None;
        self.changed = true;
    }

    /// Replace the selector list, declaration block, media condition or
    /// keyframe key addressed by `range`. The range must exactly equal
    /// the construct's recorded range; clients obtain it from a prior
    /// read. Verification happens strictly before any mutation.
    pub fn modify_rule(
        &mut self,
        edit: RuleEdit,
        range: SourceRange,
        new_text: &str,
    ) -> EditResult<EditOutcome> {
        let text = self.get_text()?.to_owned();
        self.check_range(range)?;

        let located = self
            .source_flat
            .iter()
            .find(|data| match edit {
                RuleEdit::Selector => {
                    data.kind == RuleKind::Style && data.header_range == range
                }
                RuleEdit::StyleText => {
                    matches!(data.kind, RuleKind::Style | RuleKind::Keyframe)
                        && data.body_range == range
                }
                RuleEdit::MediaText => {
                    data.kind == RuleKind::Media && data.header_range == range
                }
                RuleEdit::KeyframeKey => {
                    data.kind == RuleKind::Keyframe && data.header_range == range
                }
            })
            .map(Rc::clone)
            .ok_or(EditError::NotFound)?;

        let verified = match edit {
            RuleEdit::Selector => verify_selector_text(new_text),
            RuleEdit::StyleText => verify_style_text(new_text),
            RuleEdit::MediaText => verify_media_text(new_text),
            RuleEdit::KeyframeKey => verify_keyframe_key(new_text),
        };
        if !verified {
            return Err(EditError::SyntaxError);
        }

        let rule = self.rule_for_source_data(&located).ok_or(EditError::NotFound)?;
        let applied = {
            let mut live = rule.borrow_mut();
            match edit {
                RuleEdit::Selector => live.set_selector_text(new_text),
                RuleEdit::StyleText => live
                    .style_mut()
                    .map(|style| style.set_css_text(new_text))
                    .is_some(),
                RuleEdit::MediaText => live.set_condition_text(new_text),
                RuleEdit::KeyframeKey => live.set_key_text(new_text),
            }
        };
        if !applied {
            return Err(EditError::NotFound);
        }

        let old_text = text[range.start..range.end].to_owned();
        self.splice(range, new_text);
        Ok(EditOutcome {
            rule,
            new_range: SourceRange::new(range.start, range.start + new_text.len()),
            old_text,
        })
    }

    pub fn set_rule_selector(
        &mut self,
        range: SourceRange,
        selector: &str,
    ) -> EditResult<EditOutcome> {
        self.modify_rule(RuleEdit::Selector, range, selector)
    }

    pub fn set_style_text(&mut self, range: SourceRange, text: &str) -> EditResult<EditOutcome> {
        self.modify_rule(RuleEdit::StyleText, range, text)
    }

    pub fn set_media_rule_text(
        &mut self,
        range: SourceRange,
        condition: &str,
    ) -> EditResult<EditOutcome> {
        self.modify_rule(RuleEdit::MediaText, range, condition)
    }

    pub fn set_keyframe_key(&mut self, range: SourceRange, key: &str) -> EditResult<EditOutcome> {
        self.modify_rule(RuleEdit::KeyframeKey, range, key)
    }

    /// Insert a new rule at a collapsed location. The rule lands in the
    /// innermost group rule whose body contains the insertion point
    /// (smallest body wins on nesting), or at the sheet's top level.
    pub fn add_rule(&mut self, rule_text: &str, location: SourceRange) -> EditResult<EditOutcome> {
        let text = self.get_text()?.to_owned();
        if !location.is_collapsed() {
            return Err(EditError::InvalidRange);
        }
        let offset = location.start;
        if offset > text.len() {
            return Err(EditError::OutOfBounds);
        }
        if !verify_rule_text(rule_text) {
            return Err(EditError::SyntaxError);
        }

        // A point between a rule's header start and its body start is not
        // insertable (it would split the selector or condition).
        let inside_header = self.source_flat.iter().any(|data| {
            data.rule_start < offset && offset <= data.body_range.start
        });
        if inside_header {
            return Err(EditError::NotFound);
        }

        // Innermost rule whose body contains the point; nesting resolves
        // by smallest body. Only group rules accept insertions.
        let container = self
            .source_flat
            .iter()
            .filter(|data| data.body_range.start < offset && offset <= data.body_range.end)
            .min_by_key(|data| data.body_range.length())
            .map(Rc::clone);

        let rule = match container {
            Some(parent) if matches!(parent.kind, RuleKind::Media | RuleKind::Supports) => {
                let parent_rule =
                    self.rule_for_source_data(&parent).ok_or(EditError::NotFound)?;
                let index = live_child_index(&parent.child_rules, offset);
                let mut live = parent_rule.borrow_mut();
                insert_child_rule(&mut live, rule_text, index).map_err(om_error)?
            }
            Some(_) => return Err(EditError::NotFound),
            None => {
                let index = live_child_index(&self.source_tree, offset);
                self.sheet
                    .borrow_mut()
                    .insert_rule(rule_text, index)
                    .map_err(om_error)?
            }
        };

        self.splice(SourceRange::collapsed(offset), rule_text);
        Ok(EditOutcome {
            rule,
            new_range: SourceRange::new(offset, offset + rule_text.len()),
            old_text: String::new(),
        })
    }

    /// Delete the rule whose whole span (header through closing brace)
    /// falls inside `range`. When a container and its children all
    /// qualify, the container wins; any other multiple match is
    /// ambiguous and fails.
    pub fn delete_rule(&mut self, range: SourceRange) -> EditResult<()> {
        let text = self.get_text()?.to_owned();
        self.check_range(range)?;

        let candidates: Vec<Rc<RuleSourceData>> = self
            .source_flat
            .iter()
            .filter(|data| {
                let whole = data.whole_range(&text);
                range.start <= whole.start && whole.end <= range.end
            })
            .map(Rc::clone)
            .collect();
        let target = match candidates.as_slice() {
            [] => return Err(EditError::NotFound),
            [single] => Rc::clone(single),
            several => several
                .iter()
                .find(|candidate| {
                    let span = candidate.whole_range(&text);
                    several.iter().all(|other| {
                        let inner = other.whole_range(&text);
                        span.start <= inner.start && inner.end <= span.end
                    })
                })
                .map(Rc::clone)
                .ok_or(EditError::NotFound)?,
        };

        let (parent, index) =
            locate_owner(&self.source_tree, None, &target).ok_or(EditError::NotFound)?;
        match parent {
            Some(container) => {
                let container_rule =
                    self.rule_for_source_data(&container).ok_or(EditError::NotFound)?;
                let mut live = container_rule.borrow_mut();
                delete_child_rule(&mut live, index).map_err(om_error)?;
            }
            None => {
                self.sheet.borrow_mut().delete_rule(index).map_err(om_error)?;
            }
        }

        let whole = target.whole_range(&text);
        self.splice(whole, "");
        Ok(())
    }

    /// Live rule for a parsed node, via the (lazily recomputed) index
    /// maps. The candidate's canonical text is re-checked before it is
    /// trusted, guarding against a same-position content swap the length
    /// check cannot see.
    pub fn rule_for_source_data(&mut self, data: &Rc<RuleSourceData>) -> Option<RuleHandle> {
        self.ensure_sync();
        let source_index = self
            .source_flat
            .iter()
            .position(|entry| Rc::ptr_eq(entry, data))?;
        let sync = self.sync.as_ref()?;
        let live_index = sync.mapping.right_to_left[source_index]?;
        let candidate = &sync.snapshot[live_index];
        let expected = self.parsed_canonical.get(source_index)?;
        if canonical_rule_text(&candidate.borrow()) != *expected {
            return None;
        }
        Some(Rc::clone(candidate))
    }

    /// Parsed node for a live rule; symmetric to `rule_for_source_data`.
    pub fn source_data_for_rule(&mut self, rule: &RuleHandle) -> Option<Rc<RuleSourceData>> {
        self.ensure_sync();
        let sync = self.sync.as_ref()?;
        let live_index = sync
            .snapshot
            .iter()
            .position(|entry| Rc::ptr_eq(entry, rule))?;
        let source_index = sync.mapping.left_to_right[live_index]?;
        let expected = self.parsed_canonical.get(source_index)?;
        if canonical_rule_text(&rule.borrow()) != *expected {
            return None;
        }
        self.source_flat.get(source_index).map(Rc::clone)
    }

    pub fn protocol_range_to_source(
        &self,
        range: &protocol::SourceRange,
    ) -> EditResult<SourceRange> {
        let index = self.line_index()?;
        let start = index
            .position_to_offset(range.start_line as usize, range.start_column as usize)
            .ok_or(EditError::OutOfBounds)?;
        let end = index
            .position_to_offset(range.end_line as usize, range.end_column as usize)
            .ok_or(EditError::OutOfBounds)?;
        (start <= end)
            .then(|| SourceRange::new(start, end))
            .ok_or(EditError::InvalidRange)
    }

    pub fn source_range_to_protocol(
        &self,
        range: SourceRange,
    ) -> EditResult<protocol::SourceRange> {
        let index = self.line_index()?;
        let start = index
            .offset_to_position(range.start)
            .ok_or(EditError::OutOfBounds)?;
        let end = index
            .offset_to_position(range.end)
            .ok_or(EditError::OutOfBounds)?;
        Ok(protocol::SourceRange {
            start_line: start.line as u32,
            start_column: start.column as u32,
            end_line: end.line as u32,
            end_column: end.column as u32,
        })
    }

    fn line_index(&self) -> EditResult<&LineIndex> {
        let text = self.text.as_deref().ok_or(EditError::ReadOnly)?;
        Ok(self.line_index.get_or_init(|| LineIndex::build(text)))
    }

    fn check_range(&self, range: SourceRange) -> EditResult<()> {
        if range.start > range.end {
            return Err(EditError::InvalidRange);
        }
        let text = self.get_text()?;
        if range.end > text.len() {
            return Err(EditError::OutOfBounds);
        }
        Ok(())
    }

    /// Textual replacement plus the full rebuild that must complete
    /// before anyone observes the change: reparse, rebuild the flattened
    /// tree and detached rules, invalidate the index maps.
    fn splice(&mut self, range: SourceRange, replacement: &str) {
        if let Some(text) = self.text.as_mut() {
            text.replace_range(range.start..range.end, replacement);
        }
        self.reparse();
        self.changed = true;
    }

    fn reparse(&mut self) {
        let text = self.text.as_deref().unwrap_or("");
        self.source_tree = parse_sheet_text(text);
        self.source_flat = flatten_rule_list(&self.source_tree);
        let built = build_rule_list(text, &self.source_tree);
        self.parsed_flat = flatten_rules(&built);
        debug_assert_eq!(
            self.parsed_flat.len(),
            self.source_flat.len(),
            "parsed flat list and source flat list must stay in lockstep"
        );
        self.parsed_canonical = self
            .parsed_flat
            .iter()
            .map(|rule| canonical_rule_text(&rule.borrow()))
            .collect();
        self.line_index = OnceCell::new();
        self.sync = None;
    }

    /// Rebuild the index maps when the live flat list drifted from the
    /// remembered snapshot. The cheap identity/length check runs first;
    /// the full diff only when it fails.
    fn ensure_sync(&mut self) {
        let live = {
            let sheet = self.sheet.borrow();
            flatten_rules(sheet.rules())
        };
        let fresh = match &self.sync {
            None => true,
            Some(state) => {
                state.snapshot.len() != live.len()
                    || state
                        .snapshot
                        .iter()
                        .zip(&live)
                        .any(|(old, new)| !Rc::ptr_eq(old, new))
            }
        };
        if !fresh {
            return;
        }
        log::trace!(
            "sheet {}: re-aligning {} live rules against {} parsed rules",
            self.id,
            live.len(),
            self.parsed_canonical.len()
        );
        let live_canonical: Vec<String> = live
            .iter()
            .map(|rule| canonical_rule_text(&rule.borrow()))
            .collect();
        let mapping = align_canonical(&live_canonical, &self.parsed_canonical);
        self.sync = Some(SyncState {
            snapshot: live,
            mapping,
        });
    }
}

/// Fire the change listener, outside any editor borrow, once a mutation's
/// internal rebuild has completed.
pub fn notify_if_changed(editor: &EditorHandle) {
    let (listener, sheet_id, changed) = {
        let mut inner = editor.borrow_mut();
        (inner.listener(), inner.id().to_owned(), inner.take_changed())
    };
    if changed && let Some(listener) = listener {
        listener.style_sheet_changed(&sheet_id);
    }
}

fn om_error(error: OmError) -> EditError {
    match error {
        OmError::IndexSize => EditError::NotFound,
        OmError::Syntax => EditError::SyntaxError,
    }
}

/// Index the live object model would use for a child inserted at
/// `offset`: the number of preceding siblings that exist in the object
/// model at all.
fn live_child_index(children: &[Rc<RuleSourceData>], offset: usize) -> usize {
    children
        .iter()
        .filter(|child| child.kind.is_addressable() && child.rule_start < offset)
        .count()
}

/// Find the container owning `target` and the target's live child index
/// within it. `None` parent means the sheet's top level.
fn locate_owner(
    list: &[Rc<RuleSourceData>],
    parent: Option<&Rc<RuleSourceData>>,
    target: &Rc<RuleSourceData>,
) -> Option<(Option<Rc<RuleSourceData>>, usize)> {
    let mut live_index = 0;
    for entry in list {
        if Rc::ptr_eq(entry, target) {
            return Some((parent.map(Rc::clone), live_index));
        }
        if entry.kind.is_addressable() {
            live_index += 1;
        }
        if entry.kind.is_container()
            && let Some(found) = locate_owner(&entry.child_rules, Some(entry), target)
        {
            return Some(found);
        }
    }
    None
}

fn verify_sentinel_rule(data: &RuleSourceData) -> bool {
    if data.kind != RuleKind::Style {
        return false;
    }
    let Some(style) = data.style.as_ref() else {
        return false;
    };
    style.properties.len() == 1
        && style.properties.first().is_some_and(|property| {
            property.name == VERIFY_SENTINEL && property.parsed_ok && !property.disabled
        })
}

/// A selector list is valid when `selector { sentinel }` parses to exactly
/// one style rule whose declaration block is exactly the intact sentinel.
fn verify_selector_text(selector: &str) -> bool {
    let probe = format!("{selector} {{ {VERIFY_SENTINEL}: none; }}");
    let rules = parse_sheet_text(&probe);
    match rules.as_slice() {
        [rule] => verify_sentinel_rule(rule) && !rule.selector_ranges.is_empty(),
        _ => false,
    }
}

/// Rule text is valid when appending a sentinel rule yields exactly two
/// rules with the sentinel intact at the tail — anything that swallows or
/// splits its neighbors (unbalanced braces, open comments, open strings)
/// fails this even though the parser recovered without error.
fn verify_rule_text(rule_text: &str) -> bool {
    let probe = format!("{rule_text} div {{ {VERIFY_SENTINEL}: none; }}");
    let rules = parse_sheet_text(&probe);
    match rules.as_slice() {
        [candidate, sentinel] => {
            candidate.kind == RuleKind::Style
                && candidate.style.is_some()
                && verify_sentinel_rule(sentinel)
        }
        _ => false,
    }
}

fn verify_style_text(text: &str) -> bool {
    let probe = format!("div {{{text}}} div {{ {VERIFY_SENTINEL}: none; }}");
    let rules = parse_sheet_text(&probe);
    match rules.as_slice() {
        [candidate, sentinel] => {
            candidate.kind == RuleKind::Style && verify_sentinel_rule(sentinel)
        }
        _ => false,
    }
}

fn verify_media_text(condition: &str) -> bool {
    let probe = format!("@media {condition} {{ div {{ {VERIFY_SENTINEL}: none; }} }}");
    let rules = parse_sheet_text(&probe);
    match rules.as_slice() {
        [rule] => {
            rule.kind == RuleKind::Media
                && rule.media.is_some()
                && matches!(rule.child_rules.as_slice(), [child] if verify_sentinel_rule(child))
        }
        _ => false,
    }
}

fn verify_keyframe_key(key: &str) -> bool {
    let probe = format!("@keyframes verify-anim {{ {key} {{ {VERIFY_SENTINEL}: none; }} }}");
    let rules = parse_sheet_text(&probe);
    match rules.as_slice() {
        [rule] => {
            rule.kind == RuleKind::Keyframes
                && matches!(
                    rule.child_rules.as_slice(),
                    [child] if child.kind == RuleKind::Keyframe
                        && child.style.as_ref().is_some_and(|style| {
                            style.properties.len() == 1
                                && style.properties[0].name == VERIFY_SENTINEL
                                && style.properties[0].parsed_ok
                        })
                )
        }
        _ => false,
    }
}
