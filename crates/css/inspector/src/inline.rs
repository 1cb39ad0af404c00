//! The inline-style specialization of the text model: one implicit
//! declaration block sourced from an element's `style` attribute. No
//! nested rules, no selectors; writes go through the DOM attribute
//! primitive and the single source-data node is re-derived on every
//! attribute change.

use crate::error::{EditError, EditResult};
use crate::position::LineIndex;
use crate::protocol;
use crate::sheet::SheetListener;
use css_om::{ElementHandle, StyleDeclaration};
use css_syntax::{RuleKind, RuleSourceData, SourceRange, parse_declaration_list};
use once_cell::unsync::OnceCell;
use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

pub type InlineEditorHandle = Rc<RefCell<InlineStyleEditor>>;

pub struct InlineStyleEditor {
    id: String,
    element: ElementHandle,
    /// Attribute text the derived source data was built from. The
    /// attribute is script-writable, so reads re-check it first.
    cached_text: String,
    source: Rc<RuleSourceData>,
    line_index: OnceCell<LineIndex>,
    listener: Option<Rc<dyn SheetListener>>,
    changed: bool,
}

impl InlineStyleEditor {
    pub fn new(id: &str, element: ElementHandle) -> Self {
        let text = element.borrow().style_attribute();
        Self {
            id: id.to_owned(),
            element,
            source: Rc::new(derive_source(&text)),
            cached_text: text,
            line_index: OnceCell::new(),
            listener: None,
            changed: false,
        }
    }

    pub fn new_handle(id: &str, element: ElementHandle) -> InlineEditorHandle {
        Rc::new(RefCell::new(Self::new(id, element)))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn element(&self) -> ElementHandle {
        Rc::clone(&self.element)
    }

    pub fn set_listener(&mut self, listener: Option<Rc<dyn SheetListener>>) {
        self.listener = listener;
    }

    pub fn listener(&self) -> Option<Rc<dyn SheetListener>> {
        self.listener.as_ref().map(Rc::clone)
    }

    pub fn take_changed(&mut self) -> bool {
        mem::take(&mut self.changed)
    }

    /// The attribute text. Always available: a missing attribute reads as
    /// empty, there is no read-only inline style.
    pub fn get_text(&mut self) -> String {
        self.refresh();
        self.cached_text.clone()
    }

    /// Write the attribute through the DOM primitive and re-derive the
    /// implicit rule. Returns the previous text.
    pub fn set_text(&mut self, text: &str) -> String {
        let old = self.element.borrow().style_attribute();
        self.element.borrow_mut().set_attribute("style", text);
        self.rebuild(text.to_owned());
        self.changed = true;
        old
    }

    /// The single implicit rule: body spans the whole attribute value.
    pub fn source_data(&mut self) -> Rc<RuleSourceData> {
        self.refresh();
        Rc::clone(&self.source)
    }

    pub fn inline_style(&mut self) -> StyleDeclaration {
        self.refresh();
        StyleDeclaration::parse(&self.cached_text)
    }

    pub fn protocol_range_to_source(
        &mut self,
        range: &protocol::SourceRange,
    ) -> EditResult<SourceRange> {
        self.refresh();
        let index = self
            .line_index
            .get_or_init(|| LineIndex::build(&self.cached_text));
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
        &mut self,
        range: SourceRange,
    ) -> EditResult<protocol::SourceRange> {
        self.refresh();
        let index = self
            .line_index
            .get_or_init(|| LineIndex::build(&self.cached_text));
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

    /// Pick up attribute writes that bypassed this editor.
    fn refresh(&mut self) {
        let current = self.element.borrow().style_attribute();
        if current != self.cached_text {
            self.rebuild(current);
        }
    }

    fn rebuild(&mut self, text: String) {
        self.source = Rc::new(derive_source(&text));
        self.cached_text = text;
        self.line_index = OnceCell::new();
    }
}

fn derive_source(text: &str) -> RuleSourceData {
    let mut data = RuleSourceData::new(RuleKind::Style, 0);
    data.header_range = SourceRange::collapsed(0);
    data.body_range = SourceRange::new(0, text.len());
    data.style = Some(parse_declaration_list(text));
    data
}

/// Inline counterpart of `sheet::notify_if_changed`.
pub fn notify_inline_if_changed(editor: &InlineEditorHandle) {
    let (listener, sheet_id, changed) = {
        let mut inner = editor.borrow_mut();
        (inner.listener(), inner.id().to_owned(), inner.take_changed())
    };
    if changed && let Some(listener) = listener {
        listener.style_sheet_changed(&sheet_id);
    }
}
