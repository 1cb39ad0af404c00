//! Byte-offset ⇄ line/column translation over a single text buffer.

/// A zero-based (line, column) pair. Columns count bytes within the line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextPosition {
    pub line: usize,
    pub column: usize,
}

/// Offsets of every `\n` in a text, plus the text length. Owners build
/// this lazily and discard it whenever their text changes.
#[derive(Clone, Debug)]
pub struct LineIndex {
    endings: Vec<usize>,
    text_len: usize,
}

impl LineIndex {
    pub fn build(text: &str) -> Self {
        let endings = text
            .bytes()
            .enumerate()
            .filter(|(_, byte)| *byte == b'\n')
            .map(|(offset, _)| offset)
            .collect();
        Self {
            endings,
            text_len: text.len(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.endings.len() + 1
    }

    /// None when `offset` lies past the end of the indexed text.
    pub fn offset_to_position(&self, offset: usize) -> Option<TextPosition> {
        if offset > self.text_len {
            return None;
        }
        let line = self.endings.partition_point(|&ending| ending < offset);
        let line_start = if line == 0 {
            0
        } else {
            self.endings[line - 1] + 1
        };
        Some(TextPosition {
            line,
            column: offset - line_start,
        })
    }

    /// None when `line` does not exist or `column` runs past that line's
    /// terminator.
    pub fn position_to_offset(&self, line: usize, column: usize) -> Option<usize> {
        if line >= self.line_count() {
            return None;
        }
        let line_start = if line == 0 {
            0
        } else {
            self.endings[line - 1] + 1
        };
        let line_end = self.endings.get(line).copied().unwrap_or(self.text_len);
        (column <= line_end - line_start).then(|| line_start + column)
    }
}
