//! Rope-backed text buffer consumed by the modal engine.
//!
//! Positions are `(line, col)` pairs where `col` counts chars inside the line
//! (no newline). A buffer whose text ends in `\n` does not expose the empty
//! rope line after that final newline: `"abc\n"` is a single line, exactly as
//! vi presents a file. A `col` equal to the line length addresses the end of
//! the line (the slot where text is appended).
//!
//! Besides plain offset edits the buffer owns a mark table. Marks are opaque
//! [`MarkId`] handles whose offsets are adjusted on every mutation, so higher
//! layers can remember "where insertion started" without holding references
//! into line data. Guarded line ranges are stored as mark pairs and therefore
//! follow edits as well.

use ahash::AHasher;
use anyhow::Result;
use ropey::Rope;
use std::hash::Hasher;
use tracing::trace;

pub mod motion;
pub mod search;
pub mod width;

pub use width::{char_width, vcol_of, vcol_span};

/// A position inside a buffer expressed as (line index, char column within that line).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
    pub const fn origin() -> Self {
        Self { line: 0, col: 0 }
    }
}

/// Opaque handle into the buffer mark table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkId(u32);

/// A text buffer backed by a `ropey::Rope`.
#[derive(Debug, Clone)]
pub struct Buffer {
    rope: Rope,
    pub name: String,
    marks: Vec<Option<usize>>,
    guards: Vec<(MarkId, MarkId)>,
    mutations: u64,
}

impl Buffer {
    /// Construct a buffer from an in-memory string slice.
    pub fn from_str(name: impl Into<String>, content: &str) -> Result<Self> {
        Ok(Self {
            rope: Rope::from_str(content),
            name: name.into(),
            marks: Vec::new(),
            guards: Vec::new(),
            mutations: 0,
        })
    }

    /// Full buffer contents.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Number of mutating calls applied so far. Each `insert_text`,
    /// `delete_range` or `replace_range` (and the line helpers built on them)
    /// counts once.
    pub fn mutations(&self) -> u64 {
        self.mutations
    }

    /// Total number of lines in the buffer (always at least one).
    pub fn line_count(&self) -> usize {
        let n = self.rope.len_lines();
        if n > 1 && self.rope.line(n - 1).len_chars() == 0 {
            n - 1
        } else {
            n
        }
    }

    pub fn has_trailing_newline(&self) -> bool {
        let n = self.rope.len_chars();
        n > 0 && self.rope.char(n - 1) == '\n'
    }

    /// Return the requested line without its newline.
    pub fn line(&self, idx: usize) -> Option<String> {
        if idx >= self.line_count() {
            return None;
        }
        let mut s = self.rope.line(idx).to_string();
        if s.ends_with('\n') {
            s.pop();
        }
        Some(s)
    }

    /// Line text or an empty string when out of range.
    pub fn line_text(&self, idx: usize) -> String {
        self.line(idx).unwrap_or_default()
    }

    /// Char length of a line excluding its newline.
    pub fn line_len(&self, idx: usize) -> usize {
        if idx >= self.line_count() {
            return 0;
        }
        let slice = self.rope.line(idx);
        let n = slice.len_chars();
        if n > 0 && slice.char(n - 1) == '\n' {
            n - 1
        } else {
            n
        }
    }

    pub fn char_at(&self, pos: Position) -> Option<char> {
        if pos.line >= self.line_count() || pos.col >= self.line_len(pos.line) {
            return None;
        }
        Some(self.rope.char(self.line_start(pos.line) + pos.col))
    }

    /// Char offset of the first char of `line`; past the last line this is the buffer length.
    pub fn line_start(&self, line: usize) -> usize {
        if line >= self.rope.len_lines() {
            return self.rope.len_chars();
        }
        self.rope.line_to_char(line)
    }

    /// Char offset of the end of `line` (its newline, or the buffer end).
    pub fn line_end(&self, line: usize) -> usize {
        self.line_start(line) + self.line_len(line)
    }

    /// Offset of a position, clamping the line and column into range.
    pub fn offset_of(&self, pos: Position) -> usize {
        let line = pos.line.min(self.line_count() - 1);
        self.line_start(line) + pos.col.min(self.line_len(line))
    }

    /// Position for an offset. Offsets past the last newline map to the end of the last line.
    pub fn position_of(&self, offset: usize) -> Position {
        let offset = offset.min(self.rope.len_chars());
        let line = self.rope.char_to_line(offset);
        let last = self.line_count() - 1;
        if line > last {
            return Position::new(last, self.line_len(last));
        }
        Position::new(line, offset - self.rope.line_to_char(line))
    }

    /// Text between two offsets.
    pub fn slice(&self, start: usize, end: usize) -> String {
        let len = self.rope.len_chars();
        let (start, end) = (start.min(len), end.min(len));
        if start >= end {
            return String::new();
        }
        self.rope.slice(start..end).to_string()
    }

    pub fn insert_text(&mut self, offset: usize, text: &str) {
        if text.is_empty() {
            return;
        }
        let offset = offset.min(self.rope.len_chars());
        let n = text.chars().count();
        self.rope.insert(offset, text);
        self.shift_marks_insert(offset, n);
        self.mutations += 1;
        trace!(target: "text.buffer", offset, len = n, "insert_text");
    }

    /// Remove `[start, end)` returning the removed text.
    pub fn delete_range(&mut self, start: usize, end: usize) -> String {
        let len = self.rope.len_chars();
        let (start, end) = (start.min(len), end.min(len));
        if start >= end {
            return String::new();
        }
        let removed = self.rope.slice(start..end).to_string();
        self.rope.remove(start..end);
        self.shift_marks_delete(start, end);
        self.mutations += 1;
        trace!(target: "text.buffer", start, end, "delete_range");
        removed
    }

    /// Replace `[start, end)` with `text` as a single mutation.
    pub fn replace_range(&mut self, start: usize, end: usize, text: &str) -> String {
        let len = self.rope.len_chars();
        let (start, end) = (start.min(len), end.min(len).max(start.min(len)));
        let removed = self.rope.slice(start..end).to_string();
        if removed == text {
            return removed;
        }
        if start < end {
            self.rope.remove(start..end);
            self.shift_marks_delete(start, end);
        }
        if !text.is_empty() {
            self.rope.insert(start, text);
            self.shift_marks_insert(start, text.chars().count());
        }
        self.mutations += 1;
        trace!(target: "text.buffer", start, end, new_len = text.len(), "replace_range");
        removed
    }

    /// Replace the contents (newline excluded) of one line.
    pub fn replace_line(&mut self, line: usize, text: &str) {
        let start = self.line_start(line);
        let end = self.line_end(line);
        self.replace_range(start, end, text);
    }

    /// Replace the contents of consecutive lines starting at `first` in one mutation.
    pub fn replace_lines(&mut self, first: usize, texts: &[String]) {
        if texts.is_empty() {
            return;
        }
        let last = first + texts.len() - 1;
        let start = self.line_start(first);
        let end = self.line_end(last);
        self.replace_range(start, end, &texts.join("\n"));
    }

    /// Insert whole lines so the first new line gets index `at`.
    pub fn insert_lines(&mut self, at: usize, lines: &[String]) {
        if lines.is_empty() {
            return;
        }
        let count = self.line_count();
        if at < count {
            let mut text = lines.join("\n");
            text.push('\n');
            let offset = self.line_start(at);
            self.insert_text(offset, &text);
        } else if self.has_trailing_newline() {
            let mut text = lines.join("\n");
            text.push('\n');
            let offset = self.rope.len_chars();
            self.insert_text(offset, &text);
        } else {
            let text = format!("\n{}", lines.join("\n"));
            let offset = self.rope.len_chars();
            self.insert_text(offset, &text);
        }
    }

    /// Delete lines `first..=last` (clamped) including their line breaks.
    pub fn delete_lines(&mut self, first: usize, last: usize) {
        let count = self.line_count();
        if first >= count {
            return;
        }
        let last = last.min(count - 1);
        if first == 0 && last + 1 == count && self.has_trailing_newline() {
            // Every line goes; one empty line stays behind.
            let end = self.rope.len_chars() - 1;
            self.delete_range(0, end);
        } else if last + 1 < count || self.has_trailing_newline() {
            let start = self.line_start(first);
            let end = if last + 1 < count {
                self.line_start(last + 1)
            } else {
                self.rope.len_chars()
            };
            self.delete_range(start, end);
        } else {
            // Final line without newline: take the preceding break instead.
            let start = self.line_start(first).saturating_sub(usize::from(first > 0));
            let end = self.rope.len_chars();
            self.delete_range(start, end);
        }
    }

    /// Lines `first..=last` joined with a trailing newline after each line.
    pub fn lines_text(&self, first: usize, last: usize) -> String {
        let mut out = String::new();
        for l in first..=last.min(self.line_count() - 1) {
            out.push_str(&self.line_text(l));
            out.push('\n');
        }
        out
    }

    /// Stable content hash used by the undo engine to skip no-op steps.
    pub fn content_hash(&self) -> u64 {
        let mut h = AHasher::default();
        for chunk in self.rope.chunks() {
            h.write(chunk.as_bytes());
        }
        h.finish()
    }

    // ---- marks ----

    pub fn create_mark(&mut self, pos: Position) -> MarkId {
        let off = self.offset_of(pos);
        if let Some(idx) = self.marks.iter().position(Option::is_none) {
            self.marks[idx] = Some(off);
            return MarkId(idx as u32);
        }
        self.marks.push(Some(off));
        MarkId((self.marks.len() - 1) as u32)
    }

    pub fn set_mark(&mut self, id: MarkId, pos: Position) {
        let off = self.offset_of(pos);
        if let Some(slot) = self.marks.get_mut(id.0 as usize) {
            *slot = Some(off);
        }
    }

    pub fn mark(&self, id: MarkId) -> Option<Position> {
        self.marks
            .get(id.0 as usize)
            .copied()
            .flatten()
            .map(|off| self.position_of(off))
    }

    pub fn remove_mark(&mut self, id: MarkId) {
        if let Some(slot) = self.marks.get_mut(id.0 as usize) {
            *slot = None;
        }
    }

    fn shift_marks_insert(&mut self, at: usize, n: usize) {
        for off in self.marks.iter_mut().flatten() {
            if *off > at {
                *off += n;
            }
        }
    }

    fn shift_marks_delete(&mut self, start: usize, end: usize) {
        let n = end - start;
        for off in self.marks.iter_mut().flatten() {
            if *off >= end {
                *off -= n;
            } else if *off > start {
                *off = start;
            }
        }
    }

    // ---- guarded regions ----

    /// Protect lines `first..=last` from modification.
    pub fn guard_lines(&mut self, first: usize, last: usize) {
        let last = last.min(self.line_count() - 1);
        let start = self.create_mark(Position::new(first, 0));
        let end = self.create_mark(Position::new(last, self.line_len(last)));
        self.guards.push((start, end));
    }

    pub fn clear_guards(&mut self) {
        for (s, e) in std::mem::take(&mut self.guards) {
            self.remove_mark(s);
            self.remove_mark(e);
        }
    }

    /// First guarded line inside `first..=last`, if any.
    pub fn first_guarded(&self, first: usize, last: usize) -> Option<usize> {
        self.guards
            .iter()
            .filter_map(|(s, e)| {
                let lo = self.mark(*s)?.line.max(first);
                let hi = self.mark(*e)?.line.min(last);
                (lo <= hi).then_some(lo)
            })
            .min()
    }
}
