//! Editor context: the buffer, cursor, registers, undo history and options a
//! command operates on.
//!
//! The modal engine never reaches for global state; every operation receives an
//! `&mut EditorContext`. Marks are stored as opaque buffer handles so they
//! follow edits without anybody holding references into line data.

use core_config::Options;
use core_text::{Buffer, MarkId, Position, width};
use std::collections::HashMap;
use tracing::trace;

pub mod registers;
pub mod undo;

pub use registers::{RegisterError, RegisterKind, RegisterStore, Yankreg};
pub use undo::{UNDO_HISTORY_MAX, UndoEngine};

/// Desired virtual column kept across vertical motions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curswant {
    Col(usize),
    /// Stick to the end of line (after `$`).
    Eol,
}

/// Last `f`/`F`/`t`/`T` for `;` and `,`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharSearch {
    pub target: char,
    pub forward: bool,
    pub till: bool,
}

/// Last `*`/`#` search for `n` and `N`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordSearch {
    pub word: String,
    pub whole: bool,
    pub forward: bool,
}

pub struct EditorContext {
    pub buffer: Buffer,
    pub cursor: Position,
    pub curswant: Curswant,
    pub registers: RegisterStore,
    pub undo: UndoEngine,
    pub options: Options,
    pub last_char_search: Option<CharSearch>,
    pub last_search: Option<WordSearch>,
    marks: HashMap<char, MarkId>,
    /// Last message for the host (errors, "not supported", ...).
    pub status: Option<String>,
    pub beeps: u64,
}

impl EditorContext {
    pub fn new(buffer: Buffer, options: Options) -> Self {
        Self {
            buffer,
            cursor: Position::origin(),
            curswant: Curswant::Col(0),
            registers: RegisterStore::new(),
            undo: UndoEngine::new(),
            options,
            last_char_search: None,
            last_search: None,
            marks: HashMap::new(),
            status: None,
            beeps: 0,
        }
    }

    pub fn ts(&self) -> usize {
        self.options.editor.ts()
    }

    pub fn sw(&self) -> usize {
        self.options.editor.sw()
    }

    pub fn line_count(&self) -> usize {
        self.buffer.line_count()
    }

    pub fn cur_line(&self) -> String {
        self.buffer.line_text(self.cursor.line)
    }

    pub fn cur_char(&self) -> Option<char> {
        self.buffer.char_at(self.cursor)
    }

    /// Keep the cursor on an existing char. With `past_end` the column may
    /// also sit right after the last char (Insert mode).
    pub fn clamp_cursor(&mut self, past_end: bool) {
        let last = self.buffer.line_count() - 1;
        self.cursor.line = self.cursor.line.min(last);
        let len = self.buffer.line_len(self.cursor.line);
        let max = if past_end { len } else { len.saturating_sub(1) };
        self.cursor.col = self.cursor.col.min(max);
    }

    /// Remember the cursor's current virtual column as the wanted column.
    pub fn update_curswant(&mut self) {
        let line = self.cur_line();
        self.curswant = Curswant::Col(width::vcol_of(&line, self.cursor.col, self.ts()));
    }

    /// Column on `line` closest to the wanted virtual column.
    pub fn col_for_curswant(&self, line: usize, past_end: bool) -> usize {
        let text = self.buffer.line_text(line);
        let len = text.chars().count();
        let max = if past_end { len } else { len.saturating_sub(1) };
        match self.curswant {
            Curswant::Eol => max,
            Curswant::Col(v) => width::col_for_vcol(&text, v, self.ts()).min(max),
        }
    }

    pub fn begin_change(&mut self) {
        self.undo.begin(self.cursor, &self.buffer);
    }

    pub fn end_change(&mut self) -> bool {
        self.undo.end(&self.buffer)
    }

    pub fn undo_step(&mut self) -> bool {
        let done = self.undo.undo(&mut self.cursor, &mut self.buffer);
        if done {
            self.clamp_cursor(false);
        }
        done
    }

    pub fn redo_step(&mut self) -> bool {
        let done = self.undo.redo(&mut self.cursor, &mut self.buffer);
        if done {
            self.clamp_cursor(false);
        }
        done
    }

    /// Set a named mark (`a`-`z`, `'`, `<`, `>`, `[`, `]`, `^`, `.`).
    pub fn set_mark(&mut self, name: char, pos: Position) {
        match self.marks.get(&name).copied() {
            Some(id) if self.buffer.mark(id).is_some() => self.buffer.set_mark(id, pos),
            _ => {
                let id = self.buffer.create_mark(pos);
                // A handle dropped by an undo restore may be handed out again.
                self.marks.retain(|_, v| *v != id);
                self.marks.insert(name, id);
            }
        }
        trace!(target: "state.marks", mark = %name, line = pos.line, col = pos.col, "set_mark");
    }

    pub fn mark(&self, name: char) -> Option<Position> {
        self.marks.get(&name).and_then(|id| self.buffer.mark(*id))
    }

    /// Record a beep with an optional message for the host.
    pub fn beep(&mut self, message: Option<String>) {
        self.beeps += 1;
        if message.is_some() {
            self.status = message;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ctx(text: &str) -> EditorContext {
        EditorContext::new(Buffer::from_str("t", text).unwrap(), Options::default())
    }

    #[test]
    fn clamp_respects_mode() {
        let mut c = ctx("abc\n");
        c.cursor = Position::new(4, 9);
        c.clamp_cursor(false);
        assert_eq!(c.cursor, Position::new(0, 2));
        c.cursor.col = 9;
        c.clamp_cursor(true);
        assert_eq!(c.cursor, Position::new(0, 3));
    }

    #[test]
    fn curswant_maps_through_tabs() {
        let mut c = ctx("\tx\nabcdefghijk\n");
        c.cursor = Position::new(0, 1);
        c.update_curswant();
        assert_eq!(c.curswant, Curswant::Col(8));
        assert_eq!(c.col_for_curswant(1, false), 8);
        c.curswant = Curswant::Eol;
        assert_eq!(c.col_for_curswant(1, false), 10);
    }

    #[test]
    fn marks_track_edits() {
        let mut c = ctx("one\ntwo\n");
        c.set_mark('a', Position::new(1, 1));
        c.buffer.insert_lines(0, &["zero".to_string()]);
        assert_eq!(c.mark('a'), Some(Position::new(2, 1)));
        c.set_mark('a', Position::new(0, 0));
        assert_eq!(c.mark('a'), Some(Position::origin()));
        assert_eq!(c.mark('b'), None);
    }

    #[test]
    fn change_round_trip_through_undo() {
        let mut c = ctx("abc\n");
        c.begin_change();
        c.buffer.delete_range(0, 1);
        assert!(c.end_change());
        assert!(c.undo_step());
        assert_eq!(c.buffer.text(), "abc\n");
        assert!(c.redo_step());
        assert_eq!(c.buffer.text(), "bc\n");
    }
}
