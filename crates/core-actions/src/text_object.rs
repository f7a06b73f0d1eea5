//! Text objects: `iw` `aw` `iW` `aW`, quoted strings and bracket blocks.
//!
//! Every object implements [`TextObject`] and resolves to an [`ObjectRange`]
//! relative to the cursor. The operator engine treats the range exactly like a
//! char-wise motion (start, end, inclusive flag); Visual mode replaces the
//! selection with it.

use crate::error::{EngineError, EngineResult};
use crate::motion::MotionType;
use core_state::EditorContext;
use core_text::motion::{Step, char_class, dec, end_word, fwd_word, inc, is_blank};
use core_text::{Buffer, Position};

/// Resolved object extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectRange {
    pub start: Position,
    pub end: Position,
    pub inclusive: bool,
    pub kind: MotionType,
}

pub trait TextObject {
    /// Identifier used in trace output.
    fn name(&self) -> &'static str;
    fn resolve(&self, ctx: &EditorContext, count: usize) -> EngineResult<ObjectRange>;
}

/// `iw`/`aw` (`big` for `iW`/`aW`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordObject {
    pub big: bool,
    pub around: bool,
}

/// `i"`/`a"`, `i'`/`a'`, `` i` ``/`` a` ``.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteObject {
    pub quote: char,
    pub around: bool,
}

/// `i(`/`a(` and friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketObject {
    pub open: char,
    pub close: char,
    pub around: bool,
}

/// Map the char after `i`/`a` to an object.
pub fn lookup(c: char, around: bool) -> Option<Box<dyn TextObject>> {
    let obj: Box<dyn TextObject> = match c {
        'w' => Box::new(WordObject { big: false, around }),
        'W' => Box::new(WordObject { big: true, around }),
        '"' | '\'' | '`' => Box::new(QuoteObject { quote: c, around }),
        '(' | ')' | 'b' => Box::new(BracketObject { open: '(', close: ')', around }),
        '{' | '}' | 'B' => Box::new(BracketObject { open: '{', close: '}', around }),
        '[' | ']' => Box::new(BracketObject { open: '[', close: ']', around }),
        '<' | '>' => Box::new(BracketObject { open: '<', close: '>', around }),
        _ => return None,
    };
    Some(obj)
}

/// Step forward, skipping the end-of-line slot of non-empty lines.
fn incl(buf: &Buffer, pos: &mut Position) -> Step {
    let r = inc(buf, pos);
    if r == Step::OntoLineEnd { inc(buf, pos) } else { r }
}

/// Step back, skipping the end-of-line slot of non-empty lines.
fn decl(buf: &Buffer, pos: &mut Position) -> Step {
    let r = dec(buf, pos);
    if r == Step::CrossedLine && pos.col != 0 {
        dec(buf, pos)
    } else {
        r
    }
}

/// Cursor sits on whitespace of the line's indent.
fn in_indent(buf: &Buffer, pos: Position) -> bool {
    let ws = buf.line_text(pos.line).chars().take_while(|c| is_blank(*c)).count();
    ws > pos.col
}

impl WordObject {
    fn cls(&self, buf: &Buffer, pos: Position) -> u8 {
        char_class(buf.char_at(pos), self.big)
    }

    /// Back to the start of the word or blank run under `pos`.
    fn back_in_line(&self, buf: &Buffer, pos: &mut Position) {
        let class = self.cls(buf, *pos);
        while pos.col > 0 {
            let prev = Position::new(pos.line, pos.col - 1);
            if self.cls(buf, prev) != class {
                break;
            }
            *pos = prev;
        }
    }
}

impl TextObject for WordObject {
    fn name(&self) -> &'static str {
        "word"
    }

    fn resolve(&self, ctx: &EditorContext, count: usize) -> EngineResult<ObjectRange> {
        let buf = &ctx.buffer;
        let include = self.around;
        let mut pos = ctx.cursor;
        self.back_in_line(buf, &mut pos);
        let start_pos = pos;
        let mut start = pos;
        let mut include_white = false;
        let mut inclusive = true;

        if (self.cls(buf, pos) == 0) == include {
            if !end_word(buf, &mut pos, 1, self.big, true, true) {
                return Err(EngineError::Beep);
            }
        } else {
            fwd_word(buf, &mut pos, 1, self.big, true);
            if pos.col == 0 {
                decl(buf, &mut pos);
            } else {
                pos.col -= 1;
            }
            include_white = include;
        }

        for remaining in (1..count.max(1)).rev() {
            inclusive = true;
            if incl(buf, &mut pos) == Step::Blocked {
                return Err(EngineError::Beep);
            }
            if include != (self.cls(buf, pos) == 0) {
                if !fwd_word(buf, &mut pos, 1, self.big, true) && remaining > 1 {
                    return Err(EngineError::Beep);
                }
                if pos.col == 0 {
                    inclusive = false;
                } else {
                    pos.col -= 1;
                }
            } else if !end_word(buf, &mut pos, 1, self.big, true, true) {
                return Err(EngineError::Beep);
            }
        }

        // No trailing white was taken: take the white before the word instead,
        // but never the indent.
        if include_white && (self.cls(buf, pos) != 0 || (pos.col == 0 && !inclusive)) && start_pos.col > 0 {
            let mut p = Position::new(start_pos.line, start_pos.col - 1);
            self.back_in_line(buf, &mut p);
            if self.cls(buf, p) == 0 && p.col > 0 {
                start = p;
            }
        }
        Ok(ObjectRange {
            start,
            end: pos,
            inclusive,
            kind: MotionType::Char,
        })
    }
}

/// Columns of unescaped `quote` chars in `line`.
fn quote_columns(line: &[char], quote: char) -> Vec<usize> {
    let mut out = Vec::new();
    let mut escaped = false;
    for (i, c) in line.iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        if *c == '\\' {
            escaped = true;
        } else if *c == quote {
            out.push(i);
        }
    }
    out
}

impl TextObject for QuoteObject {
    fn name(&self) -> &'static str {
        "quote"
    }

    fn resolve(&self, ctx: &EditorContext, _count: usize) -> EngineResult<ObjectRange> {
        let line: Vec<char> = ctx.cur_line().chars().collect();
        let col = ctx.cursor.col;
        let quotes = quote_columns(&line, self.quote);
        let (open, close) = if let Some(k) = quotes.iter().position(|q| *q == col) {
            // On a quote: its index decides whether it opens or closes.
            if k % 2 == 0 {
                (col, *quotes.get(k + 1).ok_or(EngineError::Beep)?)
            } else {
                (quotes[k - 1], col)
            }
        } else {
            let open = match quotes.iter().rev().find(|q| **q < col) {
                Some(q) => *q,
                None => *quotes.iter().find(|q| **q > col).ok_or(EngineError::Beep)?,
            };
            let close = *quotes.iter().find(|q| **q > open).ok_or(EngineError::Beep)?;
            (open, close)
        };

        let l = ctx.cursor.line;
        if self.around {
            let mut start = open;
            let mut end = close;
            if line.get(end + 1).is_some_and(|c| is_blank(*c)) {
                while line.get(end + 1).is_some_and(|c| is_blank(*c)) {
                    end += 1;
                }
            } else {
                while start > 0 && is_blank(line[start - 1]) {
                    start -= 1;
                }
            }
            return Ok(ObjectRange {
                start: Position::new(l, start),
                end: Position::new(l, end),
                inclusive: true,
                kind: MotionType::Char,
            });
        }
        let inner_empty = close == open + 1;
        Ok(ObjectRange {
            start: Position::new(l, open + 1),
            end: Position::new(l, if inner_empty { close } else { close - 1 }),
            inclusive: !inner_empty,
            kind: MotionType::Char,
        })
    }
}

impl BracketObject {
    /// Walk from `from` (exclusive) to the unmatched `open` (backward) or
    /// `close` (forward).
    fn find_unmatched(&self, buf: &Buffer, from: Position, forward: bool) -> Option<Position> {
        let (nest, target) = if forward {
            (self.open, self.close)
        } else {
            (self.close, self.open)
        };
        let mut pos = from;
        let mut depth = 0usize;
        loop {
            let step = if forward { inc(buf, &mut pos) } else { dec(buf, &mut pos) };
            if step == Step::Blocked {
                return None;
            }
            match buf.char_at(pos) {
                Some(c) if c == nest => depth += 1,
                Some(c) if c == target => {
                    if depth == 0 {
                        return Some(pos);
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }
    }
}

impl TextObject for BracketObject {
    fn name(&self) -> &'static str {
        "block"
    }

    fn resolve(&self, ctx: &EditorContext, count: usize) -> EngineResult<ObjectRange> {
        let buf = &ctx.buffer;
        let mut pos = ctx.cursor;
        if self.open == '{' {
            while in_indent(buf, pos) {
                if inc(buf, &mut pos) != Step::Moved {
                    break;
                }
            }
        }
        if buf.char_at(pos) == Some(self.open) {
            pos.col += 1;
        }
        let mut start = None;
        for _ in 0..count.max(1) {
            match self.find_unmatched(buf, pos, false) {
                Some(p) => {
                    pos = p;
                    start = Some(p);
                }
                None => break,
            }
        }
        let mut start = start.ok_or(EngineError::Beep)?;
        let mut end = self.find_unmatched(buf, start, true).ok_or(EngineError::Beep)?;

        if self.around {
            return Ok(ObjectRange {
                start,
                end,
                inclusive: true,
                kind: MotionType::Char,
            });
        }
        incl(buf, &mut start);
        let mut sol = end.col == 0;
        decl(buf, &mut end);
        while in_indent(buf, end) {
            sol = true;
            if decl(buf, &mut end) != Step::Moved {
                break;
            }
        }
        let mut inclusive = false;
        if sol {
            incl(buf, &mut end);
        } else if start <= end {
            inclusive = true;
        } else {
            end = start;
        }
        Ok(ObjectRange {
            start,
            end,
            inclusive,
            kind: MotionType::Char,
        })
    }
}
