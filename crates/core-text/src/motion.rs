//! Cursor motion primitives.
//!
//! These operate purely on a `Buffer` + `Position` pair and are free of editor
//! state. Word motions follow the classic vi model: every position belongs to a
//! character class (blank, punctuation, word) and the end-of-line slot counts
//! as blank. A position may rest on that end-of-line slot (`col == line_len`)
//! while a motion is being computed; callers normalize afterwards.

use crate::{Buffer, Position};

/// Outcome of a single-char cursor step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Moved within the line onto a real char.
    Moved,
    /// Moved onto the end-of-line slot.
    OntoLineEnd,
    /// Crossed a line boundary.
    CrossedLine,
    /// Buffer edge; position unchanged.
    Blocked,
}

impl Step {
    fn is_line_step(self) -> bool {
        matches!(self, Step::OntoLineEnd | Step::CrossedLine)
    }
}

pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

pub fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Character class: 0 blank (space, tab, end of line), 1 punctuation, 2 word.
/// With `bigword` every non-blank is class 1.
pub fn char_class(c: Option<char>, bigword: bool) -> u8 {
    match c {
        None => 0,
        Some(c) if is_blank(c) => 0,
        Some(_) if bigword => 1,
        Some(c) if is_word_char(c) => 2,
        Some(_) => 1,
    }
}

fn cls(buf: &Buffer, pos: Position, bigword: bool) -> u8 {
    char_class(buf.char_at(pos), bigword)
}

fn line_is_empty(buf: &Buffer, line: usize) -> bool {
    buf.line_len(line) == 0
}

/// Advance one char, stepping onto the end-of-line slot before crossing lines.
pub fn inc(buf: &Buffer, pos: &mut Position) -> Step {
    let len = buf.line_len(pos.line);
    if pos.col < len {
        pos.col += 1;
        return if pos.col < len {
            Step::Moved
        } else {
            Step::OntoLineEnd
        };
    }
    if pos.line + 1 < buf.line_count() {
        pos.line += 1;
        pos.col = 0;
        return Step::CrossedLine;
    }
    Step::Blocked
}

/// Retreat one char; crossing a line lands on the previous line's end-of-line slot.
pub fn dec(buf: &Buffer, pos: &mut Position) -> Step {
    pos.col = pos.col.min(buf.line_len(pos.line));
    if pos.col > 0 {
        pos.col -= 1;
        return Step::Moved;
    }
    if pos.line > 0 {
        pos.line -= 1;
        pos.col = buf.line_len(pos.line);
        return Step::CrossedLine;
    }
    Step::Blocked
}

/// Skip over chars of class `class`; returns true when the buffer edge was hit.
fn skip_chars(buf: &Buffer, pos: &mut Position, class: u8, bigword: bool, forward: bool) -> bool {
    while cls(buf, *pos, bigword) == class {
        let step = if forward { inc(buf, pos) } else { dec(buf, pos) };
        if step == Step::Blocked {
            return true;
        }
    }
    false
}

/// `w`/`W`. With `eol` (operator pending) the last iteration stops at the end
/// of the line instead of crossing to the next one.
pub fn fwd_word(buf: &Buffer, pos: &mut Position, count: usize, bigword: bool, eol: bool) -> bool {
    for remaining in (0..count).rev() {
        let last_iter = remaining == 0;
        let sclass = cls(buf, *pos, bigword);
        let last_line = pos.line + 1 == buf.line_count();
        let step = inc(buf, pos);
        if step == Step::Blocked || (step.is_line_step() && last_line) {
            return false;
        }
        if step.is_line_step() && eol && last_iter {
            return true;
        }
        if sclass != 0 {
            while cls(buf, *pos, bigword) == sclass {
                let step = inc(buf, pos);
                if step == Step::Blocked || (step.is_line_step() && eol && last_iter) {
                    return true;
                }
            }
        }
        while cls(buf, *pos, bigword) == 0 {
            if pos.col == 0 && line_is_empty(buf, pos.line) {
                break;
            }
            let step = inc(buf, pos);
            if step == Step::Blocked || (step.is_line_step() && eol && last_iter) {
                return true;
            }
        }
    }
    true
}

/// `b`/`B`. `stop` keeps the cursor on the current word when it is already at its start.
pub fn bck_word(buf: &Buffer, pos: &mut Position, count: usize, bigword: bool, stop: bool) -> bool {
    let mut stop = stop;
    for _ in 0..count {
        let sclass = cls(buf, *pos, bigword);
        if dec(buf, pos) == Step::Blocked {
            return false;
        }
        let finished = 'word: {
            if !stop || sclass == cls(buf, *pos, bigword) || sclass == 0 {
                while cls(buf, *pos, bigword) == 0 {
                    if pos.col == 0 && line_is_empty(buf, pos.line) {
                        break 'word true;
                    }
                    if dec(buf, pos) == Step::Blocked {
                        return true;
                    }
                }
                let class = cls(buf, *pos, bigword);
                if skip_chars(buf, pos, class, bigword, false) {
                    return true;
                }
            }
            false
        };
        if !finished {
            inc(buf, pos);
        }
        stop = false;
    }
    true
}

/// `e`/`E`. `stop` keeps the cursor when it already sits on a word end; `empty`
/// stops on empty lines.
pub fn end_word(
    buf: &Buffer,
    pos: &mut Position,
    count: usize,
    bigword: bool,
    stop: bool,
    empty: bool,
) -> bool {
    let mut stop = stop;
    for _ in 0..count {
        let sclass = cls(buf, *pos, bigword);
        if inc(buf, pos) == Step::Blocked {
            return false;
        }
        let finished = 'word: {
            if cls(buf, *pos, bigword) == sclass && sclass != 0 {
                if skip_chars(buf, pos, sclass, bigword, true) {
                    return false;
                }
            } else if !stop || sclass == 0 {
                while cls(buf, *pos, bigword) == 0 {
                    if pos.col == 0 && line_is_empty(buf, pos.line) && empty {
                        break 'word true;
                    }
                    if inc(buf, pos) == Step::Blocked {
                        return false;
                    }
                }
                let class = cls(buf, *pos, bigword);
                if skip_chars(buf, pos, class, bigword, true) {
                    return false;
                }
            }
            false
        };
        if !finished {
            dec(buf, pos);
        }
        stop = false;
    }
    true
}

/// `ge`/`gE`.
pub fn bckend_word(buf: &Buffer, pos: &mut Position, count: usize, bigword: bool, eol: bool) -> bool {
    for _ in 0..count {
        let sclass = cls(buf, *pos, bigword);
        let step = dec(buf, pos);
        if step == Step::Blocked {
            return false;
        }
        if eol && step == Step::CrossedLine {
            return true;
        }
        if sclass != 0 {
            while cls(buf, *pos, bigword) == sclass {
                let step = dec(buf, pos);
                if step == Step::Blocked || (eol && step == Step::CrossedLine) {
                    return true;
                }
            }
        }
        while cls(buf, *pos, bigword) == 0 {
            if pos.col == 0 && line_is_empty(buf, pos.line) {
                break;
            }
            let step = dec(buf, pos);
            if step == Step::Blocked || (eol && step == Step::CrossedLine) {
                return true;
            }
        }
    }
    true
}

/// Index of the first non-blank char of `line` (the line length when all blank).
pub fn first_non_blank(line: &str) -> usize {
    line.chars().take_while(|c| is_blank(*c)).count()
}

/// In-line char search for `f`/`F`/`t`/`T`. `skip_adjacent` ignores a match on
/// the very first step, which is how a repeated `t` avoids getting stuck.
pub fn find_char(
    line: &str,
    col: usize,
    target: char,
    forward: bool,
    till: bool,
    count: usize,
    skip_adjacent: bool,
) -> Option<usize> {
    let chars: Vec<char> = line.chars().collect();
    let mut col = col as isize;
    let mut stop = !skip_adjacent;
    for _ in 0..count {
        loop {
            if forward {
                col += 1;
                if col >= chars.len() as isize {
                    return None;
                }
            } else {
                if col <= 0 {
                    return None;
                }
                col -= 1;
            }
            if chars[col as usize] == target && stop {
                break;
            }
            stop = true;
        }
    }
    if till {
        col += if forward { -1 } else { 1 };
    }
    Some(col as usize)
}

fn starts_paragraph(buf: &Buffer, line: usize) -> bool {
    let text = buf.line_text(line);
    text.is_empty() || text.starts_with('\x0c')
}

/// `}` / `{`. Returns the target and whether the motion became inclusive
/// (forward motion running into the last line).
pub fn find_paragraph(
    buf: &Buffer,
    from_line: usize,
    count: usize,
    forward: bool,
) -> Option<(Position, bool)> {
    let last = buf.line_count() - 1;
    let mut curr = from_line;
    for remaining in (0..count).rev() {
        let mut did_skip = false;
        let mut first = true;
        loop {
            if buf.line_len(curr) != 0 {
                did_skip = true;
            }
            if !first && did_skip && starts_paragraph(buf, curr) {
                break;
            }
            first = false;
            let next = if forward {
                (curr < last).then(|| curr + 1)
            } else {
                curr.checked_sub(1)
            };
            match next {
                Some(n) => curr = n,
                None => {
                    if remaining > 0 {
                        return None;
                    }
                    break;
                }
            }
        }
    }
    if curr == last && forward {
        let len = buf.line_len(curr);
        if len != 0 {
            return Some((Position::new(curr, len - 1), true));
        }
    }
    Some((Position::new(curr, 0), false))
}

fn pair_of(c: char) -> Option<(char, char, bool)> {
    match c {
        '(' => Some(('(', ')', true)),
        '[' => Some(('[', ']', true)),
        '{' => Some(('{', '}', true)),
        ')' => Some(('(', ')', false)),
        ']' => Some(('[', ']', false)),
        '}' => Some(('{', '}', false)),
        _ => None,
    }
}

/// `%`: find the first bracket at or after the cursor on its line and jump to its partner.
pub fn match_pair(buf: &Buffer, pos: Position) -> Option<Position> {
    let line = buf.line_text(pos.line);
    let (col, c) = line
        .chars()
        .enumerate()
        .skip(pos.col)
        .find(|(_, c)| pair_of(*c).is_some())?;
    let (open, close, forward) = pair_of(c)?;
    let mut cur = Position::new(pos.line, col);
    let mut depth = 0usize;
    loop {
        let step = if forward { inc(buf, &mut cur) } else { dec(buf, &mut cur) };
        if step == Step::Blocked {
            return None;
        }
        match buf.char_at(cur) {
            Some(ch) if ch == (if forward { open } else { close }) => depth += 1,
            Some(ch) if ch == (if forward { close } else { open }) => {
                if depth == 0 {
                    return Some(cur);
                }
                depth -= 1;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(s: &str) -> Buffer {
        Buffer::from_str("t", s).unwrap()
    }

    #[test]
    fn fwd_word_crosses_lines_without_operator() {
        let b = buf("abc\ndef\n");
        let mut p = Position::new(0, 0);
        assert!(fwd_word(&b, &mut p, 1, false, false));
        assert_eq!(p, Position::new(1, 0));
    }

    #[test]
    fn fwd_word_stops_at_eol_with_operator() {
        let b = buf("abc\ndef\n");
        let mut p = Position::new(0, 0);
        assert!(fwd_word(&b, &mut p, 1, false, true));
        assert_eq!(p, Position::new(0, 3));
    }

    #[test]
    fn fwd_word_punctuation_is_its_own_word() {
        let b = buf("foo.bar baz\n");
        let mut p = Position::new(0, 0);
        fwd_word(&b, &mut p, 1, false, false);
        assert_eq!(p.col, 3);
        let mut p = Position::new(0, 0);
        fwd_word(&b, &mut p, 1, true, false);
        assert_eq!(p.col, 8);
    }

    #[test]
    fn fwd_word_fails_on_last_char_of_buffer() {
        let b = buf("ab\n");
        let mut p = Position::new(0, 1);
        assert!(!fwd_word(&b, &mut p, 1, false, false));
    }

    #[test]
    fn back_and_end_motions() {
        let b = buf("one two  three\n");
        let mut p = Position::new(0, 9);
        assert!(bck_word(&b, &mut p, 1, false, false));
        assert_eq!(p.col, 4);
        let mut p = Position::new(0, 0);
        assert!(end_word(&b, &mut p, 2, false, false, false));
        assert_eq!(p.col, 6);
        let mut p = Position::new(0, 9);
        assert!(bckend_word(&b, &mut p, 1, false, false));
        assert_eq!(p.col, 6);
    }

    #[test]
    fn end_word_with_stop_stays_on_word_end() {
        let b = buf("ab cd\n");
        let mut p = Position::new(0, 1);
        assert!(end_word(&b, &mut p, 1, false, true, false));
        assert_eq!(p.col, 1);
    }

    #[test]
    fn find_char_and_till() {
        assert_eq!(find_char("a,b,c", 0, ',', true, false, 2, false), Some(3));
        assert_eq!(find_char("a,b,c", 0, ',', true, true, 1, false), Some(0));
        assert_eq!(find_char("a,b,c", 0, ',', true, true, 1, true), Some(2));
        assert_eq!(find_char("a,b,c", 4, 'a', false, false, 1, false), Some(0));
        assert_eq!(find_char("abc", 0, 'z', true, false, 1, false), None);
    }

    #[test]
    fn paragraph_motion() {
        let b = buf("a\nb\n\nc\nd\n");
        assert_eq!(find_paragraph(&b, 0, 1, true), Some((Position::new(2, 0), false)));
        assert_eq!(find_paragraph(&b, 3, 1, true), Some((Position::new(4, 0), true)));
        assert_eq!(find_paragraph(&b, 4, 1, false), Some((Position::new(2, 0), false)));
        assert_eq!(find_paragraph(&b, 0, 3, true), None);
    }

    #[test]
    fn bracket_matching_spans_lines() {
        let b = buf("f(a, (b)\n) x\n");
        assert_eq!(match_pair(&b, Position::new(0, 0)), Some(Position::new(1, 0)));
        assert_eq!(match_pair(&b, Position::new(1, 0)), Some(Position::new(0, 1)));
        assert_eq!(match_pair(&b, Position::new(1, 1)), None);
    }
}
