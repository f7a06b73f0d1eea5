//! The `.` command.
//!
//! A repeatable change is remembered as the keys that produced it: register
//! prefix, count, command keys and, for commands that enter Insert mode, the
//! keys typed there up to the closing `<Esc>`. Replaying feeds those keys
//! back through the engine, so a repeat runs exactly the code the original
//! did. Visual-mode changes also remember the shape of the selection, which
//! is rebuilt at the cursor before the keys are replayed.

use crate::keys::ESC;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualKind {
    Char,
    Line,
    Block,
}

impl VisualKind {
    pub fn from_key(c: char) -> Option<Self> {
        match c {
            'v' => Some(Self::Char),
            'V' => Some(Self::Line),
            crate::keys::CTRL_V => Some(Self::Block),
            _ => None,
        }
    }
}

/// Size of the Visual selection a change was made on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualRepeat {
    pub kind: VisualKind,
    /// Lines below the first one.
    pub lines: usize,
    /// Char mode: last column (chars past the start on a single line).
    /// Block mode: width in virtual columns minus one.
    pub cols: usize,
    /// Block mode selected to the end of every line.
    pub to_eol: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotRecord {
    pub register: Option<char>,
    /// 0 when the change had no count.
    pub count: usize,
    pub keys: Vec<char>,
    pub visual: Option<VisualRepeat>,
    /// Keys typed in Insert mode, ending with `<Esc>`.
    pub inserted: Vec<char>,
}

impl DotRecord {
    pub fn new(register: Option<char>, count: usize, keys: Vec<char>) -> Self {
        Self {
            register,
            count,
            keys,
            visual: None,
            inserted: Vec::new(),
        }
    }

    pub fn with_visual(mut self, visual: VisualRepeat) -> Self {
        self.visual = Some(visual);
        self
    }

    /// Attach the text of the Insert session the command started.
    pub fn finish_insert(&mut self, typed: &[char]) {
        self.inserted = typed.to_vec();
        self.inserted.push(ESC);
    }

    /// Prepare for another repeat: a new count replaces the recorded one and
    /// a numbered register advances (`"1p...` puts `"2`, `"3`, ...).
    pub fn prepare(&mut self, count: usize) {
        if count > 0 {
            self.count = count;
        }
        if let Some(r @ '1'..='8') = self.register {
            self.register = char::from_u32(r as u32 + 1);
        }
    }

    /// Keys that reproduce the change.
    pub fn replay_keys(&self) -> Vec<char> {
        let mut out = Vec::with_capacity(self.keys.len() + self.inserted.len() + 4);
        if let Some(r) = self.register {
            out.extend(['"', r]);
        }
        if self.count > 0 {
            out.extend(self.count.to_string().chars());
        }
        out.extend_from_slice(&self.keys);
        out.extend_from_slice(&self.inserted);
        trace!(target: "actions.dispatch", keys = out.len(), visual = self.visual.is_some(), "dot_replay");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::parse_keys;
    use pretty_assertions::assert_eq;

    #[test]
    fn replay_includes_register_count_and_insert() {
        let mut rec = DotRecord::new(Some('a'), 3, vec!['c', 'w']);
        rec.finish_insert(&['x', 'y']);
        assert_eq!(rec.replay_keys(), parse_keys("\"a3cwxy<Esc>"));
    }

    #[test]
    fn new_count_replaces_the_old_one() {
        let mut rec = DotRecord::new(None, 3, vec!['d', 'd']);
        rec.prepare(0);
        assert_eq!(rec.replay_keys(), parse_keys("3dd"));
        rec.prepare(2);
        assert_eq!(rec.replay_keys(), parse_keys("2dd"));
    }

    #[test]
    fn numbered_register_advances() {
        let mut rec = DotRecord::new(Some('1'), 0, vec!['p']);
        rec.prepare(0);
        assert_eq!(rec.register, Some('2'));
        let mut rec = DotRecord::new(Some('9'), 0, vec!['p']);
        rec.prepare(0);
        assert_eq!(rec.register, Some('9'));
    }
}
