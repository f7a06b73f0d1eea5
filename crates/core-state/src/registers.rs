//! Register store.
//!
//! Every register holds a [`Yankreg`] tagged with its content kind. Write
//! semantics follow vi:
//! - yanks land in `"0`, deletes spanning lines shift the numbered ring
//!   (`"1` newest, `"9` oldest, overflow discarded) and small deletes go to `"-`;
//! - an explicit `"a`..`"z` target receives the text instead, `"A`..`"Z` appends;
//! - `"_` swallows everything, `".` is written only by Insert mode;
//! - the unnamed register `""` always resolves to whichever register was written last.

use std::collections::BTreeMap;
use thiserror::Error;
use tracing::trace;

/// Content kind without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterKind {
    Char,
    Line,
    Block,
}

/// Register payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Yankreg {
    /// Exact substring; may contain newlines.
    Char(String),
    /// Whole lines, each terminated by `\n`.
    Line(String),
    /// Rectangle rows. `width` is the block's virtual column count minus
    /// one, so a single-column block has width 0; put pads short rows out
    /// to `width + 1` columns.
    Block { rows: Vec<String>, width: usize },
}

impl Yankreg {
    pub fn kind(&self) -> RegisterKind {
        match self {
            Yankreg::Char(_) => RegisterKind::Char,
            Yankreg::Line(_) => RegisterKind::Line,
            Yankreg::Block { .. } => RegisterKind::Block,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Yankreg::Char(s) | Yankreg::Line(s) => s.is_empty(),
            Yankreg::Block { rows, .. } => rows.is_empty(),
        }
    }

    /// Content split into rows (line breaks removed).
    pub fn rows(&self) -> Vec<String> {
        match self {
            Yankreg::Char(s) => s.split('\n').map(str::to_string).collect(),
            Yankreg::Line(s) => {
                let body = s.strip_suffix('\n').unwrap_or(s);
                body.split('\n').map(str::to_string).collect()
            }
            Yankreg::Block { rows, .. } => rows.clone(),
        }
    }

    /// Text as it would be typed back (used by Insert-mode `CTRL-R`).
    pub fn as_text(&self) -> String {
        match self {
            Yankreg::Char(s) | Yankreg::Line(s) => s.clone(),
            Yankreg::Block { rows, .. } => rows.join("\n"),
        }
    }

    fn from_rows(kind: RegisterKind, rows: Vec<String>, width: usize) -> Self {
        match kind {
            RegisterKind::Char => Yankreg::Char(rows.join("\n")),
            RegisterKind::Line => {
                let mut s = String::new();
                for r in rows {
                    s.push_str(&r);
                    s.push('\n');
                }
                Yankreg::Line(s)
            }
            RegisterKind::Block => Yankreg::Block { rows, width },
        }
    }

    /// Append `other` to `self`. Line content forces the result to Line; two
    /// Char payloads join on their touching rows.
    pub fn append(&mut self, other: Yankreg) {
        let kind = if other.kind() == RegisterKind::Line {
            RegisterKind::Line
        } else {
            self.kind()
        };
        let width = match self {
            Yankreg::Block { width, .. } => *width,
            _ => 0,
        };
        let mut rows = self.rows();
        let mut extra = other.rows();
        if kind == RegisterKind::Char && !extra.is_empty() {
            let head = extra.remove(0);
            if let Some(last) = rows.last_mut() {
                last.push_str(&head);
            }
        }
        rows.extend(extra);
        *self = Yankreg::from_rows(kind, rows, width);
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RegisterError {
    #[error("invalid register name {0:?}")]
    InvalidName(char),
    #[error("register {0:?} is read-only")]
    ReadOnly(char),
    #[error("clipboard registers are not supported")]
    Clipboard,
}

#[derive(Debug, Clone)]
pub struct RegisterStore {
    /// Register the unnamed register currently resolves to.
    unnamed: Option<char>,
    slots: BTreeMap<char, Yankreg>,
    numbered: Vec<Yankreg>, // "1 at index 0, length <= 9
}

impl Default for RegisterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterStore {
    pub const MAX_NUMBERED: usize = 9;

    pub fn new() -> Self {
        Self {
            unnamed: None,
            slots: BTreeMap::new(),
            numbered: Vec::new(),
        }
    }

    /// Whether `c` may follow `"` in Normal mode.
    pub fn is_valid_name(c: char) -> bool {
        c.is_ascii_alphanumeric() || matches!(c, '"' | '-' | '_' | '.' | '+' | '*')
    }

    fn check(name: char) -> Result<(), RegisterError> {
        match name {
            '+' | '*' => Err(RegisterError::Clipboard),
            c if Self::is_valid_name(c) => Ok(()),
            c => Err(RegisterError::InvalidName(c)),
        }
    }

    /// Read a register. `None` and `'"'` resolve through the unnamed pointer.
    pub fn get(&self, name: Option<char>) -> Result<Option<&Yankreg>, RegisterError> {
        let name = match name {
            None | Some('"') => match self.unnamed {
                Some(n) => n,
                None => return Ok(None),
            },
            Some(c) => {
                Self::check(c)?;
                c
            }
        };
        Ok(match name {
            '1'..='9' => self.numbered.get(name as usize - '1' as usize),
            '_' => None,
            c => self.slots.get(&c.to_ascii_lowercase()),
        })
    }

    /// Host accessor: store `reg` under `name` verbatim (no append, no ring shift).
    pub fn set(&mut self, name: char, reg: Yankreg) -> Result<(), RegisterError> {
        Self::check(name)?;
        match name {
            '_' => {}
            '"' => {
                self.slots.insert('0', reg);
                self.unnamed = Some('0');
            }
            '1'..='9' => {
                let idx = name as usize - '1' as usize;
                while self.numbered.len() <= idx {
                    self.numbered.push(Yankreg::Char(String::new()));
                }
                self.numbered[idx] = reg;
            }
            c => {
                self.slots.insert(c.to_ascii_lowercase(), reg);
            }
        }
        Ok(())
    }

    /// The register the unnamed register currently resolves to.
    pub fn unnamed_name(&self) -> Option<char> {
        self.unnamed
    }

    /// Numbered ring, `"1` first.
    pub fn numbered(&self) -> &[Yankreg] {
        &self.numbered
    }

    fn write_named(&mut self, name: char, reg: Yankreg) {
        let slot = name.to_ascii_lowercase();
        if name.is_ascii_uppercase()
            && let Some(existing) = self.slots.get_mut(&slot)
        {
            existing.append(reg);
        } else {
            self.slots.insert(slot, reg);
        }
        self.unnamed = Some(slot);
        trace!(target: "state.registers", register = %slot, append = name.is_ascii_uppercase(), "write_named");
    }

    /// Record yanked text.
    pub fn write_yank(&mut self, name: Option<char>, reg: Yankreg) -> Result<(), RegisterError> {
        match name {
            None | Some('"') | Some('0') => {
                trace!(target: "state.registers", kind = ?reg.kind(), "write_yank");
                self.slots.insert('0', reg);
                self.unnamed = Some('0');
                Ok(())
            }
            Some('_') => Ok(()),
            Some('.') => Err(RegisterError::ReadOnly('.')),
            Some(c) if c.is_ascii_alphabetic() || c == '-' => {
                self.write_named(c, reg);
                Ok(())
            }
            Some(c) => self.set(c, reg).map(|_| self.unnamed = Some(c)),
        }
    }

    /// Record deleted text. Multi-line (or `use_ring`) deletes shift the
    /// numbered ring; the rest go to the small delete register.
    pub fn write_delete(
        &mut self,
        name: Option<char>,
        reg: Yankreg,
        use_ring: bool,
    ) -> Result<(), RegisterError> {
        match name {
            Some('_') => Ok(()),
            Some('.') => Err(RegisterError::ReadOnly('.')),
            Some(c) if c.is_ascii_alphabetic() => {
                // Line-spanning deletes reach "1 even with an explicit register.
                if use_ring {
                    self.shift_numbered(reg.clone());
                }
                self.write_named(c, reg);
                Ok(())
            }
            Some(c) if c != '"' => self.set(c, reg).map(|_| self.unnamed = Some(c)),
            _ => {
                if use_ring {
                    self.shift_numbered(reg);
                    self.unnamed = Some('1');
                } else {
                    self.slots.insert('-', reg);
                    self.unnamed = Some('-');
                }
                Ok(())
            }
        }
    }

    fn shift_numbered(&mut self, reg: Yankreg) {
        let rotated = self.numbered.len() == Self::MAX_NUMBERED;
        if rotated {
            self.numbered.pop();
        }
        self.numbered.insert(0, reg);
        trace!(target: "state.registers", depth = self.numbered.len(), rotated, "numbered_shift");
    }

    /// Remember the text typed during the last Insert session (`".`).
    pub fn set_last_inserted(&mut self, text: String) {
        self.slots.insert('.', Yankreg::Char(text));
    }

    pub fn last_inserted(&self) -> Option<&str> {
        match self.slots.get(&'.') {
            Some(Yankreg::Char(s)) => Some(s.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ch(s: &str) -> Yankreg {
        Yankreg::Char(s.to_string())
    }

    #[test]
    fn yank_goes_to_zero_and_unnamed() {
        let mut r = RegisterStore::new();
        r.write_yank(None, ch("abc")).unwrap();
        assert_eq!(r.get(None).unwrap(), Some(&ch("abc")));
        assert_eq!(r.get(Some('0')).unwrap(), Some(&ch("abc")));
        assert!(r.numbered().is_empty());
    }

    #[test]
    fn line_deletes_shift_ring_and_discard_oldest() {
        let mut r = RegisterStore::new();
        for i in 0..10 {
            r.write_delete(None, Yankreg::Line(format!("{i}\n")), true).unwrap();
        }
        assert_eq!(r.numbered().len(), 9);
        assert_eq!(r.get(Some('1')).unwrap(), Some(&Yankreg::Line("9\n".into())));
        assert_eq!(r.get(Some('9')).unwrap(), Some(&Yankreg::Line("1\n".into())));
        assert_eq!(r.get(None).unwrap(), Some(&Yankreg::Line("9\n".into())));
    }

    #[test]
    fn small_delete_uses_minus_register() {
        let mut r = RegisterStore::new();
        r.write_delete(None, ch("x"), false).unwrap();
        assert_eq!(r.get(Some('-')).unwrap(), Some(&ch("x")));
        assert!(r.numbered().is_empty());
        assert_eq!(r.unnamed_name(), Some('-'));
    }

    #[test]
    fn uppercase_appends_and_line_wins() {
        let mut r = RegisterStore::new();
        r.write_yank(Some('a'), ch("foo")).unwrap();
        r.write_yank(Some('A'), ch("bar")).unwrap();
        assert_eq!(r.get(Some('a')).unwrap(), Some(&ch("foobar")));
        r.write_yank(Some('A'), Yankreg::Line("next\n".into())).unwrap();
        assert_eq!(
            r.get(Some('a')).unwrap(),
            Some(&Yankreg::Line("foobar\nnext\n".into()))
        );
        // Appending chars to a line register adds a new line.
        r.write_yank(Some('A'), ch("tail")).unwrap();
        assert_eq!(
            r.get(Some('a')).unwrap(),
            Some(&Yankreg::Line("foobar\nnext\ntail\n".into()))
        );
    }

    #[test]
    fn uppercase_on_empty_register_creates_it() {
        let mut r = RegisterStore::new();
        r.write_delete(Some('Q'), ch("q"), false).unwrap();
        assert_eq!(r.get(Some('q')).unwrap(), Some(&ch("q")));
        assert!(r.numbered().is_empty());
        r.write_delete(Some('q'), Yankreg::Line("l\n".into()), true).unwrap();
        assert_eq!(r.get(Some('1')).unwrap(), Some(&Yankreg::Line("l\n".into())));
        assert_eq!(r.unnamed_name(), Some('q'));
    }

    #[test]
    fn black_hole_and_read_only() {
        let mut r = RegisterStore::new();
        r.write_delete(Some('_'), ch("gone"), true).unwrap();
        assert_eq!(r.get(None).unwrap(), None);
        assert_eq!(r.write_yank(Some('.'), ch("x")), Err(RegisterError::ReadOnly('.')));
        assert_eq!(r.get(Some('+')), Err(RegisterError::Clipboard));
        assert_eq!(r.get(Some('!')), Err(RegisterError::InvalidName('!')));
    }

    #[test]
    fn block_rows_and_text() {
        let reg = Yankreg::Block {
            rows: vec!["ab".into(), "cd".into()],
            width: 2,
        };
        assert_eq!(reg.kind(), RegisterKind::Block);
        assert_eq!(reg.as_text(), "ab\ncd");
        assert_eq!(Yankreg::Line("a\nb\n".into()).rows(), vec!["a", "b"]);
    }

    #[test]
    fn host_set_and_last_inserted() {
        let mut r = RegisterStore::new();
        r.set('z', Yankreg::Line("saved\n".into())).unwrap();
        assert_eq!(r.get(Some('Z')).unwrap(), Some(&Yankreg::Line("saved\n".into())));
        r.set_last_inserted("typed".into());
        assert_eq!(r.last_inserted(), Some("typed"));
        assert_eq!(r.get(Some('.')).unwrap(), Some(&ch("typed")));
    }
}
