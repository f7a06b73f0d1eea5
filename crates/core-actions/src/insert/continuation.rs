//! Multi-key Insert-mode commands: `CTRL-V` literal entry, `CTRL-K`
//! digraphs, `CTRL-R {reg}` and `CTRL-G {key}`.
//!
//! Each variant consumes keys one at a time until it can hand the controller
//! a finished [`ContinuationStep`]. While one is pending the host must not
//! apply mappings to the keys.

use crate::keys::{CTRL_C, CTRL_O, CTRL_P, CTRL_R, ESC};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Radix {
    Decimal,
    Octal,
    Hex,
    Unicode4,
    Unicode8,
}

impl Radix {
    fn base(self) -> u32 {
        match self {
            Radix::Decimal => 10,
            Radix::Octal => 8,
            Radix::Hex | Radix::Unicode4 | Radix::Unicode8 => 16,
        }
    }

    fn max_digits(self) -> usize {
        match self {
            Radix::Hex => 2,
            Radix::Decimal | Radix::Octal => 3,
            Radix::Unicode4 => 4,
            Radix::Unicode8 => 8,
        }
    }

    fn is_unicode(self) -> bool {
        matches!(self, Radix::Unicode4 | Radix::Unicode8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiteralState {
    radix: Radix,
    prefixed: bool,
    digits: usize,
    value: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    Literal(LiteralState),
    /// After `CTRL-R`; `literally` holds `CTRL-R`, `CTRL-O` or `CTRL-P` once typed.
    Register { literally: Option<char> },
    CtrlG,
    Digraph { first: Option<char> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuationStep {
    NeedMore,
    /// Insert `ch` without interpreting it, then process `refeed` as a fresh key.
    Literal { ch: char, refeed: Option<char> },
    Register { name: char, literally: bool },
    CtrlG(char),
    Cancel,
}

/// A line break can't live inside a line; a literal NL is stored as NUL.
fn storable(c: char) -> char {
    if c == '\n' { '\0' } else { c }
}

impl Continuation {
    pub fn literal() -> Self {
        Continuation::Literal(LiteralState {
            radix: Radix::Decimal,
            prefixed: false,
            digits: 0,
            value: 0,
        })
    }

    pub fn register() -> Self {
        Continuation::Register { literally: None }
    }

    pub fn digraph() -> Self {
        Continuation::Digraph { first: None }
    }

    pub fn step(&mut self, c: char) -> ContinuationStep {
        match self {
            Continuation::Literal(state) => state.step(c),
            Continuation::Register { literally } => {
                if c == ESC || c == CTRL_C {
                    return ContinuationStep::Cancel;
                }
                if literally.is_none() && matches!(c, CTRL_R | CTRL_O | CTRL_P) {
                    *literally = Some(c);
                    return ContinuationStep::NeedMore;
                }
                ContinuationStep::Register {
                    name: c,
                    literally: literally.is_some(),
                }
            }
            Continuation::CtrlG => {
                if c == ESC || c == CTRL_C {
                    ContinuationStep::Cancel
                } else {
                    ContinuationStep::CtrlG(c)
                }
            }
            Continuation::Digraph { first } => {
                if c == ESC || c == CTRL_C {
                    return ContinuationStep::Cancel;
                }
                match *first {
                    None => {
                        *first = Some(c);
                        ContinuationStep::NeedMore
                    }
                    Some(a) => ContinuationStep::Literal {
                        ch: digraph(a, c),
                        refeed: None,
                    },
                }
            }
        }
    }
}

impl LiteralState {
    fn finish(&self) -> char {
        match self.value {
            0 => '\0',
            v => char::from_u32(v).unwrap_or(char::REPLACEMENT_CHARACTER),
        }
    }

    fn step(&mut self, c: char) -> ContinuationStep {
        if self.digits == 0 && !self.prefixed {
            let radix = match c {
                'x' | 'X' => Some(Radix::Hex),
                'o' | 'O' => Some(Radix::Octal),
                'u' => Some(Radix::Unicode4),
                'U' => Some(Radix::Unicode8),
                _ => None,
            };
            if let Some(radix) = radix {
                self.radix = radix;
                self.prefixed = true;
                return ContinuationStep::NeedMore;
            }
        }
        let Some(d) = c.to_digit(self.radix.base()) else {
            // No digits: the key itself goes in and any prefix is dropped.
            if self.digits == 0 {
                return ContinuationStep::Literal {
                    ch: storable(c),
                    refeed: None,
                };
            }
            return ContinuationStep::Literal {
                ch: self.finish(),
                refeed: Some(c),
            };
        };
        self.value = self.value.saturating_mul(self.radix.base()).saturating_add(d);
        if !self.radix.is_unicode() {
            self.value = self.value.min(255);
        }
        self.digits += 1;
        if self.digits >= self.radix.max_digits() {
            return ContinuationStep::Literal {
                ch: self.finish(),
                refeed: None,
            };
        }
        ContinuationStep::NeedMore
    }
}

/// RFC 1345 two-char mnemonics.
const DIGRAPHS: &[(char, char, char)] = &[
    ('a', ':', 'ä'),
    ('o', ':', 'ö'),
    ('u', ':', 'ü'),
    ('e', ':', 'ë'),
    ('i', ':', 'ï'),
    ('A', ':', 'Ä'),
    ('O', ':', 'Ö'),
    ('U', ':', 'Ü'),
    ('s', 's', 'ß'),
    ('a', '\'', 'á'),
    ('e', '\'', 'é'),
    ('i', '\'', 'í'),
    ('o', '\'', 'ó'),
    ('u', '\'', 'ú'),
    ('E', '\'', 'É'),
    ('a', '!', 'à'),
    ('e', '!', 'è'),
    ('i', '!', 'ì'),
    ('o', '!', 'ò'),
    ('u', '!', 'ù'),
    ('a', '>', 'â'),
    ('e', '>', 'ê'),
    ('i', '>', 'î'),
    ('o', '>', 'ô'),
    ('u', '>', 'û'),
    ('c', ',', 'ç'),
    ('C', ',', 'Ç'),
    ('n', '?', 'ñ'),
    ('N', '?', 'Ñ'),
    ('a', 'a', 'å'),
    ('A', 'A', 'Å'),
    ('a', 'e', 'æ'),
    ('A', 'E', 'Æ'),
    ('o', '/', 'ø'),
    ('O', '/', 'Ø'),
    ('a', '*', 'α'),
    ('b', '*', 'β'),
    ('g', '*', 'γ'),
    ('d', '*', 'δ'),
    ('e', '*', 'ε'),
    ('l', '*', 'λ'),
    ('m', '*', 'μ'),
    ('p', '*', 'π'),
    ('s', '*', 'σ'),
    ('w', '*', 'ω'),
    ('E', 'u', '€'),
    ('P', 'd', '£'),
    ('Y', 'e', '¥'),
    ('C', 't', '¢'),
    ('S', 'E', '§'),
    ('C', 'o', '©'),
    ('R', 'g', '®'),
    ('T', 'M', '™'),
    ('D', 'G', '°'),
    ('+', '-', '±'),
    ('*', 'X', '×'),
    ('-', ':', '÷'),
    ('M', 'y', 'µ'),
    ('1', '2', '½'),
    ('1', '4', '¼'),
    ('3', '4', '¾'),
    ('<', '<', '«'),
    ('>', '>', '»'),
    ('!', 'I', '¡'),
    ('?', 'I', '¿'),
    ('-', '>', '→'),
    ('<', '-', '←'),
    ('N', 'S', '\u{a0}'),
    ('O', 'K', '✓'),
    ('X', 'X', '✗'),
];

/// Look up a digraph in either order; unknown pairs yield the second char.
pub fn digraph(a: char, b: char) -> char {
    let find = |x: char, y: char| DIGRAPHS.iter().find(|(p, q, _)| *p == x && *q == y).map(|(_, _, r)| *r);
    find(a, b).or_else(|| find(b, a)).unwrap_or(b)
}
