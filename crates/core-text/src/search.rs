//! Regex search over a buffer.
//!
//! Offsets reported by `regex` are byte based; results are converted back to
//! char positions before they leave this module.

use crate::{Buffer, Position};
use anyhow::Result;
use regex::Regex;

/// A match: where it starts and how many chars it spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    pub pos: Position,
    pub len: usize,
}

/// Pattern matching `word` literally; whole-word boundaries are added on the
/// sides where the word starts or ends with a keyword char.
pub fn word_pattern(word: &str, whole: bool) -> Result<Regex> {
    let escaped = regex::escape(word);
    if !whole {
        return Ok(Regex::new(&escaped)?);
    }
    let starts = word.chars().next().is_some_and(crate::motion::is_word_char);
    let ends = word.chars().last().is_some_and(crate::motion::is_word_char);
    let pattern = format!(
        "{}{}{}",
        if starts { r"\b" } else { "" },
        escaped,
        if ends { r"\b" } else { "" }
    );
    Ok(Regex::new(&pattern)?)
}

/// Search from `from` (exclusive) in the given direction, wrapping around the
/// buffer when `wrap` is set.
pub fn search(
    buf: &Buffer,
    from: Position,
    re: &Regex,
    forward: bool,
    wrap: bool,
) -> Option<SearchMatch> {
    let text = buf.text();
    let from_byte = char_to_byte(&text, buf.offset_of(from));
    let mut matches = re.find_iter(&text).map(|m| (m.start(), m.end()));
    let found = if forward {
        let mut first = None;
        let mut after = None;
        for (s, e) in matches.by_ref() {
            if first.is_none() {
                first = Some((s, e));
            }
            if s > from_byte {
                after = Some((s, e));
                break;
            }
        }
        after.or(if wrap { first } else { None })
    } else {
        let all: Vec<(usize, usize)> = matches.collect();
        all.iter()
            .rev()
            .find(|(s, _)| *s < from_byte)
            .copied()
            .or(if wrap { all.last().copied() } else { None })
    }?;
    let start_char = text[..found.0].chars().count();
    let len = text[found.0..found.1].chars().count();
    Some(SearchMatch {
        pos: buf.position_of(start_char),
        len,
    })
}

fn char_to_byte(text: &str, char_idx: usize) -> usize {
    text.char_indices()
        .nth(char_idx)
        .map(|(b, _)| b)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_word_forward_and_wrap() {
        let b = Buffer::from_str("t", "foo food\nbar foo\n").unwrap();
        let re = word_pattern("foo", true).unwrap();
        let m = search(&b, Position::new(0, 0), &re, true, true).unwrap();
        assert_eq!(m.pos, Position::new(1, 4));
        assert_eq!(m.len, 3);
        let m = search(&b, Position::new(1, 4), &re, true, true).unwrap();
        assert_eq!(m.pos, Position::new(0, 0));
        assert!(search(&b, Position::new(1, 4), &re, true, false).is_none());
    }

    #[test]
    fn backward_search() {
        let b = Buffer::from_str("t", "x.y x.y\n").unwrap();
        let re = word_pattern("x.y", true).unwrap();
        let m = search(&b, Position::new(0, 4), &re, false, true).unwrap();
        assert_eq!(m.pos, Position::new(0, 0));
    }

    #[test]
    fn multibyte_text_maps_back_to_chars() {
        let b = Buffer::from_str("t", "héllo wörld wörld\n").unwrap();
        let re = word_pattern("wörld", true).unwrap();
        let m = search(&b, Position::new(0, 6), &re, true, false).unwrap();
        assert_eq!(m.pos, Position::new(0, 12));
    }
}
