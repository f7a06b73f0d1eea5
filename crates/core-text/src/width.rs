//! Virtual column arithmetic.
//!
//! A virtual column is the on-screen cell index of a char once tabs are
//! expanded to the next multiple of `tabstop`. Wide (East Asian / emoji) chars
//! take two cells and ASCII control chars are displayed as `^X` (two cells).
//! Every block operation and every vertical motion goes through these helpers
//! so that width decisions stay in one place.

use unicode_width::UnicodeWidthChar;

/// Cells occupied by `c` when it starts at virtual column `vcol`.
pub fn char_width(c: char, vcol: usize, tabstop: usize) -> usize {
    match c {
        '\t' => {
            let ts = tabstop.max(1);
            ts - vcol % ts
        }
        c if (c as u32) < 0x20 || c == '\u{7f}' => 2,
        c => c.width().unwrap_or(1),
    }
}

/// Start virtual column of the char at `col` (or of the end of line when `col` is past it).
pub fn vcol_of(line: &str, col: usize, tabstop: usize) -> usize {
    let mut vcol = 0;
    for c in line.chars().take(col) {
        vcol += char_width(c, vcol, tabstop);
    }
    vcol
}

/// `(start, end)` virtual columns covered by the char at `col`, end inclusive.
/// Past the end of the line both values equal the line width.
pub fn vcol_span(line: &str, col: usize, tabstop: usize) -> (usize, usize) {
    let mut vcol = 0;
    for (i, c) in line.chars().enumerate() {
        let w = char_width(c, vcol, tabstop);
        if i == col {
            return (vcol, vcol + w.max(1) - 1);
        }
        vcol += w;
    }
    (vcol, vcol)
}

/// Total display width of a line.
pub fn line_width(line: &str, tabstop: usize) -> usize {
    string_width_from(line, 0, tabstop)
}

/// Width of `s` when it starts at virtual column `start`.
pub fn string_width_from(s: &str, start: usize, tabstop: usize) -> usize {
    let mut vcol = start;
    for c in s.chars() {
        vcol += char_width(c, vcol, tabstop);
    }
    vcol - start
}

/// Char index whose cells contain `vcol`; the line length when `vcol` lies past the end.
pub fn col_for_vcol(line: &str, vcol: usize, tabstop: usize) -> usize {
    let mut cur = 0;
    for (i, c) in line.chars().enumerate() {
        let w = char_width(c, cur, tabstop);
        if vcol < cur + w.max(1) {
            return i;
        }
        cur += w;
    }
    line.chars().count()
}

/// Whitespace string reaching `width` cells, using tabs unless `expandtab`.
pub fn indent_string(width: usize, tabstop: usize, expandtab: bool) -> String {
    let ts = tabstop.max(1);
    if expandtab {
        return " ".repeat(width);
    }
    let mut s = "\t".repeat(width / ts);
    s.push_str(&" ".repeat(width % ts));
    s
}

/// Width of the leading whitespace of `line`.
pub fn indent_width(line: &str, tabstop: usize) -> usize {
    let mut vcol = 0;
    for c in line.chars() {
        if c != ' ' && c != '\t' {
            break;
        }
        vcol += char_width(c, vcol, tabstop);
    }
    vcol
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_width_depends_on_column() {
        assert_eq!(char_width('\t', 0, 8), 8);
        assert_eq!(char_width('\t', 3, 8), 5);
        assert_eq!(char_width('\t', 3, 4), 1);
        assert_eq!(char_width('\t', 3, 0), 1);
    }

    #[test]
    fn wide_and_control_chars() {
        assert_eq!(char_width('界', 0, 8), 2);
        assert_eq!(char_width('\u{1}', 0, 8), 2);
        assert_eq!(char_width('a', 0, 8), 1);
    }

    #[test]
    fn spans_and_lookup() {
        let line = "a\tb";
        assert_eq!(vcol_span(line, 1, 8), (1, 7));
        assert_eq!(vcol_of(line, 2, 8), 8);
        assert_eq!(col_for_vcol(line, 5, 8), 1);
        assert_eq!(col_for_vcol(line, 8, 8), 2);
        assert_eq!(col_for_vcol(line, 30, 8), 3);
        assert_eq!(line_width(line, 8), 9);
    }

    #[test]
    fn indent_helpers() {
        assert_eq!(indent_string(10, 8, false), "\t  ");
        assert_eq!(indent_string(3, 8, true), "   ");
        assert_eq!(indent_width("\t  x", 8), 10);
        assert_eq!(indent_width("x", 8), 0);
    }
}
