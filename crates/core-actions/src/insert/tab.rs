//! `<Tab>` under 'expandtab', 'softtabstop' and 'smarttab'.
//!
//! All the work happens on a private copy of the line so the buffer sees a
//! single write no matter how many spaces get folded back into tabs.

use super::replace_stack::ReplaceStack;
use core_text::char_width;
use core_text::motion::is_blank;

#[derive(Debug, Clone, Copy)]
pub(super) struct TabOptions {
    pub ts: usize,
    pub sw: usize,
    pub sts: usize,
    pub expandtab: bool,
    pub smarttab: bool,
}

impl TabOptions {
    /// A plain tab char is inserted.
    pub fn is_literal(&self, in_indent: bool) -> bool {
        !self.expandtab && !(self.smarttab && in_indent && self.sw != self.ts) && self.sts == 0
    }

    fn folds(&self, in_indent: bool) -> bool {
        !self.expandtab && (self.sts > 0 || (self.smarttab && in_indent))
    }
}

fn vcol_at(line: &[char], col: usize, ts: usize) -> usize {
    let mut vcol = 0;
    for c in line.iter().take(col) {
        vcol += char_width(*c, vcol, ts);
    }
    vcol
}

/// Result of [`insert_soft_tab`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct SoftTab {
    pub col: usize,
    /// First column rewritten by folding spaces into tabs.
    pub changed_from: Option<usize>,
}

/// Insert the spaces for one `<Tab>` at `col`, then fold whitespace before
/// the cursor into tabs where 'expandtab' is off. In Replace mode the first
/// space overwrites the char under the cursor and `replace` records it;
/// folding never touches text before `insstart_col`.
pub(super) fn insert_soft_tab(
    line: &mut Vec<char>,
    col: usize,
    o: &TabOptions,
    in_indent: bool,
    mut replace: Option<&mut ReplaceStack>,
    insstart_col: Option<usize>,
) -> SoftTab {
    let ts = o.ts.max(1);
    let width = if o.smarttab && in_indent {
        o.sw
    } else if o.sts != 0 {
        o.sts
    } else {
        ts
    }
    .max(1);
    let n = width - vcol_at(line, col, ts) % width;

    let mut col = col;
    match replace.as_deref_mut() {
        Some(stack) => {
            stack.push_nul();
            if col < line.len() {
                stack.push(line[col]);
                line[col] = ' ';
            } else {
                line.insert(col, ' ');
            }
        }
        None => line.insert(col, ' '),
    }
    col += 1;
    for _ in 1..n {
        line.insert(col, ' ');
        col += 1;
        if let Some(stack) = replace.as_deref_mut() {
            stack.push_nul();
        }
    }
    if !o.folds(in_indent) {
        return SoftTab { col, changed_from: None };
    }

    let mut fcol = col;
    while fcol > 0 && is_blank(line[fcol - 1]) {
        fcol -= 1;
    }
    if replace.is_some()
        && let Some(start) = insstart_col
    {
        fcol = fcol.max(start);
    }
    let want = vcol_at(line, col, ts);
    let mut vcol = vcol_at(line, fcol, ts);
    let mut changed_from = None;
    while fcol < line.len() && is_blank(line[fcol]) {
        let w = char_width('\t', vcol, ts);
        if vcol + w > want {
            break;
        }
        if line[fcol] != '\t' {
            line[fcol] = '\t';
            changed_from.get_or_insert(fcol);
        }
        fcol += 1;
        vcol += w;
    }
    if changed_from.is_some() {
        let mut repl_off = 0;
        while vcol < want && fcol < line.len() && line[fcol] == ' ' {
            vcol += 1;
            fcol += 1;
            repl_off += 1;
        }
        let removed = col.saturating_sub(fcol);
        if removed > 0 {
            line.drain(fcol..col);
            if let Some(stack) = replace.as_deref_mut() {
                for _ in 0..removed {
                    stack.join(repl_off);
                }
            }
        }
        col -= removed;
    }
    SoftTab { col, changed_from }
}
