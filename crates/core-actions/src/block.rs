//! Block (rectangular) geometry and the per-line block edits.
//!
//! [`prepare`] is pure: given one line and the block's virtual column span it
//! reports which chars are covered and how much synthetic padding a tab or a
//! wide char straddling either edge needs. Every block operation recomputes it
//! per line; lines may hold different mixes of tabs and spaces.
//!
//! Line rewrites go through [`write_lines`]: blocks of
//! [`BATCH_MIN_LINES`] or more lines write their middle lines as one buffer
//! mutation.

use core_text::{Buffer, char_width};
use tracing::trace;

/// Blocks at least this tall batch their middle lines into one mutation.
pub const BATCH_MIN_LINES: usize = 5;

/// What the geometry is computed for; a few padding rules differ per operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOp {
    Delete,
    Yank,
    Change,
    Insert,
    Append,
    Replace,
    ShiftLeft,
    ShiftRight,
    Case,
}

/// Virtual column extent of a block, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    pub start_vcol: usize,
    pub end_vcol: usize,
    /// `$` was used: every line extends to its own end.
    pub to_eol: bool,
}

impl BlockSpan {
    pub fn width(&self) -> usize {
        self.end_vcol.saturating_sub(self.start_vcol) + 1
    }
}

/// Geometry of one line under a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockDef {
    /// Char index of the first covered char.
    pub textcol: usize,
    /// Number of covered chars.
    pub textlen: usize,
    pub startspaces: usize,
    pub endspaces: usize,
    pub start_vcol: usize,
    pub end_vcol: usize,
    /// The line ends before the block does.
    pub is_short: bool,
    /// The whole span lies inside one multi-cell char.
    pub is_one_char: bool,
    pub start_char_vcols: usize,
    pub end_char_vcols: usize,
    /// Width and count of the whitespace run right before the block start.
    pub pre_whitesp: usize,
    pub pre_whitesp_c: usize,
}

/// Compute the block geometry for `line`. `is_del` selects the delete-style
/// accounting where a straddling char belongs to the covered text.
pub fn prepare(line: &str, span: &BlockSpan, op: BlockOp, is_del: bool, ts: usize) -> BlockDef {
    let chars: Vec<char> = line.chars().collect();
    let mut bd = BlockDef::default();
    let mut vcol = 0usize;
    let mut idx = 0usize;
    let mut prev_start = 0usize;
    let mut incr = 0usize;

    while vcol < span.start_vcol && idx < chars.len() {
        incr = char_width(chars[idx], vcol, ts);
        vcol += incr;
        if chars[idx] == ' ' || chars[idx] == '\t' {
            bd.pre_whitesp += incr;
            bd.pre_whitesp_c += 1;
        } else {
            bd.pre_whitesp = 0;
            bd.pre_whitesp_c = 0;
        }
        prev_start = idx;
        idx += 1;
    }
    bd.start_vcol = vcol;
    let mut pstart = idx;
    bd.start_char_vcols = incr;

    if bd.start_vcol < span.start_vcol {
        bd.end_vcol = bd.start_vcol;
        bd.is_short = true;
        if !is_del || op == BlockOp::Append {
            bd.endspaces = span.end_vcol - span.start_vcol + 1;
        }
    } else {
        bd.startspaces = bd.start_vcol - span.start_vcol;
        if is_del && bd.startspaces > 0 {
            bd.startspaces = bd.start_char_vcols - bd.startspaces;
        }
        let mut pend = pstart;
        bd.end_vcol = bd.start_vcol;
        if bd.end_vcol > span.end_vcol {
            bd.is_one_char = true;
            match op {
                BlockOp::Insert => bd.endspaces = bd.start_char_vcols - bd.startspaces,
                BlockOp::Append => {
                    bd.startspaces += span.end_vcol - span.start_vcol + 1;
                    bd.endspaces = bd.start_char_vcols.saturating_sub(bd.startspaces);
                }
                _ => {
                    bd.startspaces = span.end_vcol - span.start_vcol + 1;
                    if is_del && op != BlockOp::ShiftLeft {
                        bd.startspaces = bd.start_char_vcols - (bd.start_vcol - span.start_vcol);
                        bd.endspaces = bd.end_vcol - span.end_vcol - 1;
                    }
                }
            }
        } else {
            let mut prev_pend = pend;
            let mut v = bd.end_vcol;
            while v <= span.end_vcol && pend < chars.len() {
                prev_pend = pend;
                incr = char_width(chars[pend], v, ts);
                v += incr;
                pend += 1;
            }
            bd.end_vcol = v;
            if bd.end_vcol <= span.end_vcol
                && (!is_del || op == BlockOp::Append || op == BlockOp::Replace)
            {
                bd.is_short = true;
                bd.endspaces = if op == BlockOp::Append {
                    span.end_vcol - bd.end_vcol + 1
                } else {
                    0
                };
            } else if bd.end_vcol > span.end_vcol {
                bd.endspaces = bd.end_vcol - span.end_vcol - 1;
                if !is_del && bd.endspaces > 0 {
                    bd.endspaces = incr - bd.endspaces;
                    if pend != pstart {
                        pend = prev_pend;
                    }
                }
            }
        }
        bd.end_char_vcols = incr;
        if is_del && bd.startspaces > 0 {
            pstart = prev_start;
        }
        bd.textlen = pend - pstart;
    }
    bd.textcol = pstart;
    bd
}

fn char_slice(chars: &[char], from: usize, to: usize) -> String {
    let to = to.min(chars.len());
    let from = from.min(to);
    chars[from..to].iter().collect()
}

/// Write `lines` over consecutive buffer lines starting at `first`. With
/// `batch` the lines between the first and the last go in as one mutation.
pub fn write_lines(buf: &mut Buffer, first: usize, lines: &[String], batch: bool) {
    let n = lines.len();
    if batch && n >= 3 {
        buf.replace_line(first, &lines[0]);
        buf.replace_lines(first + 1, &lines[1..n - 1]);
        buf.replace_line(first + n - 1, &lines[n - 1]);
    } else {
        for (i, l) in lines.iter().enumerate() {
            buf.replace_line(first + i, l);
        }
    }
    trace!(target: "actions.block", first, lines = n, batch, "write_lines");
}

/// [`write_lines`] with batching chosen by block height.
pub fn apply_line_rewrites(buf: &mut Buffer, first: usize, lines: &[String]) {
    write_lines(buf, first, lines, lines.len() >= BATCH_MIN_LINES);
}

/// Line after removing the block: covered text collapsed to the padding that
/// keeps the surrounding text aligned. `None` when nothing is covered.
pub fn delete_line(line: &str, bd: &BlockDef) -> Option<String> {
    if bd.textlen == 0 {
        return None;
    }
    let chars: Vec<char> = line.chars().collect();
    let mut out = char_slice(&chars, 0, bd.textcol);
    out.push_str(&" ".repeat(bd.startspaces + bd.endspaces));
    out.push_str(&char_slice(&chars, bd.textcol + bd.textlen, chars.len()));
    Some(out)
}

/// Row captured by a block yank.
pub fn yank_row(line: &str, bd: &BlockDef) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = " ".repeat(bd.startspaces);
    out.push_str(&char_slice(&chars, bd.textcol, bd.textcol + bd.textlen));
    out.push_str(&" ".repeat(bd.endspaces));
    out
}

/// Line with every covered cell overwritten by `c`. `None` when nothing is covered.
pub fn replace_line(line: &str, bd: &BlockDef, span: &BlockSpan, c: char) -> Option<String> {
    if bd.textlen == 0 {
        return None;
    }
    let mut numc = span.end_vcol - span.start_vcol + 1;
    if bd.is_short {
        numc = numc.saturating_sub(span.end_vcol - bd.end_vcol + 1);
    }
    let mut endspaces = bd.endspaces;
    if char_width(c, 0, 8) > 1 {
        if numc % 2 == 1 && !bd.is_short {
            endspaces += 1;
        }
        numc /= 2;
    }
    let chars: Vec<char> = line.chars().collect();
    let mut out = char_slice(&chars, 0, bd.textcol);
    out.push_str(&" ".repeat(bd.startspaces));
    out.extend(std::iter::repeat_n(c, numc));
    if !bd.is_short {
        out.push_str(&" ".repeat(endspaces));
        out.push_str(&char_slice(&chars, bd.textcol + bd.textlen, chars.len()));
    }
    Some(out)
}

/// Splice `text` into `line` at the block's left (`insert`) or right edge.
/// `None` when an insert does not reach a short line.
pub fn insert_line(
    line: &str,
    bd: &BlockDef,
    span: &BlockSpan,
    text: &str,
    insert: bool,
) -> Option<String> {
    if bd.is_short && insert {
        return None;
    }
    let chars: Vec<char> = line.chars().collect();
    let (ts_val, mut spaces, offset) = if insert {
        (bd.start_char_vcols, bd.startspaces, bd.textcol)
    } else if !bd.is_short {
        let spaces = if bd.endspaces > 0 {
            bd.end_char_vcols.saturating_sub(bd.endspaces)
        } else {
            0
        };
        let offset = (bd.textcol + bd.textlen).saturating_sub(usize::from(spaces != 0));
        (bd.end_char_vcols, spaces, offset)
    } else {
        let spaces = if span.to_eol {
            0
        } else {
            (span.end_vcol + 1).saturating_sub(bd.end_vcol)
        };
        (bd.end_char_vcols, spaces, bd.textcol + bd.textlen)
    };
    // Never pad in the middle of a multi-cell char that is not a tab.
    if spaces > 0 && !bd.is_short && chars.get(offset).is_some_and(|c| *c != '\t') {
        spaces = 0;
    }
    let mut out = char_slice(&chars, 0, offset);
    out.push_str(&" ".repeat(spaces));
    out.push_str(text);
    let mut rest = offset;
    if spaces > 0 && !bd.is_short && chars.get(offset) == Some(&'\t') {
        out.push_str(&" ".repeat(ts_val.saturating_sub(spaces)));
        rest += 1;
    }
    out.push_str(&char_slice(&chars, rest, chars.len()));
    Some(out)
}

/// Shift the text inside the block right by `total` cells, re-tabbing the
/// whitespace in front of it.
pub fn shift_right_line(line: &str, span: &BlockSpan, total: usize, ts: usize, expandtab: bool) -> Option<String> {
    let bd = prepare(line, span, BlockOp::ShiftRight, true, ts);
    if bd.is_short {
        return None;
    }
    let chars: Vec<char> = line.chars().collect();
    let mut total = total + bd.pre_whitesp;
    let mut ws_vcol = bd.start_vcol - bd.pre_whitesp;
    let mut textstart = bd.textcol;
    let split_tab = bd.startspaces > 0 && chars.get(bd.textcol) == Some(&'\t');
    if split_tab {
        textstart += 1;
    } else if bd.startspaces > 0 {
        // A wide char straddles the block start; shift from its own column.
        ws_vcol = 0;
    }
    let mut vcol = bd.start_vcol;
    while let Some(c) = chars.get(textstart).filter(|c| **c == ' ' || **c == '\t') {
        let w = char_width(*c, vcol, ts);
        total += w;
        vcol += w;
        textstart += 1;
    }
    let ts = ts.max(1);
    let (tabs, spaces) = if expandtab {
        (0, total)
    } else {
        let tabs = (ws_vcol % ts + total) / ts;
        if tabs > 0 {
            (tabs, (ws_vcol % ts + total) % ts)
        } else {
            (0, total)
        }
    };
    let textcol = (bd.textcol + usize::from(split_tab)).saturating_sub(bd.pre_whitesp_c);
    let mut out = char_slice(&chars, 0, textcol);
    out.push_str(&"\t".repeat(tabs));
    out.push_str(&" ".repeat(spaces));
    out.push_str(&char_slice(&chars, textstart, chars.len()));
    Some(out)
}

/// Shift the text inside the block left by up to `total` cells, consuming only
/// whitespace that lies inside the block.
pub fn shift_left_line(line: &str, span: &BlockSpan, total: usize, ts: usize) -> Option<String> {
    let bd = prepare(line, span, BlockOp::ShiftLeft, true, ts);
    if bd.is_short {
        return None;
    }
    let chars: Vec<char> = line.chars().collect();
    let mut non_white = bd.textcol;
    if bd.startspaces > 0 {
        non_white += 1;
    }
    let mut non_white_col = bd.start_vcol;
    while let Some(c) = chars.get(non_white).filter(|c| **c == ' ' || **c == '\t') {
        non_white_col += char_width(*c, non_white_col, ts);
        non_white += 1;
    }
    let block_space_width = non_white_col.saturating_sub(span.start_vcol);
    let shift_amount = block_space_width.min(total);
    let destination_col = non_white_col - shift_amount;

    let mut copy_end = bd.textcol;
    let mut copy_width = bd.start_vcol;
    if bd.startspaces > 0 {
        copy_width -= bd.start_char_vcols;
    }
    while copy_width < destination_col {
        let Some(c) = chars.get(copy_end) else { break };
        let w = char_width(*c, copy_width, ts);
        if copy_width + w > destination_col {
            break;
        }
        copy_width += w;
        copy_end += 1;
    }
    let fill = destination_col - copy_width;
    let mut out = char_slice(&chars, 0, copy_end);
    out.push_str(&" ".repeat(fill));
    out.push_str(&char_slice(&chars, non_white, chars.len()));
    Some(out)
}
