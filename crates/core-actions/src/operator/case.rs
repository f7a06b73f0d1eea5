//! Case operators (`g~`, `gu`, `gU`, `g?`), `~` and the replace commands.

use super::{OperatorArgs, OperatorKind, check_guard, set_change_marks, yank};
use crate::block::{self, BlockOp};
use crate::error::{EngineError, EngineResult};
use crate::motion::MotionType;
use core_state::EditorContext;
use core_text::Position;
use core_text::motion::is_blank;
use core_text::width::{indent_string, indent_width};
use tracing::trace;

fn single(mut it: impl Iterator<Item = char>, fallback: char) -> char {
    match (it.next(), it.next()) {
        (Some(c), None) => c,
        _ => fallback,
    }
}

fn rot13(c: char) -> char {
    match c {
        'a'..='z' => (((c as u8 - b'a') + 13) % 26 + b'a') as char,
        'A'..='Z' => (((c as u8 - b'A') + 13) % 26 + b'A') as char,
        _ => c,
    }
}

/// Apply a case operator to one char. Conversions that would change the
/// number of chars leave the char alone.
pub(crate) fn convert(c: char, op: OperatorKind) -> char {
    match op {
        OperatorKind::ToggleCase if c.is_lowercase() => single(c.to_uppercase(), c),
        OperatorKind::ToggleCase if c.is_uppercase() => single(c.to_lowercase(), c),
        OperatorKind::UpperCase => single(c.to_uppercase(), c),
        OperatorKind::LowerCase => single(c.to_lowercase(), c),
        OperatorKind::Rot13 => rot13(c),
        _ => c,
    }
}

fn map_range(ctx: &mut EditorContext, from: usize, to: usize, f: impl Fn(char) -> char) -> bool {
    let old = ctx.buffer.slice(from, to);
    let new: String = old.chars().map(|c| if c == '\n' { c } else { f(c) }).collect();
    if new == old {
        return false;
    }
    ctx.buffer.replace_range(from, to, &new);
    true
}

pub fn op_case(ctx: &mut EditorContext, args: &OperatorArgs) -> EngineResult<()> {
    let op = args.op;
    let changed = match args.motion {
        MotionType::Block => {
            let span = args
                .block
                .ok_or_else(|| EngineError::Internal("block range without span".into()))?;
            let ts = ctx.ts();
            let mut changed = false;
            let lines: Vec<String> = (args.start.line..=args.end.line)
                .map(|l| {
                    let text = ctx.buffer.line_text(l);
                    let bd = block::prepare(&text, &span, BlockOp::Case, false, ts);
                    let out: String = text
                        .chars()
                        .enumerate()
                        .map(|(i, c)| {
                            if i >= bd.textcol && i < bd.textcol + bd.textlen {
                                convert(c, op)
                            } else {
                                c
                            }
                        })
                        .collect();
                    changed |= out != text;
                    out
                })
                .collect();
            if changed {
                block::apply_line_rewrites(&mut ctx.buffer, args.start.line, &lines);
            }
            changed
        }
        MotionType::Line => {
            let from = ctx.buffer.line_start(args.start.line);
            let to = ctx.buffer.line_end(args.end.line);
            map_range(ctx, from, to, |c| convert(c, op))
        }
        MotionType::Char => {
            let (from, to) = yank::char_range(ctx, args.start, args.end, args.inclusive);
            map_range(ctx, from, to, |c| convert(c, op))
        }
    };
    trace!(target: "actions.operator", op = op.name(), changed, "case");
    set_change_marks(ctx, args.start, args.end);
    ctx.cursor = if args.motion == MotionType::Block { args.start } else { args.cursor };
    ctx.clamp_cursor(false);
    ctx.update_curswant();
    Ok(())
}

/// Visual `r{char}`: overwrite every selected char.
pub fn op_replace(ctx: &mut EditorContext, args: &OperatorArgs) -> EngineResult<()> {
    let c = args.replace_char.ok_or(EngineError::Beep)?;
    if c == '\r' || c == '\n' {
        return Err(EngineError::Beep);
    }
    match args.motion {
        MotionType::Block => {
            let span = args
                .block
                .ok_or_else(|| EngineError::Internal("block range without span".into()))?;
            let ts = ctx.ts();
            let lines: Vec<String> = (args.start.line..=args.end.line)
                .map(|l| {
                    let text = ctx.buffer.line_text(l);
                    let bd = block::prepare(&text, &span, BlockOp::Replace, true, ts);
                    block::replace_line(&text, &bd, &span, c).unwrap_or(text)
                })
                .collect();
            block::apply_line_rewrites(&mut ctx.buffer, args.start.line, &lines);
        }
        MotionType::Line => {
            let from = ctx.buffer.line_start(args.start.line);
            let to = ctx.buffer.line_end(args.end.line);
            map_range(ctx, from, to, |_| c);
        }
        MotionType::Char => {
            let (from, to) = yank::char_range(ctx, args.start, args.end, args.inclusive);
            map_range(ctx, from, to, |_| c);
        }
    }
    set_change_marks(ctx, args.start, args.end);
    ctx.cursor = args.start;
    ctx.clamp_cursor(false);
    ctx.update_curswant();
    Ok(())
}

/// Normal-mode `~`: toggle the case of `count` chars and move past them.
pub fn swap_chars(ctx: &mut EditorContext, count: usize) -> EngineResult<()> {
    let line = ctx.cursor.line;
    let len = ctx.buffer.line_len(line);
    if len == 0 {
        return Err(EngineError::Beep);
    }
    check_guard(ctx, line, line)?;
    let col = ctx.cursor.col.min(len - 1);
    let end = (col + count.max(1)).min(len);
    let from = ctx.buffer.offset_of(Position::new(line, col));
    let to = ctx.buffer.offset_of(Position::new(line, end));
    ctx.begin_change();
    map_range(ctx, from, to, |c| convert(c, OperatorKind::ToggleCase));
    ctx.end_change();
    set_change_marks(ctx, Position::new(line, col), Position::new(line, end - 1));
    ctx.cursor = Position::new(line, end);
    ctx.clamp_cursor(false);
    ctx.update_curswant();
    Ok(())
}

/// Normal-mode `r{char}`. A line break replaces all `count` chars with one
/// split, carrying the auto-indent onto the new line.
pub fn replace_chars(ctx: &mut EditorContext, c: char, count: usize) -> EngineResult<()> {
    let count = count.max(1);
    let line = ctx.cursor.line;
    let text = ctx.buffer.line_text(line);
    let chars: Vec<char> = text.chars().collect();
    let col = ctx.cursor.col;
    if col + count > chars.len() {
        return Err(EngineError::Beep);
    }
    check_guard(ctx, line, line)?;
    ctx.begin_change();
    if c == '\r' || c == '\n' {
        let head: String = chars[..col].iter().collect();
        let tail: String = chars[col + count..].iter().collect();
        let (indent, tail) = if ctx.options.editor.autoindent {
            let width = indent_width(&text, ctx.ts());
            let indent = indent_string(width, ctx.ts(), ctx.options.editor.expandtab);
            (indent, tail.trim_start_matches(is_blank).to_string())
        } else {
            (String::new(), tail)
        };
        let indent_len = indent.chars().count();
        ctx.buffer.replace_line(line, &head);
        ctx.buffer.insert_lines(line + 1, &[format!("{indent}{tail}")]);
        ctx.cursor = Position::new(line + 1, indent_len);
    } else {
        let from = ctx.buffer.offset_of(Position::new(line, col));
        let replacement: String = std::iter::repeat_n(c, count).collect();
        ctx.buffer.replace_range(from, from + count, &replacement);
        ctx.cursor = Position::new(line, col + count - 1);
    }
    ctx.end_change();
    trace!(target: "actions.dispatch", ch = %c, count, "replace_chars");
    set_change_marks(ctx, Position::new(line, col), ctx.cursor);
    ctx.clamp_cursor(false);
    ctx.update_curswant();
    Ok(())
}
