//! Shift (`<`, `>`) and re-indent (`=`).

use super::{OperatorArgs, cursor_to_first_non_blank, set_change_marks};
use crate::block;
use crate::error::{EngineError, EngineResult};
use crate::motion::MotionType;
use core_state::EditorContext;
use core_text::width::{indent_string, indent_width};
use core_text::{Position, motion::is_blank};
use tracing::trace;

/// Replace the leading whitespace of `line` with an indent `width` cells wide.
/// Returns the change in char length of the line.
pub(crate) fn set_indent(ctx: &mut EditorContext, line: usize, width: usize) -> isize {
    let text = ctx.buffer.line_text(line);
    let old_len = text.chars().take_while(|c| is_blank(*c)).count();
    let indent = indent_string(width, ctx.ts(), ctx.options.editor.expandtab);
    let new_len = indent.chars().count();
    let rest: String = text.chars().skip(old_len).collect();
    let updated = format!("{indent}{rest}");
    if updated != text {
        ctx.buffer.replace_line(line, &updated);
    }
    new_len as isize - old_len as isize
}

/// New indent width after shifting `current` by `amount` shiftwidths.
pub(crate) fn shifted_indent(current: usize, sw: usize, left: bool, amount: usize, round: bool) -> usize {
    let sw = sw.max(1);
    if round {
        let mut amount = amount;
        let mut i = current / sw;
        if left && current % sw != 0 {
            amount = amount.saturating_sub(1);
        }
        if left {
            i = i.saturating_sub(amount);
        } else {
            i += amount;
        }
        i * sw
    } else if left {
        current.saturating_sub(sw * amount)
    } else {
        current + sw * amount
    }
}

/// Shift one line, honouring `shiftround`. Empty lines are left alone.
pub(crate) fn shift_line(ctx: &mut EditorContext, line: usize, left: bool, amount: usize, round: bool) -> isize {
    let text = ctx.buffer.line_text(line);
    if text.is_empty() {
        return 0;
    }
    let current = indent_width(&text, ctx.ts());
    let target = shifted_indent(current, ctx.sw(), left, amount, round);
    set_indent(ctx, line, target)
}

pub fn op_shift(ctx: &mut EditorContext, args: &OperatorArgs) -> EngineResult<()> {
    let left = args.op == super::OperatorKind::ShiftLeft;
    let amount = if args.is_visual { args.count.max(1) } else { 1 };
    let round = ctx.options.editor.shiftround;
    trace!(target: "actions.operator", left, amount, lines = args.line_count, block = args.block.is_some(), "shift");
    if args.motion == MotionType::Block {
        let span = args
            .block
            .ok_or_else(|| EngineError::Internal("block range without span".into()))?;
        let total = amount * ctx.sw();
        let ts = ctx.ts();
        let expandtab = ctx.options.editor.expandtab;
        let lines: Vec<String> = (args.start.line..=args.end.line)
            .map(|l| {
                let text = ctx.buffer.line_text(l);
                if text.is_empty() {
                    return text;
                }
                let shifted = if left {
                    block::shift_left_line(&text, &span, total, ts)
                } else {
                    block::shift_right_line(&text, &span, total, ts, expandtab)
                };
                shifted.unwrap_or(text)
            })
            .collect();
        block::apply_line_rewrites(&mut ctx.buffer, args.start.line, &lines);
        ctx.cursor = Position::new(args.start.line, args.start.col);
        ctx.clamp_cursor(false);
        ctx.update_curswant();
    } else {
        for line in args.start.line..=args.end.line {
            shift_line(ctx, line, left, amount, round);
        }
        cursor_to_first_non_blank(ctx, args.start.line);
    }
    set_change_marks(
        ctx,
        Position::new(args.start.line, 0),
        Position::new(args.end.line, ctx.buffer.line_len(args.end.line)),
    );
    Ok(())
}

/// Re-indent each line to the indent of the closest non-blank line above it.
pub fn op_reindent(ctx: &mut EditorContext, args: &OperatorArgs) -> EngineResult<()> {
    let ts = ctx.ts();
    let mut reference = (0..args.start.line)
        .rev()
        .map(|l| ctx.buffer.line_text(l))
        .find(|t| !t.trim().is_empty())
        .map(|t| indent_width(&t, ts))
        .unwrap_or(0);
    for line in args.start.line..=args.end.line {
        let text = ctx.buffer.line_text(line);
        if text.trim().is_empty() {
            continue;
        }
        set_indent(ctx, line, reference);
        reference = indent_width(&ctx.buffer.line_text(line), ts);
    }
    trace!(target: "actions.operator", start = args.start.line, end = args.end.line, "reindent");
    cursor_to_first_non_blank(ctx, args.start.line);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::{OperatorKind, combine};
    use core_config::Options;
    use core_text::Buffer;
    use pretty_assertions::assert_eq;

    fn ctx(text: &str) -> EditorContext {
        EditorContext::new(Buffer::from_str("t", text).unwrap(), Options::default())
    }

    fn lines(c: &mut EditorContext, op: OperatorKind, first: usize, last: usize) {
        let a = OperatorArgs::new(op, Position::new(first, 0));
        combine(c, a, Position::new(last, 0), false, MotionType::Line).unwrap();
    }

    #[test]
    fn rounding_rules() {
        assert_eq!(shifted_indent(5, 4, false, 1, true), 8);
        assert_eq!(shifted_indent(5, 4, true, 1, true), 4);
        assert_eq!(shifted_indent(5, 4, true, 1, false), 1);
        assert_eq!(shifted_indent(2, 4, true, 1, false), 0);
        assert_eq!(shifted_indent(5, 4, false, 1, false), 9);
    }

    #[test]
    fn shift_right_then_left_restores() {
        let mut c = ctx("a\n\nb\n");
        c.options.editor.shiftwidth = 4;
        c.options.editor.expandtab = true;
        lines(&mut c, OperatorKind::ShiftRight, 0, 2);
        assert_eq!(c.buffer.text(), "    a\n\n    b\n");
        assert_eq!(c.cursor, Position::new(0, 4));
        lines(&mut c, OperatorKind::ShiftLeft, 0, 2);
        assert_eq!(c.buffer.text(), "a\n\nb\n");
    }

    #[test]
    fn shift_uses_tabs_without_expandtab() {
        let mut c = ctx("x\n");
        c.options.editor.shiftwidth = 8;
        lines(&mut c, OperatorKind::ShiftRight, 0, 0);
        assert_eq!(c.buffer.text(), "\tx\n");
    }

    #[test]
    fn reindent_copies_previous_indent() {
        let mut c = ctx("  top\nx\n\n      y\n");
        lines(&mut c, OperatorKind::Indent, 1, 3);
        assert_eq!(c.buffer.text(), "  top\n  x\n\n  y\n");
        assert_eq!(c.cursor, Position::new(1, 2));
    }
}
