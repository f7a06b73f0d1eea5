//! Delete and change, plus the set-up half of block Insert/Append.

use super::{OperatorArgs, OperatorEffect, OperatorKind, cursor_to_first_non_blank, set_change_marks, yank};
use crate::block::{self, BlockOp, BlockSpan};
use crate::error::{EngineError, EngineResult};
use crate::insert::{BlockInsert, BlockInsertKind, InsertKind, InsertRequest};
use crate::motion::MotionType;
use core_state::EditorContext;
use core_text::Position;
use core_text::motion::{first_non_blank, is_blank};
use tracing::{debug, trace};

fn span_of(args: &OperatorArgs) -> EngineResult<BlockSpan> {
    args.block
        .ok_or_else(|| EngineError::Internal("block range without span".into()))
}

/// A multi-line char-wise `d` that leaves only blanks after its end and starts
/// inside the indentation deletes whole lines instead.
fn promoted_to_lines(ctx: &EditorContext, args: &OperatorArgs) -> bool {
    if args.motion != MotionType::Char
        || args.is_visual
        || args.forced.is_some()
        || args.line_count <= 1
        || args.op != OperatorKind::Delete
    {
        return false;
    }
    let end_line = ctx.buffer.line_text(args.end.line);
    let skip = args.end.col + usize::from(args.inclusive && args.end.col < end_line.chars().count());
    let rest_blank = end_line.chars().skip(skip).all(is_blank);
    let start_line = ctx.buffer.line_text(args.start.line);
    let indent = start_line.chars().take_while(|c| is_blank(*c)).count();
    rest_blank && args.start.col <= indent
}

/// Store what is about to be deleted.
fn store_deleted(ctx: &mut EditorContext, args: &OperatorArgs, kind: MotionType) -> EngineResult<()> {
    let mut view = args.clone();
    view.motion = kind;
    if kind == MotionType::Line {
        view.start.col = 0;
        view.end.col = ctx.buffer.line_len(view.end.line);
    }
    let reg = yank::range_content(ctx, &view)?;
    let use_ring = kind == MotionType::Line || args.line_count > 1 || args.use_reg_one;
    ctx.registers.write_delete(args.register, reg, use_ring)?;
    Ok(())
}

/// Remove the block from every line it covers. Returns the cursor column on
/// the first line.
fn delete_block(ctx: &mut EditorContext, args: &OperatorArgs, span: &BlockSpan) -> usize {
    let ts = ctx.ts();
    let mut col = args.start.col;
    let mut lines = Vec::with_capacity(args.line_count);
    for l in args.start.line..=args.end.line {
        let text = ctx.buffer.line_text(l);
        let bd = block::prepare(&text, span, BlockOp::Delete, true, ts);
        if l == args.start.line && bd.textlen > 0 {
            col = bd.textcol + bd.startspaces;
        }
        lines.push(block::delete_line(&text, &bd).unwrap_or(text));
    }
    block::apply_line_rewrites(&mut ctx.buffer, args.start.line, &lines);
    col
}

/// Delete a normalised range, storing the text in a register first.
pub fn op_delete(ctx: &mut EditorContext, args: &OperatorArgs) -> EngineResult<()> {
    let mut kind = args.motion;
    if promoted_to_lines(ctx, args) {
        debug!(target: "actions.operator", start_line = args.start.line, end_line = args.end.line, "delete_promoted_linewise");
        kind = MotionType::Line;
    }
    store_deleted(ctx, args, kind)?;
    match kind {
        MotionType::Line => {
            ctx.buffer.delete_lines(args.start.line, args.end.line);
            cursor_to_first_non_blank(ctx, args.start.line);
        }
        MotionType::Char => {
            let (from, to) = yank::char_range(ctx, args.start, args.end, args.inclusive);
            ctx.buffer.delete_range(from, to);
            ctx.cursor = args.start;
            ctx.clamp_cursor(false);
            ctx.update_curswant();
        }
        MotionType::Block => {
            let span = span_of(args)?;
            let col = delete_block(ctx, args, &span);
            ctx.cursor = Position::new(args.start.line, col);
            ctx.clamp_cursor(false);
            ctx.update_curswant();
        }
    }
    set_change_marks(ctx, ctx.cursor, ctx.cursor);
    trace!(target: "actions.operator", kind = ?kind, line = ctx.cursor.line, col = ctx.cursor.col, "delete");
    Ok(())
}

/// Delete the range and continue in Insert mode. The undo transaction opened
/// by the caller stays open for the insert session.
pub fn op_change(ctx: &mut EditorContext, args: &OperatorArgs) -> EngineResult<OperatorEffect> {
    store_deleted(ctx, args, args.motion)?;
    let mut request = InsertRequest::new(InsertKind::Insert, 'c', 1);
    request.owns_transaction = true;
    match args.motion {
        MotionType::Line => {
            if args.line_count > 1 {
                ctx.buffer.delete_lines(args.start.line + 1, args.end.line);
            }
            let line = ctx.buffer.line_text(args.start.line);
            let col = if ctx.options.editor.autoindent {
                let col = first_non_blank(&line);
                request.did_ai = true;
                request.ai_col = col;
                col
            } else {
                0
            };
            let kept: String = line.chars().take(col).collect();
            ctx.buffer.replace_line(args.start.line, &kept);
            ctx.cursor = Position::new(args.start.line, col);
        }
        MotionType::Char => {
            let (from, to) = yank::char_range(ctx, args.start, args.end, args.inclusive);
            ctx.buffer.delete_range(from, to);
            ctx.cursor = args.start;
            ctx.clamp_cursor(true);
        }
        MotionType::Block => {
            let span = span_of(args)?;
            let col = delete_block(ctx, args, &span);
            ctx.cursor = Position::new(args.start.line, col);
            ctx.clamp_cursor(true);
            request.block = Some(BlockInsert {
                kind: BlockInsertKind::Change,
                span,
                first: args.start.line,
                last: args.end.line,
                textcol: ctx.cursor.col,
                textlen: 0,
                pre_textlen: ctx.buffer.line_len(args.start.line),
                start_col: ctx.cursor.col,
            });
        }
    }
    ctx.update_curswant();
    set_change_marks(ctx, ctx.cursor, ctx.cursor);
    trace!(target: "actions.operator", kind = ?args.motion, did_ai = request.did_ai, "change");
    Ok(OperatorEffect::Insert(request))
}

/// Visual-block `I` and `A`: position the cursor on the first line and hand
/// the block geometry to the insert session, which replicates the typed text
/// when it ends.
pub fn op_block_insert(ctx: &mut EditorContext, args: &OperatorArgs) -> EngineResult<OperatorEffect> {
    let span = span_of(args)?;
    let append = args.op == OperatorKind::Append;
    let ts = ctx.ts();
    let first = args.start.line;
    let line = ctx.buffer.line_text(first);
    let op = if append { BlockOp::Append } else { BlockOp::Insert };
    let mut bd = block::prepare(&line, &span, op, true, ts);
    let len = line.chars().count();
    let from = bd.textcol + if append { bd.textlen } else { 0 };
    let pre_textlen = len.saturating_sub(from);

    let col = if append {
        let mut col = (bd.textcol + bd.textlen).min(len);
        if bd.is_short && !span.to_eol && bd.endspaces > 0 {
            let padded = format!("{line}{}", " ".repeat(bd.endspaces));
            ctx.buffer.replace_line(first, &padded);
            col = padded.chars().count();
            bd.textlen += bd.endspaces;
        }
        col
    } else {
        args.start.col.min(len)
    };
    ctx.cursor = Position::new(first, col);
    ctx.update_curswant();

    let kind = if append { BlockInsertKind::Append } else { BlockInsertKind::Insert };
    let mut request = InsertRequest::new(InsertKind::Insert, if append { 'A' } else { 'I' }, 1);
    request.owns_transaction = true;
    request.block = Some(BlockInsert {
        kind,
        span,
        first,
        last: args.end.line,
        textcol: bd.textcol,
        textlen: bd.textlen,
        pre_textlen,
        start_col: args.start.col,
    });
    trace!(target: "actions.block", append, textcol = bd.textcol, textlen = bd.textlen, pre_textlen, "block_insert_start");
    Ok(OperatorEffect::Insert(request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::{combine, normalize};
    use core_config::Options;
    use core_state::Yankreg;
    use core_text::Buffer;
    use pretty_assertions::assert_eq;

    fn ctx(text: &str) -> EditorContext {
        EditorContext::new(Buffer::from_str("t", text).unwrap(), Options::default())
    }

    fn run(c: &mut EditorContext, op: OperatorKind, from: Position, to: Position, inclusive: bool, kind: MotionType) -> OperatorEffect {
        let a = OperatorArgs::new(op, from);
        combine(c, a, to, inclusive, kind).unwrap()
    }

    #[test]
    fn word_delete_on_first_line() {
        let mut c = ctx("abc\ndef\nghi\n");
        // `dw` on the last word of a line stops at the line end.
        run(&mut c, OperatorKind::Delete, Position::new(0, 0), Position::new(0, 3), false, MotionType::Char);
        assert_eq!(c.buffer.text(), "\ndef\nghi\n");
        assert_eq!(c.registers.get(None).unwrap(), Some(&Yankreg::Char("abc".into())));
        assert_eq!(c.cursor, Position::new(0, 0));
    }

    #[test]
    fn linewise_delete_fills_the_ring() {
        let mut c = ctx("abc\ndef\nghi\n");
        run(&mut c, OperatorKind::Delete, Position::new(0, 1), Position::new(1, 1), false, MotionType::Line);
        assert_eq!(c.buffer.text(), "ghi\n");
        assert_eq!(c.registers.get(None).unwrap(), Some(&Yankreg::Line("abc\ndef\n".into())));
        assert_eq!(c.registers.numbered()[0], Yankreg::Line("abc\ndef\n".into()));
        assert_eq!(c.cursor, Position::new(0, 0));
    }

    #[test]
    fn small_delete_goes_to_minus_register() {
        let mut c = ctx("abc def\n");
        run(&mut c, OperatorKind::Delete, Position::new(0, 0), Position::new(0, 4), false, MotionType::Char);
        assert_eq!(c.registers.unnamed_name(), Some('-'));
        assert!(c.registers.numbered().is_empty());
    }

    #[test]
    fn char_delete_over_lines_becomes_linewise() {
        let mut c = ctx("  one\ntwo  \nthree\n");
        // From inside the indentation to just before trailing blanks.
        run(&mut c, OperatorKind::Delete, Position::new(0, 1), Position::new(1, 3), false, MotionType::Char);
        assert_eq!(c.buffer.text(), "three\n");
        assert_eq!(c.registers.get(None).unwrap(), Some(&Yankreg::Line("  one\ntwo  \n".into())));
    }

    #[test]
    fn block_delete_keeps_alignment() {
        let mut c = ctx("abcd\nefgh\nijkl\n");
        run(&mut c, OperatorKind::Delete, Position::new(0, 0), Position::new(2, 1), true, MotionType::Block);
        assert_eq!(c.buffer.text(), "cd\ngh\nkl\n");
        assert_eq!(
            c.registers.get(None).unwrap(),
            Some(&Yankreg::Block { rows: vec!["ab".into(), "ef".into(), "ij".into()], width: 1 })
        );
        assert_eq!(c.cursor, Position::new(0, 0));
    }

    #[test]
    fn linewise_change_keeps_indent_with_autoindent() {
        let mut c = ctx("    foo\nbar\nbaz\n");
        c.options.editor.autoindent = true;
        let effect = run(&mut c, OperatorKind::Change, Position::new(0, 5), Position::new(1, 0), false, MotionType::Line);
        assert_eq!(c.buffer.text(), "    \nbaz\n");
        assert_eq!(c.cursor, Position::new(0, 4));
        match effect {
            OperatorEffect::Insert(req) => {
                assert!(req.did_ai);
                assert_eq!(req.ai_col, 4);
                assert!(req.owns_transaction);
            }
            other => panic!("unexpected effect {other:?}"),
        }
        assert_eq!(c.undo.nesting(), 1);
    }

    #[test]
    fn char_change_may_leave_cursor_past_end() {
        let mut c = ctx("foo bar\n");
        let mut a = OperatorArgs::new(OperatorKind::Change, Position::new(0, 4));
        normalize(&c, &mut a, Position::new(0, 6), true, MotionType::Char);
        c.begin_change();
        op_change(&mut c, &a).unwrap();
        assert_eq!(c.buffer.text(), "foo \n");
        assert_eq!(c.cursor, Position::new(0, 4));
    }

    #[test]
    fn empty_change_still_balances_undo() {
        let mut c = ctx("abc\n");
        let a = OperatorArgs::new(OperatorKind::Change, Position::new(0, 1));
        let err = combine(&mut c, a, Position::new(0, 1), false, MotionType::Char).unwrap_err();
        assert_eq!(err, EngineError::Beep);
        assert_eq!(c.undo.nesting(), 0);
    }

    #[test]
    fn block_append_pads_a_short_first_line() {
        let mut c = ctx("ab\nabcdef\n");
        let mut a = OperatorArgs::new(OperatorKind::Append, Position::new(1, 3));
        a.is_visual = true;
        a.forced = None;
        normalize(&c, &mut a, Position::new(0, 1), true, MotionType::Block);
        c.begin_change();
        let effect = op_block_insert(&mut c, &a).unwrap();
        let OperatorEffect::Insert(req) = effect else {
            panic!("block append must enter insert mode")
        };
        let block = req.block.unwrap();
        assert_eq!(block.kind, BlockInsertKind::Append);
        assert_eq!(c.buffer.line_text(0), "ab  ");
        assert_eq!(c.cursor, Position::new(0, 4));
    }
}
