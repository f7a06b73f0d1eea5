//! Put (`p`, `P`, `gp`, `gP`) and put over a Visual selection.

use super::{OperatorArgs, check_guard, cursor_to_first_non_blank, delete, set_change_marks};
use crate::block;
use crate::error::{EngineError, EngineResult};
use crate::motion::MotionType;
use core_state::{EditorContext, Yankreg};
use core_text::{Position, char_width, vcol_of, vcol_span};
use tracing::trace;

/// Modifiers for one put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PutFlags {
    /// `gp`/`gP`: leave the cursor just after the new text.
    pub cursor_after: bool,
    /// Put whatever the register holds as whole lines.
    pub as_lines: bool,
    /// Split the current line and put line-wise content in between.
    pub split_line: bool,
}

/// Put the content of register `name` `count` times.
pub fn put_register(
    ctx: &mut EditorContext,
    name: Option<char>,
    forward: bool,
    count: usize,
    flags: PutFlags,
) -> EngineResult<()> {
    let reg = ctx
        .registers
        .get(name)?
        .cloned()
        .filter(|r| !r.is_empty())
        .ok_or(EngineError::Beep)?;
    ctx.begin_change();
    let result = do_put(ctx, &reg, forward, count, flags);
    ctx.end_change();
    result
}

/// Put `reg` relative to the cursor. The caller owns the undo transaction.
pub fn do_put(
    ctx: &mut EditorContext,
    reg: &Yankreg,
    forward: bool,
    count: usize,
    flags: PutFlags,
) -> EngineResult<()> {
    if reg.is_empty() {
        return Err(EngineError::Beep);
    }
    let count = count.max(1);
    trace!(target: "actions.operator", kind = ?reg.kind(), forward, count, as_lines = flags.as_lines, "put");
    if flags.as_lines || matches!(reg, Yankreg::Line(_)) {
        let mut forward = forward;
        if flags.split_line && matches!(reg, Yankreg::Line(_)) {
            split_at_cursor(ctx, forward)?;
            forward = true;
        }
        put_lines(ctx, &reg.rows(), forward, count, flags.cursor_after);
        return Ok(());
    }
    match reg {
        Yankreg::Char(text) => {
            check_guard(ctx, ctx.cursor.line, ctx.cursor.line)?;
            put_chars(ctx, text, forward, count, flags.cursor_after);
        }
        Yankreg::Block { rows, width } => {
            let last = ctx.cursor.line + rows.len().saturating_sub(1);
            check_guard(ctx, ctx.cursor.line, last)?;
            put_block(ctx, rows, *width, forward, count, flags.cursor_after);
        }
        Yankreg::Line(_) => {}
    }
    Ok(())
}

fn split_at_cursor(ctx: &mut EditorContext, forward: bool) -> EngineResult<()> {
    let line = ctx.cursor.line;
    check_guard(ctx, line, line)?;
    let chars: Vec<char> = ctx.buffer.line_text(line).chars().collect();
    let mut col = ctx.cursor.col.min(chars.len());
    if forward && col < chars.len() {
        col += 1;
    }
    let head: String = chars[..col].iter().collect();
    let tail: String = chars[col..].iter().collect();
    ctx.buffer.insert_lines(line + 1, &[tail]);
    ctx.buffer.replace_line(line, &head);
    Ok(())
}

fn put_chars(ctx: &mut EditorContext, text: &str, forward: bool, count: usize, cursor_after: bool) {
    let line = ctx.cursor.line;
    let len = ctx.buffer.line_len(line);
    let mut col = ctx.cursor.col.min(len);
    if forward && col < len {
        col += 1;
    }
    let at = Position::new(line, col);
    let text = text.repeat(count);
    let n = text.chars().count();
    let offset = ctx.buffer.offset_of(at);
    ctx.buffer.insert_text(offset, &text);
    let last = ctx.buffer.position_of(offset + n - 1);
    set_change_marks(ctx, at, last);
    ctx.cursor = if text.contains('\n') {
        if cursor_after {
            ctx.buffer.position_of(offset + n)
        } else {
            at
        }
    } else {
        Position::new(line, col + n - 1 + usize::from(cursor_after))
    };
    ctx.clamp_cursor(false);
    ctx.update_curswant();
}

fn put_lines(ctx: &mut EditorContext, rows: &[String], forward: bool, count: usize, cursor_after: bool) {
    let at = if forward { ctx.cursor.line + 1 } else { ctx.cursor.line };
    let lines: Vec<String> = (0..count).flat_map(|_| rows.iter().cloned()).collect();
    let n = lines.len();
    ctx.buffer.insert_lines(at, &lines);
    let at = at.min(ctx.line_count() - 1);
    let end = (at + n - 1).min(ctx.line_count() - 1);
    set_change_marks(ctx, Position::new(at, 0), Position::new(end, 0));
    if cursor_after {
        let after = at + n;
        ctx.cursor = if after >= ctx.line_count() {
            Position::new(ctx.line_count() - 1, 0)
        } else {
            Position::new(after, 0)
        };
        ctx.update_curswant();
    } else {
        cursor_to_first_non_blank(ctx, at);
    }
}

fn put_block(ctx: &mut EditorContext, rows: &[String], y_width: usize, forward: bool, count: usize, cursor_after: bool) {
    let ts = ctx.ts();
    let first = ctx.cursor.line;
    let line = ctx.buffer.line_text(first);
    let len = line.chars().count();
    let mut cur_col = ctx.cursor.col.min(len);
    let col = if forward && cur_col < len {
        let (_, end) = vcol_span(&line, cur_col, ts);
        cur_col += 1;
        end + 1
    } else {
        vcol_of(&line, cur_col, ts)
    };

    let needed = first + rows.len();
    let have = ctx.line_count();
    if needed > have {
        ctx.buffer.insert_lines(have, &vec![String::new(); needed - have]);
    }

    let mut out_lines = Vec::with_capacity(rows.len());
    let mut first_startspaces = 0;
    let mut end_col = 0;
    for (i, row) in rows.iter().enumerate() {
        let old: Vec<char> = ctx.buffer.line_text(first + i).chars().collect();
        let (mut vcol, mut idx, mut incr) = (0usize, 0usize, 0usize);
        while vcol < col && idx < old.len() {
            incr = char_width(old[idx], vcol, ts);
            vcol += incr;
            idx += 1;
        }
        let mut textcol = idx;
        let shortline = vcol < col || (vcol == col && idx >= old.len());
        let (mut startspaces, mut endspaces, mut delcount) = (0, 0, 0);
        if vcol < col {
            startspaces = col - vcol;
        } else if vcol > col {
            endspaces = vcol - col;
            startspaces = incr - endspaces;
            textcol -= 1;
            delcount = 1;
            // Only a tab can be split into spaces.
            if old[textcol] != '\t' {
                delcount = 0;
                endspaces = 0;
            }
        }
        let row_width: usize = row.chars().map(|c| char_width(c, 0, ts)).sum();
        let spaces = (y_width + 1).saturating_sub(row_width);

        let mut out: String = old[..textcol].iter().collect();
        out.push_str(&" ".repeat(startspaces));
        for j in 0..count {
            out.push_str(row);
            if (j + 1 < count || !shortline) && spaces > 0 {
                out.push_str(&" ".repeat(spaces));
            }
        }
        out.push_str(&" ".repeat(endspaces));
        end_col = out.chars().count().saturating_sub(1);
        out.extend(old[textcol + delcount..].iter());
        out_lines.push(out);
        if i == 0 {
            first_startspaces = startspaces;
        }
    }
    block::apply_line_rewrites(&mut ctx.buffer, first, &out_lines);
    let last = first + rows.len().saturating_sub(1);
    set_change_marks(ctx, Position::new(first, cur_col), Position::new(last, end_col));
    ctx.cursor = if cursor_after {
        Position::new(last, end_col + 1)
    } else {
        Position::new(first, cur_col + first_startspaces)
    };
    ctx.clamp_cursor(false);
    ctx.update_curswant();
    trace!(target: "actions.block", first, rows = rows.len(), col, "put_block");
}

/// Replace a Visual selection with register `name`. The replaced text ends up
/// in the unnamed register.
pub fn put_visual(
    ctx: &mut EditorContext,
    args: &OperatorArgs,
    name: Option<char>,
    count: usize,
    cursor_after: bool,
) -> EngineResult<()> {
    let reg = ctx
        .registers
        .get(name)?
        .cloned()
        .filter(|r| !r.is_empty())
        .ok_or(EngineError::Beep)?;
    check_guard(ctx, args.start.line, args.end.line)?;
    ctx.begin_change();
    let result = put_visual_inner(ctx, args, &reg, count, cursor_after);
    ctx.end_change();
    result
}

fn put_visual_inner(
    ctx: &mut EditorContext,
    args: &OperatorArgs,
    reg: &Yankreg,
    count: usize,
    cursor_after: bool,
) -> EngineResult<()> {
    let mut del = args.clone();
    del.register = None;
    delete::op_delete(ctx, &del)?;

    let mut flags = PutFlags {
        cursor_after,
        ..PutFlags::default()
    };
    let forward;
    // The whole buffer went; the empty line left behind is dropped after the put.
    let emptied = args.motion == MotionType::Line
        && ctx.line_count() == 1
        && ctx.buffer.line_len(0) == 0
        && args.start.line == 0;
    match args.motion {
        MotionType::Line => {
            flags.as_lines = true;
            forward = ctx.cursor.line < args.start.line;
        }
        MotionType::Char => {
            flags.split_line = matches!(reg, Yankreg::Line(_));
            forward = ctx.cursor.col < args.start.col;
        }
        MotionType::Block => {
            forward = ctx.cursor.col < args.start.col || matches!(reg, Yankreg::Line(_));
            if matches!(reg, Yankreg::Line(_)) {
                ctx.cursor.line = args.end.line.min(ctx.line_count() - 1);
            }
        }
    }
    do_put(ctx, reg, forward, count, flags)?;
    if emptied && ctx.line_count() > 1 {
        let last = ctx.line_count() - 1;
        ctx.buffer.delete_lines(last, last);
        ctx.clamp_cursor(false);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::{OperatorKind, normalize};
    use core_config::Options;
    use core_text::Buffer;
    use pretty_assertions::assert_eq;

    fn ctx(text: &str) -> EditorContext {
        EditorContext::new(Buffer::from_str("t", text).unwrap(), Options::default())
    }

    fn put(c: &mut EditorContext, reg: Yankreg, forward: bool, count: usize, cursor_after: bool) {
        c.registers.set('a', reg).unwrap();
        let flags = PutFlags { cursor_after, ..PutFlags::default() };
        put_register(c, Some('a'), forward, count, flags).unwrap();
    }

    #[test]
    fn char_put_after_and_before() {
        let mut c = ctx("abc\n");
        put(&mut c, Yankreg::Char("XY".into()), true, 1, false);
        assert_eq!(c.buffer.text(), "aXYbc\n");
        assert_eq!(c.cursor, Position::new(0, 2));
        let mut c = ctx("abc\n");
        put(&mut c, Yankreg::Char("XY".into()), false, 2, false);
        assert_eq!(c.buffer.text(), "XYXYabc\n");
        assert_eq!(c.cursor, Position::new(0, 3));
        let mut c = ctx("abc\n");
        put(&mut c, Yankreg::Char("XY".into()), false, 1, true);
        assert_eq!(c.cursor, Position::new(0, 2));
    }

    #[test]
    fn multiline_char_put_splits_the_line() {
        let mut c = ctx("XY\n");
        put(&mut c, Yankreg::Char("a\nb".into()), true, 1, false);
        assert_eq!(c.buffer.text(), "Xa\nbY\n");
        assert_eq!(c.cursor, Position::new(0, 1));
    }

    #[test]
    fn line_put_places_cursor_on_first_non_blank() {
        let mut c = ctx("abc\n");
        put(&mut c, Yankreg::Line("  x\n".into()), true, 2, false);
        assert_eq!(c.buffer.text(), "abc\n  x\n  x\n");
        assert_eq!(c.cursor, Position::new(1, 2));
        let mut c = ctx("abc\ndef\n");
        put(&mut c, Yankreg::Line("x\n".into()), false, 1, true);
        assert_eq!(c.buffer.text(), "x\nabc\ndef\n");
        assert_eq!(c.cursor, Position::new(1, 0));
    }

    #[test]
    fn block_put_inserts_columns() {
        let mut c = ctx("12\n34\n");
        let reg = Yankreg::Block { rows: vec!["ab".into(), "cd".into()], width: 1 };
        put(&mut c, reg, true, 1, false);
        assert_eq!(c.buffer.text(), "1ab2\n3cd4\n");
        assert_eq!(c.cursor, Position::new(0, 1));
    }

    #[test]
    fn block_put_extends_the_buffer() {
        let mut c = ctx("x\n");
        let reg = Yankreg::Block { rows: vec!["a".into(), "b".into(), "c".into()], width: 0 };
        put(&mut c, reg, false, 1, false);
        assert_eq!(c.buffer.text(), "ax\nb\nc\n");
    }

    #[test]
    fn empty_register_beeps() {
        let mut c = ctx("abc\n");
        let err = put_register(&mut c, Some('z'), true, 1, PutFlags::default()).unwrap_err();
        assert_eq!(err, EngineError::Beep);
    }

    #[test]
    fn visual_put_swaps_selection_with_register() {
        let mut c = ctx("one two\n");
        c.registers.set('a', Yankreg::Char("XX".into())).unwrap();
        let mut a = OperatorArgs::new(OperatorKind::Delete, Position::new(0, 4));
        a.is_visual = true;
        normalize(&c, &mut a, Position::new(0, 6), true, MotionType::Char);
        put_visual(&mut c, &a, Some('a'), 1, false).unwrap();
        assert_eq!(c.buffer.text(), "one XX\n");
        assert_eq!(c.registers.get(None).unwrap(), Some(&Yankreg::Char("two".into())));
    }

    #[test]
    fn visual_line_put_over_whole_buffer() {
        let mut c = ctx("a\nb\n");
        c.registers.set('a', Yankreg::Line("x\n".into())).unwrap();
        let mut a = OperatorArgs::new(OperatorKind::Delete, Position::new(0, 0));
        a.is_visual = true;
        normalize(&c, &mut a, Position::new(1, 0), true, MotionType::Line);
        put_visual(&mut c, &a, Some('a'), 1, false).unwrap();
        assert_eq!(c.buffer.text(), "x\n");
    }
}
