//! Yank: capture a normalised range as register content.

use super::{OperatorArgs, set_change_marks};
use crate::block::{self, BlockOp, BlockSpan};
use crate::error::{EngineError, EngineResult};
use crate::motion::MotionType;
use core_state::{EditorContext, Yankreg};
use core_text::Position;
use tracing::trace;

/// Rows of a block. A straddling tab or wide char is padded with spaces;
/// lines ending inside the block stay short.
/// The stored width is one less than the number of cells.
pub(crate) fn block_content(ctx: &EditorContext, first: usize, last: usize, span: &BlockSpan) -> Yankreg {
    let ts = ctx.ts();
    let rows = (first..=last)
        .map(|l| {
            let line = ctx.buffer.line_text(l);
            let bd = block::prepare(&line, span, BlockOp::Yank, false, ts);
            block::yank_row(&line, &bd)
        })
        .collect();
    let mut width = span.end_vcol.saturating_sub(span.start_vcol);
    if span.to_eol && width > 0 {
        width -= 1;
    }
    Yankreg::Block { rows, width }
}

/// Register content for any normalised range.
pub(crate) fn range_content(ctx: &EditorContext, args: &OperatorArgs) -> EngineResult<Yankreg> {
    let reg = match args.motion {
        MotionType::Line => Yankreg::Line(ctx.buffer.lines_text(args.start.line, args.end.line)),
        MotionType::Char => {
            let (from, to) = char_range(ctx, args.start, args.end, args.inclusive);
            Yankreg::Char(ctx.buffer.slice(from, to))
        }
        MotionType::Block => {
            let span = args
                .block
                .ok_or_else(|| EngineError::Internal("block range without span".into()))?;
            block_content(ctx, args.start.line, args.end.line, &span)
        }
    };
    Ok(reg)
}

/// Char offsets `[from, to)` of a char-wise range. An inclusive end never
/// reaches past the end of its line.
pub(crate) fn char_range(ctx: &EditorContext, start: Position, end: Position, inclusive: bool) -> (usize, usize) {
    let from = ctx.buffer.offset_of(start);
    let to = (ctx.buffer.offset_of(end) + usize::from(inclusive)).min(ctx.buffer.line_end(end.line));
    (from, to.max(from))
}

pub fn op_yank(ctx: &mut EditorContext, args: &OperatorArgs) -> EngineResult<()> {
    let reg = range_content(ctx, args)?;
    trace!(target: "actions.operator", kind = ?reg.kind(), register = ?args.register, "yank");
    ctx.registers.write_yank(args.register, reg)?;
    set_change_marks(ctx, args.start, args.end);
    ctx.cursor = args.cursor;
    if args.motion == MotionType::Block {
        ctx.cursor = args.start;
    }
    ctx.clamp_cursor(false);
    ctx.update_curswant();
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

    fn yank(c: &mut EditorContext, from: Position, to: Position, inclusive: bool, kind: MotionType) {
        let mut a = OperatorArgs::new(OperatorKind::Yank, from);
        normalize(c, &mut a, to, inclusive, kind);
        op_yank(c, &a).unwrap();
    }

    #[test]
    fn yank_kinds() {
        let mut c = ctx("one two\nthree\n");
        yank(&mut c, Position::new(0, 0), Position::new(0, 4), false, MotionType::Char);
        assert_eq!(c.registers.get(None).unwrap(), Some(&Yankreg::Char("one ".into())));
        yank(&mut c, Position::new(1, 2), Position::new(0, 2), false, MotionType::Line);
        assert_eq!(
            c.registers.get(Some('0')).unwrap(),
            Some(&Yankreg::Line("one two\nthree\n".into()))
        );
        assert_eq!(c.cursor, Position::new(0, 2));
    }

    #[test]
    fn inclusive_yank_stops_at_line_end() {
        let mut c = ctx("ab\ncd\n");
        yank(&mut c, Position::new(0, 1), Position::new(0, 1), true, MotionType::Char);
        assert_eq!(c.registers.get(None).unwrap(), Some(&Yankreg::Char("b".into())));
    }

    #[test]
    fn block_yank_keeps_short_rows_short() {
        let mut c = ctx("abcd\nx\nefgh\n");
        yank(&mut c, Position::new(0, 1), Position::new(2, 2), true, MotionType::Block);
        assert_eq!(
            c.registers.get(None).unwrap(),
            Some(&Yankreg::Block {
                rows: vec!["bc".into(), String::new(), "fg".into()],
                width: 1,
            })
        );
        assert_eq!(c.cursor, Position::new(0, 1));
    }
}
