//! Operator engine: combine a pending operator with the range a motion (or
//! Visual selection) produced, normalise it and run the concrete operation.
//!
//! Normalisation order matters and mirrors vi:
//! 1. forced motion type (`dv`, `dV`, `d<C-v>`);
//! 2. start/end ordering and, for blocks, the virtual column span;
//! 3. Visual adjustments (inclusive selection, trailing line break);
//! 4. the exclusive-motion-ending-in-column-0 adjustment;
//! 5. line-wise column normalisation and the empty-region test.
//!
//! Every mutating operator validates guarded lines before touching the buffer
//! and runs inside one undo transaction. An operator that continues in Insert
//! mode (`c`, block `I`/`A`) leaves its transaction open for the insert session.

pub mod case;
pub mod delete;
pub mod join;
pub mod put;
pub mod shift;
pub mod yank;

use crate::block::BlockSpan;
use crate::error::{EngineError, EngineResult};
use crate::insert::InsertRequest;
use crate::motion::MotionType;
use core_state::{Curswant, EditorContext};
use core_text::motion::{first_non_blank, is_blank};
use core_text::{Position, width};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Delete,
    Yank,
    Change,
    ShiftLeft,
    ShiftRight,
    Filter,
    ToggleCase,
    UpperCase,
    LowerCase,
    Indent,
    Format,
    Join,
    JoinNoSpace,
    Replace,
    Insert,
    Append,
    Rot13,
}

impl OperatorKind {
    /// Operator started by `c`, `g` telling whether it followed a `g`.
    pub fn from_key(c: char, g: bool) -> Option<Self> {
        let op = match (g, c) {
            (false, 'd') => Self::Delete,
            (false, 'y') => Self::Yank,
            (false, 'c') => Self::Change,
            (false, '<') => Self::ShiftLeft,
            (false, '>') => Self::ShiftRight,
            (false, '!') => Self::Filter,
            (false, '=') => Self::Indent,
            (true, '~') => Self::ToggleCase,
            (true, 'u') => Self::LowerCase,
            (true, 'U') => Self::UpperCase,
            (true, '?') => Self::Rot13,
            (true, 'q') | (true, 'w') => Self::Format,
            _ => return None,
        };
        Some(op)
    }

    /// Operators that always work on whole lines.
    pub fn on_lines(self) -> bool {
        matches!(
            self,
            Self::ShiftLeft
                | Self::ShiftRight
                | Self::Filter
                | Self::Indent
                | Self::Format
                | Self::Join
                | Self::JoinNoSpace
        )
    }

    pub fn modifies(self) -> bool {
        self != Self::Yank
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Yank => "yank",
            Self::Change => "change",
            Self::ShiftLeft => "shift_left",
            Self::ShiftRight => "shift_right",
            Self::Filter => "filter",
            Self::ToggleCase => "toggle_case",
            Self::UpperCase => "upper_case",
            Self::LowerCase => "lower_case",
            Self::Indent => "indent",
            Self::Format => "format",
            Self::Join => "join",
            Self::JoinNoSpace => "join_no_space",
            Self::Replace => "replace",
            Self::Insert => "insert",
            Self::Append => "append",
            Self::Rot13 => "rot13",
        }
    }
}

/// Motion type forced by `v`, `V` or `CTRL-V` typed after the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForcedMotion {
    Char,
    Line,
    Block,
}

/// Everything an operator needs once its range is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorArgs {
    pub op: OperatorKind,
    pub motion: MotionType,
    pub inclusive: bool,
    pub start: Position,
    pub end: Position,
    pub line_count: usize,
    pub register: Option<char>,
    /// Populated exactly when `motion` is `Block`.
    pub block: Option<BlockSpan>,
    pub forced: Option<ForcedMotion>,
    pub is_visual: bool,
    /// Deletes over this range always shift the numbered ring.
    pub use_reg_one: bool,
    /// Count for Visual shifts, joins and insert repeats.
    pub count: usize,
    /// Character for the Replace operator.
    pub replace_char: Option<char>,
    pub empty: bool,
    /// Where the cursor goes afterwards: the ordered start before any column
    /// normalisation.
    pub cursor: Position,
}

impl OperatorArgs {
    pub fn new(op: OperatorKind, start: Position) -> Self {
        Self {
            op,
            motion: MotionType::Char,
            inclusive: false,
            start,
            end: start,
            line_count: 1,
            register: None,
            block: None,
            forced: None,
            is_visual: false,
            use_reg_one: false,
            count: 1,
            replace_char: None,
            empty: false,
            cursor: start,
        }
    }
}

/// What the dispatcher does after an operator ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorEffect {
    Done,
    /// Continue in Insert mode; the session closes the open undo transaction.
    Insert(InsertRequest),
}

fn leading_blanks(line: &str) -> usize {
    line.chars().take_while(|c| is_blank(*c)).count()
}

/// Block span covering two corners, widened to the longest line with `$`.
fn block_span(ctx: &EditorContext, a: Position, b: Position) -> BlockSpan {
    let ts = ctx.ts();
    let la = ctx.buffer.line_text(a.line);
    let lb = ctx.buffer.line_text(b.line);
    let (sa, ea) = width::vcol_span(&la, a.col, ts);
    let (sb, eb) = width::vcol_span(&lb, b.col, ts);
    let mut span = BlockSpan {
        start_vcol: sa.min(sb),
        end_vcol: ea.max(eb),
        to_eol: false,
    };
    if ctx.curswant == Curswant::Eol {
        let (first, last) = (a.line.min(b.line), a.line.max(b.line));
        span.end_vcol = (first..=last)
            .map(|l| width::line_width(&ctx.buffer.line_text(l), ts))
            .max()
            .unwrap_or(0);
        span.to_eol = true;
    }
    span
}

/// Normalise the range described by `args.start` (operator start or Visual
/// anchor) and `motion_end`, filling in `args`.
pub fn normalize(
    ctx: &EditorContext,
    args: &mut OperatorArgs,
    motion_end: Position,
    inclusive: bool,
    kind: MotionType,
) {
    let origin = args.start;
    args.end = motion_end;
    args.inclusive = inclusive;
    args.motion = kind;

    if !args.is_visual {
        match args.forced {
            Some(ForcedMotion::Char) => {
                if args.motion == MotionType::Line {
                    args.inclusive = false;
                } else {
                    args.inclusive = !args.inclusive;
                }
                args.motion = MotionType::Char;
            }
            Some(ForcedMotion::Line) => args.motion = MotionType::Line,
            Some(ForcedMotion::Block) => args.motion = MotionType::Block,
            None => {}
        }
    }

    if args.start > args.end {
        std::mem::swap(&mut args.start, &mut args.end);
    }
    args.line_count = args.end.line - args.start.line + 1;
    args.cursor = args.start;

    if args.motion == MotionType::Block {
        let span = block_span(ctx, origin, motion_end);
        let ts = ctx.ts();
        let first = ctx.buffer.line_text(args.start.line);
        let last = ctx.buffer.line_text(args.end.line);
        args.start.col = width::col_for_vcol(&first, span.start_vcol, ts);
        args.end.col = width::col_for_vcol(&last, span.end_vcol, ts);
        args.inclusive = true;
        args.block = Some(span);
        args.cursor = args.start;
        trace!(target: "actions.operator", start_vcol = span.start_vcol, end_vcol = span.end_vcol, to_eol = span.to_eol, "block_span");
    } else if args.is_visual {
        if args.motion == MotionType::Char {
            args.inclusive = true;
            if args.end.col >= ctx.buffer.line_len(args.end.line) {
                args.inclusive = false;
                if !args.op.on_lines() && args.end.line + 1 < ctx.line_count() {
                    args.end = Position::new(args.end.line + 1, 0);
                    args.line_count += 1;
                }
            }
        }
    } else if args.motion == MotionType::Char
        && !args.inclusive
        && args.end.col == 0
        && args.line_count > 1
    {
        args.line_count -= 1;
        args.end.line -= 1;
        let start_line = ctx.buffer.line_text(args.start.line);
        if args.start.col < leading_blanks(&start_line) {
            let len = ctx.buffer.line_len(args.end.line);
            args.end.col = len;
            if len > 0 {
                args.end.col = len - 1;
                args.inclusive = true;
            }
        } else {
            args.motion = MotionType::Line;
        }
        trace!(target: "actions.operator", linewise = args.motion == MotionType::Line, "exclusive_end_adjusted");
    }

    if args.motion == MotionType::Line {
        if args.is_visual {
            args.cursor.col = 0;
        }
        args.start.col = 0;
        args.end.col = ctx.buffer.line_len(args.end.line);
    }
    args.empty = args.motion == MotionType::Char
        && (!args.inclusive
            || (args.op == OperatorKind::Yank && args.end.col >= ctx.buffer.line_len(args.end.line)))
        && args.start == args.end;
}

/// Fail before any mutation when the range touches a guarded line.
pub fn check_guard(ctx: &EditorContext, first: usize, last: usize) -> EngineResult<()> {
    match ctx.buffer.first_guarded(first, last) {
        Some(line) => {
            debug!(target: "actions.operator", line, "guarded_region");
            Err(EngineError::GuardedRegion { line })
        }
        None => Ok(()),
    }
}

/// Record `'[` and `']` after an operator.
pub(crate) fn set_change_marks(ctx: &mut EditorContext, start: Position, end: Position) {
    ctx.set_mark('[', start);
    ctx.set_mark(']', end);
}

/// Normalise and execute. Runs in one undo transaction for mutating operators.
pub fn combine(
    ctx: &mut EditorContext,
    mut args: OperatorArgs,
    motion_end: Position,
    inclusive: bool,
    kind: MotionType,
) -> EngineResult<OperatorEffect> {
    normalize(ctx, &mut args, motion_end, inclusive, kind);
    trace!(
        target: "actions.operator",
        op = args.op.name(),
        motion = ?args.motion,
        inclusive = args.inclusive,
        start_line = args.start.line,
        start_col = args.start.col,
        end_line = args.end.line,
        end_col = args.end.col,
        empty = args.empty,
        "combine"
    );
    execute(ctx, &args)
}

/// Run an already normalised operator.
pub fn execute(ctx: &mut EditorContext, args: &OperatorArgs) -> EngineResult<OperatorEffect> {
    use OperatorKind::*;
    match args.op {
        Filter => return Err(EngineError::NotSupported("filter operator")),
        Format => return Err(EngineError::NotSupported("format operator")),
        _ => {}
    }
    if args.op.modifies() {
        check_guard(ctx, args.start.line, args.end.line)?;
    }
    let cased = matches!(args.op, ToggleCase | UpperCase | LowerCase | Rot13);
    if args.empty && (matches!(args.op, Delete | Yank) || cased) {
        return Err(EngineError::Beep);
    }
    if args.op == Yank {
        yank::op_yank(ctx, args)?;
        return Ok(OperatorEffect::Done);
    }
    if args.empty && args.op == Change {
        ctx.begin_change();
        ctx.end_change();
        return Err(EngineError::Beep);
    }

    ctx.begin_change();
    let result = match args.op {
        Delete => delete::op_delete(ctx, args).map(|_| OperatorEffect::Done),
        Change => delete::op_change(ctx, args),
        ShiftLeft | ShiftRight => shift::op_shift(ctx, args).map(|_| OperatorEffect::Done),
        Indent => shift::op_reindent(ctx, args).map(|_| OperatorEffect::Done),
        ToggleCase | UpperCase | LowerCase | Rot13 => case::op_case(ctx, args).map(|_| OperatorEffect::Done),
        Join | JoinNoSpace => {
            let count = args.line_count.max(2);
            join::do_join(ctx, args.start.line, count, args.op == Join).map(|_| OperatorEffect::Done)
        }
        Replace => case::op_replace(ctx, args).map(|_| OperatorEffect::Done),
        Insert | Append => delete::op_block_insert(ctx, args),
        Yank | Filter | Format => Ok(OperatorEffect::Done),
    };
    match &result {
        Ok(OperatorEffect::Insert(_)) => {}
        _ => {
            ctx.end_change();
        }
    }
    result
}

/// Cursor on the first non-blank of `line`.
pub(crate) fn cursor_to_first_non_blank(ctx: &mut EditorContext, line: usize) {
    let line = line.min(ctx.line_count() - 1);
    ctx.cursor = Position::new(line, first_non_blank(&ctx.buffer.line_text(line)));
    ctx.clamp_cursor(false);
    ctx.update_curswant();
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_config::Options;
    use core_text::Buffer;
    use pretty_assertions::assert_eq;

    fn ctx(text: &str) -> EditorContext {
        EditorContext::new(Buffer::from_str("t", text).unwrap(), Options::default())
    }

    fn args(op: OperatorKind, start: Position) -> OperatorArgs {
        OperatorArgs::new(op, start)
    }

    #[test]
    fn backward_motion_is_reordered() {
        let c = ctx("abc def\n");
        let mut a = args(OperatorKind::Delete, Position::new(0, 5));
        normalize(&c, &mut a, Position::new(0, 1), false, MotionType::Char);
        assert_eq!((a.start, a.end), (Position::new(0, 1), Position::new(0, 5)));
        assert_eq!(a.cursor, Position::new(0, 1));
        assert!(!a.empty);
    }

    #[test]
    fn exclusive_end_in_column_zero() {
        let c = ctx("abc\n  def\nghi\n");
        // Start on text: promoted to line-wise, end pulled to the previous line.
        let mut a = args(OperatorKind::Delete, Position::new(0, 1));
        normalize(&c, &mut a, Position::new(2, 0), false, MotionType::Char);
        assert_eq!(a.motion, MotionType::Line);
        assert_eq!((a.start, a.end), (Position::new(0, 0), Position::new(1, 5)));
        assert_eq!(a.line_count, 2);
        // Start inside indentation: stays char-wise, inclusive up to the last char.
        let mut a = args(OperatorKind::Delete, Position::new(1, 1));
        normalize(&c, &mut a, Position::new(2, 0), false, MotionType::Char);
        assert_eq!(a.motion, MotionType::Char);
        assert!(a.inclusive);
        assert_eq!(a.end, Position::new(1, 4));
    }

    #[test]
    fn forced_motion_types() {
        let c = ctx("abc\ndef\n");
        let mut a = args(OperatorKind::Delete, Position::new(0, 0));
        a.forced = Some(ForcedMotion::Char);
        normalize(&c, &mut a, Position::new(1, 0), false, MotionType::Line);
        // Exclusive, ends in column 0 and starts outside the indent: linewise.
        assert_eq!(a.motion, MotionType::Line);
        assert_eq!((a.start.line, a.end.line), (0, 0));
        let indented = ctx("  abc\ndef\n");
        let mut a = args(OperatorKind::Delete, Position::new(0, 1));
        a.forced = Some(ForcedMotion::Char);
        normalize(&indented, &mut a, Position::new(1, 0), false, MotionType::Line);
        assert_eq!(a.motion, MotionType::Char);
        assert_eq!(a.end, Position::new(0, 4));
        assert!(a.inclusive);
        let mut a = args(OperatorKind::Delete, Position::new(0, 0));
        a.forced = Some(ForcedMotion::Char);
        normalize(&c, &mut a, Position::new(0, 2), true, MotionType::Char);
        assert!(!a.inclusive);
        let mut a = args(OperatorKind::Delete, Position::new(0, 1));
        a.forced = Some(ForcedMotion::Block);
        normalize(&c, &mut a, Position::new(1, 2), false, MotionType::Line);
        assert_eq!(a.block, Some(BlockSpan { start_vcol: 1, end_vcol: 2, to_eol: false }));
    }

    #[test]
    fn empty_region_rules() {
        let c = ctx("abc\n");
        let mut a = args(OperatorKind::Delete, Position::new(0, 1));
        normalize(&c, &mut a, Position::new(0, 1), false, MotionType::Char);
        assert!(a.empty);
        let mut a = args(OperatorKind::Yank, Position::new(0, 3));
        normalize(&c, &mut a, Position::new(0, 3), true, MotionType::Char);
        assert!(a.empty);
        let mut a = args(OperatorKind::Delete, Position::new(0, 1));
        normalize(&c, &mut a, Position::new(0, 1), true, MotionType::Char);
        assert!(!a.empty);
    }

    #[test]
    fn visual_char_selection_takes_line_break() {
        let c = ctx("ab\ncd\n");
        let mut a = args(OperatorKind::Delete, Position::new(0, 0));
        a.is_visual = true;
        normalize(&c, &mut a, Position::new(0, 2), true, MotionType::Char);
        assert_eq!(a.end, Position::new(1, 0));
        assert!(!a.inclusive);
    }

    #[test]
    fn guarded_lines_abort_before_mutation() {
        let mut c = ctx("a\nb\nc\n");
        c.buffer.guard_lines(1, 1);
        let a = args(OperatorKind::Delete, Position::new(0, 0));
        let before = c.buffer.mutations();
        let err = combine(&mut c, a, Position::new(2, 0), false, MotionType::Line).unwrap_err();
        assert_eq!(err, EngineError::GuardedRegion { line: 1 });
        assert_eq!(c.buffer.mutations(), before);
        assert_eq!(c.undo.nesting(), 0);
    }

    #[test]
    fn filter_and_format_are_not_supported() {
        let mut c = ctx("a\n");
        let a = args(OperatorKind::Filter, Position::new(0, 0));
        assert!(matches!(
            combine(&mut c, a, Position::new(0, 0), false, MotionType::Line),
            Err(EngineError::NotSupported(_))
        ));
        assert_eq!(OperatorKind::from_key('w', true), Some(OperatorKind::Format));
    }
}
