//! Command dispatcher for Normal, Operator-pending and Visual mode.
//!
//! Keys go through the [`CommandParser`] until they form a chunk; the chunk is
//! then interpreted against the current state:
//! * `normal` handles Normal and Operator-pending mode (motions, operators,
//!   text objects and the simple commands such as `x`, `p` or `o`);
//! * `visual` handles the minimal Visual mode used to drive block operations.
//!
//! A chunk that leaves an operator pending keeps the register and the outer
//! count in the parser; any other outcome finishes the command. Errors are
//! returned as-is: the engine owns recovery and resets the dispatcher.

mod normal;
pub mod parser;
mod visual;

pub use parser::{CommandArgs, CommandParser, MAX_COUNT, ParseContext, ParseStep, ParserState};

use crate::error::EngineResult;
use crate::insert::InsertRequest;
use crate::operator::{ForcedMotion, OperatorKind};
use crate::repeat::{DotRecord, VisualKind, VisualRepeat};
use core_state::{Curswant, EditorContext};
use core_text::Position;
use core_text::width::{col_for_vcol, vcol_of};
use tracing::{debug, trace};

/// Operator typed and waiting for its motion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingOperator {
    pub op: OperatorKind,
    pub start: Position,
    pub forced: Option<ForcedMotion>,
    /// `d`, `gU`, ... followed by any forcing `v`/`V`/`CTRL-V`, for `.`.
    pub keys: Vec<char>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualState {
    pub kind: VisualKind,
    /// The end of the selection that stays put; the cursor is the other one.
    pub anchor: Position,
}

impl VisualState {
    /// Selection corners, top-left first (by position, not by column).
    pub fn ordered(&self, cursor: Position) -> (Position, Position) {
        if self.anchor <= cursor {
            (self.anchor, cursor)
        } else {
            (cursor, self.anchor)
        }
    }
}

/// What a chunk did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// More keys are needed: a partial chunk or a pending operator.
    NeedMore,
    /// The command completed. A change that `.` can repeat carries its record.
    Done(Option<DotRecord>),
    /// Continue in Insert or Replace mode.
    Insert(InsertRequest, Option<DotRecord>),
    /// `.` with the given count (0 for none).
    Repeat(usize),
    Aborted(&'static str),
}

#[derive(Debug, Default)]
pub struct CommandDispatcher {
    parser: CommandParser,
    pending: Option<PendingOperator>,
    visual: Option<VisualState>,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operator_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_operator(&self) -> Option<OperatorKind> {
        self.pending.as_ref().map(|p| p.op)
    }

    pub fn visual(&self) -> Option<VisualState> {
        self.visual
    }

    /// The next key is an argument (`fx`, `"a`, `ma`) and must not be mapped.
    pub fn awaiting_extra_char(&self) -> bool {
        self.parser.awaiting_extra_char()
    }

    /// Keys were typed that have not completed a command yet.
    pub fn in_flight(&self) -> bool {
        self.pending.is_some() || self.parser.in_chunk()
    }

    pub fn parser_state(&self) -> ParserState {
        self.parser.state()
    }

    /// Drop every partial command, the pending operator and Visual mode.
    pub fn reset(&mut self) {
        if self.pending.is_some() || self.visual.is_some() {
            debug!(
                target: "actions.dispatch",
                operator = ?self.pending_operator(),
                visual = ?self.visual.map(|v| v.kind),
                "dispatcher_reset"
            );
        }
        self.parser.reset();
        self.pending = None;
        self.visual = None;
    }

    /// Drop a partial chunk and any pending operator but keep Visual mode.
    pub fn cancel_command(&mut self) {
        self.parser.reset();
        self.pending = None;
    }

    pub fn feed(&mut self, ctx: &mut EditorContext, c: char) -> EngineResult<Flow> {
        let pc = ParseContext {
            operator_pending: self.pending.is_some(),
            visual: self.visual.is_some(),
        };
        let ca = match self.parser.feed(c, pc) {
            ParseStep::NeedMore => return Ok(Flow::NeedMore),
            ParseStep::Cancelled => {
                self.pending = None;
                return Ok(Flow::Aborted("escape"));
            }
            ParseStep::Ready(ca) => ca,
        };
        let flow = if self.visual.is_some() {
            self.visual_command(ctx, &ca)
        } else {
            self.normal_command(ctx, &ca)
        }?;
        if !(flow == Flow::NeedMore && self.pending.is_some()) {
            self.pending = None;
            self.parser.finish_command();
        }
        Ok(flow)
    }

    /// Rebuild a Visual selection of the remembered shape at the cursor so
    /// a repeated Visual change applies to the same amount of text.
    pub fn start_visual_replay(&mut self, ctx: &mut EditorContext, shape: VisualRepeat) {
        let anchor = ctx.cursor;
        let line = (anchor.line + shape.lines).min(ctx.line_count() - 1);
        let cursor = match shape.kind {
            VisualKind::Char if shape.lines == 0 => Position::new(line, anchor.col + shape.cols),
            VisualKind::Char => Position::new(line, shape.cols),
            VisualKind::Line => Position::new(line, anchor.col),
            VisualKind::Block => {
                let ts = ctx.ts();
                let start_vcol = vcol_of(&ctx.buffer.line_text(anchor.line), anchor.col, ts);
                let text = ctx.buffer.line_text(line);
                Position::new(line, col_for_vcol(&text, start_vcol + shape.cols, ts))
            }
        };
        self.pending = None;
        self.visual = Some(VisualState {
            kind: shape.kind,
            anchor,
        });
        ctx.cursor = cursor;
        ctx.clamp_cursor(true);
        if shape.to_eol {
            ctx.curswant = Curswant::Eol;
        } else {
            ctx.update_curswant();
        }
        trace!(target: "actions.dispatch", kind = ?shape.kind, lines = shape.lines, cols = shape.cols, "visual_replay");
    }
}
