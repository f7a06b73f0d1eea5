//! Visual mode: select a region with motions or text objects, then apply an
//! operator to it. Enough of Visual mode to drive char, line and block
//! operations; no highlighting concerns live here.

use super::{CommandArgs, CommandDispatcher, Flow, VisualState};
use crate::error::{EngineError, EngineResult};
use crate::insert::{InsertKind, InsertRequest};
use crate::keys::{CTRL_C, CTRL_V, ESC};
use crate::motion::{self, MotionCtx, MotionType};
use crate::operator::put;
use crate::operator::{self, OperatorArgs, OperatorEffect, OperatorKind};
use crate::repeat::{DotRecord, VisualKind, VisualRepeat};
use crate::text_object;
use core_state::{Curswant, EditorContext};
use core_text::Position;
use core_text::width::{col_for_vcol, vcol_span};
use tracing::{debug, trace};

fn motion_type(kind: VisualKind) -> MotionType {
    match kind {
        VisualKind::Char => MotionType::Char,
        VisualKind::Line => MotionType::Line,
        VisualKind::Block => MotionType::Block,
    }
}

/// Operator a Visual-mode key applies and the selection kind it works on.
fn visual_operator(ca: &CommandArgs, kind: VisualKind) -> Option<(OperatorKind, VisualKind)> {
    use OperatorKind::*;
    let block = kind == VisualKind::Block;
    // Uppercase forms work on whole lines outside block mode.
    let lines = if block { kind } else { VisualKind::Line };
    let found = match (ca.cmdchar, ca.nchar) {
        ('d' | 'x', _) => (Delete, kind),
        ('X' | 'D', _) => (Delete, lines),
        ('y', _) => (Yank, kind),
        ('Y', _) => (Yank, lines),
        ('c' | 's', _) => (Change, kind),
        ('C', _) => (Change, lines),
        ('S' | 'R', _) => (Change, VisualKind::Line),
        ('~', _) => (ToggleCase, kind),
        ('u', _) => (LowerCase, kind),
        ('U', _) => (UpperCase, kind),
        ('J', _) => (Join, VisualKind::Line),
        ('g', Some('J')) => (JoinNoSpace, VisualKind::Line),
        ('r', Some(_)) => (Replace, kind),
        ('I', _) if block => (Insert, kind),
        ('A', _) if block => (Append, kind),
        ('g', Some(n)) => (OperatorKind::from_key(n, true)?, kind),
        (c, _) => (OperatorKind::from_key(c, false)?, kind),
    };
    Some(found)
}

/// Size of the selection, for rebuilding it on a `.` repeat.
fn visual_shape(ctx: &EditorContext, vis: &VisualState, kind: VisualKind) -> VisualRepeat {
    let (start, end) = vis.ordered(ctx.cursor);
    let lines = end.line - start.line;
    let mut shape = VisualRepeat {
        kind,
        lines,
        cols: 0,
        to_eol: false,
    };
    match kind {
        VisualKind::Char if lines == 0 => shape.cols = end.col - start.col,
        VisualKind::Char => shape.cols = end.col,
        VisualKind::Line => {}
        VisualKind::Block => {
            let ts = ctx.ts();
            let (a0, a1) = vcol_span(&ctx.buffer.line_text(vis.anchor.line), vis.anchor.col, ts);
            let (c0, c1) = vcol_span(&ctx.cur_line(), ctx.cursor.col, ts);
            shape.cols = a1.max(c1) - a0.min(c0);
            shape.to_eol = ctx.curswant == Curswant::Eol;
        }
    }
    shape
}

impl CommandDispatcher {
    pub(super) fn visual_command(&mut self, ctx: &mut EditorContext, ca: &CommandArgs) -> EngineResult<Flow> {
        let Some(mut vis) = self.visual else {
            return Err(EngineError::Internal("visual command outside Visual mode".into()));
        };
        match (ca.cmdchar, ca.nchar) {
            (ESC | CTRL_C, _) => {
                self.leave_visual(ctx, &vis);
                ctx.clamp_cursor(false);
                return Ok(Flow::Done(None));
            }
            ('v' | 'V' | CTRL_V, _) => {
                let kind = VisualKind::from_key(ca.cmdchar).ok_or(EngineError::Beep)?;
                if kind == vis.kind {
                    self.leave_visual(ctx, &vis);
                    ctx.clamp_cursor(false);
                } else {
                    debug!(target: "actions.dispatch", from = ?vis.kind, to = ?kind, "visual_switch");
                    vis.kind = kind;
                    self.visual = Some(vis);
                }
                return Ok(Flow::Done(None));
            }
            ('o', _) => {
                std::mem::swap(&mut vis.anchor, &mut ctx.cursor);
                ctx.update_curswant();
                self.visual = Some(vis);
                return Ok(Flow::Done(None));
            }
            ('O', _) => {
                if vis.kind == VisualKind::Block {
                    swap_block_columns(ctx, &mut vis);
                } else {
                    std::mem::swap(&mut vis.anchor, &mut ctx.cursor);
                }
                ctx.update_curswant();
                self.visual = Some(vis);
                return Ok(Flow::Done(None));
            }
            ('i' | 'a', Some(n)) => {
                let obj = text_object::lookup(n, ca.cmdchar == 'a').ok_or(EngineError::Beep)?;
                let range = obj.resolve(ctx, ca.count1)?;
                let mut end = range.end;
                if !range.inclusive {
                    if end.col > 0 {
                        end.col -= 1;
                    } else if end.line > range.start.line {
                        end.line -= 1;
                        end.col = ctx.buffer.line_len(end.line).saturating_sub(1);
                    }
                }
                if range.kind == MotionType::Line && vis.kind == VisualKind::Char {
                    vis.kind = VisualKind::Line;
                }
                vis.anchor = range.start;
                ctx.cursor = end;
                ctx.update_curswant();
                self.visual = Some(vis);
                trace!(target: "actions.dispatch", object = obj.name(), "visual_object");
                return Ok(Flow::Done(None));
            }
            ('p' | 'P', _) | ('g', Some('p' | 'P')) => return self.visual_put(ctx, ca, vis),
            ('I' | 'A', _) if vis.kind != VisualKind::Block => return self.visual_insert(ctx, ca, vis),
            _ => {}
        }
        if let Some(m) = super::normal::motion_for(ca) {
            let mc = MotionCtx {
                count: ca.count1,
                has_count: ca.count0 > 0,
                operator: None,
                visual: true,
            };
            let outcome = motion::execute(ctx, m, mc)?;
            motion::move_cursor(ctx, &outcome, true);
            return Ok(Flow::Done(None));
        }
        if let Some((op, kind)) = visual_operator(ca, vis.kind) {
            return self.visual_apply(ctx, ca, vis, op, kind);
        }
        match (ca.cmdchar, ca.nchar) {
            (':', _) => Err(EngineError::NotSupported("Ex commands")),
            ('g', Some('v')) => Err(EngineError::NotSupported("reselect Visual")),
            _ => Err(EngineError::Beep),
        }
    }

    /// End Visual mode, remembering the selection in `'<` and `'>`.
    fn leave_visual(&mut self, ctx: &mut EditorContext, vis: &VisualState) {
        let (start, end) = vis.ordered(ctx.cursor);
        ctx.set_mark('<', start);
        ctx.set_mark('>', end);
        self.visual = None;
        debug!(target: "actions.dispatch", kind = ?vis.kind, "visual_end");
    }

    fn visual_apply(
        &mut self,
        ctx: &mut EditorContext,
        ca: &CommandArgs,
        vis: VisualState,
        op: OperatorKind,
        kind: VisualKind,
    ) -> EngineResult<Flow> {
        if kind == VisualKind::Block && matches!(ca.cmdchar, 'D' | 'C') {
            ctx.curswant = Curswant::Eol;
        }
        let shape = visual_shape(ctx, &vis, kind);
        let end = ctx.cursor;
        self.leave_visual(ctx, &vis);

        let mut args = OperatorArgs::new(op, vis.anchor);
        args.is_visual = true;
        args.register = ca.register;
        args.count = ca.count1;
        if op == OperatorKind::Replace {
            args.replace_char = match (ca.nchar, ca.extra) {
                (Some(CTRL_V), Some(x)) => Some(x),
                (c, _) => c,
            };
        }
        trace!(target: "actions.dispatch", op = op.name(), ?kind, "visual_operator");
        let record = op
            .modifies()
            .then(|| DotRecord::new(ca.register, ca.count0, ca.keys()).with_visual(shape));
        match operator::combine(ctx, args, end, true, motion_type(kind))? {
            OperatorEffect::Done => Ok(Flow::Done(record)),
            OperatorEffect::Insert(req) => Ok(Flow::Insert(req, record)),
        }
    }

    /// `p`/`P` replace the selection with a register.
    fn visual_put(&mut self, ctx: &mut EditorContext, ca: &CommandArgs, vis: VisualState) -> EngineResult<Flow> {
        let shape = visual_shape(ctx, &vis, vis.kind);
        let end = ctx.cursor;
        self.leave_visual(ctx, &vis);
        let mut args = OperatorArgs::new(OperatorKind::Delete, vis.anchor);
        args.is_visual = true;
        args.register = ca.register;
        operator::normalize(ctx, &mut args, end, true, motion_type(vis.kind));
        put::put_visual(ctx, &args, ca.register, ca.count1, ca.cmdchar == 'g')?;
        Ok(Flow::Done(Some(
            DotRecord::new(ca.register, ca.count0, ca.keys()).with_visual(shape),
        )))
    }

    /// `I`/`A` outside block mode: insert before the first selected line or
    /// append after the last one.
    fn visual_insert(&mut self, ctx: &mut EditorContext, ca: &CommandArgs, vis: VisualState) -> EngineResult<Flow> {
        let shape = visual_shape(ctx, &vis, vis.kind);
        let (start, end) = vis.ordered(ctx.cursor);
        self.leave_visual(ctx, &vis);
        ctx.cursor = if ca.cmdchar == 'I' {
            Position::new(start.line, 0)
        } else {
            Position::new(end.line, ctx.buffer.line_len(end.line))
        };
        ctx.update_curswant();
        let req = InsertRequest::new(InsertKind::Insert, ca.cmdchar, ca.count1);
        let record = DotRecord::new(ca.register, ca.count0, ca.keys()).with_visual(shape);
        Ok(Flow::Insert(req, Some(record)))
    }
}

/// Block `O`: move the cursor to the other corner on the same line.
fn swap_block_columns(ctx: &mut EditorContext, vis: &mut VisualState) {
    let ts = ctx.ts();
    let anchor_line = ctx.buffer.line_text(vis.anchor.line);
    let cursor_line = ctx.cur_line();
    let (anchor_vcol, _) = vcol_span(&anchor_line, vis.anchor.col, ts);
    let (cursor_vcol, _) = vcol_span(&cursor_line, ctx.cursor.col, ts);
    vis.anchor.col = col_for_vcol(&anchor_line, cursor_vcol, ts);
    ctx.cursor.col = col_for_vcol(&cursor_line, anchor_vcol, ts);
}
