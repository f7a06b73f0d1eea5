//! Normal and Operator-pending mode commands.

use super::{CommandArgs, CommandDispatcher, Flow, PendingOperator, VisualState};
use crate::error::{EngineError, EngineResult};
use crate::insert::{InsertKind, InsertRequest};
use crate::keys::{BS, CR, CTRL_A, CTRL_H, CTRL_N, CTRL_P, CTRL_R, CTRL_V, CTRL_W, CTRL_X, ESC, NL};
use crate::motion::{self, Motion, MotionCtx, MotionType};
use crate::operator::put::{self, PutFlags};
use crate::operator::{self, ForcedMotion, OperatorArgs, OperatorEffect, OperatorKind, case, join};
use crate::repeat::{DotRecord, VisualKind};
use crate::text_object;
use core_state::EditorContext;
use core_text::Position;
use core_text::motion::first_non_blank;
use core_text::width::{indent_string, indent_width};
use tracing::{debug, trace};

/// Operator started by this chunk, if any.
fn operator_key(ca: &CommandArgs) -> Option<OperatorKind> {
    match (ca.cmdchar, ca.nchar) {
        ('g', Some(n)) => OperatorKind::from_key(n, true),
        ('g', None) => None,
        (c, _) => OperatorKind::from_key(c, false),
    }
}

/// Map a chunk to the motion it names.
pub(super) fn motion_for(ca: &CommandArgs) -> Option<Motion> {
    use Motion::*;
    let mark_name = |c: char| if c == '`' { '\'' } else { c };
    let m = match (ca.cmdchar, ca.nchar) {
        ('h', _) => Left,
        (BS | CTRL_H, _) => BackspaceLeft,
        ('l', _) => Right,
        (' ', _) => SpaceRight,
        ('j' | NL | CTRL_N, _) => Down,
        ('k' | CTRL_P, _) => Up,
        ('+' | CR, _) => LineFirstNonBlank { forward: true },
        ('-', _) => LineFirstNonBlank { forward: false },
        ('_', _) => CurrentLineNonBlank,
        ('0', _) => LineStart,
        ('^', _) => FirstNonBlank,
        ('$', _) => LineEnd,
        ('|', _) => Column,
        ('w', _) => WordForward { big: false },
        ('W', _) => WordForward { big: true },
        ('b', _) => WordBackward { big: false },
        ('B', _) => WordBackward { big: true },
        ('e', _) => WordEnd { big: false },
        ('E', _) => WordEnd { big: true },
        ('G', _) => GotoLine { last: true },
        ('f', Some(t)) => FindChar { target: t, forward: true, till: false },
        ('F', Some(t)) => FindChar { target: t, forward: false, till: false },
        ('t', Some(t)) => FindChar { target: t, forward: true, till: true },
        ('T', Some(t)) => FindChar { target: t, forward: false, till: true },
        (';', _) => RepeatFind { reverse: false },
        (',', _) => RepeatFind { reverse: true },
        ('}', _) => Paragraph { forward: true },
        ('{', _) => Paragraph { forward: false },
        ('%', _) => Percent,
        ('\'', Some(n)) => Mark { name: mark_name(n), linewise: true },
        ('`', Some(n)) => Mark { name: mark_name(n), linewise: false },
        ('*', _) => SearchWord { forward: true, whole: true },
        ('#', _) => SearchWord { forward: false, whole: true },
        ('n', _) => SearchNext { reverse: false },
        ('N', _) => SearchNext { reverse: true },
        ('g', Some(n)) => match n {
            'g' => GotoLine { last: false },
            'e' => WordEndBackward { big: false },
            'E' => WordEndBackward { big: true },
            '0' => LineStart,
            '^' => FirstNonBlank,
            '$' => LineEnd,
            'm' => LineMiddle,
            'j' => Down,
            'k' => Up,
            '*' => SearchWord { forward: true, whole: false },
            '#' => SearchWord { forward: false, whole: false },
            '\'' => Mark { name: mark_name(ca.extra?), linewise: true },
            '`' => Mark { name: mark_name(ca.extra?), linewise: false },
            _ => return None,
        },
        _ => return None,
    };
    Some(m)
}

/// The chunk repeats the pending operator (`dd`, `gUU`, `gUgU`, `g??`).
fn is_doubled(p: &PendingOperator, ca: &CommandArgs) -> bool {
    match p.keys.as_slice() {
        ['g', second, ..] => {
            (ca.cmdchar == *second && ca.nchar.is_none())
                || (ca.cmdchar == 'g' && ca.nchar == Some(*second))
        }
        [first, ..] => ca.cmdchar == *first && ca.nchar.is_none(),
        [] => false,
    }
}

fn unsupported(ca: &CommandArgs) -> Option<&'static str> {
    let what = match (ca.cmdchar, ca.nchar) {
        (CTRL_W, _) => "window commands",
        ('z', _) => "z commands",
        ('Z', _) => "ZZ and ZQ",
        (':', _) => "Ex commands",
        ('/' | '?', _) => "search patterns",
        ('&', _) => "substitute repeat",
        ('q' | '@', _) => "recording and macros",
        ('Q', _) => "Ex mode",
        ('K', _) => "keyword lookup",
        (CTRL_A | CTRL_X, _) => "number increment",
        ('[' | ']', _) => "bracket commands",
        ('U', _) => "line undo",
        ('g', Some('R' | 'r')) => "virtual replace",
        ('g', Some('v')) => "reselect Visual",
        _ => return None,
    };
    Some(what)
}

fn mark_settable(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '\'' | '`' | '[' | ']' | '<' | '>')
}

impl CommandDispatcher {
    pub(super) fn normal_command(&mut self, ctx: &mut EditorContext, ca: &CommandArgs) -> EngineResult<Flow> {
        if let Some(pending) = self.pending.take() {
            return self.operator_pending_command(ctx, pending, ca);
        }
        if ca.cmdchar == ESC {
            if ca.count0 == 0 && ca.register.is_none() {
                return Err(EngineError::Beep);
            }
            return Ok(Flow::Aborted("escape"));
        }
        if let Some(op) = operator_key(ca) {
            let mut keys = vec![ca.cmdchar];
            keys.extend(ca.nchar);
            trace!(target: "actions.dispatch", op = op.name(), count = ca.count0, "operator_pending");
            self.pending = Some(PendingOperator {
                op,
                start: ctx.cursor,
                forced: None,
                keys,
            });
            return Ok(Flow::NeedMore);
        }
        if let Some(m) = motion_for(ca) {
            let mc = MotionCtx::plain(ca.count0);
            let outcome = motion::execute(ctx, m, mc)?;
            motion::move_cursor(ctx, &outcome, false);
            return Ok(Flow::Done(None));
        }
        self.simple_command(ctx, ca)
    }

    fn operator_pending_command(
        &mut self,
        ctx: &mut EditorContext,
        mut pending: PendingOperator,
        ca: &CommandArgs,
    ) -> EngineResult<Flow> {
        if ca.cmdchar == ESC {
            return Ok(Flow::Aborted("escape"));
        }
        let forced = match ca.cmdchar {
            'v' => Some(ForcedMotion::Char),
            'V' => Some(ForcedMotion::Line),
            CTRL_V => Some(ForcedMotion::Block),
            _ => None,
        };
        if forced.is_some() {
            pending.forced = forced;
            pending.keys.push(ca.cmdchar);
            self.pending = Some(pending);
            return Ok(Flow::NeedMore);
        }
        if is_doubled(&pending, ca) {
            return self.operator_lines(ctx, pending, ca);
        }
        if operator_key(ca).is_some() {
            debug!(target: "actions.dispatch", op = pending.op.name(), "operator_mismatch");
            return Err(EngineError::Beep);
        }
        if let ('i' | 'a', Some(n)) = (ca.cmdchar, ca.nchar) {
            let obj = text_object::lookup(n, ca.cmdchar == 'a').ok_or(EngineError::Beep)?;
            let range = obj.resolve(ctx, ca.count1)?;
            trace!(target: "actions.dispatch", object = obj.name(), "text_object");
            return self.apply_operator(ctx, pending, ca, range.start, range.end, range.inclusive, range.kind, false);
        }
        match motion_for(ca) {
            Some(m) => self.operator_motion(ctx, pending, ca, m),
            None => Err(EngineError::Beep),
        }
    }

    fn operator_motion(
        &mut self,
        ctx: &mut EditorContext,
        pending: PendingOperator,
        ca: &CommandArgs,
        m: Motion,
    ) -> EngineResult<Flow> {
        let mc = MotionCtx {
            count: ca.count1,
            has_count: ca.count0 > 0,
            operator: Some(pending.op),
            visual: false,
        };
        let outcome = motion::execute(ctx, m, mc)?;
        if outcome.jump {
            ctx.set_mark('\'', pending.start);
        }
        let start = pending.start;
        self.apply_operator(
            ctx,
            pending,
            ca,
            start,
            outcome.pos,
            outcome.inclusive,
            outcome.kind,
            outcome.use_reg_one,
        )
    }

    /// `dd`, `3>>`, `cc`: the operator over count lines from the cursor.
    fn operator_lines(&mut self, ctx: &mut EditorContext, pending: PendingOperator, ca: &CommandArgs) -> EngineResult<Flow> {
        let last = ctx.line_count() - 1;
        let line = pending.start.line;
        if ca.count1 > 1 && line == last {
            return Err(EngineError::Beep);
        }
        let end = Position::new((line + ca.count1 - 1).min(last), 0);
        let start = pending.start;
        self.apply_operator(ctx, pending, ca, start, end, false, MotionType::Line, false)
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_operator(
        &mut self,
        ctx: &mut EditorContext,
        pending: PendingOperator,
        ca: &CommandArgs,
        start: Position,
        end: Position,
        inclusive: bool,
        kind: MotionType,
        use_reg_one: bool,
    ) -> EngineResult<Flow> {
        let mut args = OperatorArgs::new(pending.op, start);
        args.register = ca.register;
        args.forced = pending.forced;
        args.use_reg_one = use_reg_one;
        args.count = ca.count1;
        let record = pending.op.modifies().then(|| {
            let mut keys = pending.keys;
            keys.extend(ca.keys());
            DotRecord::new(ca.register, ca.count0, keys)
        });
        match operator::combine(ctx, args, end, inclusive, kind)? {
            OperatorEffect::Done => Ok(Flow::Done(record)),
            OperatorEffect::Insert(req) => Ok(Flow::Insert(req, record)),
        }
    }

    /// `x`, `D`, `S`, ...: an operator and a fixed motion typed as one key.
    fn shortcut(&mut self, ctx: &mut EditorContext, ca: &CommandArgs, op: OperatorKind, m: Option<Motion>) -> EngineResult<Flow> {
        let pending = PendingOperator {
            op,
            start: ctx.cursor,
            forced: None,
            keys: Vec::new(),
        };
        match m {
            Some(m) => self.operator_motion(ctx, pending, ca, m),
            None => self.operator_lines(ctx, pending, ca),
        }
    }

    fn simple_command(&mut self, ctx: &mut EditorContext, ca: &CommandArgs) -> EngineResult<Flow> {
        let record = || Some(DotRecord::new(ca.register, ca.count0, ca.keys()));
        match (ca.cmdchar, ca.nchar) {
            ('x', _) => self.shortcut(ctx, ca, OperatorKind::Delete, Some(Motion::Right)),
            ('X', _) => self.shortcut(ctx, ca, OperatorKind::Delete, Some(Motion::Left)),
            ('D', _) => self.shortcut(ctx, ca, OperatorKind::Delete, Some(Motion::LineEnd)),
            ('C', _) => self.shortcut(ctx, ca, OperatorKind::Change, Some(Motion::LineEnd)),
            ('s', _) => self.shortcut(ctx, ca, OperatorKind::Change, Some(Motion::Right)),
            ('S', _) => self.shortcut(ctx, ca, OperatorKind::Change, None),
            ('Y', _) => self.shortcut(ctx, ca, OperatorKind::Yank, None),
            ('r', Some(c)) => {
                let c = if c == CTRL_V { ca.extra.unwrap_or(c) } else { c };
                case::replace_chars(ctx, c, ca.count1)?;
                Ok(Flow::Done(record()))
            }
            ('~', _) => {
                case::swap_chars(ctx, ca.count1)?;
                Ok(Flow::Done(record()))
            }
            ('J', _) => {
                join::join_command(ctx, ca.count0, true)?;
                Ok(Flow::Done(record()))
            }
            ('g', Some('J')) => {
                join::join_command(ctx, ca.count0, false)?;
                Ok(Flow::Done(record()))
            }
            ('p' | 'P', _) | ('g', Some('p' | 'P')) => {
                let gp = ca.cmdchar == 'g';
                let forward = if gp { ca.nchar == Some('p') } else { ca.cmdchar == 'p' };
                let flags = PutFlags {
                    cursor_after: gp,
                    ..PutFlags::default()
                };
                put::put_register(ctx, ca.register, forward, ca.count1, flags)?;
                Ok(Flow::Done(record()))
            }
            ('i' | 'a' | 'I' | 'A' | 'R', _) | ('g', Some('I')) => {
                let req = self.start_insert(ctx, ca);
                Ok(Flow::Insert(req, record()))
            }
            ('o' | 'O', _) => {
                let req = open_line(ctx, ca.cmdchar == 'o', ca);
                Ok(Flow::Insert(req, record()))
            }
            ('u', _) => {
                undo_redo(ctx, ca.count1, false)?;
                Ok(Flow::Done(None))
            }
            (CTRL_R, _) => {
                undo_redo(ctx, ca.count1, true)?;
                Ok(Flow::Done(None))
            }
            ('.', _) => Ok(Flow::Repeat(ca.count0)),
            ('m', Some(n)) => {
                if !mark_settable(n) {
                    return Err(EngineError::Beep);
                }
                let name = if n == '`' { '\'' } else { n };
                ctx.set_mark(name, ctx.cursor);
                Ok(Flow::Done(None))
            }
            ('v' | 'V' | CTRL_V, _) => {
                let Some(kind) = VisualKind::from_key(ca.cmdchar) else {
                    return Err(EngineError::Beep);
                };
                debug!(target: "actions.dispatch", ?kind, "visual_start");
                self.visual = Some(VisualState {
                    kind,
                    anchor: ctx.cursor,
                });
                Ok(Flow::Done(None))
            }
            _ => match unsupported(ca) {
                Some(what) => Err(EngineError::NotSupported(what)),
                None => Err(EngineError::Beep),
            },
        }
    }

    fn start_insert(&mut self, ctx: &mut EditorContext, ca: &CommandArgs) -> InsertRequest {
        let line = ctx.cursor.line;
        let len = ctx.buffer.line_len(line);
        let mut kind = InsertKind::Insert;
        match (ca.cmdchar, ca.nchar) {
            ('a', _) if len > 0 => ctx.cursor.col = (ctx.cursor.col + 1).min(len),
            ('I', _) => ctx.cursor.col = first_non_blank(&ctx.cur_line()),
            ('A', _) => ctx.cursor.col = len,
            ('g', _) => ctx.cursor.col = 0,
            ('R', _) => kind = InsertKind::Replace,
            _ => {}
        }
        ctx.update_curswant();
        InsertRequest::new(kind, ca.cmdchar, ca.count1)
    }
}

/// `o`/`O`: open a line carrying the current indent and insert there. The
/// undo step opened here is closed by the insert session.
fn open_line(ctx: &mut EditorContext, below: bool, ca: &CommandArgs) -> InsertRequest {
    let ai = ctx.options.editor.autoindent;
    let indent = if ai {
        let width = indent_width(&ctx.cur_line(), ctx.ts());
        indent_string(width, ctx.ts(), ctx.options.editor.expandtab)
    } else {
        String::new()
    };
    let at = if below { ctx.cursor.line + 1 } else { ctx.cursor.line };
    let col = indent.chars().count();
    ctx.begin_change();
    ctx.buffer.insert_lines(at, &[indent]);
    ctx.cursor = Position::new(at, col);
    ctx.update_curswant();
    trace!(target: "actions.dispatch", line = at, indent = col, "open_line");
    let mut req = InsertRequest::new(InsertKind::Insert, ca.cmdchar, ca.count1);
    req.owns_transaction = true;
    req.did_ai = ai;
    req.ai_col = col;
    req
}

fn undo_redo(ctx: &mut EditorContext, count: usize, redo: bool) -> EngineResult<()> {
    let mut done = 0;
    for _ in 0..count {
        let stepped = if redo { ctx.redo_step() } else { ctx.undo_step() };
        if !stepped {
            break;
        }
        done += 1;
    }
    debug!(target: "state.undo", redo, count, done, "undo_command");
    if done == 0 {
        return Err(EngineError::Beep);
    }
    Ok(())
}
