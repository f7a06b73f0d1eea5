//! Insert and Replace mode.
//!
//! An [`EditModeController`] lives for one Insert/Replace session. It is
//! created by the dispatcher once the command that enters the mode (`i`,
//! `cw`, block `I`, ...) has set the buffer up, receives every key until the
//! session ends, and on exit repeats the typed text for a count, replicates a
//! block insert to the other block lines, and closes the undo step.
//!
//! Keys are recorded as they resolve, so feeding [`EditModeController::typed`]
//! back into a fresh session reproduces the insert. That recording doubles as
//! the `".` register and as the text part of a `.` repeat.

pub mod continuation;
pub mod replace_stack;
mod tab;

use crate::block::{self, BlockOp, BlockSpan};
use crate::error::{EngineError, EngineResult};
use crate::keys::{
    CR, CTRL_A, CTRL_C, CTRL_D, CTRL_E, CTRL_G, CTRL_K, CTRL_N, CTRL_O, CTRL_P, CTRL_Q, CTRL_R, CTRL_T, CTRL_U,
    CTRL_V, CTRL_W, CTRL_X, CTRL_Y, ESC, NL, NUL, TAB, is_backspace,
};
use crate::operator::check_guard;
use crate::operator::shift::{set_indent, shifted_indent};
use continuation::{Continuation, ContinuationStep};
use core_state::{EditorContext, RegisterKind};
use core_text::motion::{first_non_blank, is_blank, is_word_char};
use core_text::width::{col_for_vcol, indent_string, indent_width, vcol_of, vcol_span};
use core_text::{MarkId, Position, char_width};
use replace_stack::{ReplaceEntry, ReplaceStack};
use tab::TabOptions;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertKind {
    Insert,
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockInsertKind {
    Insert,
    Append,
    Change,
}

/// Block geometry captured when a block `I`, `A` or `c` starts, used on exit
/// to copy the text typed on the first line to the others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInsert {
    pub kind: BlockInsertKind,
    pub span: BlockSpan,
    pub first: usize,
    pub last: usize,
    pub textcol: usize,
    pub textlen: usize,
    /// Length of the first line not counting the typed text.
    pub pre_textlen: usize,
    pub start_col: usize,
}

/// How a session starts. Built by the command that enters Insert mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertRequest {
    pub kind: InsertKind,
    pub count: usize,
    pub cmdchar: char,
    pub block: Option<BlockInsert>,
    /// The current line got an automatic indent nothing was typed after yet.
    pub did_ai: bool,
    pub ai_col: usize,
    /// An undo step is already open; the session closes it on exit.
    pub owns_transaction: bool,
}

impl InsertRequest {
    pub fn new(kind: InsertKind, cmdchar: char, count: usize) -> Self {
        Self {
            kind,
            count: count.max(1),
            cmdchar,
            block: None,
            did_ai: false,
            ai_col: 0,
            owns_transaction: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertStep {
    Continue,
    /// Process these keys next, before any further host input.
    Stuff(Vec<char>),
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BsMode {
    Char,
    Word,
    WordNotSpace,
    Line,
}

fn is_control(c: char) -> bool {
    (c as u32) < 0x20 || c == '\u{7f}'
}

pub struct EditModeController {
    kind: InsertKind,
    count: usize,
    cmdchar: char,
    block: Option<BlockInsert>,
    did_ai: bool,
    ai_col: usize,
    /// Start of the insert; follows edits made elsewhere in the buffer.
    insstart: MarkId,
    /// Where the insert started, as seen by the backspace limits.
    insstart_orig: Position,
    replace: ReplaceStack,
    pending: Option<Continuation>,
    typed: Vec<char>,
    /// Keys of a count repeat still to come back through `feed`; not recorded.
    replay_left: usize,
    inserted_space: bool,
    last_key: Option<char>,
    restarted: bool,
    finished: bool,
}

impl EditModeController {
    pub fn start(ctx: &mut EditorContext, req: InsertRequest) -> Self {
        if !req.owns_transaction {
            ctx.begin_change();
        }
        ctx.clamp_cursor(true);
        let insstart = ctx.buffer.create_mark(ctx.cursor);
        debug!(
            target: "actions.insert",
            kind = ?req.kind,
            cmd = %req.cmdchar,
            count = req.count,
            block = req.block.is_some(),
            line = ctx.cursor.line,
            col = ctx.cursor.col,
            "insert_start"
        );
        Self {
            kind: req.kind,
            count: req.count.max(1),
            cmdchar: req.cmdchar,
            block: req.block,
            did_ai: req.did_ai,
            ai_col: req.ai_col,
            insstart,
            insstart_orig: ctx.cursor,
            replace: ReplaceStack::new(),
            pending: None,
            typed: Vec::new(),
            replay_left: 0,
            inserted_space: false,
            last_key: None,
            restarted: false,
            finished: false,
        }
    }

    pub fn kind(&self) -> InsertKind {
        self.kind
    }

    pub fn cmdchar(&self) -> char {
        self.cmdchar
    }

    /// Keys recorded so far, in replayable form.
    pub fn typed(&self) -> &[char] {
        &self.typed
    }

    /// The insert was restarted at another spot (`CTRL-G j`), so the command
    /// that entered the mode no longer describes it.
    pub fn restarted(&self) -> bool {
        self.restarted
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// A multi-key command is waiting for its next key.
    pub fn awaiting_key(&self) -> bool {
        self.pending.is_some()
    }

    pub fn feed(&mut self, ctx: &mut EditorContext, c: char) -> EngineResult<InsertStep> {
        let recording = if self.replay_left > 0 {
            self.replay_left -= 1;
            false
        } else {
            true
        };
        let Some(mut cont) = self.pending.take() else {
            return self.dispatch(ctx, c, recording);
        };
        match cont.step(c) {
            ContinuationStep::NeedMore => {
                self.pending = Some(cont);
                Ok(InsertStep::Continue)
            }
            ContinuationStep::Cancel => Ok(InsertStep::Continue),
            ContinuationStep::Literal { ch, refeed } => {
                self.put_char(ctx, ch)?;
                self.record_literal(recording, ch);
                self.last_key = None;
                match refeed {
                    Some(next) => self.dispatch(ctx, next, recording),
                    None => Ok(InsertStep::Continue),
                }
            }
            ContinuationStep::Register { name, literally } => self.insert_register(ctx, name, literally),
            ContinuationStep::CtrlG(k) => self.ctrl_g(ctx, k),
        }
    }

    /// End the session after an error, without count repeat or block copy.
    pub fn abort(&mut self, ctx: &mut EditorContext) {
        if !self.finished
            && let Err(e) = self.finish(ctx, true)
        {
            warn!(target: "actions.insert", error = %e, "abort_finish_failed");
        }
    }

    fn dispatch(&mut self, ctx: &mut EditorContext, c: char, recording: bool) -> EngineResult<InsertStep> {
        let mut recorded = Some(c);
        let mut space = false;
        match c {
            ESC => return self.escape(ctx, false),
            CTRL_C => return self.escape(ctx, true),
            CTRL_V | CTRL_Q => {
                self.pending = Some(Continuation::literal());
                recorded = None;
            }
            CTRL_K => {
                self.pending = Some(Continuation::digraph());
                recorded = None;
            }
            CTRL_R => {
                self.pending = Some(Continuation::register());
                recorded = None;
            }
            CTRL_G => {
                self.pending = Some(Continuation::CtrlG);
                recorded = None;
            }
            CTRL_O => return Err(EngineError::NotSupported("CTRL-O in Insert mode")),
            CTRL_N | CTRL_P | CTRL_X => return Err(EngineError::NotSupported("insert completion")),
            CTRL_A => return self.insert_last(ctx, false),
            NUL => return self.insert_last(ctx, true),
            c if is_backspace(c) => self.backspace(ctx, BsMode::Char)?,
            CTRL_W => self.backspace(ctx, BsMode::Word)?,
            CTRL_U => self.backspace(ctx, BsMode::Line)?,
            TAB => self.tab(ctx)?,
            CR | NL => self.newline(ctx)?,
            CTRL_T | CTRL_D => self.shift(ctx, c == CTRL_D)?,
            CTRL_E | CTRL_Y => {
                let ch = self.copy_char(ctx, c == CTRL_E)?;
                self.record_literal(recording, ch);
                recorded = None;
            }
            c => {
                self.put_char(ctx, c)?;
                space = c == ' ';
            }
        }
        if space {
            self.inserted_space = true;
        }
        if recording && let Some(k) = recorded {
            self.typed.push(k);
        }
        self.last_key = Some(c);
        Ok(InsertStep::Continue)
    }

    fn record_literal(&mut self, recording: bool, ch: char) {
        if !recording {
            return;
        }
        if is_control(ch) {
            self.typed.push(CTRL_V);
        }
        self.typed.push(ch);
    }

    fn insstart(&self, ctx: &EditorContext) -> Position {
        ctx.buffer.mark(self.insstart).unwrap_or(self.insstart_orig)
    }

    /// Insert or overwrite one char at the cursor.
    fn put_char(&mut self, ctx: &mut EditorContext, c: char) -> EngineResult<()> {
        let pos = ctx.cursor;
        check_guard(ctx, pos.line, pos.line)?;
        let off = ctx.buffer.offset_of(pos);
        let mut buf = [0u8; 4];
        let s: &str = c.encode_utf8(&mut buf);
        if self.kind == InsertKind::Replace {
            self.replace.push_nul();
            if let Some(old) = ctx.buffer.char_at(pos) {
                self.replace.push(old);
                ctx.buffer.replace_range(off, off + 1, s);
            } else {
                ctx.buffer.insert_text(off, s);
            }
        } else {
            ctx.buffer.insert_text(off, s);
        }
        ctx.cursor.col += 1;
        self.did_ai = false;
        Ok(())
    }

    /// Rewrite line `line` from `old` to `new`, touching only the span that differs.
    fn write_line(ctx: &mut EditorContext, line: usize, old: &[char], new: &[char]) {
        let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
        let room = old.len().min(new.len()) - prefix;
        let suffix = old
            .iter()
            .rev()
            .zip(new.iter().rev())
            .take(room)
            .take_while(|(a, b)| a == b)
            .count();
        if prefix == old.len() && prefix == new.len() {
            return;
        }
        let start = ctx.buffer.line_start(line);
        let text: String = new[prefix..new.len() - suffix].iter().collect();
        ctx.buffer
            .replace_range(start + prefix, start + old.len() - suffix, &text);
    }

    fn delete_under_cursor(ctx: &mut EditorContext) {
        if ctx.buffer.char_at(ctx.cursor).is_some() {
            let off = ctx.buffer.offset_of(ctx.cursor);
            ctx.buffer.delete_range(off, off + 1);
        }
    }

    /// Put back one Replace-mode group: the chars it overwrote go in at the
    /// cursor, which ends on the first of them.
    fn pop_insert(&mut self, ctx: &mut EditorContext) {
        for ch in self.replace.pop_group() {
            let off = ctx.buffer.offset_of(ctx.cursor);
            ctx.buffer.insert_text(off, &ch.to_string());
        }
    }

    /// Backspace over the char under the cursor in Replace mode.
    fn replace_do_bs(&mut self, ctx: &mut EditorContext) -> EngineResult<()> {
        match self.replace.pop() {
            Some(ReplaceEntry::Char(cc)) => {
                Self::delete_under_cursor(ctx);
                self.replace.push(cc);
                self.pop_insert(ctx);
            }
            Some(ReplaceEntry::Nul) => Self::delete_under_cursor(ctx),
            None => {
                warn!(target: "actions.insert", line = ctx.cursor.line, col = ctx.cursor.col, "replace_stack_empty");
                return Err(EngineError::Internal("replace stack empty".into()));
            }
        }
        Ok(())
    }

    fn bs_one(&mut self, ctx: &mut EditorContext, vcol: &mut usize) -> EngineResult<()> {
        ctx.cursor.col -= 1;
        *vcol = vcol_of(&ctx.cur_line(), ctx.cursor.col, ctx.ts());
        if self.kind == InsertKind::Replace {
            let start = self.insstart(ctx);
            if ctx.cursor.line != start.line || ctx.cursor.col >= start.col {
                self.replace_do_bs(ctx)?;
            }
        } else {
            Self::delete_under_cursor(ctx);
        }
        Ok(())
    }

    fn backspace(&mut self, ctx: &mut EditorContext, mode: BsMode) -> EngineResult<()> {
        let bs = ctx.options.editor.backspace.clone();
        let cur = ctx.cursor;
        let orig = self.insstart_orig;
        let empty = ctx.line_count() == 1 && ctx.buffer.line_len(0) == 0;
        if empty
            || (cur.line == 0 && cur.col == 0)
            || (!bs.start && cur.line == orig.line && cur.col <= orig.col)
            || (!bs.indent && self.ai_col > 0 && cur.col <= self.ai_col)
            || (!bs.eol && cur.col == 0)
        {
            return Err(EngineError::Beep);
        }

        if cur.col == 0 {
            check_guard(ctx, cur.line - 1, cur.line)?;
            let start_line = self.insstart(ctx).line;
            let cc = if self.kind == InsertKind::Replace {
                self.replace.pop()
            } else {
                None
            };
            let prev_len = ctx.buffer.line_len(cur.line - 1);
            if self.kind == InsertKind::Replace && cur.line <= start_line {
                ctx.cursor = Position::new(cur.line - 1, prev_len.saturating_sub(1));
            } else {
                let nl = ctx.buffer.line_end(cur.line - 1);
                ctx.buffer.delete_range(nl, nl + 1);
                ctx.cursor = Position::new(cur.line - 1, prev_len);
                if self.kind == InsertKind::Replace {
                    // Blanks the line break dropped go back after the join point.
                    let mut cc = cc;
                    while let Some(ReplaceEntry::Char(ch)) = cc {
                        let off = ctx.buffer.offset_of(ctx.cursor);
                        ctx.buffer.insert_text(off, &ch.to_string());
                        cc = self.replace.pop();
                    }
                    self.pop_insert(ctx);
                }
            }
            trace!(target: "actions.insert", line = cur.line, "backspace_join");
            self.did_ai = false;
            return Ok(());
        }

        check_guard(ctx, cur.line, cur.line)?;
        let text = ctx.cur_line();
        let chars: Vec<char> = text.chars().collect();
        let col = cur.col.min(chars.len());
        let in_indent = chars[..col].iter().all(|c| is_blank(*c));
        let opts = &ctx.options.editor;
        let (sts, smarttab, sw, ts) = (opts.softtabstop, opts.smarttab, ctx.sw(), ctx.ts());
        let mut mincol = 0;
        if mode == BsMode::Line && opts.autoindent {
            let fnb = first_non_blank(&text);
            if fnb < col {
                mincol = fnb;
            }
        }
        let prev = chars[col - 1];

        if mode == BsMode::Char
            && ((smarttab && in_indent) || (sts != 0 && (prev == '\t' || (prev == ' ' && !self.inserted_space))))
        {
            self.inserted_space = false;
            let mut vcol = vcol_of(&text, col, ts);
            let start_vcol = vcol;
            let (_, prev_end) = vcol_span(&text, col - 1, ts);
            let unit = if smarttab && in_indent { sw } else { sts }.max(1);
            let want = (prev_end / unit) * unit;
            while vcol > want && ctx.cursor.col > 0 {
                let before = ctx.buffer.char_at(Position::new(ctx.cursor.line, ctx.cursor.col - 1));
                if !before.is_some_and(is_blank) {
                    break;
                }
                self.bs_one(ctx, &mut vcol)?;
            }
            while vcol < want {
                let off = ctx.buffer.offset_of(ctx.cursor);
                ctx.buffer.insert_text(off, " ");
                if self.kind == InsertKind::Replace {
                    self.replace.push_nul();
                }
                ctx.cursor.col += 1;
                vcol = vcol_of(&ctx.cur_line(), ctx.cursor.col, ts);
            }
            if vcol >= start_vcol {
                self.bs_one(ctx, &mut vcol)?;
            }
        } else {
            let mut mode = mode;
            let mut word = false;
            loop {
                ctx.cursor.col -= 1;
                let cc = ctx.cur_char().unwrap_or(' ');
                if mode == BsMode::Word && !is_blank(cc) {
                    mode = BsMode::WordNotSpace;
                    word = is_word_char(cc);
                } else if mode == BsMode::WordNotSpace && (is_blank(cc) || is_word_char(cc) != word) {
                    ctx.cursor.col += 1;
                    break;
                }
                if self.kind == InsertKind::Replace {
                    self.replace_do_bs(ctx)?;
                } else {
                    Self::delete_under_cursor(ctx);
                }
                if mode == BsMode::Char {
                    break;
                }
                let c = ctx.cursor;
                let orig = self.insstart_orig;
                if !(c.col > mincol && (bs.nostop || c.line != orig.line || c.col != orig.col)) {
                    break;
                }
            }
        }
        if ctx.cursor.line == self.insstart_orig.line && ctx.cursor.col < self.insstart_orig.col {
            self.insstart_orig.col = ctx.cursor.col;
        }
        trace!(target: "actions.insert", mode = ?mode, from = col, to = ctx.cursor.col, "backspace");
        self.did_ai = false;
        Ok(())
    }

    fn tab(&mut self, ctx: &mut EditorContext) -> EngineResult<()> {
        let line = ctx.cursor.line;
        let old: Vec<char> = ctx.cur_line().chars().collect();
        let col = ctx.cursor.col.min(old.len());
        let in_indent = old[..col].iter().all(|c| is_blank(*c));
        let e = &ctx.options.editor;
        let opts = TabOptions {
            ts: ctx.ts(),
            sw: ctx.sw(),
            sts: e.softtabstop,
            expandtab: e.expandtab,
            smarttab: e.smarttab,
        };
        if opts.is_literal(in_indent) {
            return self.put_char(ctx, TAB);
        }
        check_guard(ctx, line, line)?;
        self.did_ai = false;
        let start = self.insstart(ctx);
        let insstart_col = (start.line == line).then_some(start.col);
        let mut new = old.clone();
        let replace = (self.kind == InsertKind::Replace).then_some(&mut self.replace);
        let res = tab::insert_soft_tab(&mut new, col, &opts, in_indent, replace, insstart_col);
        Self::write_line(ctx, line, &old, &new);
        if let (Some(from), Some(sc)) = (res.changed_from, insstart_col)
            && from < sc
        {
            ctx.buffer.set_mark(self.insstart, Position::new(line, from));
        }
        ctx.cursor.col = res.col;
        trace!(target: "actions.insert", col = res.col, folded = res.changed_from.is_some(), "soft_tab");
        Ok(())
    }

    fn newline(&mut self, ctx: &mut EditorContext) -> EngineResult<()> {
        let line = ctx.cursor.line;
        check_guard(ctx, line, line)?;
        let text = ctx.cur_line();
        let chars: Vec<char> = text.chars().collect();
        let col = ctx.cursor.col.min(chars.len());
        let replace = self.kind == InsertKind::Replace;
        let autoindent = ctx.options.editor.autoindent;
        let ts = ctx.ts();
        if replace {
            // The line break itself overwrote nothing.
            self.replace.push_nul();
            self.replace.push_nul();
        }
        let mut lead = 0;
        let mut indent = String::new();
        let mut keep = col;
        if autoindent {
            lead = chars[col..].iter().take_while(|c| is_blank(**c)).count();
            if replace {
                for c in &chars[col..col + lead] {
                    self.replace.push(*c);
                }
            }
            indent = indent_string(indent_width(&text, ts), ts, ctx.options.editor.expandtab);
            if self.did_ai {
                keep = chars[..col].iter().rposition(|c| !is_blank(*c)).map_or(0, |i| i + 1);
            }
        }
        let start = ctx.buffer.line_start(line);
        if lead > 0 {
            ctx.buffer.delete_range(start + col, start + col + lead);
        }
        ctx.buffer
            .replace_range(start + keep, start + col, &format!("\n{indent}"));
        let indent_len = indent.chars().count();
        if replace {
            for _ in 0..indent_len {
                self.replace.push_nul();
            }
        }
        ctx.cursor = Position::new(line + 1, indent_len);
        self.did_ai = autoindent;
        self.ai_col = if autoindent { indent_len } else { 0 };
        self.inserted_space = false;
        trace!(target: "actions.insert", line, indent = indent_len, "newline");
        Ok(())
    }

    /// `CTRL-T` / `CTRL-D`. After a typed `0` or `^`, `CTRL-D` removes all indent.
    fn shift(&mut self, ctx: &mut EditorContext, left: bool) -> EngineResult<()> {
        let line = ctx.cursor.line;
        check_guard(ctx, line, line)?;
        let ts = ctx.ts();
        let prev = ctx
            .cursor
            .col
            .checked_sub(1)
            .and_then(|c| ctx.buffer.char_at(Position::new(line, c)));
        let remove_all = left && matches!(self.last_key, Some('0' | '^')) && prev == self.last_key;
        if remove_all {
            ctx.cursor.col -= 1;
            Self::delete_under_cursor(ctx);
            if self.kind == InsertKind::Replace {
                self.pop_insert(ctx);
            }
        }

        let text = ctx.cur_line();
        let old_fnb = first_non_blank(&text);
        let old_indent = indent_width(&text, ts);
        let col = ctx.cursor.col;
        let vcol = vcol_of(&text, col, ts);
        let fix_replace = self.kind == InsertKind::Replace && col <= old_fnb;
        let target = if remove_all {
            0
        } else {
            shifted_indent(old_indent, ctx.sw(), left, 1, true)
        };
        let start = self.insstart(ctx);
        set_indent(ctx, line, target);
        let new_text = ctx.cur_line();
        let new_fnb = first_non_blank(&new_text);
        let mut less = old_fnb as isize - new_fnb as isize;

        ctx.cursor.col = if col >= old_fnb {
            if col == old_fnb {
                less = isize::MAX;
            }
            new_fnb + (col - old_fnb)
        } else {
            let from_end = old_indent.saturating_sub(vcol);
            let want = target.saturating_sub(from_end);
            col_for_vcol(&new_text, want, ts).min(new_fnb)
        };
        if fix_replace {
            // Indent chars before the cursor: new ones were inserted, removed ones merge into the next group.
            let after = ctx.cursor.col;
            for _ in col..after {
                self.replace.push_nul();
            }
            for _ in after..col {
                self.replace.join(0);
            }
        }
        let adjust = |c: usize| -> usize {
            if less >= c as isize {
                0
            } else {
                (c as isize - less) as usize
            }
        };
        if start.line == line && start.col != 0 {
            ctx.buffer.set_mark(self.insstart, Position::new(line, adjust(start.col)));
        }
        if self.insstart_orig.line == line && self.insstart_orig.col != 0 {
            self.insstart_orig.col = adjust(self.insstart_orig.col);
        }
        self.ai_col = adjust(self.ai_col);
        if self.did_ai && new_text.chars().any(|c| !is_blank(c)) {
            self.did_ai = false;
        }
        trace!(target: "actions.insert", left, remove_all, indent = target, "shift_indent");
        Ok(())
    }

    /// `CTRL-E` / `CTRL-Y`: insert the char at the same screen column on the
    /// line below or above.
    fn copy_char(&mut self, ctx: &mut EditorContext, below: bool) -> EngineResult<char> {
        let line = ctx.cursor.line;
        let other = if below { line + 1 } else { line.checked_sub(1).ok_or(EngineError::Beep)? };
        if other >= ctx.line_count() {
            return Err(EngineError::Beep);
        }
        let ts = ctx.ts();
        let vcol = vcol_of(&ctx.cur_line(), ctx.cursor.col, ts);
        let chars: Vec<char> = ctx.buffer.line_text(other).chars().collect();
        let (mut cells, mut idx, mut prev) = (0, 0, 0);
        while cells < vcol && idx < chars.len() {
            prev = idx;
            cells += char_width(chars[idx], cells, ts);
            idx += 1;
        }
        if cells > vcol {
            idx = prev;
        }
        let ch = chars.get(idx).copied().ok_or(EngineError::Beep)?;
        self.put_char(ctx, ch)?;
        Ok(ch)
    }

    fn insert_register(&mut self, ctx: &mut EditorContext, name: char, literally: bool) -> EngineResult<InsertStep> {
        let reg = ctx
            .registers
            .get(Some(name))?
            .filter(|r| !r.is_empty())
            .cloned()
            .ok_or(EngineError::Beep)?;
        let rows = reg.rows();
        let linewise = reg.kind() == RegisterKind::Line;
        let mut keys = Vec::new();
        for (i, row) in rows.iter().enumerate() {
            for c in row.chars() {
                if literally && is_control(c) && c != TAB {
                    keys.push(CTRL_V);
                }
                keys.push(c);
            }
            if linewise || i + 1 < rows.len() {
                keys.push(NL);
            }
        }
        trace!(target: "actions.insert", register = %name, literally, keys = keys.len(), "insert_register");
        Ok(InsertStep::Stuff(keys))
    }

    /// `CTRL-A` / `CTRL-@`: type the previous insert again.
    fn insert_last(&mut self, ctx: &mut EditorContext, then_exit: bool) -> EngineResult<InsertStep> {
        let last: Vec<char> = ctx
            .registers
            .last_inserted()
            .map(|s| s.chars().collect())
            .unwrap_or_default();
        if last.is_empty() {
            return if then_exit {
                self.escape(ctx, false)
            } else {
                Err(EngineError::Beep)
            };
        }
        let mut keys = last;
        if then_exit {
            keys.push(ESC);
        }
        Ok(InsertStep::Stuff(keys))
    }

    fn ctrl_g(&mut self, ctx: &mut EditorContext, k: char) -> EngineResult<InsertStep> {
        match k {
            'u' => {
                ctx.undo.split(ctx.cursor, &ctx.buffer);
                trace!(target: "actions.insert", "undo_split");
            }
            'j' | NL => self.move_and_restart(ctx, true)?,
            'k' | CTRL_K => self.move_and_restart(ctx, false)?,
            'U' => {}
            _ => return Err(EngineError::Beep),
        }
        Ok(InsertStep::Continue)
    }

    /// Move a line down or up to the column the insert started in and begin
    /// a new insert there.
    fn move_and_restart(&mut self, ctx: &mut EditorContext, down: bool) -> EngineResult<()> {
        let line = ctx.cursor.line;
        let target = if down { line + 1 } else { line.checked_sub(1).ok_or(EngineError::Beep)? };
        if target >= ctx.line_count() {
            return Err(EngineError::Beep);
        }
        let ts = ctx.ts();
        let start = self.insstart(ctx);
        let vcol = vcol_of(&ctx.buffer.line_text(start.line), start.col, ts);
        let text = ctx.buffer.line_text(target);
        ctx.cursor = Position::new(target, col_for_vcol(&text, vcol, ts));
        ctx.undo.split(ctx.cursor, &ctx.buffer);
        ctx.buffer.set_mark(self.insstart, ctx.cursor);
        self.insstart_orig = ctx.cursor;
        self.typed.clear();
        self.count = 1;
        self.replace.clear();
        self.did_ai = false;
        self.ai_col = 0;
        self.block = None;
        self.cmdchar = if self.kind == InsertKind::Replace { 'R' } else { 'i' };
        self.restarted = true;
        trace!(target: "actions.insert", line = target, col = ctx.cursor.col, "insert_restart");
        Ok(())
    }

    fn escape(&mut self, ctx: &mut EditorContext, interrupted: bool) -> EngineResult<InsertStep> {
        if !interrupted && self.count > 1 {
            self.count -= 1;
            let mut keys = Vec::with_capacity(self.typed.len() + 2);
            if matches!(self.cmdchar, 'o' | 'O') {
                keys.push(CR);
            }
            keys.extend_from_slice(&self.typed);
            keys.push(ESC);
            self.replay_left = keys.len();
            trace!(target: "actions.insert", remaining = self.count, "insert_repeat");
            return Ok(InsertStep::Stuff(keys));
        }
        self.finish(ctx, interrupted)?;
        Ok(InsertStep::Exit)
    }

    fn finish(&mut self, ctx: &mut EditorContext, interrupted: bool) -> EngineResult<()> {
        self.finished = true;
        self.pending = None;
        if self.did_ai {
            let text = ctx.cur_line();
            let keep = text.trim_end_matches(is_blank).chars().count();
            let len = text.chars().count();
            if keep < len && ctx.cursor.col >= keep {
                let start = ctx.buffer.line_start(ctx.cursor.line);
                ctx.buffer.delete_range(start + keep, start + len);
                ctx.cursor.col = keep;
            }
        }
        ctx.registers.set_last_inserted(self.typed.iter().collect());
        ctx.set_mark('^', ctx.cursor);
        ctx.set_mark('.', ctx.cursor);
        if ctx.cursor.col > 0 {
            ctx.cursor.col -= 1;
        }
        let block_result = match self.block.take() {
            Some(b) if !interrupted => self.finish_block(ctx, &b),
            _ => Ok(()),
        };
        ctx.end_change();
        ctx.buffer.remove_mark(self.insstart);
        self.replace.clear();
        ctx.clamp_cursor(false);
        ctx.update_curswant();
        debug!(
            target: "actions.insert",
            typed = self.typed.len(),
            interrupted,
            line = ctx.cursor.line,
            col = ctx.cursor.col,
            "insert_end"
        );
        block_result
    }

    /// Copy what was typed on the first block line to the other lines.
    fn finish_block(&self, ctx: &mut EditorContext, b: &BlockInsert) -> EngineResult<()> {
        if ctx.cursor.line != b.first || b.last <= b.first {
            return Ok(());
        }
        let ts = ctx.ts();
        let first_text = ctx.buffer.line_text(b.first);
        let first_chars: Vec<char> = first_text.chars().collect();
        let len = first_chars.len();
        let (op, ins) = match b.kind {
            BlockInsertKind::Change => {
                let Some(ins_len) = len.checked_sub(b.pre_textlen).filter(|n| *n > 0) else {
                    return Ok(());
                };
                let end = (b.textcol + ins_len).min(len);
                (BlockOp::Change, first_chars[b.textcol.min(end)..end].iter().collect::<String>())
            }
            BlockInsertKind::Insert | BlockInsertKind::Append => {
                let append = b.kind == BlockInsertKind::Append;
                let op = if append { BlockOp::Append } else { BlockOp::Insert };
                let (mut textcol, mut textlen) = (b.textcol, b.textlen);
                let mut pre_textlen = b.pre_textlen as isize;
                let mut bd2 = block::prepare(&first_text, &b.span, op, true, ts);
                if !b.span.to_eol || bd2.textlen < b.textlen {
                    if append {
                        pre_textlen += bd2.textlen as isize - b.textlen as isize;
                        if bd2.endspaces > 0 {
                            bd2.textlen = bd2.textlen.saturating_sub(1);
                        }
                    }
                    textcol = bd2.textcol;
                    textlen = bd2.textlen;
                }
                let add = (textcol + if append { textlen } else { 0 }).min(len);
                let ins_len = len as isize - add as isize - pre_textlen;
                if pre_textlen < 0 || ins_len <= 0 {
                    return Ok(());
                }
                (op, first_chars[add..add + ins_len as usize].iter().collect::<String>())
            }
        };
        check_guard(ctx, b.first + 1, b.last)?;
        let lines: Vec<String> = (b.first + 1..=b.last)
            .map(|l| {
                let text = ctx.buffer.line_text(l);
                let bd = block::prepare(&text, &b.span, op, true, ts);
                match b.kind {
                    BlockInsertKind::Change if bd.is_short => text,
                    BlockInsertKind::Change => {
                        let mut out: String = text.chars().take(bd.textcol).collect();
                        out.push_str(&ins);
                        out.extend(text.chars().skip(bd.textcol));
                        out
                    }
                    kind => block::insert_line(&text, &bd, &b.span, &ins, kind == BlockInsertKind::Insert)
                        .unwrap_or(text),
                }
            })
            .collect();
        block::apply_line_rewrites(&mut ctx.buffer, b.first + 1, &lines);
        if b.kind != BlockInsertKind::Change {
            ctx.cursor = Position::new(b.first, b.start_col);
        }
        debug!(target: "actions.block", kind = ?b.kind, lines = b.last - b.first, text = %ins, "block_insert_copy");
        Ok(())
    }
}
