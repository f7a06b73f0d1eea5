//! Host-facing engine.
//!
//! An [`Engine`] owns the [`EditorContext`], the command dispatcher and the
//! Insert session, and is driven one key at a time through [`Engine::feed`].
//! Keys the engine generates itself (the count repeat of an insert, the keys
//! of a `.` repeat) go through a stuff queue that is drained before `feed`
//! returns, so every call runs to completion.
//!
//! Errors never escape `feed`. The engine recovers at the chunk boundary:
//! the pending command and Visual mode are dropped, an open insert is
//! finalised, a dangling undo step is closed, and the error is reported as
//! [`DispatchResult::Error`].

use crate::dispatcher::{CommandDispatcher, Flow};
use crate::error::EngineError;
use crate::insert::{EditModeController, InsertKind, InsertStep};
use crate::keys::{key_name, parse_keys};
use crate::repeat::{DotRecord, VisualKind};
use core_config::Options;
use core_state::{EditorContext, RegisterStore, Yankreg};
use core_text::{Buffer, Position};
use std::collections::VecDeque;
use std::thread::{self, ThreadId};
use tracing::{debug, error, trace, warn};

/// Mode as seen by the host (cursor shape, status line).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    Normal,
    OperatorPending,
    Insert,
    Replace,
    Visual(VisualKind),
}

/// Outcome of one [`Engine::feed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    /// The key was consumed; the command needs more keys.
    NeedMore,
    Executed,
    EnteredInsertMode,
    ExitedInsertMode,
    /// Escape or [`Engine::cancel`] dropped a command in flight.
    Aborted(&'static str),
    /// The command failed; the engine is back in Normal mode.
    Error(EngineError),
}

pub struct Engine {
    ctx: EditorContext,
    dispatcher: CommandDispatcher,
    insert: Option<EditModeController>,
    /// Last repeatable change.
    dot: Option<DotRecord>,
    /// Record of the command whose Insert session is running.
    building: Option<DotRecord>,
    stuff: VecDeque<char>,
    replaying: bool,
    owner: ThreadId,
}

impl Engine {
    pub fn new(buffer: Buffer, options: Options) -> Self {
        Self {
            ctx: EditorContext::new(buffer, options),
            dispatcher: CommandDispatcher::new(),
            insert: None,
            dot: None,
            building: None,
            stuff: VecDeque::new(),
            replaying: false,
            owner: thread::current().id(),
        }
    }

    /// Process one key, then every key it generated.
    pub fn feed(&mut self, c: char) -> DispatchResult {
        assert_eq!(
            thread::current().id(),
            self.owner,
            "Engine::feed called off its owner thread"
        );
        trace!(target: "engine.feed", key = %key_name(c), "key");
        let mut result = self.process(c);
        while let Some(k) = self.stuff.pop_front() {
            result = self.process(k);
        }
        if self.replaying {
            self.replaying = false;
            if !matches!(result, DispatchResult::Error(_)) && self.insert.is_none() {
                result = DispatchResult::Executed;
            }
        }
        result
    }

    /// Feed keys written in `<Esc>` notation. Mostly for tests and scripts.
    pub fn feed_str(&mut self, notation: &str) -> Vec<DispatchResult> {
        parse_keys(notation).into_iter().map(|c| self.feed(c)).collect()
    }

    /// Abort whatever is in flight and return to Normal mode.
    pub fn cancel(&mut self) -> DispatchResult {
        debug!(
            target: "engine.feed",
            mode = ?self.current_mode(),
            "cancel"
        );
        if let Some(mut ctl) = self.insert.take() {
            ctl.abort(&mut self.ctx);
        }
        self.building = None;
        self.dispatcher.reset();
        self.stuff.clear();
        self.replaying = false;
        self.close_dangling_undo();
        self.ctx.clamp_cursor(false);
        DispatchResult::Aborted("cancel")
    }

    pub fn current_mode(&self) -> EditorMode {
        if let Some(ctl) = &self.insert {
            return match ctl.kind() {
                InsertKind::Insert => EditorMode::Insert,
                InsertKind::Replace => EditorMode::Replace,
            };
        }
        if let Some(vis) = self.dispatcher.visual() {
            return EditorMode::Visual(vis.kind);
        }
        if self.dispatcher.operator_pending() {
            EditorMode::OperatorPending
        } else {
            EditorMode::Normal
        }
    }

    /// The next key is a literal argument and must not go through mappings.
    pub fn mapping_suppressed(&self) -> bool {
        match &self.insert {
            Some(ctl) => ctl.awaiting_key(),
            None => self.dispatcher.awaiting_extra_char(),
        }
    }

    pub fn buffer(&self) -> &Buffer {
        &self.ctx.buffer
    }

    pub fn text(&self) -> String {
        self.ctx.buffer.text()
    }

    pub fn cursor(&self) -> Position {
        self.ctx.cursor
    }

    pub fn set_cursor(&mut self, pos: Position) {
        self.ctx.cursor = pos;
        self.ctx.clamp_cursor(self.insert.is_some());
        self.ctx.update_curswant();
    }

    pub fn registers(&self) -> &RegisterStore {
        &self.ctx.registers
    }

    pub fn registers_mut(&mut self) -> &mut RegisterStore {
        &mut self.ctx.registers
    }

    /// Content of register `name` (`None` for the unnamed one).
    pub fn register(&self, name: Option<char>) -> Option<Yankreg> {
        self.ctx.registers.get(name).ok().flatten().cloned()
    }

    pub fn set_register(&mut self, name: char, reg: Yankreg) -> Result<(), EngineError> {
        self.ctx.registers.set(name, reg).map_err(EngineError::from)
    }

    pub fn status(&self) -> Option<&str> {
        self.ctx.status.as_deref()
    }

    pub fn beeps(&self) -> u64 {
        self.ctx.beeps
    }

    pub fn options(&self) -> &Options {
        &self.ctx.options
    }

    pub fn context(&self) -> &EditorContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut EditorContext {
        &mut self.ctx
    }

    /// Protect lines `first..=last` from modification.
    pub fn guard_lines(&mut self, first: usize, last: usize) {
        self.ctx.buffer.guard_lines(first, last);
    }

    /// Hand the engine to the calling thread.
    pub fn rebind_owner(&mut self) {
        self.owner = thread::current().id();
    }

    fn process(&mut self, c: char) -> DispatchResult {
        if self.insert.is_some() {
            return self.insert_key(c);
        }
        match self.dispatcher.feed(&mut self.ctx, c) {
            Ok(flow) => self.apply_flow(flow),
            Err(e) => self.recover(e),
        }
    }

    fn apply_flow(&mut self, flow: Flow) -> DispatchResult {
        match flow {
            Flow::NeedMore => DispatchResult::NeedMore,
            Flow::Done(record) => {
                if let Some(record) = record {
                    self.dot = Some(record);
                }
                DispatchResult::Executed
            }
            Flow::Insert(req, record) => {
                self.building = record;
                self.insert = Some(EditModeController::start(&mut self.ctx, req));
                DispatchResult::EnteredInsertMode
            }
            Flow::Repeat(count) => self.repeat(count),
            Flow::Aborted(reason) => {
                debug!(target: "engine.feed", reason, "aborted");
                DispatchResult::Aborted(reason)
            }
        }
    }

    fn insert_key(&mut self, c: char) -> DispatchResult {
        let Some(ctl) = self.insert.as_mut() else {
            return self.recover(EngineError::Internal("no insert session".into()));
        };
        match ctl.feed(&mut self.ctx, c) {
            Ok(InsertStep::Continue) if ctl.awaiting_key() => DispatchResult::NeedMore,
            Ok(InsertStep::Continue) => DispatchResult::Executed,
            Ok(InsertStep::Stuff(keys)) => {
                for k in keys.into_iter().rev() {
                    self.stuff.push_front(k);
                }
                DispatchResult::Executed
            }
            Ok(InsertStep::Exit) => self.finish_insert(),
            Err(EngineError::Beep) => {
                self.ctx.beep(None);
                DispatchResult::Executed
            }
            Err(e) => self.recover(e),
        }
    }

    fn finish_insert(&mut self) -> DispatchResult {
        let Some(ctl) = self.insert.take() else {
            return DispatchResult::ExitedInsertMode;
        };
        if let Some(mut record) = self.building.take() {
            if ctl.restarted() {
                record = DotRecord::new(None, 0, vec![ctl.cmdchar()]);
            }
            record.finish_insert(ctl.typed());
            trace!(target: "engine.feed", keys = record.keys.len(), inserted = record.inserted.len(), "dot_recorded");
            self.dot = Some(record);
        }
        DispatchResult::ExitedInsertMode
    }

    /// `.`: stuff the recorded keys, rebuilding a Visual selection first.
    fn repeat(&mut self, count: usize) -> DispatchResult {
        let Some(record) = self.dot.as_mut() else {
            return self.recover(EngineError::Beep);
        };
        record.prepare(count);
        let record = record.clone();
        if let Some(shape) = record.visual {
            self.dispatcher.start_visual_replay(&mut self.ctx, shape);
        }
        for k in record.replay_keys().into_iter().rev() {
            self.stuff.push_front(k);
        }
        self.replaying = true;
        debug!(target: "engine.feed", count = record.count, register = ?record.register, "repeat");
        DispatchResult::Executed
    }

    fn close_dangling_undo(&mut self) {
        let depth = self.ctx.undo.nesting();
        if depth > 0 {
            warn!(target: "engine.feed", depth, "undo_step_left_open");
            self.ctx.undo.force_close(&self.ctx.buffer);
        }
    }

    fn recover(&mut self, e: EngineError) -> DispatchResult {
        debug!(target: "engine.feed", error = %e, "recover");
        self.dispatcher.reset();
        if let Some(mut ctl) = self.insert.take() {
            ctl.abort(&mut self.ctx);
        }
        self.building = None;
        self.stuff.clear();
        self.replaying = false;
        self.close_dangling_undo();
        match &e {
            EngineError::Beep => self.ctx.beep(None),
            EngineError::NotSupported(_) => self.ctx.status = Some(e.to_string()),
            EngineError::GuardedRegion { .. } => self.ctx.beep(Some(e.to_string())),
            EngineError::Internal(msg) => {
                error!(target: "engine.feed", %msg, "internal_error");
                self.ctx.status = Some(e.to_string());
            }
        }
        self.ctx.clamp_cursor(false);
        DispatchResult::Error(e)
    }
}
