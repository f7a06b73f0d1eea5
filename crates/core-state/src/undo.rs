//! Snapshot undo with nested transactions.
//!
//! Callers bracket every buffer change with [`UndoEngine::begin`] and
//! [`UndoEngine::end`]. Transactions nest: only the outermost `begin` captures
//! a snapshot and only the matching outermost `end` commits it, so a Change
//! (delete + insert session) or a dot repeat undoes as a single step. A step
//! whose buffer hash equals the snapshot is dropped.

use core_text::{Buffer, Position};
use tracing::trace;

/// Maximum number of snapshots retained in undo history.
pub const UNDO_HISTORY_MAX: usize = 200;

/// A full-state snapshot for undo/redo.
#[derive(Clone, Debug)]
pub struct EditSnapshot {
    pub buffer: Buffer,
    pub cursor: Position,
    pub hash: u64,
}

impl EditSnapshot {
    fn capture(cursor: Position, buffer: &Buffer) -> Self {
        Self {
            buffer: buffer.clone(),
            cursor,
            hash: buffer.content_hash(),
        }
    }
}

#[derive(Debug, Default)]
pub struct UndoEngine {
    undo_stack: Vec<EditSnapshot>,
    redo_stack: Vec<EditSnapshot>,
    depth: usize,
    pending: Option<EditSnapshot>,
    skipped: u64,
}

impl UndoEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }
    /// Open transaction nesting level (0 when idle).
    pub fn nesting(&self) -> usize {
        self.depth
    }
    pub fn snapshots_skipped(&self) -> u64 {
        self.skipped
    }

    /// Open a transaction. The outermost call captures the pre-change state.
    pub fn begin(&mut self, cursor: Position, buffer: &Buffer) {
        if self.depth == 0 {
            self.pending = Some(EditSnapshot::capture(cursor, buffer));
            trace!(target: "state.undo", "transaction_open");
        }
        self.depth += 1;
    }

    /// Close a transaction. Returns true when a new undo step was committed.
    pub fn end(&mut self, buffer: &Buffer) -> bool {
        if self.depth == 0 {
            return false;
        }
        self.depth -= 1;
        if self.depth > 0 {
            return false;
        }
        match self.pending.take() {
            Some(snap) => self.commit(snap, buffer),
            None => false,
        }
    }

    /// Commit what has changed so far and start a fresh step inside the open
    /// transaction (Insert-mode `CTRL-G u`).
    pub fn split(&mut self, cursor: Position, buffer: &Buffer) {
        if self.depth == 0 {
            return;
        }
        if let Some(snap) = self.pending.take() {
            self.commit(snap, buffer);
        }
        self.pending = Some(EditSnapshot::capture(cursor, buffer));
        trace!(target: "state.undo", "transaction_split");
    }

    /// Drop every open transaction, committing the outermost snapshot.
    /// Used by error recovery so a failed command cannot leave nesting open.
    pub fn force_close(&mut self, buffer: &Buffer) {
        if self.depth > 0 {
            trace!(target: "state.undo", depth = self.depth, "transaction_force_close");
            self.depth = 1;
            self.end(buffer);
        }
    }

    fn commit(&mut self, snap: EditSnapshot, buffer: &Buffer) -> bool {
        if snap.hash == buffer.content_hash() {
            self.skipped += 1;
            trace!(target: "state.undo", undo_depth = self.undo_stack.len(), "snapshot_dedupe_skip");
            return false;
        }
        self.undo_stack.push(snap);
        trace!(target: "state.undo", undo_depth = self.undo_stack.len(), redo_depth = self.redo_stack.len(), lines = buffer.line_count(), "push_snapshot");
        if self.undo_stack.len() > UNDO_HISTORY_MAX {
            let _ = self.undo_stack.remove(0);
            trace!(target: "state.undo", "undo_stack_trimmed");
        }
        if !self.redo_stack.is_empty() {
            self.redo_stack.clear();
            trace!(target: "state.undo", "redo_stack_cleared_on_new_edit");
        }
        true
    }

    pub fn undo(&mut self, cursor: &mut Position, buffer: &mut Buffer) -> bool {
        let Some(last) = self.undo_stack.pop() else {
            return false;
        };
        trace!(target: "state.undo", undo_depth = self.undo_stack.len(), redo_depth = self.redo_stack.len(), "undo_pop");
        self.redo_stack.push(EditSnapshot::capture(last.cursor, buffer));
        *buffer = last.buffer;
        *cursor = last.cursor;
        true
    }

    pub fn redo(&mut self, cursor: &mut Position, buffer: &mut Buffer) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        trace!(target: "state.undo", redo_depth = self.redo_stack.len(), undo_depth = self.undo_stack.len(), "redo_pop");
        self.undo_stack.push(EditSnapshot::capture(next.cursor, buffer));
        *buffer = next.buffer;
        *cursor = next.cursor;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn buf(s: &str) -> Buffer {
        Buffer::from_str("t", s).unwrap()
    }

    #[test]
    fn nested_transactions_commit_once() {
        let mut b = buf("abc\n");
        let mut u = UndoEngine::new();
        u.begin(Position::origin(), &b);
        b.delete_range(0, 1);
        u.begin(Position::origin(), &b);
        b.insert_text(0, "X");
        assert!(!u.end(&b));
        assert_eq!(u.nesting(), 1);
        assert!(u.end(&b));
        assert_eq!(u.undo_depth(), 1);

        let mut cur = Position::new(0, 2);
        assert!(u.undo(&mut cur, &mut b));
        assert_eq!(b.text(), "abc\n");
        assert_eq!(cur, Position::origin());
        assert!(u.redo(&mut cur, &mut b));
        assert_eq!(b.text(), "Xbc\n");
    }

    #[test]
    fn unchanged_buffer_is_not_a_step() {
        let mut b = buf("abc\n");
        let mut u = UndoEngine::new();
        u.begin(Position::origin(), &b);
        b.insert_text(0, "x");
        b.delete_range(0, 1);
        assert!(!u.end(&b));
        assert_eq!(u.undo_depth(), 0);
        assert_eq!(u.snapshots_skipped(), 1);
    }

    #[test]
    fn split_creates_two_steps() {
        let mut b = buf("\n");
        let mut u = UndoEngine::new();
        u.begin(Position::origin(), &b);
        b.insert_text(0, "one ");
        u.split(Position::new(0, 4), &b);
        b.insert_text(4, "two");
        u.end(&b);
        assert_eq!(u.undo_depth(), 2);
        let mut cur = Position::origin();
        u.undo(&mut cur, &mut b);
        assert_eq!(b.text(), "one \n");
    }

    #[test]
    fn new_edit_clears_redo() {
        let mut b = buf("a\n");
        let mut u = UndoEngine::new();
        u.begin(Position::origin(), &b);
        b.insert_text(0, "b");
        u.end(&b);
        let mut cur = Position::origin();
        u.undo(&mut cur, &mut b);
        assert_eq!(u.redo_depth(), 1);
        u.begin(cur, &b);
        b.insert_text(0, "c");
        u.end(&b);
        assert_eq!(u.redo_depth(), 0);
    }

    #[test]
    fn force_close_commits_outermost() {
        let mut b = buf("a\n");
        let mut u = UndoEngine::new();
        u.begin(Position::origin(), &b);
        u.begin(Position::origin(), &b);
        b.insert_text(0, "z");
        u.force_close(&b);
        assert_eq!(u.nesting(), 0);
        assert_eq!(u.undo_depth(), 1);
    }

    #[test]
    fn history_is_bounded() {
        let mut b = buf("\n");
        let mut u = UndoEngine::new();
        for i in 0..(UNDO_HISTORY_MAX + 5) {
            u.begin(Position::origin(), &b);
            b.insert_text(0, &i.to_string());
            u.end(&b);
        }
        assert_eq!(u.undo_depth(), UNDO_HISTORY_MAX);
    }
}
