//! Replace-mode undo log.
//!
//! Every char typed in Replace mode pushes a group boundary followed by the
//! char it overwrote, if any. Backspace pops a group to restore the line.

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceEntry {
    /// Group boundary. Popped alone it means "the char here was inserted".
    Nul,
    Char(char),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplaceStack {
    entries: Vec<ReplaceEntry>,
}

impl ReplaceStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn push_nul(&mut self) {
        self.entries.push(ReplaceEntry::Nul);
    }

    pub fn push(&mut self, c: char) {
        self.entries.push(ReplaceEntry::Char(c));
    }

    /// `None` when the stack is empty.
    pub fn pop(&mut self) -> Option<ReplaceEntry> {
        self.entries.pop()
    }

    /// Pop chars up to and including the next group boundary, newest first.
    pub fn pop_group(&mut self) -> Vec<char> {
        let mut out = Vec::new();
        while let Some(entry) = self.entries.pop() {
            match entry {
                ReplaceEntry::Nul => break,
                ReplaceEntry::Char(c) => out.push(c),
            }
        }
        out
    }

    /// Merge two groups by removing the `off`-th boundary counted from the top.
    pub fn join(&mut self, off: usize) {
        let mut skip = off;
        for i in (0..self.entries.len()).rev() {
            if self.entries[i] == ReplaceEntry::Nul {
                if skip == 0 {
                    self.entries.remove(i);
                    return;
                }
                skip -= 1;
            }
        }
        warn!(target: "actions.insert", off, depth = self.entries.len(), "replace_join_missing_boundary");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn groups_pop_up_to_the_boundary() {
        let mut s = ReplaceStack::new();
        s.push_nul();
        s.push('a');
        s.push_nul();
        s.push('b');
        s.push('c');
        assert_eq!(s.pop_group(), vec!['c', 'b']);
        assert_eq!(s.pop(), Some(ReplaceEntry::Char('a')));
        assert_eq!(s.pop(), Some(ReplaceEntry::Nul));
        assert_eq!(s.pop(), None);
    }

    #[test]
    fn join_removes_the_requested_boundary() {
        let mut s = ReplaceStack::new();
        s.push_nul();
        s.push('x');
        s.push_nul();
        s.push_nul();
        s.join(1);
        assert_eq!(s.len(), 3);
        assert_eq!(s.pop(), Some(ReplaceEntry::Nul));
        assert_eq!(s.pop(), Some(ReplaceEntry::Char('x')));
    }
}
