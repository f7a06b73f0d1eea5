//! Command chunk parser.
//!
//! A chunk is an optional count followed by a command char and, for some
//! commands, one or two extra chars (`fx`, `gU`, `g'a`, `r<C-v>x`). The
//! parser owns the state that survives between chunks while an operator is
//! pending: the register selected with `"x` and the count typed before the
//! operator, which multiplies the count typed before the motion.
//!
//! Nothing here touches the buffer; a finished chunk is handed to the
//! dispatcher as [`CommandArgs`].

use crate::keys::{CTRL_C, CTRL_V, CTRL_W, ESC};
use core_state::RegisterStore;
use tracing::trace;

/// Counts saturate here instead of overflowing.
pub const MAX_COUNT: usize = 999_999_999;

/// One parsed command chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandArgs {
    pub cmdchar: char,
    pub nchar: Option<char>,
    /// Third char of `g'x`, `` g`x `` and `r<C-v>x`.
    pub extra: Option<char>,
    /// Count as typed, multiplied by the count before the operator; 0 if none.
    pub count0: usize,
    /// `count0`, or 1 when no count was given.
    pub count1: usize,
    pub register: Option<char>,
}

impl CommandArgs {
    fn empty() -> Self {
        Self {
            cmdchar: '\0',
            nchar: None,
            extra: None,
            count0: 0,
            count1: 1,
            register: None,
        }
    }

    /// The command chars without count or register, as typed.
    pub fn keys(&self) -> Vec<char> {
        let mut keys = vec![self.cmdchar];
        if self.cmdchar == 'r'
            && self.nchar == Some(CTRL_V)
            && let Some(x) = self.extra
        {
            keys.extend([CTRL_V, x]);
            return keys;
        }
        keys.extend(self.nchar);
        keys.extend(self.extra);
        keys
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// Start of a chunk: `0` is a command here.
    AwaitingCount,
    /// Digits were typed; more digits extend the count.
    AwaitingCommandChar,
    /// The command char needs more chars. Mappings must not apply.
    AwaitingExtraChar,
    /// The last chunk is complete.
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Register,
    Nchar,
    Third,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseStep {
    NeedMore,
    Ready(CommandArgs),
    /// Escape or `CTRL-C` while extra chars were expected.
    Cancelled,
}

/// What the dispatcher is doing when a key arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseContext {
    pub operator_pending: bool,
    pub visual: bool,
}

fn needs_nchar(c: char, pc: ParseContext) -> bool {
    matches!(c, 'f' | 'F' | 't' | 'T' | '\'' | '`' | 'g' | 'z' | '[' | ']')
        || (!pc.operator_pending && matches!(c, 'm' | 'r' | 'Z' | '@' | 'q'))
        || ((pc.operator_pending || pc.visual) && matches!(c, 'i' | 'a'))
}

fn needs_third(cmdchar: char, nchar: char) -> bool {
    match cmdchar {
        'g' => matches!(nchar, '\'' | '`' | 'r'),
        'r' => nchar == CTRL_V,
        _ => false,
    }
}

#[derive(Debug)]
pub struct CommandParser {
    state: ParserState,
    slot: Slot,
    args: CommandArgs,
    /// Count typed before the operator or register; kept across chunks.
    opcount: usize,
    register: Option<char>,
    /// `CTRL-W` was typed; the next non-digit completes a window command.
    ctrl_w: bool,
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::Ready,
            slot: Slot::Nchar,
            args: CommandArgs::empty(),
            opcount: 0,
            register: None,
            ctrl_w: false,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn awaiting_extra_char(&self) -> bool {
        self.state == ParserState::AwaitingExtraChar
    }

    /// Something was typed that has not formed a command yet.
    pub fn in_chunk(&self) -> bool {
        matches!(self.state, ParserState::AwaitingCommandChar | ParserState::AwaitingExtraChar)
            || (self.state == ParserState::AwaitingCount && (self.ctrl_w || self.register.is_some()))
    }

    pub fn register(&self) -> Option<char> {
        self.register
    }

    /// The command finished: forget the register and the outer count.
    pub fn finish_command(&mut self) {
        self.register = None;
        self.opcount = 0;
        self.ctrl_w = false;
        self.state = ParserState::Ready;
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn begin_chunk(&mut self, pc: ParseContext) {
        self.args = CommandArgs::empty();
        self.ctrl_w = false;
        if !pc.operator_pending && self.register.is_none() {
            self.opcount = 0;
        }
        self.state = ParserState::AwaitingCount;
    }

    pub fn feed(&mut self, c: char, pc: ParseContext) -> ParseStep {
        if self.state == ParserState::Ready {
            self.begin_chunk(pc);
        }
        match self.state {
            ParserState::AwaitingExtraChar => self.extra_char(c),
            _ => self.count_or_command(c, pc),
        }
    }

    fn count_or_command(&mut self, c: char, pc: ParseContext) -> ParseStep {
        if let Some(d) = c.to_digit(10)
            && (d != 0 || self.args.count0 != 0)
        {
            self.args.count0 = self
                .args
                .count0
                .saturating_mul(10)
                .saturating_add(d as usize)
                .min(MAX_COUNT);
            self.state = ParserState::AwaitingCommandChar;
            return ParseStep::NeedMore;
        }
        if self.ctrl_w {
            if c == ESC || c == CTRL_C {
                return self.cancel();
            }
            self.args.cmdchar = CTRL_W;
            self.args.nchar = Some(c);
            self.apply_counts();
            return self.ready();
        }
        if c == CTRL_W && !pc.operator_pending {
            self.ctrl_w = true;
            self.opcount = self.args.count0;
            self.args.count0 = 0;
            self.state = ParserState::AwaitingCount;
            return ParseStep::NeedMore;
        }
        self.args.cmdchar = c;
        self.apply_counts();
        if c == '"' && !pc.operator_pending {
            self.slot = Slot::Register;
            self.state = ParserState::AwaitingExtraChar;
            return ParseStep::NeedMore;
        }
        if needs_nchar(c, pc) {
            self.slot = Slot::Nchar;
            self.state = ParserState::AwaitingExtraChar;
            return ParseStep::NeedMore;
        }
        self.ready()
    }

    fn apply_counts(&mut self) {
        if self.opcount != 0 {
            self.args.count0 = if self.args.count0 != 0 {
                self.args.count0.saturating_mul(self.opcount).min(MAX_COUNT)
            } else {
                self.opcount
            };
        }
        self.opcount = self.args.count0;
        self.args.count1 = self.args.count0.max(1);
    }

    fn extra_char(&mut self, c: char) -> ParseStep {
        let literal = self.slot == Slot::Third && self.args.cmdchar == 'r';
        if !literal && (c == ESC || c == CTRL_C) {
            return self.cancel();
        }
        match self.slot {
            Slot::Register => {
                if !RegisterStore::is_valid_name(c) {
                    // Completes as a bad `"` command; the dispatcher beeps.
                    self.args.nchar = Some(c);
                    return self.ready();
                }
                self.register = Some(c);
                self.opcount = self.args.count0;
                trace!(target: "actions.dispatch", register = %c, opcount = self.opcount, "register_selected");
                self.args = CommandArgs::empty();
                self.state = ParserState::AwaitingCount;
                ParseStep::NeedMore
            }
            Slot::Nchar => {
                self.args.nchar = Some(c);
                if needs_third(self.args.cmdchar, c) {
                    self.slot = Slot::Third;
                    return ParseStep::NeedMore;
                }
                self.ready()
            }
            Slot::Third => {
                self.args.extra = Some(c);
                self.ready()
            }
        }
    }

    fn ready(&mut self) -> ParseStep {
        self.state = ParserState::Ready;
        self.args.register = self.register;
        trace!(
            target: "actions.dispatch",
            cmd = %self.args.cmdchar.escape_debug(),
            nchar = ?self.args.nchar,
            count0 = self.args.count0,
            register = ?self.register,
            "chunk_ready"
        );
        ParseStep::Ready(self.args.clone())
    }

    fn cancel(&mut self) -> ParseStep {
        trace!(target: "actions.dispatch", cmd = %self.args.cmdchar.escape_debug(), "chunk_cancelled");
        self.reset();
        ParseStep::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::parse_keys;
    use pretty_assertions::assert_eq;

    const NORMAL: ParseContext = ParseContext {
        operator_pending: false,
        visual: false,
    };
    const OP: ParseContext = ParseContext {
        operator_pending: true,
        visual: false,
    };

    fn parse(p: &mut CommandParser, keys: &str, pc: ParseContext) -> ParseStep {
        let mut last = ParseStep::NeedMore;
        for c in parse_keys(keys) {
            last = p.feed(c, pc);
        }
        last
    }

    fn ready(step: ParseStep) -> CommandArgs {
        match step {
            ParseStep::Ready(args) => args,
            other => panic!("expected a complete chunk, got {other:?}"),
        }
    }

    #[test]
    fn zero_is_a_command_until_digits_start() {
        let mut p = CommandParser::new();
        let a = ready(parse(&mut p, "0", NORMAL));
        assert_eq!((a.cmdchar, a.count0), ('0', 0));
        let a = ready(parse(&mut p, "10l", NORMAL));
        assert_eq!((a.cmdchar, a.count0, a.count1), ('l', 10, 10));
    }

    #[test]
    fn counts_around_an_operator_multiply() {
        let mut p = CommandParser::new();
        let a = ready(parse(&mut p, "2d", NORMAL));
        assert_eq!((a.cmdchar, a.count0), ('d', 2));
        let a = ready(parse(&mut p, "3w", OP));
        assert_eq!((a.cmdchar, a.count0), ('w', 6));
        p.finish_command();
        // Only the outer count.
        ready(parse(&mut p, "4d", NORMAL));
        assert_eq!(ready(parse(&mut p, "w", OP)).count0, 4);
        p.finish_command();
        // Only the inner count.
        ready(parse(&mut p, "d", NORMAL));
        assert_eq!(ready(parse(&mut p, "5w", OP)).count0, 5);
        p.finish_command();
        // The outer count is dropped once nothing is pending.
        ready(parse(&mut p, "7x", NORMAL));
        assert_eq!(ready(parse(&mut p, "x", NORMAL)).count0, 0);
    }

    #[test]
    fn register_prefix_keeps_the_count() {
        let mut p = CommandParser::new();
        assert_eq!(parse(&mut p, "2\"a", NORMAL), ParseStep::NeedMore);
        let a = ready(parse(&mut p, "3p", NORMAL));
        assert_eq!((a.cmdchar, a.count0, a.register), ('p', 6, Some('a')));
        p.finish_command();
        assert_eq!(ready(parse(&mut p, "p", NORMAL)).register, None);
    }

    #[test]
    fn invalid_register_completes_as_a_bad_command() {
        let mut p = CommandParser::new();
        let a = ready(parse(&mut p, "\"!", NORMAL));
        assert_eq!((a.cmdchar, a.nchar), ('"', Some('!')));
    }

    #[test]
    fn extra_chars_depend_on_context() {
        let mut p = CommandParser::new();
        let a = ready(parse(&mut p, "fx", NORMAL));
        assert_eq!(a.nchar, Some('x'));
        // `i` and `a` take an object char only after an operator.
        assert_eq!(ready(parse(&mut p, "i", NORMAL)).nchar, None);
        assert_eq!(ready(parse(&mut p, "iw", OP)).nchar, Some('w'));
        // `r` and `m` complete at once while an operator is pending.
        assert_eq!(ready(parse(&mut p, "r", OP)).nchar, None);
        let a = ready(parse(&mut p, "g'a", NORMAL));
        assert_eq!((a.nchar, a.extra), (Some('\''), Some('a')));
        let a = ready(parse(&mut p, "r<C-v><Esc>", NORMAL));
        assert_eq!(a.extra, Some(ESC));
        assert_eq!(a.keys(), vec!['r', CTRL_V, ESC]);
    }

    #[test]
    fn escape_cancels_a_partial_chunk() {
        let mut p = CommandParser::new();
        assert_eq!(parse(&mut p, "f", NORMAL), ParseStep::NeedMore);
        assert!(p.awaiting_extra_char());
        assert_eq!(parse(&mut p, "<Esc>", NORMAL), ParseStep::Cancelled);
        assert!(!p.awaiting_extra_char());
        assert_eq!(parse(&mut p, "\"<C-c>", NORMAL), ParseStep::Cancelled);
    }

    #[test]
    fn window_prefix_takes_digits_then_a_char() {
        let mut p = CommandParser::new();
        let a = ready(parse(&mut p, "<C-w>3j", NORMAL));
        assert_eq!((a.cmdchar, a.nchar, a.count0), (CTRL_W, Some('j'), 3));
    }

    #[test]
    fn count_saturates() {
        let mut p = CommandParser::new();
        let a = ready(parse(&mut p, "99999999999999x", NORMAL));
        assert_eq!(a.count0, MAX_COUNT);
    }
}
