//! Normal-mode motions.
//!
//! A motion never moves the cursor itself: it reports a [`MotionOutcome`]
//! (target, motion type, inclusiveness, how the wanted column changes) and the
//! dispatcher either moves the cursor or hands the range to the operator engine.
//! Operator-pending context changes a few motions (`w` stops at end of line,
//! `l` on the last char becomes inclusive, `cw` acts like `ce`).

use crate::error::{EngineError, EngineResult};
use crate::operator::OperatorKind;
use core_state::{CharSearch, Curswant, EditorContext, WordSearch};
use core_text::motion::{
    bck_word, bckend_word, end_word, find_char, find_paragraph, first_non_blank,
    fwd_word, is_blank, is_word_char, match_pair,
};
use core_text::search::{search, word_pattern};
use core_text::{Position, width};
use tracing::trace;

/// How a motion range is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionType {
    Char,
    Line,
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Left,
    Right,
    /// `<BS>`: wraps to the previous line.
    BackspaceLeft,
    /// `<Space>`: wraps to the next line.
    SpaceRight,
    Up,
    Down,
    /// `+`, `<CR>`, `-`.
    LineFirstNonBlank { forward: bool },
    /// `_`: count - 1 lines down, first non-blank.
    CurrentLineNonBlank,
    LineStart,
    FirstNonBlank,
    LineEnd,
    Column,
    /// `gm`.
    LineMiddle,
    WordForward { big: bool },
    WordBackward { big: bool },
    WordEnd { big: bool },
    WordEndBackward { big: bool },
    /// `gg` (`last == false`) and `G`.
    GotoLine { last: bool },
    FindChar { target: char, forward: bool, till: bool },
    RepeatFind { reverse: bool },
    Paragraph { forward: bool },
    /// `%`; with a count it jumps to that percentage of the file.
    Percent,
    Mark { name: char, linewise: bool },
    /// `*`, `#`, `g*`, `g#`.
    SearchWord { forward: bool, whole: bool },
    SearchNext { reverse: bool },
}

/// How the wanted column changes after the motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurswantUpdate {
    Keep,
    Update,
    Eol,
    Set(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionOutcome {
    pub pos: Position,
    pub kind: MotionType,
    pub inclusive: bool,
    pub curswant: CurswantUpdate,
    /// Remember the position before the jump in the `'` mark.
    pub jump: bool,
    /// Deletes over this motion always go to register 1.
    pub use_reg_one: bool,
}

impl MotionOutcome {
    fn exclusive(pos: Position) -> Self {
        Self {
            pos,
            kind: MotionType::Char,
            inclusive: false,
            curswant: CurswantUpdate::Update,
            jump: false,
            use_reg_one: false,
        }
    }
    fn inclusive(pos: Position) -> Self {
        Self {
            inclusive: true,
            ..Self::exclusive(pos)
        }
    }
    fn linewise(pos: Position, curswant: CurswantUpdate) -> Self {
        Self {
            kind: MotionType::Line,
            curswant,
            ..Self::exclusive(pos)
        }
    }
    fn jumped(mut self) -> Self {
        self.jump = true;
        self
    }
}

/// Context a motion is evaluated in.
#[derive(Debug, Clone, Copy)]
pub struct MotionCtx {
    pub count: usize,
    pub has_count: bool,
    pub operator: Option<OperatorKind>,
    pub visual: bool,
}

impl MotionCtx {
    pub fn plain(count: usize) -> Self {
        Self {
            count: count.max(1),
            has_count: count > 0,
            operator: None,
            visual: false,
        }
    }
}

/// Word under or after the cursor on the current line (for `*`/`#`) and the
/// column it starts at.
fn keyword_under_cursor(ctx: &EditorContext) -> Option<(String, usize)> {
    let chars: Vec<char> = ctx.cur_line().chars().collect();
    let col = ctx.cursor.col.min(chars.len());
    // A keyword under or after the cursor wins over other non-blanks.
    let (start, keyword) = match (col..chars.len()).find(|i| is_word_char(chars[*i])) {
        Some(s) => (s, true),
        None => ((col..chars.len()).find(|i| !is_blank(chars[*i]))?, false),
    };
    let in_class = |c: char| {
        if keyword {
            is_word_char(c)
        } else {
            !is_blank(c) && !is_word_char(c)
        }
    };
    let mut begin = start;
    while begin > 0 && in_class(chars[begin - 1]) {
        begin -= 1;
    }
    let mut end = start;
    while end < chars.len() && in_class(chars[end]) {
        end += 1;
    }
    Some((chars[begin..end].iter().collect(), begin))
}

fn first_non_blank_pos(ctx: &EditorContext, line: usize) -> Position {
    Position::new(line, first_non_blank(&ctx.buffer.line_text(line)))
}

fn vertical(ctx: &EditorContext, up: bool, count: usize) -> EngineResult<usize> {
    let last = ctx.line_count() - 1;
    let line = ctx.cursor.line;
    if up {
        if line == 0 {
            return Err(EngineError::Beep);
        }
        Ok(line.saturating_sub(count))
    } else {
        if line >= last {
            return Err(EngineError::Beep);
        }
        Ok((line + count).min(last))
    }
}

fn run_word_search(ctx: &mut EditorContext, s: &WordSearch, forward: bool) -> EngineResult<Position> {
    let re = word_pattern(&s.word, s.whole).map_err(|e| EngineError::Internal(e.to_string()))?;
    let m = search(&ctx.buffer, ctx.cursor, &re, forward, true).ok_or(EngineError::Beep)?;
    Ok(m.pos)
}

/// Evaluate `motion` from the current cursor.
pub fn execute(ctx: &mut EditorContext, motion: Motion, mc: MotionCtx) -> EngineResult<MotionOutcome> {
    let cur = ctx.cursor;
    let count = mc.count.max(1);
    let line_len = ctx.buffer.line_len(cur.line);
    let op = mc.operator;
    let outcome = match motion {
        Motion::Left | Motion::BackspaceLeft => {
            let mut pos = cur;
            let mut moved = 0;
            for _ in 0..count {
                if pos.col > 0 {
                    pos.col -= 1;
                } else if motion == Motion::BackspaceLeft && pos.line > 0 {
                    pos.line -= 1;
                    let len = ctx.buffer.line_len(pos.line);
                    // An operator also takes the line break.
                    pos.col = if op.is_some() || len == 0 { len } else { len - 1 };
                } else {
                    break;
                }
                moved += 1;
            }
            if moved == 0 {
                return Err(EngineError::Beep);
            }
            MotionOutcome::exclusive(pos)
        }
        Motion::Right | Motion::SpaceRight => {
            let mut pos = cur;
            let mut inclusive = false;
            let mut moved = 0;
            for _ in 0..count {
                let len = ctx.buffer.line_len(pos.line);
                let past = if mc.visual { len } else { len.saturating_sub(1) };
                if pos.col < past {
                    pos.col += 1;
                    moved += 1;
                    continue;
                }
                if motion == Motion::SpaceRight && pos.line + 1 < ctx.line_count() {
                    if op.is_some() && !inclusive && len > 0 {
                        inclusive = true;
                    } else {
                        pos = Position::new(pos.line + 1, 0);
                        inclusive = false;
                    }
                    moved += 1;
                    continue;
                }
                if op.is_some() {
                    if len > 0 {
                        inclusive = true;
                    }
                } else if moved == 0 {
                    return Err(EngineError::Beep);
                }
                break;
            }
            MotionOutcome {
                inclusive,
                ..MotionOutcome::exclusive(pos)
            }
        }
        Motion::Up | Motion::Down => {
            let line = vertical(ctx, motion == Motion::Up, count)?;
            let col = ctx.col_for_curswant(line, mc.visual);
            MotionOutcome::linewise(Position::new(line, col), CurswantUpdate::Keep)
        }
        Motion::LineFirstNonBlank { forward } => {
            let line = vertical(ctx, !forward, count)?;
            MotionOutcome::linewise(first_non_blank_pos(ctx, line), CurswantUpdate::Update)
        }
        Motion::CurrentLineNonBlank => {
            let line = if count > 1 { vertical(ctx, false, count - 1)? } else { cur.line };
            MotionOutcome::linewise(first_non_blank_pos(ctx, line), CurswantUpdate::Update)
        }
        Motion::LineStart => MotionOutcome::exclusive(Position::new(cur.line, 0)),
        Motion::FirstNonBlank => MotionOutcome::exclusive(first_non_blank_pos(ctx, cur.line)),
        Motion::LineEnd => {
            let line = if count > 1 { vertical(ctx, false, count - 1)? } else { cur.line };
            let len = ctx.buffer.line_len(line);
            let col = if mc.visual { len } else { len.saturating_sub(1) };
            MotionOutcome {
                curswant: CurswantUpdate::Eol,
                ..MotionOutcome::inclusive(Position::new(line, col))
            }
        }
        Motion::Column => {
            let text = ctx.cur_line();
            let col = width::col_for_vcol(&text, count - 1, ctx.ts()).min(line_len.saturating_sub(1));
            MotionOutcome {
                curswant: CurswantUpdate::Set(count - 1),
                ..MotionOutcome::exclusive(Position::new(cur.line, col))
            }
        }
        Motion::LineMiddle => {
            let text = ctx.cur_line();
            let w = width::line_width(&text, ctx.ts());
            let col = width::col_for_vcol(&text, w / 2, ctx.ts()).min(line_len.saturating_sub(1));
            MotionOutcome::exclusive(Position::new(cur.line, col))
        }
        Motion::WordForward { big } => {
            let mut pos = cur;
            let mut word_end = false;
            let mut stop = false;
            if op == Some(OperatorKind::Change) {
                match ctx.buffer.char_at(cur) {
                    Some(c) if c != ' ' && c != '\t' => {
                        word_end = true;
                        stop = true;
                    }
                    Some(_) => stop = true,
                    None => {}
                }
            }
            let ok = if word_end {
                end_word(&ctx.buffer, &mut pos, count, big, stop, false)
            } else {
                fwd_word(&ctx.buffer, &mut pos, count, big, op.is_some())
            };
            let mut inclusive = word_end;
            if pos > cur {
                adjust_past_eol(ctx, &mut pos, &mut inclusive, mc.visual);
            }
            if !ok && op.is_none() {
                return Err(EngineError::Beep);
            }
            MotionOutcome {
                inclusive,
                ..MotionOutcome::exclusive(pos)
            }
        }
        Motion::WordBackward { big } => {
            let mut pos = cur;
            if !bck_word(&ctx.buffer, &mut pos, count, big, false) {
                return Err(EngineError::Beep);
            }
            MotionOutcome::exclusive(pos)
        }
        Motion::WordEnd { big } => {
            let mut pos = cur;
            if !end_word(&ctx.buffer, &mut pos, count, big, false, false) {
                return Err(EngineError::Beep);
            }
            MotionOutcome::inclusive(pos)
        }
        Motion::WordEndBackward { big } => {
            let mut pos = cur;
            if !bckend_word(&ctx.buffer, &mut pos, count, big, false) {
                return Err(EngineError::Beep);
            }
            pos.col = pos.col.min(ctx.buffer.line_len(pos.line).saturating_sub(1));
            MotionOutcome::inclusive(pos)
        }
        Motion::GotoLine { last } => {
            let target = if mc.has_count {
                mc.count.min(ctx.line_count()).max(1) - 1
            } else if last {
                ctx.line_count() - 1
            } else {
                0
            };
            MotionOutcome::linewise(first_non_blank_pos(ctx, target), CurswantUpdate::Update).jumped()
        }
        Motion::FindChar { target, forward, till } => {
            ctx.last_char_search = Some(CharSearch { target, forward, till });
            find_char_motion(ctx, target, forward, till, count, false)?
        }
        Motion::RepeatFind { reverse } => {
            let last = ctx.last_char_search.ok_or(EngineError::Beep)?;
            let forward = last.forward != reverse;
            let skip = !ctx.options.compat.till_repeat_stays && count == 1 && last.till;
            find_char_motion(ctx, last.target, forward, last.till, count, skip)?
        }
        Motion::Paragraph { forward } => {
            let (pos, inclusive) =
                find_paragraph(&ctx.buffer, cur.line, count, forward).ok_or(EngineError::Beep)?;
            MotionOutcome {
                inclusive,
                use_reg_one: true,
                ..MotionOutcome::exclusive(pos)
            }
            .jumped()
        }
        Motion::Percent => {
            if mc.has_count {
                if mc.count > 100 {
                    return Err(EngineError::Beep);
                }
                let lines = ctx.line_count();
                let line = ((mc.count * lines).div_ceil(100)).clamp(1, lines) - 1;
                MotionOutcome::linewise(first_non_blank_pos(ctx, line), CurswantUpdate::Update).jumped()
            } else {
                let pos = match_pair(&ctx.buffer, cur).ok_or(EngineError::Beep)?;
                MotionOutcome {
                    use_reg_one: true,
                    ..MotionOutcome::inclusive(pos)
                }
                .jumped()
            }
        }
        Motion::Mark { name, linewise } => {
            let pos = ctx.mark(name).ok_or(EngineError::Beep)?;
            let pos = Position::new(pos.line, pos.col.min(ctx.buffer.line_len(pos.line).saturating_sub(1)));
            if linewise {
                MotionOutcome::linewise(first_non_blank_pos(ctx, pos.line), CurswantUpdate::Update).jumped()
            } else {
                MotionOutcome {
                    use_reg_one: true,
                    ..MotionOutcome::exclusive(pos)
                }
                .jumped()
            }
        }
        Motion::SearchWord { forward, whole } => {
            let (word, start) = keyword_under_cursor(ctx).ok_or(EngineError::Beep)?;
            let s = WordSearch { word, whole, forward };
            let saved = ctx.cursor;
            if !forward {
                ctx.cursor.col = start;
            }
            let found = run_word_search(ctx, &s, forward);
            ctx.cursor = saved;
            ctx.last_search = Some(s);
            MotionOutcome {
                use_reg_one: true,
                ..MotionOutcome::exclusive(found?)
            }
            .jumped()
        }
        Motion::SearchNext { reverse } => {
            let s = ctx.last_search.clone().ok_or(EngineError::Beep)?;
            let forward = s.forward != reverse;
            let mut pos = ctx.cursor;
            let saved = ctx.cursor;
            for _ in 0..count {
                ctx.cursor = pos;
                match run_word_search(ctx, &s, forward) {
                    Ok(p) => pos = p,
                    Err(e) => {
                        ctx.cursor = saved;
                        return Err(e);
                    }
                }
            }
            ctx.cursor = saved;
            MotionOutcome {
                use_reg_one: true,
                ..MotionOutcome::exclusive(pos)
            }
            .jumped()
        }
    };
    trace!(target: "actions.dispatch", ?motion, line = outcome.pos.line, col = outcome.pos.col, inclusive = outcome.inclusive, "motion");
    Ok(outcome)
}

/// A word motion must not leave the cursor on the end-of-line slot; it steps
/// back onto the last char and becomes inclusive instead.
fn adjust_past_eol(ctx: &EditorContext, pos: &mut Position, inclusive: &mut bool, visual: bool) {
    if pos.col > 0 && pos.col >= ctx.buffer.line_len(pos.line) && !visual {
        pos.col -= 1;
        *inclusive = true;
    }
}

fn find_char_motion(
    ctx: &EditorContext,
    target: char,
    forward: bool,
    till: bool,
    count: usize,
    skip_adjacent: bool,
) -> EngineResult<MotionOutcome> {
    let line = ctx.cur_line();
    let col = find_char(&line, ctx.cursor.col, target, forward, till, count, skip_adjacent)
        .ok_or(EngineError::Beep)?;
    let pos = Position::new(ctx.cursor.line, col);
    Ok(if forward {
        MotionOutcome::inclusive(pos)
    } else {
        MotionOutcome::exclusive(pos)
    })
}

/// Apply a motion result to the cursor outside of an operator.
pub fn move_cursor(ctx: &mut EditorContext, outcome: &MotionOutcome, visual: bool) {
    if outcome.jump {
        let from = ctx.cursor;
        ctx.set_mark('\'', from);
    }
    ctx.cursor = outcome.pos;
    ctx.clamp_cursor(visual);
    match outcome.curswant {
        CurswantUpdate::Keep => {}
        CurswantUpdate::Update => ctx.update_curswant(),
        CurswantUpdate::Eol => ctx.curswant = Curswant::Eol,
        CurswantUpdate::Set(v) => ctx.curswant = Curswant::Col(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_config::Options;
    use core_text::Buffer;
    use pretty_assertions::assert_eq;

    fn ctx(text: &str, line: usize, col: usize) -> EditorContext {
        let mut c = EditorContext::new(Buffer::from_str("t", text).unwrap(), Options::default());
        c.cursor = Position::new(line, col);
        c.update_curswant();
        c
    }

    fn with_op(op: OperatorKind) -> MotionCtx {
        MotionCtx {
            operator: Some(op),
            ..MotionCtx::plain(0)
        }
    }

    #[test]
    fn word_forward_with_operator_stops_at_line_end() {
        let mut c = ctx("abc\ndef\n", 0, 0);
        let o = execute(&mut c, Motion::WordForward { big: false }, with_op(OperatorKind::Delete)).unwrap();
        assert_eq!(o.pos, Position::new(0, 2));
        assert!(o.inclusive);
        let o = execute(&mut c, Motion::WordForward { big: false }, MotionCtx::plain(0)).unwrap();
        assert_eq!(o.pos, Position::new(1, 0));
        assert!(!o.inclusive);
    }

    #[test]
    fn change_word_acts_like_end_of_word() {
        let mut c = ctx("foo bar\n", 0, 0);
        let o = execute(&mut c, Motion::WordForward { big: false }, with_op(OperatorKind::Change)).unwrap();
        assert_eq!(o.pos, Position::new(0, 2));
        assert!(o.inclusive);
    }

    #[test]
    fn right_on_last_char_with_operator_is_inclusive() {
        let mut c = ctx("ab\n", 0, 1);
        assert_eq!(execute(&mut c, Motion::Right, MotionCtx::plain(0)), Err(EngineError::Beep));
        let o = execute(&mut c, Motion::Right, with_op(OperatorKind::Delete)).unwrap();
        assert_eq!(o.pos, Position::new(0, 1));
        assert!(o.inclusive);
    }

    #[test]
    fn vertical_motion_keeps_wanted_column() {
        let mut c = ctx("abcdef\nab\nabcdef\n", 0, 4);
        let o = execute(&mut c, Motion::Down, MotionCtx::plain(1)).unwrap();
        assert_eq!(o.pos, Position::new(1, 1));
        assert_eq!(o.kind, MotionType::Line);
        move_cursor(&mut c, &o, false);
        let o = execute(&mut c, Motion::Down, MotionCtx::plain(1)).unwrap();
        assert_eq!(o.pos, Position::new(2, 4));
        assert_eq!(execute(&mut c, Motion::Up, MotionCtx::plain(5)).unwrap().pos.line, 0);
    }

    #[test]
    fn find_and_repeat_respect_till_option() {
        let mut c = ctx("a,b,c,d\n", 0, 0);
        let o = execute(
            &mut c,
            Motion::FindChar { target: ',', forward: true, till: true },
            MotionCtx::plain(0),
        )
        .unwrap();
        assert_eq!(o.pos.col, 0);
        // Default: ";" after "t," skips the adjacent match.
        let o = execute(&mut c, Motion::RepeatFind { reverse: false }, MotionCtx::plain(0)).unwrap();
        assert_eq!(o.pos.col, 2);
        c.options.compat.till_repeat_stays = true;
        assert_eq!(
            execute(&mut c, Motion::RepeatFind { reverse: false }, MotionCtx::plain(0)).unwrap().pos.col,
            0
        );
    }

    #[test]
    fn dollar_and_goto_line() {
        let mut c = ctx("  one\ntwo\n", 0, 0);
        let o = execute(&mut c, Motion::LineEnd, MotionCtx::plain(0)).unwrap();
        assert_eq!(o.pos, Position::new(0, 4));
        assert_eq!(o.curswant, CurswantUpdate::Eol);
        let o = execute(&mut c, Motion::GotoLine { last: true }, MotionCtx::plain(0)).unwrap();
        assert_eq!(o.pos, Position::new(1, 0));
        let o = execute(&mut c, Motion::GotoLine { last: true }, MotionCtx::plain(1)).unwrap();
        assert_eq!(o.pos, Position::new(0, 2));
    }

    #[test]
    fn star_finds_next_whole_word() {
        let mut c = ctx("foo food foo\n", 0, 1);
        let o = execute(&mut c, Motion::SearchWord { forward: true, whole: true }, MotionCtx::plain(0)).unwrap();
        assert_eq!(o.pos, Position::new(0, 9));
        c.cursor = o.pos;
        let o = execute(&mut c, Motion::SearchNext { reverse: false }, MotionCtx::plain(0)).unwrap();
        assert_eq!(o.pos, Position::new(0, 0));
    }

    #[test]
    fn percent_jumps_to_bracket_or_line() {
        let mut c = ctx("if (a) {\n}\nx\ny\n", 0, 0);
        assert_eq!(execute(&mut c, Motion::Percent, MotionCtx::plain(0)).unwrap().pos, Position::new(0, 5));
        let o = execute(&mut c, Motion::Percent, MotionCtx::plain(50)).unwrap();
        assert_eq!(o.pos.line, 1);
        assert_eq!(execute(&mut c, Motion::Percent, MotionCtx::plain(101)), Err(EngineError::Beep));
    }
}
