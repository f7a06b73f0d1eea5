//! Joining lines (`J`, `gJ` and their Visual forms).

use super::{check_guard, set_change_marks};
use crate::error::{EngineError, EngineResult};
use core_state::EditorContext;
use core_text::Position;
use core_text::motion::is_blank;
use tracing::trace;

/// Join `count` lines starting at `first` into one. With `insert_space` the
/// leading white of each joined line is dropped and a separator space added
/// where vi adds one. The cursor lands at the last join point.
pub fn do_join(ctx: &mut EditorContext, first: usize, count: usize, insert_space: bool) -> EngineResult<()> {
    let count = count.max(2);
    let last = first + count - 1;
    if last >= ctx.line_count() {
        return Err(EngineError::Beep);
    }
    check_guard(ctx, first, last)?;
    let joinspaces = ctx.options.editor.joinspaces;

    let mut out = String::new();
    let mut out_len = 0usize;
    let mut col = 0usize;
    let (mut end1, mut end2): (Option<char>, Option<char>) = (None, None);
    for t in 0..count {
        let text = ctx.buffer.line_text(first + t);
        let mut part = text.as_str();
        let mut spaces = 0;
        if insert_space && t > 0 {
            part = part.trim_start_matches(is_blank);
            if part.chars().next().is_some_and(|c| c != ')') && out_len != 0 && end1 != Some('\t') {
                // A line already ending in a space gets no separator.
                if end1 == Some(' ') {
                    end1 = end2;
                } else {
                    spaces += 1;
                }
                if joinspaces && matches!(end1, Some('.' | '?' | '!')) {
                    spaces += 1;
                }
            }
        }
        let size = part.chars().count();
        col = out_len;
        out.push_str(&" ".repeat(spaces));
        out.push_str(part);
        out_len += spaces + size;
        (end1, end2) = (None, None);
        if insert_space && size > 0 {
            let mut rev = part.chars().rev();
            end1 = rev.next();
            end2 = rev.next();
        }
    }

    let from = ctx.buffer.line_start(first);
    let to = ctx.buffer.line_end(last);
    ctx.buffer.replace_range(from, to, &out);
    trace!(target: "actions.operator", first, count, insert_space, col, "join");
    set_change_marks(ctx, Position::new(first, 0), Position::new(first, out_len));
    ctx.cursor = Position::new(first, col);
    ctx.clamp_cursor(false);
    ctx.update_curswant();
    Ok(())
}

/// Normal-mode `J`/`gJ`. Counts below two join two lines; a count reaching
/// past the buffer end is clamped unless only two lines were asked for.
pub fn join_command(ctx: &mut EditorContext, count: usize, insert_space: bool) -> EngineResult<()> {
    let mut count = count.max(2);
    let line = ctx.cursor.line;
    if line + count > ctx.line_count() {
        if count <= 2 {
            return Err(EngineError::Beep);
        }
        count = ctx.line_count() - line;
    }
    ctx.begin_change();
    let result = do_join(ctx, line, count, insert_space);
    ctx.end_change();
    result
}
