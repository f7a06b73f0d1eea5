//! `.` repeats the last change: counts, registers, inserts and Visual shapes.

mod common;
use common::*;

use core_actions::{DispatchResult, EngineError};
use pretty_assertions::assert_eq;

#[derive(Debug)]
struct Case<'a> {
    name: &'a str,
    text: &'a str,
    keys: &'a str,
    want: &'a str,
}

#[test]
fn repeated_changes() {
    let cases = [
        Case { name: "dw", text: "a b c d\n", keys: "dw..", want: "d\n" },
        Case { name: "cw_next_line", text: "abc\nabc\nabc\n", keys: "cwX<Esc>j0.", want: "X\nX\nabc\n" },
        Case { name: "2dd", text: "1\n2\n3\n4\n5\n", keys: "2dd.", want: "5\n" },
        Case { name: "append", text: "a\nb\n", keys: "A;<Esc>j.", want: "a;\nb;\n" },
        Case { name: "open_line", text: "a\n", keys: "ox<Esc>.", want: "a\nx\nx\n" },
        Case { name: "shift", text: "a\n", keys: ">>.", want: "\t\ta\n" },
        Case { name: "x_with_count", text: "abcdef\n", keys: "2x.", want: "ef\n" },
        Case { name: "replace_char", text: "abc\n", keys: "rxl.", want: "xxc\n" },
        Case { name: "visual_char", text: "abcdef\n", keys: "vld.", want: "ef\n" },
        Case { name: "block", text: "abcd\nefgh\nijkl\nmnop\n", keys: "<C-v>jldjj.", want: "cd\ngh\nkl\nop\n" },
    ];
    for case in cases {
        let mut e = engine(case.text);
        let results = e.feed_str(case.keys);
        assert_eq!(errors(&results), 0, "{}: unexpected error in {results:?}", case.name);
        assert_eq!(e.text(), case.want, "{}", case.name);
    }
}

#[test]
fn numbered_register_advances_on_repeat() {
    let mut e = engine("a\nb\nc\nx\n");
    run(&mut e, "dddddd");
    assert_eq!(e.text(), "x\n");
    run(&mut e, "\"1p..");
    assert_eq!(e.text(), "x\nc\nb\na\n");
}

#[test]
fn new_count_replaces_the_recorded_one() {
    let mut e = engine("abcdefgh\n");
    run(&mut e, "3x");
    assert_eq!(e.text(), "defgh\n");
    run(&mut e, "1.");
    assert_eq!(e.text(), "efgh\n");
    // The new count sticks for later repeats.
    run(&mut e, ".");
    assert_eq!(e.text(), "fgh\n");
}

#[test]
fn yank_and_motion_are_not_recorded() {
    let mut e = engine("abc\n");
    run(&mut e, "x");
    run(&mut e, "yyl");
    run(&mut e, ".");
    assert_eq!(e.text(), "b\n");
}

#[test]
fn repeat_without_a_change_beeps() {
    let mut e = engine("abc\n");
    assert_eq!(run(&mut e, "."), DispatchResult::Error(EngineError::Beep));
    assert_eq!(e.beeps(), 1);
    assert_eq!(e.text(), "abc\n");
}

#[test]
fn repeat_is_one_undo_step() {
    let mut e = engine("abc\n");
    run(&mut e, "ixy<Esc>");
    run(&mut e, ".");
    assert_eq!(e.text(), "xxyyabc\n");
    run(&mut e, "u");
    assert_eq!(e.text(), "xyabc\n");
}
