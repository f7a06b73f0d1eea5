//! Insert and Replace mode driven through the engine: editing keys,
//! autoindent, counts and the registers an insert leaves behind.

mod common;
use common::*;

use core_actions::{DispatchResult, EditorMode, EngineError};
use core_config::Options;
use core_state::Yankreg;
use pretty_assertions::assert_eq;

#[derive(Debug)]
struct Case<'a> {
    name: &'a str,
    text: &'a str,
    at: (usize, usize),
    keys: &'a str,
    want: &'a str,
}

#[test]
fn insert_keys() {
    let cases = [
        Case { name: "backspace", text: "ab\n", at: (0, 2), keys: "axy<BS><Esc>", want: "abx\n" },
        Case { name: "ctrl_h", text: "ab\n", at: (0, 0), keys: "ix<C-h><Esc>", want: "ab\n" },
        Case { name: "ctrl_w", text: "\n", at: (0, 0), keys: "ifoo bar<C-w><Esc>", want: "foo \n" },
        Case { name: "ctrl_u", text: "\n", at: (0, 0), keys: "ifoo bar<C-u><Esc>", want: "\n" },
        Case { name: "backspace_joins_lines", text: "ab\ncd\n", at: (1, 0), keys: "i<BS><Esc>", want: "abcd\n" },
        Case { name: "split_line", text: "abcd\n", at: (0, 2), keys: "i<CR><Esc>", want: "ab\ncd\n" },
        Case { name: "literal_decimal", text: "\n", at: (0, 0), keys: "i<C-v>065<Esc>", want: "A\n" },
        Case { name: "literal_tab", text: "\n", at: (0, 0), keys: "i<C-v><Tab><Esc>", want: "\t\n" },
        Case { name: "ctrl_t", text: "foo\n", at: (0, 0), keys: "i<C-t>x<Esc>", want: "\txfoo\n" },
        Case { name: "ctrl_t_ctrl_d", text: "foo\n", at: (0, 3), keys: "a<C-t><C-t><C-d><Esc>", want: "\tfoo\n" },
        Case { name: "zero_ctrl_d", text: "\t\tfoo\n", at: (0, 5), keys: "a0<C-d><Esc>", want: "foo\n" },
        Case { name: "ctrl_e", text: "\nxyz\n", at: (0, 0), keys: "i<C-e><C-e><Esc>", want: "xy\nxyz\n" },
        Case { name: "ctrl_y", text: "xyz\n\n", at: (1, 0), keys: "i<C-y><Esc>", want: "xyz\nx\n" },
        Case { name: "count", text: "\n", at: (0, 0), keys: "3ix<Esc>", want: "xxx\n" },
        Case { name: "count_open_line", text: "a\n", at: (0, 0), keys: "2ob<Esc>", want: "a\nb\nb\n" },
        Case { name: "replace_backspace_restores", text: "abc\n", at: (0, 0), keys: "Rxyz<BS><BS><BS><Esc>", want: "abc\n" },
        Case { name: "replace_past_end", text: "ab\n", at: (0, 1), keys: "Rxyz<Esc>", want: "axyz\n" },
        Case { name: "replace_ctrl_t_backspace", text: "abc\n", at: (0, 0), keys: "R<C-t>x<BS><BS><Esc>", want: "abc\n" },
        Case { name: "replace_ctrl_t_ctrl_d", text: "abc\n", at: (0, 0), keys: "R<C-t><C-t><C-d>x<BS><BS><Esc>", want: "abc\n" },
    ];
    for case in cases {
        let mut e = engine_at(case.text, case.at.0, case.at.1);
        let results = e.feed_str(case.keys);
        assert_eq!(errors(&results), 0, "{}: unexpected error in {results:?}", case.name);
        assert_eq!(e.text(), case.want, "{}", case.name);
        assert_eq!(e.current_mode(), EditorMode::Normal, "{}: mode", case.name);
    }
}

#[test]
fn open_line_autoindent() {
    let mut e = engine("    foo\n");
    run(&mut e, "obar<Esc>");
    assert_eq!(e.text(), "    foo\n    bar\n");
    assert_eq!(cursor(&e), (1, 6));

    // An indent nothing was typed after is removed again.
    let mut e = engine("    foo\n");
    run(&mut e, "o<Esc>");
    assert_eq!(e.text(), "    foo\n\n");

    let mut options = Options::default();
    options.editor.autoindent = false;
    assert_eq!(apply_with("    foo\n", "obar<Esc>", options), "    foo\nbar\n");
}

#[test]
fn soft_tabs_with_expandtab() {
    let mut options = Options::default();
    options.editor.expandtab = true;
    options.editor.softtabstop = 4;
    assert_eq!(apply_with("\n", "i<Tab>x<Esc>", options.clone()), "    x\n");
    assert_eq!(apply_with("\n", "i<Tab><Tab><BS>x<Esc>", options), "    x\n");
}

#[test]
fn backspace_limit_beeps_and_stays_in_insert() {
    let mut options = Options::default();
    options.editor.backspace.start = false;
    let mut e = engine_with("abc\n", options);
    run(&mut e, "A");
    assert_eq!(run(&mut e, "<BS>"), DispatchResult::Executed);
    assert_eq!(e.beeps(), 1);
    assert_eq!(e.current_mode(), EditorMode::Insert);
    run(&mut e, "d<BS><BS><Esc>");
    assert_eq!(e.text(), "abc\n");
    assert_eq!(e.beeps(), 2);
}

#[test]
fn backspace_at_buffer_start_beeps() {
    let mut e = engine("abc\n");
    assert_eq!(e.feed_str("i<BS>"), vec![DispatchResult::EnteredInsertMode, DispatchResult::Executed]);
    assert_eq!(e.beeps(), 1);
    run(&mut e, "<Esc>");
    assert_eq!(e.text(), "abc\n");
}

#[test]
fn last_insert_register_and_reinsert() {
    let mut e = engine("\n");
    run(&mut e, "ihi<Esc>");
    assert_eq!(e.register(Some('.')), Some(Yankreg::Char("hi".into())));
    run(&mut e, "a<C-r>.<Esc>");
    assert_eq!(e.text(), "hihi\n");
    run(&mut e, "A<C-a>!<Esc>");
    assert_eq!(e.text(), "hihihi!\n");
    assert_eq!(e.register(Some('.')), Some(Yankreg::Char("hi!".into())));
}

#[test]
fn ctrl_a_without_a_previous_insert_beeps() {
    let mut e = engine("\n");
    run(&mut e, "i<C-a>");
    assert_eq!(e.beeps(), 1);
    assert_eq!(e.current_mode(), EditorMode::Insert);
}

#[test]
fn insert_register_contents() {
    let mut e = engine("one two\n");
    run(&mut e, "yw");
    run(&mut e, "$a <C-r>\"<Esc>");
    assert_eq!(e.text(), "one two one \n");
    let r = run(&mut e, "i<C-r>q");
    assert_eq!(r, DispatchResult::Executed);
    assert_eq!(e.beeps(), 1);
}

#[test]
fn ctrl_o_is_reported() {
    let mut e = engine("abc\n");
    let r = e.feed_str("ix<C-o>");
    assert_eq!(
        r.last(),
        Some(&DispatchResult::Error(EngineError::NotSupported("CTRL-O in Insert mode")))
    );
    assert_eq!(e.current_mode(), EditorMode::Normal);
    assert_eq!(e.text(), "xabc\n");
    assert_eq!(e.status(), Some("not supported: CTRL-O in Insert mode"));
    run(&mut e, "u");
    assert_eq!(e.text(), "abc\n");
}

#[test]
fn insert_restart_on_the_next_line() {
    let mut e = engine("abcd\nefgh\n");
    run(&mut e, "lliX<C-g>jY<Esc>");
    assert_eq!(e.text(), "abXcd\nefYgh\n");
    // The restarted insert is what `.` repeats.
    run(&mut e, "0.");
    assert_eq!(e.text(), "abXcd\nYefYgh\n");
}

#[test]
fn marks_left_by_an_insert() {
    let mut e = engine("abc\n");
    run(&mut e, "Axy<Esc>0");
    run(&mut e, "`^");
    assert_eq!(cursor(&e), (0, 4));
    run(&mut e, "0`.");
    assert_eq!(cursor(&e), (0, 4));
}

#[test]
fn replace_backspace_past_the_stack_resets_to_normal() {
    // The indent added after typing sits outside what Replace mode recorded.
    let mut e = engine("abc\n");
    let results = e.feed_str("Rx<C-t><BS><BS>");
    assert_eq!(
        results.last(),
        Some(&DispatchResult::Error(EngineError::Internal("replace stack empty".into())))
    );
    assert_eq!(e.current_mode(), EditorMode::Normal);
    assert_eq!(e.text(), "\tabc\n");
    assert!(e.status().is_some());
    assert_eq!(e.context().undo.nesting(), 0);
}
