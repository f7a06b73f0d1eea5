#![allow(dead_code)] // Shared across many integration tests; each test binary uses a subset of helpers.

use core_actions::{DispatchResult, Engine};
use core_config::Options;
use core_text::{Buffer, Position};

pub fn engine(text: &str) -> Engine {
    engine_with(text, Options::default())
}

pub fn engine_with(text: &str, options: Options) -> Engine {
    Engine::new(Buffer::from_str("fixture", text).unwrap(), options)
}

/// Engine with the cursor already placed.
pub fn engine_at(text: &str, line: usize, col: usize) -> Engine {
    let mut e = engine(text);
    e.set_cursor(Position::new(line, col));
    e
}

/// Feed `keys` and return the last result.
pub fn run(e: &mut Engine, keys: &str) -> DispatchResult {
    e.feed_str(keys).pop().unwrap_or(DispatchResult::NeedMore)
}

/// Feed `keys` to a fresh engine and return the text.
pub fn apply(text: &str, keys: &str) -> String {
    let mut e = engine(text);
    run(&mut e, keys);
    e.text()
}

pub fn apply_with(text: &str, keys: &str, options: Options) -> String {
    let mut e = engine_with(text, options);
    run(&mut e, keys);
    e.text()
}

pub fn cursor(e: &Engine) -> (usize, usize) {
    let p = e.cursor();
    (p.line, p.col)
}

pub fn errors(results: &[DispatchResult]) -> usize {
    results.iter().filter(|r| matches!(r, DispatchResult::Error(_))).count()
}
