//! Key constants and `<...>` notation parsing.
//!
//! The engine consumes plain `char`s; special keys are their ASCII control
//! codes. `<BS>` is DEL (0x7f) as delivered by terminals, `CTRL-H` stays 0x08
//! and both act as backspace.

pub const NUL: char = '\0';
pub const CTRL_A: char = '\x01';
pub const CTRL_C: char = '\x03';
pub const CTRL_D: char = '\x04';
pub const CTRL_E: char = '\x05';
pub const CTRL_G: char = '\x07';
pub const CTRL_H: char = '\x08';
pub const TAB: char = '\t';
pub const NL: char = '\n';
pub const CTRL_K: char = '\x0b';
pub const CTRL_L: char = '\x0c';
pub const CR: char = '\r';
pub const CTRL_N: char = '\x0e';
pub const CTRL_O: char = '\x0f';
pub const CTRL_P: char = '\x10';
pub const CTRL_Q: char = '\x11';
pub const CTRL_R: char = '\x12';
pub const CTRL_T: char = '\x14';
pub const CTRL_U: char = '\x15';
pub const CTRL_V: char = '\x16';
pub const CTRL_W: char = '\x17';
pub const CTRL_X: char = '\x18';
pub const CTRL_Y: char = '\x19';
pub const ESC: char = '\x1b';
pub const BS: char = '\x7f';

pub fn is_backspace(c: char) -> bool {
    c == BS || c == CTRL_H
}

/// Printable name of a key for logs and status messages.
pub fn key_name(c: char) -> String {
    match c {
        ESC => "<Esc>".into(),
        CR => "<CR>".into(),
        NL => "<NL>".into(),
        TAB => "<Tab>".into(),
        BS => "<BS>".into(),
        ' ' => "<Space>".into(),
        '<' => "<lt>".into(),
        c if (c as u32) < 0x20 => format!("<C-{}>", ((c as u8) + b'@').to_ascii_lowercase() as char),
        c => c.to_string(),
    }
}

fn named_key(name: &str) -> Option<char> {
    let lower = name.to_ascii_lowercase();
    let key = match lower.as_str() {
        "esc" => ESC,
        "cr" | "enter" | "return" => CR,
        "nl" => NL,
        "tab" => TAB,
        "bs" => BS,
        "space" => ' ',
        "lt" => '<',
        "bar" => '|',
        "bslash" => '\\',
        "nul" => NUL,
        _ => {
            let rest = lower.strip_prefix("c-")?;
            let mut chars = rest.chars();
            let c = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            return match c {
                '@' => Some(NUL),
                '[' => Some(ESC),
                'a'..='z' => Some(((c as u8) - b'a' + 1) as char),
                _ => None,
            };
        }
    };
    Some(key)
}

/// Expand key notation such as `d<Esc>` or `i<C-v>065<Esc>` into chars.
/// Unknown `<...>` sequences are taken literally.
pub fn parse_keys(notation: &str) -> Vec<char> {
    let mut out = Vec::new();
    let mut rest = notation;
    while let Some(c) = rest.chars().next() {
        if c == '<'
            && let Some(end) = rest.find('>')
            && end > 1
            && let Some(key) = named_key(&rest[1..end])
        {
            out.push(key);
            rest = &rest[end + 1..];
            continue;
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}
