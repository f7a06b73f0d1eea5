//! Configuration loading and parsing.
//!
//! Scope: parse `viox.toml` (or an override path provided by the binary) into
//! the option set the modal engine consults: tab/indent geometry, backspace
//! limits, auto-indent, and the one vi-compatibility switch that decides how a
//! repeated `t`/`T` search continues. Every field has a default so a partial
//! (or absent) file is valid. Unknown fields are ignored to allow forward
//! evolution without warnings.
//!
//! A file that fails to parse falls back to defaults; the failure is logged on
//! the `config` target rather than surfaced, so a bad option never prevents the
//! editor from starting.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

/// Which boundaries Insert-mode backspace may cross.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "Vec<String>")]
pub struct Backspace {
    /// Delete over auto-indent.
    pub indent: bool,
    /// Join with the previous line.
    pub eol: bool,
    /// Move before the point where insertion started.
    pub start: bool,
    /// `CTRL-W`/`CTRL-U` do not stop once at the insert start.
    pub nostop: bool,
}

impl From<Vec<String>> for Backspace {
    fn from(items: Vec<String>) -> Self {
        let mut bs = Backspace {
            indent: false,
            eol: false,
            start: false,
            nostop: false,
        };
        for item in items {
            match item.as_str() {
                "indent" => bs.indent = true,
                "eol" => bs.eol = true,
                "start" => bs.start = true,
                "nostop" => {
                    bs.start = true;
                    bs.nostop = true;
                }
                other => warn!(target: "config", value = other, "unknown_backspace_item"),
            }
        }
        bs
    }
}

impl Default for Backspace {
    fn default() -> Self {
        Self {
            indent: true,
            eol: true,
            start: true,
            nostop: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct EditorOptions {
    #[serde(default = "EditorOptions::default_tabstop")]
    pub tabstop: usize,
    /// 0 means "use tabstop".
    #[serde(default = "EditorOptions::default_tabstop")]
    pub shiftwidth: usize,
    #[serde(default)]
    pub softtabstop: usize,
    #[serde(default)]
    pub expandtab: bool,
    #[serde(default)]
    pub smarttab: bool,
    #[serde(default = "EditorOptions::default_autoindent")]
    pub autoindent: bool,
    #[serde(default)]
    pub shiftround: bool,
    #[serde(default)]
    pub joinspaces: bool,
    #[serde(default)]
    pub backspace: Backspace,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            tabstop: Self::default_tabstop(),
            shiftwidth: Self::default_tabstop(),
            softtabstop: 0,
            expandtab: false,
            smarttab: false,
            autoindent: Self::default_autoindent(),
            shiftround: false,
            joinspaces: false,
            backspace: Backspace::default(),
        }
    }
}

impl EditorOptions {
    const fn default_tabstop() -> usize {
        8
    }
    const fn default_autoindent() -> bool {
        true
    }

    /// Effective tab stop (never zero).
    pub fn ts(&self) -> usize {
        self.tabstop.max(1)
    }

    /// Effective shift width.
    pub fn sw(&self) -> usize {
        if self.shiftwidth == 0 {
            self.ts()
        } else {
            self.shiftwidth
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct CompatOptions {
    /// vi-compatible `;`/`,` after `t`/`T`: when the cursor sits right before
    /// the target char the repeat does not move.
    #[serde(default)]
    pub till_repeat_stays: bool,
}

/// Full option set consumed by the engine.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Options {
    #[serde(default)]
    pub editor: EditorOptions,
    #[serde(default)]
    pub compat: CompatOptions,
}

impl Options {
    /// Clamp values the engine cannot use as given.
    pub fn validate(&mut self) {
        if self.editor.tabstop == 0 {
            info!(target: "config", "tabstop_zero_clamped");
            self.editor.tabstop = 1;
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub options: Options, // parsed (or default) data
}

/// Best-effort config path following platform conventions (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from("viox.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("viox").join("viox.toml");
    }
    PathBuf::from("viox.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::default());
    };
    match toml::from_str::<Options>(&content) {
        Ok(mut options) => {
            options.validate();
            info!(target: "config", path = %path.display(), bytes = content.len(), "config_loaded");
            Ok(Config { options })
        }
        Err(e) => {
            warn!(target: "config", path = %path.display(), error = %e, "config_parse_failed_using_defaults");
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex, MutexGuard};
    use tracing::Level;
    use tracing::subscriber::with_default;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone)]
    struct BufferWriter {
        inner: Arc<Mutex<Vec<u8>>>,
    }

    impl BufferWriter {
        fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
            let buf = Arc::new(Mutex::new(Vec::new()));
            (Self { inner: buf.clone() }, buf)
        }
    }

    struct LockedWriter<'a> {
        guard: MutexGuard<'a, Vec<u8>>,
    }

    impl<'a> Write for LockedWriter<'a> {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.guard.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for BufferWriter {
        type Writer = LockedWriter<'a>;

        fn make_writer(&'a self) -> Self::Writer {
            LockedWriter {
                guard: self.inner.lock().expect("log buffer poisoned"),
            }
        }
    }

    #[test]
    fn default_config_when_missing_file() {
        let cfg = load_from(Some(PathBuf::from("__nonexistent_hopefully__.toml"))).unwrap();
        assert_eq!(cfg.options, Options::default());
        assert_eq!(cfg.options.editor.tabstop, 8);
        assert!(cfg.options.editor.autoindent);
        assert!(!cfg.options.compat.till_repeat_stays);
    }

    #[test]
    fn parses_partial_editor_section() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            "[editor]\ntabstop = 4\nexpandtab = true\nbackspace = [\"eol\"]\n[compat]\ntill_repeat_stays = true\n",
        )
        .unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        let ed = &cfg.options.editor;
        assert_eq!(ed.tabstop, 4);
        assert_eq!(ed.shiftwidth, 8);
        assert!(ed.expandtab);
        assert!(ed.backspace.eol);
        assert!(!ed.backspace.start);
        assert!(cfg.options.compat.till_repeat_stays);
    }

    #[test]
    fn shiftwidth_zero_follows_tabstop() {
        let opts = EditorOptions {
            tabstop: 4,
            shiftwidth: 0,
            ..EditorOptions::default()
        };
        assert_eq!(opts.sw(), 4);
    }

    #[test]
    fn nostop_implies_start() {
        let bs = Backspace::from(vec!["nostop".to_string()]);
        assert!(bs.start && bs.nostop);
        assert!(!bs.eol);
    }

    #[test]
    fn zero_tabstop_is_clamped() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[editor]\ntabstop = 0\n").unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.options.editor.tabstop, 1);
    }

    #[test]
    fn parse_failure_logs_and_falls_back() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[editor]\ntabstop = \"wide\"\n").unwrap();
        let (writer, buffer) = BufferWriter::new();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_target(true)
            .with_ansi(false)
            .without_time()
            .with_writer(writer)
            .finish();

        let cfg = with_default(subscriber, || load_from(Some(tmp.path().to_path_buf()))).unwrap();

        let log_output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(log_output.contains("WARN config:"));
        assert!(log_output.contains("config_parse_failed_using_defaults"));
        assert_eq!(cfg.options, Options::default());
    }

    #[test]
    fn load_logs_the_file_size() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let body = "[editor]\nshiftwidth = 4\n";
        std::fs::write(tmp.path(), body).unwrap();
        let (writer, buffer) = BufferWriter::new();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_target(true)
            .with_ansi(false)
            .without_time()
            .with_writer(writer)
            .finish();

        let cfg = with_default(subscriber, || load_from(Some(tmp.path().to_path_buf()))).unwrap();

        let log_output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(log_output.contains("INFO config:"));
        assert!(log_output.contains("config_loaded"));
        assert!(log_output.contains(&format!("bytes={}", body.len())));
        assert_eq!(cfg.options.editor.shiftwidth, 4);
    }
}
