//! viox entrypoint.
//!
//! Loads a file (or an empty buffer), replays a key script through the
//! engine and prints the resulting text, or writes it back with `--out`.
use anyhow::{Context, Result};
use clap::Parser;
use core_actions::{DispatchResult, Engine};
use core_config::load_from;
use core_text::Buffer;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "viox", version, about = "Replay vi keys over a text file")]
struct Args {
    /// File to edit. If omitted the keys run against an empty buffer.
    pub path: Option<PathBuf>,
    /// Keys in `<Esc>` / `<C-v>` notation.
    #[arg(long = "keys", default_value = "")]
    pub keys: String,
    /// Configuration file path (overrides discovery of `viox.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Write the result here instead of printing it.
    #[arg(long = "out")]
    pub out: Option<PathBuf>,
}

/// What a replay did, for the summary line.
#[derive(Debug, Default, PartialEq, Eq)]
struct ReplaySummary {
    keys: usize,
    errors: usize,
    aborted: usize,
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let log_path = log_dir.join("viox.log");
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(log_dir, "viox.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(_) => Some(guard),
        // A global subscriber is already installed; dropping the guard shuts the writer down.
        Err(_) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

fn load_buffer(path: Option<&Path>) -> Result<Buffer> {
    let Some(path) = path else {
        return Buffer::from_str("untitled", "");
    };
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("file");
            debug!(target: "io", file = %path.display(), size_bytes = content.len(), "file_read_ok");
            Buffer::from_str(name, &content)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(target: "io", file = %path.display(), "file_missing_starting_empty");
            Buffer::from_str("untitled", "")
        }
        Err(e) => {
            error!(target: "io", ?e, "file_open_error");
            Err(e).with_context(|| format!("reading {}", path.display()))
        }
    }
}

/// Feed every key of `notation`, counting failures.
fn replay(engine: &mut Engine, notation: &str) -> ReplaySummary {
    let mut summary = ReplaySummary::default();
    for result in engine.feed_str(notation) {
        summary.keys += 1;
        match result {
            DispatchResult::Error(_) => summary.errors += 1,
            DispatchResult::Aborted(_) => summary.aborted += 1,
            _ => {}
        }
    }
    // A script that ends mid-command leaves nothing half done.
    if engine.context().undo.nesting() > 0 || engine.current_mode() != core_actions::EditorMode::Normal {
        engine.cancel();
    }
    summary
}

fn main() -> Result<()> {
    let _log_guard = configure_logging();
    install_panic_hook();
    info!(target: "runtime", "startup");

    let args = Args::parse();
    let config = load_from(args.config.clone())?;
    let buffer = load_buffer(args.path.as_deref())?;
    let mut engine = Engine::new(buffer, config.options);

    let summary = replay(&mut engine, &args.keys);
    info!(
        target: "runtime",
        keys = summary.keys,
        errors = summary.errors,
        aborted = summary.aborted,
        beeps = engine.beeps(),
        "replay_complete"
    );

    let text = engine.text();
    match &args.out {
        Some(out) => std::fs::write(out, &text).with_context(|| format!("writing {}", out.display()))?,
        None => std::io::stdout().write_all(text.as_bytes())?,
    }
    if let Some(status) = engine.status() {
        eprintln!("{status}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_config::Options;
    use pretty_assertions::assert_eq;

    fn engine(text: &str) -> Engine {
        Engine::new(Buffer::from_str("t", text).unwrap(), Options::default())
    }

    #[test]
    fn replay_counts_errors() {
        let mut e = engine("abc\n");
        let summary = replay(&mut e, "x:dw");
        assert_eq!(
            summary,
            ReplaySummary {
                keys: 4,
                errors: 1,
                aborted: 0
            }
        );
        assert_eq!(e.text(), "\n");
        assert_eq!(e.status(), Some("not supported: Ex commands"));
    }

    #[test]
    fn unfinished_insert_is_closed() {
        let mut e = engine("abc\n");
        replay(&mut e, "ixy");
        assert_eq!(e.current_mode(), core_actions::EditorMode::Normal);
        assert_eq!(e.text(), "xyabc\n");
        assert_eq!(e.context().undo.nesting(), 0);
    }

    #[test]
    fn missing_file_starts_empty() {
        let buffer = load_buffer(Some(Path::new("__viox_missing__.txt"))).unwrap();
        assert_eq!(buffer.text(), "");
    }

    #[test]
    fn args_parse() {
        let args = Args::parse_from(["viox", "notes.txt", "--keys", "dd", "--out", "o.txt"]);
        assert_eq!(args.path, Some(PathBuf::from("notes.txt")));
        assert_eq!(args.keys, "dd");
        assert_eq!(args.out, Some(PathBuf::from("o.txt")));
        assert!(args.config.is_none());
    }
}
