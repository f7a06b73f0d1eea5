//! Engine error taxonomy.
//!
//! None of these escape `Engine::feed`; the engine recovers at the boundary of
//! a command chunk and reports the kind to the host.

use core_state::RegisterError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Command legally refused (buffer edge, empty region, bad register).
    #[error("beep")]
    Beep,
    /// A vi feature this engine does not implement.
    #[error("not supported: {0}")]
    NotSupported(&'static str),
    /// The command would modify a protected line.
    #[error("line {} is guarded", line + 1)]
    GuardedRegion { line: usize },
    /// Broken internal invariant; the engine resets to Normal mode.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<RegisterError> for EngineError {
    fn from(e: RegisterError) -> Self {
        match e {
            RegisterError::Clipboard => EngineError::NotSupported("clipboard registers"),
            RegisterError::InvalidName(_) | RegisterError::ReadOnly(_) => EngineError::Beep,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_errors_map_to_engine_kinds() {
        assert_eq!(
            EngineError::from(RegisterError::Clipboard),
            EngineError::NotSupported("clipboard registers")
        );
        assert_eq!(EngineError::from(RegisterError::ReadOnly('.')), EngineError::Beep);
        assert_eq!(
            EngineError::GuardedRegion { line: 2 }.to_string(),
            "line 3 is guarded"
        );
    }
}
