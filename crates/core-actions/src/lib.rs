//! Modal command engine.
//!
//! Keys enter through [`Engine::feed`]. In Normal, Operator-pending and
//! Visual mode they are parsed into command chunks by the
//! [`dispatcher`], which runs motions, text objects and operators against the
//! [`EditorContext`](core_state::EditorContext). Commands that continue in
//! Insert or Replace mode hand over to an [`insert::EditModeController`]
//! until `<Esc>`. Changes are remembered for `.` as replayable keys
//! ([`repeat`]).
//!
//! Module map:
//! * `block`: rectangle geometry shared by every block operation.
//! * `motion`, `text_object`: where a command moves or what it covers.
//! * `operator`: normalisation of ranges and the operators themselves.
//! * `insert`: Insert/Replace mode, continuations and the replace stack.
//! * `dispatcher`: command parsing and Normal/Visual command tables.
//! * `engine`: the host API and error recovery.

pub mod block;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod insert;
pub mod keys;
pub mod motion;
pub mod operator;
pub mod repeat;
pub mod text_object;

pub use dispatcher::{CommandArgs, CommandDispatcher, CommandParser, MAX_COUNT, ParserState};
pub use engine::{DispatchResult, EditorMode, Engine};
pub use error::{EngineError, EngineResult};
pub use insert::{EditModeController, InsertKind, InsertRequest};
pub use keys::{key_name, parse_keys};
pub use operator::{OperatorArgs, OperatorKind};
pub use repeat::{DotRecord, VisualKind};
