//! Core types for the Gridiron game state machine runtime.
//!
//! This is the leaf crate with zero dependencies. It defines the
//! fundamental abstractions used throughout the Gridiron workspace:
//! strongly-typed IDs, the per-tick world snapshot, transition and
//! checkpoint value types, the world adapter boundary, and error types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod adapter;
pub mod error;
pub mod id;
pub mod snapshot;
pub mod transition;

pub use adapter::{DiscFacts, DiscPatch, PlayerFacts, WorldAdapter};
pub use error::{ContextPhase, EngineError, ProtocolError, StateError};
pub use id::{PlayerId, Team, TickId};
pub use snapshot::{GameState, GameStateBall, GameStatePlayer};
pub use transition::{Checkpoint, CheckpointDraft, Disposal, Params, RestoreRequest, Transition};
