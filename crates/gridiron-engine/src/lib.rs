//! Tick-driven state machine engine for the Gridiron runtime.
//!
//! Provides the top-level [`Engine`] that evaluates exactly one named
//! game state per tick against an immutable world snapshot, coordinating
//! the per-call hook context, the coalescing mutation buffer, transition
//! scheduling (immediate, delayed, pause-aware), and checkpoint storage.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod buffer;
pub mod checkpoint;
pub mod config;
pub mod context;
pub mod engine;
pub mod metrics;
pub mod snapshot;
pub mod state;

pub use buffer::{EntityKey, FlushStats, MutationBuffer};
pub use checkpoint::{CheckpointStore, MemoryCheckpointStore};
pub use config::{ConfigError, EngineConfig, SettingValue};
pub use context::{EffectApi, Flow, Interrupt, StateContext};
pub use engine::Engine;
pub use metrics::TickMetrics;
pub use state::{Handled, State, StateRegistry};
