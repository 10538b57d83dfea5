//! Gridiron: a tick-driven state machine runtime for headless game rooms.
//!
//! This is the top-level facade crate that re-exports the public API
//! from the Gridiron sub-crates. For most users, adding `gridiron` as a
//! single dependency is sufficient.
//!
//! The runtime evaluates exactly one named game state per tick against
//! an immutable snapshot of the room. States never touch the room
//! directly: side effects are queued through the per-call context, run
//! strictly after the state's callback returns, and entity writes are
//! coalesced and elided before reaching the room.
//!
//! # Quick start
//!
//! ```rust
//! use gridiron::prelude::*;
//!
//! // A minimal world adapter over an in-process "room".
//! struct Room {
//!     players: Vec<PlayerFacts>,
//!     ball: DiscFacts,
//!     chat: Vec<String>,
//! }
//!
//! impl WorldAdapter for Room {
//!     fn players(&self) -> Vec<PlayerFacts> {
//!         self.players.clone()
//!     }
//!     fn ball(&self) -> Option<DiscFacts> {
//!         Some(self.ball)
//!     }
//!     fn player_disc(&self, _id: PlayerId) -> Option<DiscFacts> {
//!         None
//!     }
//!     fn set_ball(&mut self, patch: &DiscPatch) {
//!         if let Some(x) = patch.x {
//!             self.ball.x = x;
//!         }
//!         if let Some(y) = patch.y {
//!             self.ball.y = y;
//!         }
//!     }
//!     fn set_player_disc(&mut self, _id: PlayerId, _patch: &DiscPatch) {}
//!     fn set_avatar(&mut self, _id: PlayerId, _avatar: Option<&str>) {}
//!     fn set_team(&mut self, _id: PlayerId, _team: Option<Team>) {}
//!     fn set_admin(&mut self, _id: PlayerId, _admin: bool) {}
//!     fn send_chat(&mut self, message: &str, _to: Option<PlayerId>) {
//!         self.chat.push(message.to_string());
//!     }
//!     fn send_announcement(&mut self, _message: &str, _to: Option<PlayerId>) {}
//!     fn stop_game(&mut self) {}
//!     fn pause_game(&mut self, _paused: bool) {}
//! }
//!
//! // A state that recentres the ball and greets the room on its first tick.
//! struct Kickoff;
//! impl State for Kickoff {
//!     fn run(&mut self, cx: &mut StateContext<'_>, game: &GameState) -> Flow {
//!         if game.tick == TickId(1) {
//!             cx.effect(|fx| fx.send_chat("kickoff!", None));
//!             cx.effect(|fx| {
//!                 fx.set_ball(DiscPatch {
//!                     x: Some(0.0),
//!                     y: Some(0.0),
//!                     ..DiscPatch::default()
//!                 })
//!             });
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let room = Room {
//!     players: vec![PlayerFacts {
//!         id: PlayerId(1),
//!         name: "alice".to_string(),
//!         team: Some(Team::Red),
//!         x: 0.0,
//!         y: 0.0,
//!         radius: 15.0,
//!         admin: false,
//!         avatar: None,
//!     }],
//!     ball: DiscFacts {
//!         x: 30.0,
//!         ..DiscFacts::default()
//!     },
//!     chat: Vec::new(),
//! };
//!
//! let mut registry = StateRegistry::new();
//! registry.register("kickoff", |_cx, _params| Ok(Box::new(Kickoff) as Box<dyn State>));
//!
//! let mut engine = Engine::new(room, registry, EngineConfig::default()).unwrap();
//! engine.start("kickoff", Params::none()).unwrap();
//! engine.tick().unwrap();
//!
//! assert_eq!(engine.current_tick(), TickId(1));
//! assert_eq!(engine.adapter().chat, vec!["kickoff!".to_string()]);
//! assert_eq!(engine.adapter().ball.x, 0.0);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in
//! the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `gridiron-core` | IDs, snapshots, transitions, the adapter trait, error types |
//! | [`engine`] | `gridiron-engine` | The engine, context, registry, mutation buffer, checkpoints |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and the world adapter boundary (`gridiron-core`).
///
/// Contains IDs, the immutable [`types::GameState`] snapshot, the
/// [`types::Transition`] protocol types, the [`types::WorldAdapter`]
/// trait, and the error taxonomy.
pub use gridiron_core as types;

/// The runtime itself (`gridiron-engine`).
///
/// [`engine::Engine`] orchestrates ticks and events;
/// [`engine::StateContext`] is the hook surface states program against.
pub use gridiron_engine as engine;

/// Common imports for typical Gridiron usage.
///
/// ```rust
/// use gridiron::prelude::*;
/// ```
pub mod prelude {
    // IDs and snapshot
    pub use gridiron_core::id::{PlayerId, Team, TickId};
    pub use gridiron_core::snapshot::{GameState, GameStateBall, GameStatePlayer};

    // Adapter boundary
    pub use gridiron_core::adapter::{DiscFacts, DiscPatch, PlayerFacts, WorldAdapter};

    // Transition protocol
    pub use gridiron_core::transition::{
        Checkpoint, CheckpointDraft, Disposal, Params, RestoreRequest, Transition,
    };

    // Errors
    pub use gridiron_core::error::{ContextPhase, EngineError, ProtocolError, StateError};
    pub use gridiron_engine::config::ConfigError;

    // Engine
    pub use gridiron_engine::checkpoint::{CheckpointStore, MemoryCheckpointStore};
    pub use gridiron_engine::config::{EngineConfig, SettingValue};
    pub use gridiron_engine::context::{EffectApi, Flow, Interrupt, StateContext};
    pub use gridiron_engine::engine::Engine;
    pub use gridiron_engine::metrics::TickMetrics;
    pub use gridiron_engine::state::{Handled, State, StateRegistry};
}
