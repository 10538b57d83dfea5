//! The [`State`] trait, state instances, and the name-to-constructor
//! registry.

use indexmap::IndexMap;
use smallvec::SmallVec;

use gridiron_core::error::StateError;
use gridiron_core::snapshot::{GameState, GameStatePlayer};
use gridiron_core::transition::{CheckpointDraft, Params};

use crate::context::{DisposalFn, Flow, Interrupt, StateContext};

/// Outcome of a command dispatch: whether the state consumed it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Handled {
    /// True if the state acted on the command.
    pub handled: bool,
}

/// One unit of game behavior, evaluated once per tick.
///
/// Implementations inspect the read-only snapshot and schedule all
/// side effects and transitions through the context; they never touch
/// the world directly. Event handlers default to doing nothing.
pub trait State {
    /// Evaluate one tick against a fresh snapshot.
    fn run(&mut self, cx: &mut StateContext<'_>, game: &GameState) -> Flow;

    /// A player moved onto a side.
    fn on_join(
        &mut self,
        _cx: &mut StateContext<'_>,
        _game: &GameState,
        _player: &GameStatePlayer,
        _by: Option<&GameStatePlayer>,
    ) -> Flow {
        Ok(())
    }

    /// A player left the room.
    fn on_leave(
        &mut self,
        _cx: &mut StateContext<'_>,
        _game: &GameState,
        _player: &GameStatePlayer,
    ) -> Flow {
        Ok(())
    }

    /// A player sent a chat message.
    fn on_chat(
        &mut self,
        _cx: &mut StateContext<'_>,
        _game: &GameState,
        _player: &GameStatePlayer,
        _message: &str,
    ) -> Flow {
        Ok(())
    }

    /// A player issued a command.
    fn on_command(
        &mut self,
        _cx: &mut StateContext<'_>,
        _game: &GameState,
        _player: &GameStatePlayer,
        _command: &str,
    ) -> Result<Handled, Interrupt> {
        Ok(Handled { handled: false })
    }
}

/// A state constructor: builds the behavior object from opaque params.
///
/// Constructors may register disposals and queue effects through the
/// context, but recording a transition from one is a protocol
/// violation.
pub type StateCtor =
    Box<dyn Fn(&mut StateContext<'_>, &Params) -> Result<Box<dyn State>, StateError>>;

/// Mapping from state name to constructor.
///
/// Unknown names fail fast at `start` or transition time with the
/// offending name.
#[derive(Default)]
pub struct StateRegistry {
    ctors: IndexMap<String, StateCtor>,
}

impl StateRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, ctor: F)
    where
        F: Fn(&mut StateContext<'_>, &Params) -> Result<Box<dyn State>, StateError> + 'static,
    {
        self.ctors.insert(name.into(), Box::new(ctor));
    }

    /// True if no constructor is registered.
    pub fn is_empty(&self) -> bool {
        self.ctors.is_empty()
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ctors.keys().map(String::as_str)
    }

    pub(crate) fn ctor(&self, name: &str) -> Option<&StateCtor> {
        self.ctors.get(name)
    }
}

/// The engine-owned live instance of a state.
///
/// Exactly one instance is current while the machine runs (or none,
/// while a delayed transition with immediate disposal is waiting).
pub(crate) struct StateInstance {
    pub name: String,
    pub state: Box<dyn State>,
    pub disposals: SmallVec<[DisposalFn; 4]>,
    pub drafts: Vec<CheckpointDraft>,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nothing;
    impl State for Nothing {
        fn run(&mut self, _cx: &mut StateContext<'_>, _game: &GameState) -> Flow {
            Ok(())
        }
    }

    #[test]
    fn registry_lookup_by_name() {
        let mut registry = StateRegistry::new();
        assert!(registry.is_empty());

        registry.register("idle", |_cx, _params| Ok(Box::new(Nothing) as Box<dyn State>));
        assert!(!registry.is_empty());
        assert!(registry.ctor("idle").is_some());
        assert!(registry.ctor("absent").is_none());
    }

    #[test]
    fn names_preserve_registration_order() {
        let mut registry = StateRegistry::new();
        registry.register("kickoff", |_cx, _p| Ok(Box::new(Nothing) as Box<dyn State>));
        registry.register("snap", |_cx, _p| Ok(Box::new(Nothing) as Box<dyn State>));

        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["kickoff", "snap"]);
    }
}
