//! The per-call execution context.
//!
//! A [`StateContext`] is built by the engine for exactly one callback
//! invocation (construction, `run`, an event handler, or a disposal
//! callback) and threaded into it explicitly, so a hook can never be
//! reached without a live context and two contexts can never coexist.
//! It collects deferred work — effects, disposal registrations,
//! checkpoint drafts, shared-state writes, and at most one transition —
//! which the engine applies after the callback returns.
//!
//! # Unwinding
//!
//! `next` and `restore` record their transition and return
//! [`Err(Interrupt)`](Interrupt); the callback propagates it with `?`,
//! which aborts its remaining work through ordinary control flow. The
//! compiler forces every call site to handle the variant, so the
//! sentinel cannot be silently lost.

use indexmap::IndexMap;
use smallvec::SmallVec;

use gridiron_core::adapter::{DiscPatch, WorldAdapter};
use gridiron_core::error::{ContextPhase, EngineError, ProtocolError};
use gridiron_core::id::{PlayerId, Team};
use gridiron_core::snapshot::GameState;
use gridiron_core::transition::{CheckpointDraft, Disposal, Params, RestoreRequest, Transition};

use crate::buffer::{EntityKey, MutationBuffer};
use crate::checkpoint::CheckpointStore;
use crate::config::EngineConfig;

/// Opaque token proving that a hook unwound the current callback.
///
/// Only the context can create one; callbacks propagate it upward
/// with `?` and the engine absorbs it.
#[derive(Debug)]
pub struct Interrupt(());

/// Return type of state callbacks and transition-capable hooks.
pub type Flow = Result<(), Interrupt>;

pub(crate) type EffectFn = Box<dyn FnOnce(&mut EffectApi<'_>)>;
pub(crate) type DisposalFn = Box<dyn FnOnce(&mut StateContext<'_>)>;

/// Everything a context collected during one callback invocation.
pub(crate) struct CtxOutcome {
    pub effects: SmallVec<[EffectFn; 8]>,
    pub disposals: SmallVec<[DisposalFn; 4]>,
    pub drafts: Vec<CheckpointDraft>,
    pub shared_writes: Vec<(String, Params)>,
    pub transition: Option<Transition>,
}

/// The hook surface exposed to whichever state callback is executing.
pub struct StateContext<'a> {
    phase: ContextPhase,
    state_name: &'a str,
    muted: bool,
    config: &'a EngineConfig,
    before: Option<&'a GameState>,
    shared: &'a IndexMap<String, Params>,
    checkpoints: &'a mut dyn CheckpointStore,
    effects: SmallVec<[EffectFn; 8]>,
    disposals: SmallVec<[DisposalFn; 4]>,
    drafts: Vec<CheckpointDraft>,
    shared_writes: Vec<(String, Params)>,
    transition: Option<Transition>,
    error: Option<EngineError>,
}

impl<'a> StateContext<'a> {
    pub(crate) fn new(
        phase: ContextPhase,
        state_name: &'a str,
        muted: bool,
        config: &'a EngineConfig,
        before: Option<&'a GameState>,
        shared: &'a IndexMap<String, Params>,
        checkpoints: &'a mut dyn CheckpointStore,
    ) -> Self {
        Self {
            phase,
            state_name,
            muted,
            config,
            before,
            shared,
            checkpoints,
            effects: SmallVec::new(),
            disposals: SmallVec::new(),
            drafts: Vec::new(),
            shared_writes: Vec::new(),
            transition: None,
            error: None,
        }
    }

    /// Queue a deferred side effect.
    ///
    /// Effects run in call order strictly after the invoking callback
    /// returns (or is interrupted), never during it, against an
    /// [`EffectApi`] that routes writes through the mutation buffer.
    /// On a muted context (soft refresh) queued effects are discarded.
    pub fn effect(&mut self, f: impl FnOnce(&mut EffectApi<'_>) + 'static) {
        self.effects.push(Box::new(f));
    }

    /// Register a cleanup callback on the current state instance.
    ///
    /// Has no immediate effect; disposal callbacks run when the
    /// instance is disposed, per the disposing transition's policy.
    pub fn dispose(&mut self, f: impl FnOnce(&mut StateContext<'_>) + 'static) {
        self.disposals.push(Box::new(f));
    }

    /// Record a transition and unwind the rest of this callback.
    ///
    /// At most one transition may be recorded per context; a second
    /// call, or a call from a phase that disallows transitions, is a
    /// protocol violation surfaced by the engine after the callback.
    pub fn next(&mut self, transition: Transition) -> Flow {
        if !self.phase.allows_transition() {
            self.fail(
                ProtocolError::TransitionNotAllowed {
                    state: self.state_name.to_string(),
                    phase: self.phase,
                }
                .into(),
            );
            return Err(Interrupt(()));
        }
        if self.transition.is_some() {
            self.fail(
                ProtocolError::DoubleTransition {
                    state: self.state_name.to_string(),
                }
                .into(),
            );
            return Err(Interrupt(()));
        }
        self.transition = Some(transition);
        Err(Interrupt(()))
    }

    /// Register a checkpoint draft; execution continues normally.
    ///
    /// Drafts become durable when this state instance transitions away.
    pub fn checkpoint(&mut self, draft: CheckpointDraft) {
        self.drafts.push(draft);
    }

    /// Resolve a recorded checkpoint, record its transition with
    /// disposal forced to [`Disposal::Immediate`], and unwind.
    ///
    /// A request that matches no checkpoint is a fatal lookup failure.
    pub fn restore(&mut self, request: RestoreRequest) -> Flow {
        match self.checkpoints.resolve(&request) {
            Some(mut transition) => {
                transition.disposal = Disposal::Immediate;
                self.next(transition)
            }
            None => {
                self.fail(EngineError::MissingCheckpoint { key: request.key });
                Err(Interrupt(()))
            }
        }
    }

    /// The snapshot captured before the current tick or event.
    ///
    /// `None` at machine start, before any tick has completed.
    pub fn before(&self) -> Option<&GameState> {
        self.before
    }

    /// The engine's static configuration.
    pub fn config(&self) -> &EngineConfig {
        self.config
    }

    /// Read a shared value by key, if present and of type `T`.
    pub fn shared<T: 'static>(&self, key: &str) -> Option<&T> {
        self.shared.get(key).and_then(|p| p.downcast_ref::<T>())
    }

    /// Schedule a shared-state write, applied at flush time alongside
    /// this context's effects. Never visible during the callback.
    pub fn set_shared(&mut self, key: impl Into<String>, value: Params) {
        self.shared_writes.push((key.into(), value));
    }

    /// Whether this context discards its effects (soft refresh).
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    fn fail(&mut self, error: EngineError) {
        // Keep the first failure; later ones are cascade noise.
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Close the context, validating the protocol.
    ///
    /// `flow` is the value the callback returned. An interrupt without
    /// a recorded transition (and no failed hook) means the callback
    /// forged the sentinel, which is a protocol violation.
    pub(crate) fn finish(self, flow: Flow) -> Result<CtxOutcome, EngineError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if flow.is_err() && self.transition.is_none() {
            return Err(ProtocolError::StrayInterrupt {
                state: self.state_name.to_string(),
            }
            .into());
        }
        Ok(CtxOutcome {
            effects: self.effects,
            disposals: self.disposals,
            drafts: self.drafts,
            shared_writes: self.shared_writes,
            transition: self.transition,
        })
    }
}

/// The materialized API effects run against.
///
/// Entity writes are queued into the mutation buffer and coalesced;
/// chat and game-control operations pass straight through to the
/// adapter.
pub struct EffectApi<'a> {
    adapter: &'a mut dyn WorldAdapter,
    buffer: &'a mut MutationBuffer,
    stop_requested: &'a mut bool,
}

impl<'a> EffectApi<'a> {
    pub(crate) fn new(
        adapter: &'a mut dyn WorldAdapter,
        buffer: &'a mut MutationBuffer,
        stop_requested: &'a mut bool,
    ) -> Self {
        Self {
            adapter,
            buffer,
            stop_requested,
        }
    }

    /// Queue a partial physics write to the ball.
    pub fn set_ball(&mut self, patch: DiscPatch) {
        self.buffer.queue_disc(EntityKey::Ball, patch);
    }

    /// Queue a partial physics write to a player's body disc.
    pub fn set_player_disc(&mut self, id: PlayerId, patch: DiscPatch) {
        self.buffer.queue_disc(EntityKey::Player(id), patch);
    }

    /// Queue an avatar change.
    pub fn set_avatar(&mut self, id: PlayerId, avatar: Option<String>) {
        self.buffer.queue_avatar(id, avatar);
    }

    /// Queue a team change.
    pub fn set_team(&mut self, id: PlayerId, team: Option<Team>) {
        self.buffer.queue_team(id, team);
    }

    /// Queue an admin flag change.
    pub fn set_admin(&mut self, id: PlayerId, admin: bool) {
        self.buffer.queue_admin(id, admin);
    }

    /// Send a chat message immediately.
    pub fn send_chat(&mut self, message: &str, to: Option<PlayerId>) {
        self.adapter.send_chat(message, to);
    }

    /// Send a styled announcement immediately.
    pub fn announce(&mut self, message: &str, to: Option<PlayerId>) {
        self.adapter.send_announcement(message, to);
    }

    /// Pause or unpause the game.
    pub fn pause_game(&mut self, paused: bool) {
        self.adapter.pause_game(paused);
    }

    /// Stop the game. Subsequent ticks become no-ops until the machine
    /// is started again.
    pub fn stop_game(&mut self) {
        self.adapter.stop_game();
        *self.stop_requested = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::MemoryCheckpointStore;
    use gridiron_core::id::TickId;
    use gridiron_core::transition::Checkpoint;

    fn fixtures() -> (EngineConfig, IndexMap<String, Params>, MemoryCheckpointStore) {
        (EngineConfig::default(), IndexMap::new(), MemoryCheckpointStore::new(8))
    }

    #[test]
    fn next_records_once_and_interrupts() {
        let (config, shared, mut store) = fixtures();
        let mut cx = StateContext::new(
            ContextPhase::Run,
            "kickoff",
            false,
            &config,
            None,
            &shared,
            &mut store,
        );

        let flow = cx.next(Transition::to("snap"));
        assert!(flow.is_err());

        let outcome = cx.finish(flow).unwrap();
        assert_eq!(outcome.transition.unwrap().to, "snap");
    }

    #[test]
    fn second_next_is_a_double_transition() {
        let (config, shared, mut store) = fixtures();
        let mut cx = StateContext::new(
            ContextPhase::Run,
            "kickoff",
            false,
            &config,
            None,
            &shared,
            &mut store,
        );

        let _ = cx.next(Transition::to("a"));
        let flow = cx.next(Transition::to("b"));

        match cx.finish(flow) {
            Err(EngineError::Protocol(ProtocolError::DoubleTransition { state })) => {
                assert_eq!(state, "kickoff");
            }
            other => panic!("expected DoubleTransition, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn transition_from_construction_is_rejected() {
        let (config, shared, mut store) = fixtures();
        let mut cx = StateContext::new(
            ContextPhase::Construct,
            "kickoff",
            false,
            &config,
            None,
            &shared,
            &mut store,
        );

        let flow = cx.next(Transition::to("snap"));
        match cx.finish(flow) {
            Err(EngineError::Protocol(ProtocolError::TransitionNotAllowed {
                phase, ..
            })) => assert_eq!(phase, ContextPhase::Construct),
            other => panic!("expected TransitionNotAllowed, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn restore_forces_immediate_disposal() {
        let (config, shared, mut store) = fixtures();
        store.record(Checkpoint {
            key: None,
            transition: Transition::to("snap").with_disposal(Disposal::AfterResume),
            state: "kickoff".to_string(),
            tick: TickId(3),
        });
        let mut cx = StateContext::new(
            ContextPhase::Run,
            "kickoff",
            false,
            &config,
            None,
            &shared,
            &mut store,
        );

        let flow = cx.restore(RestoreRequest::default());
        let outcome = cx.finish(flow).unwrap();
        let t = outcome.transition.unwrap();
        assert_eq!(t.to, "snap");
        assert_eq!(t.disposal, Disposal::Immediate);
    }

    #[test]
    fn restore_without_checkpoint_is_fatal() {
        let (config, shared, mut store) = fixtures();
        let mut cx = StateContext::new(
            ContextPhase::Run,
            "kickoff",
            false,
            &config,
            None,
            &shared,
            &mut store,
        );

        let flow = cx.restore(RestoreRequest {
            key: Some("absent".to_string()),
            consume: false,
        });
        match cx.finish(flow) {
            Err(EngineError::MissingCheckpoint { key }) => {
                assert_eq!(key.as_deref(), Some("absent"));
            }
            other => panic!("expected MissingCheckpoint, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn forged_interrupt_is_a_stray() {
        let (config, shared, mut store) = fixtures();
        let cx = StateContext::new(
            ContextPhase::Run,
            "kickoff",
            false,
            &config,
            None,
            &shared,
            &mut store,
        );

        match cx.finish(Err(Interrupt(()))) {
            Err(EngineError::Protocol(ProtocolError::StrayInterrupt { state })) => {
                assert_eq!(state, "kickoff");
            }
            other => panic!("expected StrayInterrupt, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn effects_and_disposals_collect_in_call_order() {
        let (config, shared, mut store) = fixtures();
        let mut cx = StateContext::new(
            ContextPhase::Run,
            "kickoff",
            false,
            &config,
            None,
            &shared,
            &mut store,
        );

        cx.effect(|_| {});
        cx.effect(|_| {});
        cx.dispose(|_| {});

        let outcome = cx.finish(Ok(())).unwrap();
        assert_eq!(outcome.effects.len(), 2);
        assert_eq!(outcome.disposals.len(), 1);
        assert!(outcome.transition.is_none());
    }

    #[test]
    fn shared_reads_are_typed() {
        let (config, mut shared, mut store) = fixtures();
        shared.insert("down".to_string(), Params::new(3u32));
        let cx = StateContext::new(
            ContextPhase::Run,
            "snap",
            false,
            &config,
            None,
            &shared,
            &mut store,
        );

        assert_eq!(cx.shared::<u32>("down"), Some(&3));
        assert_eq!(cx.shared::<String>("down"), None);
        assert_eq!(cx.shared::<u32>("absent"), None);
    }
}
