//! The top-level engine: tick and event orchestration over exactly one
//! active state.
//!
//! [`Engine`] owns the active state instance, the transition schedule,
//! the checkpoint store, and the pause/resume coordination. The host
//! drives it strictly sequentially: one `tick()` per simulation step
//! plus non-tick event entry points (`handle_chat`, `handle_command`,
//! `handle_team_change`, `handle_leave`). Everything runs on the
//! calling thread; no hook ever suspends.

use std::fmt;
use std::mem;
use std::time::Instant;

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;

use gridiron_core::adapter::WorldAdapter;
use gridiron_core::error::{ContextPhase, EngineError};
use gridiron_core::id::{PlayerId, TickId};
use gridiron_core::snapshot::GameState;
use gridiron_core::transition::{Checkpoint, CheckpointDraft, Disposal, Params, Transition};

use crate::buffer::{FlushStats, MutationBuffer};
use crate::checkpoint::{CheckpointStore, MemoryCheckpointStore};
use crate::config::{ConfigError, EngineConfig};
use crate::context::{CtxOutcome, DisposalFn, EffectApi, EffectFn, StateContext};
use crate::metrics::TickMetrics;
use crate::snapshot::build_game_state;
use crate::state::{Handled, StateInstance, StateRegistry};

// ── Scheduled ───────────────────────────────────────────────────

/// The transition schedule as a single tagged union, so an engine can
/// never hold conflicting pending transitions.
enum Scheduled {
    /// Nothing pending.
    Idle,
    /// A swap counting down; applied when `remaining` reaches zero,
    /// reclassified with its original disposal mode.
    Delayed {
        transition: Transition,
        remaining: u32,
    },
    /// A swap parked until the first tick after an unpause. While this
    /// is pending, ticks advance the counter but run nothing.
    AfterResume { transition: Transition },
}

// ── Engine ──────────────────────────────────────────────────────

/// Tick-driven state machine over a world adapter.
///
/// Guarantees exactly one active state (or none, while a delayed
/// transition with immediate disposal waits), deterministic effect
/// ordering, and deferred, coalesced mutation of the world.
pub struct Engine<W: WorldAdapter> {
    adapter: W,
    registry: StateRegistry,
    config: EngineConfig,
    checkpoints: Box<dyn CheckpointStore>,
    shared: IndexMap<String, Params>,

    current: Option<StateInstance>,
    scheduled: Scheduled,
    deferred_disposals: Vec<(String, DisposalFn)>,
    before: Option<GameState>,
    kicked: IndexSet<PlayerId>,

    tick_number: u64,
    running: bool,
    stop_requested: bool,
    paused: bool,
    resume_pending: bool,
    last_pause_by: Option<PlayerId>,
    metrics: TickMetrics,
}

impl<W: WorldAdapter> Engine<W> {
    /// Construct an engine with the bundled in-memory checkpoint store.
    ///
    /// Validates the configuration and requires a non-empty registry.
    pub fn new(adapter: W, registry: StateRegistry, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let checkpoints = Box::new(MemoryCheckpointStore::new(config.max_checkpoints));
        Self::with_checkpoint_store(adapter, registry, config, checkpoints)
    }

    /// Construct an engine with an externally supplied checkpoint store.
    pub fn with_checkpoint_store(
        adapter: W,
        registry: StateRegistry,
        config: EngineConfig,
        checkpoints: Box<dyn CheckpointStore>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if registry.is_empty() {
            return Err(ConfigError::EmptyRegistry);
        }
        Ok(Self {
            adapter,
            registry,
            config,
            checkpoints,
            shared: IndexMap::new(),
            current: None,
            scheduled: Scheduled::Idle,
            deferred_disposals: Vec::new(),
            before: None,
            kicked: IndexSet::new(),
            tick_number: 0,
            running: false,
            stop_requested: false,
            paused: false,
            resume_pending: false,
            last_pause_by: None,
            metrics: TickMetrics::default(),
        })
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Reset all counters and flags, construct the named state, and
    /// mark the machine running.
    pub fn start(&mut self, name: &str, params: Params) -> Result<(), EngineError> {
        if self.running {
            self.stop()?;
        }
        self.tick_number = 0;
        self.before = None;
        self.kicked.clear();
        self.scheduled = Scheduled::Idle;
        self.deferred_disposals.clear();
        self.paused = false;
        self.resume_pending = false;
        self.stop_requested = false;
        self.last_pause_by = None;
        self.metrics = TickMetrics::default();

        let instance = self.construct(name, &params, false)?;
        self.current = Some(instance);
        self.running = true;
        Ok(())
    }

    /// Dispose the current instance (running its cleanup even if
    /// disposal was deferred), flush deferred after-resume disposers,
    /// and reset to not-running.
    ///
    /// This is the only way to abort mid-flight delayed or
    /// after-resume transitions. Undurable drafts are discarded.
    pub fn stop(&mut self) -> Result<(), EngineError> {
        if !self.running {
            return Ok(());
        }
        self.running = false;
        if let Some(instance) = self.current.take() {
            let StateInstance {
                name, disposals, ..
            } = instance;
            self.run_disposals(&name, disposals.into_vec())?;
        }
        for (name, disposal) in mem::take(&mut self.deferred_disposals) {
            self.run_disposals(&name, vec![disposal])?;
        }
        self.scheduled = Scheduled::Idle;
        self.kicked.clear();
        self.before = None;
        self.paused = false;
        self.resume_pending = false;
        Ok(())
    }

    // ── Tick processing ─────────────────────────────────────────

    /// Process one tick.
    ///
    /// No-op when not running or after a state requested the world
    /// stop the game. Otherwise: resume-tick bookkeeping, drain the
    /// one-shot kick set, delayed-transition countdown, freeze check,
    /// snapshot build, `run` invocation, effect/mutation flush,
    /// transition classification. The tick counter advances exactly
    /// once regardless of the branch taken.
    pub fn tick(&mut self) -> Result<(), EngineError> {
        if !self.running || self.stop_requested {
            return Ok(());
        }
        let tick_start = Instant::now();
        self.tick_number += 1;
        let next_tick = TickId(self.tick_number);

        // Resume-tick bookkeeping: deferred disposers first, in the
        // order deferred, then the parked transition with its disposal
        // demoted to Delayed.
        let resume_tick = mem::take(&mut self.resume_pending);
        if resume_tick {
            for (name, disposal) in mem::take(&mut self.deferred_disposals) {
                self.run_disposals(&name, vec![disposal])?;
            }
            if matches!(self.scheduled, Scheduled::AfterResume { .. }) {
                if let Scheduled::AfterResume { mut transition } =
                    mem::replace(&mut self.scheduled, Scheduled::Idle)
                {
                    transition.disposal = Disposal::Delayed;
                    self.apply_transition(transition, true)?;
                }
            }
        }

        // Drain the one-shot kick registration set, consumed or not.
        let kicked = mem::take(&mut self.kicked);

        // Delayed-transition countdown.
        let mut due = None;
        if let Scheduled::Delayed { remaining, .. } = &mut self.scheduled {
            *remaining -= 1;
            if *remaining == 0 {
                if let Scheduled::Delayed { transition, .. } =
                    mem::replace(&mut self.scheduled, Scheduled::Idle)
                {
                    due = Some(transition);
                }
            }
        }
        if let Some(transition) = due {
            self.apply_transition(transition, resume_tick)?;
        }

        // Frozen pending resume: the world is paused from this
        // machine's point of view; only the counter advances.
        if matches!(self.scheduled, Scheduled::AfterResume { .. }) {
            self.metrics.frozen_ticks += 1;
            return Ok(());
        }

        // No current instance: waiting out a delayed transition whose
        // disposal was immediate.
        let Some(mut instance) = self.current.take() else {
            return Ok(());
        };

        let snap_start = Instant::now();
        let game = build_game_state(&self.adapter, next_tick, &kicked);
        self.metrics.snapshot_build_us = snap_start.elapsed().as_micros() as u64;

        let run_start = Instant::now();
        let outcome = {
            let mut cx = StateContext::new(
                ContextPhase::Run,
                &instance.name,
                false,
                &self.config,
                self.before.as_ref(),
                &self.shared,
                self.checkpoints.as_mut(),
            );
            let flow = instance.state.run(&mut cx, &game);
            cx.finish(flow)
        };
        self.metrics.run_us = run_start.elapsed().as_micros() as u64;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                self.current = Some(instance);
                return Err(err);
            }
        };
        let CtxOutcome {
            effects,
            disposals,
            drafts,
            shared_writes,
            transition,
            ..
        } = outcome;
        instance.disposals.extend(disposals);
        instance.drafts.extend(drafts);
        self.current = Some(instance);

        let flush_start = Instant::now();
        self.metrics.effects_run = effects.len() as u32;
        let stats = self.flush_effects(effects, shared_writes);
        self.metrics.flush_us = flush_start.elapsed().as_micros() as u64;
        self.metrics.mutation_writes = stats.writes;
        self.metrics.mutations_elided = stats.elided;

        if let Some(transition) = transition {
            self.apply_transition(transition, resume_tick)?;
        }

        self.before = Some(game);
        self.metrics.total_us = tick_start.elapsed().as_micros() as u64;
        Ok(())
    }

    // ── Non-tick events ─────────────────────────────────────────

    /// Register that a player kicked the ball. The flag is visible for
    /// exactly one tick and the set is drained whether or not a state
    /// consumed it.
    pub fn track_ball_kick(&mut self, player: PlayerId) {
        self.kicked.insert(player);
    }

    /// Dispatch a chat message to the current state.
    ///
    /// Silently does nothing if the state keeps the default handler or
    /// the speaker cannot be resolved in a fresh snapshot. Does not
    /// advance the tick counter.
    pub fn handle_chat(&mut self, player: PlayerId, message: &str) -> Result<(), EngineError> {
        if !self.running {
            return Ok(());
        }
        let Some(mut instance) = self.current.take() else {
            return Ok(());
        };
        let game = build_game_state(&self.adapter, TickId(self.tick_number), &self.kicked);
        let Some(speaker) = game.player(player).cloned() else {
            self.current = Some(instance);
            return Ok(());
        };
        let outcome = {
            let mut cx = StateContext::new(
                ContextPhase::Event,
                &instance.name,
                false,
                &self.config,
                self.before.as_ref(),
                &self.shared,
                self.checkpoints.as_mut(),
            );
            let flow = instance.state.on_chat(&mut cx, &game, &speaker, message);
            cx.finish(flow)
        };
        self.finish_event(instance, outcome).map(|_| ())
    }

    /// Dispatch a command to the current state.
    ///
    /// A command that records a transition counts as handled.
    pub fn handle_command(
        &mut self,
        player: PlayerId,
        command: &str,
    ) -> Result<Handled, EngineError> {
        if !self.running {
            return Ok(Handled { handled: false });
        }
        let Some(mut instance) = self.current.take() else {
            return Ok(Handled { handled: false });
        };
        let game = build_game_state(&self.adapter, TickId(self.tick_number), &self.kicked);
        let Some(issuer) = game.player(player).cloned() else {
            self.current = Some(instance);
            return Ok(Handled { handled: false });
        };
        let mut handled = false;
        let outcome = {
            let mut cx = StateContext::new(
                ContextPhase::Event,
                &instance.name,
                false,
                &self.config,
                self.before.as_ref(),
                &self.shared,
                self.checkpoints.as_mut(),
            );
            let flow = match instance.state.on_command(&mut cx, &game, &issuer, command) {
                Ok(result) => {
                    handled = result.handled;
                    Ok(())
                }
                Err(interrupt) => Err(interrupt),
            };
            cx.finish(flow)
        };
        let transitioned = self.finish_event(instance, outcome)?;
        Ok(Handled {
            handled: handled || transitioned,
        })
    }

    /// Dispatch a team change to the current state's join handler.
    ///
    /// Moving onto a side is how a participant enters this machine's
    /// world, so it maps to `on_join`.
    pub fn handle_team_change(
        &mut self,
        player: PlayerId,
        by: Option<PlayerId>,
    ) -> Result<(), EngineError> {
        if !self.running {
            return Ok(());
        }
        let Some(mut instance) = self.current.take() else {
            return Ok(());
        };
        let game = build_game_state(&self.adapter, TickId(self.tick_number), &self.kicked);
        let Some(moved) = game.player(player).cloned() else {
            self.current = Some(instance);
            return Ok(());
        };
        let mover = by.and_then(|id| game.player(id).cloned());
        let outcome = {
            let mut cx = StateContext::new(
                ContextPhase::Event,
                &instance.name,
                false,
                &self.config,
                self.before.as_ref(),
                &self.shared,
                self.checkpoints.as_mut(),
            );
            let flow = instance
                .state
                .on_join(&mut cx, &game, &moved, mover.as_ref());
            cx.finish(flow)
        };
        self.finish_event(instance, outcome).map(|_| ())
    }

    /// Dispatch a player departure to the current state.
    pub fn handle_leave(&mut self, player: PlayerId) -> Result<(), EngineError> {
        if !self.running {
            return Ok(());
        }
        let Some(mut instance) = self.current.take() else {
            return Ok(());
        };
        let game = build_game_state(&self.adapter, TickId(self.tick_number), &self.kicked);
        let Some(leaver) = game.player(player).cloned() else {
            self.current = Some(instance);
            return Ok(());
        };
        let outcome = {
            let mut cx = StateContext::new(
                ContextPhase::Event,
                &instance.name,
                false,
                &self.config,
                self.before.as_ref(),
                &self.shared,
                self.checkpoints.as_mut(),
            );
            let flow = instance.state.on_leave(&mut cx, &game, &leaver);
            cx.finish(flow)
        };
        self.finish_event(instance, outcome).map(|_| ())
    }

    // ── Pause coordination ──────────────────────────────────────

    /// Mark the machine paused and clear any pending resume marker.
    pub fn handle_pause(&mut self, by: Option<PlayerId>) {
        if !self.running {
            return;
        }
        self.paused = true;
        self.resume_pending = false;
        self.last_pause_by = by;
        self.metrics.pauses += 1;
    }

    /// Mark a resume as pending: the next processed tick is the resume
    /// tick, on which deferred disposers run and any parked transition
    /// applies.
    pub fn handle_unpause(&mut self, by: Option<PlayerId>) {
        if !self.running {
            return;
        }
        self.paused = false;
        self.resume_pending = true;
        self.last_pause_by = by;
        self.metrics.resumes += 1;
    }

    // ── Accessors ───────────────────────────────────────────────

    /// Whether the machine is running.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether the machine is marked paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// The number of ticks processed since `start()`.
    pub fn current_tick(&self) -> TickId {
        TickId(self.tick_number)
    }

    /// Name of the active state, if one is current.
    pub fn current_state_name(&self) -> Option<&str> {
        self.current.as_ref().map(|i| i.name.as_str())
    }

    /// The player who last paused or unpaused, if known.
    pub fn last_pause_by(&self) -> Option<PlayerId> {
        self.last_pause_by
    }

    /// Metrics from the most recent tick plus cumulative counters.
    pub fn last_metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    /// The static configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The checkpoint store, for listing recorded checkpoints.
    pub fn checkpoints(&self) -> &dyn CheckpointStore {
        self.checkpoints.as_ref()
    }

    /// The world adapter.
    pub fn adapter(&self) -> &W {
        &self.adapter
    }

    /// Mutable access to the world adapter, for host-side wiring.
    pub fn adapter_mut(&mut self) -> &mut W {
        &mut self.adapter
    }

    /// Read a shared value by key, if present and of type `T`.
    pub fn shared<T: 'static>(&self, key: &str) -> Option<&T> {
        self.shared.get(key).and_then(|p| p.downcast_ref::<T>())
    }

    /// Seed or overwrite a shared value from the host side.
    pub fn set_shared(&mut self, key: impl Into<String>, value: Params) {
        self.shared.insert(key.into(), value);
    }

    // ── Internals ───────────────────────────────────────────────

    /// Close out an event invocation: absorb the outcome into the
    /// instance, flush, and classify any transition. Returns whether a
    /// transition was recorded.
    fn finish_event(
        &mut self,
        mut instance: StateInstance,
        outcome: Result<CtxOutcome, EngineError>,
    ) -> Result<bool, EngineError> {
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                self.current = Some(instance);
                return Err(err);
            }
        };
        let CtxOutcome {
            effects,
            disposals,
            drafts,
            shared_writes,
            transition,
            ..
        } = outcome;
        instance.disposals.extend(disposals);
        instance.drafts.extend(drafts);
        self.current = Some(instance);

        self.flush_effects(effects, shared_writes);

        let transitioned = transition.is_some();
        if let Some(transition) = transition {
            self.apply_transition(transition, false)?;
        }
        Ok(transitioned)
    }

    /// Classify and apply a recorded transition.
    fn apply_transition(
        &mut self,
        transition: Transition,
        resume_tick: bool,
    ) -> Result<(), EngineError> {
        let mut transition = transition;

        // Delayed swap: park with a countdown. Immediate disposal
        // empties "current" for the waiting duration; otherwise the
        // current instance keeps receiving ticks.
        if transition.wait > 0 {
            let remaining = transition.wait;
            transition.wait = 0;
            if transition.disposal == Disposal::Immediate {
                self.retire_current()?;
            }
            self.scheduled = Scheduled::Delayed {
                transition,
                remaining,
            };
            return Ok(());
        }

        // Pause-aware deferred swap. On the resume tick itself the
        // policy demotes to Delayed and applies now; otherwise the
        // outgoing instance's disposers are parked and the machine
        // freezes until a resume tick.
        if transition.disposal == Disposal::AfterResume {
            if resume_tick {
                transition.disposal = Disposal::Delayed;
            } else {
                let parked = self.current.as_mut().map(|instance| {
                    (
                        instance.name.clone(),
                        mem::take(&mut instance.disposals),
                        mem::take(&mut instance.drafts),
                    )
                });
                if let Some((name, disposals, drafts)) = parked {
                    self.deferred_disposals
                        .extend(disposals.into_iter().map(|d| (name.clone(), d)));
                    self.promote_drafts(&name, drafts);
                }
                self.scheduled = Scheduled::AfterResume { transition };
                return Ok(());
            }
        }

        // Soft refresh: same state, non-immediate disposal. The fresh
        // instance is constructed muted and its api/disposals replace
        // the old ones without any disposal callback running.
        let same_state = self
            .current
            .as_ref()
            .map(|i| i.name == transition.to)
            .unwrap_or(false);
        if same_state && transition.disposal != Disposal::Immediate {
            let fresh = self.construct(&transition.to, &transition.params, true)?;
            if let Some(instance) = self.current.as_mut() {
                instance.state = fresh.state;
                instance.disposals = fresh.disposals;
                instance.drafts.extend(fresh.drafts);
            }
            self.metrics.soft_refreshes += 1;
            return Ok(());
        }

        // Hard swap.
        self.retire_current()?;
        let instance = self.construct(&transition.to, &transition.params, false)?;
        self.current = Some(instance);
        self.metrics.transitions_applied += 1;
        Ok(())
    }

    /// Remove the current instance: promote its drafts and run its
    /// disposal callbacks.
    fn retire_current(&mut self) -> Result<(), EngineError> {
        if let Some(instance) = self.current.take() {
            let StateInstance {
                name,
                state: _,
                disposals,
                drafts,
            } = instance;
            self.promote_drafts(&name, drafts);
            self.run_disposals(&name, disposals.into_vec())?;
        }
        Ok(())
    }

    /// Promote drafts to durable checkpoints, tagged with the
    /// originating state and the current tick.
    fn promote_drafts(&mut self, origin: &str, drafts: Vec<CheckpointDraft>) {
        let tick = TickId(self.tick_number);
        for draft in drafts {
            self.checkpoints.record(Checkpoint {
                key: draft.key,
                transition: draft.transition,
                state: origin.to_string(),
                tick,
            });
        }
    }

    /// Run disposal callbacks to exhaustion, including any registered
    /// by the callbacks themselves.
    fn run_disposals(
        &mut self,
        state_name: &str,
        mut queue: Vec<DisposalFn>,
    ) -> Result<(), EngineError> {
        while !queue.is_empty() {
            for disposal in mem::take(&mut queue) {
                let outcome = {
                    let mut cx = StateContext::new(
                        ContextPhase::Dispose,
                        state_name,
                        false,
                        &self.config,
                        self.before.as_ref(),
                        &self.shared,
                        self.checkpoints.as_mut(),
                    );
                    disposal(&mut cx);
                    cx.finish(Ok(()))
                }?;
                let CtxOutcome {
                    effects,
                    disposals,
                    shared_writes,
                    ..
                } = outcome;
                queue.extend(disposals);
                self.flush_effects(effects, shared_writes);
            }
        }
        Ok(())
    }

    /// Construct a named state under a construction-phase context.
    ///
    /// Muted constructions (soft refresh) discard effects and shared
    /// writes; disposal registrations and drafts are kept either way.
    fn construct(
        &mut self,
        name: &str,
        params: &Params,
        muted: bool,
    ) -> Result<StateInstance, EngineError> {
        let ctor = self
            .registry
            .ctor(name)
            .ok_or_else(|| EngineError::UnknownState {
                name: name.to_string(),
            })?;
        let (built, outcome) = {
            let mut cx = StateContext::new(
                ContextPhase::Construct,
                name,
                muted,
                &self.config,
                self.before.as_ref(),
                &self.shared,
                self.checkpoints.as_mut(),
            );
            let built = ctor(&mut cx, params);
            (built, cx.finish(Ok(())))
        };
        let outcome = outcome?;
        let state = built.map_err(|source| EngineError::State {
            name: name.to_string(),
            source,
        })?;
        let CtxOutcome {
            effects,
            disposals,
            drafts,
            shared_writes,
            ..
        } = outcome;
        if !muted {
            self.flush_effects(effects, shared_writes);
        }
        Ok(StateInstance {
            name: name.to_string(),
            state,
            disposals,
            drafts,
        })
    }

    /// Execute queued effects against a fresh mutation buffer, flush
    /// the buffer to the adapter, and apply shared-state writes.
    fn flush_effects(
        &mut self,
        effects: SmallVec<[EffectFn; 8]>,
        shared_writes: Vec<(String, Params)>,
    ) -> FlushStats {
        let mut buffer = MutationBuffer::new();
        let mut stop = false;
        {
            let mut fx = EffectApi::new(&mut self.adapter, &mut buffer, &mut stop);
            for effect in effects {
                effect(&mut fx);
            }
        }
        let stats = buffer.flush(&mut self.adapter);
        if stop {
            self.stop_requested = true;
        }
        for (key, value) in shared_writes {
            self.shared.insert(key, value);
        }
        stats
    }
}

impl<W: WorldAdapter> fmt::Debug for Engine<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("tick", &self.tick_number)
            .field("running", &self.running)
            .field("state", &self.current_state_name())
            .field("paused", &self.paused)
            .finish()
    }
}
