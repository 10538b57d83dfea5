//! Test utilities and mock types for Gridiron development.
//!
//! Provides [`MockWorld`], a recording in-memory [`WorldAdapter`], and
//! [`Probe`], a shared event log for observing state lifecycle
//! (construction, runs, disposal) from engine tests.
//!
//! Everything here is expressed against `gridiron-core` only, so the
//! runtime crates can take this one as a dev-dependency without pulling
//! a second copy of themselves into their test builds.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use gridiron_core::adapter::{DiscFacts, DiscPatch, PlayerFacts, WorldAdapter};
use gridiron_core::id::{PlayerId, Team};

fn apply_patch(facts: &mut DiscFacts, patch: &DiscPatch) {
    if let Some(v) = patch.x {
        facts.x = v;
    }
    if let Some(v) = patch.y {
        facts.y = v;
    }
    if let Some(v) = patch.x_speed {
        facts.x_speed = v;
    }
    if let Some(v) = patch.y_speed {
        facts.y_speed = v;
    }
    if let Some(v) = patch.radius {
        facts.radius = v;
    }
    if let Some(v) = patch.inv_mass {
        facts.inv_mass = v;
    }
    if let Some(v) = patch.damping {
        facts.damping = v;
    }
}

/// In-memory world adapter that applies writes to stored facts and
/// records every operation for assertions.
///
/// Applying writes (not just logging them) keeps write elision honest:
/// a second identical patch against a `MockWorld` is elided exactly as
/// it would be against a real room.
#[derive(Default)]
pub struct MockWorld {
    pub players: Vec<PlayerFacts>,
    pub ball: DiscFacts,
    pub player_discs: IndexMap<PlayerId, DiscFacts>,

    pub ball_writes: Vec<DiscPatch>,
    pub player_disc_writes: Vec<(PlayerId, DiscPatch)>,
    pub avatar_writes: Vec<(PlayerId, Option<String>)>,
    pub team_writes: Vec<(PlayerId, Option<Team>)>,
    pub admin_writes: Vec<(PlayerId, bool)>,
    pub chat_log: Vec<(String, Option<PlayerId>)>,
    pub announcement_log: Vec<(String, Option<PlayerId>)>,
    pub stop_calls: u32,
    pub pause_calls: Vec<bool>,
}

impl MockWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a player with a default body disc at the origin.
    pub fn add_player(&mut self, id: u32, name: &str, team: Option<Team>) {
        self.players.push(PlayerFacts {
            id: PlayerId(id),
            name: name.to_string(),
            team,
            x: 0.0,
            y: 0.0,
            radius: 15.0,
            admin: false,
            avatar: None,
        });
        self.player_discs.insert(
            PlayerId(id),
            DiscFacts {
                radius: 15.0,
                ..DiscFacts::default()
            },
        );
    }

    pub fn remove_player(&mut self, id: u32) {
        self.players.retain(|p| p.id != PlayerId(id));
        self.player_discs.shift_remove(&PlayerId(id));
    }

    fn facts_mut(&mut self, id: PlayerId) -> Option<&mut PlayerFacts> {
        self.players.iter_mut().find(|p| p.id == id)
    }
}

impl WorldAdapter for MockWorld {
    fn players(&self) -> Vec<PlayerFacts> {
        self.players.clone()
    }

    fn ball(&self) -> Option<DiscFacts> {
        Some(self.ball)
    }

    fn player_disc(&self, id: PlayerId) -> Option<DiscFacts> {
        self.player_discs.get(&id).copied()
    }

    fn set_ball(&mut self, patch: &DiscPatch) {
        apply_patch(&mut self.ball, patch);
        self.ball_writes.push(*patch);
    }

    fn set_player_disc(&mut self, id: PlayerId, patch: &DiscPatch) {
        if let Some(facts) = self.player_discs.get_mut(&id) {
            apply_patch(facts, patch);
        }
        self.player_disc_writes.push((id, *patch));
    }

    fn set_avatar(&mut self, id: PlayerId, avatar: Option<&str>) {
        let owned = avatar.map(String::from);
        if let Some(facts) = self.facts_mut(id) {
            facts.avatar = owned.clone();
        }
        self.avatar_writes.push((id, owned));
    }

    fn set_team(&mut self, id: PlayerId, team: Option<Team>) {
        if let Some(facts) = self.facts_mut(id) {
            facts.team = team;
        }
        self.team_writes.push((id, team));
    }

    fn set_admin(&mut self, id: PlayerId, admin: bool) {
        if let Some(facts) = self.facts_mut(id) {
            facts.admin = admin;
        }
        self.admin_writes.push((id, admin));
    }

    fn send_chat(&mut self, message: &str, to: Option<PlayerId>) {
        self.chat_log.push((message.to_string(), to));
    }

    fn send_announcement(&mut self, message: &str, to: Option<PlayerId>) {
        self.announcement_log.push((message.to_string(), to));
    }

    fn stop_game(&mut self) {
        self.stop_calls += 1;
    }

    fn pause_game(&mut self, paused: bool) {
        self.pause_calls.push(paused);
    }
}

/// One observed lifecycle event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeEvent {
    Constructed { state: String },
    Run { state: String, tick: u64 },
    Disposed { state: String },
}

/// Shared, clonable event log fed by probe states in engine tests.
#[derive(Clone, Default)]
pub struct Probe(Rc<RefCell<Vec<ProbeEvent>>>);

impl Probe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: ProbeEvent) {
        self.0.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<ProbeEvent> {
        self.0.borrow().clone()
    }

    /// Number of `Run` events recorded for `state`.
    pub fn runs(&self, state: &str) -> usize {
        self.0
            .borrow()
            .iter()
            .filter(|e| matches!(e, ProbeEvent::Run { state: s, .. } if s == state))
            .count()
    }

    /// Number of `Disposed` events recorded for `state`.
    pub fn disposals(&self, state: &str) -> usize {
        self.0
            .borrow()
            .iter()
            .filter(|e| matches!(e, ProbeEvent::Disposed { state: s } if s == state))
            .count()
    }

    /// Number of `Constructed` events recorded for `state`.
    pub fn constructions(&self, state: &str) -> usize {
        self.0
            .borrow()
            .iter()
            .filter(|e| matches!(e, ProbeEvent::Constructed { state: s } if s == state))
            .count()
    }
}
