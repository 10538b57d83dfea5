//! Per-tick coalescing write queue.
//!
//! [`MutationBuffer`] accumulates pending writes keyed by entity
//! identity with last-write-wins semantics per field, elides writes
//! that would not change the adapter's current value, and applies the
//! rest exactly once per flush, in submission order.

use indexmap::IndexMap;

use gridiron_core::adapter::{DiscPatch, WorldAdapter};
use gridiron_core::id::{PlayerId, Team};

/// Identity of a patchable disc entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKey {
    /// The game ball.
    Ball,
    /// A player's body disc.
    Player(PlayerId),
}

/// Write/elision counters from one flush.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// Adapter writes performed.
    pub writes: u32,
    /// Queued patches skipped because the adapter already held the
    /// patched values.
    pub elided: u32,
}

/// Coalescing write queue applied to the world adapter once per flush.
///
/// Created fresh for each tick or event, discarded after flush.
#[derive(Default)]
pub struct MutationBuffer {
    discs: IndexMap<EntityKey, DiscPatch>,
    avatars: IndexMap<PlayerId, Option<String>>,
    teams: IndexMap<PlayerId, Option<Team>>,
    admins: IndexMap<PlayerId, bool>,
}

impl MutationBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.discs.is_empty()
            && self.avatars.is_empty()
            && self.teams.is_empty()
            && self.admins.is_empty()
    }

    /// Queue a partial physics write, merging into any patch already
    /// queued for the same entity (new fields overwrite old).
    pub fn queue_disc(&mut self, key: EntityKey, patch: DiscPatch) {
        if patch.is_empty() {
            return;
        }
        self.discs
            .entry(key)
            .and_modify(|existing| existing.merge(&patch))
            .or_insert(patch);
    }

    /// Queue an avatar change. Last write wins.
    pub fn queue_avatar(&mut self, id: PlayerId, avatar: Option<String>) {
        self.avatars.insert(id, avatar);
    }

    /// Queue a team change. Last write wins.
    pub fn queue_team(&mut self, id: PlayerId, team: Option<Team>) {
        self.teams.insert(id, team);
    }

    /// Queue an admin flag change. Last write wins.
    pub fn queue_admin(&mut self, id: PlayerId, admin: bool) {
        self.admins.insert(id, admin);
    }

    /// Apply every non-empty, non-no-op queued write to the adapter
    /// exactly once, in submission order, then clear all queues.
    ///
    /// A patch is a no-op if the adapter's current value already equals
    /// every field in it; such patches are skipped entirely so adapter
    /// state is never perturbed by writes that change nothing.
    pub fn flush(&mut self, adapter: &mut dyn WorldAdapter) -> FlushStats {
        let mut stats = FlushStats::default();

        for (key, patch) in self.discs.drain(..) {
            let current = match key {
                EntityKey::Ball => adapter.ball(),
                EntityKey::Player(id) => adapter.player_disc(id),
            };
            if let Some(current) = current {
                if patch.is_noop_against(&current) {
                    stats.elided += 1;
                    continue;
                }
            }
            match key {
                EntityKey::Ball => adapter.set_ball(&patch),
                EntityKey::Player(id) => adapter.set_player_disc(id, &patch),
            }
            stats.writes += 1;
        }

        for (id, avatar) in self.avatars.drain(..) {
            if let Some(facts) = adapter.player(id) {
                if facts.avatar == avatar {
                    stats.elided += 1;
                    continue;
                }
            }
            adapter.set_avatar(id, avatar.as_deref());
            stats.writes += 1;
        }

        for (id, team) in self.teams.drain(..) {
            if let Some(facts) = adapter.player(id) {
                if facts.team == team {
                    stats.elided += 1;
                    continue;
                }
            }
            adapter.set_team(id, team);
            stats.writes += 1;
        }

        for (id, admin) in self.admins.drain(..) {
            if let Some(facts) = adapter.player(id) {
                if facts.admin == admin {
                    stats.elided += 1;
                    continue;
                }
            }
            adapter.set_admin(id, admin);
            stats.writes += 1;
        }

        stats
    }

    /// Discard everything queued without applying it.
    pub fn clear(&mut self) {
        self.discs.clear();
        self.avatars.clear();
        self.teams.clear();
        self.admins.clear();
    }
}
