//! The immutable per-tick world snapshot.
//!
//! A [`GameState`] is built once per tick (and once per non-tick event)
//! from the world adapter's current facts and is never mutated after
//! construction. States read it; all writes go through the mutation
//! buffer instead.

use crate::id::{PlayerId, Team, TickId};

/// One player's view within a snapshot.
///
/// Only players on a side appear here; spectators are excluded at
/// snapshot build time.
#[derive(Clone, Debug, PartialEq)]
pub struct GameStatePlayer {
    /// Host-assigned player identity.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// The side this player is on.
    pub team: Team,
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
    /// Body disc radius.
    pub radius: f64,
    /// True only if this player's kick was registered since the previous
    /// tick. The registration set is drained exactly once per tick.
    pub is_kicking_ball: bool,
}

/// The ball's view within a snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GameStateBall {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
    /// Horizontal velocity.
    pub x_speed: f64,
    /// Vertical velocity.
    pub y_speed: f64,
    /// Disc radius.
    pub radius: f64,
}

/// Immutable snapshot of world state for one tick or event.
#[derive(Clone, Debug, PartialEq)]
pub struct GameState {
    /// Players on a side, in the adapter's reporting order.
    pub players: Vec<GameStatePlayer>,
    /// The ball.
    pub ball: GameStateBall,
    /// The tick this snapshot was built for. Strictly increases by
    /// exactly 1 per processed tick.
    pub tick: TickId,
}

impl GameState {
    /// Look up a player by id.
    pub fn player(&self, id: PlayerId) -> Option<&GameStatePlayer> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Players on the given side, in snapshot order.
    pub fn side(&self, team: Team) -> impl Iterator<Item = &GameStatePlayer> {
        self.players.iter().filter(move |p| p.team == team)
    }

    /// Players whose kick was registered since the previous tick.
    pub fn kicking(&self) -> impl Iterator<Item = &GameStatePlayer> {
        self.players.iter().filter(|p| p.is_kicking_ball)
    }
}
