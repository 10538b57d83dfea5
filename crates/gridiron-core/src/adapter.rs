//! The world adapter boundary.
//!
//! The engine consumes a [`WorldAdapter`] supplied by the host process.
//! Reads must be point-in-time consistent for the duration of one
//! snapshot build; writes are assumed idempotent when given identical
//! arguments consecutively, which is what makes write elision safe.

use crate::id::{PlayerId, Team};

/// Point-in-time facts about one player, as reported by the host.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerFacts {
    /// Host-assigned identity.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// `None` for spectators. Spectators never appear in snapshots.
    pub team: Option<Team>,
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
    /// Body disc radius.
    pub radius: f64,
    /// Whether the player holds the room's admin flag.
    pub admin: bool,
    /// Current avatar override, if any.
    pub avatar: Option<String>,
}

/// Point-in-time physics facts about a disc (the ball or a player body).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DiscFacts {
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
    /// Inverse mass (0 = immovable).
    pub inv_mass: f64,
    /// Velocity damping factor.
    pub damping: f64,
}

/// Partial write to a disc's physics properties.
///
/// `None` fields are left untouched. Patches merge field-wise with
/// last-write-wins semantics in the mutation buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DiscPatch {
    /// New horizontal position.
    pub x: Option<f64>,
    /// New vertical position.
    pub y: Option<f64>,
    /// New horizontal velocity.
    pub x_speed: Option<f64>,
    /// New vertical velocity.
    pub y_speed: Option<f64>,
    /// New disc radius.
    pub radius: Option<f64>,
    /// New inverse mass.
    pub inv_mass: Option<f64>,
    /// New damping factor.
    pub damping: Option<f64>,
}

impl DiscPatch {
    /// True if no field is set.
    pub fn is_empty(&self) -> bool {
        self.x.is_none()
            && self.y.is_none()
            && self.x_speed.is_none()
            && self.y_speed.is_none()
            && self.radius.is_none()
            && self.inv_mass.is_none()
            && self.damping.is_none()
    }

    /// Merge `newer` into `self`, newer fields overwriting older ones.
    pub fn merge(&mut self, newer: &DiscPatch) {
        if newer.x.is_some() {
            self.x = newer.x;
        }
        if newer.y.is_some() {
            self.y = newer.y;
        }
        if newer.x_speed.is_some() {
            self.x_speed = newer.x_speed;
        }
        if newer.y_speed.is_some() {
            self.y_speed = newer.y_speed;
        }
        if newer.radius.is_some() {
            self.radius = newer.radius;
        }
        if newer.inv_mass.is_some() {
            self.inv_mass = newer.inv_mass;
        }
        if newer.damping.is_some() {
            self.damping = newer.damping;
        }
    }

    /// True if every set field already equals the adapter's current
    /// value, making the whole patch skippable.
    pub fn is_noop_against(&self, current: &DiscFacts) -> bool {
        fn same(field: Option<f64>, current: f64) -> bool {
            field.map(|v| v == current).unwrap_or(true)
        }
        same(self.x, current.x)
            && same(self.y, current.y)
            && same(self.x_speed, current.x_speed)
            && same(self.y_speed, current.y_speed)
            && same(self.radius, current.radius)
            && same(self.inv_mass, current.inv_mass)
            && same(self.damping, current.damping)
    }
}

/// Read/write surface of the world room.
///
/// The engine never writes directly from state callbacks: all writes go
/// through the mutation buffer and are applied once per flush. Chat and
/// game-control operations pass straight through during effect execution.
pub trait WorldAdapter {
    /// All connected players, including spectators.
    fn players(&self) -> Vec<PlayerFacts>;

    /// Current ball physics, or `None` when no game disc exists.
    fn ball(&self) -> Option<DiscFacts>;

    /// Current physics of a player's body disc.
    fn player_disc(&self, id: PlayerId) -> Option<DiscFacts>;

    /// Facts for one player.
    fn player(&self, id: PlayerId) -> Option<PlayerFacts> {
        self.players().into_iter().find(|p| p.id == id)
    }

    /// Apply a partial physics write to the ball.
    fn set_ball(&mut self, patch: &DiscPatch);

    /// Apply a partial physics write to a player's body disc.
    fn set_player_disc(&mut self, id: PlayerId, patch: &DiscPatch);

    /// Set or clear a player's avatar override.
    fn set_avatar(&mut self, id: PlayerId, avatar: Option<&str>);

    /// Move a player onto a side, or to the spectators with `None`.
    fn set_team(&mut self, id: PlayerId, team: Option<Team>);

    /// Grant or revoke the room admin flag.
    fn set_admin(&mut self, id: PlayerId, admin: bool);

    /// Send a chat message, to one player or to everyone.
    fn send_chat(&mut self, message: &str, to: Option<PlayerId>);

    /// Send a styled announcement, to one player or to everyone.
    fn send_announcement(&mut self, message: &str, to: Option<PlayerId>);

    /// Ask the host to stop the running game.
    fn stop_game(&mut self);

    /// Ask the host to pause or unpause the running game.
    fn pause_game(&mut self, paused: bool);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_patch_is_empty() {
        assert!(DiscPatch::default().is_empty());
        let p = DiscPatch {
            x: Some(1.0),
            ..DiscPatch::default()
        };
        assert!(!p.is_empty());
    }

    #[test]
    fn merge_newer_fields_win() {
        let mut older = DiscPatch {
            x: Some(1.0),
            y: Some(2.0),
            ..DiscPatch::default()
        };
        let newer = DiscPatch {
            x: Some(9.0),
            radius: Some(5.0),
            ..DiscPatch::default()
        };
        older.merge(&newer);
        assert_eq!(older.x, Some(9.0));
        assert_eq!(older.y, Some(2.0));
        assert_eq!(older.radius, Some(5.0));
    }

    #[test]
    fn noop_detection_ignores_unset_fields() {
        let current = DiscFacts {
            x: 3.0,
            y: 4.0,
            ..DiscFacts::default()
        };
        let noop = DiscPatch {
            x: Some(3.0),
            ..DiscPatch::default()
        };
        assert!(noop.is_noop_against(&current));

        let real = DiscPatch {
            x: Some(3.0),
            y: Some(0.5),
            ..DiscPatch::default()
        };
        assert!(!real.is_noop_against(&current));
    }
}
