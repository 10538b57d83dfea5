//! Builds the immutable per-tick [`GameState`] from adapter facts.

use indexmap::IndexSet;

use gridiron_core::adapter::WorldAdapter;
use gridiron_core::id::{PlayerId, TickId};
use gridiron_core::snapshot::{GameState, GameStateBall, GameStatePlayer};

/// Build a snapshot of the adapter's current facts.
///
/// Pure function of adapter state plus the one-shot kick registration
/// set: spectators are excluded, and `is_kicking_ball` is set only for
/// players present in `kicked`. The caller decides whether `kicked` is
/// drained (ticks) or merely observed (non-tick events).
pub fn build_game_state(
    adapter: &dyn WorldAdapter,
    tick: TickId,
    kicked: &IndexSet<PlayerId>,
) -> GameState {
    let players = adapter
        .players()
        .into_iter()
        .filter_map(|facts| {
            let team = facts.team?;
            Some(GameStatePlayer {
                id: facts.id,
                name: facts.name,
                team,
                x: facts.x,
                y: facts.y,
                radius: facts.radius,
                is_kicking_ball: kicked.contains(&facts.id),
            })
        })
        .collect();

    let ball = adapter
        .ball()
        .map(|facts| GameStateBall {
            x: facts.x,
            y: facts.y,
            x_speed: facts.x_speed,
            y_speed: facts.y_speed,
            radius: facts.radius,
        })
        .unwrap_or_default();

    GameState {
        players,
        ball,
        tick,
    }
}
