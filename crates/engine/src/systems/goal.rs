use tracing::debug;

use crate::attribute::names;
use crate::EngineError;

use super::TurnSystemContext;

/// A player sharing a cell with a Win entity on another layer completes the
/// level. Collisions on the player's own layer are handled by movement.
pub(crate) fn run_win_check_system(context: &mut TurnSystemContext<'_>) -> Result<(), EngineError> {
    if context.outcome.level_complete {
        return Ok(());
    }
    let frozen = context.frozen;
    let Ok(player) = frozen.player_state() else {
        return Ok(());
    };
    let on_goal = frozen
        .states_at(player.position())
        .any(|state| state.layer() != player.layer() && state.has_attribute(names::WIN));
    if on_goal {
        debug!(entity = %player.entity(), position = %player.position(), "win_reached");
        context.outcome.level_complete = true;
    }
    Ok(())
}
