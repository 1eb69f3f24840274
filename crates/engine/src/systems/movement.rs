use tracing::debug;

use crate::attribute::names;
use crate::entity::{EntityRef, EntityState};
use crate::geometry::{Direction, GridPos, Layer};
use crate::grid::GridState;
use crate::EngineError;

use super::TurnSystemContext;

/// Result of one applied chain shift.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainOutcome {
    pub destroyed: Option<EntityRef>,
    pub reached_win: bool,
}

/// Decides and applies chain pushes along one direction on one layer.
///
/// Every decision reads `frozen`; only [`ChainResolver::move_chain`] writes,
/// and it writes into the caller's next snapshot.
pub struct ChainResolver<'a> {
    frozen: &'a GridState,
    layer: Layer,
    direction: Direction,
    max_depth: usize,
}

impl<'a> ChainResolver<'a> {
    pub fn new(frozen: &'a GridState, layer: Layer, direction: Direction) -> Self {
        // An acyclic chain visits each entity on the layer at most once.
        let max_depth = frozen.layer_len(layer) + 1;
        Self {
            frozen,
            layer,
            direction,
            max_depth,
        }
    }

    /// Whether the entity at `position` can take part in a move.
    /// `pushed_by` is the entity directly behind it, `None` for the mover
    /// that starts the chain.
    pub fn can_move(
        &self,
        position: GridPos,
        pushed_by: Option<&EntityState>,
    ) -> Result<bool, EngineError> {
        self.can_move_at_depth(position, pushed_by, 0)
    }

    fn can_move_at_depth(
        &self,
        position: GridPos,
        pushed_by: Option<&EntityState>,
        depth: usize,
    ) -> Result<bool, EngineError> {
        if depth > self.max_depth {
            return Ok(false);
        }
        let Some(state) = self.frozen.get(position, self.layer) else {
            return Ok(true);
        };
        if pushed_by.is_some() && state.has_attribute(names::BREAKABLE) {
            return Ok(true);
        }
        if pushed_by.is_some_and(EntityState::is_player) && state.has_attribute(names::WIN) {
            return Ok(true);
        }
        self.can_advance(state, pushed_by, depth)
    }

    /// The movability check without the Breakable and Win shortcuts.
    fn can_advance(
        &self,
        state: &EntityState,
        pushed_by: Option<&EntityState>,
        depth: usize,
    ) -> Result<bool, EngineError> {
        let pushed = pushed_by.is_some();
        if (!pushed && state.moves_by_itself()) || (pushed && state.is_pushable()) {
            let Some(target) = state.position().step(self.direction) else {
                return Ok(false);
            };
            return self.can_enter(target, state, depth);
        }
        if let Some(entering) = pushed_by.filter(|_| state.is_portal()) {
            let Some(exit) = self.paired_portal(state)?.step(self.direction) else {
                return Ok(false);
            };
            return self.can_enter(exit, entering, depth);
        }
        Ok(false)
    }

    fn can_enter(
        &self,
        target: GridPos,
        mover: &EntityState,
        depth: usize,
    ) -> Result<bool, EngineError> {
        if !self.frozen.has_entity_at(target, self.layer) {
            return Ok(true);
        }
        self.can_move_at_depth(target, Some(mover), depth + 1)
    }

    /// Position of the opposite portal on the same layer.
    pub fn paired_portal(&self, portal: &EntityState) -> Result<GridPos, EngineError> {
        let wanted = if portal.has_attribute(names::PORTAL_A) {
            names::PORTAL_B
        } else {
            names::PORTAL_A
        };
        self.frozen
            .find_by_attribute(wanted)
            .find(|candidate| {
                candidate.layer() == self.layer && candidate.entity() != portal.entity()
            })
            .map(EntityState::position)
            .ok_or(EngineError::UnpairedPortal {
                position: portal.position(),
                layer: self.layer,
            })
    }

    /// Shifts the chain starting at `start` one step, writing into `next`.
    /// Call only after [`ChainResolver::can_move`] succeeded for `start`.
    ///
    /// # Panics
    /// When `start` is empty, the chain cycles through portals, or it runs
    /// off the edge of the plane.
    pub fn move_chain(
        &self,
        next: &mut GridState,
        start: GridPos,
    ) -> Result<ChainOutcome, EngineError> {
        assert!(
            next.has_entity_at(start, self.layer),
            "move requested at {start} on layer {} with no entity",
            self.layer
        );
        let mut outcome = ChainOutcome::default();
        let mut cursor = start;
        let mut trailing: Option<EntityState> = None;
        let mut steps = 0usize;

        while let Some(current) = next.get(cursor, self.layer).cloned() {
            assert!(
                steps <= self.max_depth,
                "chain from {start} on layer {} never ends",
                self.layer
            );
            steps += 1;

            let Some(entering) = trailing.take() else {
                next.set(cursor, self.layer, None);
                cursor = self.advance(cursor);
                trailing = Some(current.with_position(cursor));
                continue;
            };

            if current.has_attribute(names::BREAKABLE)
                && !(current.is_pushable() && self.can_advance(&current, Some(&entering), 0)?)
            {
                debug!(
                    entity = %current.entity(),
                    position = %cursor,
                    by = %entering.entity(),
                    "entity_broken"
                );
                next.set(cursor, self.layer, Some(entering));
                outcome.destroyed = Some(current.entity());
                return Ok(outcome);
            }

            if current.has_attribute(names::WIN) && entering.is_player() {
                debug!(entity = %current.entity(), position = %cursor, "win_reached");
                next.set(cursor, self.layer, Some(entering));
                outcome.reached_win = true;
                return Ok(outcome);
            }

            if current.is_pushable() || !current.is_portal() {
                next.set(cursor, self.layer, Some(entering));
                cursor = self.advance(cursor);
                trailing = Some(current.with_position(cursor));
            } else {
                let exit = self.advance(self.paired_portal(&current)?);
                debug!(
                    entity = %entering.entity(),
                    portal = %current.position(),
                    exit = %exit,
                    "entity_teleported"
                );
                cursor = exit;
                trailing = Some(entering.with_position(exit));
            }
        }

        if let Some(last) = trailing {
            next.set(cursor, self.layer, Some(last));
        }
        Ok(outcome)
    }

    /// Next cell along the chain. `can_move` already rejected chains that
    /// leave the plane.
    fn advance(&self, from: GridPos) -> GridPos {
        match from.step(self.direction) {
            Some(next) => next,
            None => panic!("chain stepped off the plane at {from} going {}", self.direction),
        }
    }
}

pub(crate) fn run_movement_system(context: &mut TurnSystemContext<'_>) -> Result<(), EngineError> {
    if let Some(direction) = context.player_direction {
        let player = context.frozen.player_state()?.with_velocity(Some(direction));
        context.next.replace(player.clone());
        let moved = resolve_mover(context, &player, direction)?;
        context.outcome.player_moved = moved;
        context.outcome.player_blocked = !moved;
        debug!(
            entity = %player.entity(),
            direction = %direction,
            moved,
            "player_move_resolved"
        );
    }

    for attribute in [names::MOVING_HORIZONTALLY, names::MOVING_VERTICALLY] {
        let movers = context
            .next
            .find_by_attribute(attribute)
            .filter(|state| !state.is_player())
            .map(EntityState::entity)
            .collect::<Vec<_>>();
        for entity in movers {
            // Earlier chains may have pushed or broken this entity.
            let Some(mover) = context.next.find_entity(entity).cloned() else {
                continue;
            };
            let Some(direction) = mover.velocity() else {
                continue;
            };
            if !resolve_mover(context, &mover, direction)? {
                context
                    .next
                    .replace(mover.with_velocity(Some(direction.opposite())));
                context.outcome.bounced.push(entity);
                debug!(entity = %entity, direction = %direction, "self_mover_bounced");
            }
        }
    }
    Ok(())
}

fn resolve_mover(
    context: &mut TurnSystemContext<'_>,
    mover: &EntityState,
    direction: Direction,
) -> Result<bool, EngineError> {
    let frozen = context.next.clone();
    let resolver = ChainResolver::new(&frozen, mover.layer(), direction);
    if !resolver.can_move(mover.position(), None)? {
        return Ok(false);
    }
    let chain = resolver.move_chain(context.next, mover.position())?;
    if let Some(destroyed) = chain.destroyed {
        context.outcome.destroyed.push(destroyed);
    }
    if chain.reached_win {
        context.outcome.level_complete = true;
    }
    Ok(true)
}
