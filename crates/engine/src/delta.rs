use std::collections::BTreeMap;

use serde::Serialize;

use crate::entity::{EntityRef, EntityState};
use crate::geometry::{Direction, GridPos, Layer};
use crate::grid::GridState;

/// One presentation-relevant change between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityDelta {
    Moved {
        entity: EntityRef,
        from: GridPos,
        to: GridPos,
        layer: Layer,
    },
    Appeared {
        entity: EntityRef,
        at: GridPos,
        layer: Layer,
    },
    Disappeared {
        entity: EntityRef,
        at: GridPos,
        layer: Layer,
    },
    AttributesChanged {
        entity: EntityRef,
        added: Vec<String>,
        removed: Vec<String>,
    },
    VelocityChanged {
        entity: EntityRef,
        from: Option<Direction>,
        to: Option<Direction>,
    },
}

impl EntityDelta {
    pub fn entity(&self) -> EntityRef {
        match self {
            Self::Moved { entity, .. }
            | Self::Appeared { entity, .. }
            | Self::Disappeared { entity, .. }
            | Self::AttributesChanged { entity, .. }
            | Self::VelocityChanged { entity, .. } => *entity,
        }
    }
}

/// Per-entity changes from `previous` to `next`, ordered by entity and,
/// within one entity, as moved, attributes, velocity.
pub fn diff_snapshots(previous: &GridState, next: &GridState) -> Vec<EntityDelta> {
    let before = by_entity(previous);
    let after = by_entity(next);
    let mut entities = before.keys().chain(after.keys()).copied().collect::<Vec<_>>();
    entities.sort_unstable();
    entities.dedup();

    let mut deltas = Vec::new();
    for entity in entities {
        match (before.get(&entity), after.get(&entity)) {
            (Some(old), None) => deltas.push(EntityDelta::Disappeared {
                entity,
                at: old.position(),
                layer: old.layer(),
            }),
            (None, Some(new)) => deltas.push(EntityDelta::Appeared {
                entity,
                at: new.position(),
                layer: new.layer(),
            }),
            (Some(old), Some(new)) => changes_between(old, new, &mut deltas),
            (None, None) => {}
        }
    }
    deltas
}

fn by_entity(grid: &GridState) -> BTreeMap<EntityRef, &EntityState> {
    grid.iter().map(|state| (state.entity(), state)).collect()
}

fn changes_between(old: &EntityState, new: &EntityState, deltas: &mut Vec<EntityDelta>) {
    let entity = new.entity();
    if old.position() != new.position() || old.layer() != new.layer() {
        deltas.push(EntityDelta::Moved {
            entity,
            from: old.position(),
            to: new.position(),
            layer: new.layer(),
        });
    }

    let added = new
        .attributes()
        .iter()
        .filter(|attribute| !old.attributes().contains(attribute))
        .map(|attribute| attribute.name().to_string())
        .collect::<Vec<_>>();
    let removed = old
        .attributes()
        .iter()
        .filter(|attribute| !new.attributes().contains(attribute))
        .map(|attribute| attribute.name().to_string())
        .collect::<Vec<_>>();
    if !added.is_empty() || !removed.is_empty() {
        deltas.push(EntityDelta::AttributesChanged {
            entity,
            added,
            removed,
        });
    }

    if old.velocity() != new.velocity() {
        deltas.push(EntityDelta::VelocityChanged {
            entity,
            from: old.velocity(),
            to: new.velocity(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{names, Attribute};

    fn state(id: u64, x: i32, attributes: &[&str]) -> EntityState {
        EntityState::new(
            EntityRef(id),
            GridPos::new(x, 0),
            Layer::Objects,
            None,
            attributes.iter().map(|name| Attribute::new(*name)),
        )
    }

    #[test]
    fn identical_snapshots_have_no_deltas() {
        let grid = GridState::from_entities(vec![state(0, 0, &[names::PLAYER])]).expect("grid");
        assert!(diff_snapshots(&grid, &grid.clone()).is_empty());
    }

    #[test]
    fn reports_moves_removals_and_ignitions_in_entity_order() {
        let previous = GridState::from_entities(vec![
            state(0, 0, &[names::PLAYER]),
            state(1, 3, &[names::BURNING]),
            state(2, 4, &[names::FLAMMABLE]),
        ])
        .expect("grid");
        let mut next = previous.clone();
        let player = previous.player_state().expect("player");
        next.set(player.position(), player.layer(), None);
        next.insert(
            player
                .with_position(GridPos::new(1, 0))
                .with_velocity(Some(Direction::Right)),
        );
        next.remove(GridPos::new(3, 0), Layer::Objects);
        let log = next.get(GridPos::new(4, 0), Layer::Objects).expect("log");
        next.replace(log.with_attribute(&Attribute::new(names::BURNING)).expect("ignite"));

        let deltas = diff_snapshots(&previous, &next);
        assert_eq!(
            deltas,
            vec![
                EntityDelta::Moved {
                    entity: EntityRef(0),
                    from: GridPos::new(0, 0),
                    to: GridPos::new(1, 0),
                    layer: Layer::Objects,
                },
                EntityDelta::VelocityChanged {
                    entity: EntityRef(0),
                    from: None,
                    to: Some(Direction::Right),
                },
                EntityDelta::Disappeared {
                    entity: EntityRef(1),
                    at: GridPos::new(3, 0),
                    layer: Layer::Objects,
                },
                EntityDelta::AttributesChanged {
                    entity: EntityRef(2),
                    added: vec![names::BURNING.to_string()],
                    removed: Vec::new(),
                },
            ]
        );
    }

    #[test]
    fn deltas_serialize_with_kind_tag() {
        let delta = EntityDelta::VelocityChanged {
            entity: EntityRef(3),
            from: Some(Direction::Left),
            to: Some(Direction::Right),
        };
        let value = serde_json::to_value(&delta).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({
                "kind": "velocity_changed",
                "entity": 3,
                "from": "left",
                "to": "right"
            })
        );
    }

    #[test]
    fn reversed_diff_reports_appearance() {
        let previous = GridState::from_entities(vec![state(0, 0, &[names::PLAYER])]).expect("grid");
        let next =
            GridState::from_entities(vec![state(0, 0, &[names::PLAYER]), state(7, 2, &[])])
                .expect("grid");
        let deltas = diff_snapshots(&previous, &next);
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].entity(), EntityRef(7));
        assert!(matches!(deltas[0], EntityDelta::Appeared { .. }));
    }
}
