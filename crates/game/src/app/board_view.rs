use std::fmt::Write as _;

use engine::{
    names, Direction, EntityDelta, EntityRef, EntityState, GridPos, GridState, Layer, TradeSession,
    TurnReport,
};

/// Plain-text stand-in for the renderer. Rows run from the highest `y`
/// down so "up" points up on screen.
pub(crate) fn render_board(grid: &GridState) -> String {
    let Some((min_x, max_x, min_y, max_y)) = bounds(grid) else {
        return "(empty)\n".to_string();
    };
    let mut out = String::new();
    for y in (min_y..=max_y).rev() {
        for x in min_x..=max_x {
            let top = grid.states_at(GridPos::new(x, y)).last();
            out.push(top.map_or('.', glyph));
        }
        out.push('\n');
    }
    out
}

fn bounds(grid: &GridState) -> Option<(i32, i32, i32, i32)> {
    grid.iter().fold(None, |acc, state| {
        let pos = state.position();
        Some(match acc {
            None => (pos.x, pos.x, pos.y, pos.y),
            Some((min_x, max_x, min_y, max_y)) => (
                min_x.min(pos.x),
                max_x.max(pos.x),
                min_y.min(pos.y),
                max_y.max(pos.y),
            ),
        })
    })
}

fn glyph(state: &EntityState) -> char {
    let has = |name| state.has_attribute(name);
    if has(names::PLAYER) {
        '@'
    } else if has(names::BURNING) {
        '*'
    } else if has(names::WIN) {
        'W'
    } else if has(names::PORTAL_A) {
        'A'
    } else if has(names::PORTAL_B) {
        'B'
    } else if has(names::MOVING_HORIZONTALLY) || has(names::MOVING_VERTICALLY) {
        match state.velocity() {
            Some(Direction::Up) => '^',
            Some(Direction::Down) => 'v',
            Some(Direction::Left) => '<',
            Some(Direction::Right) => '>',
            None => 'm',
        }
    } else if has(names::BREAKABLE) {
        '%'
    } else if has(names::PUSHABLE) || has(names::MOVABLE) {
        'o'
    } else if has(names::FLAMMABLE) {
        '"'
    } else if state.layer() == Layer::Objects {
        '#'
    } else {
        ','
    }
}

pub(crate) fn entity_label(entity: EntityRef, entity_names: &[String]) -> String {
    let name = usize::try_from(entity.0)
        .ok()
        .and_then(|index| entity_names.get(index))
        .map_or("?", String::as_str);
    format!("{name}{entity}")
}

pub(crate) fn describe_delta(delta: &EntityDelta, entity_names: &[String]) -> String {
    let label = entity_label(delta.entity(), entity_names);
    match delta {
        EntityDelta::Moved { from, to, .. } => format!("{label} moved {from} -> {to}"),
        EntityDelta::Appeared { at, layer, .. } => format!("{label} appeared at {at} on {layer}"),
        EntityDelta::Disappeared { at, layer, .. } => {
            format!("{label} disappeared from {at} on {layer}")
        }
        EntityDelta::AttributesChanged { added, removed, .. } => {
            let mut text = label;
            if !added.is_empty() {
                let _ = write!(text, " +[{}]", added.join(", "));
            }
            if !removed.is_empty() {
                let _ = write!(text, " -[{}]", removed.join(", "));
            }
            text
        }
        EntityDelta::VelocityChanged { to, .. } => match to {
            Some(direction) => format!("{label} now heading {direction}"),
            None => format!("{label} stopped"),
        },
    }
}

pub(crate) fn describe_report(report: &TurnReport, entity_names: &[String]) -> String {
    let mut out = format!("turn {}", report.turn);
    if report.player_blocked {
        out.push_str(" (blocked)");
    }
    out.push('\n');
    for delta in &report.deltas {
        let _ = writeln!(out, "  {}", describe_delta(delta, entity_names));
    }
    if report.level_complete {
        out.push_str("level complete!\n");
    }
    if report.player_lost {
        out.push_str("the player is gone; undo to continue\n");
    }
    out
}

pub(crate) fn describe_trade(session: &TradeSession, entity_names: &[String]) -> String {
    let mut out = String::new();
    for state in [session.first(), session.second()] {
        let attributes = state
            .attributes()
            .iter()
            .map(|attribute| {
                if attribute.is_tradeable() {
                    attribute.name().to_string()
                } else {
                    format!("({})", attribute.name())
                }
            })
            .collect::<Vec<_>>();
        let _ = writeln!(
            out,
            "{}: {}",
            entity_label(state.entity(), entity_names),
            attributes.join(", ")
        );
        for attribute in state.attributes() {
            if !attribute.description().is_empty() {
                let _ = writeln!(out, "    {}: {}", attribute.name(), attribute.description());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::{Attribute, AttributeCatalog, Level, RulesConfig};

    fn state(id: u64, x: i32, y: i32, layer: Layer, attributes: &[&str]) -> EntityState {
        EntityState::new(
            EntityRef(id),
            GridPos::new(x, y),
            layer,
            None,
            attributes.iter().map(|name| Attribute::new(*name)),
        )
    }

    #[test]
    fn board_draws_top_layer_with_up_on_top() {
        let grid = GridState::from_entities(vec![
            state(0, 0, 0, Layer::Objects, &[names::PLAYER]),
            state(1, 2, 0, Layer::Objects, &[names::PUSHABLE]),
            state(2, 2, 0, Layer::Ground, &[]),
            state(3, 1, 1, Layer::Ground, &[names::WIN]),
            state(4, 0, 1, Layer::Objects, &[]),
        ])
        .expect("grid");
        assert_eq!(render_board(&grid), "#W.\n@.o\n");
        assert_eq!(render_board(&GridState::new()), "(empty)\n");
    }

    #[test]
    fn deltas_are_labelled_with_entity_names() {
        let labels = vec!["hero".to_string(), "log".to_string()];
        let moved = EntityDelta::Moved {
            entity: EntityRef(0),
            from: GridPos::new(0, 0),
            to: GridPos::new(0, 1),
            layer: Layer::Objects,
        };
        assert_eq!(describe_delta(&moved, &labels), "hero#0 moved (0, 0) -> (0, 1)");
        let ignited = EntityDelta::AttributesChanged {
            entity: EntityRef(1),
            added: vec![names::BURNING.to_string()],
            removed: Vec::new(),
        };
        assert_eq!(describe_delta(&ignited, &labels), "log#1 +[Burning]");
        assert_eq!(entity_label(EntityRef(9), &labels), "?#9");
    }

    #[test]
    fn trade_lists_attributes_with_descriptions() {
        let pushable = Attribute::with_flags(names::PUSHABLE, false, true, "can be shoved");
        let win = Attribute::with_flags(names::WIN, true, true, "");
        let level = Level::new(
            vec![
                EntityState::new(
                    EntityRef(0),
                    GridPos::new(0, 0),
                    Layer::Objects,
                    None,
                    [Attribute::new(names::PLAYER), pushable],
                ),
                EntityState::new(
                    EntityRef(1),
                    GridPos::new(1, 0),
                    Layer::Objects,
                    None,
                    [win],
                ),
            ],
            AttributeCatalog::new(),
            RulesConfig::default(),
        )
        .expect("level");
        let session = level
            .begin_trade(EntityRef(0), EntityRef(1))
            .expect("session");
        let labels = vec!["hero".to_string(), "flag".to_string()];
        assert_eq!(
            describe_trade(&session, &labels),
            "hero#0: Player, Pushable\n    Pushable: can be shoved\nflag#1: (Win)\n"
        );
    }
}
