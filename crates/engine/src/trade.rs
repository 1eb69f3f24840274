use thiserror::Error;

use crate::attribute::Attribute;
use crate::entity::{EntityRef, EntityState};

/// Why an attribute trade was refused. A refused trade changes nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TradeRejection {
    #[error("{entity} already has '{attribute}'")]
    AlreadyPresent { entity: EntityRef, attribute: String },
    #[error("{entity} has no '{attribute}' to give")]
    NotPresent { entity: EntityRef, attribute: String },
    #[error("'{attribute}' is locked")]
    Locked { attribute: String },
    #[error("'{attribute}' is inactive")]
    Inactive { attribute: String },
    #[error("{entity} cannot trade with itself")]
    SameEntity { entity: EntityRef },
    #[error("{entity} is not part of this trade")]
    UnknownEntity { entity: EntityRef },
}

/// Moves the attribute called `attribute` from `source` to `destination`.
///
/// Returns the new `(source, destination)` pair, or a rejection with both
/// inputs untouched.
pub fn trade_attribute(
    source: &EntityState,
    destination: &EntityState,
    attribute: &str,
) -> Result<(EntityState, EntityState), TradeRejection> {
    if source.entity() == destination.entity() {
        return Err(TradeRejection::SameEntity {
            entity: source.entity(),
        });
    }
    let moved = tradeable_attribute(source, attribute)?;
    let received = destination
        .with_attribute(&moved)
        .ok_or_else(|| TradeRejection::AlreadyPresent {
            entity: destination.entity(),
            attribute: attribute.to_string(),
        })?;
    Ok((source.without_attribute(&moved), received))
}

fn tradeable_attribute(source: &EntityState, name: &str) -> Result<Attribute, TradeRejection> {
    let attribute = source
        .attributes()
        .iter()
        .find(|candidate| candidate.name() == name)
        .cloned()
        .ok_or_else(|| TradeRejection::NotPresent {
            entity: source.entity(),
            attribute: name.to_string(),
        })?;
    if attribute.is_locked() {
        return Err(TradeRejection::Locked {
            attribute: name.to_string(),
        });
    }
    if !attribute.is_active() {
        return Err(TradeRejection::Inactive {
            attribute: name.to_string(),
        });
    }
    Ok(attribute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::names;
    use crate::geometry::{GridPos, Layer};

    fn state(id: u64, attributes: Vec<Attribute>) -> EntityState {
        EntityState::new(
            EntityRef(id),
            GridPos::new(id as i32, 0),
            Layer::Objects,
            None,
            attributes,
        )
    }

    #[test]
    fn trade_moves_attribute_between_entities() {
        let player = state(
            0,
            vec![Attribute::new(names::PLAYER), Attribute::new(names::FLAMMABLE)],
        );
        let crate_box = state(1, vec![Attribute::new(names::PUSHABLE)]);

        let (player_after, box_after) =
            trade_attribute(&player, &crate_box, names::FLAMMABLE).expect("trade");

        assert!(!player_after.has_attribute(names::FLAMMABLE));
        assert!(player_after.has_attribute(names::PLAYER));
        let listed = box_after
            .attributes()
            .iter()
            .map(Attribute::name)
            .collect::<Vec<_>>();
        assert_eq!(listed, vec![names::PUSHABLE, names::FLAMMABLE]);
    }

    #[test]
    fn rejected_trade_leaves_both_entities_unchanged() {
        let player = state(0, vec![Attribute::new(names::PLAYER), Attribute::new(names::PUSHABLE)]);
        let crate_box = state(1, vec![Attribute::new(names::PUSHABLE)]);
        let player_before = player.clone();
        let box_before = crate_box.clone();

        let rejection = trade_attribute(&player, &crate_box, names::PUSHABLE)
            .expect_err("destination already has it");

        assert_eq!(
            rejection,
            TradeRejection::AlreadyPresent {
                entity: EntityRef(1),
                attribute: names::PUSHABLE.to_string(),
            }
        );
        assert_eq!(player, player_before);
        assert_eq!(crate_box, box_before);
    }

    #[test]
    fn locked_and_inactive_attributes_stay_put() {
        let locked = Attribute::with_flags(names::WIN, true, true, "");
        let dormant = Attribute::with_flags(names::FLAMMABLE, false, false, "");
        let source = state(0, vec![locked, dormant]);
        let destination = state(1, Vec::new());

        assert!(matches!(
            trade_attribute(&source, &destination, names::WIN),
            Err(TradeRejection::Locked { .. })
        ));
        assert!(matches!(
            trade_attribute(&source, &destination, names::FLAMMABLE),
            Err(TradeRejection::Inactive { .. })
        ));
    }

    #[test]
    fn missing_attribute_and_self_trade_are_rejected() {
        let source = state(0, vec![Attribute::new(names::PLAYER)]);
        let destination = state(1, Vec::new());
        assert!(matches!(
            trade_attribute(&source, &destination, names::BURNING),
            Err(TradeRejection::NotPresent { .. })
        ));
        assert_eq!(
            trade_attribute(&source, &source, names::PLAYER),
            Err(TradeRejection::SameEntity {
                entity: EntityRef(0)
            })
        );
    }
}
