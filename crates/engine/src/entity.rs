use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::attribute::{names, Attribute};
use crate::geometry::{Direction, GridPos, Layer};

/// Opaque identity of the logical entity behind a state. The presentation
/// layer owns the mapping from this handle to anything it draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef(pub u64);

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One entity's grid-relevant state for a single turn.
///
/// Every `with_*` method returns a new value and leaves `self` untouched.
/// The attribute list is shared between copies until one of them changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityState {
    entity: EntityRef,
    position: GridPos,
    layer: Layer,
    velocity: Option<Direction>,
    attributes: Arc<[Attribute]>,
}

impl EntityState {
    /// Builds an initial state. Repeated attributes keep their first
    /// occurrence.
    pub fn new(
        entity: EntityRef,
        position: GridPos,
        layer: Layer,
        velocity: Option<Direction>,
        attributes: impl IntoIterator<Item = Attribute>,
    ) -> Self {
        let mut unique = Vec::<Attribute>::new();
        for attribute in attributes {
            if !unique.contains(&attribute) {
                unique.push(attribute);
            }
        }
        Self {
            entity,
            position,
            layer,
            velocity,
            attributes: unique.into(),
        }
    }

    pub fn entity(&self) -> EntityRef {
        self.entity
    }

    pub fn position(&self) -> GridPos {
        self.position
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    pub fn velocity(&self) -> Option<Direction> {
        self.velocity
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes
            .iter()
            .any(|attribute| attribute.name() == name)
    }

    pub fn is_player(&self) -> bool {
        self.has_attribute(names::PLAYER)
    }

    pub fn is_pushable(&self) -> bool {
        self.has_attribute(names::PUSHABLE) || self.has_attribute(names::MOVABLE)
    }

    pub fn is_portal(&self) -> bool {
        self.has_attribute(names::PORTAL_A) || self.has_attribute(names::PORTAL_B)
    }

    /// Player and the "Moving ..." attributes move without being pushed.
    pub fn moves_by_itself(&self) -> bool {
        self.is_player()
            || self.has_attribute(names::MOVING_HORIZONTALLY)
            || self.has_attribute(names::MOVING_VERTICALLY)
    }

    pub fn with_position(&self, position: GridPos) -> Self {
        Self {
            position,
            ..self.clone()
        }
    }

    pub fn with_velocity(&self, velocity: Option<Direction>) -> Self {
        Self {
            velocity,
            ..self.clone()
        }
    }

    /// Returns `None` when the attribute is already present.
    pub fn with_attribute(&self, attribute: &Attribute) -> Option<Self> {
        if self.attributes.contains(attribute) {
            return None;
        }
        let attributes = self
            .attributes
            .iter()
            .cloned()
            .chain(std::iter::once(attribute.clone()))
            .collect::<Vec<_>>();
        Some(Self {
            attributes: attributes.into(),
            ..self.clone()
        })
    }

    /// Removing an absent attribute yields an equal state.
    pub fn without_attribute(&self, attribute: &Attribute) -> Self {
        let attributes = self
            .attributes
            .iter()
            .filter(|existing| *existing != attribute)
            .cloned()
            .collect::<Vec<_>>();
        Self {
            attributes: attributes.into(),
            ..self.clone()
        }
    }
}
