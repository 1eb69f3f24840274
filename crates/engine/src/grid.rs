use std::collections::BTreeMap;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::attribute::names;
use crate::entity::{EntityRef, EntityState};
use crate::geometry::{Direction, GridPos, Layer, ADJACENT_ORDER};
use crate::EngineError;

/// Map key. Orders by layer, then row, then column so iteration is stable
/// across clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct CellKey {
    layer: Layer,
    row: i32,
    column: i32,
}

impl CellKey {
    fn new(position: GridPos, layer: Layer) -> Self {
        let (row, column) = position.sort_key();
        Self { layer, row, column }
    }
}

/// One turn's occupancy: at most one entity per `(position, layer)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridState {
    cells: BTreeMap<CellKey, EntityState>,
}

/// Flattened view of one occupied cell, for export and fingerprinting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotRecord<'a> {
    pub layer: Layer,
    pub position: GridPos,
    pub entity: EntityRef,
    pub velocity: Option<Direction>,
    pub attributes: Vec<&'a str>,
}

impl GridState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the first snapshot of a level from authored initial states.
    pub fn from_entities(
        entities: impl IntoIterator<Item = EntityState>,
    ) -> Result<Self, EngineError> {
        let mut grid = Self::new();
        for state in entities {
            if grid.has_entity_at(state.position(), state.layer()) {
                return Err(EngineError::DuplicateOccupant {
                    position: state.position(),
                    layer: state.layer(),
                });
            }
            grid.insert(state);
        }
        Ok(grid)
    }

    pub fn get(&self, position: GridPos, layer: Layer) -> Option<&EntityState> {
        self.cells.get(&CellKey::new(position, layer))
    }

    /// Writes or clears a cell. `None` removes whatever occupied it.
    ///
    /// # Panics
    /// When the state's own position or layer disagree with the key.
    pub fn set(&mut self, position: GridPos, layer: Layer, state: Option<EntityState>) {
        let key = CellKey::new(position, layer);
        match state {
            Some(state) => {
                assert!(
                    state.position() == position && state.layer() == layer,
                    "entity {} stored at {position}/{layer} but reports {}/{}",
                    state.entity(),
                    state.position(),
                    state.layer()
                );
                self.cells.insert(key, state);
            }
            None => {
                self.cells.remove(&key);
            }
        }
    }

    /// Places a state in a vacant cell.
    ///
    /// # Panics
    /// When the cell is already occupied.
    pub fn insert(&mut self, state: EntityState) {
        let key = CellKey::new(state.position(), state.layer());
        assert!(
            !self.cells.contains_key(&key),
            "cell {}/{} already occupied",
            state.position(),
            state.layer()
        );
        self.cells.insert(key, state);
    }

    pub fn remove(&mut self, position: GridPos, layer: Layer) -> Option<EntityState> {
        self.cells.remove(&CellKey::new(position, layer))
    }

    /// Replaces the stored state of the same cell.
    pub fn replace(&mut self, state: EntityState) {
        self.set(state.position(), state.layer(), Some(state));
    }

    pub fn has_entity_at(&self, position: GridPos, layer: Layer) -> bool {
        self.cells.contains_key(&CellKey::new(position, layer))
    }

    /// Every state at `position`, bottom layer first.
    pub fn states_at(&self, position: GridPos) -> impl Iterator<Item = &EntityState> + '_ {
        Layer::ALL
            .into_iter()
            .filter_map(move |layer| self.get(position, layer))
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityState> + '_ {
        self.cells.values()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn layer_len(&self, layer: Layer) -> usize {
        self.iter().filter(|state| state.layer() == layer).count()
    }

    pub fn find_by_attribute<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a EntityState> + 'a {
        self.iter().filter(move |state| state.has_attribute(name))
    }

    pub fn find_entity(&self, entity: EntityRef) -> Option<&EntityState> {
        self.iter().find(|state| state.entity() == entity)
    }

    /// Neighbours on the same layer in up, down, left, right order.
    pub fn adjacent4(&self, position: GridPos, layer: Layer) -> [Option<&EntityState>; 4] {
        ADJACENT_ORDER.map(|direction| {
            position
                .step(direction)
                .and_then(|neighbour| self.get(neighbour, layer))
        })
    }

    /// The single entity carrying the Player attribute.
    pub fn player_state(&self) -> Result<&EntityState, EngineError> {
        let mut players = self.find_by_attribute(names::PLAYER);
        let Some(player) = players.next() else {
            return Err(EngineError::NoPlayer);
        };
        let extra = players.count();
        if extra > 0 {
            return Err(EngineError::MultiplePlayers { count: extra + 1 });
        }
        Ok(player)
    }

    pub fn records(&self) -> Vec<SnapshotRecord<'_>> {
        self.iter()
            .map(|state| SnapshotRecord {
                layer: state.layer(),
                position: state.position(),
                entity: state.entity(),
                velocity: state.velocity(),
                attributes: state.attributes().iter().map(|a| a.name()).collect(),
            })
            .collect()
    }

    /// Lowercase hex SHA-256 of every occupied cell in iteration order.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for state in self.iter() {
            hasher.update(state.layer().as_token().as_bytes());
            hasher.update([0u8]);
            hasher.update(state.position().x.to_le_bytes());
            hasher.update(state.position().y.to_le_bytes());
            hasher.update(state.entity().0.to_le_bytes());
            let velocity = state.velocity().map_or("none", Direction::as_token);
            hasher.update(velocity.as_bytes());
            hasher.update([0u8]);
            for attribute in state.attributes() {
                hasher.update(attribute.name().as_bytes());
                hasher.update([0u8]);
            }
            hasher.update([0xffu8]);
        }
        to_hex_lower(&hasher.finalize())
    }
}

fn to_hex_lower(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}
