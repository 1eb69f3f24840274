use thiserror::Error;

use crate::geometry::{GridPos, Layer};

/// Configuration errors. These abort level load or the turn that hit them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("level has no entity with the Player attribute")]
    NoPlayer,
    #[error("level has {count} entities with the Player attribute; exactly one is required")]
    MultiplePlayers { count: usize },
    #[error("portal at {position} on layer {layer} has no matching opposite portal")]
    UnpairedPortal { position: GridPos, layer: Layer },
    #[error("more than one entity placed at {position} on layer {layer}")]
    DuplicateOccupant { position: GridPos, layer: Layer },
    #[error("attribute '{name}' is defined more than once")]
    DuplicateAttribute { name: String },
}
