pub mod attribute;
mod config;
mod delta;
mod entity;
mod error;
mod geometry;
mod grid;
mod history;
mod level;
pub mod systems;
mod trade;

pub use attribute::{names, Attribute, AttributeCatalog};
pub use config::RulesConfig;
pub use delta::{diff_snapshots, EntityDelta};
pub use entity::{EntityRef, EntityState};
pub use error::EngineError;
pub use geometry::{Direction, GridPos, Layer, ADJACENT_ORDER};
pub use grid::{GridState, SnapshotRecord};
pub use history::History;
pub use level::{Level, TradeSession, TurnError, TurnFrame, TurnReport};
pub use systems::{
    ChainOutcome, ChainResolver, TurnOutcome, TurnSystem, TurnSystemId, TurnSystemsHost,
    TURN_SYSTEM_ORDER,
};
pub use trade::{trade_attribute, TradeRejection};
