mod burning;
mod goal;
mod movement;

use tracing::debug;

use crate::attribute::AttributeCatalog;
use crate::entity::EntityRef;
use crate::geometry::Direction;
use crate::grid::GridState;
use crate::EngineError;

pub use movement::{ChainOutcome, ChainResolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnSystemId {
    Movement,
    WinCheck,
    Burning,
}

impl TurnSystemId {
    pub fn name(self) -> &'static str {
        match self {
            Self::Movement => "Movement",
            Self::WinCheck => "WinCheck",
            Self::Burning => "Burning",
        }
    }
}

pub type TurnSystemFn = fn(&mut TurnSystemContext<'_>) -> Result<(), EngineError>;

/// A registered system: reads `frozen`, writes `next`.
#[derive(Debug, Clone, Copy)]
pub struct TurnSystem {
    pub id: TurnSystemId,
    pub run: TurnSystemFn,
}

pub const TURN_SYSTEM_ORDER: [TurnSystem; 3] = [
    TurnSystem {
        id: TurnSystemId::Movement,
        run: movement::run_movement_system,
    },
    TurnSystem {
        id: TurnSystemId::WinCheck,
        run: goal::run_win_check_system,
    },
    TurnSystem {
        id: TurnSystemId::Burning,
        run: burning::run_burning_system,
    },
];

/// What happened during one turn, in the order systems observed it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnOutcome {
    pub player_moved: bool,
    pub player_blocked: bool,
    pub level_complete: bool,
    pub destroyed: Vec<EntityRef>,
    pub bounced: Vec<EntityRef>,
    pub ignited: Vec<EntityRef>,
    pub burned_out: Vec<EntityRef>,
}

pub struct TurnSystemContext<'a> {
    pub player_direction: Option<Direction>,
    pub catalog: &'a AttributeCatalog,
    /// Copy of `next` taken right before this system started.
    pub frozen: &'a GridState,
    pub next: &'a mut GridState,
    pub outcome: &'a mut TurnOutcome,
}

#[derive(Debug, Clone)]
pub struct TurnSystemsHost {
    systems: Vec<TurnSystem>,
    last_turn_order: Vec<TurnSystemId>,
}

impl Default for TurnSystemsHost {
    fn default() -> Self {
        Self::with_systems(TURN_SYSTEM_ORDER.to_vec())
    }
}

impl TurnSystemsHost {
    pub fn with_systems(systems: Vec<TurnSystem>) -> Self {
        Self {
            systems,
            last_turn_order: Vec::new(),
        }
    }

    /// Runs every system once, in registration order, against `next`.
    pub fn run_turn(
        &mut self,
        player_direction: Option<Direction>,
        catalog: &AttributeCatalog,
        next: &mut GridState,
    ) -> Result<TurnOutcome, EngineError> {
        self.last_turn_order.clear();
        let mut outcome = TurnOutcome::default();
        for system in &self.systems {
            self.last_turn_order.push(system.id);
            let frozen = next.clone();
            let mut context = TurnSystemContext {
                player_direction,
                catalog,
                frozen: &frozen,
                next: &mut *next,
                outcome: &mut outcome,
            };
            (system.run)(&mut context)?;
            debug!(system = system.id.name(), "turn_system_finished");
        }
        Ok(outcome)
    }

    pub fn last_turn_order(&self) -> &[TurnSystemId] {
        &self.last_turn_order
    }

    pub fn order_text(&self) -> String {
        self.systems
            .iter()
            .map(|system| system.id.name())
            .collect::<Vec<_>>()
            .join(">")
    }
}
