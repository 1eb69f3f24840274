use thiserror::Error;
use tracing::{debug, info, warn};

use crate::attribute::{names, Attribute, AttributeCatalog};
use crate::config::RulesConfig;
use crate::delta::{diff_snapshots, EntityDelta};
use crate::entity::{EntityRef, EntityState};
use crate::geometry::Direction;
use crate::grid::GridState;
use crate::history::History;
use crate::systems::{ChainResolver, TurnSystemId, TurnSystemsHost};
use crate::trade::{trade_attribute, TradeRejection};
use crate::EngineError;

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("level is already complete")]
    LevelComplete,
    #[error("the player is gone; undo to continue")]
    PlayerLost,
    #[error("trade was opened on a snapshot that is no longer current")]
    StaleTrade,
    #[error(transparent)]
    Config(#[from] EngineError),
}

/// One history slot: a resolved snapshot plus what the turn that produced
/// it decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnFrame {
    pub grid: GridState,
    pub turn: u64,
    pub level_complete: bool,
}

/// Summary handed to the presentation layer after each resolved turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    pub turn: u64,
    pub player_moved: bool,
    pub player_blocked: bool,
    pub player_lost: bool,
    pub level_complete: bool,
    pub deltas: Vec<EntityDelta>,
    pub fingerprint: String,
    pub system_order: Vec<TurnSystemId>,
}

/// Turn controller: owns the history and the ordered systems for one level.
#[derive(Debug, Clone)]
pub struct Level {
    history: History<TurnFrame>,
    catalog: AttributeCatalog,
    host: TurnSystemsHost,
}

impl Level {
    /// Validates the authored entities and publishes them as turn zero.
    pub fn new(
        entities: impl IntoIterator<Item = EntityState>,
        catalog: AttributeCatalog,
        rules: RulesConfig,
    ) -> Result<Self, EngineError> {
        let grid = GridState::from_entities(entities)?;
        let player = grid.player_state()?;
        validate_portals(&grid)?;
        info!(
            entities = grid.len(),
            attributes = catalog.len(),
            player = %player.entity(),
            "level_started"
        );

        let mut history = match rules.history_limit {
            Some(limit) => History::with_limit(limit),
            None => History::new(),
        };
        history.create_next(TurnFrame {
            grid,
            turn: 0,
            level_complete: false,
        });
        Ok(Self {
            history,
            catalog,
            host: TurnSystemsHost::default(),
        })
    }

    pub fn current(&self) -> &GridState {
        &self.current_frame().grid
    }

    pub fn previous(&self) -> Option<&GridState> {
        self.history.previous().map(|frame| &frame.grid)
    }

    pub fn current_frame(&self) -> &TurnFrame {
        self.history.current()
    }

    pub fn turn(&self) -> u64 {
        self.current_frame().turn
    }

    pub fn is_complete(&self) -> bool {
        self.current_frame().level_complete
    }

    pub fn catalog(&self) -> &AttributeCatalog {
        &self.catalog
    }

    pub fn history(&self) -> &History<TurnFrame> {
        &self.history
    }

    pub fn system_order_text(&self) -> String {
        self.host.order_text()
    }

    /// Resolves one turn. `None` lets the world advance without moving the
    /// player. A configuration error leaves history untouched.
    pub fn step(&mut self, direction: Option<Direction>) -> Result<TurnReport, TurnError> {
        let base = self.playable_frame()?;
        let base_grid = base.grid.clone();
        let turn = base.turn + 1;
        let (frame, report) = self.resolve(&base_grid, &base_grid, direction, turn)?;
        self.history.create_next(frame);
        Ok(report)
    }

    pub fn undo(&mut self) -> bool {
        let undone = self.history.try_undo();
        debug!(undone, turn = self.turn(), "undo_requested");
        undone
    }

    pub fn redo(&mut self) -> bool {
        let redone = self.history.try_redo();
        debug!(redone, turn = self.turn(), "redo_requested");
        redone
    }

    /// Opens an attribute trade between two entities of the current
    /// snapshot. The session edits private copies only.
    pub fn begin_trade(
        &self,
        first: EntityRef,
        second: EntityRef,
    ) -> Result<TradeSession, TradeRejection> {
        if first == second {
            return Err(TradeRejection::SameEntity { entity: first });
        }
        let grid = self.current();
        let lookup = |entity| {
            grid.find_entity(entity)
                .cloned()
                .ok_or(TradeRejection::UnknownEntity { entity })
        };
        let session = TradeSession {
            base: grid.clone(),
            first: lookup(first)?,
            second: lookup(second)?,
            dirty: false,
        };
        debug!(first = %first, second = %second, "trade_opened");
        Ok(session)
    }

    /// Publishes a trade as one turn: the edited snapshot is resolved with
    /// no player input. Returns `None` when nothing was transferred.
    pub fn commit_trade(
        &mut self,
        session: TradeSession,
    ) -> Result<Option<TurnReport>, TurnError> {
        if !session.dirty {
            debug!("trade_discarded");
            return Ok(None);
        }
        let base = self.playable_frame()?;
        if base.grid != session.base {
            return Err(TurnError::StaleTrade);
        }
        let turn = base.turn + 1;
        let mut traded = session.base.clone();
        traded.replace(session.first);
        traded.replace(session.second);
        traded.player_state()?;

        let (frame, report) = self.resolve(&session.base, &traded, None, turn)?;
        self.history.create_next(frame);
        info!(turn, "trade_committed");
        Ok(Some(report))
    }

    fn playable_frame(&self) -> Result<&TurnFrame, TurnError> {
        let frame = self.current_frame();
        if frame.level_complete {
            return Err(TurnError::LevelComplete);
        }
        match frame.grid.player_state() {
            Ok(_) => Ok(frame),
            Err(EngineError::NoPlayer) => Err(TurnError::PlayerLost),
            Err(error) => Err(error.into()),
        }
    }

    /// Runs the systems on a copy of `start`; deltas are measured from
    /// `shown`, the snapshot the presentation last drew.
    fn resolve(
        &mut self,
        shown: &GridState,
        start: &GridState,
        direction: Option<Direction>,
        turn: u64,
    ) -> Result<(TurnFrame, TurnReport), EngineError> {
        let mut next = start.clone();
        let outcome = self.host.run_turn(direction, &self.catalog, &mut next)?;
        let player_lost = next.find_by_attribute(names::PLAYER).next().is_none();
        let report = TurnReport {
            turn,
            player_moved: outcome.player_moved,
            player_blocked: outcome.player_blocked,
            player_lost,
            level_complete: outcome.level_complete,
            deltas: diff_snapshots(shown, &next),
            fingerprint: next.fingerprint(),
            system_order: self.host.last_turn_order().to_vec(),
        };
        info!(
            turn,
            direction = direction.map_or("none", Direction::as_token),
            moved = report.player_moved,
            blocked = report.player_blocked,
            deltas = report.deltas.len(),
            fingerprint = %report.fingerprint,
            "turn_resolved"
        );
        if report.level_complete {
            info!(turn, "level_complete");
        }
        if player_lost {
            warn!(turn, "player_lost");
        }
        let frame = TurnFrame {
            grid: next,
            turn,
            level_complete: outcome.level_complete,
        };
        Ok((frame, report))
    }
}

fn validate_portals(grid: &GridState) -> Result<(), EngineError> {
    for name in [names::PORTAL_A, names::PORTAL_B] {
        for portal in grid.find_by_attribute(name) {
            ChainResolver::new(grid, portal.layer(), Direction::Up).paired_portal(portal)?;
        }
    }
    Ok(())
}

/// Pending attribute exchange between two entities.
#[derive(Debug, Clone)]
pub struct TradeSession {
    base: GridState,
    first: EntityState,
    second: EntityState,
    dirty: bool,
}

impl TradeSession {
    pub fn first(&self) -> &EntityState {
        &self.first
    }

    pub fn second(&self) -> &EntityState {
        &self.second
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Attributes `entity` may currently give away.
    pub fn tradeable(&self, entity: EntityRef) -> Vec<&Attribute> {
        [&self.first, &self.second]
            .into_iter()
            .filter(|state| state.entity() == entity)
            .flat_map(|state| state.attributes().iter())
            .filter(|attribute| attribute.is_tradeable())
            .collect()
    }

    /// Moves `attribute` from `from` to the other participant.
    pub fn transfer(&mut self, from: EntityRef, attribute: &str) -> Result<(), TradeRejection> {
        let (source, destination) = if from == self.first.entity() {
            (&mut self.first, &mut self.second)
        } else if from == self.second.entity() {
            (&mut self.second, &mut self.first)
        } else {
            return Err(TradeRejection::UnknownEntity { entity: from });
        };
        let (given, received) = trade_attribute(source, destination, attribute)?;
        *source = given;
        *destination = received;
        self.dirty = true;
        debug!(
            from = %from,
            to = %destination.entity(),
            attribute,
            "attribute_transferred"
        );
        Ok(())
    }
}
