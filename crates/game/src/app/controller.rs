use engine::{
    Direction, EngineError, EntityRef, Level, TradeRejection, TradeSession, TurnError, TurnReport,
};
use tracing::{debug, info};

use super::input::InputCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Playing,
    SelectingEntity {
        direction: Option<Direction>,
    },
    /// Several entities share the selected cell; `index` walks them
    /// bottom layer first.
    ChoosingAmong {
        direction: Direction,
        index: usize,
    },
    TradingAttributes {
        partner: EntityRef,
    },
}

impl Mode {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Playing => "playing",
            Self::SelectingEntity { .. } => "selecting",
            Self::ChoosingAmong { .. } => "choosing",
            Self::TradingAttributes { .. } => "trading",
        }
    }
}

/// What a handled command did, for the view to report.
#[derive(Debug)]
pub(crate) enum ControlEvent {
    Turn(TurnReport),
    TurnRefused(TurnError),
    Undone(bool),
    Redone(bool),
    ModeChanged(Mode),
    /// Occupants of the selected cell, bottom layer first.
    Targeted(Vec<EntityRef>),
    Choosing {
        choices: Vec<EntityRef>,
        index: usize,
    },
    TradeOpened { partner: EntityRef },
    Transferred { from: EntityRef, attribute: String },
    TradeRefused(TradeRejection),
    TradeClosed(Option<TurnReport>),
    ShowBoard,
    Quit,
    Ignored,
}

/// Input mode state machine wrapped around one [`Level`].
pub(crate) struct GameController {
    level: Level,
    mode: Mode,
    session: Option<TradeSession>,
}

impl GameController {
    pub(crate) fn new(level: Level) -> Self {
        Self {
            level,
            mode: Mode::Playing,
            session: None,
        }
    }

    pub(crate) fn level(&self) -> &Level {
        &self.level
    }

    pub(crate) fn mode(&self) -> Mode {
        self.mode
    }

    pub(crate) fn session(&self) -> Option<&TradeSession> {
        self.session.as_ref()
    }

    /// Applies one command. Only configuration errors are returned; every
    /// refused action comes back as an event.
    pub(crate) fn handle(&mut self, command: InputCommand) -> Result<ControlEvent, EngineError> {
        match command {
            InputCommand::Show => return Ok(ControlEvent::ShowBoard),
            InputCommand::Quit => return Ok(ControlEvent::Quit),
            _ => {}
        }
        match self.mode {
            Mode::Playing => self.handle_playing(command),
            Mode::SelectingEntity { direction } => Ok(self.handle_selecting(command, direction)),
            Mode::ChoosingAmong { direction, index } => {
                Ok(self.handle_choosing(command, direction, index))
            }
            Mode::TradingAttributes { partner } => self.handle_trading(command, partner),
        }
    }

    fn handle_playing(&mut self, command: InputCommand) -> Result<ControlEvent, EngineError> {
        let event = match command {
            InputCommand::Move(direction) => match self.level.step(Some(direction)) {
                Ok(report) => ControlEvent::Turn(report),
                Err(error) => refused_turn(error)?,
            },
            InputCommand::Undo => ControlEvent::Undone(self.level.undo()),
            InputCommand::Redo => ControlEvent::Redone(self.level.redo()),
            InputCommand::Select => self.enter(Mode::SelectingEntity { direction: None }),
            _ => ControlEvent::Ignored,
        };
        Ok(event)
    }

    fn handle_selecting(
        &mut self,
        command: InputCommand,
        direction: Option<Direction>,
    ) -> ControlEvent {
        match command {
            InputCommand::Move(direction) => {
                let occupants = self.occupants(direction);
                self.mode = Mode::SelectingEntity {
                    direction: Some(direction),
                };
                debug!(direction = %direction, occupants = occupants.len(), "selection_moved");
                ControlEvent::Targeted(occupants)
            }
            InputCommand::Confirm => {
                let Some(direction) = direction else {
                    return ControlEvent::Ignored;
                };
                let occupants = self.occupants(direction);
                match occupants.as_slice() {
                    [] => ControlEvent::Ignored,
                    [partner] => self.open_trade(*partner),
                    _ => {
                        self.mode = Mode::ChoosingAmong {
                            direction,
                            index: 0,
                        };
                        ControlEvent::Choosing {
                            choices: occupants,
                            index: 0,
                        }
                    }
                }
            }
            InputCommand::Cancel | InputCommand::Undo | InputCommand::Select => {
                self.enter(Mode::Playing)
            }
            _ => ControlEvent::Ignored,
        }
    }

    fn handle_choosing(
        &mut self,
        command: InputCommand,
        direction: Direction,
        index: usize,
    ) -> ControlEvent {
        let choices = self.occupants(direction);
        let last = choices.len().saturating_sub(1);
        let moved_to = match command {
            InputCommand::Move(Direction::Up) => Some(index.saturating_sub(1)),
            InputCommand::Move(Direction::Down) => Some((index + 1).min(last)),
            _ => None,
        };
        if let Some(index) = moved_to {
            self.mode = Mode::ChoosingAmong { direction, index };
            return ControlEvent::Choosing { choices, index };
        }
        match command {
            InputCommand::Confirm => match choices.get(index) {
                Some(partner) => self.open_trade(*partner),
                None => self.enter(Mode::Playing),
            },
            InputCommand::Cancel | InputCommand::Undo => self.enter(Mode::SelectingEntity {
                direction: Some(direction),
            }),
            _ => ControlEvent::Ignored,
        }
    }

    fn open_trade(&mut self, partner: EntityRef) -> ControlEvent {
        let Some(player) = self.player_ref() else {
            return self.enter(Mode::Playing);
        };
        match self.level.begin_trade(player, partner) {
            Ok(session) => {
                self.session = Some(session);
                self.mode = Mode::TradingAttributes { partner };
                info!(partner = %partner, "trade_started");
                ControlEvent::TradeOpened { partner }
            }
            Err(rejection) => ControlEvent::TradeRefused(rejection),
        }
    }

    fn handle_trading(
        &mut self,
        command: InputCommand,
        partner: EntityRef,
    ) -> Result<ControlEvent, EngineError> {
        match command {
            InputCommand::Transfer(attribute) => Ok(self.transfer(partner, attribute)),
            InputCommand::Confirm | InputCommand::Cancel => self.close_trade(),
            _ => Ok(ControlEvent::Ignored),
        }
    }

    /// Gives `attribute` away from whichever participant holds it, the
    /// player first.
    fn transfer(&mut self, partner: EntityRef, attribute: String) -> ControlEvent {
        let Some(session) = self.session.as_mut() else {
            return ControlEvent::Ignored;
        };
        let from = if session.second().has_attribute(&attribute)
            && !session.first().has_attribute(&attribute)
        {
            partner
        } else {
            session.first().entity()
        };
        match session.transfer(from, &attribute) {
            Ok(()) => ControlEvent::Transferred { from, attribute },
            Err(rejection) => ControlEvent::TradeRefused(rejection),
        }
    }

    fn close_trade(&mut self) -> Result<ControlEvent, EngineError> {
        self.mode = Mode::Playing;
        let Some(session) = self.session.take() else {
            return Ok(ControlEvent::ModeChanged(Mode::Playing));
        };
        match self.level.commit_trade(session) {
            Ok(report) => Ok(ControlEvent::TradeClosed(report)),
            Err(error) => refused_turn(error),
        }
    }

    fn enter(&mut self, mode: Mode) -> ControlEvent {
        debug!(from = self.mode.name(), to = mode.name(), "mode_changed");
        self.mode = mode;
        ControlEvent::ModeChanged(mode)
    }

    fn player_ref(&self) -> Option<EntityRef> {
        self.level
            .current()
            .player_state()
            .ok()
            .map(|player| player.entity())
    }

    /// Entities in the cell next to the player, bottom layer first.
    fn occupants(&self, direction: Direction) -> Vec<EntityRef> {
        let grid = self.level.current();
        let Some(cell) = grid
            .player_state()
            .ok()
            .and_then(|player| player.position().step(direction))
        else {
            return Vec::new();
        };
        grid.states_at(cell).map(|state| state.entity()).collect()
    }
}

/// Rule-level refusals become events; configuration errors propagate.
fn refused_turn(error: TurnError) -> Result<ControlEvent, EngineError> {
    match error {
        TurnError::Config(error) => Err(error),
        other => Ok(ControlEvent::TurnRefused(other)),
    }
}
