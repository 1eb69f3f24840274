use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use engine::EngineError;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::board_view::{describe_report, describe_trade, entity_label, render_board};
use super::bootstrap::AppWiring;
use super::controller::{ControlEvent, GameController, Mode};
use super::input::parse_command;

#[derive(Debug, Error)]
pub(crate) enum SessionError {
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SessionOptions {
    pub(crate) print_board: bool,
    pub(crate) dump_snapshot: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SessionSummary {
    pub(crate) commands: usize,
    pub(crate) final_turn: u64,
    pub(crate) completed: bool,
    pub(crate) fingerprint: String,
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        config,
        loaded,
        script,
    } = app;
    let options = SessionOptions {
        print_board: config.print_board,
        dump_snapshot: config.dump_snapshot,
    };
    let mut controller = GameController::new(loaded.level);
    info!(
        level = %loaded.name,
        systems = %controller.level().system_order_text(),
        "session_started"
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = match script {
        Some(commands) => run_session(
            &mut controller,
            &loaded.entity_names,
            commands,
            options,
            &mut out,
        ),
        None => {
            let lines = io::stdin().lock().lines().map_while(Result::ok);
            run_session(&mut controller, &loaded.entity_names, lines, options, &mut out)
        }
    };

    match result {
        Ok(summary) => {
            info!(
                commands = summary.commands,
                turn = summary.final_turn,
                completed = summary.completed,
                fingerprint = %summary.fingerprint,
                "session_finished"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "session_failed");
            ExitCode::FAILURE
        }
    }
}

/// Feeds command lines to the controller until they run out or `quit`.
pub(crate) fn run_session<W: Write>(
    controller: &mut GameController,
    entity_names: &[String],
    lines: impl IntoIterator<Item = String>,
    options: SessionOptions,
    out: &mut W,
) -> Result<SessionSummary, SessionError> {
    let mut commands = 0usize;
    write!(out, "{}", render_board(controller.level().current()))?;

    for line in lines {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => {
                debug!(line = %line, "input_without_effect");
                continue;
            }
            Err(err) => {
                warn!(line = %line, error = %err, "input_rejected");
                writeln!(out, "error: {err}")?;
                continue;
            }
        };
        commands += 1;
        let event = controller.handle(command)?;
        if matches!(event, ControlEvent::Quit) {
            break;
        }
        write_event(controller, entity_names, &event, options, out)?;
    }

    let level = controller.level();
    let summary = SessionSummary {
        commands,
        final_turn: level.turn(),
        completed: level.is_complete(),
        fingerprint: level.current().fingerprint(),
    };
    writeln!(
        out,
        "final turn {} fingerprint {}",
        summary.final_turn, summary.fingerprint
    )?;
    if options.dump_snapshot {
        let records = level.current().records();
        let json = serde_json::to_string_pretty(&records).map_err(io::Error::from)?;
        writeln!(out, "{json}")?;
    }
    Ok(summary)
}

fn write_event<W: Write>(
    controller: &GameController,
    entity_names: &[String],
    event: &ControlEvent,
    options: SessionOptions,
    out: &mut W,
) -> io::Result<()> {
    let level = controller.level();
    match event {
        ControlEvent::Turn(report) | ControlEvent::TradeClosed(Some(report)) => {
            write!(out, "{}", describe_report(report, entity_names))?;
            if options.print_board {
                write!(out, "{}", render_board(level.current()))?;
            }
        }
        ControlEvent::TradeClosed(None) => writeln!(out, "trade closed without changes")?,
        ControlEvent::TurnRefused(reason) => writeln!(out, "refused: {reason}")?,
        ControlEvent::Undone(true) | ControlEvent::Redone(true) => {
            writeln!(out, "back at turn {}", level.turn())?;
            if options.print_board {
                write!(out, "{}", render_board(level.current()))?;
            }
        }
        ControlEvent::Undone(false) => writeln!(out, "nothing to undo")?,
        ControlEvent::Redone(false) => writeln!(out, "nothing to redo")?,
        ControlEvent::ModeChanged(mode) => writeln!(out, "mode: {}", mode_text(*mode))?,
        ControlEvent::Targeted(occupants) if occupants.is_empty() => {
            writeln!(out, "target: nothing there")?
        }
        ControlEvent::Targeted(occupants) => {
            let labels = occupants
                .iter()
                .map(|entity| entity_label(*entity, entity_names))
                .collect::<Vec<_>>();
            writeln!(out, "target: {}", labels.join(", "))?
        }
        ControlEvent::Choosing { choices, index } => {
            writeln!(out, "choose with up/down, then confirm:")?;
            for (position, entity) in choices.iter().enumerate() {
                let marker = if position == *index { '>' } else { ' ' };
                writeln!(out, "  {marker} {}", entity_label(*entity, entity_names))?;
            }
        }
        ControlEvent::TradeOpened { partner } => {
            writeln!(out, "trading with {}", entity_label(*partner, entity_names))?;
            write_session(controller, entity_names, out)?;
        }
        ControlEvent::Transferred { from, attribute } => {
            writeln!(out, "{} gave {attribute}", entity_label(*from, entity_names))?;
            write_session(controller, entity_names, out)?;
        }
        ControlEvent::TradeRefused(rejection) => writeln!(out, "trade refused: {rejection}")?,
        ControlEvent::ShowBoard => write!(out, "{}", render_board(level.current()))?,
        ControlEvent::Ignored => debug!(mode = controller.mode().name(), "input_ignored"),
        ControlEvent::Quit => {}
    }
    Ok(())
}

fn write_session<W: Write>(
    controller: &GameController,
    entity_names: &[String],
    out: &mut W,
) -> io::Result<()> {
    match controller.session() {
        Some(session) => write!(out, "{}", describe_trade(session, entity_names)),
        None => Ok(()),
    }
}

fn mode_text(mode: Mode) -> String {
    match mode {
        Mode::SelectingEntity {
            direction: Some(direction),
        }
        | Mode::ChoosingAmong { direction, .. } => format!("{} ({direction})", mode.name()),
        _ => mode.name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::level_file::parse_level_json;
    use engine::RulesConfig;
    use serde_json::json;

    fn controller() -> (GameController, Vec<String>) {
        controller_for(json!({
            "name": "test",
            "attributes": [
                { "name": "Player" },
                { "name": "Pushable" },
                { "name": "Win", "locked": true }
            ],
            "entities": [
                { "name": "hero", "position": [0, 0], "attributes": ["Player"] },
                { "name": "crate", "position": [1, 0], "attributes": ["Pushable"] },
                { "name": "flag", "position": [0, 2], "attributes": ["Win"] }
            ]
        }))
    }

    fn controller_for(level: serde_json::Value) -> (GameController, Vec<String>) {
        let loaded = parse_level_json(&level.to_string())
            .expect("parse")
            .build(RulesConfig::default())
            .expect("build");
        (GameController::new(loaded.level), loaded.entity_names)
    }

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    fn run_lines(raw: &[&str], options: SessionOptions) -> (SessionSummary, String) {
        run_lines_on(controller(), raw, options)
    }

    fn run_lines_on(
        (mut controller, names): (GameController, Vec<String>),
        raw: &[&str],
        options: SessionOptions,
    ) -> (SessionSummary, String) {
        let mut out = Vec::new();
        let summary =
            run_session(&mut controller, &names, lines(raw), options, &mut out).expect("session");
        (summary, String::from_utf8(out).expect("utf8"))
    }

    #[test]
    fn script_session_reports_turns_and_completion() {
        let (summary, output) =
            run_lines(&["right", "left", "up", "up"], SessionOptions::default());
        assert_eq!(summary.commands, 4);
        assert_eq!(summary.final_turn, 4);
        assert!(summary.completed);
        assert!(output.contains("crate#1 moved (1, 0) -> (2, 0)"));
        assert!(output.contains("level complete!"));
        assert!(output.contains(&format!("fingerprint {}", summary.fingerprint)));
    }

    #[test]
    fn bad_lines_are_reported_and_skipped() {
        let (summary, output) =
            run_lines(&["jump", "move 1 1", "undo", "right"], SessionOptions::default());
        assert_eq!(summary.commands, 2);
        assert_eq!(summary.final_turn, 1);
        assert!(output.contains("error: unknown command 'jump'"));
        assert!(output.contains("nothing to undo"));
    }

    #[test]
    fn quit_stops_and_dump_prints_records() {
        let options = SessionOptions {
            print_board: false,
            dump_snapshot: true,
        };
        let (summary, output) = run_lines(&["right", "quit", "right"], options);
        assert_eq!(summary.final_turn, 1);
        let json_start = output.find('[').expect("json dump");
        let records: serde_json::Value =
            serde_json::from_str(&output[json_start..]).expect("records json");
        assert_eq!(records.as_array().map(Vec::len), Some(3));
        assert_eq!(records[0]["layer"], "objects");
    }

    #[test]
    fn trade_flow_prints_participants() {
        let (_, output) = run_lines(
            &["select", "right", "confirm", "give Pushable", "confirm"],
            SessionOptions::default(),
        );
        assert!(output.contains("mode: selecting"));
        assert!(output.contains("target: crate#1"));
        assert!(output.contains("crate#1 gave Pushable"));
        assert!(output.contains("turn 1"));
    }

    #[test]
    fn shared_cell_prints_choices_before_trading() {
        let level = json!({
            "name": "shared",
            "attributes": [
                { "name": "Player" },
                { "name": "Flammable" }
            ],
            "entities": [
                { "name": "hero", "position": [0, 0], "attributes": ["Player"] },
                {
                    "name": "rug",
                    "position": [1, 0],
                    "layer": "ground",
                    "attributes": ["Flammable"]
                },
                { "name": "stool", "position": [1, 0], "attributes": [] }
            ]
        });
        let (_, output) = run_lines_on(
            controller_for(level),
            &["select", "right", "confirm", "down", "confirm"],
            SessionOptions::default(),
        );
        assert!(output.contains("target: rug#1, stool#2"));
        assert!(output.contains("  > rug#1\n    stool#2\n"));
        assert!(output.contains("    rug#1\n  > stool#2\n"));
        assert!(output.contains("trading with stool#2"));
    }
}
