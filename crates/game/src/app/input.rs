use engine::Direction;
use thiserror::Error;

/// One line of player input after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum InputCommand {
    Move(Direction),
    Undo,
    Redo,
    Select,
    Confirm,
    Cancel,
    Transfer(String),
    Show,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum InputParseError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("'{command}' expects {expected}")]
    BadArguments {
        command: &'static str,
        expected: &'static str,
    },
}

/// Parses one command line. `Ok(None)` means the input is valid but has no
/// effect, such as a diagonal or zero movement vector.
pub(crate) fn parse_command(line: &str) -> Result<Option<InputCommand>, InputParseError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let rest = words.collect::<Vec<_>>();
    let keyword = head.to_ascii_lowercase();

    if let Some(direction) = direction_word(&keyword) {
        return no_arguments("move", &rest).map(|()| Some(InputCommand::Move(direction)));
    }

    let command = match keyword.as_str() {
        "move" => return parse_vector(&rest),
        "undo" | "z" => InputCommand::Undo,
        "redo" | "y" => InputCommand::Redo,
        "select" | "tab" => InputCommand::Select,
        "confirm" | "enter" | "ok" => InputCommand::Confirm,
        "cancel" | "esc" | "back" => InputCommand::Cancel,
        "show" | "board" => InputCommand::Show,
        "quit" | "exit" => InputCommand::Quit,
        "give" | "take" | "transfer" => {
            if rest.is_empty() {
                return Err(InputParseError::BadArguments {
                    command: "transfer",
                    expected: "an attribute name",
                });
            }
            return Ok(Some(InputCommand::Transfer(rest.join(" "))));
        }
        _ => return Err(InputParseError::UnknownCommand(head.to_string())),
    };
    no_arguments(command_name(&command), &rest).map(|()| Some(command))
}

/// Script lines, skipping blanks and `#` comments.
pub(crate) fn parse_script_commands(content: &str) -> Vec<String> {
    let mut commands = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        commands.push(trimmed.to_string());
    }
    commands
}

fn direction_word(word: &str) -> Option<Direction> {
    match word {
        "up" | "w" | "north" => Some(Direction::Up),
        "down" | "s" | "south" => Some(Direction::Down),
        "left" | "a" | "west" => Some(Direction::Left),
        "right" | "d" | "east" => Some(Direction::Right),
        _ => None,
    }
}

fn parse_vector(arguments: &[&str]) -> Result<Option<InputCommand>, InputParseError> {
    const EXPECTED: InputParseError = InputParseError::BadArguments {
        command: "move",
        expected: "two integers, e.g. 'move 1 0'",
    };
    let [dx, dy] = arguments else {
        return Err(EXPECTED);
    };
    let dx = dx.parse::<i32>().map_err(|_| EXPECTED)?;
    let dy = dy.parse::<i32>().map_err(|_| EXPECTED)?;
    Ok(Direction::from_vector(dx.signum(), dy.signum()).map(InputCommand::Move))
}

fn no_arguments(command: &'static str, rest: &[&str]) -> Result<(), InputParseError> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(InputParseError::BadArguments {
            command,
            expected: "no arguments",
        })
    }
}

fn command_name(command: &InputCommand) -> &'static str {
    match command {
        InputCommand::Move(_) => "move",
        InputCommand::Undo => "undo",
        InputCommand::Redo => "redo",
        InputCommand::Select => "select",
        InputCommand::Confirm => "confirm",
        InputCommand::Cancel => "cancel",
        InputCommand::Transfer(_) => "transfer",
        InputCommand::Show => "show",
        InputCommand::Quit => "quit",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_words_and_aliases() {
        assert_eq!(
            parse_command("Up").expect("parse"),
            Some(InputCommand::Move(Direction::Up))
        );
        assert_eq!(
            parse_command("d").expect("parse"),
            Some(InputCommand::Move(Direction::Right))
        );
        assert_eq!(parse_command("z").expect("parse"), Some(InputCommand::Undo));
        assert_eq!(
            parse_command("give Moving Horizontally").expect("parse"),
            Some(InputCommand::Transfer("Moving Horizontally".to_string()))
        );
        assert_eq!(parse_command("   ").expect("parse"), None);
    }

    #[test]
    fn movement_vectors_ignore_diagonals() {
        assert_eq!(
            parse_command("move -3 0").expect("parse"),
            Some(InputCommand::Move(Direction::Left))
        );
        assert_eq!(parse_command("move 1 1").expect("parse"), None);
        assert_eq!(parse_command("move 0 0").expect("parse"), None);
        assert!(parse_command("move 1").is_err());
        assert!(parse_command("move x 0").is_err());
    }

    #[test]
    fn rejects_unknown_commands_and_stray_arguments() {
        assert_eq!(
            parse_command("jump"),
            Err(InputParseError::UnknownCommand("jump".to_string()))
        );
        assert!(matches!(
            parse_command("undo twice"),
            Err(InputParseError::BadArguments { command: "undo", .. })
        ));
        assert!(parse_command("transfer").is_err());
    }

    #[test]
    fn parse_script_commands_ignores_blank_and_comment_lines() {
        let content = r#"
            # push the crate
            right

            select
            # trade
            give Pushable
        "#;
        assert_eq!(
            parse_script_commands(content),
            vec![
                "right".to_string(),
                "select".to_string(),
                "give Pushable".to_string()
            ]
        );
    }
}
