use std::env;
use std::fs;
use std::path::PathBuf;

use engine::RulesConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::input::parse_script_commands;
use super::level_file::{load_level_file, LoadedLevel};
use super::paths::{resolve_app_paths, resolve_level_path, StartupError, LEVEL_ENV_VAR};

const DEFAULT_LEVEL: &str = "intro";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AppConfig {
    pub(crate) level: String,
    pub(crate) script: Option<PathBuf>,
    pub(crate) print_board: bool,
    pub(crate) dump_snapshot: bool,
    pub(crate) history_limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CliAction {
    Help,
    Run(AppConfig),
}

pub(crate) struct AppWiring {
    pub(crate) config: AppConfig,
    pub(crate) loaded: LoadedLevel,
    pub(crate) script: Option<Vec<String>>,
}

/// Resolves paths, loads the level and the optional script. `Ok(None)`
/// means usage was printed and there is nothing to run.
pub(crate) fn build_app() -> Result<Option<AppWiring>, StartupError> {
    info!("=== Gridshift Startup ===");

    let args = env::args().skip(1).collect::<Vec<_>>();
    let default_level = env::var(LEVEL_ENV_VAR).ok();
    let config = match parse_args(&args, default_level).map_err(StartupError::Usage)? {
        CliAction::Help => {
            println!("{}", usage_text());
            return Ok(None);
        }
        CliAction::Run(config) => config,
    };

    let paths = resolve_app_paths()?;
    info!(root = %paths.root.display(), "project_root_resolved");
    let level_path = resolve_level_path(&paths, &config.level)?;
    let rules = RulesConfig {
        history_limit: config.history_limit,
    };
    let loaded = load_level_file(&level_path, rules)?;

    let script = match &config.script {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|source| StartupError::ReadScript {
                path: path.clone(),
                source,
            })?;
            let commands = parse_script_commands(&content);
            info!(path = %path.display(), commands = commands.len(), "script_loaded");
            Some(commands)
        }
        None => None,
    };

    Ok(Some(AppWiring {
        config,
        loaded,
        script,
    }))
}

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

pub(crate) fn parse_args(
    args: &[String],
    default_level: Option<String>,
) -> Result<CliAction, String> {
    let mut level = None;
    let mut script = None;
    let mut print_board = false;
    let mut dump_snapshot = false;
    let mut history_limit = None;

    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "-h" | "--help" => return Ok(CliAction::Help),
            "--script" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --script".to_string())?;
                script = Some(PathBuf::from(value));
                index += 2;
            }
            "--history-limit" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --history-limit".to_string())?;
                let parsed = value.parse::<usize>().map_err(|_| {
                    format!("invalid --history-limit value '{value}' (expected usize)")
                })?;
                history_limit = Some(parsed);
                index += 2;
            }
            "--board" => {
                print_board = true;
                index += 1;
            }
            "--dump" => {
                dump_snapshot = true;
                index += 1;
            }
            other if other.starts_with("--") => {
                return Err(format!("unknown option '{other}'\n\n{}", usage_text()));
            }
            other => {
                if level.is_some() {
                    return Err(format!("unexpected argument '{other}'"));
                }
                level = Some(other.to_string());
                index += 1;
            }
        }
    }

    Ok(CliAction::Run(AppConfig {
        level: level
            .or(default_level)
            .unwrap_or_else(|| DEFAULT_LEVEL.to_string()),
        script,
        print_board,
        dump_snapshot,
        history_limit,
    }))
}

pub(crate) fn usage_text() -> String {
    [
        "game - headless grid puzzle runner",
        "",
        "Usage:",
        "  game [<level name or path>] [--script <file>] [--board] [--dump]",
        "       [--history-limit <usize>]",
        "",
        "Without --script, commands are read from stdin one per line:",
        "  up|down|left|right (w/a/s/d), move <dx> <dy>, undo, redo,",
        "  select, confirm, cancel, give <attribute>, show, quit",
        "",
        "Environment:",
        "  GRIDSHIFT_ROOT   project root containing assets/levels",
        "  GRIDSHIFT_LEVEL  level used when none is given (default: intro)",
        "  RUST_LOG         tracing filter (default: info)",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn parses_level_and_options() {
        let action = parse_args(
            &args(&["portals", "--script", "moves.txt", "--board", "--history-limit", "50"]),
            None,
        )
        .expect("parse");
        assert_eq!(
            action,
            CliAction::Run(AppConfig {
                level: "portals".to_string(),
                script: Some(PathBuf::from("moves.txt")),
                print_board: true,
                dump_snapshot: false,
                history_limit: Some(50),
            })
        );
    }

    #[test]
    fn level_falls_back_to_env_then_default() {
        let CliAction::Run(from_env) = parse_args(&[], Some("fire".to_string())).expect("parse")
        else {
            panic!("expected run");
        };
        assert_eq!(from_env.level, "fire");
        let CliAction::Run(fallback) = parse_args(&[], None).expect("parse") else {
            panic!("expected run");
        };
        assert_eq!(fallback.level, DEFAULT_LEVEL);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert_eq!(parse_args(&args(&["--help"]), None), Ok(CliAction::Help));
        assert!(parse_args(&args(&["--script"]), None).is_err());
        assert!(parse_args(&args(&["--history-limit", "many"]), None).is_err());
        assert!(parse_args(&args(&["--fast"]), None).is_err());
        assert!(parse_args(&args(&["one", "two"]), None).is_err());
    }
}
