use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::level_file::LevelFileError;

pub(crate) const ROOT_ENV_VAR: &str = "GRIDSHIFT_ROOT";
pub(crate) const LEVEL_ENV_VAR: &str = "GRIDSHIFT_LEVEL";
const LEVEL_EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub(crate) struct AppPaths {
    pub(crate) root: PathBuf,
    pub(crate) levels_dir: PathBuf,
}

#[derive(Debug, Error)]
pub(crate) enum StartupError {
    #[error("{0}")]
    Usage(String),
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error("GRIDSHIFT_ROOT={path} has no assets/levels directory")]
    InvalidEnvRoot { path: PathBuf },
    #[error("no assets/levels directory above {start_dir}; set GRIDSHIFT_ROOT to the project root")]
    RootNotFound { start_dir: PathBuf },
    #[error("no level named '{name}' in {levels_dir}")]
    LevelNotFound { name: String, levels_dir: PathBuf },
    #[error("failed to read input script {path}: {source}")]
    ReadScript {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Level(#[from] LevelFileError),
}

pub(crate) fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    Ok(app_paths_at(root))
}

fn app_paths_at(root: PathBuf) -> AppPaths {
    let levels_dir = levels_dir_of(&root);
    AppPaths { root, levels_dir }
}

fn levels_dir_of(root: &Path) -> PathBuf {
    root.join("assets").join("levels")
}

/// Accepts either a path to a level file or the stem of a file in the
/// levels directory.
pub(crate) fn resolve_level_path(paths: &AppPaths, level: &str) -> Result<PathBuf, StartupError> {
    let direct = PathBuf::from(level);
    if direct.is_file() {
        return Ok(normalize_path(&direct));
    }
    let named = paths
        .levels_dir
        .join(level)
        .with_extension(LEVEL_EXTENSION);
    if named.is_file() {
        return Ok(named);
    }
    Err(StartupError::LevelNotFound {
        name: level.to_string(),
        levels_dir: paths.levels_dir.clone(),
    })
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => root_from_env_value(&value),
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;
            find_root_above(&exe_dir)
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn root_from_env_value(value: &str) -> Result<PathBuf, StartupError> {
    let normalized = normalize_path(Path::new(value));
    if has_levels_dir(&normalized) {
        Ok(normalized)
    } else {
        Err(StartupError::InvalidEnvRoot { path: normalized })
    }
}

fn find_root_above(start_dir: &Path) -> Result<PathBuf, StartupError> {
    start_dir
        .ancestors()
        .find(|candidate| has_levels_dir(candidate))
        .map(normalize_path)
        .ok_or_else(|| StartupError::RootNotFound {
            start_dir: normalize_path(start_dir),
        })
}

/// A project root is any directory holding `assets/levels`.
fn has_levels_dir(path: &Path) -> bool {
    levels_dir_of(path).is_dir()
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_root() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(levels_dir_of(dir.path())).expect("create levels");
        dir
    }

    #[test]
    fn project_root_needs_levels_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("assets")).expect("create assets");
        assert!(!has_levels_dir(dir.path()));
        fs::create_dir_all(levels_dir_of(dir.path())).expect("create levels");
        assert!(has_levels_dir(dir.path()));
    }

    #[test]
    fn root_is_found_from_nested_directory() {
        let root = fake_root();
        let nested = root.path().join("target").join("debug");
        fs::create_dir_all(&nested).expect("create nested");
        let found = find_root_above(&nested).expect("root");
        assert_eq!(found, normalize_path(root.path()));
    }

    #[test]
    fn env_root_must_be_a_project_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let value = dir.path().to_string_lossy().to_string();
        let err = root_from_env_value(&value).expect_err("no levels dir");
        assert!(matches!(err, StartupError::InvalidEnvRoot { .. }));
        assert!(err.to_string().ends_with("has no assets/levels directory"));
    }

    #[test]
    fn level_is_resolved_by_name_or_path() {
        let root = fake_root();
        let paths = app_paths_at(normalize_path(root.path()));
        let level = paths.levels_dir.join("intro.json");
        fs::write(&level, "{}").expect("write level");

        assert_eq!(resolve_level_path(&paths, "intro").expect("by name"), level);
        let by_path = resolve_level_path(&paths, &level.to_string_lossy()).expect("by path");
        assert_eq!(by_path, normalize_path(&level));
        assert!(matches!(
            resolve_level_path(&paths, "missing"),
            Err(StartupError::LevelNotFound { .. })
        ));
    }
}
