use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use engine::{
    Attribute, AttributeCatalog, Direction, EngineError, EntityRef, EntityState, GridPos, Layer,
    Level, RulesConfig,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub(crate) enum LevelFileError {
    #[error("failed to read level {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse level json{}: {source}", at_path(.path))]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("entities[{index}] ('{entity}') uses undeclared attribute '{attribute}'")]
    UnknownAttribute {
        index: usize,
        entity: String,
        attribute: String,
    },
    #[error(transparent)]
    Engine(#[from] EngineError),
}

fn at_path(path: &str) -> String {
    if path.is_empty() || path == "." {
        String::new()
    } else {
        format!(" at {path}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LevelFile {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) attributes: Vec<AttributeDecl>,
    pub(crate) entities: Vec<EntityDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct AttributeDecl {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) locked: bool,
    #[serde(default = "default_active")]
    pub(crate) active: bool,
    #[serde(default)]
    pub(crate) description: String,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct EntityDecl {
    pub(crate) name: String,
    pub(crate) position: [i32; 2],
    #[serde(default)]
    pub(crate) layer: Layer,
    #[serde(default)]
    pub(crate) attributes: Vec<String>,
    #[serde(default)]
    pub(crate) velocity: Option<Direction>,
}

/// A level ready to play plus the names the view shows for each entity.
#[derive(Debug)]
pub(crate) struct LoadedLevel {
    pub(crate) name: String,
    pub(crate) level: Level,
    pub(crate) entity_names: Vec<String>,
}

pub(crate) fn load_level_file(
    path: &Path,
    rules: RulesConfig,
) -> Result<LoadedLevel, LevelFileError> {
    let raw = fs::read_to_string(path).map_err(|source| LevelFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file = parse_level_json(&raw)?;
    let loaded = file.build(rules)?;
    info!(
        level = %loaded.name,
        path = %path.display(),
        entities = loaded.entity_names.len(),
        "level_loaded"
    );
    Ok(loaded)
}

pub(crate) fn parse_level_json(raw: &str) -> Result<LevelFile, LevelFileError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, LevelFile>(&mut deserializer).map_err(|error| {
        let path = error.path().to_string();
        LevelFileError::Parse {
            path,
            source: error.into_inner(),
        }
    })
}

impl LevelFile {
    pub(crate) fn build(&self, rules: RulesConfig) -> Result<LoadedLevel, LevelFileError> {
        let mut catalog = AttributeCatalog::new();
        for decl in &self.attributes {
            catalog.register(Attribute::with_flags(
                decl.name.as_str(),
                decl.locked,
                decl.active,
                decl.description.as_str(),
            ))?;
        }

        let mut entities = Vec::with_capacity(self.entities.len());
        for (index, decl) in self.entities.iter().enumerate() {
            let mut attributes = Vec::with_capacity(decl.attributes.len());
            let mut seen = HashSet::new();
            for name in &decl.attributes {
                let attribute = catalog.get(name).cloned().ok_or_else(|| {
                    LevelFileError::UnknownAttribute {
                        index,
                        entity: decl.name.clone(),
                        attribute: name.clone(),
                    }
                })?;
                if seen.insert(name.as_str()) {
                    attributes.push(attribute);
                }
            }
            let [x, y] = decl.position;
            entities.push(EntityState::new(
                EntityRef(index as u64),
                GridPos::new(x, y),
                decl.layer,
                decl.velocity,
                attributes,
            ));
        }

        let level = Level::new(entities, catalog, rules)?;
        Ok(LoadedLevel {
            name: self.name.clone(),
            level,
            entity_names: self.entities.iter().map(|decl| decl.name.clone()).collect(),
        })
    }
}
