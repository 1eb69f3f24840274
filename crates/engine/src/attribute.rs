use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::EngineError;

/// Attribute names the turn systems react to.
pub mod names {
    pub const PLAYER: &str = "Player";
    pub const PUSHABLE: &str = "Pushable";
    pub const MOVABLE: &str = "Movable";
    pub const BREAKABLE: &str = "Breakable";
    pub const PORTAL_A: &str = "Portal A";
    pub const PORTAL_B: &str = "Portal B";
    pub const WIN: &str = "Win";
    pub const MOVING_HORIZONTALLY: &str = "Moving Horizontally";
    pub const MOVING_VERTICALLY: &str = "Moving Vertically";
    pub const FLAMMABLE: &str = "Flammable";
    pub const BURNING: &str = "Burning";
    pub const UNEXTINGUISHABLE: &str = "Unextinguishable";
    pub const PERMANENT_FIRE: &str = "Permanent Fire";
}

#[derive(Debug)]
struct AttributeDef {
    name: String,
    locked: bool,
    active: bool,
    description: String,
}

/// Shared, immutable attribute value. Equality and hashing use the name
/// only, so copies handed out by different catalogs still compare equal.
#[derive(Clone)]
pub struct Attribute(Arc<AttributeDef>);

impl Attribute {
    /// An unlocked, active attribute with no description.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_flags(name, false, true, String::new())
    }

    pub fn with_flags(
        name: impl Into<String>,
        locked: bool,
        active: bool,
        description: impl Into<String>,
    ) -> Self {
        Self(Arc::new(AttributeDef {
            name: name.into(),
            locked,
            active,
            description: description.into(),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn is_locked(&self) -> bool {
        self.0.locked
    }

    pub fn is_active(&self) -> bool {
        self.0.active
    }

    pub fn description(&self) -> &str {
        &self.0.description
    }

    /// Whether the trade screen may move this attribute between entities.
    pub fn is_tradeable(&self) -> bool {
        self.0.active && !self.0.locked
    }
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.0.name == other.0.name
    }
}

impl Eq for Attribute {}

impl Hash for Attribute {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Attribute({:?})", self.0.name)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

/// Interning table for the attribute definitions of one ruleset.
#[derive(Debug, Default, Clone)]
pub struct AttributeCatalog {
    attributes: Vec<Attribute>,
    index_by_name: HashMap<String, usize>,
}

impl AttributeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, attribute: Attribute) -> Result<Attribute, EngineError> {
        if self.index_by_name.contains_key(attribute.name()) {
            return Err(EngineError::DuplicateAttribute {
                name: attribute.name().to_string(),
            });
        }
        self.index_by_name
            .insert(attribute.name().to_string(), self.attributes.len());
        self.attributes.push(attribute.clone());
        Ok(attribute)
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.index_by_name
            .get(name)
            .and_then(|index| self.attributes.get(*index))
    }

    /// Returns the registered definition, or a plain attribute carrying only
    /// the name when the ruleset never declared it.
    pub fn resolve(&self, name: &str) -> Attribute {
        self.get(name)
            .cloned()
            .unwrap_or_else(|| Attribute::new(name))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_flags_and_allocation() {
        let a = Attribute::with_flags("Burning", true, false, "hot");
        let b = Attribute::new("Burning");
        assert_eq!(a, b);
        assert_ne!(a, Attribute::new("Flammable"));
    }

    #[test]
    fn catalog_rejects_duplicate_names() {
        let mut catalog = AttributeCatalog::new();
        catalog
            .register(Attribute::new(names::PLAYER))
            .expect("first registration");
        let error = catalog
            .register(Attribute::with_flags(names::PLAYER, true, true, ""))
            .expect_err("duplicate should fail");
        assert!(matches!(error, EngineError::DuplicateAttribute { ref name } if name == "Player"));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn resolve_prefers_registered_definition() {
        let mut catalog = AttributeCatalog::new();
        catalog
            .register(Attribute::with_flags(names::BURNING, true, true, "on fire"))
            .expect("register");
        assert!(catalog.resolve(names::BURNING).is_locked());
        let unknown = catalog.resolve("Sticky");
        assert_eq!(unknown.name(), "Sticky");
        assert!(unknown.is_tradeable());
    }
}
