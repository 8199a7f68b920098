//! Last rendered value of every field, per entity

use sbar_types::Field;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Chain of entities enclosing a value, outermost first.
///
/// Each step records the composite it was discovered by, so ids only need to
/// be unique among siblings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct EntityPath(Vec<(Field, String)>);

impl EntityPath {
    /// The top level, outside any composite
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(&self, composite: Field, id: &str) -> Self {
        let mut steps = self.0.clone();
        steps.push((composite, id.to_string()));
        Self(steps)
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn starts_with(&self, prefix: &EntityPath) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for EntityPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for (composite, id) in &self.0 {
            write!(f, "/{}:{}", composite, id)?;
        }
        Ok(())
    }
}

/// Cache key: a field within an entity path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub field: Field,
    pub entity: EntityPath,
}

impl CacheKey {
    pub fn new(field: Field, entity: EntityPath) -> Self {
        Self { field, entity }
    }

    pub fn root(field: Field) -> Self {
        Self::new(field, EntityPath::root())
    }
}

/// Cached strings plus the entity membership of every expanded composite
#[derive(Debug, Default)]
pub struct FieldCache {
    values: HashMap<CacheKey, String>,
    members: HashMap<CacheKey, Vec<String>>,
}

impl FieldCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: CacheKey, value: String) {
        self.values.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.members.clear();
    }

    /// Record the entities a composite just expanded into and evict every
    /// entry belonging to entities that are gone.
    ///
    /// Returns the number of evicted values.
    pub fn update_members(&mut self, composite: &CacheKey, ids: Vec<String>) -> usize {
        let previous = self.members.insert(composite.clone(), ids);
        let Some(previous) = previous else {
            return 0;
        };

        let current: HashSet<&String> = self.members[composite].iter().collect();
        let gone: Vec<EntityPath> = previous
            .iter()
            .filter(|id| !current.contains(id))
            .map(|id| composite.entity.child(composite.field, id))
            .collect();
        if gone.is_empty() {
            return 0;
        }

        let before = self.values.len();
        self.values
            .retain(|key, _| !gone.iter().any(|prefix| key.entity.starts_with(prefix)));
        self.members
            .retain(|key, _| !gone.iter().any(|prefix| key.entity.starts_with(prefix)));
        before - self.values.len()
    }

    /// Entities recorded for a composite on its last expansion
    pub fn members(&self, composite: &CacheKey) -> Option<&[String]> {
        self.members.get(composite).map(Vec::as_slice)
    }
}
