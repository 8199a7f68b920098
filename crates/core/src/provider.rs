//! Field value provider trait and related types

use anyhow::Result;
use sbar_types::{Field, FieldSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// One instance of a composite's underlying resource (a disk, a battery, a
/// network interface, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entity {
    /// Identifier unique among the entities of one discovery
    pub id: String,
    /// Location of the device, when it has one
    pub path: Option<PathBuf>,
}

impl Entity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: None,
        }
    }

    pub fn with_path(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: Some(path.into()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Trait for everything that produces field values
///
/// Providers are responsible for reading system metrics (CPU, memory,
/// batteries, etc.) and enumerating the entities behind composite fields.
/// The assembler decides *when* a value is needed; providers only decide
/// *how* to read it.
pub trait FieldProvider {
    /// Called once at the start of every cycle with the fields that will be
    /// recomputed. Sources that batch their reads refresh here.
    fn prepare(&mut self, _dirty: FieldSet) {}

    /// Produce the current value of a leaf field.
    ///
    /// `entity` is the innermost entity being expanded, or `None` at the top
    /// level.
    fn get(&mut self, field: Field, entity: Option<&Entity>) -> Result<String>;

    /// Enumerate the entities of a composite field, in display order.
    ///
    /// `parent` is the enclosing entity for nested composites (the disk
    /// owning a partition list).
    fn discover(&mut self, composite: Field, parent: Option<&Entity>) -> Result<Vec<Entity>>;
}

impl<P: FieldProvider + ?Sized> FieldProvider for Box<P> {
    fn prepare(&mut self, dirty: FieldSet) {
        (**self).prepare(dirty)
    }

    fn get(&mut self, field: Field, entity: Option<&Entity>) -> Result<String> {
        (**self).get(field, entity)
    }

    fn discover(&mut self, composite: Field, parent: Option<&Entity>) -> Result<Vec<Entity>> {
        (**self).discover(composite, parent)
    }
}
