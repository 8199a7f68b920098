//! Dirty-set protocol: which fields a cycle must recompute

use log::{debug, warn};
use sbar_types::FieldSet;
use std::fmt;

/// What triggered a refresh cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshSource {
    /// The periodic deadline passed
    Tick,
    /// The notification file was written with this payload
    Notification(String),
}

impl fmt::Display for RefreshSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshSource::Tick => f.write_str("tick"),
            RefreshSource::Notification(payload) => write!(f, "notification {:?}", payload.trim()),
        }
    }
}

/// Dirty set for one cycle.
///
/// A tick recomputes everything. A notification recomputes what its payload
/// names; a payload that does not decode recomputes nothing.
pub fn next_dirty_set(source: &RefreshSource) -> FieldSet {
    match source {
        RefreshSource::Tick => FieldSet::ALL,
        RefreshSource::Notification(payload) => match FieldSet::decode(payload) {
            Ok(set) => {
                debug!("Notification marks {} fields dirty", set.len());
                set
            }
            Err(e) => {
                warn!("Ignoring notification: {}", e);
                FieldSet::NONE
            }
        },
    }
}

/// Every field a dirty set causes to be touched.
///
/// A dirty composite recomputes all of its sub-fields, and a composite whose
/// subtree holds a dirty field must be expanded again to reach it.
pub fn expand_dirty(dirty: FieldSet) -> FieldSet {
    let mut expanded = dirty;
    for field in dirty.iter() {
        if field.is_composite() {
            expanded |= field.subtree();
        }
        let mut owner = field.parent();
        while let Some(parent) = owner {
            expanded |= parent;
            owner = parent.parent();
        }
    }
    expanded
}
