//! sbar-core: Status assembly for the sbar status line.
//!
//! This crate contains the token registry, the format-string compiler, the
//! [`FieldProvider`] trait, the per-entity field cache and the
//! [`StatusAssembler`] that ties them together, plus shared constants.

pub mod assembler;
pub mod cache;
pub mod constants;
pub mod dirty;
pub mod formats;
mod provider;
pub mod registry;
pub mod template;

pub use assembler::{CycleStats, StatusAssembler};
pub use cache::{CacheKey, EntityPath, FieldCache};
pub use constants::{
    BYTES_PER_GB, BYTES_PER_KB, BYTES_PER_MB, BYTES_PER_TB, DEFAULT_NOTIFY_PATH,
    DEFAULT_TICK_INTERVAL, DEFAULT_WAIT_TIMEOUT, SECTOR_SIZE,
};
pub use dirty::{expand_dirty, next_dirty_set, RefreshSource};
pub use formats::FormatConfig;
pub use provider::{Entity, FieldProvider};
pub use registry::Scope;
pub use template::{compile, compile_scope, Segment, Template, ESCAPE};

// Re-export types used in trait signatures for convenience
pub use sbar_types::{Field, FieldSet};
