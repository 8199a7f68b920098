//! Fixed strings rendered in place of a value

/// Rendered when a field has never been computed
pub const NULL_MARKER: &str = "";

/// Rendered when a provider fails to produce a value
pub const ERROR_MARKER: &str = "n/a";

/// Rendered when a value needs more than one sample (rates, deltas)
pub const STANDBY_MARKER: &str = "--";
