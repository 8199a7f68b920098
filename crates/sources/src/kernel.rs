//! User and kernel fields

use anyhow::{anyhow, Result};
use std::env;
use std::path::Path;

use crate::format::indicator;
use crate::sysfs::list_dirs;

/// Login name of the current user
pub fn username() -> Result<String> {
    ["USER", "LOGNAME"]
        .iter()
        .find_map(|var| env::var(var).ok().filter(|name| !name.is_empty()))
        .ok_or_else(|| anyhow!("Neither USER nor LOGNAME is set"))
}

/// Newest installed kernel release: the greatest directory name under the
/// modules directory
pub fn latest_installed_release(modules_dir: &Path) -> Result<String> {
    list_dirs(modules_dir, |_, _| true)?
        .into_iter()
        .map(|(name, _)| name)
        .max()
        .ok_or_else(|| anyhow!("No installed kernels found in {}", modules_dir.display()))
}

/// 🔴 when the running kernel is not the newest installed one
pub fn outdated_kernel(modules_dir: &Path, running_release: &str) -> Result<String> {
    let latest = latest_installed_release(modules_dir)?;
    log::trace!("Running kernel {}, latest installed {}", running_release, latest);
    Ok(indicator(latest == running_release).to_string())
}
