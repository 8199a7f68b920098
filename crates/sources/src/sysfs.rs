//! Small readers for sysfs/procfs attribute files

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// First line of an attribute file, trimmed
pub fn read_attr(path: &Path) -> Result<String> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(contents.lines().next().unwrap_or("").trim().to_string())
}

/// Attribute holding a single unsigned integer
pub fn read_u64(path: &Path) -> Result<u64> {
    let value = read_attr(path)?;
    value
        .parse()
        .with_context(|| format!("Invalid number {:?} in {}", value, path.display()))
}

/// Attribute holding a 0/1 flag
pub fn read_flag(path: &Path) -> Result<bool> {
    match read_attr(path)?.as_str() {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(anyhow!("Invalid flag {:?} in {}", other, path.display())),
    }
}

/// Subdirectories of `dir` accepted by `keep`, sorted by name.
///
/// Entries are followed through symlinks, which is how `/sys/class` exposes
/// its devices.
pub fn list_dirs<F>(dir: &Path, mut keep: F) -> Result<Vec<(String, PathBuf)>>
where
    F: FnMut(&str, &Path) -> bool,
{
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))?;

    let mut dirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        if keep(&name, &path) {
            dirs.push((name, path));
        }
    }
    dirs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_attr_takes_first_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("status");
        fs::write(&path, "Discharging\nextra\n").unwrap();
        assert_eq!(read_attr(&path).unwrap(), "Discharging");
    }

    #[test]
    fn test_read_numbers_and_flags() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("size"), "1000215216\n").unwrap();
        fs::write(dir.path().join("ro"), "1\n").unwrap();
        fs::write(dir.path().join("bad"), "yes\n").unwrap();

        assert_eq!(read_u64(&dir.path().join("size")).unwrap(), 1000215216);
        assert!(read_flag(&dir.path().join("ro")).unwrap());
        assert!(read_flag(&dir.path().join("bad")).is_err());
        assert!(read_u64(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_list_dirs_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        for name in ["sdb", "loop0", "sda"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("file"), "").unwrap();

        let names: Vec<String> = list_dirs(dir.path(), |name, _| !name.starts_with("loop"))
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["sda", "sdb"]);
    }
}
