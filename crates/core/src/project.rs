//! Project metadata.

use std::path::Path;

use crate::{Error, Result};

/// File holding the project version.
pub const VERSION_FILE: &str = "version.txt";

/// Read the project version from `version.txt` in `project_dir`.
///
/// Returns `Ok(None)` if the file does not exist.
///
/// # Errors
///
/// Returns an I/O error if the file exists but cannot be read, and a
/// configuration error if it is blank.
pub fn read_version(project_dir: &Path) -> Result<Option<String>> {
    let path = project_dir.join(VERSION_FILE);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::io(e, Some(path), "read project version")),
    };
    let version = content.trim();
    if version.is_empty() {
        return Err(Error::configuration(format!(
            "{} is empty",
            path.display()
        )));
    }
    Ok(Some(version.to_string()))
}
