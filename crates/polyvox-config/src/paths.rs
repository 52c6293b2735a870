//! Platform-specific configuration paths.
//!
//! # Directory Structure
//!
//! - **User config**: `~/.config/polyvox/` (Linux),
//!   `~/Library/Application Support/polyvox/` (macOS), `%APPDATA%\polyvox\`
//!   (Windows)
//! - **Default file**: `polyvox.toml` inside the user config directory
//!
//! # Example
//!
//! ```rust,no_run
//! use polyvox_config::paths;
//!
//! if let Some(path) = paths::find_config(None) {
//!     println!("Using config at: {:?}", path);
//! }
//! ```

use std::path::{Path, PathBuf};

use crate::ConfigError;

/// Application name used for directory paths.
const APP_NAME: &str = "polyvox";

/// File name of the default configuration.
pub const CONFIG_FILE_NAME: &str = "polyvox.toml";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path under `.` if the config directory cannot be
/// determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the path of the default configuration file (which may not exist).
pub fn user_config_file() -> PathBuf {
    user_config_dir().join(CONFIG_FILE_NAME)
}

/// Ensure the user config directory exists, creating parents as needed.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_user_config_dir() -> Result<PathBuf, crate::ConfigError> {
    let dir = user_config_dir();
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| ConfigError::create_dir(&dir, e))?;
    }
    Ok(dir)
}

/// Find a config file.
///
/// With `Some(name)`, `name` may be a path to an existing file, or a bare
/// name (with or without `.toml`) looked up in the user config directory.
/// With `None`, the default file is returned if it exists.
pub fn find_config(name: Option<&str>) -> Option<PathBuf> {
    match name {
        Some(name) => find_in(name, &user_config_dir()),
        None => Some(user_config_file()).filter(|p| p.is_file()),
    }
}

fn find_in(name: &str, dir: &Path) -> Option<PathBuf> {
    let path = PathBuf::from(name);
    if path.is_file() {
        return Some(path);
    }

    let filename = if name.ends_with(".toml") {
        name.to_string()
    } else {
        format!("{name}.toml")
    };
    let candidate = dir.join(filename);
    candidate.is_file().then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_user_config_dir() {
        let dir = user_config_dir();
        assert!(dir.to_string_lossy().contains("polyvox"));
        assert!(user_config_file().ends_with(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_find_config_by_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("studio.toml");
        fs::write(&path, "").unwrap();

        let found = find_config(path.to_str());
        assert_eq!(found, Some(path));
    }

    #[test]
    fn test_find_bare_name_in_dir() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("live.toml"), "").unwrap();

        assert_eq!(
            find_in("live", temp_dir.path()),
            Some(temp_dir.path().join("live.toml"))
        );
        assert_eq!(
            find_in("live.toml", temp_dir.path()),
            Some(temp_dir.path().join("live.toml"))
        );
        assert_eq!(find_in("missing", temp_dir.path()), None);
    }

    #[test]
    fn test_find_config_not_found() {
        assert!(find_config(Some("nonexistent_config_12345")).is_none());
    }
}
