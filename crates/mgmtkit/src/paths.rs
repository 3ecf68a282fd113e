//! Path resolution for the config file.
//!
//! The default config file lives at `~/.rabbitmqadmin.conf`. It is only read
//! when it exists and no explicit `--config` path was given.

use std::path::PathBuf;

/// File name of the default config file, relative to the home directory.
pub const CONFIG_FILE_NAME: &str = ".rabbitmqadmin.conf";

/// Default config file location, if a home directory can be determined.
pub fn default_config_file() -> Option<PathBuf> {
    let path = dirs::home_dir()?.join(CONFIG_FILE_NAME);
    log::debug!("Default config file: {}", path.display());
    Some(path)
}

/// Expand a leading `~` and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}
