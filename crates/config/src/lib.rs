// Configuration loading

pub mod settings;

use std::path::PathBuf;

pub use settings::{ModeDisplay, Settings};

/// Environment variable that relocates the config directory (tests, CI).
pub const CONFIG_DIR_ENV: &str = "BESTIE_CONFIG_DIR";

/// Directory holding `settings.json` and `auth.json`.
///
/// `$BESTIE_CONFIG_DIR` if set, else `{config_dir}/bestie`.
pub fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bestie")
}
