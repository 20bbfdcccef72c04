// Application settings
// Loaded from ~/.config/bestie/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Which payment modes funding listings include for viewers allowed to see them.
///
/// Members only ever see live totals; this narrows what admins see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeDisplay {
    Live,
    Test,
    #[default]
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Store
    #[serde(rename = "store.url")]
    pub store_url: Option<String>,

    // Check-ins
    #[serde(rename = "checkin.timeZone")]
    pub time_zone: String,

    #[serde(rename = "checkin.milestones")]
    pub milestones: Vec<u32>,

    // Display
    #[serde(rename = "display.paymentMode")]
    pub payment_mode: ModeDisplay,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_url: None,
            time_zone: "America/Denver".to_string(),
            milestones: vec![3, 7, 14, 30, 60, 100, 365],
            payment_mode: ModeDisplay::All,
        }
    }
}

const DEFAULT_FILE: &str = r#"{
    // Hosted store base URL (login --url overrides this)
    "store.url": null,

    // Check-in day boundaries use this IANA zone
    "checkin.timeZone": "America/Denver",

    // Streak lengths worth celebrating, strictly ascending
    "checkin.milestones": [3, 7, 14, 30, 60, 100, 365],

    // Funding listings for admins: "live", "test" or "all"
    "display.paymentMode": "all"
}
"#;

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        crate::config_dir().join("settings.json")
    }

    /// Load settings from disk, falling back to defaults.
    /// Writes a commented default file on first run.
    pub fn load() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            let settings = Self::default();
            settings.create_default_file(&path);
            return settings;
        }

        Self::load_from(&path)
    }

    /// Load settings from an explicit path. Missing or invalid files yield defaults.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("error parsing {}: {}; using default settings", path.display(), e);
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                log::warn!("error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings JSON, ignoring lines that start with `//`.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned)
    }

    /// Save current settings to disk
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;

        fs::write(path, json).map_err(|e| e.to_string())
    }

    fn create_default_file(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("error creating config directory: {}", e);
                return;
            }
        }

        if let Err(e) = fs::write(path, DEFAULT_FILE) {
            log::warn!("error writing default settings.json: {}", e);
        }
    }

    /// Get the config file path for display/opening
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_file_parses_to_defaults() {
        assert_eq!(Settings::parse(DEFAULT_FILE).unwrap(), Settings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let settings = Settings::parse(
            r#"{
                // only the zone
                "checkin.timeZone": "Europe/Berlin"
            }"#,
        )
        .unwrap();
        assert_eq!(settings.time_zone, "Europe/Berlin");
        assert_eq!(settings.milestones, Settings::default().milestones);
        assert_eq!(settings.payment_mode, ModeDisplay::All);
    }

    #[test]
    fn invalid_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
        assert_eq!(Settings::load_from(&dir.path().join("missing.json")), Settings::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/settings.json");
        let settings = Settings {
            store_url: Some("https://store.test".into()),
            payment_mode: ModeDisplay::Live,
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"display.paymentMode\": \"live\""));
        assert_eq!(Settings::load_from(&path), settings);
    }

    #[test]
    fn mode_display_values() {
        let settings = Settings::parse(r#"{ "display.paymentMode": "test" }"#).unwrap();
        assert_eq!(settings.payment_mode, ModeDisplay::Test);
        assert!(Settings::parse(r#"{ "display.paymentMode": "sandbox" }"#).is_err());
    }
}
