//! Credential storage.
//!
//! Reads/writes {config_dir}/bestie/auth.json (0600 on Unix).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Authentication credentials stored locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthCredentials {
    /// Store base URL (e.g., "https://abc.supabase.co")
    pub api_base: String,
    /// Public project key, sent as `apikey`
    pub api_key: String,
    /// Session token; the project key is used as bearer when absent
    #[serde(default)]
    pub token: Option<String>,
    /// Account id (default viewer)
    #[serde(default)]
    pub user_id: Option<String>,
    /// Account email (for display and guest claims)
    #[serde(default)]
    pub email: Option<String>,
}

impl AuthCredentials {
    pub fn new(api_base: String, api_key: String) -> Self {
        Self {
            api_base,
            api_key,
            token: None,
            user_id: None,
            email: None,
        }
    }
}

/// Returns the path to the auth credentials file.
pub fn auth_file_path() -> PathBuf {
    bestie_config::config_dir().join("auth.json")
}

/// Load saved auth credentials.
/// Returns None if no credentials are saved or if the file is invalid.
pub fn load_auth() -> Option<AuthCredentials> {
    load_auth_from(&auth_file_path())
}

pub fn load_auth_from(path: &Path) -> Option<AuthCredentials> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(creds) => Some(creds),
        Err(e) => {
            log::warn!("ignoring invalid {}: {}", path.display(), e);
            None
        }
    }
}

/// Save auth credentials to the default location.
pub fn save_auth(creds: &AuthCredentials) -> Result<PathBuf, StoreError> {
    let path = auth_file_path();
    save_auth_to(&path, creds)?;
    Ok(path)
}

/// Creates the parent directory if needed. Sets 0600 permissions on Unix.
pub fn save_auth_to(path: &Path, creds: &AuthCredentials) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| StoreError::Io(format!("failed to create config directory: {e}")))?;
    }

    let contents = serde_json::to_string_pretty(creds)
        .map_err(|e| StoreError::Parse(format!("failed to serialize credentials: {e}")))?;

    std::fs::write(path, &contents)
        .map_err(|e| StoreError::Io(format!("failed to write auth file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions)
            .map_err(|e| StoreError::Io(format!("failed to set file permissions: {e}")))?;
    }

    Ok(())
}

/// Delete saved auth credentials. Returns whether a file was removed.
pub fn delete_auth() -> Result<bool, StoreError> {
    let path = auth_file_path();
    if !path.exists() {
        return Ok(false);
    }
    std::fs::remove_file(&path)
        .map_err(|e| StoreError::Io(format!("failed to delete auth file: {e}")))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_optional_fields() {
        let json = r#"{"api_base":"https://store.test","api_key":"anon"}"#;
        let parsed: AuthCredentials = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, AuthCredentials::new("https://store.test".into(), "anon".into()));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bestie/auth.json");

        let creds = AuthCredentials {
            token: Some("tok123".into()),
            user_id: Some("u_1".into()),
            email: Some("alice@example.com".into()),
            ..AuthCredentials::new("https://store.test".into(), "anon".into())
        };
        save_auth_to(&path, &creds).unwrap();
        assert_eq!(load_auth_from(&path), Some(creds));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_invalid_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        std::fs::write(&path, r#"{"token":"only"}"#).unwrap();
        assert!(load_auth_from(&path).is_none());
        assert!(load_auth_from(&dir.path().join("missing.json")).is_none());
    }

    #[test]
    fn test_auth_file_path_name() {
        assert!(auth_file_path().ends_with("auth.json"));
    }
}
