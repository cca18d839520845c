//! Credentials for the source and destination APIs
//!
//! Secrets are stored separately from configuration to avoid accidental sharing.
//! The secrets file is located at `~/.config/byelinear/secrets.toml` and must have
//! restrictive permissions (0600 on Unix).
//!
//! Loading priority:
//! 1. Environment variables (LINEAR_API_KEY, GITHUB_TOKEN)
//! 2. Secrets file (~/.config/byelinear/secrets.toml)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Secrets structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Secrets {
    /// Linear configuration
    pub linear: LinearSecrets,

    /// GitHub configuration
    pub github: GitHubSecrets,
}

/// Linear-related secrets
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LinearSecrets {
    /// Linear personal API key
    pub api_key: Option<String>,
}

/// GitHub-related secrets
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubSecrets {
    /// GitHub Personal Access Token
    pub token: Option<String>,
}

impl Secrets {
    /// Load secrets from the default location
    ///
    /// Returns default (empty) secrets if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_secrets_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load secrets from a specific file, refusing one others can read
    pub fn load_from_file(path: &Path) -> Result<Self> {
        ensure_private(path)?;

        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        let mut secrets: Secrets = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        for value in [&mut secrets.linear.api_key, &mut secrets.github.token] {
            if let Some(v) = value {
                *v = v.trim().to_string();
            }
        }

        Ok(secrets)
    }

    /// Get the default secrets file path
    ///
    /// Returns `~/.config/byelinear/secrets.toml` on Unix
    pub fn default_secrets_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("byelinear").join("secrets.toml"))
    }

    /// Linear API key; LINEAR_API_KEY wins over the secrets file
    pub fn linear_api_key(&self) -> Option<String> {
        resolve(
            "LINEAR_API_KEY",
            std::env::var("LINEAR_API_KEY").ok(),
            self.linear.api_key.as_deref(),
        )
    }

    /// GitHub token; GITHUB_TOKEN wins over the secrets file
    pub fn github_token(&self) -> Option<String> {
        resolve(
            "GITHUB_TOKEN",
            std::env::var("GITHUB_TOKEN").ok(),
            self.github.token.as_deref(),
        )
    }
}

fn resolve(var: &str, from_env: Option<String>, from_file: Option<&str>) -> Option<String> {
    if let Some(token) = from_env.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
        debug!(var, "Using credential from environment");
        return Some(token);
    }

    from_file.filter(|t| !t.is_empty()).map(|t| {
        debug!(var, "Using credential from secrets file");
        t.to_string()
    })
}

/// Reject a credentials file that group or others can read
#[cfg(unix)]
fn ensure_private(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = std::fs::metadata(path).map_err(Error::Io)?.permissions().mode() & 0o777;
    if mode & 0o077 != 0 {
        return Err(Error::Config(format!(
            "{} is mode {:o} but holds credentials; chmod 600 it first",
            path.display(),
            mode
        )));
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_private(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_secrets() {
        let secrets = Secrets::default();
        assert!(secrets.github.token.is_none());
        assert!(secrets.linear.api_key.is_none());
    }

    #[test]
    fn test_parse_secrets() {
        let toml = r#"
[linear]
api_key = "lin_api_xxxx"

[github]
token = "ghp_xxxxxxxxxxxx"
"#;
        let secrets: Secrets = toml::from_str(toml).unwrap();
        assert_eq!(secrets.linear.api_key, Some("lin_api_xxxx".to_string()));
        assert_eq!(secrets.github.token, Some("ghp_xxxxxxxxxxxx".to_string()));
    }

    #[test]
    fn test_env_wins_over_file() {
        assert_eq!(
            resolve("X", Some(" from_env ".to_string()), Some("from_file")),
            Some("from_env".to_string())
        );
        assert_eq!(
            resolve("X", Some("   ".to_string()), Some("from_file")),
            Some("from_file".to_string())
        );
        assert_eq!(resolve("X", None, Some("")), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_insecure_permissions_rejected() {
        use std::os::unix::fs::PermissionsExt;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[github]\ntoken = \"ghp_test\"").unwrap();
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o640)).unwrap();

        let err = Secrets::load_from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("mode 640"));
    }

    #[cfg(unix)]
    #[test]
    fn test_secure_permissions_accepted_and_trimmed() {
        use std::os::unix::fs::PermissionsExt;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[linear]\napi_key = \"  lin_key  \"").unwrap();

        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o600)).unwrap();

        let secrets = Secrets::load_from_file(file.path()).unwrap();
        assert_eq!(secrets.linear.api_key, Some("lin_key".to_string()));
    }
}
