//! Loading the settings document from disk and overlaying environment
//! variables onto per-manager endpoints.

use std::path::Path;

use crate::error::ConfigError;
use crate::model::Settings;

/// Load and parse the YAML configuration at `path`. A missing file or
/// malformed YAML is a hard startup error; anything discovered afterward is a
/// warning (see [`crate::sanitize`]).
///
/// # Errors
///
/// Returns [`ConfigError::Read`] if the file cannot be read, or
/// [`ConfigError::Parse`] if its contents are not valid YAML.
pub fn load(path: &Path) -> Result<Settings, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
}

/// For every configured manager, let `<MANAGER>_URL` / `<MANAGER>_API_KEY`
/// environment variables win over the YAML-provided endpoint when present.
pub fn overlay_env(settings: &mut Settings) {
    overlay_env_with(settings, |key| std::env::var(key).ok());
}

/// Same as [`overlay_env`] but sourcing values through `lookup`, so tests can
/// exercise the precedence rule without mutating real process environment.
pub fn overlay_env_with(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    for (name, manager) in &mut settings.services {
        let prefix = name.to_uppercase();
        if let Some(url) = lookup(&format!("{prefix}_URL")) {
            manager.api_url = Some(url);
        }
        if let Some(key) = lookup(&format!("{prefix}_API_KEY")) {
            manager.api_key = Some(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_rejects_missing_file() {
        let err = load(Path::new("/nonexistent/janitor.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn load_rejects_malformed_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "services: [this is not a map").unwrap();
        let err = load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_parses_minimal_document() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "services:\n  Sonarr:\n    api_url: http://sonarr:8989\n").unwrap();
        let settings = load(file.path()).unwrap();
        assert_eq!(
            settings.services.get("Sonarr").unwrap().api_url.as_deref(),
            Some("http://sonarr:8989")
        );
    }

    #[test]
    fn env_overlay_wins_over_yaml() {
        let mut settings = Settings::default();
        settings.services.insert(
            "Radarr".to_string(),
            crate::model::ManagerConfig { api_url: Some("http://yaml".to_string()), ..Default::default() },
        );
        overlay_env_with(&mut settings, |key| {
            (key == "RADARR_URL").then(|| "http://env".to_string())
        });
        assert_eq!(settings.services.get("Radarr").unwrap().api_url.as_deref(), Some("http://env"));
    }
}
