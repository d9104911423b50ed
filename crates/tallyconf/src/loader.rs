//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, TallyConfig};
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli).
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/tally/config.toml");
    if system.exists() {
        files.push(system);
    }

    // User config (XDG_CONFIG_HOME or ~/.config)
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("tally/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    // CLI override takes precedence over local
    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("tally.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Load and layer the given files on top of compiled defaults.
///
/// Tables are merged key by key, so a later file only needs to mention the
/// values it changes.
pub fn load_files(files: &[PathBuf]) -> Result<(TallyConfig, ConfigSources), ConfigError> {
    let mut sources = ConfigSources::default();
    let mut merged = toml::Table::new();

    for path in files {
        let table = read_table(path)?;
        merge_tables(&mut merged, table);
        sources.files.push(path.clone());
    }

    let config = toml::Value::Table(merged)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Parse {
            path: files.last().cloned().unwrap_or_default(),
            message: e.to_string(),
        })?;

    Ok((config, sources))
}

/// Load config from a single TOML file.
pub fn load_from_file(path: &Path) -> Result<TallyConfig, ConfigError> {
    let (config, _) = load_files(&[path.to_path_buf()])?;
    Ok(config)
}

fn read_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Merge `overlay` into `base`; nested tables merge, everything else replaces.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Apply environment variable overrides to config.
///
/// `lookup` is normally `std::env::var(..).ok()`; tests pass a map instead.
pub fn apply_env_overrides<F>(config: &mut TallyConfig, sources: &mut ConfigSources, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("TALLY_STATS_ENDPOINT") {
        config.infra.bind.stats_endpoint = v;
        sources.env_overrides.push("TALLY_STATS_ENDPOINT".to_string());
    }

    if let Some(v) = lookup("TALLY_STATS_ENABLED") {
        if let Some(enabled) = parse_bool(&v) {
            config.infra.statistics.enabled = enabled;
            sources.env_overrides.push("TALLY_STATS_ENABLED".to_string());
        }
    }

    if let Some(v) = lookup("TALLY_PROVIDER_TIMEOUT_MS") {
        if let Ok(ms) = v.parse() {
            config.infra.statistics.provider_timeout_ms = ms;
            sources.env_overrides.push("TALLY_PROVIDER_TIMEOUT_MS".to_string());
        }
    }

    if let Some(v) = lookup("TALLY_LOG_LEVEL") {
        config.infra.telemetry.log_level = v;
        sources.env_overrides.push("TALLY_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Some(v) = lookup("RUST_LOG") {
        config.infra.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn write_config(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_discover_config_files() {
        // Just verify it doesn't panic
        let _files = discover_config_files();
    }

    #[test]
    fn test_parse_minimal_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "tally.toml",
            r#"
[bind]
stats_endpoint = "tcp://127.0.0.1:4444"
"#,
        );

        let config = load_from_file(&path).unwrap();
        assert_eq!(config.infra.bind.stats_endpoint, "tcp://127.0.0.1:4444");
        // Other values should be defaults
        assert_eq!(config.infra.telemetry.log_level, "info");
        assert!(config.infra.statistics.enabled);
    }

    #[test]
    fn test_parse_full_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "tally.toml",
            r#"
[bind]
stats_endpoint = "tcp://*:5000"

[telemetry]
log_level = "debug"

[statistics]
enabled = false
provider_timeout_ms = 1500

[services.audio]
app_name = "audio@1"
description = "audio transcoding"
instance = "main"
hosts_url = "http://localhost/hosts"
control_port = 5001

[services.video]
app_name = "video@2"
"#,
        );

        let config = load_from_file(&path).unwrap();
        assert_eq!(config.infra.bind.stats_endpoint, "tcp://*:5000");
        assert_eq!(config.infra.telemetry.log_level, "debug");
        assert!(!config.infra.statistics.enabled);
        assert_eq!(config.infra.statistics.provider_timeout_ms, 1500);

        assert_eq!(config.services.len(), 2);
        let audio = &config.services["audio"];
        assert_eq!(audio.app_name, "audio@1");
        assert_eq!(audio.control_port, 5001);
        assert_eq!(config.services["video"].app_name, "video@2");
    }

    #[test]
    fn test_later_files_win_key_by_key() {
        let dir = tempfile::tempdir().unwrap();
        let system = write_config(
            &dir,
            "system.toml",
            r#"
[bind]
stats_endpoint = "tcp://*:4000"

[statistics]
provider_timeout_ms = 100

[services.audio]
app_name = "audio@1"
"#,
        );
        let local = write_config(
            &dir,
            "local.toml",
            r#"
[statistics]
enabled = false

[services.audio]
instance = "canary"
"#,
        );

        let (config, sources) = load_files(&[system.clone(), local.clone()]).unwrap();
        assert_eq!(sources.files, vec![system, local]);
        assert_eq!(config.infra.bind.stats_endpoint, "tcp://*:4000");
        assert_eq!(config.infra.statistics.provider_timeout_ms, 100);
        assert!(!config.infra.statistics.enabled);
        assert_eq!(config.services["audio"].app_name, "audio@1");
        assert_eq!(config.services["audio"].instance, "canary");
    }

    #[test]
    fn test_invalid_toml_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "broken.toml", "[bind\nstats_endpoint = 1");

        match load_from_file(&path) {
            Err(ConfigError::Parse { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let result = load_from_file(Path::new("/nonexistent/tally.toml"));
        assert!(matches!(result, Err(ConfigError::FileRead { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TALLY_STATS_ENDPOINT", "tcp://0.0.0.0:7000"),
            ("TALLY_STATS_ENABLED", "off"),
            ("TALLY_PROVIDER_TIMEOUT_MS", "not-a-number"),
            ("TALLY_LOG_LEVEL", "trace"),
        ]
        .into_iter()
        .collect();

        let mut config = TallyConfig::default();
        let mut sources = ConfigSources::default();
        apply_env_overrides(&mut config, &mut sources, |key| {
            env.get(key).map(|v| v.to_string())
        });

        assert_eq!(config.infra.bind.stats_endpoint, "tcp://0.0.0.0:7000");
        assert!(!config.infra.statistics.enabled);
        assert_eq!(config.infra.statistics.provider_timeout_ms, 0);
        assert_eq!(config.infra.telemetry.log_level, "trace");
        assert_eq!(
            sources.env_overrides,
            vec!["TALLY_STATS_ENDPOINT", "TALLY_STATS_ENABLED", "TALLY_LOG_LEVEL"]
        );
    }
}
