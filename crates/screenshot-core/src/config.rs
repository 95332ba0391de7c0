//! Runtime configuration for backend resolution
//!
//! There is no configuration file. [`CaptureConfig`] starts from defaults and
//! applies environment overrides:
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `SCREENSHOT_RS_BACKEND_DIR` | Search root for backend artifacts |
//! | `SCREENSHOT_RS_LIBRARY` | Library name for the convention loader |
//! | `SCREENSHOT_RS_SERIALIZE_CALLS` | `0`, `false`, `no` or `off` allow concurrent backend calls |

use std::env;
use std::path::PathBuf;

/// Environment variable overriding the artifact search root
pub const ENV_BACKEND_DIR: &str = "SCREENSHOT_RS_BACKEND_DIR";

/// Environment variable overriding the convention loader's library name
pub const ENV_LIBRARY: &str = "SCREENSHOT_RS_LIBRARY";

/// Environment variable toggling the backend call gate
pub const ENV_SERIALIZE_CALLS: &str = "SCREENSHOT_RS_SERIALIZE_CALLS";

/// Library name the convention loader looks for
pub const DEFAULT_LIBRARY_NAME: &str = "screenshot_rs";

/// Base file name of artifacts in the search root
pub const DEFAULT_ARTIFACT_BASE: &str = "screenshot_rs";

/// Settings for locating and driving the native backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Directory searched for platform-specific and local-build artifacts
    pub search_root:     PathBuf,
    /// Library name for the convention loader, without prefix or extension
    pub library_name:    String,
    /// Base name of artifacts in `search_root`
    pub artifact_base:   String,
    /// Funnel backend calls through a single in-flight gate
    pub serialize_calls: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            search_root:     default_search_root(),
            library_name:    DEFAULT_LIBRARY_NAME.to_string(),
            artifact_base:   DEFAULT_ARTIFACT_BASE.to_string(),
            serialize_calls: true,
        }
    }
}

impl CaptureConfig {
    /// Defaults with overrides from the process environment
    pub fn from_env() -> Self {
        Self::from_env_with(|key| env::var(key).ok())
    }

    /// Defaults with overrides from a custom environment provider
    ///
    /// Empty values are ignored.
    pub fn from_env_with<F>(env_provider: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| env_provider(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_BACKEND_DIR) {
            config.search_root = PathBuf::from(dir);
        }
        if let Some(name) = lookup(ENV_LIBRARY) {
            config.library_name = name.trim().to_string();
        }
        if let Some(flag) = lookup(ENV_SERIALIZE_CALLS) {
            config.serialize_calls = parse_flag(&flag).unwrap_or_else(|| {
                tracing::warn!(
                    "Ignoring {}={:?}; expected a boolean",
                    ENV_SERIALIZE_CALLS,
                    flag
                );
                true
            });
        }

        config
    }

    pub fn with_search_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.search_root = root.into();
        self
    }

    pub fn with_library_name(mut self, name: impl Into<String>) -> Self {
        self.library_name = name.into();
        self
    }

    pub fn with_serialize_calls(mut self, serialize: bool) -> Self {
        self.serialize_calls = serialize;
        self
    }
}

/// Directory holding the running executable, else the working directory
fn default_search_root() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    /// Helper function to create a mock environment provider
    fn mock_env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CaptureConfig::from_env_with(mock_env(&[]));

        assert_eq!(config.library_name, "screenshot_rs");
        assert_eq!(config.artifact_base, "screenshot_rs");
        assert!(config.serialize_calls);
        assert_eq!(config.search_root, default_search_root());
    }

    #[test]
    fn test_env_overrides() {
        let config = CaptureConfig::from_env_with(mock_env(&[
            (ENV_BACKEND_DIR, "/opt/screenshot"),
            (ENV_LIBRARY, "grabber"),
            (ENV_SERIALIZE_CALLS, "off"),
        ]));

        assert_eq!(config.search_root, PathBuf::from("/opt/screenshot"));
        assert_eq!(config.library_name, "grabber");
        assert!(!config.serialize_calls);
    }

    #[test]
    fn test_empty_values_are_ignored() {
        let config = CaptureConfig::from_env_with(mock_env(&[
            (ENV_BACKEND_DIR, ""),
            (ENV_LIBRARY, "   "),
        ]));

        assert_eq!(config.library_name, DEFAULT_LIBRARY_NAME);
        assert_eq!(config.search_root, default_search_root());
    }

    #[test]
    fn test_invalid_flag_keeps_gate_enabled() {
        let config = CaptureConfig::from_env_with(mock_env(&[(ENV_SERIALIZE_CALLS, "maybe")]));
        assert!(config.serialize_calls);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" 1 "), Some(true));
        assert_eq!(parse_flag("No"), Some(false));
        assert_eq!(parse_flag("2"), None);
    }

    #[test]
    fn test_from_process_env() {
        temp_env::with_vars(
            [
                (ENV_BACKEND_DIR, Some("/tmp/backends")),
                (ENV_SERIALIZE_CALLS, Some("false")),
                (ENV_LIBRARY, None),
            ],
            || {
                let config = CaptureConfig::from_env();
                assert_eq!(config.search_root, PathBuf::from("/tmp/backends"));
                assert!(!config.serialize_calls);
                assert_eq!(config.library_name, DEFAULT_LIBRARY_NAME);
            },
        );
    }

    #[test]
    fn test_builders() {
        let config = CaptureConfig::default()
            .with_search_root("/srv/shots")
            .with_library_name("custom")
            .with_serialize_calls(false);

        assert_eq!(config.search_root, PathBuf::from("/srv/shots"));
        assert_eq!(config.library_name, "custom");
        assert!(!config.serialize_calls);
    }
}
