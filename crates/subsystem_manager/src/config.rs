//! Subsystem configuration.
//!
//! The manager treats configuration as a read-only data source: which
//! directories to scan, what file extension marks a candidate library, the
//! name of the registration symbol, and the ordered candidate names desired
//! for each role (primary first).

use crate::SubsystemManagerError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use subsystem_api::Role;

/// The shared-library extension for the current platform.
pub fn platform_library_extension() -> &'static str {
    #[cfg(target_os = "windows")]
    {
        "dll"
    }
    #[cfg(target_os = "macos")]
    {
        "dylib"
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        "so"
    }
}

/// Configuration for subsystem discovery and role assignment.
///
/// Serialized as TOML, e.g.:
///
/// ```toml
/// search_paths = ["plugins"]
/// library_extension = "so"
/// registration_symbol = "_subsystem_create"
///
/// [roles]
/// window_manager = ["headless_shell"]
/// input = ["headless_shell"]
/// renderer = ["forward_renderer"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubsystemConfig {
    /// Directories scanned for candidate libraries
    pub search_paths: Vec<PathBuf>,

    /// File extension marking a candidate, without the leading dot
    pub library_extension: String,

    /// Name of the registration entry point resolved in every candidate
    pub registration_symbol: String,

    /// Per-role ordered list of desired subsystem names, primary first.
    /// Keys are role configuration keys ("window_manager", "input", ...).
    pub roles: BTreeMap<String, Vec<String>>,
}

impl Default for SubsystemConfig {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            library_extension: platform_library_extension().to_string(),
            registration_symbol: subsystem_api::CREATE_SYMBOL.to_string(),
            roles: BTreeMap::new(),
        }
    }
}

impl SubsystemConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, SubsystemManagerError> {
        let text = fs::read_to_string(path).map_err(|e| SubsystemManagerError::Configuration {
            message: format!("cannot read {:?}: {}", path, e),
        })?;
        toml::from_str(&text).map_err(|e| SubsystemManagerError::Configuration {
            message: format!("malformed configuration {:?}: {}", path, e),
        })
    }

    /// Write configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), SubsystemManagerError> {
        let text = toml::to_string_pretty(self).map_err(|e| {
            SubsystemManagerError::Configuration {
                message: format!("cannot serialize configuration: {}", e),
            }
        })?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SubsystemManagerError::Configuration {
                message: format!("cannot create {:?}: {}", parent, e),
            })?;
        }
        fs::write(path, text).map_err(|e| SubsystemManagerError::Configuration {
            message: format!("cannot write {:?}: {}", path, e),
        })
    }

    /// The configured role table with keys parsed into role bits, in
    /// deterministic (key-sorted) order. Roles with an empty candidate list
    /// are skipped; an unknown role key is a configuration error.
    pub fn role_assignments(&self) -> Result<Vec<(Role, &[String])>, SubsystemManagerError> {
        let mut assignments = Vec::new();
        for (key, names) in &self.roles {
            let role = Role::from_config_key(key).ok_or_else(|| {
                SubsystemManagerError::Configuration {
                    message: format!("unknown role key '{}' in [roles] table", key),
                }
            })?;
            if names.is_empty() {
                continue;
            }
            assignments.push((role, names.as_slice()));
        }
        Ok(assignments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_platform_extension_and_fixed_symbol() {
        let config = SubsystemConfig::default();
        assert_eq!(config.library_extension, platform_library_extension());
        assert_eq!(config.registration_symbol, subsystem_api::CREATE_SYMBOL);
        assert!(config.search_paths.is_empty());
        assert!(config.role_assignments().expect("valid").is_empty());
    }

    #[test]
    fn parses_role_table() {
        let config: SubsystemConfig = toml::from_str(
            r#"
            search_paths = ["plugins"]
            library_extension = "so"

            [roles]
            window_manager = ["shell"]
            input = ["shell"]
            renderer = ["gl", "fallback_gl"]
            audio = []
            "#,
        )
        .expect("valid toml");

        let assignments = config.role_assignments().expect("valid roles");
        // BTreeMap order: input, renderer, window_manager; empty audio skipped.
        assert_eq!(assignments.len(), 3);
        assert_eq!(assignments[0].0, Role::INPUT);
        assert_eq!(assignments[1].0, Role::RENDERER);
        assert_eq!(assignments[1].1, ["gl".to_string(), "fallback_gl".to_string()]);
        assert_eq!(assignments[2].0, Role::WINDOW_MANAGER);
    }

    #[test]
    fn unknown_role_key_is_a_configuration_error() {
        let config: SubsystemConfig = toml::from_str(
            r#"
            [roles]
            teleporter = ["warp_drive"]
            "#,
        )
        .expect("valid toml");

        assert!(matches!(
            config.role_assignments(),
            Err(SubsystemManagerError::Configuration { .. })
        ));
    }

    #[test]
    fn round_trips_through_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("configs").join("subsystems.toml");

        let mut config = SubsystemConfig {
            search_paths: vec![PathBuf::from("plugins")],
            ..Default::default()
        };
        config
            .roles
            .insert("physics".to_string(), vec!["rigid_dynamics".to_string()]);

        config.save(&path).expect("save");
        let loaded = SubsystemConfig::load(&path).expect("load");

        assert_eq!(loaded.search_paths, config.search_paths);
        assert_eq!(loaded.roles, config.roles);
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let result = SubsystemConfig::load(Path::new("/nonexistent/subsystems.toml"));
        assert!(matches!(
            result,
            Err(SubsystemManagerError::Configuration { .. })
        ));
    }
}
