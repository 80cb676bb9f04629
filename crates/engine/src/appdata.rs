//! App data and configuration directory management for Arclight Engine
//
// This module handles creation of the app data directories and of the
// default subsystem configuration on first boot.

use anyhow::Context;
use directories::ProjectDirs;
use std::path::PathBuf;
use subsystem_manager::SubsystemConfig;

pub struct AppDataPaths {
    pub appdata_dir: PathBuf,
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
}

/// Set up app data directories and write the default subsystem configuration
/// if none exists yet.
pub fn setup_appdata() -> anyhow::Result<AppDataPaths> {
    let proj_dirs = ProjectDirs::from("com", "Arclight", "Arclight_Engine")
        .context("could not determine app data directory")?;
    let appdata_dir = proj_dirs.data_dir().to_path_buf();
    let config_dir = appdata_dir.join("configs");
    let config_file = config_dir.join("subsystems.toml");

    if !config_file.exists() {
        tracing::info!("Writing default subsystem configuration to {:?}", config_file);
        default_config()
            .save(&config_file)
            .context("failed to write default subsystem configuration")?;
    }

    Ok(AppDataPaths {
        appdata_dir,
        config_dir,
        config_file,
    })
}

/// The configuration a fresh install boots with: the stub subsystems shipped
/// in the workspace `plugins/` tree, scanned from the local `plugins`
/// directory.
pub fn default_config() -> SubsystemConfig {
    let mut config = SubsystemConfig {
        search_paths: vec![PathBuf::from("plugins")],
        ..Default::default()
    };
    for role in ["window_manager", "input", "ui"] {
        config
            .roles
            .insert(role.to_string(), vec!["headless_shell".to_string()]);
    }
    config
        .roles
        .insert("renderer".to_string(), vec!["forward_renderer".to_string()]);
    config
        .roles
        .insert("physics".to_string(), vec!["rigid_dynamics".to_string()]);
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use subsystem_api::Role;

    #[test]
    fn default_config_covers_the_stub_plugins() {
        let config = default_config();
        let assignments = config.role_assignments().expect("valid role keys");

        let roles: Vec<Role> = assignments.iter().map(|(role, _)| *role).collect();
        assert!(roles.contains(&Role::WINDOW_MANAGER));
        assert!(roles.contains(&Role::RENDERER));
        assert!(roles.contains(&Role::PHYSICS));
        // One multi-role shell serves window management, input, and UI.
        for (role, names) in assignments {
            if role.intersects(Role::WINDOW_MANAGER | Role::INPUT | Role::UI) {
                assert_eq!(names, ["headless_shell".to_string()]);
            }
        }
    }
}
