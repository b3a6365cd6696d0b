/*
 * This module provides utility functions for path manipulation, focusing on
 * retrieving and ensuring the existence of application-specific directories.
 * It centralizes the directory logic shared by the config and profile stores.
 */
use directories::ProjectDirs;
use std::fs;
use std::path::PathBuf;

/*
 * Retrieves the application's primary local configuration directory.
 * This function determines the platform-specific path for local (non-roaming)
 * application configuration data and ensures the directory exists, creating
 * it if necessary. The path is derived without an organization qualifier,
 * placing it directly under the user's local application data structure.
 *
 * Returns `None` if the directory could not be determined or created.
 */
pub fn get_base_app_config_local_dir(app_name: &str) -> Option<PathBuf> {
    ProjectDirs::from("", "", app_name).and_then(|proj_dirs| {
        let config_path = proj_dirs.config_local_dir();
        if !config_path.exists() {
            if let Err(e) = fs::create_dir_all(config_path) {
                log::error!("PathUtils: failed to create app config directory {config_path:?}: {e}");
                return None;
            }
            log::debug!("PathUtils: created app config directory {config_path:?}");
        }
        Some(config_path.to_path_buf())
    })
}
