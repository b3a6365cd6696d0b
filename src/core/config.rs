/*
 * Manages application-level settings that outlive any single project: the
 * list of recently packed root folders, most recent first. The core never
 * touches persistent storage directly; callers inject this collaborator
 * where recency data is wanted.
 *
 * A trait-based approach (`ConfigManagerOperations`) allows different
 * storage backends or mock implementations for testing. The concrete
 * `CoreConfigManager` stores one path per line in a plain text file under
 * the platform config directory.
 */
use crate::core::path_utils;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

const RECENT_ROOTS_FILENAME: &str = "recent_roots.txt";
const MAX_RECENT_ROOTS: usize = 10;

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    NoConfigDirectory,
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Configuration I/O error: {e}"),
            ConfigError::NoConfigDirectory => {
                write!(f, "Could not determine configuration directory")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

pub trait ConfigManagerOperations: Send + Sync {
    /*
     * Returns the recently packed root folders, most recent first. A missing
     * or empty store yields an empty list, not an error.
     */
    fn load_recent_roots(&self, app_name: &str) -> Result<Vec<PathBuf>>;

    /*
     * Records `root` as the most recent folder, deduplicating any earlier
     * occurrence and trimming the list to its cap.
     */
    fn record_recent_root(&self, app_name: &str, root: &Path) -> Result<()>;
}

pub struct CoreConfigManager {}

impl CoreConfigManager {
    pub fn new() -> Self {
        CoreConfigManager {}
    }
}

impl Default for CoreConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManagerOperations for CoreConfigManager {
    fn load_recent_roots(&self, app_name: &str) -> Result<Vec<PathBuf>> {
        let config_dir = path_utils::get_base_app_config_local_dir(app_name)
            .ok_or(ConfigError::NoConfigDirectory)?;
        let file_path = config_dir.join(RECENT_ROOTS_FILENAME);

        if !file_path.exists() {
            log::debug!("ConfigManager: recent roots file {file_path:?} does not exist.");
            return Ok(Vec::new());
        }

        let mut file = File::open(&file_path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
            .collect())
    }

    fn record_recent_root(&self, app_name: &str, root: &Path) -> Result<()> {
        let mut recents = self.load_recent_roots(app_name)?;
        recents.retain(|existing| existing != root);
        recents.insert(0, root.to_path_buf());
        recents.truncate(MAX_RECENT_ROOTS);

        let config_dir = path_utils::get_base_app_config_local_dir(app_name)
            .ok_or(ConfigError::NoConfigDirectory)?;
        let file_path = config_dir.join(RECENT_ROOTS_FILENAME);

        let mut file = File::create(&file_path)?;
        for entry in &recents {
            writeln!(file, "{}", entry.to_string_lossy())?;
        }
        log::debug!(
            "ConfigManager: recorded recent root {root:?} ({} entries) in {file_path:?}.",
            recents.len()
        );
        Ok(())
    }
}
