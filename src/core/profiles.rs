/*
 * This module is responsible for managing pattern profiles. A profile stores
 * the pattern sets and token model chosen for a root folder, together with
 * per-file token details so counts survive across sessions. Profiles are
 * saved as JSON files inside the project-local `.contextpacker/profiles`
 * directory, and the most recently used profile name is remembered per
 * project.
 *
 * It includes a trait for profile operations (`ProfileManagerOperations`) to
 * facilitate testing and dependency injection, and a concrete implementation
 * (`CoreProfileManager`).
 */
use super::file_tree::FileTokenDetails;
use super::tokenizer_utils::DEFAULT_TOKEN_MODEL;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub const PROFILE_FILE_EXTENSION: &str = "json";
const PROFILES_SUBFOLDER_NAME: &str = "profiles";
pub const PROJECT_CONFIG_DIR_NAME: &str = ".contextpacker";
const LAST_PROFILE_FILENAME: &str = "last_profile.txt";

#[derive(Debug)]
pub enum ProfileError {
    Io(io::Error),
    Serde(serde_json::Error),
    NoProjectDirectory,
    ProfileNotFound(String),
    InvalidProfileName(String),
}

impl From<io::Error> for ProfileError {
    fn from(err: io::Error) -> Self {
        ProfileError::Io(err)
    }
}

impl From<serde_json::Error> for ProfileError {
    fn from(err: serde_json::Error) -> Self {
        ProfileError::Serde(err)
    }
}

impl std::fmt::Display for ProfileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileError::Io(e) => write!(f, "I/O error: {e}"),
            ProfileError::Serde(e) => write!(f, "Serialization/Deserialization error: {e}"),
            ProfileError::NoProjectDirectory => {
                write!(f, "Could not determine project directory for profiles")
            }
            ProfileError::ProfileNotFound(name) => write!(f, "Profile not found: {name}"),
            ProfileError::InvalidProfileName(name) => write!(
                f,
                "Invalid profile name: {name}. Contains invalid characters or is empty."
            ),
        }
    }
}

impl std::error::Error for ProfileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProfileError::Io(e) => Some(e),
            ProfileError::Serde(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProfileError>;

fn default_token_model() -> String {
    DEFAULT_TOKEN_MODEL.to_string()
}

/*
 * A persisted pattern configuration for one root folder. The pattern vectors
 * hold already-normalized lines (no blanks, no comments). `file_details`
 * caches checksummed token counts; `#[serde(default)]` keeps profiles saved
 * by older versions loadable.
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternProfile {
    pub name: String,
    pub root_folder: PathBuf,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    #[serde(default)]
    pub include_patterns: Vec<String>,
    #[serde(default = "default_token_model")]
    pub token_model: String,
    #[serde(default)]
    pub file_details: HashMap<PathBuf, FileTokenDetails>,
}

impl PatternProfile {
    /*
     * Creates a new, empty profile for a given name and root folder, with no
     * patterns and the default token model.
     */
    pub fn new(name: String, root_folder: PathBuf) -> Self {
        PatternProfile {
            name,
            root_folder,
            exclude_patterns: Vec::new(),
            include_patterns: Vec::new(),
            token_model: default_token_model(),
            file_details: HashMap::new(),
        }
    }
}

pub fn sanitize_profile_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

pub trait ProfileManagerOperations: Send + Sync {
    fn load_profile(&self, project_root: &Path, profile_name: &str) -> Result<PatternProfile>;
    fn save_profile(&self, project_root: &Path, profile: &PatternProfile) -> Result<()>;
    fn list_profiles(&self, project_root: &Path) -> Result<Vec<String>>;
    fn save_last_profile_name(&self, project_root: &Path, profile_name: &str) -> Result<()>;
    fn load_last_profile_name(&self, project_root: &Path) -> Result<Option<String>>;
}

pub struct CoreProfileManager {}

impl CoreProfileManager {
    pub fn new() -> Self {
        CoreProfileManager {}
    }

    fn ensure_project_config_dir(project_root: &Path) -> Option<PathBuf> {
        let config_dir = project_root.join(PROJECT_CONFIG_DIR_NAME);
        if !config_dir.exists() {
            if let Err(e) = fs::create_dir_all(&config_dir) {
                log::error!(
                    "ProfileManager: failed to create project config dir {config_dir:?}: {e}"
                );
                return None;
            }
            log::debug!("ProfileManager: created project config directory {config_dir:?}");
        }
        Some(config_dir)
    }

    fn ensure_profiles_dir(project_root: &Path) -> Option<PathBuf> {
        let profiles_dir =
            Self::ensure_project_config_dir(project_root)?.join(PROFILES_SUBFOLDER_NAME);
        if !profiles_dir.exists() {
            if let Err(e) = fs::create_dir_all(&profiles_dir) {
                log::error!("ProfileManager: failed to create profiles dir {profiles_dir:?}: {e}");
                return None;
            }
        }
        Some(profiles_dir)
    }

    fn profile_file_path(project_root: &Path, profile_name: &str) -> Result<PathBuf> {
        let sanitized = sanitize_profile_name(profile_name);
        if sanitized.is_empty() {
            return Err(ProfileError::InvalidProfileName(profile_name.to_string()));
        }
        let profiles_dir =
            Self::ensure_profiles_dir(project_root).ok_or(ProfileError::NoProjectDirectory)?;
        Ok(profiles_dir.join(format!("{sanitized}.{PROFILE_FILE_EXTENSION}")))
    }
}

impl Default for CoreProfileManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileManagerOperations for CoreProfileManager {
    fn load_profile(&self, project_root: &Path, profile_name: &str) -> Result<PatternProfile> {
        let file_path = Self::profile_file_path(project_root, profile_name)?;
        if !file_path.exists() {
            return Err(ProfileError::ProfileNotFound(profile_name.to_string()));
        }
        let file = File::open(&file_path)?;
        let profile: PatternProfile = serde_json::from_reader(BufReader::new(file))?;
        log::debug!("ProfileManager: loaded profile '{profile_name}' from {file_path:?}");
        Ok(profile)
    }

    fn save_profile(&self, project_root: &Path, profile: &PatternProfile) -> Result<()> {
        let file_path = Self::profile_file_path(project_root, &profile.name)?;
        let file = File::create(&file_path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), profile)?;
        log::debug!(
            "ProfileManager: saved profile '{}' to {file_path:?}",
            profile.name
        );
        Ok(())
    }

    fn list_profiles(&self, project_root: &Path) -> Result<Vec<String>> {
        let profiles_dir =
            Self::ensure_profiles_dir(project_root).ok_or(ProfileError::NoProjectDirectory)?;
        let mut names = Vec::new();
        for entry in fs::read_dir(profiles_dir)? {
            let entry = entry?;
            let path = entry.path();
            let is_profile = path
                .extension()
                .is_some_and(|ext| ext == PROFILE_FILE_EXTENSION);
            if is_profile {
                if let Some(stem) = path.file_stem() {
                    names.push(stem.to_string_lossy().into_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn save_last_profile_name(&self, project_root: &Path, profile_name: &str) -> Result<()> {
        let config_dir = Self::ensure_project_config_dir(project_root)
            .ok_or(ProfileError::NoProjectDirectory)?;
        let mut file = File::create(config_dir.join(LAST_PROFILE_FILENAME))?;
        file.write_all(profile_name.as_bytes())?;
        Ok(())
    }

    fn load_last_profile_name(&self, project_root: &Path) -> Result<Option<String>> {
        let file_path = project_root
            .join(PROJECT_CONFIG_DIR_NAME)
            .join(LAST_PROFILE_FILENAME);
        if !file_path.exists() {
            return Ok(None);
        }
        let mut contents = String::new();
        File::open(&file_path)?.read_to_string(&mut contents)?;
        let trimmed = contents.trim();
        if trimmed.is_empty() {
            Ok(None)
        } else {
            Ok(Some(trimmed.to_string()))
        }
    }
}
