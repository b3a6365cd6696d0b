/*
 * This module provides the filesystem collaborator boundary: enumerating
 * directory children (with hidden-entry filtering applied before any node is
 * constructed) and reading file content with binary detection. It also hosts
 * `build_file_tree`, the full recursive scan that turns a selected folder
 * into the in-memory `FileTree`.
 *
 * Enumeration uses the `ignore` crate's walker for its hidden-file handling
 * and deterministic ordering. Gitignore semantics stay disabled: every
 * filtering decision beyond hiddenness belongs to the exclusion resolver,
 * not the walker.
 */
use super::checksum_utils;
use super::diagnostics::DiagnosticsLog;
use super::file_tree::{FileNode, FileTree};
use super::profiles::PROJECT_CONFIG_DIR_NAME;
use ignore::WalkBuilder;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum FileSystemError {
    Io(io::Error),
    Walk(ignore::Error),
    AccessDenied(PathBuf),
    ContentUndecodable(PathBuf),
    InvalidPath(PathBuf),
}

impl From<io::Error> for FileSystemError {
    fn from(err: io::Error) -> Self {
        FileSystemError::Io(err)
    }
}

impl From<ignore::Error> for FileSystemError {
    fn from(err: ignore::Error) -> Self {
        FileSystemError::Walk(err)
    }
}

impl std::fmt::Display for FileSystemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileSystemError::Io(e) => write!(f, "I/O error: {e}"),
            FileSystemError::Walk(e) => write!(f, "Directory walk error: {e}"),
            FileSystemError::AccessDenied(p) => write!(f, "Access denied: {p:?}"),
            FileSystemError::ContentUndecodable(p) => {
                write!(f, "Content not decodable as UTF-8 text: {p:?}")
            }
            FileSystemError::InvalidPath(p) => write!(f, "Invalid path: {p:?}"),
        }
    }
}

impl std::error::Error for FileSystemError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileSystemError::Io(e) => Some(e),
            FileSystemError::Walk(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FileSystemError>;

/*
 * One enumerated directory entry, already past hidden-entry filtering.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    pub name: String,
    pub is_dir: bool,
}

/*
 * Result of reading a file for packing. A null byte anywhere in the raw
 * content marks the file binary; binary files are legal tree members but are
 * never tokenized and never rendered into the document body.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Text(String),
    Binary,
}

/*
 * Defines the filesystem operations the core depends on. Implementations
 * perform hidden-entry filtering in `list_children` so that hidden files and
 * folders never become nodes at all.
 */
pub trait FileSystemOperations: Send + Sync {
    fn list_children(&self, path: &Path) -> Result<Vec<ChildEntry>>;
    fn read_text(&self, path: &Path) -> Result<FileContent>;
}

/*
 * The concrete collaborator backed by the real filesystem.
 */
pub struct CoreFileSystem {}

impl CoreFileSystem {
    pub fn new() -> Self {
        CoreFileSystem {}
    }
}

impl Default for CoreFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystemOperations for CoreFileSystem {
    fn list_children(&self, path: &Path) -> Result<Vec<ChildEntry>> {
        if !path.is_dir() {
            return Err(FileSystemError::InvalidPath(path.to_path_buf()));
        }

        let mut walker_builder = WalkBuilder::new(path);
        walker_builder
            .standard_filters(false)
            .hidden(true) // Hidden entries are filtered here, before nodes exist.
            .max_depth(Some(1))
            .sort_by_file_path(|a, b| a.cmp(b));

        let mut entries = Vec::new();
        for entry_result in walker_builder.build() {
            let entry = entry_result?;
            if entry.depth() == 0 {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == PROJECT_CONFIG_DIR_NAME {
                log::trace!("FileSystem: skipping internal config dir under {path:?}");
                continue;
            }
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            entries.push(ChildEntry { name, is_dir });
        }
        Ok(entries)
    }

    fn read_text(&self, path: &Path) -> Result<FileContent> {
        let bytes = fs::read(path).map_err(|e| {
            if e.kind() == io::ErrorKind::PermissionDenied {
                FileSystemError::AccessDenied(path.to_path_buf())
            } else {
                FileSystemError::Io(e)
            }
        })?;

        if bytes.contains(&0) {
            return Ok(FileContent::Binary);
        }

        match String::from_utf8(bytes) {
            Ok(text) => Ok(FileContent::Text(text)),
            Err(_) => Err(FileSystemError::ContentUndecodable(path.to_path_buf())),
        }
    }
}

/*
 * Performs the full recursive scan of `root_path` and constructs the tree
 * model. Nodes are created exactly once here; later pattern or cost changes
 * mutate node state but never the node set.
 *
 * A directory that cannot be enumerated is recovered as having zero children
 * and a diagnostic, so one unreadable subtree never aborts the scan.
 */
pub fn build_file_tree(
    fs_ops: &dyn FileSystemOperations,
    root_path: &Path,
    diagnostics: &DiagnosticsLog,
) -> Result<FileTree> {
    if !root_path.is_dir() {
        return Err(FileSystemError::InvalidPath(root_path.to_path_buf()));
    }
    log::debug!("FileSystem: scanning tree rooted at {root_path:?}");

    let children = build_children(fs_ops, root_path, "", diagnostics);
    let tree = FileTree::new(root_path.to_path_buf(), children);
    log::debug!(
        "FileSystem: scan complete, {} top-level entries under {root_path:?}",
        tree.root.children.len()
    );
    Ok(tree)
}

fn build_children(
    fs_ops: &dyn FileSystemOperations,
    dir_path: &Path,
    relative_prefix: &str,
    diagnostics: &DiagnosticsLog,
) -> Vec<FileNode> {
    let mut entries = match fs_ops.list_children(dir_path) {
        Ok(entries) => entries,
        Err(e) => {
            diagnostics.warn(format!("Cannot enumerate directory {dir_path:?}: {e}"));
            return Vec::new();
        }
    };
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    let mut nodes = Vec::with_capacity(entries.len());
    for entry in entries {
        let path = dir_path.join(&entry.name);
        let relative_path = if relative_prefix.is_empty() {
            entry.name.clone()
        } else {
            format!("{relative_prefix}/{}", entry.name)
        };
        let relative_selector = if entry.is_dir {
            format!("{relative_path}/")
        } else {
            relative_path.clone()
        };

        let checksum = if entry.is_dir {
            None
        } else {
            match checksum_utils::calculate_sha256_checksum(&path) {
                Ok(checksum) => Some(checksum),
                Err(e) => {
                    log::warn!("FileSystem: failed to checksum {path:?}: {e}");
                    None
                }
            }
        };

        let mut node = FileNode::new(
            path.clone(),
            entry.name,
            entry.is_dir,
            relative_selector,
            checksum,
        );
        if entry.is_dir {
            node.children = build_children(fs_ops, &path, &relative_path, diagnostics);
        }
        nodes.push(node);
    }
    nodes
}
