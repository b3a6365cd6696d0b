/*
 * Holds the mutable state of one packing session: the scanned tree, the
 * active pattern sets, and the chosen token model. All recomputation is
 * explicit; callers invoke `apply_patterns` / `compute_costs` themselves,
 * and nothing here re-runs reactively on field mutation.
 *
 * The session also bridges to persistence: it can snapshot itself into a
 * `PatternProfile` (including checksummed per-file token counts) and restore
 * from one, seeding cost cells for files whose content is unchanged so
 * totals are available before the first compute pass of the new session.
 */
use super::assembler::{AssembleOptions, AssemblerOperations};
use super::cost_engine::{CostEngine, CostEngineError};
use super::diagnostics::DiagnosticsLog;
use super::exclusion_resolver::VisibilityResolverOperations;
use super::file_system::{self, FileSystemOperations};
use super::file_tree::{FileTokenDetails, FileTree};
use super::pattern_matcher::parse_pattern_block;
use super::profiles::PatternProfile;
use super::tokenizer_utils::{DEFAULT_TOKEN_MODEL, TokenCounterProviderOperations};
use std::collections::HashMap;
use std::path::Path;

pub struct PackSession {
    profile_name: Option<String>,
    tree: Option<FileTree>,
    exclude_patterns: Vec<String>,
    include_patterns: Vec<String>,
    token_model: String,
}

impl PackSession {
    pub fn new() -> Self {
        PackSession {
            profile_name: None,
            tree: None,
            exclude_patterns: Vec::new(),
            include_patterns: Vec::new(),
            token_model: DEFAULT_TOKEN_MODEL.to_string(),
        }
    }

    pub fn profile_name(&self) -> Option<&str> {
        self.profile_name.as_deref()
    }

    pub fn set_profile_name(&mut self, name: Option<String>) {
        self.profile_name = name;
    }

    pub fn token_model(&self) -> &str {
        &self.token_model
    }

    pub fn set_token_model(&mut self, model: String) {
        self.token_model = model;
    }

    pub fn tree(&self) -> Option<&FileTree> {
        self.tree.as_ref()
    }

    /*
     * Scans `root` into a fresh tree (the only way the node set ever
     * changes) and resolves it against the session's current pattern sets.
     */
    pub fn load_root(
        &mut self,
        fs_ops: &dyn FileSystemOperations,
        resolver: &dyn VisibilityResolverOperations,
        root: &Path,
        diagnostics: &DiagnosticsLog,
    ) -> file_system::Result<()> {
        let mut tree = file_system::build_file_tree(fs_ops, root, diagnostics)?;
        resolver.resolve(&mut tree, &self.exclude_patterns, &self.include_patterns);
        self.tree = Some(tree);
        Ok(())
    }

    /*
     * Replaces the pattern sets from raw newline-separated blocks and
     * re-resolves the tree. Safe to call before a root is loaded; the
     * patterns then apply to the next `load_root`.
     */
    pub fn apply_patterns(
        &mut self,
        resolver: &dyn VisibilityResolverOperations,
        exclude_block: &str,
        include_block: &str,
    ) {
        self.exclude_patterns = parse_pattern_block(exclude_block);
        self.include_patterns = parse_pattern_block(include_block);
        if let Some(tree) = self.tree.as_mut() {
            resolver.resolve(tree, &self.exclude_patterns, &self.include_patterns);
        }
    }

    pub fn exclude_patterns(&self) -> &[String] {
        &self.exclude_patterns
    }

    pub fn include_patterns(&self) -> &[String] {
        &self.include_patterns
    }

    /*
     * Runs a cost pass over the current tree with the session's model. A
     * session without a loaded root is a no-op success.
     */
    pub fn compute_costs(
        &self,
        engine: &CostEngine,
        provider: &dyn TokenCounterProviderOperations,
        fs_ops: &dyn FileSystemOperations,
        diagnostics: &DiagnosticsLog,
    ) -> Result<(), CostEngineError> {
        match &self.tree {
            Some(tree) => engine.compute_all(tree, provider, &self.token_model, fs_ops, diagnostics),
            None => Ok(()),
        }
    }

    pub fn total_token_count(&self) -> usize {
        self.tree
            .as_ref()
            .map(FileTree::total_token_count)
            .unwrap_or(0)
    }

    pub fn assemble_document(
        &self,
        assembler: &dyn AssemblerOperations,
        fs_ops: &dyn FileSystemOperations,
        options: &AssembleOptions,
        diagnostics: &DiagnosticsLog,
    ) -> Option<String> {
        self.tree
            .as_ref()
            .map(|tree| assembler.assemble(tree, fs_ops, options, diagnostics))
    }

    /*
     * Installs persisted token counts onto leaves whose checksum still
     * matches. Only cells untouched by any compute pass accept a seed, so
     * this is purely a fast path for freshly loaded sessions.
     */
    pub fn seed_costs_from_details(&self, details: &HashMap<std::path::PathBuf, FileTokenDetails>) {
        let Some(tree) = self.tree.as_ref() else {
            return;
        };
        let mut seeded = 0usize;
        tree.for_each_node(&mut |node| {
            if node.is_dir {
                return;
            }
            let Some(checksum) = node.checksum.as_ref() else {
                return;
            };
            if let Some(cached) = details.get(&node.path) {
                if &cached.checksum == checksum {
                    node.cost.seed_resolved(cached.token_count);
                    seeded += 1;
                }
            }
        });
        log::debug!("PackSession: seeded {seeded} cached token counts");
    }

    /*
     * Gathers checksummed token details for every leaf that has a resolved
     * count, ready for persistence in a profile.
     */
    pub fn collect_file_details(&self) -> HashMap<std::path::PathBuf, FileTokenDetails> {
        let mut details = HashMap::new();
        if let Some(tree) = self.tree.as_ref() {
            tree.for_each_node(&mut |node| {
                if let Some(entry) = node.token_details() {
                    details.insert(node.path.clone(), entry);
                }
            });
        }
        details
    }

    /*
     * Snapshots the session into a persistable profile. Requires a loaded
     * root: a profile without a root folder would not be restorable.
     */
    pub fn create_profile_snapshot(&self, name: &str) -> Option<PatternProfile> {
        let tree = self.tree.as_ref()?;
        Some(PatternProfile {
            name: name.to_string(),
            root_folder: tree.root_path().to_path_buf(),
            exclude_patterns: self.exclude_patterns.clone(),
            include_patterns: self.include_patterns.clone(),
            token_model: self.token_model.clone(),
            file_details: self.collect_file_details(),
        })
    }

    /*
     * Restores a session from a saved profile: patterns and model first, then
     * a fresh scan of the profile's root, then cached count seeding.
     */
    pub fn load_profile_into_session(
        &mut self,
        profile: PatternProfile,
        fs_ops: &dyn FileSystemOperations,
        resolver: &dyn VisibilityResolverOperations,
        diagnostics: &DiagnosticsLog,
    ) -> file_system::Result<()> {
        self.profile_name = Some(profile.name.clone());
        self.exclude_patterns = profile.exclude_patterns.clone();
        self.include_patterns = profile.include_patterns.clone();
        self.token_model = profile.token_model.clone();

        let root = profile.root_folder.clone();
        self.load_root(fs_ops, resolver, &root, diagnostics)?;
        self.seed_costs_from_details(&profile.file_details);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.profile_name = None;
        self.tree = None;
        self.exclude_patterns.clear();
        self.include_patterns.clear();
        self.token_model = DEFAULT_TOKEN_MODEL.to_string();
    }
}

impl Default for PackSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::assembler::CoreAssembler;
    use crate::core::exclusion_resolver::CoreVisibilityResolver;
    use crate::core::file_system::CoreFileSystem;
    use crate::core::tokenizer_utils::{
        SimpleWhitespaceTokenCounter, TokenCounterOperations,
    };
    use std::fs;
    use std::sync::Arc;
    use tempfile::tempdir;

    struct WhitespaceProvider;

    impl TokenCounterProviderOperations for WhitespaceProvider {
        fn acquire(
            &self,
            _model_identifier: &str,
        ) -> crate::core::tokenizer_utils::Result<Arc<dyn TokenCounterOperations>> {
            Ok(Arc::new(SimpleWhitespaceTokenCounter::new()))
        }
    }

    fn fixture_root() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(dir.path().join("notes.log"), "one two three four").unwrap();
        fs::write(dir.path().join("README.md"), "hello world").unwrap();
        dir
    }

    #[test]
    fn test_session_end_to_end() {
        let dir = fixture_root();
        let fs_ops = CoreFileSystem::new();
        let resolver = CoreVisibilityResolver::new();
        let diagnostics = DiagnosticsLog::new();
        let engine = CostEngine::new();

        let mut session = PackSession::new();
        session
            .load_root(&fs_ops, &resolver, dir.path(), &diagnostics)
            .unwrap();
        session.apply_patterns(&resolver, "# logs\n*.log\n", "");
        session
            .compute_costs(&engine, &WhitespaceProvider, &fs_ops, &diagnostics)
            .unwrap();

        // notes.log (4 words) is excluded; main.rs (3) + README.md (2) remain.
        assert_eq!(session.total_token_count(), 5);

        let document = session
            .assemble_document(
                &CoreAssembler::new(),
                &fs_ops,
                &AssembleOptions::default(),
                &diagnostics,
            )
            .unwrap();
        assert!(document.contains("**File:** `README.md`"));
        assert!(!document.contains("notes.log"));
    }

    #[test]
    fn test_pattern_change_reresolves_without_recompute() {
        let dir = fixture_root();
        let fs_ops = CoreFileSystem::new();
        let resolver = CoreVisibilityResolver::new();
        let diagnostics = DiagnosticsLog::new();
        let engine = CostEngine::new();

        let mut session = PackSession::new();
        session
            .load_root(&fs_ops, &resolver, dir.path(), &diagnostics)
            .unwrap();
        session
            .compute_costs(&engine, &WhitespaceProvider, &fs_ops, &diagnostics)
            .unwrap();
        assert_eq!(session.total_token_count(), 9);

        // Excluding the log drops the aggregate immediately; re-allowing it
        // restores the retained count, no compute pass in between.
        session.apply_patterns(&resolver, "*.log", "");
        assert_eq!(session.total_token_count(), 5);
        session.apply_patterns(&resolver, "", "");
        assert_eq!(session.total_token_count(), 9);
    }

    #[test]
    fn test_profile_snapshot_and_restore_with_seeding() {
        let dir = fixture_root();
        let fs_ops = CoreFileSystem::new();
        let resolver = CoreVisibilityResolver::new();
        let diagnostics = DiagnosticsLog::new();
        let engine = CostEngine::new();

        let mut session = PackSession::new();
        session
            .load_root(&fs_ops, &resolver, dir.path(), &diagnostics)
            .unwrap();
        session.apply_patterns(&resolver, "*.log", "");
        session
            .compute_costs(&engine, &WhitespaceProvider, &fs_ops, &diagnostics)
            .unwrap();

        let profile = session.create_profile_snapshot("fixture").unwrap();
        assert_eq!(profile.root_folder, dir.path());
        assert_eq!(profile.exclude_patterns, vec!["*.log".to_string()]);
        // Details exist for resolved, checksummed leaves.
        assert!(profile.file_details.contains_key(&dir.path().join("README.md")));

        // A brand-new session restores the profile and has totals available
        // before any compute pass runs.
        let mut restored = PackSession::new();
        restored
            .load_profile_into_session(profile, &fs_ops, &resolver, &diagnostics)
            .unwrap();
        assert_eq!(restored.profile_name(), Some("fixture"));
        assert_eq!(restored.total_token_count(), 5);
    }

    #[test]
    fn test_stale_checksum_is_not_seeded() {
        let dir = fixture_root();
        let fs_ops = CoreFileSystem::new();
        let resolver = CoreVisibilityResolver::new();
        let diagnostics = DiagnosticsLog::new();
        let engine = CostEngine::new();

        let mut session = PackSession::new();
        session
            .load_root(&fs_ops, &resolver, dir.path(), &diagnostics)
            .unwrap();
        session
            .compute_costs(&engine, &WhitespaceProvider, &fs_ops, &diagnostics)
            .unwrap();
        let profile = session.create_profile_snapshot("fixture").unwrap();

        // Change a file after the snapshot; its cached count must not apply.
        fs::write(dir.path().join("README.md"), "now considerably longer text").unwrap();

        let mut restored = PackSession::new();
        restored
            .load_profile_into_session(profile, &fs_ops, &resolver, &diagnostics)
            .unwrap();

        let tree = restored.tree().unwrap();
        let readme = tree.find_node(&dir.path().join("README.md")).unwrap();
        assert_eq!(readme.cost.resolved_count(), None);
        // Unchanged files still seeded.
        let main = tree.find_node(&dir.path().join("src/main.rs")).unwrap();
        assert_eq!(main.cost.resolved_count(), Some(3));
    }

    #[test]
    fn test_empty_session_operations_are_noops() {
        let session = PackSession::new();
        let diagnostics = DiagnosticsLog::new();
        let fs_ops = CoreFileSystem::new();

        assert_eq!(session.total_token_count(), 0);
        assert!(session.collect_file_details().is_empty());
        assert!(session.create_profile_snapshot("x").is_none());
        assert!(
            session
                .assemble_document(
                    &CoreAssembler::new(),
                    &fs_ops,
                    &AssembleOptions::default(),
                    &diagnostics,
                )
                .is_none()
        );
        session
            .compute_costs(
                &CostEngine::new(),
                &WhitespaceProvider,
                &fs_ops,
                &diagnostics,
            )
            .unwrap();
    }
}
