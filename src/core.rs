/*
 * This module consolidates the core, platform-agnostic logic of the packer.
 * It re-exports the key data structures and collaborator abstractions
 * (`FileSystemOperations`, `VisibilityResolverOperations`,
 * `TokenCounterProviderOperations`, `AssemblerOperations`,
 * `ProfileManagerOperations`, `ConfigManagerOperations`) for tree scanning,
 * pattern resolution, cost computation, document assembly, and persistence.
 */
pub mod assembler;
pub mod checksum_utils;
pub mod config;
pub mod cost_engine;
pub mod diagnostics;
pub mod exclusion_resolver;
pub mod file_system;
pub mod file_tree;
pub mod pattern_matcher;
pub mod path_utils;
pub mod profiles;
pub mod session;
pub mod tokenizer_utils;

// Re-export key structures and enums
pub use file_tree::{CostCell, CostState, FileNode, FileTokenDetails, FileTree, Visibility};

// Re-export file system related items
pub use file_system::{
    ChildEntry, CoreFileSystem, FileContent, FileSystemError, FileSystemOperations,
    build_file_tree,
};

// Re-export pattern and resolver items
pub use exclusion_resolver::{CoreVisibilityResolver, VisibilityResolverOperations};
pub use pattern_matcher::{matches_any, matches_pattern, parse_pattern_block};

// Re-export cost engine related items
pub use cost_engine::{CostEngine, CostEngineError};
pub use tokenizer_utils::{
    CoreTikTokenCounter, CoreTokenCounterProvider, DEFAULT_TOKEN_MODEL,
    SimpleWhitespaceTokenCounter, TokenCounterOperations, TokenCounterProviderOperations,
    TokenizerError,
};

// Re-export assembler related items
pub use assembler::{AssembleOptions, AssemblerOperations, CoreAssembler};

// Re-export diagnostics
pub use diagnostics::{Diagnostic, DiagnosticSeverity, DiagnosticsLog};

// Re-export persistence collaborators
pub use config::{ConfigManagerOperations, CoreConfigManager};
pub use profiles::{
    CoreProfileManager, PatternProfile, ProfileError, ProfileManagerOperations,
    sanitize_profile_name,
};

// Re-export session orchestration
pub use session::PackSession;
