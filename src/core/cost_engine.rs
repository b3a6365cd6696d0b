/*
 * Computes per-leaf token costs across the visible tree. One engine instance
 * owns a monotonically increasing pass generation; every `compute_all` call
 * claims the next generation, resets all cost cells, then fans out one
 * concurrent task per child of each container. The rayon pool bounds how
 * much of that fan-out actually runs in parallel.
 *
 * A later `compute_all` call supersedes any in-flight pass: its reset phase
 * stamps the newer generation onto every cell, after which the older pass's
 * writes are discarded at the cell. Readers that overlap a pass observe
 * partial (never mixed-generation) aggregates.
 */
use super::diagnostics::DiagnosticsLog;
use super::file_system::{FileContent, FileSystemOperations};
use super::file_tree::{FileNode, FileTree};
use super::tokenizer_utils::{
    TokenCounterOperations, TokenCounterProviderOperations, TokenizerError,
};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub enum CostEngineError {
    EncoderUnavailable(TokenizerError),
}

impl std::fmt::Display for CostEngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CostEngineError::EncoderUnavailable(e) => {
                write!(f, "Token counter unavailable, cost pass aborted: {e}")
            }
        }
    }
}

impl std::error::Error for CostEngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CostEngineError::EncoderUnavailable(e) => Some(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, CostEngineError>;

pub struct CostEngine {
    generation: AtomicU64,
}

impl CostEngine {
    pub fn new() -> Self {
        CostEngine {
            generation: AtomicU64::new(0),
        }
    }

    /*
     * Runs one full cost pass over the tree. The reset phase completes before
     * any compute work starts, so readers see either the fully reset state or
     * the new pass's results, never values from two different passes at once.
     *
     * The counter is acquired exactly once per pass. If acquisition fails the
     * pass aborts with every node left `Unset`; partial results under an
     * inconsistent cost model would be misleading.
     *
     * Excluded subtrees are skipped entirely: no read, no counter call, no
     * state change. Unreadable or undecodable leaves resolve to zero with a
     * diagnostic instead of aborting the pass.
     */
    pub fn compute_all(
        &self,
        tree: &FileTree,
        provider: &dyn TokenCounterProviderOperations,
        model_identifier: &str,
        fs_ops: &dyn FileSystemOperations,
        diagnostics: &DiagnosticsLog,
    ) -> Result<()> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        log::debug!(
            "CostEngine: starting pass {generation} with model '{model_identifier}' over {:?}",
            tree.root.path
        );

        tree.for_each_node(&mut |node| node.cost.begin_pass(generation));

        let counter = provider
            .acquire(model_identifier)
            .map_err(CostEngineError::EncoderUnavailable)?;

        compute_node(&tree.root, generation, counter.as_ref(), fs_ops, diagnostics);
        log::debug!("CostEngine: pass {generation} complete");
        Ok(())
    }
}

impl Default for CostEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn compute_node<'a>(
    node: &'a FileNode,
    generation: u64,
    counter: &'a dyn TokenCounterOperations,
    fs_ops: &'a dyn FileSystemOperations,
    diagnostics: &'a DiagnosticsLog,
) {
    if node.is_excluded() {
        return;
    }
    if node.is_dir {
        rayon::scope(|scope| {
            for child in &node.children {
                scope.spawn(move |_| {
                    compute_node(child, generation, counter, fs_ops, diagnostics)
                });
            }
        });
    } else {
        compute_leaf(node, generation, counter, fs_ops, diagnostics);
    }
}

fn compute_leaf(
    node: &FileNode,
    generation: u64,
    counter: &dyn TokenCounterOperations,
    fs_ops: &dyn FileSystemOperations,
    diagnostics: &DiagnosticsLog,
) {
    node.cost.mark_pending(generation);
    match fs_ops.read_text(&node.path) {
        Ok(FileContent::Text(text)) => {
            let count = counter.count_tokens(&text);
            node.cost.resolve(generation, count);
        }
        Ok(FileContent::Binary) => {
            // Non-tokenizable content counts as zero; the counter is not
            // consulted.
            node.cost.resolve(generation, 0);
        }
        Err(e) => {
            diagnostics.warn(format!("Cost pass skipped {:?}: {e}", node.path));
            node.cost.resolve(generation, 0);
        }
    }
}
