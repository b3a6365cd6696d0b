/*
 * Defines the in-memory model of a scanned directory tree. A `FileTree` is
 * built once per folder selection and its node set never changes afterward;
 * only the per-node `visibility` (written by the exclusion resolver) and
 * cost state (written by the cost engine) are mutated between rebuilds.
 *
 * Aggregate costs are pull-based: a container's displayed cost is recomputed
 * from its children on demand and never cached, so a visibility toggle is
 * reflected in every ancestor's total immediately, with no change
 * notifications and no recomputation of leaf counts.
 */
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/*
 * Visibility of a node with respect to the current pattern sets.
 * `Unresolved` exists only between tree construction and the first resolver
 * pass; once `resolve` has run, every node is `Included` or `Excluded`.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Unresolved,
    Included,
    Excluded,
}

/*
 * Lifecycle of a leaf's token count within one cost pass.
 * Containers never store a count of their own; their displayed cost is
 * always derived from children.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CostState {
    #[default]
    Unset,
    Pending,
    Resolved(usize),
}

#[derive(Debug, Default)]
struct CostSlot {
    generation: u64,
    state: CostState,
}

/*
 * Generation-tagged cost holder, mutable through shared references so the
 * cost engine can fan out over `&FileNode`. Every `compute_all` pass stamps
 * its generation during the reset phase; writes carrying an older generation
 * are discarded, which is what makes an in-flight pass safely supersedable.
 */
#[derive(Debug, Default)]
pub struct CostCell {
    slot: Mutex<CostSlot>,
}

impl CostCell {
    pub fn new() -> Self {
        CostCell::default()
    }

    /*
     * Claims this cell for the pass identified by `generation`, resetting the
     * state to `Unset`. The stamp is monotonic: a reset from an older,
     * superseded pass cannot roll back a newer pass's claim.
     */
    pub fn begin_pass(&self, generation: u64) {
        let mut slot = self.lock_slot();
        if generation > slot.generation {
            slot.generation = generation;
            slot.state = CostState::Unset;
        }
    }

    pub fn mark_pending(&self, generation: u64) {
        let mut slot = self.lock_slot();
        if slot.generation == generation {
            slot.state = CostState::Pending;
        }
    }

    pub fn resolve(&self, generation: u64, count: usize) {
        let mut slot = self.lock_slot();
        if slot.generation == generation {
            slot.state = CostState::Resolved(count);
        }
    }

    /*
     * Installs a count carried over from a previous session (checksum-matched
     * profile data). Only applies before the first compute pass has claimed
     * the cell, so seeding can never mask fresh results.
     */
    pub fn seed_resolved(&self, count: usize) {
        let mut slot = self.lock_slot();
        if slot.generation == 0 && slot.state == CostState::Unset {
            slot.state = CostState::Resolved(count);
        }
    }

    pub fn state(&self) -> CostState {
        self.lock_slot().state
    }

    pub fn resolved_count(&self) -> Option<usize> {
        match self.state() {
            CostState::Resolved(count) => Some(count),
            _ => None,
        }
    }

    fn lock_slot(&self) -> std::sync::MutexGuard<'_, CostSlot> {
        match self.slot.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Clone for CostCell {
    fn clone(&self) -> Self {
        let slot = self.lock_slot();
        CostCell {
            slot: Mutex::new(CostSlot {
                generation: slot.generation,
                state: slot.state,
            }),
        }
    }
}

/*
 * Stores the checksum and token count for a single file. Persisted inside a
 * `PatternProfile` so token counts survive across sessions; a stored count is
 * only trusted when the checksum still matches the file on disk.
 */
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileTokenDetails {
    pub checksum: String,
    pub token_count: usize,
}

/*
 * Represents a node in the file system tree. Identity is the absolute path.
 * `relative_selector` is the root-relative POSIX-style path that would select
 * exactly this node in a pattern block; directories carry a trailing `/`.
 * Nodes are never added or removed after the tree-build pass, only their
 * `visibility` and `cost` change.
 */
#[derive(Debug, Clone)]
pub struct FileNode {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
    pub relative_selector: String,
    pub checksum: Option<String>,
    pub visibility: Visibility,
    pub cost: CostCell,
    pub children: Vec<FileNode>,
}

impl FileNode {
    pub fn new(
        path: PathBuf,
        name: String,
        is_dir: bool,
        relative_selector: String,
        checksum: Option<String>,
    ) -> Self {
        FileNode {
            path,
            name,
            is_dir,
            relative_selector,
            checksum,
            visibility: Visibility::default(),
            cost: CostCell::new(),
            children: Vec::new(),
        }
    }

    pub fn is_included(&self) -> bool {
        self.visibility == Visibility::Included
    }

    pub fn is_excluded(&self) -> bool {
        self.visibility == Visibility::Excluded
    }

    /*
     * The root-relative path without the directory marker, suitable for
     * pattern matching and document headers.
     */
    pub fn relative_path(&self) -> &str {
        self.relative_selector
            .strip_suffix('/')
            .unwrap_or(&self.relative_selector)
    }

    /*
     * The cost this node currently contributes to aggregates. An excluded
     * node contributes zero no matter what its cell holds; the resolved value
     * is retained underneath so toggling the node visible again restores its
     * count without recomputation. Containers sum their children on every
     * call; a subtree still in `Pending` simply reports a partial total.
     */
    pub fn displayed_cost(&self) -> usize {
        if self.is_excluded() {
            return 0;
        }
        if self.is_dir {
            self.children.iter().map(FileNode::displayed_cost).sum()
        } else {
            self.cost.resolved_count().unwrap_or(0)
        }
    }

    /*
     * Pre-order visit of this node and all descendants, regardless of
     * visibility. Used for cost resets and bookkeeping passes.
     */
    pub fn for_each_node<'a>(&'a self, visit: &mut impl FnMut(&'a FileNode)) {
        visit(self);
        for child in &self.children {
            child.for_each_node(visit);
        }
    }

    /*
     * Builds the persistable token details for this file, available only when
     * both a checksum and a resolved count exist.
     */
    pub fn token_details(&self) -> Option<FileTokenDetails> {
        let checksum = self.checksum.as_ref()?;
        let token_count = self.cost.resolved_count()?;
        Some(FileTokenDetails {
            checksum: checksum.clone(),
            token_count,
        })
    }
}

/*
 * The scanned tree. The root node is the selected folder itself: always
 * `Included`, never subject to pattern matching (its `relative_selector` is
 * empty), and the anchor for all relative paths below it.
 */
#[derive(Debug, Clone)]
pub struct FileTree {
    pub root: FileNode,
}

impl FileTree {
    pub fn new(root_path: PathBuf, children: Vec<FileNode>) -> Self {
        let name = root_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root_path.to_string_lossy().into_owned());
        let mut root = FileNode::new(root_path, name, true, String::new(), None);
        root.visibility = Visibility::Included;
        root.children = children;
        FileTree { root }
    }

    pub fn root_name(&self) -> &str {
        &self.root.name
    }

    pub fn root_path(&self) -> &Path {
        &self.root.path
    }

    pub fn total_token_count(&self) -> usize {
        self.root.displayed_cost()
    }

    /*
     * All currently visible files in pre-order. Excluded subtrees are skipped
     * wholesale; an `Unresolved` node (resolver not yet run) is not visible.
     */
    pub fn visible_files(&self) -> Vec<&FileNode> {
        let mut files = Vec::new();
        collect_visible_files(&self.root, &mut files);
        files
    }

    pub fn find_node(&self, path: &Path) -> Option<&FileNode> {
        find_node_recursive(&self.root, path)
    }

    pub fn find_node_mut(&mut self, path: &Path) -> Option<&mut FileNode> {
        find_node_recursive_mut(&mut self.root, path)
    }

    pub fn for_each_node<'a>(&'a self, visit: &mut impl FnMut(&'a FileNode)) {
        self.root.for_each_node(visit);
    }
}

fn collect_visible_files<'a>(node: &'a FileNode, files: &mut Vec<&'a FileNode>) {
    if !node.is_included() {
        return;
    }
    if node.is_dir {
        for child in &node.children {
            collect_visible_files(child, files);
        }
    } else {
        files.push(node);
    }
}

fn find_node_recursive<'a>(node: &'a FileNode, path: &Path) -> Option<&'a FileNode> {
    if node.path == path {
        return Some(node);
    }
    for child in &node.children {
        if let Some(found) = find_node_recursive(child, path) {
            return Some(found);
        }
    }
    None
}

fn find_node_recursive_mut<'a>(node: &'a mut FileNode, path: &Path) -> Option<&'a mut FileNode> {
    if node.path == path {
        return Some(node);
    }
    for child in &mut node.children {
        if let Some(found) = find_node_recursive_mut(child, path) {
            return Some(found);
        }
    }
    None
}
