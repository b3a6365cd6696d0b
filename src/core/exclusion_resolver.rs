/*
 * Reconciles exclude/include pattern sets against a scanned tree, writing a
 * definite visibility onto every node. The resolver is the only writer of
 * `visibility`; the cost engine and assembler read it.
 *
 * The pass is a single synchronous post-order traversal and is re-run from
 * scratch on every pattern change, with no incremental diffing. Exclusion has
 * absolute precedence and propagates sticky down the subtree. With a
 * non-empty include set the tree switches to include mode: a leaf must match
 * an include pattern, and a container is included exactly when at least one
 * of its children resolved included.
 */
use super::file_tree::{FileNode, FileTree, Visibility};
use super::pattern_matcher::matches_any;

/*
 * Defines the visibility-resolution operation over a tree. Abstracted behind
 * a trait so callers that orchestrate sessions can substitute a mock when
 * testing pattern-independent behavior.
 */
pub trait VisibilityResolverOperations: Send + Sync {
    /*
     * Applies the given pattern sets to the tree, mutating every node's
     * visibility in place. The root is never subject to pattern matching and
     * is always left `Included`. Never fails: malformed patterns degrade to
     * literal matching inside the pattern matcher.
     */
    fn resolve(&self, tree: &mut FileTree, exclude_patterns: &[String], include_patterns: &[String]);
}

pub struct CoreVisibilityResolver {}

impl CoreVisibilityResolver {
    pub fn new() -> Self {
        CoreVisibilityResolver {}
    }

    /*
     * Resolves one non-root node and its subtree. Returns whether the node
     * ended up `Included`, which is what parents in include mode reduce over.
     */
    fn resolve_node(
        node: &mut FileNode,
        exclude_patterns: &[String],
        include_patterns: &[String],
        include_mode: bool,
    ) -> bool {
        let relative_path = node.relative_path().to_string();

        // Exclusion is checked first and wins over everything else.
        if matches_any(exclude_patterns, &relative_path, node.is_dir) {
            mark_excluded_recursive(node);
            return false;
        }

        if !node.is_dir {
            let included = !include_mode || matches_any(include_patterns, &relative_path, false);
            node.visibility = if included {
                Visibility::Included
            } else {
                Visibility::Excluded
            };
            return included;
        }

        if !include_mode {
            node.visibility = Visibility::Included;
            for child in &mut node.children {
                Self::resolve_node(child, exclude_patterns, include_patterns, include_mode);
            }
            return true;
        }

        // Include mode: recurse into all children first, then reduce with OR.
        // The container's own pattern matches are irrelevant; an empty
        // container has nothing to show and resolves excluded.
        let mut any_child_included = false;
        for child in &mut node.children {
            any_child_included |=
                Self::resolve_node(child, exclude_patterns, include_patterns, include_mode);
        }
        node.visibility = if any_child_included {
            Visibility::Included
        } else {
            Visibility::Excluded
        };
        any_child_included
    }
}

impl Default for CoreVisibilityResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl VisibilityResolverOperations for CoreVisibilityResolver {
    fn resolve(
        &self,
        tree: &mut FileTree,
        exclude_patterns: &[String],
        include_patterns: &[String],
    ) {
        let include_mode = !include_patterns.is_empty();
        log::debug!(
            "VisibilityResolver: resolving tree rooted at {:?} ({} exclude, {} include patterns)",
            tree.root.path,
            exclude_patterns.len(),
            include_patterns.len()
        );

        tree.root.visibility = Visibility::Included;
        for child in &mut tree.root.children {
            Self::resolve_node(child, exclude_patterns, include_patterns, include_mode);
        }
    }
}

/*
 * Marks a node and its entire subtree excluded. Visited only to propagate the
 * mark; no further pattern evaluation happens below an excluded node.
 */
fn mark_excluded_recursive(node: &mut FileNode) {
    node.visibility = Visibility::Excluded;
    for child in &mut node.children {
        mark_excluded_recursive(child);
    }
}
