/*
 * Serializes the visible subset of a resolved tree into the final Markdown
 * document: a project title, an optional fenced outline of the visible
 * structure drawn with box connectors, then one fenced content block per
 * visible file.
 *
 * The assembler is a pure reducer over already-resolved visibility and file
 * content; it never mutates tree state. Excluded subtrees contribute nothing,
 * not even a placeholder. Files whose content turns out binary or
 * undecodable stay in the outline (the outline reflects inclusion, not
 * readability) but are omitted from the body.
 */
use super::diagnostics::DiagnosticsLog;
use super::file_system::{FileContent, FileSystemOperations};
use super::file_tree::{FileNode, FileTree};

#[derive(Debug, Clone)]
pub struct AssembleOptions {
    pub include_structure: bool,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        AssembleOptions {
            include_structure: true,
        }
    }
}

/*
 * Defines the document-assembly operation. Behind a trait so session-level
 * code can be tested with a canned assembler.
 */
pub trait AssemblerOperations: Send + Sync {
    fn assemble(
        &self,
        tree: &FileTree,
        fs_ops: &dyn FileSystemOperations,
        options: &AssembleOptions,
        diagnostics: &DiagnosticsLog,
    ) -> String;
}

pub struct CoreAssembler {}

impl CoreAssembler {
    pub fn new() -> Self {
        CoreAssembler {}
    }
}

impl Default for CoreAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl AssemblerOperations for CoreAssembler {
    fn assemble(
        &self,
        tree: &FileTree,
        fs_ops: &dyn FileSystemOperations,
        options: &AssembleOptions,
        diagnostics: &DiagnosticsLog,
    ) -> String {
        let mut document = format!("# Project: {}\n", tree.root_name());

        if options.include_structure {
            document.push('\n');
            document.push_str("```\n");
            render_outline(&tree.root, &mut document);
            document.push_str("```\n");
        }

        // Stable body order: lexicographic by relative path, independent of
        // tree traversal order.
        let mut files = tree.visible_files();
        files.sort_by(|a, b| a.relative_path().cmp(b.relative_path()));

        for node in files {
            match fs_ops.read_text(&node.path) {
                Ok(FileContent::Text(content)) => {
                    append_file_block(&mut document, node, &content);
                }
                Ok(FileContent::Binary) => {
                    log::trace!("Assembler: omitting binary file {:?} from body", node.path);
                }
                Err(e) => {
                    diagnostics.warn(format!(
                        "Assembler omitted {:?} from the document body: {e}",
                        node.path
                    ));
                }
            }
        }
        document
    }
}

fn append_file_block(document: &mut String, node: &FileNode, content: &str) {
    let language_hint = node
        .path
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_default();

    document.push('\n');
    document.push_str("---\n");
    document.push_str(&format!("**File:** `{}`\n", node.relative_path()));
    document.push_str(&format!("```{language_hint}\n"));
    document.push_str(content);
    if !content.ends_with('\n') {
        document.push('\n');
    }
    document.push_str("```\n");
}

/*
 * Renders the visible subtree as an indented outline. The last visible
 * sibling at each level gets the terminal connector; ancestors that continue
 * below contribute a `│` rail to their descendants' prefixes.
 */
fn render_outline(root: &FileNode, out: &mut String) {
    out.push_str(&root.name);
    out.push('\n');
    let visible: Vec<&FileNode> = root.children.iter().filter(|c| c.is_included()).collect();
    render_outline_level(&visible, "", out);
}

fn render_outline_level(nodes: &[&FileNode], prefix: &str, out: &mut String) {
    for (index, node) in nodes.iter().enumerate() {
        let is_last = index + 1 == nodes.len();
        out.push_str(prefix);
        out.push_str(if is_last { "└── " } else { "├── " });
        out.push_str(&node.name);
        out.push('\n');

        if node.is_dir {
            let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
            let visible: Vec<&FileNode> =
                node.children.iter().filter(|c| c.is_included()).collect();
            render_outline_level(&visible, &child_prefix, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::file_system::{ChildEntry, FileSystemError};
    use crate::core::file_tree::Visibility;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    struct MemoryFileSystem {
        files: HashMap<PathBuf, FileContent>,
    }

    impl MemoryFileSystem {
        fn new(entries: &[(&str, FileContent)]) -> Self {
            let files = entries
                .iter()
                .map(|(path, content)| (PathBuf::from(path), content.clone()))
                .collect();
            MemoryFileSystem { files }
        }
    }

    impl FileSystemOperations for MemoryFileSystem {
        fn list_children(
            &self,
            _path: &Path,
        ) -> crate::core::file_system::Result<Vec<ChildEntry>> {
            Ok(Vec::new())
        }

        fn read_text(&self, path: &Path) -> crate::core::file_system::Result<FileContent> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| FileSystemError::AccessDenied(path.to_path_buf()))
        }
    }

    fn leaf(rel: &str, visibility: Visibility) -> FileNode {
        let name = rel.rsplit('/').next().unwrap().to_string();
        let mut node = FileNode::new(
            PathBuf::from(format!("/project/{rel}")),
            name,
            false,
            rel.to_string(),
            None,
        );
        node.visibility = visibility;
        node
    }

    fn container(rel: &str, visibility: Visibility, children: Vec<FileNode>) -> FileNode {
        let name = rel.rsplit('/').next().unwrap().to_string();
        let mut node = FileNode::new(
            PathBuf::from(format!("/project/{rel}")),
            name,
            true,
            format!("{rel}/"),
            None,
        );
        node.visibility = visibility;
        node.children = children;
        node
    }

    fn text(s: &str) -> FileContent {
        FileContent::Text(s.to_string())
    }

    #[test]
    fn test_assemble_full_document_layout() {
        let tree = FileTree::new(
            PathBuf::from("/project"),
            vec![
                leaf("README.md", Visibility::Included),
                container(
                    "src",
                    Visibility::Included,
                    vec![leaf("src/main.rs", Visibility::Included)],
                ),
            ],
        );
        let fs_ops = MemoryFileSystem::new(&[
            ("/project/README.md", text("# hello\n")),
            ("/project/src/main.rs", text("fn main() {}\n")),
        ]);
        let diagnostics = DiagnosticsLog::new();

        let document = CoreAssembler::new().assemble(
            &tree,
            &fs_ops,
            &AssembleOptions::default(),
            &diagnostics,
        );

        let expected = concat!(
            "# Project: project\n",
            "\n",
            "```\n",
            "project\n",
            "├── README.md\n",
            "└── src\n",
            "    └── main.rs\n",
            "```\n",
            "\n",
            "---\n",
            "**File:** `README.md`\n",
            "```md\n",
            "# hello\n",
            "```\n",
            "\n",
            "---\n",
            "**File:** `src/main.rs`\n",
            "```rs\n",
            "fn main() {}\n",
            "```\n",
        );
        assert_eq!(document, expected);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_outline_rails_continue_past_open_levels() {
        let tree = FileTree::new(
            PathBuf::from("/project"),
            vec![
                container(
                    "a",
                    Visibility::Included,
                    vec![
                        leaf("a/one.txt", Visibility::Included),
                        leaf("a/two.txt", Visibility::Included),
                    ],
                ),
                leaf("z.txt", Visibility::Included),
            ],
        );
        let fs_ops = MemoryFileSystem::new(&[
            ("/project/a/one.txt", text("1")),
            ("/project/a/two.txt", text("2")),
            ("/project/z.txt", text("z")),
        ]);
        let diagnostics = DiagnosticsLog::new();

        let document = CoreAssembler::new().assemble(
            &tree,
            &fs_ops,
            &AssembleOptions::default(),
            &diagnostics,
        );

        // `a` is not the last sibling, so its children sit on a `│` rail.
        assert!(document.contains("├── a\n│   ├── one.txt\n│   └── two.txt\n└── z.txt"));
    }

    #[test]
    fn test_excluded_subtree_leaves_no_trace() {
        let tree = FileTree::new(
            PathBuf::from("/project"),
            vec![
                container(
                    "secret",
                    Visibility::Excluded,
                    vec![leaf("secret/key.txt", Visibility::Excluded)],
                ),
                leaf("open.txt", Visibility::Included),
            ],
        );
        let fs_ops = MemoryFileSystem::new(&[
            ("/project/secret/key.txt", text("hidden")),
            ("/project/open.txt", text("visible")),
        ]);
        let diagnostics = DiagnosticsLog::new();

        let document = CoreAssembler::new().assemble(
            &tree,
            &fs_ops,
            &AssembleOptions::default(),
            &diagnostics,
        );

        assert!(!document.contains("secret"));
        assert!(!document.contains("hidden"));
        assert!(document.contains("open.txt"));
    }

    #[test]
    fn test_binary_file_in_outline_but_not_body() {
        let tree = FileTree::new(
            PathBuf::from("/project"),
            vec![
                leaf("image.png", Visibility::Included),
                leaf("a.txt", Visibility::Included),
            ],
        );
        let fs_ops = MemoryFileSystem::new(&[
            ("/project/image.png", FileContent::Binary),
            ("/project/a.txt", text("words")),
        ]);
        let diagnostics = DiagnosticsLog::new();

        let document = CoreAssembler::new().assemble(
            &tree,
            &fs_ops,
            &AssembleOptions::default(),
            &diagnostics,
        );

        assert!(document.contains("└── image.png"));
        assert!(!document.contains("**File:** `image.png`"));
        assert!(document.contains("**File:** `a.txt`"));
        // Binary omission is expected behavior, not a diagnosed failure.
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_unreadable_file_omitted_with_diagnostic() {
        let tree = FileTree::new(
            PathBuf::from("/project"),
            vec![leaf("gone.txt", Visibility::Included)],
        );
        let fs_ops = MemoryFileSystem::new(&[]);
        let diagnostics = DiagnosticsLog::new();

        let document = CoreAssembler::new().assemble(
            &tree,
            &fs_ops,
            &AssembleOptions::default(),
            &diagnostics,
        );

        assert!(!document.contains("**File:** `gone.txt`"));
        assert!(document.contains("└── gone.txt"));
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_body_order_is_lexicographic_by_path() {
        let tree = FileTree::new(
            PathBuf::from("/project"),
            vec![
                leaf("b.txt", Visibility::Included),
                container(
                    "a",
                    Visibility::Included,
                    vec![leaf("a/inner.txt", Visibility::Included)],
                ),
            ],
        );
        let fs_ops = MemoryFileSystem::new(&[
            ("/project/b.txt", text("b")),
            ("/project/a/inner.txt", text("i")),
        ]);
        let diagnostics = DiagnosticsLog::new();

        let document = CoreAssembler::new().assemble(
            &tree,
            &fs_ops,
            &AssembleOptions {
                include_structure: false,
            },
            &diagnostics,
        );

        let a_pos = document.find("**File:** `a/inner.txt`").unwrap();
        let b_pos = document.find("**File:** `b.txt`").unwrap();
        assert!(a_pos < b_pos);
        assert!(!document.contains("```\nproject\n"));
    }

    #[test]
    fn test_content_without_trailing_newline_gets_one() {
        let tree = FileTree::new(
            PathBuf::from("/project"),
            vec![leaf("raw.txt", Visibility::Included)],
        );
        let fs_ops = MemoryFileSystem::new(&[("/project/raw.txt", text("no newline"))]);
        let diagnostics = DiagnosticsLog::new();

        let document = CoreAssembler::new().assemble(
            &tree,
            &fs_ops,
            &AssembleOptions {
                include_structure: false,
            },
            &diagnostics,
        );

        assert!(document.contains("```txt\nno newline\n```\n"));
    }

    #[test]
    fn test_extensionless_file_gets_untagged_fence() {
        let tree = FileTree::new(
            PathBuf::from("/project"),
            vec![leaf("Makefile", Visibility::Included)],
        );
        let fs_ops = MemoryFileSystem::new(&[("/project/Makefile", text("all:\n"))]);
        let diagnostics = DiagnosticsLog::new();

        let document = CoreAssembler::new().assemble(
            &tree,
            &fs_ops,
            &AssembleOptions {
                include_structure: false,
            },
            &diagnostics,
        );

        assert!(document.contains("**File:** `Makefile`\n```\nall:\n```\n"));
    }
}
