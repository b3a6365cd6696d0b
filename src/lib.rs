/*
 * context_packer ingests a directory tree, applies gitignore-style
 * include/exclude filtering, computes per-file token costs through a
 * pluggable tokenizer, and assembles the surviving content into a single
 * Markdown document. The `core` module holds the whole engine; the binary in
 * `main.rs` is a thin driver that wires the concrete collaborators together.
 */
pub mod core;
