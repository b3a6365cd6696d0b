/*
 * Gitignore-style pattern evaluation against root-relative POSIX paths.
 *
 * Two pattern families exist. A pattern without a path separator matches the
 * final path segment anywhere in the tree. A pattern containing a separator
 * matches either as a literal prefix of the candidate path (directories get a
 * trailing `/` appended before the comparison) or as a glob over the full
 * relative path, with separators significant and with directory-prefix
 * semantics: a pattern that matches a leading segment sequence of the path
 * matches the path itself.
 *
 * The literal-prefix rule is permissive: `src/ven` matches everything under
 * `src/vendor/`. That behavior is authoritative here and is not tightened
 * toward strict gitignore.
 */
use glob::{MatchOptions, Pattern};

// Separators are significant: `*` never crosses a `/`.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/*
 * Normalizes a raw newline-separated pattern block: trims each line, drops
 * blank lines and `#` comments. The matcher itself only ever sees the
 * normalized, non-empty strings produced here.
 */
pub fn parse_pattern_block(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

/*
 * Evaluates a single normalized pattern against a root-relative path.
 * `relative_path` carries no leading separator and no trailing directory
 * marker; `is_container` tells the matcher to append one for the literal
 * candidate. Malformed glob syntax degrades to literal comparison and never
 * aborts the caller's traversal.
 */
pub fn matches_pattern(pattern: &str, relative_path: &str, is_container: bool) -> bool {
    if pattern.is_empty() || relative_path.is_empty() {
        return false;
    }

    if !pattern.contains('/') {
        let basename = relative_path.rsplit('/').next().unwrap_or(relative_path);
        return match Pattern::new(pattern) {
            Ok(compiled) => compiled.matches_with(basename, MATCH_OPTIONS),
            Err(_) => pattern == basename,
        };
    }

    let mut candidate = relative_path.to_string();
    if is_container {
        candidate.push('/');
    }
    if candidate.starts_with(pattern) {
        return true;
    }

    match Pattern::new(pattern) {
        Ok(compiled) => {
            if compiled.matches_with(relative_path, MATCH_OPTIONS) {
                return true;
            }
            // Directory-prefix semantics: a match on any leading segment
            // sequence covers the whole subtree beneath it.
            let segments: Vec<&str> = relative_path.split('/').collect();
            let mut prefix = String::with_capacity(relative_path.len());
            for segment in &segments[..segments.len() - 1] {
                if !prefix.is_empty() {
                    prefix.push('/');
                }
                prefix.push_str(segment);
                if compiled.matches_with(&prefix, MATCH_OPTIONS) {
                    return true;
                }
            }
            false
        }
        Err(_) => pattern == relative_path || pattern == candidate,
    }
}

/*
 * True when any pattern in the set matches. An empty set matches nothing.
 */
pub fn matches_any(patterns: &[String], relative_path: &str, is_container: bool) -> bool {
    patterns
        .iter()
        .any(|pattern| matches_pattern(pattern, relative_path, is_container))
}
