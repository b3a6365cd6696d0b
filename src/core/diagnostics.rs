/*
 * Provides the append-only diagnostics log shared by the scanner, the cost
 * engine and the assembler. Recovered errors (unreadable files, undecodable
 * content, directories that cannot be enumerated) are recorded here instead
 * of aborting a traversal, so every public core operation can finish in a
 * definite terminal state.
 *
 * Entries are mirrored to the `log` facade at a matching level, which keeps
 * existing log-based tooling useful while callers that want to present the
 * diagnostics (CLI summary, future UI) read them back via `snapshot`.
 */
use std::sync::Mutex;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    Warning,
    Error,
}

impl std::fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticSeverity::Warning => write!(f, "warning"),
            DiagnosticSeverity::Error => write!(f, "error"),
        }
    }
}

/*
 * One recovered incident. The timestamp is captured at append time in UTC so
 * that entries from concurrent cost-engine tasks can be ordered after the
 * fact even though append order between sibling tasks is unspecified.
 */
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub timestamp: OffsetDateTime,
    pub severity: DiagnosticSeverity,
    pub message: String,
}

/*
 * Thread-safe, append-only collection of diagnostics. Append never fails and
 * never blocks for long; the mutex only guards a vector push. Entries are
 * never removed, matching the append-only contract.
 */
#[derive(Debug, Default)]
pub struct DiagnosticsLog {
    entries: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticsLog {
    pub fn new() -> Self {
        DiagnosticsLog {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.append(DiagnosticSeverity::Warning, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.append(DiagnosticSeverity::Error, message.into());
    }

    fn append(&self, severity: DiagnosticSeverity, message: String) {
        match severity {
            DiagnosticSeverity::Warning => log::warn!("Diagnostics: {message}"),
            DiagnosticSeverity::Error => log::error!("Diagnostics: {message}"),
        }
        let entry = Diagnostic {
            timestamp: OffsetDateTime::now_utc(),
            severity,
            message,
        };
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            // A poisoned log still accepts entries.
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }

    /*
     * Returns a copy of all entries appended so far. Concurrent appends that
     * race with the snapshot may or may not be included.
     */
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self.entries.lock() {
            Ok(entries) => entries.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
