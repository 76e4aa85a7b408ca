//! Structured check events.
//!
//! Validation findings are collected as data and mirrored to `tracing` at
//! the matching level. Errors contribute to the overall fail verdict;
//! warnings and info lines never do.

/// Severity of a check event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    /// Contributes to the fail verdict.
    Error,
    /// Logged, never affects the verdict.
    Warning,
    /// Progress / summary output.
    Info,
}

/// One structured finding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckEvent {
    /// Event severity.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
}

/// Collects [`CheckEvent`]s over one check run.
#[derive(Debug, Default)]
pub struct Reporter {
    events: Vec<CheckEvent>,
    errors: usize,
}

impl Reporter {
    /// Create an empty reporter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error.
    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{message}");
        self.errors += 1;
        self.events.push(CheckEvent {
            severity: Severity::Error,
            message,
        });
    }

    /// Record a warning.
    pub fn warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.events.push(CheckEvent {
            severity: Severity::Warning,
            message,
        });
    }

    /// Record an informational line.
    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{message}");
        self.events.push(CheckEvent {
            severity: Severity::Info,
            message,
        });
    }

    /// Whether no errors have been recorded.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.errors == 0
    }

    /// Recorded events, in order.
    #[must_use]
    pub fn events(&self) -> &[CheckEvent] {
        &self.events
    }

    /// Consume the reporter, yielding its events.
    #[must_use]
    pub fn into_events(self) -> Vec<CheckEvent> {
        self.events
    }
}
