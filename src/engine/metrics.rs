//! Run metrics and diagnostics.
//!
//! Every [`Substitution`](super::Substitution) run returns counters for each
//! stage plus the list of recoverable problems it ran into. Nothing here
//! affects the resolved output; it exists for debugging configurations.

use serde::Serialize;
use std::time::Duration;

/// Resolved vs left-as-is counts for one stage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StageCounts {
    pub resolved: usize,
    pub unresolved: usize,
}

#[derive(Debug, Default, Clone)]
pub struct ProcessMetrics {
    /// Total elapsed time for the run.
    pub total: Duration,
    /// Number of configuration values processed.
    pub values: usize,
    /// Values returned unchanged because they were not strings.
    pub passthrough: usize,
    pub variables: StageCounts,
    pub data: StageCounts,
    pub expressions: StageCounts,
    /// Deprecated `$ui.pageContext.*()` calls.
    pub legacy_calls: StageCounts,
}

/// Pipeline stage a diagnostic was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Data,
    Expression,
}

/// A recoverable problem: the placeholder was left in the output verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub stage: Stage,
    /// Configuration key being processed.
    pub key: String,
    /// Placeholder text that was left in place.
    pub token: String,
    pub message: String,
}

impl Diagnostic {
    pub(crate) fn new(stage: Stage, key: &str, token: &str, message: impl Into<String>) -> Self {
        Self { stage, key: key.to_string(), token: token.to_string(), message: message.into() }
    }
}
