//! Error types and remediation hints.
//!
//! Most failures inside the substitution pipeline are recoverable: the
//! offending placeholder is left as literal text and a diagnostic is recorded.
//! The errors here are the ones that reach a caller.

/// Errors raised while checking, parsing or evaluating a `$[...]` expression.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExprError {
    /// The expression text names an identifier on the deny-list.
    #[error("expression contains forbidden identifier '{0}'")]
    Forbidden(String),

    /// The expression does not fit the supported grammar.
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    /// A bare identifier that is not part of the evaluation context.
    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    /// A call to a function the sandbox does not provide.
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// A call whose callee is not a function.
    #[error("'{0}' is not callable")]
    NotCallable(String),

    /// A supported function received unusable arguments.
    #[error("{function}: {message}")]
    Argument { function: String, message: String },

    #[error("expression nesting exceeds {0} levels")]
    TooDeep(usize),

    #[error("expression exceeds {0} bytes")]
    TooLong(usize),
}

impl ExprError {
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self::Syntax { offset, message: message.into() }
    }

    pub(crate) fn argument(function: &str, message: impl Into<String>) -> Self {
        Self::Argument { function: function.to_string(), message: message.into() }
    }
}

/// Errors that make configuration resolution fail as a whole.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// No rule matched and there is neither a default nor a flat target.
    #[error("no target blade determined: no conditional rule matched and no default target is configured")]
    NoTarget,

    #[error("invalid configuration document: {0}")]
    InvalidDocument(#[from] serde_json::Error),

    /// The caller's enrichment fetch failed.
    #[error("enrichment failed: {0}")]
    Enrichment(String),
}

impl ResolveError {
    /// Suggested fix for this error, if one is known.
    pub fn remediation(&self) -> Option<&'static str> {
        remediation_for(&self.to_string())
    }
}

/// Common failure phrases and what to do about them. First match wins.
static REMEDIATIONS: &[(&str, &str)] = &[
    (
        "no target blade determined",
        "Check conditionalRules, or set defaultTargetBlade / targetBlade in the blade configuration.",
    ),
    (
        "invalid configuration document",
        "inputConfig and configForTargetBlade must be arrays of key/value objects (or a single flat object).",
    ),
    ("enrichment failed", "Confirm the work item exists and the enrichment paths are valid for its type."),
    (
        "forbidden identifier",
        "Only inputs, data, $ui.pageContext and the utility functions are available inside $[...].",
    ),
    ("unknown identifier", "Reference values through inputs.<name>, data[\"<path>\"] or getValue(\"<path>\")."),
    ("unknown function", "Check the function name against the supported utility functions."),
    ("syntax error", "Check the expression for unbalanced quotes, brackets or parentheses."),
    ("no enriched value", "Make sure the token's source is enriched and the path matches the fetched field."),
];

/// Look up remediation text for a human-readable failure message.
///
/// Matching is a case-insensitive substring test against a small table of
/// known phrases.
pub fn remediation_for(message: &str) -> Option<&'static str> {
    let lower = message.to_ascii_lowercase();
    REMEDIATIONS.iter().find(|(phrase, _)| lower.contains(phrase)).map(|(_, hint)| *hint)
}
