//! Textual deny-list, checked before an expression is parsed.
//!
//! Matching is on whole words anywhere in the text, string literals
//! included, so `'window'` is rejected as well. `thistle` is not.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ExprError;

pub(crate) const DENIED_IDENTIFIERS: &[&str] = &[
    "constructor",
    "prototype",
    "eval",
    "Function",
    "require",
    "import",
    "process",
    "global",
    "window",
    "document",
    "__proto__",
    "this",
];

static DENY_RE: Lazy<Regex> = Lazy::new(|| {
    let alternation = DENIED_IDENTIFIERS.join("|");
    Regex::new(&format!(r"\b(?:{alternation})\b")).unwrap_or_else(|_| unreachable!("deny-list is plain identifiers"))
});

pub(crate) fn check(expression: &str) -> Result<(), ExprError> {
    match DENY_RE.find(expression) {
        Some(hit) => {
            tracing::warn!(identifier = hit.as_str(), "expression rejected by deny-list");
            Err(ExprError::Forbidden(hit.as_str().to_string()))
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_denied_identifier_is_rejected() {
        for ident in DENIED_IDENTIFIERS {
            let expression = format!("a + {ident}");
            assert_eq!(check(&expression), Err(ExprError::Forbidden(ident.to_string())), "{ident}");
        }
    }

    #[test]
    fn denied_words_inside_strings_are_rejected() {
        assert!(check("'open the window'").is_err());
    }

    #[test]
    fn partial_words_pass() {
        assert!(check("thistle + evaluate + processed + functions").is_ok());
    }
}
