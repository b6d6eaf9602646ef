//! Deprecated fixed-call form.
//!
//! Older configurations call page-context accessors directly, outside any
//! `$[...]`:
//!
//! ```text
//! {"owner": $ui.pageContext.user.userid()}
//! ```
//!
//! Only the exact call strings in [`LEGACY_CALLS`] are replaced, with the
//! JSON encoding of the accessor's value. Anything else that looks like a call
//! is left verbatim.

use regex::Captures;
use serde_json::Value;

use super::metrics::StageCounts;
use crate::expr::{PageContext, read_accessor};

/// Whitelisted call strings and the accessor each one reads.
pub(crate) const LEGACY_CALLS: &[(&str, &str)] = &[
    ("$ui.pageContext.user.userid()", "user.userid"),
    ("$ui.pageContext.user.username()", "user.username"),
    ("$ui.pageContext.user.firstname()", "user.firstname"),
    ("$ui.pageContext.user.lastname()", "user.lastname"),
    ("$ui.pageContext.user.email()", "user.email"),
    ("$ui.pageContext.pageSystemName()", "pagesystemname"),
    ("$ui.pageContext.portalSystemName()", "portalsystemname"),
    ("$ui.pageContext.locale()", "locale"),
    ("$ui.pageContext.currency()", "currency"),
];

pub(crate) fn rewrite(text: &str, page: &PageContext, counts: &mut StageCounts) -> String {
    if !text.contains("$ui.pageContext.") {
        return text.to_string();
    }

    let re = regex!(r"\$ui\.pageContext(?:\.[A-Za-z_][A-Za-z0-9_]*)+\(\)");
    re.replace_all(text, |caps: &Captures| {
        let call = &caps[0];
        match LEGACY_CALLS.iter().find(|(literal, _)| *literal == call) {
            Some((_, accessor)) => {
                counts.resolved += 1;
                let value = read_accessor(page, accessor).unwrap_or(Value::Null);
                tracing::debug!(call, %value, "deprecated page-context call substituted");
                value.to_string()
            }
            None => {
                counts.unresolved += 1;
                tracing::debug!(call, "call is not in the deprecated whitelist; left verbatim");
                call.to_string()
            }
        }
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::UserContext;

    fn page() -> PageContext {
        PageContext {
            user: Some(UserContext { user_id: Some("u-1".into()), ..Default::default() }),
            locale: Some("en-GB".into()),
            ..Default::default()
        }
    }

    #[test]
    fn whitelisted_calls_become_json() {
        let mut counts = StageCounts::default();
        let out = rewrite("{\"owner\": $ui.pageContext.user.userid(), \"l\": $ui.pageContext.locale()}", &page(), &mut counts);

        assert_eq!(out, "{\"owner\": \"u-1\", \"l\": \"en-GB\"}");
        assert_eq!(counts.resolved, 2);
    }

    #[test]
    fn absent_host_values_become_null() {
        let mut counts = StageCounts::default();
        assert_eq!(rewrite("$ui.pageContext.currency()", &page(), &mut counts), "null");
    }

    #[test]
    fn unknown_calls_stay_verbatim() {
        let mut counts = StageCounts::default();
        let text = "$ui.pageContext.user.userId() $ui.pageContext.secrets()";
        assert_eq!(rewrite(text, &page(), &mut counts), text);
        assert_eq!(counts.unresolved, 2);
    }
}
