//! Sandboxed expression language for `$[...]` templates.
//!
//! Expressions are small, JavaScript-flavoured one-liners:
//!
//! ```text
//! $[defaultValue(inputs.title, 'Untitled')]
//! $[formatDate(data['workItem.dueDate'], 'DD/MM/YYYY')]
//! $[$ui.pageContext.user.firstname() + ' ' + $ui.pageContext.user.lastname()]
//! $[inputs.priority > 2 ? 'urgent' : 'normal']
//! ```
//!
//! Nothing is compiled or handed to a host runtime. An expression goes through:
//!
//! ```text
//! text ── guard::check ── lexer::tokenize ── ast::parse ── eval::Evaluator ── Value
//!         (deny-list)     (Lexeme stream)    (Expr tree)   (explicit symbols)
//! ```
//!
//! The evaluator only knows the names in its symbol table: `inputs`, `data`,
//! the `Math`/`JSON`/`Date`/`utils` namespaces, the `$ui.pageContext` accessor
//! tree and the utility functions in `builtins.rs`. Any other identifier is an
//! error, which is what actually keeps expressions inside the sandbox. The
//! textual deny-list runs first regardless and rejects the same identifiers
//! the host portal always rejected.
//!
//! A `null` result is returned as an empty string.

#[path = "expr/ast.rs"]
mod ast;
#[path = "expr/builtins.rs"]
mod builtins;
#[path = "expr/eval.rs"]
mod eval;
#[path = "expr/guard.rs"]
mod guard;
#[path = "expr/host.rs"]
mod host;
#[path = "expr/lexer.rs"]
mod lexer;
#[path = "expr/value.rs"]
pub(crate) mod value;

use serde_json::Value;

use crate::config::ConfigMap;
use crate::{Context, ExprError};

pub(crate) use host::read_accessor;
pub use host::{PageContext, UserContext};

/// Longest accepted expression, in bytes.
pub(crate) const MAX_LENGTH: usize = 4096;

/// Check, parse and evaluate `expression`.
pub(crate) fn execute(expression: &str, inputs: &ConfigMap, data: &ConfigMap, context: &Context) -> Result<Value, ExprError> {
    if expression.len() > MAX_LENGTH {
        return Err(ExprError::TooLong(MAX_LENGTH));
    }
    guard::check(expression)?;

    let tokens = lexer::tokenize(expression)?;
    let tree = ast::parse(&tokens, expression.len())?;
    let value = eval::Evaluator::new(inputs, data, context).eval(&tree)?;

    Ok(match value {
        Value::Null => Value::String(String::new()),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn map(value: Value) -> ConfigMap {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn context() -> Context {
        Context {
            reference_time: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap().and_hms_opt(9, 30, 0).unwrap(),
            page: PageContext {
                user: Some(UserContext {
                    user_id: Some("u-1".into()),
                    username: Some("jdoe".into()),
                    first_name: Some("Jane".into()),
                    last_name: Some("Doe".into()),
                    email: None,
                }),
                locale: Some("en-GB".into()),
                permissions: Some(vec!["matter.read".into()]),
                ..Default::default()
            },
        }
    }

    fn eval(expression: &str) -> Result<Value, ExprError> {
        let inputs = map(json!({ "title": "Claim", "priority": 3, "empty": "", "tags": ["a", "b"] }));
        let data = map(json!({ "workItem.dueDate": "2024-04-01", "workItem.amount": "1250.5", "nested": { "x": 1 } }));
        execute(expression, &inputs, &data, &context())
    }

    #[test]
    fn arithmetic_and_concatenation() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), json!(7));
        assert_eq!(eval("(1 + 2) * 3 - 10 % 4").unwrap(), json!(7));
        assert_eq!(eval("7 / 2").unwrap(), json!(3.5));
        assert_eq!(eval("'n' + 1 + 2").unwrap(), json!("n12"));
        assert_eq!(eval("inputs.title + ' #' + inputs.priority").unwrap(), json!("Claim #3"));
        assert_eq!(eval("-inputs.priority").unwrap(), json!(-3));
    }

    #[test]
    fn comparisons_and_logic() {
        assert_eq!(eval("inputs.priority > 2 ? 'urgent' : 'normal'").unwrap(), json!("urgent"));
        assert_eq!(eval("inputs.priority == '3'").unwrap(), json!(true));
        assert_eq!(eval("inputs.priority === '3'").unwrap(), json!(false));
        assert_eq!(eval("inputs.empty || 'fallback'").unwrap(), json!("fallback"));
        assert_eq!(eval("inputs.empty ?? 'fallback'").unwrap(), json!(""));
        assert_eq!(eval("inputs.missing ?? 'fallback'").unwrap(), json!("fallback"));
        assert_eq!(eval("!inputs.title && true").unwrap(), json!(false));
        assert_eq!(eval("'abc' < 'abd'").unwrap(), json!(true));
    }

    #[test]
    fn data_and_inputs_access() {
        assert_eq!(eval("data['workItem.dueDate']").unwrap(), json!("2024-04-01"));
        assert_eq!(eval("getValue('workItem.dueDate')").unwrap(), json!("2024-04-01"));
        assert_eq!(eval("getValue('nested.x', data)").unwrap(), json!(1));
        assert_eq!(eval("inputs.tags[1]").unwrap(), json!("b"));
        assert_eq!(eval("inputs.tags.join('|')").unwrap(), json!("a|b"));
        assert_eq!(eval("Number(data['workItem.amount']) * 2").unwrap(), json!(2501));
    }

    #[test]
    fn null_results_become_empty_string() {
        assert_eq!(eval("inputs.missing").unwrap(), json!(""));
        assert_eq!(eval("null").unwrap(), json!(""));
    }

    #[test]
    fn page_context_accessors() {
        assert_eq!(eval("$ui.pageContext.user.username()").unwrap(), json!("jdoe"));
        assert_eq!(eval("$ui.pageContext.user.firstName() + ' ' + $ui.pageContext.user.lastname()").unwrap(), json!("Jane Doe"));
        assert_eq!(eval("$ui.pageContext.user.email()").unwrap(), json!(""));
        assert_eq!(eval("$ui.pageContext.currency()").unwrap(), json!(""));
        assert_eq!(eval("$ui.pageContext.hasPermission('matter.read')").unwrap(), json!(true));
        assert!(matches!(eval("$ui.pageContext.secrets()"), Err(ExprError::UnknownFunction(_))));
    }

    #[test]
    fn absent_host_objects_read_as_null() {
        let empty = ConfigMap::new();
        let value = execute("$ui.pageContext.user.userid()", &empty, &empty, &Context::default()).unwrap();
        assert_eq!(value, json!(""));
    }

    #[test]
    fn dates_use_the_reference_time() {
        assert_eq!(eval("today()").unwrap(), json!("2024-03-15"));
        assert_eq!(eval("now()").unwrap(), json!("2024-03-15T09:30:00"));
        assert_eq!(eval("formatDate(data['workItem.dueDate'], 'DD/MM/YYYY')").unwrap(), json!("01/04/2024"));
        assert_eq!(eval("formatDate(now(), 'D MMM YYYY [at] HH:mm')").unwrap(), json!("15 Mar 2024 at 09:30"));
        assert_eq!(eval("addDays(today(), 20)").unwrap(), json!("2024-04-04"));
    }

    #[test]
    fn deny_list_rejects_before_parsing() {
        for expression in ["window.location", "this", "constructor", "a.__proto__", "process.env", "eval('1')"] {
            assert!(matches!(eval(expression), Err(ExprError::Forbidden(_))), "{expression}");
        }
        // Identifiers that merely contain a denied word are fine.
        assert_eq!(eval("concat('thistle')").unwrap(), json!("thistle"));
    }

    #[test]
    fn unknown_names_are_errors() {
        assert!(matches!(eval("fetch('x')"), Err(ExprError::UnknownFunction(_))));
        assert!(matches!(eval("location"), Err(ExprError::UnknownIdentifier(_))));
        assert!(matches!(eval("Math"), Err(ExprError::UnknownIdentifier(_))));
        assert!(matches!(eval("(1)(2)"), Err(ExprError::NotCallable(_))));
    }

    #[test]
    fn limits_are_enforced() {
        let deep = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(eval(&deep), Err(ExprError::TooDeep(ast::MAX_DEPTH)));

        let long = format!("'{}'", "a".repeat(MAX_LENGTH));
        assert_eq!(eval(&long), Err(ExprError::TooLong(MAX_LENGTH)));
    }

    #[test]
    fn syntax_errors_report_offsets() {
        assert!(matches!(eval("1 +"), Err(ExprError::Syntax { offset: 3, .. })));
        assert!(matches!(eval("'open"), Err(ExprError::Syntax { offset: 0, .. })));
        assert!(matches!(eval("a b"), Err(ExprError::Syntax { offset: 2, .. })));
    }
}
