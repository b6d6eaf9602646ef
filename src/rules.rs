//! Conditional routing.
//!
//! A blade configuration may carry an ordered list of rules:
//!
//! ```text
//! { "condition": { "path": "workItem.type", "operator": "in", "value": ["claim", "appeal"] },
//!   "targetBlade": "Claims.Panel",
//!   "configForTargetBlade": [ ... ] }
//! ```
//!
//! Rules are tried in order against the enriched data and the first match
//! wins. With no match the blade's default route is used; with no default
//! either, routing fails with [`ResolveError::NoTarget`](crate::ResolveError).

#[path = "rules/condition.rs"]
mod condition;
#[path = "rules/operator.rs"]
mod operator;
#[path = "rules/routing.rs"]
mod routing;

#[cfg(test)]
#[path = "rules/tests.rs"]
mod tests;

pub use condition::{Condition, get_value_by_path};
pub(crate) use condition::lookup_in_map;
pub use operator::Operator;
pub use routing::{ConditionalRule, RouteDecision, RouteTarget, determine_target};
