use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::condition::Condition;
use crate::config::ConfigArray;
use crate::error::ResolveError;

/// One entry of `conditionalRules`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalRule {
    pub condition: Condition,
    #[serde(alias = "target")]
    pub target_blade: String,
    #[serde(default, alias = "config", skip_serializing_if = "Option::is_none")]
    pub config_for_target_blade: Option<ConfigArray>,
}

impl ConditionalRule {
    pub fn matches(&self, data: &Value) -> bool {
        self.condition.evaluate(data)
    }
}

/// Where to go when no rule matches.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteTarget {
    pub target: String,
    pub config: Option<ConfigArray>,
}

/// Outcome of [`determine_target`].
#[derive(Debug, Clone, PartialEq)]
pub struct RouteDecision {
    pub target: String,
    pub config: Option<ConfigArray>,
    /// Index of the matching rule, `None` when the default was used.
    pub matched_rule: Option<usize>,
}

/// Pick the target blade: first matching rule, else `default`.
pub fn determine_target(
    rules: &[ConditionalRule],
    data: &Value,
    default: Option<&RouteTarget>,
) -> Result<RouteDecision, ResolveError> {
    if let Some((index, rule)) = rules.iter().enumerate().find(|(_, rule)| rule.matches(data)) {
        tracing::debug!(rule = index, target = %rule.target_blade, "conditional rule matched");
        return Ok(RouteDecision {
            target: rule.target_blade.clone(),
            config: rule.config_for_target_blade.clone(),
            matched_rule: Some(index),
        });
    }

    match default {
        Some(route) => {
            tracing::debug!(target = %route.target, rules = rules.len(), "no rule matched; using default target");
            Ok(RouteDecision { target: route.target.clone(), config: route.config.clone(), matched_rule: None })
        }
        None => Err(ResolveError::NoTarget),
    }
}
