//! Configuration documents.
//!
//! A configuration is an ordered list of small maps rather than one object:
//!
//! ```text
//! [ { "roleSystemName": "client" }, { "id": "[workItem.roles.{roleSystemName}.ods.id]" } ]
//! ```
//!
//! Order carries no meaning except that, when the list is flattened into a
//! single map, a later duplicate key overwrites an earlier one (keeping the
//! position of the first occurrence).
//!
//! A single flat object is also accepted and is read as one entry per key.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rules::{ConditionalRule, RouteTarget};

/// Flat string-keyed map: input variables, enriched data and resolved output.
pub type ConfigMap = serde_json::Map<String, Value>;

/// Ordered list of key/value entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "ConfigShape")]
pub struct ConfigArray(pub Vec<ConfigMap>);

#[derive(Deserialize)]
#[serde(untagged)]
enum ConfigShape {
    Entries(Vec<ConfigMap>),
    Flat(ConfigMap),
}

impl From<ConfigShape> for ConfigArray {
    fn from(shape: ConfigShape) -> Self {
        match shape {
            ConfigShape::Entries(entries) => ConfigArray(entries),
            ConfigShape::Flat(map) => map.into_iter().collect(),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ConfigArray {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        ConfigArray(
            iter.into_iter()
                .map(|(key, value)| {
                    let mut entry = ConfigMap::new();
                    entry.insert(key.into(), value);
                    entry
                })
                .collect(),
        )
    }
}

impl ConfigArray {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|entry| entry.is_empty())
    }

    /// Append a single-key entry.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let mut entry = ConfigMap::new();
        entry.insert(key.into(), value.into());
        self.0.push(entry);
    }

    /// Iterate `(key, value)` pairs in document order, duplicates included.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().flat_map(|entry| entry.iter().map(|(k, v)| (k.as_str(), v)))
    }

    /// Flatten into a single map; later duplicate keys win.
    pub fn to_map(&self) -> ConfigMap {
        let mut map = ConfigMap::new();
        for (key, value) in self.entries() {
            map.insert(key.to_string(), value.clone());
        }
        map
    }
}

/// Navigation document handed to a blade bouncer.
///
/// Two modes:
///
/// - **flat**: `targetBlade` + `configForTargetBlade`.
/// - **rules**: `conditionalRules` evaluated in order against enriched data,
///   falling back to `defaultTargetBlade` (or `targetBlade`) with
///   `defaultConfigForTargetBlade`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BladeConfig {
    pub input_config: ConfigArray,
    #[serde(alias = "target")]
    pub target_blade: Option<String>,
    pub config_for_target_blade: ConfigArray,
    pub conditional_rules: Vec<ConditionalRule>,
    pub default_target_blade: Option<String>,
    pub default_config_for_target_blade: Option<ConfigArray>,
}

impl BladeConfig {
    /// Parse a navigation document from JSON text.
    pub fn from_json(text: &str) -> Result<Self, crate::ResolveError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Route used when no conditional rule matches.
    pub fn default_route(&self) -> Option<RouteTarget> {
        let present = |t: &&String| !t.trim().is_empty();
        let target = self.default_target_blade.as_ref().filter(present).or(self.target_blade.as_ref().filter(present))?;
        Some(RouteTarget { target: target.clone(), config: self.default_config_for_target_blade.clone() })
    }

    /// Every configuration that may end up being resolved, input first.
    pub fn configs(&self) -> impl Iterator<Item = &ConfigArray> {
        std::iter::once(&self.input_config)
            .chain(std::iter::once(&self.config_for_target_blade))
            .chain(self.conditional_rules.iter().filter_map(|rule| rule.config_for_target_blade.as_ref()))
            .chain(self.default_config_for_target_blade.as_ref())
    }
}
