// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use crate::{CONTAINER_KEY, ConfigError, DEFAULT_CONTAINER, PARENT_KEY};

/// Container definitions keyed by container name, exactly as they were added.
pub(crate) type Definitions = BTreeMap<String, Map<String, Value>>;

/// An immutable, fully resolved view of every container definition.
///
/// Each container's values already include everything it inherits, so lookups are a
/// single map access. Snapshots are never modified after they are published.
#[derive(Debug, Default)]
pub struct ConfigSnapshot {
    definitions: Definitions,
    resolved: Definitions,
}

impl ConfigSnapshot {
    /// Resolves `definitions` into a snapshot.
    pub(crate) fn resolve(definitions: Definitions) -> Result<Self, ConfigError> {
        let mut resolved = Definitions::new();

        for name in definitions.keys() {
            let chain = inheritance_chain(&definitions, name)?;

            // Root first, so that every descendant overrides what it inherits.
            let mut values = Map::new();
            for ancestor in chain.iter().rev() {
                if let Some(definition) = definitions.get(*ancestor) {
                    values.extend(definition.iter().map(|(key, value)| (key.clone(), value.clone())));
                }
            }

            resolved.insert(name.clone(), values);
        }

        Ok(Self { definitions, resolved })
    }

    /// Returns the value of `key` for `container`, inherited values included.
    #[must_use]
    pub fn get(&self, container: &str, key: &str) -> Option<&Value> {
        self.resolved.get(container)?.get(key)
    }

    /// Returns every resolved value of `container`.
    #[must_use]
    pub fn container(&self, container: &str) -> Option<&Map<String, Value>> {
        self.resolved.get(container)
    }

    /// Returns the container names in this snapshot, sorted.
    pub fn containers(&self) -> impl Iterator<Item = &str> {
        self.resolved.keys().map(String::as_str)
    }

    /// Returns the number of containers in this snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    /// Returns `true` if this snapshot holds no containers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    pub(crate) fn definitions(&self) -> &Definitions {
        &self.definitions
    }
}

/// Extracts the container name from a definition.
pub(crate) fn container_name(definition: &Map<String, Value>) -> Result<String, ConfigError> {
    let name = match definition.get(CONTAINER_KEY) {
        Some(Value::String(name)) => Some(name.as_str()),
        Some(Value::Array(names)) => names.first().and_then(Value::as_str),
        _ => None,
    };

    match name {
        Some(name) if !name.is_empty() => Ok(name.to_owned()),
        _ => Err(ConfigError::caused_by(format!(
            "container definition is missing a name under '{CONTAINER_KEY}'"
        ))),
    }
}

fn parent_of<'a>(definitions: &'a Definitions, name: &'a str) -> Result<Option<&'a str>, ConfigError> {
    let Some(definition) = definitions.get(name) else {
        return Ok(None);
    };

    match definition.get(PARENT_KEY) {
        Some(Value::String(parent)) => Ok(Some(parent.as_str())),
        Some(Value::Null) => Ok(None),
        Some(other) => Err(ConfigError::caused_by(format!(
            "container '{name}' has a non-string parent: {other}"
        ))),
        None if name != DEFAULT_CONTAINER && definitions.contains_key(DEFAULT_CONTAINER) => Ok(Some(DEFAULT_CONTAINER)),
        None => Ok(None),
    }
}

/// Returns `name` followed by its ancestors, nearest first.
fn inheritance_chain<'a>(definitions: &'a Definitions, name: &'a str) -> Result<Vec<&'a str>, ConfigError> {
    let mut chain = vec![name];
    let mut seen = BTreeSet::from([name]);
    let mut current = name;

    while let Some(parent) = parent_of(definitions, current)? {
        if !definitions.contains_key(parent) {
            return Err(ConfigError::caused_by(format!(
                "container '{current}' names unknown parent '{parent}'"
            )));
        }

        if !seen.insert(parent) {
            return Err(ConfigError::caused_by(format!(
                "container '{name}' has an inheritance cycle through '{parent}'"
            )));
        }

        chain.push(parent);
        current = parent;
    }

    Ok(chain)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn definitions(values: Value) -> Definitions {
        let Value::Array(items) = values else {
            panic!("test definitions must be an array");
        };

        items
            .into_iter()
            .map(|item| {
                let Value::Object(map) = item else {
                    panic!("test definitions must be objects");
                };
                (container_name(&map).unwrap(), map)
            })
            .collect()
    }

    #[test]
    fn child_overrides_and_inherits() {
        let snapshot = ConfigSnapshot::resolve(definitions(json!([
            {"gadgets.container": ["default"], "host": "default.com", "path": "/p"},
            {"gadgets.container": ["child"], "host": "child.com"},
        ])))
        .unwrap();

        assert_eq!(snapshot.get("child", "host"), Some(&json!("child.com")));
        assert_eq!(snapshot.get("child", "path"), Some(&json!("/p")));
        assert_eq!(snapshot.get("default", "host"), Some(&json!("default.com")));
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn explicit_parent_chain() {
        let snapshot = ConfigSnapshot::resolve(definitions(json!([
            {"gadgets.container": ["default"], "a": 1, "b": 1, "c": 1},
            {"gadgets.container": ["middle"], "b": 2, "c": 2},
            {"gadgets.container": ["leaf"], "parent": "middle", "c": 3},
        ])))
        .unwrap();

        assert_eq!(snapshot.get("leaf", "a"), Some(&json!(1)));
        assert_eq!(snapshot.get("leaf", "b"), Some(&json!(2)));
        assert_eq!(snapshot.get("leaf", "c"), Some(&json!(3)));
    }

    #[test]
    fn null_parent_opts_out_of_default() {
        let snapshot = ConfigSnapshot::resolve(definitions(json!([
            {"gadgets.container": ["default"], "a": 1},
            {"gadgets.container": ["alone"], "parent": null},
        ])))
        .unwrap();

        assert_eq!(snapshot.get("alone", "a"), None);
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let error = ConfigSnapshot::resolve(definitions(json!([
            {"gadgets.container": ["child"], "parent": "missing"},
        ])))
        .unwrap_err();

        assert!(error.to_string().contains("unknown parent 'missing'"), "{error}");
    }

    #[test]
    fn cycle_is_rejected() {
        let error = ConfigSnapshot::resolve(definitions(json!([
            {"gadgets.container": ["a"], "parent": "b"},
            {"gadgets.container": ["b"], "parent": "a"},
        ])))
        .unwrap_err();

        assert!(error.to_string().contains("inheritance cycle"), "{error}");
    }

    #[test]
    fn name_accepts_string_or_array() {
        let from_array = json!({"gadgets.container": ["first", "second"]});
        let from_string = json!({"gadgets.container": "solo"});

        assert_eq!(container_name(from_array.as_object().unwrap()).unwrap(), "first");
        assert_eq!(container_name(from_string.as_object().unwrap()).unwrap(), "solo");
        assert!(container_name(&Map::new()).is_err());
    }
}
