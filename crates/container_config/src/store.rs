// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tracing::{Level, event};

use crate::snapshot::{ConfigSnapshot, container_name};
use crate::{ConfigError, ContainerConfig};

/// A [`ContainerConfig`] that publishes immutable snapshots.
///
/// Reads clone the current snapshot pointer and then work lock-free on that snapshot, so a
/// reader always sees one consistent set of definitions. Changes go through a [`Transaction`];
/// committing it resolves the new definitions and swaps the pointer in one step.
///
/// # Examples
///
/// ```
/// use container_config::{ContainerConfig, SnapshotContainerConfig};
///
/// let config = SnapshotContainerConfig::new();
/// config
///     .transaction()
///     .add_containers_json(r#"{"gadgets.container": ["default"], "gadgets.uri.js.path": "/gadgets/js"}"#)?
///     .commit()?;
///
/// assert_eq!(
///     config.get_string("default", "gadgets.uri.js.path").as_deref(),
///     Some("/gadgets/js")
/// );
/// # Ok::<_, container_config::ConfigError>(())
/// ```
#[derive(Debug, Default)]
pub struct SnapshotContainerConfig {
    current: RwLock<Arc<ConfigSnapshot>>,
    writer: Mutex<()>,
}

impl SnapshotContainerConfig {
    /// Creates a configuration without any containers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration from a JSON object or an array of JSON objects.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the JSON is malformed or the definitions cannot be resolved.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config = Self::new();
        config.transaction().add_containers_json(json)?.commit()?;
        Ok(config)
    }

    /// Returns the currently published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Starts a transaction against the current definitions.
    pub fn transaction(&self) -> Transaction<'_> {
        Transaction {
            store: self,
            clear_existing: false,
            changes: Vec::new(),
        }
    }
}

impl ContainerConfig for SnapshotContainerConfig {
    fn get(&self, container: &str, key: &str) -> Option<Value> {
        self.snapshot().get(container, key).cloned()
    }

    fn containers(&self) -> Vec<String> {
        self.snapshot().containers().map(str::to_owned).collect()
    }
}

#[derive(Debug)]
enum Change {
    Add(String, Map<String, Value>),
    Remove(String),
}

/// A set of container changes applied atomically by [`Transaction::commit`].
///
/// Changes are applied in the order they were recorded. Dropping a transaction without
/// committing discards it.
#[derive(Debug)]
#[must_use = "a transaction does nothing until it is committed"]
pub struct Transaction<'a> {
    store: &'a SnapshotContainerConfig,
    clear_existing: bool,
    changes: Vec<Change>,
}

impl Transaction<'_> {
    /// Adds or replaces a container definition.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the definition does not name its container.
    pub fn add_container(mut self, definition: Map<String, Value>) -> Result<Self, ConfigError> {
        let name = container_name(&definition)?;
        self.changes.push(Change::Add(name, definition));
        Ok(self)
    }

    /// Adds every container definition found in `json`, either a single object or an array of objects.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the JSON is malformed, holds something other than objects,
    /// or a definition does not name its container.
    pub fn add_containers_json(mut self, json: &str) -> Result<Self, ConfigError> {
        let definitions = match serde_json::from_str::<Value>(json)? {
            Value::Object(definition) => vec![definition],
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(definition) => Ok(definition),
                    other => Err(ConfigError::caused_by(format!(
                        "container definitions must be objects, found: {other}"
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            other => {
                return Err(ConfigError::caused_by(format!(
                    "expected a container object or an array of them, found: {other}"
                )));
            }
        };

        for definition in definitions {
            self = self.add_container(definition)?;
        }

        Ok(self)
    }

    /// Removes a container definition. Removing an unknown container is not an error.
    pub fn remove_container(mut self, name: impl Into<String>) -> Self {
        self.changes.push(Change::Remove(name.into()));
        self
    }

    /// Starts from an empty set of definitions instead of the current ones.
    pub fn clear_existing(mut self) -> Self {
        self.clear_existing = true;
        self
    }

    /// Resolves the changed definitions and publishes them as the new snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the resulting definitions cannot be resolved. The current
    /// snapshot is left untouched in that case.
    pub fn commit(self) -> Result<Arc<ConfigSnapshot>, ConfigError> {
        let _writer = self.store.writer.lock();

        let mut definitions = if self.clear_existing {
            Default::default()
        } else {
            self.store.snapshot().definitions().clone()
        };

        for change in self.changes {
            match change {
                Change::Add(name, definition) => {
                    definitions.insert(name, definition);
                }
                Change::Remove(name) => {
                    definitions.remove(&name);
                }
            }
        }

        let snapshot = match ConfigSnapshot::resolve(definitions) {
            Ok(snapshot) => Arc::new(snapshot),
            Err(error) => {
                event!(Level::ERROR, error = %error, "container configuration rejected");
                return Err(error);
            }
        };

        *self.store.current.write() = Arc::clone(&snapshot);

        event!(Level::INFO, containers = snapshot.len(), "container configuration committed");

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tracing_test::traced_test;

    use super::*;

    static_assertions::assert_impl_all!(SnapshotContainerConfig: Send, Sync, ContainerConfig);

    const BASE: &str = r#"[
        {"gadgets.container": ["default"], "host": "default.com", "flag": "true", "limit": 100},
        {"gadgets.container": ["child"], "host": "child.com"}
    ]"#;

    #[test]
    fn typed_accessors() {
        let config = SnapshotContainerConfig::from_json(BASE).unwrap();

        assert_eq!(config.get_string("child", "host").as_deref(), Some("child.com"));
        assert!(config.get_bool("child", "flag"));
        assert_eq!(config.get_int("child", "limit"), Some(100));
        assert_eq!(config.get_string("unknown", "host"), None);
        assert_eq!(config.containers(), vec!["child".to_owned(), "default".to_owned()]);
    }

    #[test]
    #[traced_test]
    fn commit_replaces_snapshot() {
        let config = SnapshotContainerConfig::from_json(BASE).unwrap();
        let before = config.snapshot();

        config
            .transaction()
            .add_container(json!({"gadgets.container": ["child"], "host": "new.com"}).as_object().unwrap().clone())
            .unwrap()
            .commit()
            .unwrap();

        assert_eq!(config.get_string("child", "host").as_deref(), Some("new.com"));
        // Earlier snapshots are immutable.
        assert_eq!(before.get("child", "host"), Some(&json!("child.com")));
        assert!(logs_contain("container configuration committed"));
    }

    #[test]
    fn remove_and_clear() {
        let config = SnapshotContainerConfig::from_json(BASE).unwrap();

        config.transaction().remove_container("child").commit().unwrap();
        assert_eq!(config.containers(), vec!["default".to_owned()]);

        config
            .transaction()
            .clear_existing()
            .add_containers_json(r#"{"gadgets.container": "other"}"#)
            .unwrap()
            .commit()
            .unwrap();
        assert_eq!(config.containers(), vec!["other".to_owned()]);
    }

    #[test]
    #[traced_test]
    fn failed_commit_keeps_previous_snapshot() {
        let config = SnapshotContainerConfig::from_json(BASE).unwrap();

        let result = config
            .transaction()
            .add_containers_json(r#"{"gadgets.container": ["child"], "parent": "nowhere"}"#)
            .unwrap()
            .commit();

        assert!(result.is_err());
        assert_eq!(config.get_string("child", "host").as_deref(), Some("child.com"));
        assert!(logs_contain("container configuration rejected"));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(SnapshotContainerConfig::from_json("{").is_err());
        assert!(SnapshotContainerConfig::from_json("[1, 2]").is_err());
        assert!(SnapshotContainerConfig::from_json("42").is_err());
        assert!(SnapshotContainerConfig::from_json(r#"{"host": "x"}"#).is_err());
    }
}
