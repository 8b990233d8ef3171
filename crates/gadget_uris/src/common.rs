// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use container_config::ContainerConfig;
use tracing::{Level, event};

use crate::ConfigurationError;

/// Reads a value that building a URI cannot do without.
pub(crate) fn require(config: &dyn ContainerConfig, container: &str, key: &str) -> Result<String, ConfigurationError> {
    lookup(config, container, key).ok_or_else(|| {
        event!(
            Level::ERROR,
            message = "required container configuration is missing",
            container,
            key
        );
        ConfigurationError::new(container, key)
    })
}

/// Reads an optional value. Empty strings count as unset.
pub(crate) fn lookup(config: &dyn ContainerConfig, container: &str, key: &str) -> Option<String> {
    config.get_string(container, key).filter(|value| !value.is_empty())
}

/// Returns the first value of `key` in decoded parameters.
pub(crate) fn parameter(parameters: &[(String, Option<String>)], key: &str) -> Option<String> {
    parameters
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, value)| value.clone().unwrap_or_default())
}
