// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// Error returned when container definitions cannot be loaded or resolved.
///
/// Returned for malformed JSON, definitions without a container name, unknown
/// parents and inheritance cycles. A failed commit leaves the previously published
/// snapshot in place.
#[ohno::error]
#[from(serde_json::Error)]
pub struct ConfigError;

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::ConfigError;

    #[test]
    fn display_contains_cause() {
        let error = ConfigError::caused_by("container 'a' names unknown parent 'b'");
        assert!(
            error.to_string().starts_with("container 'a' names unknown parent 'b'"),
            "unexpected message: {error}"
        );
    }

    #[test]
    fn from_json_error_keeps_source() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = ConfigError::from(json_error);
        assert!(error.source().is_some(), "json error should be kept as the source");
    }
}
