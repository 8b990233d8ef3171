// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;
use std::sync::Arc;

use serde_json::Value;

/// Name of the container every other container inherits from unless it names a parent.
pub const DEFAULT_CONTAINER: &str = "default";

/// Key holding the container's name, either as a string or as an array whose first item is the name.
pub const CONTAINER_KEY: &str = "gadgets.container";

/// Key naming the container a definition inherits from. `null` opts out of inheritance.
pub const PARENT_KEY: &str = "parent";

/// Read access to per-container configuration.
///
/// Implementations resolve inheritance themselves: a lookup for a key the container does not
/// set returns the value inherited from its parent chain. Callers are expected to read through
/// this trait on every operation instead of caching values, so that committed changes become
/// visible immediately.
pub trait ContainerConfig: Send + Sync + Debug {
    /// Returns the raw value of `key` for `container`, with inheritance applied.
    fn get(&self, container: &str, key: &str) -> Option<Value>;

    /// Returns the names of all known containers, sorted.
    fn containers(&self) -> Vec<String>;

    /// Returns `key` rendered as a string.
    ///
    /// Strings are returned verbatim, numbers and booleans in their JSON form, arrays and
    /// objects as JSON text. `null` and missing keys yield `None`.
    fn get_string(&self, container: &str, key: &str) -> Option<String> {
        self.get(container, key).as_ref().and_then(value_to_string)
    }

    /// Returns `key` as a flag: `true`, `"true"` (any case) and `"1"` are `true`, anything else is `false`.
    fn get_bool(&self, container: &str, key: &str) -> bool {
        self.get(container, key).as_ref().is_some_and(value_to_bool)
    }

    /// Returns `key` as an integer when it is a JSON integer or a string holding one.
    fn get_int(&self, container: &str, key: &str) -> Option<i64> {
        match self.get(container, key)? {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }
}

impl<T> ContainerConfig for Arc<T>
where
    T: ContainerConfig + ?Sized,
{
    fn get(&self, container: &str, key: &str) -> Option<Value> {
        (**self).get(container, key)
    }

    fn containers(&self) -> Vec<String> {
        (**self).containers()
    }
}

pub(crate) fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

pub(crate) fn value_to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => text.eq_ignore_ascii_case("true") || text == "1",
        Value::Number(number) => number.as_i64() == Some(1),
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case::string(json!("proxy.example.com"), Some("proxy.example.com"))]
    #[case::number(json!(2048), Some("2048"))]
    #[case::boolean(json!(true), Some("true"))]
    #[case::array(json!(["a", "b"]), Some(r#"["a","b"]"#))]
    #[case::null(json!(null), None)]
    fn string_rendering(#[case] value: Value, #[case] expected: Option<&str>) {
        assert_eq!(value_to_string(&value).as_deref(), expected);
    }

    #[rstest]
    #[case::bool_true(json!(true), true)]
    #[case::bool_false(json!(false), false)]
    #[case::text_true(json!("TRUE"), true)]
    #[case::text_one(json!("1"), true)]
    #[case::text_other(json!("yes"), false)]
    #[case::number_one(json!(1), true)]
    #[case::number_zero(json!(0), false)]
    #[case::null(json!(null), false)]
    fn bool_rendering(#[case] value: Value, #[case] expected: bool) {
        assert_eq!(value_to_bool(&value), expected);
    }
}
