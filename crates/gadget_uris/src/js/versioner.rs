// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};

use dashmap::DashMap;
use tracing::{Level, event};

use super::{JsUri, JsVersioner, RenderingContext};
use crate::{UriStatus, fingerprint};

/// The script text of one feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeatureResource {
    content: String,
    debug_content: String,
}

impl FeatureResource {
    /// Creates a resource from its optimized and debug script text.
    pub fn new(content: impl Into<String>, debug_content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            debug_content: debug_content.into(),
        }
    }

    /// Returns the optimized script.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns the debug script.
    #[must_use]
    pub fn debug_content(&self) -> &str {
        &self.debug_content
    }
}

/// Error returned when a feature cannot be resolved.
#[ohno::error]
#[display("feature '{feature}' is not registered")]
pub struct FeatureRegistryError {
    feature: String,
}

impl FeatureRegistryError {
    /// Creates an error for the unresolvable `feature`.
    pub fn unknown_feature(feature: impl Into<String>) -> Self {
        Self::new(feature)
    }

    /// Returns the feature that could not be resolved.
    #[must_use]
    pub fn feature(&self) -> &str {
        &self.feature
    }
}

/// Resolves feature names to their script resources.
pub trait FeatureRegistry: Send + Sync {
    /// Returns the resources of `libs` in load order for `context`.
    ///
    /// # Errors
    ///
    /// Returns a [`FeatureRegistryError`] if a feature cannot be resolved.
    fn resources(&self, context: RenderingContext, libs: &[String]) -> Result<Vec<FeatureResource>, FeatureRegistryError>;
}

impl<S> FeatureRegistry for HashMap<String, FeatureResource, S>
where
    S: std::hash::BuildHasher + Send + Sync,
{
    fn resources(&self, _context: RenderingContext, libs: &[String]) -> Result<Vec<FeatureResource>, FeatureRegistryError> {
        libs.iter()
            .map(|lib| self.get(lib).cloned().ok_or_else(|| FeatureRegistryError::unknown_feature(lib.as_str())))
            .collect()
    }
}

/// Versions scripts by fingerprinting the features they deliver.
///
/// Fingerprints are cached by resource list, so requests resolving to the same resources share
/// one computation and one version string.
pub struct DefaultJsVersioner<R> {
    registry: R,
    cache: DashMap<Vec<FeatureResource>, String>,
}

impl<R: FeatureRegistry> DefaultJsVersioner<R> {
    /// Creates a versioner resolving features through `registry`.
    pub fn new(registry: R) -> Self {
        Self {
            registry,
            cache: DashMap::new(),
        }
    }
}

impl<R> Debug for DefaultJsVersioner<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultJsVersioner")
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl<R: FeatureRegistry> JsVersioner for DefaultJsVersioner<R> {
    fn version(&self, uri: &JsUri) -> Option<String> {
        let resources = match self.registry.resources(uri.context(), uri.libs()) {
            Ok(resources) => resources,
            Err(error) => {
                event!(
                    Level::WARN,
                    message = "cannot version JavaScript, feature lookup failed",
                    container = uri.container(),
                    error = %error
                );
                return None;
            }
        };

        if resources.is_empty() {
            return None;
        }

        if let Some(cached) = self.cache.get(&resources) {
            return Some(cached.value().clone());
        }

        let version = fingerprint(
            resources
                .iter()
                .flat_map(|resource| [resource.content.as_bytes(), resource.debug_content.as_bytes()]),
        );
        Some(self.cache.entry(resources).or_insert(version).value().clone())
    }

    fn validate(&self, uri: &JsUri, version: &str) -> UriStatus {
        UriStatus::compare_versions(self.version(uri).as_deref(), version)
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;

    static_assertions::assert_impl_all!(DefaultJsVersioner<HashMap<String, FeatureResource>>: Send, Sync, JsVersioner);

    fn registry() -> HashMap<String, FeatureResource> {
        HashMap::from([
            ("feature1".to_owned(), FeatureResource::new("content1", "debug1")),
            ("feature2".to_owned(), FeatureResource::new("content2", "debug2")),
        ])
    }

    #[test]
    fn distinct_features_get_distinct_versions() {
        let versioner = DefaultJsVersioner::new(registry());

        let one = versioner.version(&JsUri::new("default", ["feature1"])).unwrap();
        let two = versioner.version(&JsUri::new("default", ["feature2"])).unwrap();

        assert_ne!(one, two);
        assert_eq!(one, fingerprint([b"content1".as_slice(), b"debug1".as_slice()]));
        assert_eq!(versioner.validate(&JsUri::new("default", ["feature1"]), &one), UriStatus::ValidVersioned);
        assert_eq!(versioner.validate(&JsUri::new("default", ["feature2"]), &one), UriStatus::InvalidVersion);
    }

    #[test]
    fn same_resources_share_cached_version() {
        let versioner = DefaultJsVersioner::new(registry());

        let first = versioner.version(&JsUri::new("default", ["feature1", "feature2"]));
        let second = versioner.version(&JsUri::new("other", ["feature1", "feature2"]).with_debug(true));

        assert_eq!(first, second);
        assert_eq!(versioner.cache.len(), 1);
    }

    #[test]
    fn empty_presented_version_is_unversioned() {
        let versioner = DefaultJsVersioner::new(registry());
        assert_eq!(versioner.validate(&JsUri::new("default", ["feature1"]), ""), UriStatus::ValidUnversioned);
    }

    #[test]
    #[traced_test]
    fn registry_failure_leaves_script_unversioned() {
        let versioner = DefaultJsVersioner::new(registry());

        assert_eq!(versioner.version(&JsUri::new("default", ["missing"])), None);
        assert!(logs_contain("feature lookup failed"));
        assert_eq!(
            versioner.validate(&JsUri::new("default", ["missing"]), "abc"),
            UriStatus::InvalidVersion
        );
    }

    #[test]
    fn no_features_no_version() {
        let versioner = DefaultJsVersioner::new(registry());
        assert_eq!(versioner.version(&JsUri::new("default", Vec::<String>::new())), None);
    }

    #[test]
    fn registry_error_names_feature() {
        let error = FeatureRegistryError::unknown_feature("rpc");
        assert_eq!(error.feature(), "rpc");
        assert!(error.to_string().contains("feature 'rpc' is not registered"));
    }
}
