// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! JavaScript URIs: a set of features served as one script.
//!
//! Features are carried in the path, `{js path}/{libs}!{loaded}.js`, with the names joined by
//! `:`. Names are percent-encoded so separators inside a name survive the round trip.

mod js_uri;
mod manager;
mod versioner;

use std::fmt::Debug;

pub use js_uri::{JsCompileMode, JsUri, RenderingContext};
pub use manager::DefaultJsUriManager;
pub use versioner::{DefaultJsVersioner, FeatureRegistry, FeatureRegistryError, FeatureResource};

use crate::{ConfigurationError, Uri, UriStatus};

/// Key holding the host JavaScript is served from. It may carry a scheme.
pub const JS_HOST_KEY: &str = "gadgets.uri.js.host";

/// Key holding the path JavaScript is served under.
pub const JS_PATH_KEY: &str = "gadgets.uri.js.path";

/// Fingerprints feature sets.
pub trait JsVersioner: Send + Sync + Debug {
    /// Returns the version of the script `uri` requests.
    fn version(&self, uri: &JsUri) -> Option<String>;

    /// Checks a presented version of the script `uri` requests.
    fn validate(&self, uri: &JsUri, version: &str) -> UriStatus;
}

/// Builds and parses JavaScript URIs.
pub trait JsUriManager: Send + Sync + Debug {
    /// Builds the URI serving `uri`'s features.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if the container lacks a JavaScript host or path.
    fn make_extern_js_uri(&self, uri: &JsUri) -> Result<Uri, ConfigurationError>;

    /// Parses an inbound JavaScript URI. Malformed URIs yield a [`UriStatus::BadUri`] result.
    fn process_extern_js_uri(&self, uri: &Uri) -> JsUri;
}
