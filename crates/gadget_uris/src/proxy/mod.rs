// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Proxy URIs: one external resource fetched through the container.
//!
//! Two encodings exist. The query style carries the resource in the `url` parameter. The
//! chained style is selected by a proxy path containing [`CHAINED_PARAMS_TOKEN`]: the
//! parameters are spliced into the path between `(` and `)` and the resource is appended,
//! unescaped, as the tail of the path so that relative references inside proxied content
//! resolve against the proxied location.

mod manager;
mod proxy_uri;

use std::fmt::Debug;

pub use manager::DefaultProxyUriManager;
pub use proxy_uri::ProxyUri;

use crate::{ConfigurationError, GadgetError, Uri, UriStatus};

/// Key holding the host proxy URIs are served from.
pub const PROXY_HOST_KEY: &str = "gadgets.uri.proxy.host";

/// Key holding the path proxy URIs are served under.
pub const PROXY_PATH_KEY: &str = "gadgets.uri.proxy.path";

/// Placeholder in the proxy path that selects the chained encoding.
pub const CHAINED_PARAMS_TOKEN: &str = "%chained_params%";

pub(crate) const CHAINED_START_BEACON: char = '(';
pub(crate) const CHAINED_END_BEACON: char = ')';

/// Fingerprints proxied resources.
pub trait ProxyVersioner: Send + Sync + Debug {
    /// Returns one version per resource, `None` where a resource cannot be versioned.
    fn version(&self, resources: &[Uri], container: &str) -> Vec<Option<String>>;

    /// Checks a presented version of `resource`.
    fn validate(&self, resource: &Uri, container: &str, version: &str) -> UriStatus;
}

/// Builds and parses proxy URIs.
pub trait ProxyUriManager: Send + Sync + Debug {
    /// Builds one proxy URI per request, in order.
    ///
    /// `forced_refresh` overrides every request's own refresh, except that requests bypassing
    /// the cache always get a refresh of 0.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if a request's container lacks a proxy host or path.
    fn make(&self, resources: &[ProxyUri], forced_refresh: Option<u32>) -> Result<Vec<Uri>, ConfigurationError>;

    /// Parses an inbound proxy URI.
    ///
    /// # Errors
    ///
    /// Returns a [`GadgetError`] if required parameters are missing or malformed, or, with
    /// strict parsing, if the URI was not addressed to the configured host and path.
    fn process(&self, uri: &Uri) -> Result<ProxyUri, GadgetError>;
}
