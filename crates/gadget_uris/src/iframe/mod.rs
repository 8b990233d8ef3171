// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Rendering URIs: the iframe URL a gadget view is displayed in.

mod manager;

use std::collections::BTreeMap;
use std::fmt::Debug;

pub use manager::DefaultIframeUriManager;

use crate::{ConfigurationError, Gadget, Uri, UriStatus};

/// Key holding the path gadgets are rendered under.
pub const IFRAME_BASE_PATH_KEY: &str = "gadgets.uri.iframe.basePath";

/// Key holding the shared domain gadgets without a locked domain are rendered on.
pub const UNLOCKED_DOMAIN_KEY: &str = "gadgets.uri.iframe.unlockedDomain";

/// Key holding the suffix appended to locked-domain prefixes.
pub const LOCKED_DOMAIN_SUFFIX_KEY: &str = "gadgets.uri.iframe.lockedDomainSuffix";

/// Key that, when true, puts every gadget of the container on a locked domain.
pub const LOCKED_DOMAIN_REQUIRED_KEY: &str = "gadgets.uri.iframe.lockedDomainRequired";

/// Key that, when true, adds a security token to every rendering URI.
pub const ALWAYS_APPEND_SECURITY_TOKEN_KEY: &str = "gadgets.uri.iframe.alwaysAppendSecurityToken";

/// Fingerprints gadget specs.
pub trait IframeVersioner: Send + Sync + Debug {
    /// Returns the version of the gadget spec at `gadget`.
    fn version(&self, gadget: &Uri, container: &str) -> Option<String>;

    /// Checks a presented version of the gadget spec at `gadget`.
    fn validate(&self, gadget: &Uri, container: &str, version: &str) -> UriStatus;
}

/// Builds and validates rendering URIs.
pub trait IframeUriManager: Send + Sync + Debug {
    /// Builds the URI rendering the gadget's current view.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if the container lacks a base path or the domain the
    /// gadget is rendered on.
    fn make_rendering_uri(&self, gadget: &Gadget) -> Result<Uri, ConfigurationError>;

    /// Builds the rendering URI of every view the gadget declares, keyed by view name.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigurationError`] any view raises.
    fn make_all_rendering_uris(&self, gadget: &Gadget) -> Result<BTreeMap<String, Uri>, ConfigurationError> {
        gadget
            .spec()
            .views()
            .keys()
            .map(|view| {
                let uri = self.make_rendering_uri(&gadget.clone().with_view(view.as_str()))?;
                Ok((view.clone(), uri))
            })
            .collect()
    }

    /// Checks an inbound rendering URI against the gadget's locked domain and version.
    ///
    /// Only the URI is available here, not the gadget's declared features. A URI served from the
    /// container's unlocked domain is therefore accepted unless the container sets
    /// `gadgets.uri.iframe.lockedDomainRequired`, even for a gadget that declares `locked-domain`.
    fn validate_rendering_uri(&self, uri: &Uri) -> UriStatus;
}
