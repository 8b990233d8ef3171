// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;
use std::sync::Arc;

use container_config::ContainerConfig;
use tracing::{Level, event};

use crate::Uri;
use crate::common::lookup;

/// Key holding the OAuth callback template.
pub const OAUTH_CALLBACK_TEMPLATE_KEY: &str = "gadgets.uri.oauth.callbackTemplate";

const HOST_PLACEHOLDER: &str = "%host%";

/// Builds the URI OAuth providers redirect back to.
pub trait OAuthUriManager: Send + Sync + Debug {
    /// Returns the callback URI for `container` as reached through `host`, or `None` if the
    /// container has no usable template.
    fn make_oauth_callback_uri(&self, container: &str, host: &str) -> Option<Uri>;
}

/// The standard [`OAuthUriManager`]: every `%host%` in the container's template is replaced by
/// the host as given, without escaping.
#[derive(Debug, Clone)]
pub struct DefaultOAuthUriManager {
    config: Arc<dyn ContainerConfig>,
}

impl DefaultOAuthUriManager {
    /// Creates a manager reading templates from `config`.
    #[must_use]
    pub fn new(config: Arc<dyn ContainerConfig>) -> Self {
        Self { config }
    }
}

impl OAuthUriManager for DefaultOAuthUriManager {
    fn make_oauth_callback_uri(&self, container: &str, host: &str) -> Option<Uri> {
        let template = lookup(self.config.as_ref(), container, OAUTH_CALLBACK_TEMPLATE_KEY)?;
        let callback = template.replace(HOST_PLACEHOLDER, host);

        Uri::parse(&callback)
            .inspect_err(|error| {
                event!(
                    Level::WARN,
                    message = "OAuth callback template produced a malformed URI",
                    container,
                    error = %error
                );
            })
            .ok()
    }
}
