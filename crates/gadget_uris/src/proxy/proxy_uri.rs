// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::params::{Param, flag};
use crate::{ACCEL_CONTAINER, GadgetContext, Uri, UriStatus};

/// A request to proxy one resource through the container.
///
/// Built by callers that want a proxied URL, and recovered from inbound proxy URLs by
/// [`ProxyUriManager::process`](crate::ProxyUriManager::process).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyUri {
    status: UriStatus,
    resource: Uri,
    container: String,
    gadget: Option<String>,
    debug: bool,
    no_cache: bool,
    refresh: Option<u32>,
    fallback_url: Option<String>,
    rewrite_mime_type: Option<String>,
    sanitize: bool,
    html_tag_context: Option<String>,
    original: Option<Uri>,
}

impl ProxyUri {
    /// Creates a request to proxy `resource` for `container`.
    pub fn new(container: impl Into<String>, resource: Uri) -> Self {
        Self {
            status: UriStatus::ValidUnversioned,
            resource,
            container: container.into(),
            gadget: None,
            debug: false,
            no_cache: false,
            refresh: None,
            fallback_url: None,
            rewrite_mime_type: None,
            sanitize: false,
            html_tag_context: None,
            original: None,
        }
    }

    /// Creates a request to proxy `resource` on behalf of the gadget rendered in `context`.
    #[must_use]
    pub fn from_gadget_context(context: &GadgetContext, resource: Uri) -> Self {
        Self::new(context.container(), resource)
            .with_gadget(context.url().to_string())
            .with_debug(context.debug())
            .with_no_cache(context.ignore_cache())
    }

    /// Sets the gadget the resource is fetched for.
    #[must_use]
    pub fn with_gadget(mut self, gadget: impl Into<String>) -> Self {
        self.gadget = Some(gadget.into());
        self
    }

    /// Sets the debug flag.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the cache bypass flag.
    #[must_use]
    pub fn with_no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache = no_cache;
        self
    }

    /// Sets the cache lifetime in seconds.
    #[must_use]
    pub fn with_refresh(mut self, refresh: Option<u32>) -> Self {
        self.refresh = refresh;
        self
    }

    /// Sets the URL fetched when the resource cannot be.
    #[must_use]
    pub fn with_fallback_url(mut self, fallback_url: impl Into<String>) -> Self {
        self.fallback_url = Some(fallback_url.into());
        self
    }

    /// Sets the mime type the content is rewritten to.
    #[must_use]
    pub fn with_rewrite_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.rewrite_mime_type = Some(mime_type.into());
        self
    }

    /// Sets the sanitize flag.
    #[must_use]
    pub fn with_sanitize(mut self, sanitize: bool) -> Self {
        self.sanitize = sanitize;
        self
    }

    /// Sets the HTML tag the resource is referenced from.
    #[must_use]
    pub fn with_html_tag_context(mut self, tag: impl Into<String>) -> Self {
        self.html_tag_context = Some(tag.into());
        self
    }

    pub(crate) fn with_status(mut self, status: UriStatus) -> Self {
        self.status = status;
        self
    }

    pub(crate) fn with_original(mut self, original: Uri) -> Self {
        self.original = Some(original);
        self
    }

    /// Returns the validation status.
    #[must_use]
    pub fn status(&self) -> UriStatus {
        self.status
    }

    /// Returns the proxied resource.
    #[must_use]
    pub fn resource(&self) -> &Uri {
        &self.resource
    }

    /// Returns the container.
    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Returns the gadget the resource is fetched for.
    #[must_use]
    pub fn gadget(&self) -> Option<&str> {
        self.gadget.as_deref()
    }

    /// Returns the debug flag.
    #[must_use]
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Returns the cache bypass flag.
    #[must_use]
    pub fn no_cache(&self) -> bool {
        self.no_cache
    }

    /// Returns the requested cache lifetime in seconds, `None` for the default.
    #[must_use]
    pub fn refresh(&self) -> Option<u32> {
        self.refresh
    }

    /// Returns the fallback URL.
    #[must_use]
    pub fn fallback_url(&self) -> Option<&str> {
        self.fallback_url.as_deref()
    }

    /// Returns the mime type the content is rewritten to.
    #[must_use]
    pub fn rewrite_mime_type(&self) -> Option<&str> {
        self.rewrite_mime_type.as_deref()
    }

    /// Returns the sanitize flag.
    #[must_use]
    pub fn sanitize(&self) -> bool {
        self.sanitize
    }

    /// Returns the HTML tag the resource is referenced from.
    #[must_use]
    pub fn html_tag_context(&self) -> Option<&str> {
        self.html_tag_context.as_deref()
    }

    /// Returns the URI this request was parsed from.
    #[must_use]
    pub fn original(&self) -> Option<&Uri> {
        self.original.as_ref()
    }

    /// Returns `true` if a failed fetch should serve the original content instead of an error.
    ///
    /// This holds exactly for the accelerator container.
    #[must_use]
    pub fn returns_original_content_on_error(&self) -> bool {
        self.container == ACCEL_CONTAINER
    }

    /// Returns the cache lifetime to serve the content with.
    ///
    /// An explicit refresh wins. Otherwise versioned requests may be cached for `long_lived`
    /// seconds, unversioned ones for `default`, and anything that failed validation not at all.
    #[must_use]
    pub fn effective_refresh(&self, long_lived: u32, default: u32) -> u32 {
        match (self.refresh, self.status) {
            (Some(refresh), _) => refresh,
            (None, UriStatus::ValidVersioned) => long_lived,
            (None, UriStatus::ValidUnversioned) => default,
            (None, _) => 0,
        }
    }

    /// Returns the parameter block, in wire order.
    pub(crate) fn parameters(&self, refresh: Option<u32>, version: Option<&str>) -> Vec<(String, Option<String>)> {
        let mut parameters = vec![(Param::Container.key().to_owned(), Some(self.container.clone()))];
        let mut push = |key: Param, value: String| parameters.push((key.key().to_owned(), Some(value)));

        if let Some(gadget) = &self.gadget {
            push(Param::Gadget, gadget.clone());
        }
        push(Param::Debug, flag(self.debug).to_owned());
        push(Param::NoCache, flag(self.no_cache).to_owned());
        if let Some(refresh) = refresh {
            push(Param::Refresh, refresh.to_string());
        }
        if let Some(version) = version.filter(|v| !v.is_empty()) {
            push(Param::Version, version.to_owned());
        }
        if let Some(mime_type) = &self.rewrite_mime_type {
            push(Param::RewriteMime, mime_type.clone());
        }
        if self.sanitize {
            push(Param::Sanitize, flag(true).to_owned());
        }
        if let Some(tag) = &self.html_tag_context {
            push(Param::HtmlTagContext, tag.clone());
        }
        if let Some(fallback_url) = &self.fallback_url {
            push(Param::FallbackUrl, fallback_url.clone());
        }
        if self.returns_original_content_on_error() {
            push(Param::ReturnOriginalContentOnError, flag(true).to_owned());
        }

        parameters
    }
}
