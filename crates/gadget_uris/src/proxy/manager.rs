// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::sync::Arc;

use container_config::{ContainerConfig, DEFAULT_CONTAINER};
use tracing::{Level, event};

use super::{
    CHAINED_END_BEACON, CHAINED_PARAMS_TOKEN, CHAINED_START_BEACON, PROXY_HOST_KEY, PROXY_PATH_KEY, ProxyUri, ProxyUriManager,
    ProxyVersioner,
};
use crate::common::{lookup, parameter, require};
use crate::params::{Param, is_set};
use crate::uri::{join_parameters, split_parameters};
use crate::{ConfigurationError, ErrorCode, GadgetError, Uri, UriBuilder, UriStatus};

/// The standard [`ProxyUriManager`].
///
/// Hosts and paths are read from the container configuration on every call. Without strict
/// parsing, inbound URIs are accepted whatever host and path they arrived on and a missing
/// container falls back to `default`, which suits deployments behind rewriting reverse proxies.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use container_config::SnapshotContainerConfig;
/// use gadget_uris::{DefaultProxyUriManager, ProxyUri, ProxyUriManager, Uri};
///
/// let config = SnapshotContainerConfig::from_json(
///     r#"{"gadgets.container": ["default"],
///         "gadgets.uri.proxy.host": "host.com",
///         "gadgets.uri.proxy.path": "/proxy/path"}"#,
/// )?;
/// let manager = DefaultProxyUriManager::new(Arc::new(config));
///
/// let resource = Uri::parse("http://example.com/one.dat?param=value")?;
/// let made = manager.make(&[ProxyUri::new("default", resource.clone())], Some(123))?;
/// assert!(made[0].to_string().contains("refresh=123"));
///
/// let processed = manager.process(&made[0])?;
/// assert_eq!(processed.resource(), &resource);
/// assert_eq!(processed.refresh(), Some(123));
/// # Ok::<_, Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct DefaultProxyUriManager {
    config: Arc<dyn ContainerConfig>,
    versioner: Option<Arc<dyn ProxyVersioner>>,
    strict_parsing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Query,
    Chained { template_matched: bool },
}

#[derive(Debug)]
struct Inbound {
    encoding: Encoding,
    parameters: Vec<(String, Option<String>)>,
    resource: Option<String>,
}

impl DefaultProxyUriManager {
    /// Creates a manager reading hosts and paths from `config`.
    #[must_use]
    pub fn new(config: Arc<dyn ContainerConfig>) -> Self {
        Self {
            config,
            versioner: None,
            strict_parsing: false,
        }
    }

    /// Versions built URIs and validates inbound versions with `versioner`.
    #[must_use]
    pub fn with_versioner(mut self, versioner: Arc<dyn ProxyVersioner>) -> Self {
        self.versioner = Some(versioner);
        self
    }

    /// Rejects inbound URIs not addressed to the configured host and path.
    ///
    /// **Default**: disabled
    #[must_use]
    pub fn with_strict_parsing(mut self, strict_parsing: bool) -> Self {
        self.strict_parsing = strict_parsing;
        self
    }

    fn versions(&self, resources: &[ProxyUri]) -> Vec<Option<String>> {
        let mut versions = vec![None; resources.len()];
        let Some(versioner) = &self.versioner else {
            return versions;
        };

        let (indices, uris): (Vec<usize>, Vec<Uri>) = resources
            .iter()
            .enumerate()
            .filter(|(_, resource)| !resource.no_cache())
            .map(|(index, resource)| (index, resource.resource().clone()))
            .unzip();

        if uris.is_empty() {
            return versions;
        }

        let container = resources.first().map_or(DEFAULT_CONTAINER, ProxyUri::container);
        let computed = versioner.version(&uris, container);
        if computed.len() != uris.len() {
            event!(
                Level::WARN,
                message = "proxy versioner returned the wrong number of versions, ignoring them",
                expected = uris.len(),
                actual = computed.len()
            );
            return versions;
        }

        for (index, version) in indices.into_iter().zip(computed) {
            versions[index] = version;
        }

        versions
    }

    fn make_one(&self, resource: &ProxyUri, forced_refresh: Option<u32>, version: Option<&str>) -> Result<Uri, ConfigurationError> {
        let container = resource.container();
        let host = require(self.config.as_ref(), container, PROXY_HOST_KEY)?;
        let path = require(self.config.as_ref(), container, PROXY_PATH_KEY)?;

        let refresh = if resource.no_cache() {
            Some(0)
        } else {
            forced_refresh.or_else(|| resource.refresh())
        };
        let parameters = resource.parameters(refresh, version);

        if let Some((prefix, suffix)) = path.split_once(CHAINED_PARAMS_TOKEN) {
            let block = join_parameters(&parameters).unwrap_or_default();
            let chained = format!(
                "//{host}{prefix}{CHAINED_START_BEACON}{block}{CHAINED_END_BEACON}{suffix}{}",
                resource.resource()
            );
            return Uri::parse(&chained).map_err(|error| ConfigurationError::caused_by(container, PROXY_PATH_KEY, error));
        }

        let mut builder = UriBuilder::new();
        builder
            .set_authority(host)
            .set_path(path)
            .add_query_parameter(Param::Url.key(), resource.resource().to_string());
        for (key, value) in parameters {
            if let Some(value) = value {
                builder.add_query_parameter(key, value);
            }
        }

        Ok(builder.build())
    }

    fn split_inbound(&self, uri: &Uri) -> Inbound {
        let query = uri.query_parameters();

        if let Some(container) = parameter(&query, Param::Container.key())
            && lookup(self.config.as_ref(), &container, PROXY_PATH_KEY).as_deref() == Some(uri.path())
        {
            let resource = parameter(&query, Param::Url.key());
            return Inbound {
                encoding: Encoding::Query,
                parameters: query,
                resource,
            };
        }

        if let Some(inbound) = self.split_chained(uri) {
            return inbound;
        }

        let resource = parameter(&query, Param::Url.key());
        Inbound {
            encoding: Encoding::Query,
            parameters: query,
            resource,
        }
    }

    fn split_chained(&self, uri: &Uri) -> Option<Inbound> {
        let path = uri.path();
        let start = path.find(CHAINED_START_BEACON)?;
        let end = start + path[start..].find(CHAINED_END_BEACON)?;
        let block = &path[start + 1..end];
        let parameters = split_parameters(block);

        // Everything from the start of the path on, so the resource keeps its own query.
        let mut tail = path.to_owned();
        if let Some(query) = uri.query() {
            tail.push('?');
            tail.push_str(query);
        }
        if let Some(fragment) = uri.fragment() {
            tail.push('#');
            tail.push_str(fragment);
        }

        let container = parameter(&parameters, Param::Container.key()).unwrap_or_else(|| DEFAULT_CONTAINER.to_owned());
        let expected = lookup(self.config.as_ref(), &container, PROXY_PATH_KEY).and_then(|template| {
            template.split_once(CHAINED_PARAMS_TOKEN).map(|(prefix, suffix)| {
                format!("{prefix}{CHAINED_START_BEACON}{block}{CHAINED_END_BEACON}{suffix}")
            })
        });

        let (resource, template_matched) = match expected.as_deref().and_then(|marker| tail.strip_prefix(marker)) {
            Some(resource) => (resource.to_owned(), true),
            None => {
                let after_block = &tail[end + 1..];
                (after_block.strip_prefix('/').unwrap_or(after_block).to_owned(), false)
            }
        };

        Some(Inbound {
            encoding: Encoding::Chained { template_matched },
            parameters,
            resource: Some(resource),
        })
    }

    fn check_addressing(&self, uri: &Uri, container: &str, encoding: Encoding) -> Result<(), GadgetError> {
        let host = require(self.config.as_ref(), container, PROXY_HOST_KEY)?;
        if !uri.authority().is_some_and(|authority| authority.eq_ignore_ascii_case(&host)) {
            return Err(GadgetError::caused_by(
                ErrorCode::InvalidHost,
                format!("proxy requests for container '{container}' must be sent to '{host}'"),
            ));
        }

        let path_matches = match encoding {
            Encoding::Query => require(self.config.as_ref(), container, PROXY_PATH_KEY)? == uri.path(),
            Encoding::Chained { template_matched } => template_matched,
        };
        if !path_matches {
            return Err(GadgetError::caused_by(
                ErrorCode::InvalidPath,
                format!("path '{}' does not match the proxy path of container '{container}'", uri.path()),
            ));
        }

        Ok(())
    }

    fn parse(&self, uri: &Uri) -> Result<ProxyUri, GadgetError> {
        let inbound = self.split_inbound(uri);
        let parameters = &inbound.parameters;
        let get = |key: Param| parameter(parameters, key.key()).filter(|value| !value.is_empty());

        let container = match get(Param::Container) {
            Some(container) => container,
            None if !self.strict_parsing => DEFAULT_CONTAINER.to_owned(),
            None => return Err(GadgetError::missing("no container specified")),
        };

        let Some(resource) = inbound.resource.filter(|resource| !resource.is_empty()) else {
            return Err(GadgetError::missing("no url specified"));
        };

        if self.strict_parsing {
            self.check_addressing(uri, &container, inbound.encoding)?;
        }

        let resource = Uri::parse(&repair_collapsed_scheme(&resource))
            .map_err(|error| GadgetError::caused_by(ErrorCode::InvalidParameter, error))?;

        let refresh = get(Param::Refresh)
            .map(|refresh| refresh.parse::<u32>())
            .transpose()
            .map_err(|error| GadgetError::caused_by(ErrorCode::InvalidParameter, error))?;

        let status = match (&self.versioner, get(Param::Version)) {
            (Some(versioner), Some(version)) => versioner.validate(&resource, &container, &version),
            _ => UriStatus::ValidUnversioned,
        };

        let mut proxy = ProxyUri::new(container, resource)
            .with_debug(is_set(get(Param::Debug).as_deref()))
            .with_no_cache(is_set(get(Param::NoCache).as_deref()))
            .with_sanitize(is_set(get(Param::Sanitize).as_deref()))
            .with_refresh(refresh)
            .with_status(status)
            .with_original(uri.clone());

        if let Some(gadget) = get(Param::Gadget) {
            proxy = proxy.with_gadget(gadget);
        }
        if let Some(mime_type) = get(Param::RewriteMime) {
            proxy = proxy.with_rewrite_mime_type(mime_type);
        }
        if let Some(tag) = get(Param::HtmlTagContext) {
            proxy = proxy.with_html_tag_context(tag);
        }
        if let Some(fallback_url) = get(Param::FallbackUrl) {
            proxy = proxy.with_fallback_url(fallback_url);
        }

        Ok(proxy)
    }
}

impl ProxyUriManager for DefaultProxyUriManager {
    fn make(&self, resources: &[ProxyUri], forced_refresh: Option<u32>) -> Result<Vec<Uri>, ConfigurationError> {
        if resources.is_empty() {
            return Ok(Vec::new());
        }

        let versions = self.versions(resources);
        resources
            .iter()
            .zip(versions)
            .map(|(resource, version)| self.make_one(resource, forced_refresh, version.as_deref()))
            .collect()
    }

    fn process(&self, uri: &Uri) -> Result<ProxyUri, GadgetError> {
        let result = self.parse(uri);
        if let Err(error) = &result {
            event!(Level::DEBUG, message = "rejected proxy URI", uri = %uri, error = %error);
        }
        result
    }
}

/// Restores `http://` from `http:/`, which some CDNs produce by collapsing slashes in paths.
fn repair_collapsed_scheme(resource: &str) -> Cow<'_, str> {
    for scheme in ["http:/", "https:/"] {
        if let Some(rest) = resource.strip_prefix(scheme)
            && !rest.starts_with('/')
        {
            return Cow::Owned(format!("{scheme}/{rest}"));
        }
    }
    Cow::Borrowed(resource)
}
