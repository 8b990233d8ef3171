// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Accelerator URIs: whole pages proxied through the container for caching and rewriting.
//!
//! The accelerator reuses the proxy encoding under its own container, whose proxy host and
//! path tell accelerated URIs apart from everything else.

use std::fmt::Debug;
use std::sync::Arc;

use container_config::ContainerConfig;
use http::Request;
use http::header::HOST;

use crate::common::lookup;
use crate::{CHAINED_PARAMS_TOKEN, ErrorCode, GadgetError, PROXY_HOST_KEY, PROXY_PATH_KEY, ProxyUri, ProxyUriManager, Uri};

/// Container accelerated requests are made on behalf of.
pub const ACCEL_CONTAINER: &str = "accel";

/// Recognizes and builds accelerator URIs.
pub trait AccelUriManager: Send + Sync + Debug {
    /// Returns `true` if `uri` is already addressed to the accelerator.
    fn looks_like_accel_uri(&self, uri: &Uri) -> bool;

    /// Returns the accelerated form of `uri`. URIs that are already accelerated are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns a [`GadgetError`] if `uri` is not an `http` or `https` URI, or if the accelerator
    /// container is not configured.
    fn normalize(&self, uri: &Uri) -> Result<Uri, GadgetError>;

    /// Returns the accelerated form of the URI `request` targets.
    ///
    /// Origin-form targets are completed with the `Host` header and the `http` scheme.
    ///
    /// # Errors
    ///
    /// Returns a [`GadgetError`] if the target cannot be made absolute, or for the reasons
    /// [`normalize`](Self::normalize) fails.
    fn parse_and_normalize<B>(&self, request: &Request<B>) -> Result<Uri, GadgetError>
    where
        Self: Sized,
    {
        self.normalize(&request_target(request)?)
    }
}

/// The standard [`AccelUriManager`], building accelerator URIs with a [`ProxyUriManager`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use container_config::SnapshotContainerConfig;
/// use gadget_uris::{AccelUriManager, DefaultAccelUriManager, DefaultProxyUriManager, Uri};
///
/// let config = Arc::new(SnapshotContainerConfig::from_json(
///     r#"[{"gadgets.container": ["default"], "gadgets.uri.proxy.host": "proxy.com"},
///         {"gadgets.container": ["accel"], "gadgets.uri.proxy.path": "/gadgets/accel"}]"#,
/// )?);
/// let manager = DefaultAccelUriManager::new(Arc::<SnapshotContainerConfig>::clone(&config), Arc::new(DefaultProxyUriManager::new(config)));
///
/// let accelerated = manager.normalize(&Uri::parse("http://example.com/page.html")?)?;
/// assert!(manager.looks_like_accel_uri(&accelerated));
/// assert_eq!(manager.normalize(&accelerated)?, accelerated);
/// # Ok::<_, Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct DefaultAccelUriManager {
    config: Arc<dyn ContainerConfig>,
    proxy: Arc<dyn ProxyUriManager>,
}

impl DefaultAccelUriManager {
    /// Creates a manager reading the accelerator's host and path from `config` and building
    /// URIs with `proxy`.
    #[must_use]
    pub fn new(config: Arc<dyn ContainerConfig>, proxy: Arc<dyn ProxyUriManager>) -> Self {
        Self { config, proxy }
    }
}

impl AccelUriManager for DefaultAccelUriManager {
    fn looks_like_accel_uri(&self, uri: &Uri) -> bool {
        let config = self.config.as_ref();
        let (Some(host), Some(path)) = (
            lookup(config, ACCEL_CONTAINER, PROXY_HOST_KEY),
            lookup(config, ACCEL_CONTAINER, PROXY_PATH_KEY),
        ) else {
            return false;
        };

        let prefix = path.split_once(CHAINED_PARAMS_TOKEN).map_or(path.as_str(), |(prefix, _)| prefix);
        uri.authority().is_some_and(|authority| authority.eq_ignore_ascii_case(&host)) && uri.path().starts_with(prefix)
    }

    fn normalize(&self, uri: &Uri) -> Result<Uri, GadgetError> {
        if self.looks_like_accel_uri(uri) {
            return Ok(uri.clone());
        }

        if !matches!(uri.scheme(), Some("http" | "https")) {
            return Err(GadgetError::invalid(format!("only http and https URIs can be accelerated, got '{uri}'")));
        }

        self.proxy
            .make(&[ProxyUri::new(ACCEL_CONTAINER, uri.clone())], None)?
            .pop()
            .ok_or_else(|| GadgetError::caused_by(ErrorCode::InternalConfiguration, "proxy manager built no accelerator URI"))
    }
}

fn request_target<B>(request: &Request<B>) -> Result<Uri, GadgetError> {
    let target = request.uri();
    let absolute = match (target.scheme_str(), target.authority()) {
        (Some(_), Some(_)) => target.to_string(),
        _ => {
            let host = request
                .headers()
                .get(HOST)
                .and_then(|host| host.to_str().ok())
                .filter(|host| !host.is_empty())
                .ok_or_else(|| GadgetError::missing("request has no host"))?;
            let path_and_query = target.path_and_query().map_or("/", |path_and_query| path_and_query.as_str());
            format!("http://{host}{path_and_query}")
        }
    };

    Uri::parse(&absolute).map_err(|error| GadgetError::caused_by(ErrorCode::InvalidParameter, error))
}

#[cfg(test)]
mod tests {
    use container_config::SnapshotContainerConfig;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::DefaultProxyUriManager;

    static_assertions::assert_impl_all!(DefaultAccelUriManager: Send, Sync, AccelUriManager);

    const CONFIG: &str = r#"[
        {
            "gadgets.container": ["default"],
            "gadgets.uri.proxy.host": "proxy.com",
            "gadgets.uri.proxy.path": "/gadgets/proxy"
        },
        {
            "gadgets.container": ["accel"],
            "gadgets.uri.proxy.path": "/gadgets/accel"
        }
    ]"#;

    fn manager_for(config: &str) -> DefaultAccelUriManager {
        let config = Arc::new(SnapshotContainerConfig::from_json(config).unwrap());
        DefaultAccelUriManager::new(Arc::<SnapshotContainerConfig>::clone(&config), Arc::new(DefaultProxyUriManager::new(config)))
    }

    fn manager() -> DefaultAccelUriManager {
        manager_for(CONFIG)
    }

    fn uri(value: &str) -> Uri {
        Uri::parse(value).unwrap()
    }

    #[test]
    fn normalize_wraps_in_accel_proxy_uri() {
        let made = manager().normalize(&uri("http://example.com/page.html?a=1")).unwrap();

        assert_eq!(
            made.to_string(),
            "//proxy.com/gadgets/accel?url=http%3A%2F%2Fexample.com%2Fpage.html%3Fa%3D1\
             &container=accel&debug=0&nocache=0&roc=1"
        );
    }

    #[test]
    fn accelerated_uris_are_not_accelerated_twice() {
        let manager = manager();
        let once = manager.normalize(&uri("https://example.com/")).unwrap();

        assert!(manager.looks_like_accel_uri(&once));
        assert_eq!(manager.normalize(&once).unwrap(), once);
    }

    #[test]
    fn looks_like_accel_uri() {
        let manager = manager();

        assert!(manager.looks_like_accel_uri(&uri("http://PROXY.com/gadgets/accel?url=x")));
        assert!(!manager.looks_like_accel_uri(&uri("http://proxy.com/gadgets/proxy?url=x")));
        assert!(!manager.looks_like_accel_uri(&uri("http://other.com/gadgets/accel?url=x")));
    }

    #[test]
    fn chained_template_matches_on_prefix() {
        let manager = manager_for(
            r#"[
                {"gadgets.container": ["default"], "gadgets.uri.proxy.host": "proxy.com"},
                {"gadgets.container": ["accel"], "gadgets.uri.proxy.path": "/gadgets/accel/%chained_params%/"}
            ]"#,
        );

        let made = manager.normalize(&uri("http://example.com/a.html")).unwrap();

        assert!(made.path().starts_with("/gadgets/accel/("));
        assert!(manager.looks_like_accel_uri(&made));
    }

    #[test]
    fn non_http_is_rejected() {
        let error = manager().normalize(&uri("ftp://example.com/file")).unwrap_err();
        assert_eq!(error.code(), ErrorCode::InvalidParameter);

        let error = manager().normalize(&uri("//example.com/file")).unwrap_err();
        assert_eq!(error.code(), ErrorCode::InvalidParameter);
    }

    #[test]
    fn unconfigured_accelerator_is_internal_error() {
        let manager = manager_for(r#"{"gadgets.container": ["default"]}"#);

        let error = manager.normalize(&uri("http://example.com/")).unwrap_err();
        assert_eq!(error.code(), ErrorCode::InternalConfiguration);
    }

    #[test]
    fn parse_and_normalize_uses_host_header() {
        let request = Request::builder()
            .uri("/page.html?a=1")
            .header(HOST, "example.com")
            .body(())
            .unwrap();

        let made = manager().parse_and_normalize(&request).unwrap();

        assert_eq!(made.query_parameter("url").as_deref(), Some("http://example.com/page.html?a=1"));
    }

    #[test]
    fn parse_and_normalize_keeps_absolute_target() {
        let request = Request::builder().uri("https://example.com/x").body(()).unwrap();

        let made = manager().parse_and_normalize(&request).unwrap();

        assert_eq!(made.query_parameter("url").as_deref(), Some("https://example.com/x"));
    }

    #[test]
    fn parse_and_normalize_without_host_fails() {
        let request = Request::builder().uri("/page.html").body(()).unwrap();

        let error = manager().parse_and_normalize(&request).unwrap_err();
        assert_eq!(error.code(), ErrorCode::MissingParameter);
    }
}
