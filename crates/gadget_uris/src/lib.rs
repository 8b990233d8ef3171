// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Construction, parsing and validation of the URIs a gadget server hands out.
//!
//! A gadget server renders third-party gadgets inside iframes and serves the resources they
//! need. Every such URL follows a wire format that the server must both produce and accept
//! back: rendering URIs, proxied resources, concatenated script and style batches, JavaScript
//! feature bundles and accelerated pages. This crate owns those formats.
//!
//! # Managers
//!
//! Each URI family has a trait and a default implementation that reads hosts and paths from a
//! [`ContainerConfig`](container_config::ContainerConfig) on every call:
//!
//! - [`IframeUriManager`] / [`DefaultIframeUriManager`] - rendering URIs, including locked
//!   domains and security-token placement.
//! - [`ProxyUriManager`] / [`DefaultProxyUriManager`] - single proxied resources, in query or
//!   chained style.
//! - [`ConcatUriManager`] / [`DefaultConcatUriManager`] - batches of scripts or style sheets,
//!   split to respect a maximum URL length.
//! - [`JsUriManager`] / [`DefaultJsUriManager`] - JavaScript feature bundles.
//! - [`AccelUriManager`] / [`DefaultAccelUriManager`] - accelerated pages, built on the proxy
//!   manager.
//! - [`OAuthUriManager`] / [`DefaultOAuthUriManager`] - OAuth callback URIs.
//!
//! # Versioning
//!
//! Managers optionally embed a content fingerprint in the URIs they build so that responses can
//! be cached for a long time, and report on inbound URIs whether the presented version is still
//! current through [`UriStatus`]. [`ContentHashVersioner`] and [`DefaultJsVersioner`] derive
//! versions with [`fingerprint`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use container_config::SnapshotContainerConfig;
//! use gadget_uris::{DefaultProxyUriManager, ProxyUri, ProxyUriManager, Uri, UriStatus};
//!
//! let config = SnapshotContainerConfig::from_json(
//!     r#"{"gadgets.container": ["default"],
//!         "gadgets.uri.proxy.host": "proxy.example.com",
//!         "gadgets.uri.proxy.path": "/gadgets/proxy"}"#,
//! )?;
//! let manager = DefaultProxyUriManager::new(Arc::new(config));
//!
//! let image = Uri::parse("http://images.example.com/logo.png")?;
//! let proxied = manager.make(&[ProxyUri::new("default", image.clone())], None)?;
//!
//! let inbound = manager.process(&proxied[0])?;
//! assert_eq!(inbound.resource(), &image);
//! assert_eq!(inbound.status(), UriStatus::ValidUnversioned);
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```

#![doc(
    html_logo_url = "https://media.githubusercontent.com/media/microsoft/oxidizer/refs/heads/main/crates/gadget_uris/logo.png"
)]
#![doc(
    html_favicon_url = "https://media.githubusercontent.com/media/microsoft/oxidizer/refs/heads/main/crates/gadget_uris/favicon.ico"
)]

mod accel;
mod common;
mod concat;
mod error;
mod gadget;
mod hooks;
mod iframe;
mod js;
mod locked_domain;
mod oauth;
mod params;
mod proxy;
mod status;
mod uri;
mod versioning;

pub use accel::{ACCEL_CONTAINER, AccelUriManager, DefaultAccelUriManager};
pub use concat::{
    CONCAT_HOST_KEY, CONCAT_JS_SPLIT_TOKEN_KEY, CONCAT_MAX_URL_LENGTH_KEY, CONCAT_PATH_KEY, ConcatData, ConcatPart, ConcatType,
    ConcatUri, ConcatUriManager, ConcatVersioner, DEFAULT_MAX_URL_LENGTH, DefaultConcatUriManager,
};
pub use error::{ConfigurationError, ErrorCode, GadgetError, UriParseError};
pub use gadget::{
    DEFAULT_VIEW, Gadget, GadgetContext, GadgetSpec, LOCKED_DOMAIN_FEATURE, Locale, RenderingAttributes, SECURITY_TOKEN_FEATURE,
    UserPref, View, ViewContentType,
};
pub use iframe::{
    ALWAYS_APPEND_SECURITY_TOKEN_KEY, DefaultIframeUriManager, IFRAME_BASE_PATH_KEY, IframeUriManager, IframeVersioner,
    LOCKED_DOMAIN_REQUIRED_KEY, LOCKED_DOMAIN_SUFFIX_KEY, UNLOCKED_DOMAIN_KEY,
};
pub use js::{
    DefaultJsUriManager, DefaultJsVersioner, FeatureRegistry, FeatureRegistryError, FeatureResource, JS_HOST_KEY, JS_PATH_KEY,
    JsCompileMode, JsUri, JsUriManager, JsVersioner, RenderingContext,
};
pub use locked_domain::{HashShaLockedDomainPrefixGenerator, LockedDomainPrefixGenerator};
pub use oauth::{DefaultOAuthUriManager, OAUTH_CALLBACK_TEMPLATE_KEY, OAuthUriManager};
pub use params::{Param, USER_PREF_PREFIX};
pub use proxy::{CHAINED_PARAMS_TOKEN, DefaultProxyUriManager, PROXY_HOST_KEY, PROXY_PATH_KEY, ProxyUri, ProxyUriManager, ProxyVersioner};
pub use status::UriStatus;
pub use uri::{Uri, UriBuilder};
pub use versioning::{ContentHashVersioner, ContentSource, fingerprint};
