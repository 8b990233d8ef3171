// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use container_config::{ContainerConfig, DEFAULT_CONTAINER};
use tracing::{Level, event};

use super::{JS_HOST_KEY, JS_PATH_KEY, JsCompileMode, JsUri, JsUriManager, JsVersioner, RenderingContext};
use crate::common::{lookup, parameter, require};
use crate::params::{Param, flag, is_set};
use crate::uri::{decode_component, encode_component};
use crate::{ConfigurationError, Uri, UriBuilder, UriStatus};

const LIB_SEPARATOR: &str = ":";
const LOADED_SEPARATOR: char = '!';
const JS_SUFFIX: &str = ".js";

/// The standard [`JsUriManager`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use container_config::SnapshotContainerConfig;
/// use gadget_uris::{DefaultJsUriManager, JsUri, JsUriManager};
///
/// let config = SnapshotContainerConfig::from_json(
///     r#"{"gadgets.container": ["default"],
///         "gadgets.uri.js.host": "//js.com",
///         "gadgets.uri.js.path": "/gadgets/js"}"#,
/// )?;
/// let manager = DefaultJsUriManager::new(Arc::new(config));
///
/// let made = manager.make_extern_js_uri(&JsUri::new("default", ["rpc", "pubsub"]))?;
/// assert_eq!(made.path(), "/gadgets/js/rpc:pubsub.js");
/// assert_eq!(manager.process_extern_js_uri(&made).libs(), ["rpc", "pubsub"]);
/// # Ok::<_, Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct DefaultJsUriManager {
    config: Arc<dyn ContainerConfig>,
    versioner: Option<Arc<dyn JsVersioner>>,
}

impl DefaultJsUriManager {
    /// Creates a manager reading hosts and paths from `config`.
    #[must_use]
    pub fn new(config: Arc<dyn ContainerConfig>) -> Self {
        Self { config, versioner: None }
    }

    /// Versions built URIs and validates inbound versions with `versioner`.
    #[must_use]
    pub fn with_versioner(mut self, versioner: Arc<dyn JsVersioner>) -> Self {
        self.versioner = Some(versioner);
        self
    }

    fn parse(&self, uri: &Uri) -> Result<JsUri, &'static str> {
        let parameters = uri.query_parameters();
        let get = |key: Param| parameter(&parameters, key.key()).filter(|value| !value.is_empty());

        let container = get(Param::Container).unwrap_or_else(|| DEFAULT_CONTAINER.to_owned());
        let config = self.config.as_ref();
        let host = lookup(config, &container, JS_HOST_KEY).ok_or("container has no JavaScript host")?;
        let path = lookup(config, &container, JS_PATH_KEY).ok_or("container has no JavaScript path")?;

        let (_, authority) = split_host(&host);
        if !uri.authority().is_some_and(|actual| actual.eq_ignore_ascii_case(authority)) {
            return Err("not addressed to the configured JavaScript host");
        }

        let features = uri
            .path()
            .strip_prefix(path.as_str())
            .ok_or("not under the configured JavaScript path")?;
        let features = features.strip_prefix('/').unwrap_or(features);
        let features = features.strip_suffix(JS_SUFFIX).ok_or("JavaScript path must end with .js")?;

        let (libs, loaded) = features.split_once(LOADED_SEPARATOR).unwrap_or((features, ""));
        let mut loaded_libs = split_libs(loaded);
        if let Some(extra) = get(Param::Loaded) {
            loaded_libs.extend(extra.split(LIB_SEPARATOR).filter(|lib| !lib.is_empty()).map(str::to_owned));
        }

        let mut js = JsUri::new(container, split_libs(libs))
            .with_loaded_libs(loaded_libs)
            .with_context(
                get(Param::RenderingContext)
                    .as_deref()
                    .and_then(RenderingContext::from_param_value)
                    .unwrap_or_default(),
            )
            .with_compile_mode(
                get(Param::CompileMode)
                    .as_deref()
                    .and_then(JsCompileMode::from_param_value)
                    .unwrap_or_default(),
            )
            .with_debug(is_set(get(Param::Debug).as_deref()))
            .with_no_cache(is_set(get(Param::NoCache).as_deref()))
            .with_jsload(is_set(get(Param::JsLoad).as_deref()))
            .with_nohint(is_set(get(Param::NoHint).as_deref()))
            .with_original(uri.clone());
        if let Some(gadget) = get(Param::Url) {
            js = js.with_gadget(gadget);
        }
        if let Some(onload) = get(Param::Onload) {
            js = js.with_onload(onload);
        }

        let status = match (&self.versioner, get(Param::Version)) {
            (Some(versioner), Some(version)) => versioner.validate(&js, &version),
            _ => UriStatus::ValidUnversioned,
        };

        Ok(js.with_status(status))
    }
}

impl JsUriManager for DefaultJsUriManager {
    fn make_extern_js_uri(&self, uri: &JsUri) -> Result<Uri, ConfigurationError> {
        let container = uri.container();
        let host = require(self.config.as_ref(), container, JS_HOST_KEY)?;
        let mut path = require(self.config.as_ref(), container, JS_PATH_KEY)?;

        if !path.ends_with('/') {
            path.push('/');
        }
        path.push_str(&join_libs(uri.libs()));
        if !uri.loaded_libs().is_empty() {
            path.push(LOADED_SEPARATOR);
            path.push_str(&join_libs(uri.loaded_libs()));
        }
        path.push_str(JS_SUFFIX);

        let (scheme, authority) = split_host(&host);
        let mut builder = UriBuilder::new();
        if let Some(scheme) = scheme {
            builder.set_scheme(scheme);
        }
        builder
            .set_authority(authority)
            .set_path(path)
            .add_query_parameter(Param::Container.key(), container)
            .add_query_parameter(Param::NoCache.key(), flag(uri.no_cache()))
            .add_query_parameter(Param::Debug.key(), flag(uri.debug()))
            .add_query_parameter(Param::RenderingContext.key(), uri.context().param_value());

        if let Some(gadget) = uri.gadget() {
            builder.add_query_parameter(Param::Url.key(), gadget);
        }
        if let Some(onload) = uri.onload() {
            builder.add_query_parameter(Param::Onload.key(), onload);
        }
        if uri.jsload() {
            builder.add_query_parameter(Param::JsLoad.key(), flag(true));
        }
        if uri.nohint() {
            builder.add_query_parameter(Param::NoHint.key(), flag(true));
        }
        if uri.compile_mode() != JsCompileMode::default() {
            builder.add_query_parameter(Param::CompileMode.key(), uri.compile_mode().param_value());
        }
        if !uri.no_cache()
            && let Some(versioner) = &self.versioner
            && let Some(version) = versioner.version(uri).filter(|version| !version.is_empty())
        {
            builder.add_query_parameter(Param::Version.key(), version);
        }

        Ok(builder.build())
    }

    fn process_extern_js_uri(&self, uri: &Uri) -> JsUri {
        self.parse(uri).unwrap_or_else(|reason| {
            event!(Level::DEBUG, message = "rejected JavaScript URI", uri = %uri, reason);
            let container = uri
                .query_parameter(Param::Container.key())
                .unwrap_or_else(|| DEFAULT_CONTAINER.to_owned());
            JsUri::bad(container, uri.clone())
        })
    }
}

/// Splits a configured host into its optional scheme and its authority.
fn split_host(host: &str) -> (Option<&str>, &str) {
    match host.split_once("://") {
        Some((scheme, authority)) if !scheme.is_empty() => (Some(scheme), authority),
        _ => (None, host.strip_prefix("//").unwrap_or(host)),
    }
}

fn join_libs(libs: &[String]) -> String {
    libs.iter()
        .map(|lib| encode_component(lib))
        .collect::<Vec<_>>()
        .join(LIB_SEPARATOR)
}

fn split_libs(encoded: &str) -> Vec<String> {
    encoded
        .split(LIB_SEPARATOR)
        .filter(|lib| !lib.is_empty())
        .map(decode_component)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use container_config::SnapshotContainerConfig;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tracing_test::traced_test;

    use super::*;
    use crate::{DefaultJsVersioner, FeatureResource};

    static_assertions::assert_impl_all!(DefaultJsUriManager: Send, Sync, JsUriManager);

    const CONFIG: &str = r#"[
        {
            "gadgets.container": ["default"],
            "gadgets.uri.js.host": "//js.com",
            "gadgets.uri.js.path": "/gadgets/js"
        },
        {
            "gadgets.container": ["secure"],
            "gadgets.uri.js.host": "https://Secure.JS.com",
            "gadgets.uri.js.path": "/js/"
        },
        {
            "gadgets.container": ["unconfigured"],
            "parent": null
        }
    ]"#;

    fn manager() -> DefaultJsUriManager {
        DefaultJsUriManager::new(Arc::new(SnapshotContainerConfig::from_json(CONFIG).unwrap()))
    }

    fn uri(value: &str) -> Uri {
        Uri::parse(value).unwrap()
    }

    #[test]
    fn make_orders_parameters() {
        let js = JsUri::new("default", ["rpc", "pubsub"])
            .with_loaded_libs(["core"])
            .with_context(RenderingContext::Container)
            .with_gadget("http://g.com/g.xml")
            .with_onload("ready")
            .with_jsload(true)
            .with_nohint(true)
            .with_compile_mode(JsCompileMode::ConcatCompileExportAll);

        let made = manager().make_extern_js_uri(&js).unwrap();

        assert_eq!(
            made.to_string(),
            "//js.com/gadgets/js/rpc:pubsub!core.js?container=default&nocache=0&debug=0&c=1\
             &url=http%3A%2F%2Fg.com%2Fg.xml&onload=ready&jsload=1&nohint=1&jsmode=all"
        );
    }

    #[test]
    fn round_trip() {
        let manager = manager();
        let js = JsUri::new("default", ["rpc", "rpc", "a:b", "c!d", "e/f"])
            .with_loaded_libs(["core"])
            .with_context(RenderingContext::ConfiguredGadget)
            .with_gadget("http://g.com/g.xml")
            .with_debug(true)
            .with_no_cache(true)
            .with_onload("ready")
            .with_compile_mode(JsCompileMode::ConcatCompileExportExplicit);

        let made = manager.make_extern_js_uri(&js).unwrap();
        let processed = manager.process_extern_js_uri(&made);

        assert_eq!(processed.status(), UriStatus::ValidUnversioned);
        assert_eq!(processed.libs(), js.libs());
        assert_eq!(processed.loaded_libs(), js.loaded_libs());
        assert_eq!(processed.context(), js.context());
        assert_eq!(processed.compile_mode(), js.compile_mode());
        assert_eq!(processed.gadget(), js.gadget());
        assert_eq!(processed.onload(), js.onload());
        assert!(processed.debug());
        assert!(processed.no_cache());
        assert_eq!(processed.original(), Some(&made));
    }

    #[test]
    fn host_may_carry_scheme() {
        let manager = manager();

        let made = manager.make_extern_js_uri(&JsUri::new("secure", ["rpc"])).unwrap();
        assert_eq!(made.scheme(), Some("https"));
        assert_eq!(made.authority(), Some("secure.js.com"));
        assert_eq!(made.path(), "/js/rpc.js");

        assert_eq!(manager.process_extern_js_uri(&made).libs(), ["rpc"]);
    }

    #[test]
    #[traced_test]
    fn missing_configuration_fails() {
        let error = manager()
            .make_extern_js_uri(&JsUri::new("unconfigured", ["rpc"]))
            .unwrap_err();
        assert_eq!(error.key(), JS_HOST_KEY);
        assert!(logs_contain("required container configuration is missing"));
    }

    #[test]
    fn loaded_parameter_adds_loaded_libs() {
        let processed = manager().process_extern_js_uri(&uri("//js.com/gadgets/js/rpc!core.js?loaded=a:b"));
        assert_eq!(processed.loaded_libs(), ["core", "a", "b"]);
    }

    #[test]
    fn empty_tokens_are_skipped_and_container_defaults() {
        let processed = manager().process_extern_js_uri(&uri("//js.com/gadgets/js/:rpc::pubsub:.js"));

        assert_eq!(processed.status(), UriStatus::ValidUnversioned);
        assert_eq!(processed.container(), DEFAULT_CONTAINER);
        assert_eq!(processed.libs(), ["rpc", "pubsub"]);
        assert_eq!(processed.context(), RenderingContext::Gadget);
    }

    #[rstest]
    #[case::wrong_host("//elsewhere.com/gadgets/js/rpc.js")]
    #[case::wrong_path("//js.com/other/rpc.js")]
    #[case::not_js("//js.com/gadgets/js/rpc.css")]
    #[case::unconfigured("//js.com/gadgets/js/rpc.js?container=unconfigured")]
    #[case::relative("/gadgets/js/rpc.js")]
    fn bad_uris(#[case] inbound: &str) {
        let processed = manager().process_extern_js_uri(&uri(inbound));

        assert_eq!(processed.status(), UriStatus::BadUri);
        assert!(processed.libs().is_empty());
    }

    #[test]
    #[traced_test]
    fn rejections_are_logged() {
        let processed = manager().process_extern_js_uri(&uri("//js.com/gadgets/js/rpc.css?container=default"));

        assert_eq!(processed.container(), DEFAULT_CONTAINER);
        assert_eq!(processed.original(), Some(&uri("//js.com/gadgets/js/rpc.css?container=default")));
        assert!(logs_contain("rejected JavaScript URI"));
    }

    #[test]
    fn versions_round_trip() {
        let registry = HashMap::from([
            ("feature1".to_owned(), FeatureResource::new("one", "one-debug")),
            ("feature2".to_owned(), FeatureResource::new("two", "two-debug")),
        ]);
        let manager = manager().with_versioner(Arc::new(DefaultJsVersioner::new(registry)));

        let one = manager.make_extern_js_uri(&JsUri::new("default", ["feature1"])).unwrap();
        let two = manager.make_extern_js_uri(&JsUri::new("default", ["feature2"])).unwrap();
        let version = one.query_parameter("version").unwrap();

        assert_ne!(Some(&version), two.query_parameter("version").as_ref());
        assert_eq!(manager.process_extern_js_uri(&one).status(), UriStatus::ValidVersioned);

        let stale = uri(&one.to_string().replace(&version, "stale"));
        assert_eq!(manager.process_extern_js_uri(&stale).status(), UriStatus::InvalidVersion);

        let empty = uri(&one.to_string().replace(&version, ""));
        assert_eq!(manager.process_extern_js_uri(&empty).status(), UriStatus::ValidUnversioned);

        let no_cache = manager
            .make_extern_js_uri(&JsUri::new("default", ["feature1"]).with_no_cache(true))
            .unwrap();
        assert_eq!(no_cache.query_parameter("version"), None);
    }
}
