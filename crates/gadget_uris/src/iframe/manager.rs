// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use container_config::{ContainerConfig, DEFAULT_CONTAINER};
use tracing::{Level, event};

use super::{
    ALWAYS_APPEND_SECURITY_TOKEN_KEY, IFRAME_BASE_PATH_KEY, IframeUriManager, IframeVersioner, LOCKED_DOMAIN_REQUIRED_KEY,
    LOCKED_DOMAIN_SUFFIX_KEY, UNLOCKED_DOMAIN_KEY,
};
use crate::common::{lookup, require};
use crate::hooks::{ExtraParameters, LockedDomainExclusion, SchemeSelection, TokenForRendering};
use crate::params::{Param, USER_PREF_PREFIX, flag};
use crate::{
    ConfigurationError, Gadget, GadgetContext, GadgetSpec, HashShaLockedDomainPrefixGenerator, LOCKED_DOMAIN_FEATURE,
    LockedDomainPrefixGenerator, SECURITY_TOKEN_FEATURE, Uri, UriBuilder, UriStatus, ViewContentType,
};

/// The standard [`IframeUriManager`].
///
/// Gadgets that need the isolation of a locked domain are rendered on
/// `{prefix}{lockedDomainSuffix}`, where the prefix is derived from the gadget URL by the
/// configured [`LockedDomainPrefixGenerator`]. Everything else shares the container's unlocked
/// domain. Locked domains are off until enabled with
/// [`with_locked_domain_enabled`](Self::with_locked_domain_enabled).
///
/// Deployment-specific policy is plugged in as closures:
///
/// - [`with_locked_domain_exclusion`](Self::with_locked_domain_exclusion) keeps gadgets off
///   locked domains.
/// - [`with_scheme`](Self::with_scheme) picks the scheme; rendering URIs are protocol-relative
///   without it.
/// - [`with_token_for_rendering`](Self::with_token_for_rendering) moves the security token from
///   the fragment to the query, where the server sees it.
/// - [`with_extra_parameters`](Self::with_extra_parameters) appends parameters of its own.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use container_config::SnapshotContainerConfig;
/// use gadget_uris::{
///     DefaultIframeUriManager, Gadget, GadgetContext, GadgetSpec, IframeUriManager, Uri, UriStatus,
///     View, ViewContentType,
/// };
///
/// let config = SnapshotContainerConfig::from_json(
///     r#"{"gadgets.container": ["default"],
///         "gadgets.uri.iframe.basePath": "/gadgets/ifr",
///         "gadgets.uri.iframe.unlockedDomain": "unlocked.com",
///         "gadgets.uri.iframe.lockedDomainSuffix": ".locked.com"}"#,
/// )?;
/// let manager = DefaultIframeUriManager::new(Arc::new(config))
///     .with_locked_domain_enabled(true)
///     .with_scheme(|_, _| Some("https".to_owned()));
///
/// let url = Uri::parse("http://www.apache.org/gadget.xml")?;
/// let spec = GadgetSpec::new(url.clone())
///     .with_feature("locked-domain")
///     .with_view(View::new("default", ViewContentType::Html));
/// let gadget = Gadget::new(GadgetContext::new("default", url), spec);
///
/// let rendering = manager.make_rendering_uri(&gadget)?;
/// assert_eq!(rendering.authority(), Some("e5bld32ce9pe5ln81rjhe0d0e1vao1ba.locked.com"));
/// assert_eq!(manager.validate_rendering_uri(&rendering), UriStatus::ValidUnversioned);
/// # Ok::<_, Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct DefaultIframeUriManager {
    config: Arc<dyn ContainerConfig>,
    prefix_generator: Arc<dyn LockedDomainPrefixGenerator>,
    versioner: Option<Arc<dyn IframeVersioner>>,
    locked_domain_enabled: bool,
    locked_domain_exclusion: LockedDomainExclusion,
    scheme: SchemeSelection,
    token_for_rendering: TokenForRendering,
    extra_parameters: ExtraParameters,
}

impl DefaultIframeUriManager {
    /// Creates a manager reading paths and domains from `config`.
    #[must_use]
    pub fn new(config: Arc<dyn ContainerConfig>) -> Self {
        Self {
            config,
            prefix_generator: Arc::new(HashShaLockedDomainPrefixGenerator),
            versioner: None,
            locked_domain_enabled: false,
            locked_domain_exclusion: LockedDomainExclusion::new(|_| false),
            scheme: SchemeSelection::new(|_, _| None),
            token_for_rendering: TokenForRendering::new(|_| false),
            extra_parameters: ExtraParameters::new(|_, _| {}),
        }
    }

    /// Renders gadgets that need one on a locked domain.
    ///
    /// **Default**: disabled
    #[must_use]
    pub fn with_locked_domain_enabled(mut self, enabled: bool) -> Self {
        self.locked_domain_enabled = enabled;
        self
    }

    /// Derives locked-domain prefixes with `generator`.
    ///
    /// **Default**: [`HashShaLockedDomainPrefixGenerator`]
    #[must_use]
    pub fn with_prefix_generator(mut self, generator: Arc<dyn LockedDomainPrefixGenerator>) -> Self {
        self.prefix_generator = generator;
        self
    }

    /// Versions built URIs and validates inbound versions with `versioner`.
    #[must_use]
    pub fn with_versioner(mut self, versioner: Arc<dyn IframeVersioner>) -> Self {
        self.versioner = Some(versioner);
        self
    }

    /// Keeps gadgets for which `exclusion` returns `true` off locked domains.
    #[must_use]
    pub fn with_locked_domain_exclusion(mut self, exclusion: impl Fn(&Gadget) -> bool + Send + Sync + 'static) -> Self {
        self.locked_domain_exclusion = LockedDomainExclusion::new(exclusion);
        self
    }

    /// Sets the scheme of rendering URIs to the one `scheme` returns for a gadget and container.
    #[must_use]
    pub fn with_scheme(mut self, scheme: impl Fn(&Gadget, &str) -> Option<String> + Send + Sync + 'static) -> Self {
        self.scheme = SchemeSelection::new(scheme);
        self
    }

    /// Puts the security token in the query for gadgets for which `needed` returns `true`.
    #[must_use]
    pub fn with_token_for_rendering(mut self, needed: impl Fn(&Gadget) -> bool + Send + Sync + 'static) -> Self {
        self.token_for_rendering = TokenForRendering::new(needed);
        self
    }

    /// Lets `extra` append parameters after the standard ones and before the version.
    #[must_use]
    pub fn with_extra_parameters(mut self, extra: impl Fn(&Gadget, &mut UriBuilder) + Send + Sync + 'static) -> Self {
        self.extra_parameters = ExtraParameters::new(extra);
        self
    }

    fn locked_domain_applies(&self, gadget: &Gadget) -> bool {
        self.locked_domain_enabled && !self.locked_domain_exclusion.call(gadget)
    }

    fn authority(&self, gadget: &Gadget) -> Result<String, ConfigurationError> {
        let config = self.config.as_ref();
        let container = gadget.context().container();

        let locked = self.locked_domain_applies(gadget)
            && (gadget.requires_feature(LOCKED_DOMAIN_FEATURE) || config.get_bool(container, LOCKED_DOMAIN_REQUIRED_KEY));
        if locked {
            let suffix = require(config, container, LOCKED_DOMAIN_SUFFIX_KEY)?;
            Ok(format!("{}{suffix}", self.prefix_generator.prefix(gadget.spec().url())))
        } else {
            require(config, container, UNLOCKED_DOMAIN_KEY)
        }
    }

    fn check_domain(&self, uri: &Uri, container: &str, gadget: &Gadget) -> UriStatus {
        let config = self.config.as_ref();
        let Some(suffix) = lookup(config, container, LOCKED_DOMAIN_SUFFIX_KEY) else {
            event!(
                Level::WARN,
                message = "locked domains are enabled but the container has no locked-domain suffix",
                container
            );
            return UriStatus::BadUri;
        };

        let authority = uri.authority().unwrap_or_default().to_ascii_lowercase();
        let unlocked = lookup(config, container, UNLOCKED_DOMAIN_KEY);
        if unlocked.is_some_and(|unlocked| unlocked.eq_ignore_ascii_case(&authority))
            && !config.get_bool(container, LOCKED_DOMAIN_REQUIRED_KEY)
        {
            return UriStatus::ValidUnversioned;
        }

        let expected = self.prefix_generator.prefix(gadget.spec().url());
        match authority.strip_suffix(&suffix.to_ascii_lowercase()) {
            Some(prefix) if prefix == expected => UriStatus::ValidUnversioned,
            _ => {
                event!(
                    Level::DEBUG,
                    message = "rendering URI is not on the gadget's locked domain",
                    authority = %authority,
                    gadget = %gadget.spec().url()
                );
                UriStatus::InvalidDomain
            }
        }
    }
}

/// Returns the `%key%` placeholder a templated rendering URI carries for `key`.
fn placeholder(key: &str) -> String {
    format!("%{key}%")
}

impl IframeUriManager for DefaultIframeUriManager {
    fn make_rendering_uri(&self, gadget: &Gadget) -> Result<Uri, ConfigurationError> {
        let context = gadget.context();
        let container = context.container();
        let view = gadget.current_view();
        let templated = gadget.attributes().templated();
        let value = |key: &str, actual: &str| if templated { placeholder(key) } else { actual.to_owned() };

        let mut builder = match view.map(|view| view.content_type()) {
            Some(ViewContentType::Url { href }) => UriBuilder::from_uri(href),
            _ => {
                let mut builder = UriBuilder::new();
                builder
                    .set_authority(self.authority(gadget)?)
                    .set_path(require(self.config.as_ref(), container, IFRAME_BASE_PATH_KEY)?)
                    .add_query_parameter(Param::Url.key(), gadget.spec().url().to_string());
                if let Some(scheme) = self.scheme.call(gadget, container) {
                    builder.set_scheme(scheme);
                }
                builder
            }
        };

        let locale = context.locale();
        builder
            .add_query_parameter(Param::Container.key(), container)
            .add_query_parameter(Param::View.key(), value(Param::View.key(), gadget.current_view_name()))
            .add_query_parameter(Param::Lang.key(), value(Param::Lang.key(), locale.language()))
            .add_query_parameter(Param::Country.key(), value(Param::Country.key(), locale.country()))
            .add_query_parameter(Param::Debug.key(), value(Param::Debug.key(), flag(context.debug())))
            .add_query_parameter(Param::NoCache.key(), value(Param::NoCache.key(), flag(context.ignore_cache())))
            .add_query_parameter(Param::Sanitize.key(), value(Param::Sanitize.key(), flag(context.sanitize())));

        let prefs_in_query = view.is_some_and(|view| view.needs_user_pref_substitution());
        for pref in gadget.spec().user_prefs() {
            let key = format!("{USER_PREF_PREFIX}{}", pref.name());
            let actual = context
                .user_pref(pref.name())
                .or_else(|| pref.default_value())
                .unwrap_or_default();
            let pref_value = value(&key, actual);
            if prefs_in_query {
                builder.add_query_parameter(key, pref_value);
            } else {
                builder.add_fragment_parameter(key, pref_value);
            }
        }

        if gadget.requires_feature(SECURITY_TOKEN_FEATURE) || self.config.get_bool(container, ALWAYS_APPEND_SECURITY_TOKEN_KEY) {
            let key = Param::SecurityToken.key();
            let token = match context.security_token() {
                Some(token) if !templated => token.to_owned(),
                _ => placeholder(key),
            };
            if self.token_for_rendering.call(gadget) {
                builder.add_query_parameter(key, token);
            } else {
                builder.add_fragment_parameter(key, token);
            }
        }

        let features = gadget.spec().features();
        if !features.is_empty() {
            builder.add_query_parameter(Param::Libs.key(), features.join(":"));
        }

        self.extra_parameters.call(gadget, &mut builder);

        if let Some(versioner) = &self.versioner
            && let Some(version) = versioner.version(gadget.spec().url(), container)
        {
            builder.add_query_parameter(Param::Version.key(), version);
        }

        Ok(builder.build())
    }

    fn validate_rendering_uri(&self, uri: &Uri) -> UriStatus {
        let Some(gadget_url) = uri.query_parameter(Param::Url.key()).filter(|url| !url.is_empty()) else {
            event!(Level::DEBUG, message = "rendering URI has no gadget url", uri = %uri);
            return UriStatus::BadUri;
        };
        let Ok(gadget_url) = Uri::parse(&gadget_url) else {
            event!(Level::DEBUG, message = "rendering URI has a malformed gadget url", uri = %uri);
            return UriStatus::BadUri;
        };

        let container = uri
            .query_parameter(Param::Container.key())
            .filter(|container| !container.is_empty())
            .unwrap_or_else(|| DEFAULT_CONTAINER.to_owned());

        let gadget = Gadget::new(
            GadgetContext::new(container.as_str(), gadget_url.clone()),
            GadgetSpec::new(gadget_url.clone()),
        );
        if self.locked_domain_applies(&gadget) {
            let status = self.check_domain(uri, &container, &gadget);
            if status != UriStatus::ValidUnversioned {
                return status;
            }
        }

        match (&self.versioner, uri.query_parameter(Param::Version.key())) {
            (Some(versioner), Some(version)) if !version.is_empty() => versioner.validate(&gadget_url, &container, &version),
            _ => UriStatus::ValidUnversioned,
        }
    }
}
