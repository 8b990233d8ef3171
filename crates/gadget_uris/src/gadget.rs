// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The gadget model consumed when building rendering URIs.
//!
//! These are plain values: parsing gadget specs is out of scope, callers construct them from
//! whatever representation they hold.

use std::collections::BTreeMap;

use container_config::DEFAULT_CONTAINER;

use crate::Uri;

/// Feature that asks for a per-gadget locked domain.
pub const LOCKED_DOMAIN_FEATURE: &str = "locked-domain";

/// Feature that asks for the security token on the rendering URI.
pub const SECURITY_TOKEN_FEATURE: &str = "security-token";

/// Name of the view rendered when none is requested.
pub const DEFAULT_VIEW: &str = "default";

/// Language and country a gadget is rendered for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locale {
    language: String,
    country: String,
}

impl Locale {
    /// Creates a locale.
    pub fn new(language: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            country: country.into(),
        }
    }

    /// Returns the language, `all` when unspecified.
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Returns the country, `ALL` when unspecified.
    #[must_use]
    pub fn country(&self) -> &str {
        &self.country
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::new("all", "ALL")
    }
}

/// Request-scoped inputs to rendering a gadget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GadgetContext {
    container: String,
    url: Uri,
    debug: bool,
    ignore_cache: bool,
    sanitize: bool,
    locale: Locale,
    security_token: Option<String>,
    user_prefs: BTreeMap<String, String>,
}

impl GadgetContext {
    /// Creates a context for rendering the gadget at `url` on `container`.
    pub fn new(container: impl Into<String>, url: Uri) -> Self {
        Self {
            container: container.into(),
            url,
            debug: false,
            ignore_cache: false,
            sanitize: false,
            locale: Locale::default(),
            security_token: None,
            user_prefs: BTreeMap::new(),
        }
    }

    /// Sets the debug flag.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the cache bypass flag.
    #[must_use]
    pub fn with_ignore_cache(mut self, ignore_cache: bool) -> Self {
        self.ignore_cache = ignore_cache;
        self
    }

    /// Sets the sanitized rendering flag.
    #[must_use]
    pub fn with_sanitize(mut self, sanitize: bool) -> Self {
        self.sanitize = sanitize;
        self
    }

    /// Sets the locale.
    #[must_use]
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Sets the serialized security token.
    #[must_use]
    pub fn with_security_token(mut self, token: impl Into<String>) -> Self {
        self.security_token = Some(token.into());
        self
    }

    /// Supplies a value for the user preference `name`.
    #[must_use]
    pub fn with_user_pref(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_prefs.insert(name.into(), value.into());
        self
    }

    /// Returns the container, never empty.
    #[must_use]
    pub fn container(&self) -> &str {
        if self.container.is_empty() {
            DEFAULT_CONTAINER
        } else {
            &self.container
        }
    }

    /// Returns the URL of the gadget being rendered.
    #[must_use]
    pub fn url(&self) -> &Uri {
        &self.url
    }

    /// Returns the debug flag.
    #[must_use]
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Returns the cache bypass flag.
    #[must_use]
    pub fn ignore_cache(&self) -> bool {
        self.ignore_cache
    }

    /// Returns the sanitized rendering flag.
    #[must_use]
    pub fn sanitize(&self) -> bool {
        self.sanitize
    }

    /// Returns the locale.
    #[must_use]
    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    /// Returns the serialized security token, if the request carries one.
    #[must_use]
    pub fn security_token(&self) -> Option<&str> {
        self.security_token.as_deref()
    }

    /// Returns the value supplied for the user preference `name`.
    #[must_use]
    pub fn user_pref(&self, name: &str) -> Option<&str> {
        self.user_prefs.get(name).map(String::as_str)
    }
}

/// A user preference a gadget declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPref {
    name: String,
    default_value: Option<String>,
}

impl UserPref {
    /// Creates a preference with an optional default.
    pub fn new(name: impl Into<String>, default_value: Option<String>) -> Self {
        Self {
            name: name.into(),
            default_value,
        }
    }

    /// Returns the preference name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the default value.
    #[must_use]
    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }
}

/// How a view's content is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewContentType {
    /// Markup rendered by the container.
    Html,
    /// Markup rendered by the container after sanitization.
    HtmlSanitized,
    /// Content served by the gadget itself from `href`.
    Url {
        /// Where the gadget serves the view.
        href: Uri,
    },
}

/// One view of a gadget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    name: String,
    content_type: ViewContentType,
    needs_user_pref_substitution: bool,
}

impl View {
    /// Creates a view.
    pub fn new(name: impl Into<String>, content_type: ViewContentType) -> Self {
        Self {
            name: name.into(),
            content_type,
            needs_user_pref_substitution: false,
        }
    }

    /// Marks the view as substituting user preferences on the server.
    #[must_use]
    pub fn with_user_pref_substitution(mut self, needed: bool) -> Self {
        self.needs_user_pref_substitution = needed;
        self
    }

    /// Returns the view name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns how the view's content is delivered.
    #[must_use]
    pub fn content_type(&self) -> &ViewContentType {
        &self.content_type
    }

    /// Returns `true` if user preferences must reach the server, in the query.
    #[must_use]
    pub fn needs_user_pref_substitution(&self) -> bool {
        self.needs_user_pref_substitution
    }
}

/// The parts of a gadget spec rendering URIs depend on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GadgetSpec {
    url: Uri,
    user_prefs: Vec<UserPref>,
    features: Vec<String>,
    views: BTreeMap<String, View>,
}

impl GadgetSpec {
    /// Creates a spec for the gadget at `url`.
    #[must_use]
    pub fn new(url: Uri) -> Self {
        Self {
            url,
            user_prefs: Vec::new(),
            features: Vec::new(),
            views: BTreeMap::new(),
        }
    }

    /// Declares a user preference.
    #[must_use]
    pub fn with_user_pref(mut self, pref: UserPref) -> Self {
        self.user_prefs.push(pref);
        self
    }

    /// Declares a required feature.
    #[must_use]
    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.features.push(feature.into());
        self
    }

    /// Adds a view, replacing any view of the same name.
    #[must_use]
    pub fn with_view(mut self, view: View) -> Self {
        self.views.insert(view.name.clone(), view);
        self
    }

    /// Returns the spec URL.
    #[must_use]
    pub fn url(&self) -> &Uri {
        &self.url
    }

    /// Returns the declared user preferences, in declaration order.
    #[must_use]
    pub fn user_prefs(&self) -> &[UserPref] {
        &self.user_prefs
    }

    /// Returns the declared features, in declaration order.
    #[must_use]
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Returns the view named `name`.
    #[must_use]
    pub fn view(&self, name: &str) -> Option<&View> {
        self.views.get(name)
    }

    /// Returns every view keyed by name.
    #[must_use]
    pub fn views(&self) -> &BTreeMap<String, View> {
        &self.views
    }
}

/// Typed per-render state that travels with a [`Gadget`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderingAttributes {
    templated: bool,
}

impl RenderingAttributes {
    /// Sets whether the rendering URI carries placeholders for client-side expansion.
    #[must_use]
    pub fn with_templated(mut self, templated: bool) -> Self {
        self.templated = templated;
        self
    }

    /// Returns `true` if the rendering URI carries placeholders instead of values.
    #[must_use]
    pub fn templated(&self) -> bool {
        self.templated
    }
}

/// A gadget being rendered: its spec, the request context and the view to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gadget {
    context: GadgetContext,
    spec: GadgetSpec,
    current_view: String,
    attributes: RenderingAttributes,
}

impl Gadget {
    /// Creates a gadget rendering the [`DEFAULT_VIEW`].
    #[must_use]
    pub fn new(context: GadgetContext, spec: GadgetSpec) -> Self {
        Self {
            context,
            spec,
            current_view: DEFAULT_VIEW.to_owned(),
            attributes: RenderingAttributes::default(),
        }
    }

    /// Selects the view to render.
    #[must_use]
    pub fn with_view(mut self, view: impl Into<String>) -> Self {
        self.current_view = view.into();
        self
    }

    /// Sets the rendering attributes.
    #[must_use]
    pub fn with_attributes(mut self, attributes: RenderingAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Returns the request context.
    #[must_use]
    pub fn context(&self) -> &GadgetContext {
        &self.context
    }

    /// Returns the spec.
    #[must_use]
    pub fn spec(&self) -> &GadgetSpec {
        &self.spec
    }

    /// Returns the name of the view to render.
    #[must_use]
    pub fn current_view_name(&self) -> &str {
        &self.current_view
    }

    /// Returns the view to render, if the spec declares it.
    #[must_use]
    pub fn current_view(&self) -> Option<&View> {
        self.spec.view(&self.current_view)
    }

    /// Returns the rendering attributes.
    #[must_use]
    pub fn attributes(&self) -> RenderingAttributes {
        self.attributes
    }

    /// Returns `true` if the spec declares `feature`.
    #[must_use]
    pub fn requires_feature(&self, feature: &str) -> bool {
        self.spec.features.iter().any(|f| f == feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Uri {
        Uri::parse("http://example.com/gadget.xml").unwrap()
    }

    #[test]
    fn context_defaults() {
        let context = GadgetContext::new("", url());

        assert_eq!(context.container(), "default");
        assert_eq!(context.locale().language(), "all");
        assert_eq!(context.locale().country(), "ALL");
        assert!(!context.debug());
        assert!(!context.ignore_cache());
        assert_eq!(context.security_token(), None);
    }

    #[test]
    fn gadget_view_and_features() {
        let spec = GadgetSpec::new(url())
            .with_feature(LOCKED_DOMAIN_FEATURE)
            .with_view(View::new("canvas", ViewContentType::Html).with_user_pref_substitution(true));
        let gadget = Gadget::new(GadgetContext::new("social", url()), spec).with_view("canvas");

        assert!(gadget.requires_feature(LOCKED_DOMAIN_FEATURE));
        assert!(!gadget.requires_feature(SECURITY_TOKEN_FEATURE));
        assert!(gadget.current_view().unwrap().needs_user_pref_substitution());
        assert!(!gadget.attributes().templated());
    }

    #[test]
    fn missing_view() {
        let gadget = Gadget::new(GadgetContext::new("social", url()), GadgetSpec::new(url()));
        assert_eq!(gadget.current_view_name(), DEFAULT_VIEW);
        assert!(gadget.current_view().is_none());
    }
}
