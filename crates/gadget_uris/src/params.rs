// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// Query and fragment parameters shared by the URI managers.
///
/// Tokens are case-sensitive. Boolean flags are always written as `"0"` or `"1"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Param {
    /// Container the request is made on behalf of.
    Container,
    /// Gadget spec URL that caused the request.
    Gadget,
    /// Target resource, or the gadget spec URL on rendering URIs.
    Url,
    /// Debug flag.
    Debug,
    /// Cache bypass flag.
    NoCache,
    /// Cache lifetime in seconds.
    Refresh,
    /// Content fingerprint.
    Version,
    /// Gadget view to render.
    View,
    /// Locale language.
    Lang,
    /// Locale country.
    Country,
    /// Sanitized rendering flag.
    Sanitize,
    /// Feature libraries the gadget uses.
    Libs,
    /// Security token.
    SecurityToken,
    /// Mime type the fetched content is rewritten to.
    RewriteMime,
    /// HTML tag the proxied content is referenced from.
    HtmlTagContext,
    /// URL to fall back to when the proxied fetch fails.
    FallbackUrl,
    /// Return the original content if processing fails.
    ReturnOriginalContentOnError,
    /// Variable name concatenated JavaScript is assigned to in split mode.
    Json,
    /// Concat content type.
    Type,
    /// Libraries the client has already loaded.
    Loaded,
    /// JavaScript rendering context.
    RenderingContext,
    /// JavaScript compile mode.
    CompileMode,
    /// JavaScript onload callback.
    Onload,
    /// Load the JavaScript asynchronously.
    JsLoad,
    /// Skip the feature hint.
    NoHint,
}

impl Param {
    /// Returns the parameter name as it appears in a URI.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Container => "container",
            Self::Gadget => "gadget",
            Self::Url => "url",
            Self::Debug => "debug",
            Self::NoCache => "nocache",
            Self::Refresh => "refresh",
            Self::Version => "version",
            Self::View => "view",
            Self::Lang => "lang",
            Self::Country => "country",
            Self::Sanitize => "sanitize",
            Self::Libs => "libs",
            Self::SecurityToken => "st",
            Self::RewriteMime => "rewriteMime",
            Self::HtmlTagContext => "html_tag_context",
            Self::FallbackUrl => "fallback_url",
            Self::ReturnOriginalContentOnError => "roc",
            Self::Json => "json",
            Self::Type => "type",
            Self::Loaded => "loaded",
            Self::RenderingContext => "c",
            Self::CompileMode => "jsmode",
            Self::Onload => "onload",
            Self::JsLoad => "jsload",
            Self::NoHint => "nohint",
        }
    }
}

/// Prefix of user preference parameters on rendering URIs.
pub const USER_PREF_PREFIX: &str = "up_";

pub(crate) fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

pub(crate) fn is_set(value: Option<&str>) -> bool {
    value == Some("1")
}
