// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::{GadgetContext, Uri, UriStatus};

/// Where the requested JavaScript runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RenderingContext {
    /// Inside a gadget iframe.
    #[default]
    Gadget,
    /// In the container page.
    Container,
    /// Inside a gadget iframe configured by the container.
    ConfiguredGadget,
}

impl RenderingContext {
    /// Returns the value of the `c` parameter.
    #[must_use]
    pub fn param_value(self) -> &'static str {
        match self {
            Self::Gadget => "0",
            Self::Container => "1",
            Self::ConfiguredGadget => "2",
        }
    }

    /// Recognizes a `c` parameter value.
    #[must_use]
    pub fn from_param_value(value: &str) -> Option<Self> {
        match value {
            "0" => Some(Self::Gadget),
            "1" => Some(Self::Container),
            "2" => Some(Self::ConfiguredGadget),
            _ => None,
        }
    }
}

/// How the requested features are compiled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum JsCompileMode {
    /// Concatenate the features.
    #[default]
    CompileConcat,
    /// Concatenate and export every symbol.
    ConcatCompileExportAll,
    /// Concatenate and export the explicitly declared symbols.
    ConcatCompileExportExplicit,
}

impl JsCompileMode {
    /// Returns the value of the `jsmode` parameter.
    #[must_use]
    pub fn param_value(self) -> &'static str {
        match self {
            Self::CompileConcat => "concat",
            Self::ConcatCompileExportAll => "all",
            Self::ConcatCompileExportExplicit => "explicit",
        }
    }

    /// Recognizes a `jsmode` parameter value.
    #[must_use]
    pub fn from_param_value(value: &str) -> Option<Self> {
        match value {
            "concat" => Some(Self::CompileConcat),
            "all" => Some(Self::ConcatCompileExportAll),
            "explicit" => Some(Self::ConcatCompileExportExplicit),
            _ => None,
        }
    }
}

/// A request for a set of JavaScript features.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsUri {
    status: UriStatus,
    libs: Vec<String>,
    loaded_libs: Vec<String>,
    context: RenderingContext,
    compile_mode: JsCompileMode,
    container: String,
    gadget: Option<String>,
    debug: bool,
    no_cache: bool,
    jsload: bool,
    nohint: bool,
    onload: Option<String>,
    original: Option<Uri>,
}

impl JsUri {
    /// Creates a request for `libs` on behalf of `container`.
    pub fn new<I>(container: impl Into<String>, libs: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            status: UriStatus::ValidUnversioned,
            libs: libs.into_iter().map(Into::into).collect(),
            loaded_libs: Vec::new(),
            context: RenderingContext::default(),
            compile_mode: JsCompileMode::default(),
            container: container.into(),
            gadget: None,
            debug: false,
            no_cache: false,
            jsload: false,
            nohint: false,
            onload: None,
            original: None,
        }
    }

    /// Creates a request for `libs` carrying the container, gadget, debug and cache flags of `context`.
    pub fn from_gadget_context<I>(context: &GadgetContext, libs: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self::new(context.container(), libs)
            .with_gadget(context.url().to_string())
            .with_debug(context.debug())
            .with_no_cache(context.ignore_cache())
    }

    pub(crate) fn bad(container: impl Into<String>, original: Uri) -> Self {
        Self::new(container, Vec::<String>::new())
            .with_status(UriStatus::BadUri)
            .with_original(original)
    }

    /// Sets the features the client already has.
    #[must_use]
    pub fn with_loaded_libs<I>(mut self, loaded: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.loaded_libs = loaded.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the rendering context.
    #[must_use]
    pub fn with_context(mut self, context: RenderingContext) -> Self {
        self.context = context;
        self
    }

    /// Sets the compile mode.
    #[must_use]
    pub fn with_compile_mode(mut self, compile_mode: JsCompileMode) -> Self {
        self.compile_mode = compile_mode;
        self
    }

    /// Sets the gadget the features are loaded for.
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

    /// Requests asynchronous loading.
    #[must_use]
    pub fn with_jsload(mut self, jsload: bool) -> Self {
        self.jsload = jsload;
        self
    }

    /// Suppresses the feature hint.
    #[must_use]
    pub fn with_nohint(mut self, nohint: bool) -> Self {
        self.nohint = nohint;
        self
    }

    /// Sets the callback invoked once the features have loaded.
    #[must_use]
    pub fn with_onload(mut self, onload: impl Into<String>) -> Self {
        self.onload = Some(onload.into());
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

    /// Returns the requested features in order.
    #[must_use]
    pub fn libs(&self) -> &[String] {
        &self.libs
    }

    /// Returns the features the client already has.
    #[must_use]
    pub fn loaded_libs(&self) -> &[String] {
        &self.loaded_libs
    }

    /// Returns the rendering context.
    #[must_use]
    pub fn context(&self) -> RenderingContext {
        self.context
    }

    /// Returns the compile mode.
    #[must_use]
    pub fn compile_mode(&self) -> JsCompileMode {
        self.compile_mode
    }

    /// Returns the container.
    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Returns the gadget the features are loaded for.
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

    /// Returns whether asynchronous loading was requested.
    #[must_use]
    pub fn jsload(&self) -> bool {
        self.jsload
    }

    /// Returns whether the feature hint is suppressed.
    #[must_use]
    pub fn nohint(&self) -> bool {
        self.nohint
    }

    /// Returns the onload callback.
    #[must_use]
    pub fn onload(&self) -> Option<&str> {
        self.onload.as_deref()
    }

    /// Returns the URI this request was parsed from.
    #[must_use]
    pub fn original(&self) -> Option<&Uri> {
        self.original.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(RenderingContext::Gadget, "0")]
    #[case(RenderingContext::Container, "1")]
    #[case(RenderingContext::ConfiguredGadget, "2")]
    fn rendering_context_values(#[case] context: RenderingContext, #[case] value: &str) {
        assert_eq!(context.param_value(), value);
        assert_eq!(RenderingContext::from_param_value(value), Some(context));
    }

    #[test]
    fn compile_mode_values() {
        assert_eq!(JsCompileMode::default().param_value(), "concat");
        assert_eq!(JsCompileMode::from_param_value("explicit"), Some(JsCompileMode::ConcatCompileExportExplicit));
        assert_eq!(JsCompileMode::from_param_value("closure"), None);
    }

    #[test]
    fn from_gadget_context() {
        let context = GadgetContext::new("shindig", Uri::parse("http://g.com/g.xml").unwrap())
            .with_debug(true)
            .with_ignore_cache(true);

        let js = JsUri::from_gadget_context(&context, ["rpc"]);

        assert_eq!(js.container(), "shindig");
        assert_eq!(js.gadget(), Some("http://g.com/g.xml"));
        assert!(js.debug());
        assert!(js.no_cache());
        assert_eq!(js.libs(), ["rpc"]);
    }
}
