// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

use crate::{Uri, UriStatus};

/// Kind of content a concat batch holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConcatType {
    /// JavaScript.
    Js,
    /// Style sheets.
    Css,
}

impl ConcatType {
    /// Returns the value of the `type` parameter.
    #[must_use]
    pub fn type_param(self) -> &'static str {
        match self {
            Self::Js => "js",
            Self::Css => "css",
        }
    }

    /// Recognizes a `type` token or a mime type.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "js" | "text/javascript" | "application/javascript" => Some(Self::Js),
            "css" | "text/css" => Some(Self::Css),
            _ => None,
        }
    }
}

impl Display for ConcatType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_param())
    }
}

/// An ordered batch of resources fetched as one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatUri {
    status: UriStatus,
    batch: Vec<Uri>,
    concat_type: Option<ConcatType>,
    container: String,
    gadget: Option<String>,
    debug: bool,
    no_cache: bool,
    refresh: Option<u32>,
    split_param: Option<String>,
    original: Option<Uri>,
}

impl ConcatUri {
    /// Creates a batch of `concat_type` resources for `container`.
    pub fn new(container: impl Into<String>, concat_type: ConcatType, batch: Vec<Uri>) -> Self {
        Self {
            status: UriStatus::ValidUnversioned,
            batch,
            concat_type: Some(concat_type),
            container: container.into(),
            gadget: None,
            debug: false,
            no_cache: false,
            refresh: None,
            split_param: None,
            original: None,
        }
    }

    pub(crate) fn bad(container: Option<String>, original: Uri) -> Self {
        Self {
            status: UriStatus::BadUri,
            batch: Vec::new(),
            concat_type: None,
            container: container.unwrap_or_default(),
            gadget: None,
            debug: false,
            no_cache: false,
            refresh: None,
            split_param: None,
            original: Some(original),
        }
    }

    /// Sets the gadget the batch is fetched for.
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

    pub(crate) fn with_split_param(mut self, split_param: Option<String>) -> Self {
        self.split_param = split_param;
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

    /// Returns the resources, in order.
    #[must_use]
    pub fn batch(&self) -> &[Uri] {
        &self.batch
    }

    /// Returns the content type, `None` only on [`UriStatus::BadUri`] results.
    #[must_use]
    pub fn concat_type(&self) -> Option<ConcatType> {
        self.concat_type
    }

    /// Returns the container.
    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Returns the gadget the batch is fetched for.
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

    /// Returns the requested cache lifetime in seconds.
    #[must_use]
    pub fn refresh(&self) -> Option<u32> {
        self.refresh
    }

    /// Returns the variable split JavaScript is assigned to.
    #[must_use]
    pub fn split_param(&self) -> Option<&str> {
        self.split_param.as_deref()
    }

    /// Returns the URI this batch was parsed from.
    #[must_use]
    pub fn original(&self) -> Option<&Uri> {
        self.original.as_ref()
    }
}

/// One physical URL produced for a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatPart {
    uri: Uri,
    resources: Vec<Uri>,
    concatenated: bool,
}

impl ConcatPart {
    pub(crate) fn concatenated(uri: Uri, resources: Vec<Uri>) -> Self {
        Self {
            uri,
            resources,
            concatenated: true,
        }
    }

    pub(crate) fn pass_through(resource: Uri) -> Self {
        Self {
            uri: resource.clone(),
            resources: vec![resource],
            concatenated: false,
        }
    }

    /// Returns the URL to fetch.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the resources this URL delivers, in order.
    #[must_use]
    pub fn resources(&self) -> &[Uri] {
        &self.resources
    }

    /// Returns `false` for a resource too long to concatenate, whose URL is the resource itself.
    #[must_use]
    pub fn is_concatenated(&self) -> bool {
        self.concatenated
    }
}

/// The physical URLs produced for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConcatData {
    parts: Vec<ConcatPart>,
    snippets: HashMap<Uri, String>,
}

impl ConcatData {
    pub(crate) fn new(parts: Vec<ConcatPart>, snippets: HashMap<Uri, String>) -> Self {
        Self { parts, snippets }
    }

    /// Returns the physical URLs, in batch order.
    #[must_use]
    pub fn parts(&self) -> &[ConcatPart] {
        &self.parts
    }

    /// Returns the script that evaluates `resource` once its split batch has loaded.
    #[must_use]
    pub fn snippet(&self, resource: &Uri) -> Option<&str> {
        self.snippets.get(resource).map(String::as_str)
    }

    /// Returns every snippet keyed by resource.
    #[must_use]
    pub fn snippets(&self) -> &HashMap<Uri, String> {
        &self.snippets
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::js_token("js", Some(ConcatType::Js))]
    #[case::js_mime("text/javascript", Some(ConcatType::Js))]
    #[case::js_application_mime("application/javascript", Some(ConcatType::Js))]
    #[case::css_token("css", Some(ConcatType::Css))]
    #[case::css_mime("text/css", Some(ConcatType::Css))]
    #[case::unknown("html", None)]
    #[case::case_sensitive("JS", None)]
    fn type_recognition(#[case] value: &str, #[case] expected: Option<ConcatType>) {
        assert_eq!(ConcatType::parse(value), expected);
    }

    #[test]
    fn type_rendering() {
        assert_eq!(ConcatType::Js.to_string(), "js");
        assert_eq!(ConcatType::Css.to_string(), "css");
    }

    #[test]
    fn pass_through_part_points_at_resource() {
        let resource = Uri::parse("http://a.com/x.js").unwrap();
        let part = ConcatPart::pass_through(resource.clone());

        assert!(!part.is_concatenated());
        assert_eq!(part.uri(), &resource);
        assert_eq!(part.resources(), [resource]);
    }
}
