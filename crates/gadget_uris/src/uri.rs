// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::sync::LazyLock;

use pct_str::{PctStr, PctString, UriReserved};
use percent_encoding::percent_decode_str;
use regex::Regex;

use crate::UriParseError;

/// Splits a URI into scheme ($2), authority ($4), path ($5), query ($7) and fragment ($9).
///
/// RFC 3986 Appendix B, except that `%` may not appear in the scheme.
static URI_COMPONENTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(([^:/?#%]+):)?(//([^/?#]*))?([^?#]*)(\?([^#]*))?(#(.*))?$").expect("URI_COMPONENTS"));

static URI_SCHEME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z][-+.A-Za-z0-9]*$").expect("URI_SCHEME"));

/// Splits an authority into userinfo ($2), host ($3) and port ($5).
static URI_AUTHORITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(([^@/?#]*)@)?([^\[\]:@]*|\[[^\]]+\])(:([0-9]*))?$").expect("URI_AUTHORITY"));

const FORBIDDEN: &[char] = &['"', '<', '>', '\\', '^', '`', '{', '|', '}'];

/// An absolute, protocol-relative or relative URI.
///
/// Components are kept in their encoded form. The scheme and the host are lower-cased when a
/// `Uri` is created, so two `Uri`s are equal exactly when their string forms are equal.
///
/// # Examples
///
/// ```
/// use gadget_uris::Uri;
///
/// let uri: Uri = "HTTP://Example.COM/a/b?x=1+2&y=%26#frag".parse()?;
/// assert_eq!(uri.to_string(), "http://example.com/a/b?x=1+2&y=%26#frag");
/// assert_eq!(uri.query_parameter("x").as_deref(), Some("1 2"));
/// assert_eq!(uri.query_parameter("y").as_deref(), Some("&"));
/// # Ok::<_, gadget_uris::UriParseError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uri {
    scheme: Option<String>,
    authority: Option<String>,
    path: String,
    query: Option<String>,
    fragment: Option<String>,
}

impl Uri {
    /// Parses `input` into a `Uri`.
    ///
    /// # Errors
    ///
    /// Returns a [`UriParseError`] if `input` contains whitespace, control characters or
    /// characters that must always be escaped, a malformed percent escape, a malformed
    /// scheme or a non-numeric port.
    pub fn parse(input: &str) -> Result<Self, UriParseError> {
        if let Some(bad) = input
            .chars()
            .find(|c| c.is_whitespace() || c.is_control() || FORBIDDEN.contains(c))
        {
            return Err(UriParseError::caused_by(input, format!("illegal character {bad:?}")));
        }

        if PctStr::new(input).is_err() {
            return Err(UriParseError::caused_by(input, "malformed percent escape"));
        }

        let Some(captures) = URI_COMPONENTS.captures(input) else {
            return Err(UriParseError::caused_by(input, "not a URI"));
        };

        let scheme = captures.get(2).map(|m| m.as_str());
        if let Some(scheme) = scheme
            && !URI_SCHEME.is_match(scheme)
        {
            return Err(UriParseError::caused_by(input, format!("malformed scheme '{scheme}'")));
        }

        let authority = captures.get(4).map(|m| m.as_str());
        if let Some(authority) = authority
            && !URI_AUTHORITY.is_match(authority)
        {
            return Err(UriParseError::caused_by(input, format!("malformed authority '{authority}'")));
        }

        Ok(Self::from_parts(
            scheme.map(str::to_owned),
            authority.map(str::to_owned),
            captures.get(5).map_or_else(String::new, |m| m.as_str().to_owned()),
            captures.get(7).map(|m| m.as_str().to_owned()),
            captures.get(9).map(|m| m.as_str().to_owned()),
        ))
    }

    fn from_parts(
        scheme: Option<String>,
        authority: Option<String>,
        path: String,
        query: Option<String>,
        fragment: Option<String>,
    ) -> Self {
        Self {
            scheme: scheme.map(|s| s.to_ascii_lowercase()),
            authority: authority.map(|a| normalize_authority(&a)),
            path,
            query,
            fragment,
        }
    }

    /// Returns the scheme, lower-cased.
    #[must_use]
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// Returns the authority with its host lower-cased.
    #[must_use]
    pub fn authority(&self) -> Option<&str> {
        self.authority.as_deref()
    }

    /// Returns the encoded path, which may be empty.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the encoded query, without the leading `?`.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Returns the encoded fragment, without the leading `#`.
    #[must_use]
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// Returns `true` if this URI has a scheme.
    #[must_use]
    pub fn is_absolute(&self) -> bool {
        self.scheme.is_some()
    }

    /// Returns every query parameter, decoded, in order.
    #[must_use]
    pub fn query_parameters(&self) -> Vec<(String, Option<String>)> {
        self.query.as_deref().map(split_parameters).unwrap_or_default()
    }

    /// Returns the first value of the query parameter `name`, form-decoded.
    ///
    /// A parameter without a value yields an empty string.
    #[must_use]
    pub fn query_parameter(&self, name: &str) -> Option<String> {
        first_parameter(self.query.as_deref()?, name)
    }

    /// Returns every fragment parameter, decoded, in order.
    #[must_use]
    pub fn fragment_parameters(&self) -> Vec<(String, Option<String>)> {
        self.fragment.as_deref().map(split_parameters).unwrap_or_default()
    }

    /// Returns the first value of the fragment parameter `name`, form-decoded.
    #[must_use]
    pub fn fragment_parameter(&self, name: &str) -> Option<String> {
        first_parameter(self.fragment.as_deref()?, name)
    }
}

impl Display for Uri {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{scheme}:")?;
        }
        if let Some(authority) = &self.authority {
            write!(f, "//{authority}")?;
        }
        f.write_str(&self.path)?;
        if let Some(query) = &self.query {
            write!(f, "?{query}")?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

impl FromStr for Uri {
    type Err = UriParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for Uri {
    type Error = UriParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

/// Mutable URI under construction.
///
/// Query and fragment parameters are kept decoded and in insertion order; they are
/// percent-encoded, with every reserved character escaped, when the URI is built. Parameters
/// without a value are written as a bare key.
///
/// # Examples
///
/// ```
/// use gadget_uris::UriBuilder;
///
/// let uri = UriBuilder::new()
///     .set_authority("proxy.example.com")
///     .set_path("/gadgets/proxy")
///     .add_query_parameter("url", "http://a.com/x?y=1")
///     .add_fragment_parameter("st", "token")
///     .build();
///
/// assert_eq!(
///     uri.to_string(),
///     "//proxy.example.com/gadgets/proxy?url=http%3A%2F%2Fa.com%2Fx%3Fy%3D1#st=token"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UriBuilder {
    scheme: Option<String>,
    authority: Option<String>,
    path: String,
    query: Vec<String>,
    fragment: Vec<String>,
}

impl UriBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder holding the components of `uri`.
    ///
    /// The existing query and fragment items are kept exactly as encoded in `uri`; parameters
    /// added later are appended after them.
    #[must_use]
    pub fn from_uri(uri: &Uri) -> Self {
        Self {
            scheme: uri.scheme.clone(),
            authority: uri.authority.clone(),
            path: uri.path.clone(),
            query: uri.query.as_deref().map(split_items).unwrap_or_default(),
            fragment: uri.fragment.as_deref().map(split_items).unwrap_or_default(),
        }
    }

    /// Sets the scheme.
    pub fn set_scheme(&mut self, scheme: impl Into<String>) -> &mut Self {
        self.scheme = Some(scheme.into());
        self
    }

    /// Sets the authority.
    pub fn set_authority(&mut self, authority: impl Into<String>) -> &mut Self {
        self.authority = Some(authority.into());
        self
    }

    /// Sets the already encoded path.
    pub fn set_path(&mut self, path: impl Into<String>) -> &mut Self {
        self.path = path.into();
        self
    }

    /// Returns the path set so far.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Appends a query parameter.
    pub fn add_query_parameter(&mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> &mut Self {
        self.query.push(encode_parameter(key.as_ref(), Some(value.as_ref())));
        self
    }

    /// Appends a query parameter without a value.
    pub fn add_query_key(&mut self, key: impl AsRef<str>) -> &mut Self {
        self.query.push(encode_parameter(key.as_ref(), None));
        self
    }

    /// Removes every query parameter named `key`.
    pub fn remove_query_parameter(&mut self, key: &str) -> &mut Self {
        self.query.retain(|item| decode_parameter(item).0 != key);
        self
    }

    /// Returns the first value of the query parameter named `key`, form-decoded.
    #[must_use]
    pub fn query_parameter(&self, key: &str) -> Option<String> {
        find_parameter(&self.query, key)
    }

    /// Appends a fragment parameter.
    pub fn add_fragment_parameter(&mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> &mut Self {
        self.fragment.push(encode_parameter(key.as_ref(), Some(value.as_ref())));
        self
    }

    /// Returns the first value of the fragment parameter named `key`, form-decoded.
    #[must_use]
    pub fn fragment_parameter(&self, key: &str) -> Option<String> {
        find_parameter(&self.fragment, key)
    }

    /// Builds the URI.
    #[must_use]
    pub fn build(&self) -> Uri {
        Uri::from_parts(
            self.scheme.clone(),
            self.authority.clone(),
            self.path.clone(),
            join_items(&self.query),
            join_items(&self.fragment),
        )
    }
}

/// Percent-encodes `value`, escaping every reserved character.
pub(crate) fn encode_component(value: &str) -> String {
    PctString::encode(value.chars(), UriReserved::Any).into_string()
}

/// Percent-decodes `value`. Invalid UTF-8 is replaced rather than rejected.
pub(crate) fn decode_component(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

/// Decodes a form-encoded value, where `+` stands for a space.
pub(crate) fn decode_form_component(value: &str) -> String {
    decode_component(&value.replace('+', " "))
}

fn encode_parameter(key: &str, value: Option<&str>) -> String {
    match value {
        Some(value) => format!("{}={}", encode_component(key), encode_component(value)),
        None => encode_component(key),
    }
}

fn decode_parameter(item: &str) -> (String, Option<String>) {
    match item.split_once('=') {
        Some((key, value)) => (decode_form_component(key), Some(decode_form_component(value))),
        None => (decode_form_component(item), None),
    }
}

fn split_items(encoded: &str) -> Vec<String> {
    encoded.split('&').filter(|item| !item.is_empty()).map(str::to_owned).collect()
}

fn join_items(items: &[String]) -> Option<String> {
    (!items.is_empty()).then(|| items.join("&"))
}

fn find_parameter(items: &[String], name: &str) -> Option<String> {
    items
        .iter()
        .map(|item| decode_parameter(item))
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.unwrap_or_default())
}

/// Encodes parameters as `key=value` pairs joined by `&`.
pub(crate) fn join_parameters(parameters: &[(String, Option<String>)]) -> Option<String> {
    let items = parameters
        .iter()
        .map(|(key, value)| encode_parameter(key, value.as_deref()))
        .collect::<Vec<_>>();
    join_items(&items)
}

/// Splits `key=value&...` into decoded pairs. Empty items are skipped.
pub(crate) fn split_parameters(encoded: &str) -> Vec<(String, Option<String>)> {
    encoded
        .split('&')
        .filter(|item| !item.is_empty())
        .map(decode_parameter)
        .collect()
}

fn first_parameter(encoded: &str, name: &str) -> Option<String> {
    split_parameters(encoded)
        .into_iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.unwrap_or_default())
}

fn normalize_authority(authority: &str) -> String {
    match authority.rsplit_once('@') {
        Some((userinfo, host)) => format!("{userinfo}@{}", host.to_ascii_lowercase()),
        None => authority.to_ascii_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    static_assertions::assert_impl_all!(Uri: Send, Sync, Clone, std::hash::Hash);

    #[test]
    fn components() {
        let uri = Uri::parse("https://user@Host.Example:8080/p/a%2Fb?q=1&r#f=2").unwrap();

        assert_eq!(uri.scheme(), Some("https"));
        assert_eq!(uri.authority(), Some("user@host.example:8080"));
        assert_eq!(uri.path(), "/p/a%2Fb");
        assert_eq!(uri.query(), Some("q=1&r"));
        assert_eq!(uri.fragment(), Some("f=2"));
        assert!(uri.is_absolute());
    }

    #[test]
    fn protocol_relative() {
        let uri = Uri::parse("//proxy.example.com/gadgets/proxy?url=x").unwrap();

        assert_eq!(uri.scheme(), None);
        assert_eq!(uri.authority(), Some("proxy.example.com"));
        assert_eq!(uri.to_string(), "//proxy.example.com/gadgets/proxy?url=x");
        assert!(!uri.is_absolute());
    }

    #[test]
    fn normalized_forms_are_equal() {
        let a = Uri::parse("HTTP://EXAMPLE.com/Path").unwrap();
        let b = Uri::parse("http://example.COM/Path").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "http://example.com/Path");
    }

    #[rstest]
    #[case::space("http://a.com/a b")]
    #[case::newline("http://a.com/\n")]
    #[case::brace("http://a.com/{x}")]
    #[case::bad_escape("http://a.com/%zz")]
    #[case::truncated_escape("http://a.com/%4")]
    #[case::bad_scheme("1http://a.com/")]
    #[case::bad_port("http://a.com:port/")]
    fn rejects_malformed(#[case] input: &str) {
        let error = Uri::parse(input).unwrap_err();
        assert_eq!(error.uri(), input);
    }

    #[rstest]
    #[case::plain("a=1&b=2", "b", Some("2"))]
    #[case::plus_is_space("a=1+2", "a", Some("1 2"))]
    #[case::escaped("a=%2B%26", "a", Some("+&"))]
    #[case::first_wins("a=1&a=2", "a", Some("1"))]
    #[case::valueless("a&b=2", "a", Some(""))]
    #[case::value_with_equals("a=b=c", "a", Some("b=c"))]
    #[case::missing("a=1", "z", None)]
    fn query_parameter_lookup(#[case] query: &str, #[case] name: &str, #[case] expected: Option<&str>) {
        let uri = Uri::parse(&format!("http://a.com/?{query}")).unwrap();
        assert_eq!(uri.query_parameter(name).as_deref(), expected);
    }

    #[test]
    fn fragment_parameters() {
        let uri = Uri::parse("http://a.com/#up_color=red&st=abc").unwrap();
        assert_eq!(uri.fragment_parameter("st").as_deref(), Some("abc"));
        assert_eq!(
            uri.fragment_parameters(),
            vec![
                ("up_color".to_owned(), Some("red".to_owned())),
                ("st".to_owned(), Some("abc".to_owned()))
            ]
        );
    }

    #[test]
    fn builder_encodes_reserved_characters() {
        let uri = UriBuilder::new()
            .set_scheme("http")
            .set_authority("a.com")
            .set_path("/p")
            .add_query_parameter("k y", "a&b=c+d/")
            .add_query_key("flag")
            .build();

        assert_eq!(uri.to_string(), "http://a.com/p?k%20y=a%26b%3Dc%2Bd%2F&flag");
        assert_eq!(uri.query_parameter("k y").as_deref(), Some("a&b=c+d/"));
        assert_eq!(Uri::parse(&uri.to_string()).unwrap(), uri);
    }

    #[test]
    fn builder_round_trips_existing_uri() {
        let original = Uri::parse("http://a.com/x?q=1&r=two#f=3").unwrap();
        let mut builder = UriBuilder::from_uri(&original);

        assert_eq!(builder.query_parameter("r").as_deref(), Some("two"));
        assert_eq!(builder.fragment_parameter("f").as_deref(), Some("3"));

        builder.remove_query_parameter("q").add_query_parameter("s", "4");
        assert_eq!(builder.build().to_string(), "http://a.com/x?r=two&s=4#f=3");
    }

    #[test]
    fn builder_keeps_existing_items_encoded_as_given() {
        let original = Uri::parse("https://gadget.com/canvas?q=a+b&p=%7E#s=x+y").unwrap();
        let mut builder = UriBuilder::from_uri(&original);

        assert_eq!(builder.query_parameter("q").as_deref(), Some("a b"));

        builder.add_query_parameter("container", "default").add_fragment_parameter("st", "t");
        assert_eq!(
            builder.build().to_string(),
            "https://gadget.com/canvas?q=a+b&p=%7E&container=default#s=x+y&st=t"
        );
    }

    #[test]
    fn empty_builder_builds_empty_uri() {
        assert_eq!(UriBuilder::new().build().to_string(), "");
    }
}
