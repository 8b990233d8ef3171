// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// Outcome of validating an inbound URI.
///
/// Only [`UriStatus::BadUri`] signals a malformed request. [`UriStatus::InvalidVersion`] and
/// [`UriStatus::InvalidDomain`] tell the caller to refetch or redirect rather than to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UriStatus {
    /// A version was presented and matches the current content.
    ValidVersioned,
    /// No version was presented, or nothing could check one.
    ValidUnversioned,
    /// A version was presented but the content has changed since.
    InvalidVersion,
    /// The rendering URI was served from a domain other than the gadget's locked domain.
    InvalidDomain,
    /// The URI is structurally invalid.
    BadUri,
}

impl UriStatus {
    /// Returns `true` for the two valid outcomes.
    #[must_use]
    pub fn is_valid(self) -> bool {
        matches!(self, Self::ValidVersioned | Self::ValidUnversioned)
    }

    /// Compares a presented version against the expected one.
    ///
    /// An empty presented version is always [`UriStatus::ValidUnversioned`]. A presented version
    /// matches only when it equals `expected`; `None` never matches.
    ///
    /// # Examples
    ///
    /// ```
    /// use gadget_uris::UriStatus;
    ///
    /// assert_eq!(UriStatus::compare_versions(Some("abc"), "abc"), UriStatus::ValidVersioned);
    /// assert_eq!(UriStatus::compare_versions(Some("abc"), ""), UriStatus::ValidUnversioned);
    /// assert_eq!(UriStatus::compare_versions(None, "abc"), UriStatus::InvalidVersion);
    /// ```
    #[must_use]
    pub fn compare_versions(expected: Option<&str>, presented: &str) -> Self {
        if presented.is_empty() {
            Self::ValidUnversioned
        } else if expected == Some(presented) {
            Self::ValidVersioned
        } else {
            Self::InvalidVersion
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::versioned(UriStatus::ValidVersioned, true)]
    #[case::unversioned(UriStatus::ValidUnversioned, true)]
    #[case::invalid_version(UriStatus::InvalidVersion, false)]
    #[case::invalid_domain(UriStatus::InvalidDomain, false)]
    #[case::bad(UriStatus::BadUri, false)]
    fn validity(#[case] status: UriStatus, #[case] valid: bool) {
        assert_eq!(status.is_valid(), valid);
    }

    #[rstest]
    #[case::matching(Some("v1"), "v1", UriStatus::ValidVersioned)]
    #[case::stale(Some("v2"), "v1", UriStatus::InvalidVersion)]
    #[case::empty(Some("v1"), "", UriStatus::ValidUnversioned)]
    #[case::empty_without_expectation(None, "", UriStatus::ValidUnversioned)]
    #[case::unexpected(None, "v1", UriStatus::InvalidVersion)]
    fn version_comparison(#[case] expected: Option<&str>, #[case] presented: &str, #[case] status: UriStatus) {
        assert_eq!(UriStatus::compare_versions(expected, presented), status);
    }
}
