// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Concat URIs: batches of JavaScript or CSS resources fetched in as few requests as possible.

mod concat_uri;
mod manager;

use std::fmt::Debug;

pub use concat_uri::{ConcatData, ConcatPart, ConcatType, ConcatUri};
pub use manager::DefaultConcatUriManager;

use crate::{ConfigurationError, Uri, UriStatus};

/// Key holding the host concat URIs are served from.
pub const CONCAT_HOST_KEY: &str = "gadgets.uri.concat.host";

/// Key holding the path concat URIs are served under.
pub const CONCAT_PATH_KEY: &str = "gadgets.uri.concat.path";

/// Key holding the variable split JavaScript is assigned to, or `false` to disable splitting.
pub const CONCAT_JS_SPLIT_TOKEN_KEY: &str = "gadgets.uri.concat.js.splitToken";

/// Key holding the maximum length of a concat URL.
pub const CONCAT_MAX_URL_LENGTH_KEY: &str = "gadgets.uri.concat.maxUrlLength";

/// Maximum concat URL length used when the container sets none.
pub const DEFAULT_MAX_URL_LENGTH: usize = 2048;

/// Fingerprints concat batches.
pub trait ConcatVersioner: Send + Sync + Debug {
    /// Returns the version of the resources served by one physical URL.
    fn version(&self, batch: &[Uri], container: &str) -> Option<String>;

    /// Checks a presented version of `batch`.
    fn validate(&self, batch: &[Uri], container: &str, version: &str) -> UriStatus;

    /// Returns the longest version [`version`](Self::version) produces.
    ///
    /// Batches are packed with this much room reserved for the version, so that each physical
    /// URL is versioned once it is complete. Defaults to the length of a [`fingerprint`](crate::fingerprint).
    fn max_version_length(&self) -> usize {
        crate::versioning::FINGERPRINT_LENGTH
    }
}

/// Builds and parses concat URIs.
pub trait ConcatUriManager: Send + Sync + Debug {
    /// Builds the physical URLs of every batch, one [`ConcatData`] per batch.
    ///
    /// With `adjacent` the resources are listed as positional parameters. Without it, the
    /// JavaScript is additionally split: each resource is assigned into a variable named by
    /// the container's split token and a snippet evaluating it is returned per resource.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if a batch's container lacks a concat host or path.
    ///
    /// # Panics
    ///
    /// Panics when asked to split a CSS batch.
    fn make(&self, batches: &[ConcatUri], adjacent: bool) -> Result<Vec<ConcatData>, ConfigurationError>;

    /// Parses an inbound concat URI. Malformed URIs yield a [`UriStatus::BadUri`] result.
    fn process(&self, uri: &Uri) -> ConcatUri;
}
