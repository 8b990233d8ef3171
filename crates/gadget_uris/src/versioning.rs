// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};

use sha2::{Digest, Sha256};

use crate::concat::ConcatVersioner;
use crate::iframe::IframeVersioner;
use crate::proxy::ProxyVersioner;
use crate::{Uri, UriStatus};

/// Number of digest bytes kept in a version string.
const FINGERPRINT_BYTES: usize = 16;

/// Length of the strings [`fingerprint`] returns.
pub(crate) const FINGERPRINT_LENGTH: usize = FINGERPRINT_BYTES * 2;

/// Fingerprints the concatenation of `parts`.
///
/// Returns the hex form of the first 16 bytes of their SHA-256 digest. Equal input always
/// yields the equal string.
///
/// # Examples
///
/// ```
/// let version = gadget_uris::fingerprint([b"alert(1);".as_slice()]);
/// assert_eq!(version.len(), 32);
/// assert_eq!(version, gadget_uris::fingerprint([b"alert(".as_slice(), b"1);".as_slice()]));
/// ```
pub fn fingerprint<I>(parts: I) -> String
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_ref());
    }
    let digest = hasher.finalize();
    hex::encode(&digest[..FINGERPRINT_BYTES])
}

/// Supplies the current bytes behind a resource URI.
pub trait ContentSource: Send + Sync {
    /// Returns the content of `uri`, or `None` if it is unknown.
    fn content(&self, uri: &Uri) -> Option<Vec<u8>>;
}

impl<S> ContentSource for HashMap<Uri, Vec<u8>, S>
where
    S: std::hash::BuildHasher + Send + Sync,
{
    fn content(&self, uri: &Uri) -> Option<Vec<u8>> {
        self.get(uri).cloned()
    }
}

/// Versions resources by fingerprinting their content.
///
/// Implements the proxy, concat and rendering versioner contracts. Batches are fingerprinted
/// as the concatenation of their contents in order; a batch with any unknown member is left
/// unversioned. The container does not take part in the fingerprint.
pub struct ContentHashVersioner<S> {
    source: S,
}

impl<S: ContentSource> ContentHashVersioner<S> {
    /// Creates a versioner reading content from `source`.
    pub fn new(source: S) -> Self {
        Self { source }
    }

    fn version_of(&self, uri: &Uri) -> Option<String> {
        self.source.content(uri).map(|content| fingerprint([content]))
    }

    fn version_of_batch(&self, uris: &[Uri]) -> Option<String> {
        if uris.is_empty() {
            return None;
        }

        let contents = uris.iter().map(|uri| self.source.content(uri)).collect::<Option<Vec<_>>>()?;
        Some(fingerprint(contents))
    }
}

impl<S> Debug for ContentHashVersioner<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentHashVersioner").finish_non_exhaustive()
    }
}

impl<S: ContentSource> ProxyVersioner for ContentHashVersioner<S> {
    fn version(&self, resources: &[Uri], _container: &str) -> Vec<Option<String>> {
        resources.iter().map(|uri| self.version_of(uri)).collect()
    }

    fn validate(&self, resource: &Uri, _container: &str, version: &str) -> UriStatus {
        UriStatus::compare_versions(self.version_of(resource).as_deref(), version)
    }
}

impl<S: ContentSource> ConcatVersioner for ContentHashVersioner<S> {
    fn version(&self, batch: &[Uri], _container: &str) -> Option<String> {
        self.version_of_batch(batch)
    }

    fn validate(&self, batch: &[Uri], _container: &str, version: &str) -> UriStatus {
        UriStatus::compare_versions(self.version_of_batch(batch).as_deref(), version)
    }
}

impl<S: ContentSource> IframeVersioner for ContentHashVersioner<S> {
    fn version(&self, gadget: &Uri, _container: &str) -> Option<String> {
        self.version_of(gadget)
    }

    fn validate(&self, gadget: &Uri, _container: &str, version: &str) -> UriStatus {
        UriStatus::compare_versions(self.version_of(gadget).as_deref(), version)
    }
}
