// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;

use data_encoding::BASE32HEX_NOPAD;
use sha1::{Digest, Sha1};

use crate::Uri;

/// Derives the host prefix of a gadget's locked domain.
///
/// The prefix is joined with the container's locked-domain suffix to form the authority a
/// gadget is rendered on. It must be a pure function of the gadget URL.
pub trait LockedDomainPrefixGenerator: Send + Sync + Debug {
    /// Returns the prefix for the gadget at `gadget`.
    fn prefix(&self, gadget: &Uri) -> String;
}

/// Locked-domain prefixes made of the lower-case base32hex SHA-1 of the gadget URL.
///
/// Prefixes are always 32 characters and valid DNS labels.
///
/// # Examples
///
/// ```
/// use gadget_uris::{HashShaLockedDomainPrefixGenerator, LockedDomainPrefixGenerator, Uri};
///
/// let gadget = Uri::parse("http://www.apache.org/gadget.xml")?;
/// assert_eq!(
///     HashShaLockedDomainPrefixGenerator.prefix(&gadget),
///     "e5bld32ce9pe5ln81rjhe0d0e1vao1ba"
/// );
/// # Ok::<_, gadget_uris::UriParseError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct HashShaLockedDomainPrefixGenerator;

impl LockedDomainPrefixGenerator for HashShaLockedDomainPrefixGenerator {
    fn prefix(&self, gadget: &Uri) -> String {
        let digest = Sha1::digest(gadget.to_string().as_bytes());
        BASE32HEX_NOPAD.encode(&digest).to_ascii_lowercase()
    }
}
