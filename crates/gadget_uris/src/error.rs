// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Display, Formatter};

use http::StatusCode;

/// Error returned when a string is not a well-formed URI.
#[ohno::error]
#[display("malformed URI '{uri}'")]
pub struct UriParseError {
    uri: String,
}

impl UriParseError {
    /// Returns the rejected input.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

/// Error returned when a container lacks a value that building a URI requires.
///
/// This indicates a deployment problem rather than a bad request, so it is raised as soon as
/// the value is needed instead of being defaulted.
#[ohno::error]
#[display("container '{container}' has no value for required key '{key}'")]
pub struct ConfigurationError {
    container: String,
    key: String,
}

impl ConfigurationError {
    /// Returns the container whose configuration is incomplete.
    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Returns the missing configuration key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Machine-readable reason attached to a [`GadgetError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    /// A required parameter was absent.
    MissingParameter,
    /// A parameter was present but could not be interpreted.
    InvalidParameter,
    /// The request was addressed to a host this container does not serve.
    InvalidHost,
    /// The request path does not match the configured path.
    InvalidPath,
    /// The container is misconfigured.
    InternalConfiguration,
}

impl ErrorCode {
    /// Returns the HTTP status a request failing with this code should be answered with.
    #[must_use]
    pub fn status_code(self) -> StatusCode {
        match self {
            Self::MissingParameter | Self::InvalidParameter | Self::InvalidHost | Self::InvalidPath => StatusCode::BAD_REQUEST,
            Self::InternalConfiguration => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MissingParameter => "missing parameter",
            Self::InvalidParameter => "invalid parameter",
            Self::InvalidHost => "invalid host",
            Self::InvalidPath => "invalid path",
            Self::InternalConfiguration => "internal configuration error",
        })
    }
}

/// Error returned when an inbound request cannot be turned into a typed URI.
#[ohno::error]
#[display("gadget request rejected: {code}")]
pub struct GadgetError {
    code: ErrorCode,
}

impl GadgetError {
    /// Returns the machine-readable reason.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Returns the HTTP status this error maps to.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    pub(crate) fn missing(what: impl Into<String>) -> Self {
        Self::caused_by(ErrorCode::MissingParameter, what.into())
    }

    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        Self::caused_by(ErrorCode::InvalidParameter, what.into())
    }
}

impl From<ConfigurationError> for GadgetError {
    fn from(error: ConfigurationError) -> Self {
        Self::caused_by(ErrorCode::InternalConfiguration, error)
    }
}
