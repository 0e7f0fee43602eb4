// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::fmt;
use thiserror::Error;

/// The error type for awsauth operations.
///
/// `Display` renders the message followed by the source error (if any), which
/// is what ends up in the failed step annotation. `Debug` additionally lists
/// every context line attached on the way up.
#[derive(Error)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<anyhow::Error>,
    context: Vec<String>,
    retryable: bool,
}

/// The kind of error that occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Required GitHub context variables are absent.
    MissingEnvironment,

    /// A bare role name was given without a source account id.
    AmbiguousRoleReference,

    /// The web identity token file does not exist.
    TokenFileNotFound,

    /// The web identity token file exists but can not be read.
    TokenFileUnreadable,

    /// The region does not look like an AWS region.
    InvalidRegion,

    /// No credentials could be loaded from the environment.
    CredentialsUnavailable,

    /// The loaded access key differs from the one this action exported.
    AccessKeyMismatch,

    /// The caller account is not in the allow-list.
    AccountMismatch,

    /// STS refused to hand out role credentials, or retries ran out.
    RoleAssumptionFailed,

    /// Writing AWS config or credentials files failed.
    ProfileWriteFailed,

    /// Fetching the OIDC token from the runner failed.
    IdTokenUnavailable,

    /// Action inputs are malformed or contradict each other.
    ConfigInvalid,

    /// Unexpected errors (network, I/O, service errors, etc.)
    Unexpected,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
            context: Vec::new(),
            retryable: false,
        }
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach a context line, for example `role_arn: ...`.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Mark this error as safe to retry.
    pub fn set_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the message without source.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Context lines attached to this error.
    pub fn context(&self) -> &[String] {
        &self.context
    }

    /// Whether a retry policy may try the operation again.
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Try to find a typed error in the source chain.
    pub fn downcast_source<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.source.as_ref().and_then(|s| s.downcast_ref::<E>())
    }

    /// Check if this is an identity validation error
    pub fn is_identity_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::CredentialsUnavailable
                | ErrorKind::AccessKeyMismatch
                | ErrorKind::AccountMismatch
        )
    }
}

// Convenience constructors
impl Error {
    /// Create a missing environment error
    pub fn missing_environment(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingEnvironment, message)
    }

    /// Create an ambiguous role reference error
    pub fn ambiguous_role_reference(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AmbiguousRoleReference, message)
    }

    /// Create a token file not found error
    pub fn token_file_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenFileNotFound, message)
    }

    /// Create a token file unreadable error
    pub fn token_file_unreadable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenFileUnreadable, message)
    }

    /// Create an invalid region error
    pub fn invalid_region(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRegion, message)
    }

    /// Create a credentials unavailable error
    pub fn credentials_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CredentialsUnavailable, message)
    }

    /// Create an access key mismatch error
    pub fn access_key_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AccessKeyMismatch, message)
    }

    /// Create an account mismatch error
    pub fn account_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AccountMismatch, message)
    }

    /// Create a role assumption failed error
    pub fn role_assumption_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RoleAssumptionFailed, message)
    }

    /// Create a profile write failed error
    pub fn profile_write_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ProfileWriteFailed, message)
    }

    /// Create an id token unavailable error
    pub fn id_token_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IdTokenUnavailable, message)
    }

    /// Create a config invalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create an unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({}) => {}", self.kind, self.retryable_label(), self.message)?;
        for ctx in &self.context {
            writeln!(f, "    {ctx}")?;
        }
        if let Some(source) = &self.source {
            write!(f, "source: {source:?}")?;
        }
        Ok(())
    }
}

impl Error {
    fn retryable_label(&self) -> &'static str {
        if self.retryable {
            "retryable"
        } else {
            "permanent"
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::MissingEnvironment => write!(f, "missing environment"),
            ErrorKind::AmbiguousRoleReference => write!(f, "ambiguous role reference"),
            ErrorKind::TokenFileNotFound => write!(f, "token file not found"),
            ErrorKind::TokenFileUnreadable => write!(f, "token file unreadable"),
            ErrorKind::InvalidRegion => write!(f, "invalid region"),
            ErrorKind::CredentialsUnavailable => write!(f, "credentials unavailable"),
            ErrorKind::AccessKeyMismatch => write!(f, "access key mismatch"),
            ErrorKind::AccountMismatch => write!(f, "account mismatch"),
            ErrorKind::RoleAssumptionFailed => write!(f, "role assumption failed"),
            ErrorKind::ProfileWriteFailed => write!(f, "profile write failed"),
            ErrorKind::IdTokenUnavailable => write!(f, "id token unavailable"),
            ErrorKind::ConfigInvalid => write!(f, "invalid configuration"),
            ErrorKind::Unexpected => write!(f, "unexpected error"),
        }
    }
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

// Common From implementations
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(err)
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Self::unexpected("failed to format").with_source(anyhow::Error::from(err))
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Self::unexpected("failed to build http request").with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::unexpected("invalid header value").with_source(anyhow::Error::from(err))
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::unexpected("invalid utf-8").with_source(anyhow::Error::from(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::unexpected("io error").with_source(anyhow::Error::from(err))
    }
}
