// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Failure categories surfaced by the broker and the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Contradictory or incomplete configuration.
    Config,
    /// Unsafe input value rejected before use.
    Validation,
    /// Requested fetch protocol is not published for the revision.
    NotFound,
    /// Filesystem or subprocess failure.
    Resource,
    /// Broken internal invariant.
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Config => "CONFIG_ERROR",
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Resource => "RESOURCE_ERROR",
            Self::Internal => "INTERNAL",
        }
    }

    /// Only resource failures may succeed when the whole operation is retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Resource)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed failure returned by every library operation.
#[derive(Debug)]
pub struct FetchError {
    code: ErrorCode,
    message: String,
    source: Option<std::io::Error>,
}

impl FetchError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), source: None }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Config, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn resource(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Resource, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    /// Wrap an I/O failure as a resource error, prefixed with what was being attempted.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self { code: ErrorCode::Resource, message: context.into(), source: Some(source) }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {source}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
