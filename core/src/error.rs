//! Error types for request building and execution.
//!
//! # Design
//! Errors come in two tiers. `ClientError` covers setup and control failures
//! (bad method, a transport that cannot allocate a call or a multiplexing
//! context, a rejected option, a failed wait). These abort the call or batch
//! they occur in. Network conditions such as timeouts, DNS failures or
//! non-2xx statuses never show up here; they are recorded as `CallError`
//! data on the affected `Response` instead.

use serde::Serialize;
use thiserror::Error;

/// Setup and control errors returned by the builder and the executors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// `with_method` received something other than get, post, put, delete
    /// or head.
    #[error("invalid method `{0}`: must be \"get\", \"post\", \"delete\", \"put\", or \"head\"")]
    InvalidMethod(String),

    #[error("transport could not allocate a call context: {0}")]
    HandleInitFailed(#[source] TransportError),

    #[error("transport rejected a request option: {0}")]
    OptionApplyFailed(#[source] TransportError),

    #[error("transport could not create a multiplexing context: {0}")]
    MultiplexInitFailed(#[source] TransportError),

    #[error("multiplexing context refused to register a call: {0}")]
    MultiplexAddFailed(#[source] TransportError),

    #[error("multiplexing context failed while advancing calls: {0}")]
    MultiplexAdvanceFailed(#[source] TransportError),

    #[error("multiplexing context failed while waiting for activity: {0}")]
    MultiplexWaitFailed(#[source] TransportError),

    #[error("multiplexing context failed to release a call: {0}")]
    MultiplexRemoveFailed(#[source] TransportError),
}

impl ClientError {
    /// Stable numeric code for each variant, usable as a bit flag.
    pub fn code(&self) -> u32 {
        match self {
            ClientError::HandleInitFailed(_) => 1,
            ClientError::MultiplexInitFailed(_) => 2,
            ClientError::OptionApplyFailed(_) => 8,
            ClientError::MultiplexAddFailed(_) => 16,
            ClientError::MultiplexWaitFailed(_) => 32,
            ClientError::InvalidMethod(_) => 64,
            ClientError::MultiplexAdvanceFailed(_) => 128,
            ClientError::MultiplexRemoveFailed(_) => 256,
        }
    }
}

/// Why a transport capability call failed.
///
/// `code` is the transport's own numeric code when it reports one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub code: Option<i32>,
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: i32, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }
}

/// A per-request transfer failure, reported as data on the `Response`.
///
/// Codes follow libcurl's `CURLcode` numbering so that callers can match on
/// familiar values (6 = host not resolved, 7 = connect failed,
/// 28 = timed out).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallError {
    pub code: i32,
    pub message: String,
}

impl CallError {
    pub const COULDNT_RESOLVE_HOST: i32 = 6;
    pub const COULDNT_CONNECT: i32 = 7;
    pub const OPERATION_TIMEDOUT: i32 = 28;

    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
