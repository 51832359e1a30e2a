//! Capability traits the executors drive, and the bundled transports.
//!
//! # Design
//! The executors never talk to a network library directly. They need a
//! small set of capabilities: allocate a call, apply an option set, enable
//! per-call header capture, run one call to completion, and for batches
//! register calls with a multiplexing context, advance them, wait for
//! activity and take them back out. After a call finishes the executor reads
//! its buffered body, status, extended info and last error.
//!
//! Each call owns its own body and header buffers. A call taken back out of
//! a multiplexer therefore carries exactly the data of its own transfer, and
//! the executor copies it into the response that belongs to the same slot.
//!
//! `CurlTransport` (feature `curl`) backs the traits with libcurl;
//! `ScriptedTransport` is an in-memory transport with deterministic,
//! scriptable outcomes.

#[cfg(feature = "curl")]
pub mod curl;
pub mod scripted;

use std::time::Duration;

use crate::error::{CallError, TransportError};
use crate::options::TransportOptions;
use crate::response::TransferInfo;

/// Factory for calls and multiplexing contexts.
pub trait Transport {
    type Call: Call;
    type Multi: Multiplexer<Call = Self::Call>;

    /// Allocate a fresh call context.
    fn create_call(&self) -> Result<Self::Call, TransportError>;

    /// Allocate a fresh multiplexing context.
    fn create_multi(&self) -> Result<Self::Multi, TransportError>;
}

/// One HTTP transfer.
pub trait Call {
    /// Apply every option in `options`. Fails on the first option the
    /// transport cannot apply.
    fn apply_options(&mut self, options: &TransportOptions) -> Result<(), TransportError>;

    /// Buffer raw response header lines for `take_header_lines`.
    fn capture_headers(&mut self) -> Result<(), TransportError>;

    /// Run the transfer to completion on the calling thread.
    fn perform(&mut self) -> Result<(), CallError>;

    /// Take the buffered response body.
    fn take_body(&mut self) -> Vec<u8>;

    /// Take the captured header lines, in arrival order.
    fn take_header_lines(&mut self) -> Vec<String>;

    /// Last HTTP status seen, 0 if none.
    fn status_code(&mut self) -> u32;

    fn info(&mut self) -> TransferInfo;

    /// The failure of the last transfer, `None` if it succeeded or never
    /// ran.
    fn last_error(&self) -> Option<CallError>;
}

/// A context that drives many calls on one thread.
pub trait Multiplexer {
    type Call: Call;
    /// Identifies a registered call until it is removed.
    type Token: Copy;

    fn register(&mut self, call: Self::Call) -> Result<Self::Token, TransportError>;

    /// Make whatever progress is possible without blocking. Returns the
    /// number of calls still running.
    fn advance(&mut self) -> Result<usize, TransportError>;

    /// Block until any registered call has activity or `timeout` elapses.
    /// Returns the number of calls with activity.
    fn wait(&mut self, timeout: Duration) -> Result<usize, TransportError>;

    /// Unregister a call and hand it back with its transfer result.
    fn remove(&mut self, token: Self::Token) -> Result<Self::Call, TransportError>;
}
