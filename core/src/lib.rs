//! Fluent HTTP requests and a multiplexed batch executor.
//!
//! # Overview
//! Build a `Request` with the chainable `RequestBuilder`, then run it with
//! `SingleExecutor`, or run many at once with `ParallelExecutor`, which
//! drives every transfer on the calling thread through one shared
//! multiplexing context and returns one `Response` per request, keyed by
//! input position.
//!
//! # Design
//! - Executors depend on the `Transport` capability traits, not on a network
//!   library. `CurlTransport` (feature `curl`, on by default) is the libcurl
//!   backend; `ScriptedTransport` answers from an in-memory table and keeps
//!   tests deterministic.
//! - Setup and control failures are `ClientError`s. Per-request network
//!   failures are data on the `Response` (`error_code`, `error_message`), so
//!   a batch where a few requests time out still returns every response.
//! - `Request` is an immutable snapshot; all option assembly, including the
//!   effective URL, happens in `RequestBuilder::build`.
//!
//! ```no_run
//! use fanout_core::{CurlTransport, ParallelExecutor, Request};
//!
//! let requests = vec![
//!     Request::builder().with_url("https://example.com/a").build(),
//!     Request::builder()
//!         .with_url("https://example.com/search")
//!         .with_get_vars([("q", "rust")])
//!         .with_store_response_headers(true)
//!         .build(),
//! ];
//! let responses = ParallelExecutor::new(CurlTransport).execute_all(&requests)?;
//! for (index, response) in &responses {
//!     println!("{index}: {} ({} bytes)", response.status_code(), response.body().len());
//! }
//! # Ok::<(), fanout_core::ClientError>(())
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod options;
pub mod request;
pub mod response;
pub mod transport;

pub use config::ExecutorConfig;
pub use error::{CallError, ClientError, TransportError};
pub use executor::{ParallelExecutor, SingleExecutor};
pub use options::{AuthScheme, OptionKey, OptionValue, RequestDefaults, TransportOptions};
pub use request::{Method, Request, RequestBuilder};
pub use response::{Response, TransferInfo};
#[cfg(feature = "curl")]
pub use transport::curl::CurlTransport;
pub use transport::scripted::{Script, ScriptedTransport};
pub use transport::{Call, Multiplexer, Transport};
