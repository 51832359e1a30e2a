//! Single and parallel request execution.
//!
//! # Design
//! Both executors share the same per-call preparation: allocate a call,
//! apply the request's materialized options, and enable header capture when
//! the request asks for it. They also share the same result extraction into
//! a `Response`. Only the driving differs.
//!
//! `ParallelExecutor` drives a whole batch on the calling thread through one
//! multiplexing context. Setup is all-or-nothing: if any call cannot be
//! prepared or registered, the batch fails and every call created so far is
//! dropped together with the context. Once the batch is running it only
//! fails for context-level problems; a request that times out or cannot
//! connect is reported in its own `Response`.

use std::collections::BTreeMap;

use log::{debug, trace, warn};

use crate::config::ExecutorConfig;
use crate::error::ClientError;
use crate::request::Request;
use crate::response::Response;
use crate::transport::{Call, Multiplexer, Transport};

/// Runs one request at a time, blocking until it finishes.
#[derive(Debug, Clone, Default)]
pub struct SingleExecutor<T> {
    transport: T,
}

impl<T: Transport> SingleExecutor<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Execute `request` and return its response.
    ///
    /// Fails only if the transport cannot allocate a call or rejects an
    /// option. Transfer failures are reported through the response's error
    /// fields, and in that case the body stays empty.
    pub fn execute(&self, request: &Request) -> Result<Response, ClientError> {
        let mut response = Response::default();
        let mut call = prepare_call(&self.transport, request)?;
        debug!("{} {}", request.method(), request.effective_url());
        if call.perform().is_ok() {
            response.store_body(call.take_body());
        }
        store_meta(&mut call, request, &mut response);
        Ok(response)
    }
}

/// Runs a batch of requests concurrently on one multiplexing context.
#[derive(Debug, Clone, Default)]
pub struct ParallelExecutor<T> {
    transport: T,
    config: ExecutorConfig,
}

struct Slot<'a, K, Tok> {
    key: K,
    request: &'a Request,
    token: Tok,
    response: Response,
}

impl<T: Transport> ParallelExecutor<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ExecutorConfig::default())
    }

    pub fn with_config(transport: T, config: ExecutorConfig) -> Self {
        Self { transport, config }
    }

    /// Executor configured from the environment, see
    /// `ExecutorConfig::from_env`.
    pub fn from_env(transport: T) -> Self {
        Self::with_config(transport, ExecutorConfig::from_env())
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute every request and return one response per request, keyed by
    /// its position in `requests`.
    pub fn execute_all(&self, requests: &[Request]) -> Result<BTreeMap<usize, Response>, ClientError> {
        self.run(requests.iter().enumerate())
    }

    /// Like `execute_all`, with caller-chosen keys.
    pub fn execute_keyed<K: Ord + Clone>(
        &self,
        requests: &BTreeMap<K, Request>,
    ) -> Result<BTreeMap<K, Response>, ClientError> {
        self.run(requests.iter().map(|(key, request)| (key.clone(), request)))
    }

    fn run<'a, K: Ord>(
        &self,
        requests: impl Iterator<Item = (K, &'a Request)>,
    ) -> Result<BTreeMap<K, Response>, ClientError> {
        let mut multi = self.transport.create_multi().map_err(|err| {
            warn!("multiplexer init failed: {err}");
            ClientError::MultiplexInitFailed(err)
        })?;

        let mut slots = Vec::new();
        for (key, request) in requests {
            let response = Response::default();
            let call = prepare_call(&self.transport, request)?;
            let token = multi.register(call).map_err(|err| {
                warn!("registering {} failed: {err}", request.effective_url());
                ClientError::MultiplexAddFailed(err)
            })?;
            slots.push(Slot {
                key,
                request,
                token,
                response,
            });
        }
        debug!("registered {} calls", slots.len());

        self.drive(&mut multi)?;

        let mut responses = BTreeMap::new();
        for mut slot in slots {
            let mut call = multi.remove(slot.token).map_err(|err| {
                warn!("removing {} failed: {err}", slot.request.effective_url());
                ClientError::MultiplexRemoveFailed(err)
            })?;
            if call.last_error().is_none() {
                slot.response.store_body(call.take_body());
            }
            store_meta(&mut call, slot.request, &mut slot.response);
            responses.insert(slot.key, slot.response);
        }
        debug!("drained {} responses", responses.len());
        Ok(responses)
    }

    /// Alternate between advancing every call and waiting for activity
    /// until no call is running.
    fn drive(&self, multi: &mut T::Multi) -> Result<(), ClientError> {
        loop {
            let running = multi.advance().map_err(|err| {
                warn!("advancing calls failed: {err}");
                ClientError::MultiplexAdvanceFailed(err)
            })?;
            trace!("{running} calls running");
            if running == 0 {
                return Ok(());
            }
            multi.wait(self.config.wait_timeout).map_err(|err| {
                warn!("waiting for activity failed: {err}");
                ClientError::MultiplexWaitFailed(err)
            })?;
        }
    }
}

fn prepare_call<T: Transport>(transport: &T, request: &Request) -> Result<T::Call, ClientError> {
    let mut call = transport.create_call().map_err(|err| {
        warn!("call init failed: {err}");
        ClientError::HandleInitFailed(err)
    })?;
    call.apply_options(&request.options()).map_err(|err| {
        warn!("options for {} rejected: {err}", request.effective_url());
        ClientError::OptionApplyFailed(err)
    })?;
    if request.store_response_headers() {
        call.capture_headers().map_err(|err| {
            warn!("header capture for {} rejected: {err}", request.effective_url());
            ClientError::OptionApplyFailed(err)
        })?;
    }
    Ok(call)
}

/// Copy status, info, error and captured header lines from `call`.
fn store_meta<C: Call>(call: &mut C, request: &Request, response: &mut Response) {
    let info = if request.store_info() {
        call.info()
    } else {
        Default::default()
    };
    response.store_info(call.status_code(), info);
    let (code, message) = call
        .last_error()
        .map(|err| (err.code, err.message))
        .unwrap_or_default();
    response.store_error(code, message);
    if request.store_response_headers() {
        for line in call.take_header_lines() {
            response.add_header_line(line);
        }
    }
}
