//! In-memory transport with scripted, deterministic outcomes.
//!
//! # Design
//! Responses are looked up by effective URL in a table of `Script`s. A
//! script says what the transfer produces (status, body, header lines or a
//! transport error) and how many `advance` steps it takes to finish inside
//! a multiplexer, which lets tests choose the completion order. A script's
//! `latency` is compared against the request's `Timeout` option, so a
//! request with a tight timeout fails with `OPERATION_TIMEDOUT` the same
//! way a real transfer would.
//!
//! Failures of the transport itself (call or context allocation, option
//! rejection, registration, waiting) can be injected to exercise the
//! executors' setup and control error paths.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use crate::error::{CallError, TransportError};
use crate::options::{OptionKey, OptionValue, TransportOptions};
use crate::response::TransferInfo;
use crate::transport::{Call, Multiplexer, Transport};

/// Scripted outcome for one URL.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    status: u32,
    body: Vec<u8>,
    header_lines: Vec<String>,
    error: Option<CallError>,
    steps: usize,
    latency: Duration,
}

impl Script {
    /// A successful transfer with `status` and `body`, finishing after one
    /// step.
    pub fn ok(status: u32, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
            header_lines: vec![format!("HTTP/1.1 {status}\r\n")],
            error: None,
            steps: 1,
            latency: Duration::ZERO,
        }
    }

    /// A transfer that fails at the transport level with `code` and
    /// `message`, without any HTTP status.
    pub fn failure(code: i32, message: impl Into<String>) -> Self {
        Self {
            status: 0,
            body: Vec::new(),
            header_lines: Vec::new(),
            error: Some(CallError::new(code, message)),
            steps: 1,
            latency: Duration::ZERO,
        }
    }

    pub fn with_header_line(mut self, line: impl Into<String>) -> Self {
        self.header_lines.push(line.into());
        self
    }

    /// Number of `advance` calls before the transfer completes. Clamped to
    /// at least 1.
    pub fn after_steps(mut self, steps: usize) -> Self {
        self.steps = steps.max(1);
        self
    }

    /// Simulated server latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[derive(Debug, Clone, Default)]
struct Faults {
    call_init: bool,
    multi_init: bool,
    register_at: Option<usize>,
    advance: bool,
    wait: bool,
    header_capture: bool,
    rejected_option: Option<OptionKey>,
}

/// Deterministic transport answering from a URL → `Script` table.
///
/// Unknown URLs fail with `COULDNT_RESOLVE_HOST`. Clones share the
/// completion log, so a clone kept by a test observes calls made through an
/// executor that owns the original.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    scripts: Rc<BTreeMap<String, Script>>,
    faults: Faults,
    completions: Rc<RefCell<Vec<String>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests for `url` with `script`.
    pub fn route(mut self, url: impl Into<String>, script: Script) -> Self {
        Rc::make_mut(&mut self.scripts).insert(url.into(), script);
        self
    }

    pub fn fail_call_init(mut self) -> Self {
        self.faults.call_init = true;
        self
    }

    pub fn fail_multi_init(mut self) -> Self {
        self.faults.multi_init = true;
        self
    }

    /// Refuse the registration of the `index`-th call (0-based) in each
    /// multiplexer.
    pub fn fail_register_at(mut self, index: usize) -> Self {
        self.faults.register_at = Some(index);
        self
    }

    pub fn fail_advance(mut self) -> Self {
        self.faults.advance = true;
        self
    }

    pub fn fail_wait(mut self) -> Self {
        self.faults.wait = true;
        self
    }

    /// Refuse to enable header capture on any call.
    pub fn fail_header_capture(mut self) -> Self {
        self.faults.header_capture = true;
        self
    }

    /// Reject any option set that contains `key`.
    pub fn reject_option(mut self, key: OptionKey) -> Self {
        self.faults.rejected_option = Some(key);
        self
    }

    /// URLs of finished transfers, in completion order.
    pub fn completion_order(&self) -> Vec<String> {
        self.completions.borrow().clone()
    }
}

impl Transport for ScriptedTransport {
    type Call = ScriptedCall;
    type Multi = ScriptedMulti;

    fn create_call(&self) -> Result<ScriptedCall, TransportError> {
        if self.faults.call_init {
            return Err(TransportError::with_code(2, "failed to initialize call"));
        }
        Ok(ScriptedCall {
            scripts: Rc::clone(&self.scripts),
            rejected_option: self.faults.rejected_option,
            refuse_header_capture: self.faults.header_capture,
            completions: Rc::clone(&self.completions),
            options: TransportOptions::new(),
            url: String::new(),
            capture_headers: false,
            outcome: None,
        })
    }

    fn create_multi(&self) -> Result<ScriptedMulti, TransportError> {
        if self.faults.multi_init {
            return Err(TransportError::new("failed to initialize multiplexer"));
        }
        Ok(ScriptedMulti {
            slots: Vec::new(),
            faults: self.faults.clone(),
        })
    }
}

#[derive(Debug, Default)]
struct Outcome {
    status: u32,
    body: Vec<u8>,
    header_lines: Vec<String>,
    error: Option<CallError>,
    latency: Duration,
    size_download: usize,
}

/// A call produced by `ScriptedTransport`.
#[derive(Debug)]
pub struct ScriptedCall {
    scripts: Rc<BTreeMap<String, Script>>,
    rejected_option: Option<OptionKey>,
    refuse_header_capture: bool,
    completions: Rc<RefCell<Vec<String>>>,
    options: TransportOptions,
    url: String,
    capture_headers: bool,
    outcome: Option<Outcome>,
}

impl ScriptedCall {
    /// Options applied so far.
    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    fn steps(&self) -> usize {
        self.scripts.get(&self.url).map_or(1, |s| s.steps)
    }

    fn complete(&mut self) {
        let outcome = match self.scripts.get(&self.url) {
            None => Outcome {
                error: Some(CallError::new(
                    CallError::COULDNT_RESOLVE_HOST,
                    format!("Could not resolve host: {}", host_of(&self.url)),
                )),
                ..Outcome::default()
            },
            Some(script) => match self.timeout() {
                Some(limit) if script.latency > limit => Outcome {
                    error: Some(CallError::new(
                        CallError::OPERATION_TIMEDOUT,
                        format!(
                            "Operation timed out after {} milliseconds with 0 bytes received",
                            limit.as_millis()
                        ),
                    )),
                    latency: limit,
                    ..Outcome::default()
                },
                _ => self.outcome_of(script),
            },
        };
        self.completions.borrow_mut().push(self.url.clone());
        self.outcome = Some(outcome);
    }

    fn outcome_of(&self, script: &Script) -> Outcome {
        let skip_body = self.flag(OptionKey::NoBody).unwrap_or(false);
        let keep_body = self.flag(OptionKey::ReturnTransfer).unwrap_or(false) && !skip_body;
        Outcome {
            status: script.status,
            body: if keep_body { script.body.clone() } else { Vec::new() },
            size_download: if skip_body { 0 } else { script.body.len() },
            header_lines: if self.capture_headers {
                script.header_lines.clone()
            } else {
                Vec::new()
            },
            error: script.error.clone(),
            latency: script.latency,
        }
    }

    fn flag(&self, key: OptionKey) -> Option<bool> {
        self.options.get(key).and_then(OptionValue::as_bool)
    }

    fn timeout(&self) -> Option<Duration> {
        self.options
            .get(OptionKey::Timeout)
            .and_then(OptionValue::as_duration)
            .filter(|d| !d.is_zero())
    }
}

impl Call for ScriptedCall {
    fn apply_options(&mut self, options: &TransportOptions) -> Result<(), TransportError> {
        for (key, value) in options {
            if Some(*key) == self.rejected_option {
                return Err(TransportError::with_code(
                    48,
                    format!("option {key:?} is not supported"),
                ));
            }
            if *key == OptionKey::Url {
                let url = value.as_text().ok_or_else(|| {
                    TransportError::with_code(43, "Url expects a text value")
                })?;
                self.url = url.to_string();
            }
            self.options.set(*key, value.clone());
        }
        Ok(())
    }

    fn capture_headers(&mut self) -> Result<(), TransportError> {
        if self.refuse_header_capture {
            return Err(TransportError::with_code(48, "header capture is not supported"));
        }
        self.capture_headers = true;
        Ok(())
    }

    fn perform(&mut self) -> Result<(), CallError> {
        self.complete();
        match self.last_error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn take_body(&mut self) -> Vec<u8> {
        self.outcome
            .as_mut()
            .map(|o| std::mem::take(&mut o.body))
            .unwrap_or_default()
    }

    fn take_header_lines(&mut self) -> Vec<String> {
        self.outcome
            .as_mut()
            .map(|o| std::mem::take(&mut o.header_lines))
            .unwrap_or_default()
    }

    fn status_code(&mut self) -> u32 {
        self.outcome.as_ref().map_or(0, |o| o.status)
    }

    fn info(&mut self) -> TransferInfo {
        let mut info = TransferInfo::new();
        info.insert("url", self.url.clone());
        if let Some(outcome) = &self.outcome {
            info.insert("http_code", outcome.status);
            info.insert("size_download", outcome.size_download);
            info.insert("total_time", outcome.latency.as_secs_f64());
        }
        info
    }

    fn last_error(&self) -> Option<CallError> {
        self.outcome.as_ref().and_then(|o| o.error.clone())
    }
}

#[derive(Debug)]
struct Slot {
    call: ScriptedCall,
    remaining: usize,
}

/// Multiplexer produced by `ScriptedTransport`.
///
/// Each `advance` moves every running call one step closer to completion;
/// calls that reach zero complete in registration order within that step.
#[derive(Debug)]
pub struct ScriptedMulti {
    slots: Vec<Option<Slot>>,
    faults: Faults,
}

impl Multiplexer for ScriptedMulti {
    type Call = ScriptedCall;
    type Token = usize;

    fn register(&mut self, call: ScriptedCall) -> Result<usize, TransportError> {
        let token = self.slots.len();
        if self.faults.register_at == Some(token) {
            return Err(TransportError::with_code(2, "invalid easy handle"));
        }
        let remaining = call.steps();
        self.slots.push(Some(Slot { call, remaining }));
        Ok(token)
    }

    fn advance(&mut self) -> Result<usize, TransportError> {
        if self.faults.advance {
            return Err(TransportError::with_code(3, "out of memory"));
        }
        let mut running = 0;
        for slot in self.slots.iter_mut().flatten() {
            if slot.remaining == 0 {
                continue;
            }
            slot.remaining -= 1;
            if slot.remaining == 0 {
                slot.call.complete();
            } else {
                running += 1;
            }
        }
        Ok(running)
    }

    fn wait(&mut self, _timeout: Duration) -> Result<usize, TransportError> {
        if self.faults.wait {
            return Err(TransportError::with_code(-1, "wait on multiplexer failed"));
        }
        Ok(self
            .slots
            .iter()
            .flatten()
            .filter(|slot| slot.remaining > 0)
            .count())
    }

    fn remove(&mut self, token: usize) -> Result<ScriptedCall, TransportError> {
        self.slots
            .get_mut(token)
            .and_then(Option::take)
            .map(|slot| slot.call)
            .ok_or_else(|| TransportError::with_code(2, format!("no call registered as {token}")))
    }
}

fn host_of(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.split(['/', '?', ':']).next().unwrap_or(rest)
}
