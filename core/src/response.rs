//! The normalized result of one executed request.

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Extended transfer metadata (timings, effective URL, peer address, ...).
///
/// Keys and value types depend on the transport. Only filled when the
/// request asked for it with `with_store_info(true)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TransferInfo(Map<String, Value>);

impl TransferInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> serde_json::map::Iter<'_> {
        self.0.iter()
    }
}

/// Response accumulated by an executor.
///
/// Starts empty (status 0, no body, no error) and is filled in only by the
/// executor. A `status_code` of 0 means the transport never reported one.
/// `error_code` 0 with an empty `error_message` means the transfer
/// succeeded at the transport level, whatever the HTTP status.
///
/// When the transfer fails hard the body stays empty, so "failed" and
/// "succeeded with an empty body" can only be told apart through the error
/// fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Response {
    status_code: u32,
    #[serde(serialize_with = "serialize_body")]
    body: Vec<u8>,
    header_lines: Vec<String>,
    info: TransferInfo,
    error_code: i32,
    error_message: String,
}

impl Response {
    pub fn status_code(&self) -> u32 {
        self.status_code
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// Body decoded as UTF-8, with invalid sequences replaced.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Raw response header lines in arrival order, line terminators
    /// included.
    pub fn header_lines(&self) -> &[String] {
        &self.header_lines
    }

    pub fn info(&self) -> &TransferInfo {
        &self.info
    }

    pub fn error_code(&self) -> i32 {
        self.error_code
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    /// No transport error and a 2xx status.
    pub fn is_success(&self) -> bool {
        self.error_code == 0 && (200..300).contains(&self.status_code)
    }

    pub(crate) fn store_body(&mut self, body: Vec<u8>) {
        self.body = body;
    }

    pub(crate) fn store_info(&mut self, status_code: u32, info: TransferInfo) {
        self.status_code = status_code;
        self.info = info;
    }

    pub(crate) fn store_error(&mut self, code: i32, message: String) {
        self.error_code = code;
        self.error_message = message;
    }

    pub(crate) fn add_header_line(&mut self, line: String) {
        self.header_lines.push(line);
    }
}

fn serialize_body<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(body))
}
