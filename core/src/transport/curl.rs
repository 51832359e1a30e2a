//! libcurl-backed transport.
//!
//! # Design
//! Every call is an `Easy2<Collector>`. The collector is the call's own
//! write and header sink, so bodies and header lines of concurrent
//! transfers never mix. Inside a `CurlMulti` each easy handle is tagged with
//! its slot index as curl token; completion messages are read after every
//! `perform` and kept per slot until the call is removed.

use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use ::curl::easy::{Auth, Easy2, Handler, List, WriteError};
use ::curl::multi::{Easy2Handle, Multi};

use crate::error::{CallError, TransportError};
use crate::options::{AuthScheme, OptionKey, OptionValue, TransportOptions};
use crate::response::TransferInfo;
use crate::transport::{Call, Multiplexer, Transport};

impl From<::curl::Error> for TransportError {
    fn from(err: ::curl::Error) -> Self {
        TransportError::with_code(err.code() as i32, message_of(&err))
    }
}

impl From<::curl::MultiError> for TransportError {
    fn from(err: ::curl::MultiError) -> Self {
        TransportError::with_code(err.code() as i32, err.description())
    }
}

impl From<&::curl::Error> for CallError {
    fn from(err: &::curl::Error) -> Self {
        CallError::new(err.code() as i32, message_of(err))
    }
}

fn message_of(err: &::curl::Error) -> String {
    err.extra_description()
        .unwrap_or_else(|| err.description())
        .to_string()
}

/// Transport backed by libcurl.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurlTransport;

impl Transport for CurlTransport {
    type Call = CurlCall;
    type Multi = CurlMulti;

    fn create_call(&self) -> Result<CurlCall, TransportError> {
        Ok(CurlCall {
            easy: Easy2::new(Collector::default()),
            error: None,
        })
    }

    fn create_multi(&self) -> Result<CurlMulti, TransportError> {
        Ok(CurlMulti {
            handles: Vec::new(),
            outcomes: HashMap::new(),
            multi: Multi::new(),
        })
    }
}

/// Per-call body and header sink.
struct Collector {
    body: Vec<u8>,
    header_lines: Vec<String>,
    return_transfer: bool,
    capture_headers: bool,
}

impl Default for Collector {
    fn default() -> Self {
        Self {
            body: Vec::new(),
            header_lines: Vec::new(),
            return_transfer: true,
            capture_headers: false,
        }
    }
}

impl Handler for Collector {
    fn write(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        if self.return_transfer {
            self.body.extend_from_slice(data);
        } else if std::io::stdout().write_all(data).is_err() {
            // A short count makes curl abort the transfer with a write error.
            return Ok(0);
        }
        Ok(data.len())
    }

    fn header(&mut self, data: &[u8]) -> bool {
        if self.capture_headers {
            self.header_lines
                .push(String::from_utf8_lossy(data).into_owned());
        }
        true
    }
}

/// One libcurl easy handle.
pub struct CurlCall {
    easy: Easy2<Collector>,
    error: Option<CallError>,
}

impl CurlCall {
    fn apply(&mut self, key: OptionKey, value: &OptionValue) -> Result<(), TransportError> {
        let easy = &mut self.easy;
        match key {
            OptionKey::Url => easy.url(text(key, value)?)?,
            OptionKey::ConnectTimeout => easy.connect_timeout(duration(key, value)?)?,
            OptionKey::Timeout => easy.timeout(duration(key, value)?)?,
            OptionKey::ReturnTransfer => easy.get_mut().return_transfer = flag(key, value)?,
            OptionKey::IncludeHeader => easy.show_header(flag(key, value)?)?,
            OptionKey::SslVerifyHost => easy.ssl_verify_host(flag(key, value)?)?,
            OptionKey::SslVerifyPeer => easy.ssl_verify_peer(flag(key, value)?)?,
            OptionKey::FollowLocation => easy.follow_location(flag(key, value)?)?,
            OptionKey::MaxRedirects => {
                let max = long(key, value)?;
                let max = u32::try_from(max).map_err(|_| {
                    TransportError::new(format!("{key:?} out of range: {max}"))
                })?;
                easy.max_redirections(max)?
            }
            OptionKey::Post => easy.post(flag(key, value)?)?,
            OptionKey::PostFields => easy.post_fields_copy(text(key, value)?.as_bytes())?,
            OptionKey::CustomRequest => easy.custom_request(text(key, value)?)?,
            OptionKey::NoBody => easy.nobody(flag(key, value)?)?,
            OptionKey::HttpHeader => {
                let mut headers = List::new();
                for line in list(key, value)? {
                    headers.append(line)?;
                }
                easy.http_headers(headers)?
            }
            OptionKey::CookieJar => easy.cookie_jar(text(key, value)?)?,
            OptionKey::CookieFile => easy.cookie_file(text(key, value)?)?,
            OptionKey::UserPwd => {
                let credentials = text(key, value)?;
                let (user, password) = credentials.split_once(':').unwrap_or((credentials, ""));
                easy.username(user)?;
                easy.password(password)?
            }
            OptionKey::HttpAuth => easy.http_auth(&auth_for(auth(key, value)?))?,
            OptionKey::UserAgent => easy.useragent(text(key, value)?)?,
        }
        Ok(())
    }
}

impl Call for CurlCall {
    fn apply_options(&mut self, options: &TransportOptions) -> Result<(), TransportError> {
        for (key, value) in options {
            self.apply(*key, value).map_err(|err| TransportError {
                code: err.code,
                message: format!("{key:?}: {}", err.message),
            })?;
        }
        Ok(())
    }

    fn capture_headers(&mut self) -> Result<(), TransportError> {
        self.easy.get_mut().capture_headers = true;
        Ok(())
    }

    fn perform(&mut self) -> Result<(), CallError> {
        match self.easy.perform() {
            Ok(()) => {
                self.error = None;
                Ok(())
            }
            Err(err) => {
                let err = CallError::from(&err);
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    fn take_body(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.easy.get_mut().body)
    }

    fn take_header_lines(&mut self) -> Vec<String> {
        std::mem::take(&mut self.easy.get_mut().header_lines)
    }

    fn status_code(&mut self) -> u32 {
        self.easy.response_code().unwrap_or(0)
    }

    fn info(&mut self) -> TransferInfo {
        let easy = &mut self.easy;
        let mut info = TransferInfo::new();
        if let Ok(Some(url)) = easy.effective_url() {
            info.insert("url", url);
        }
        if let Ok(Some(content_type)) = easy.content_type() {
            info.insert("content_type", content_type);
        }
        if let Ok(code) = easy.response_code() {
            info.insert("http_code", code);
        }
        if let Ok(count) = easy.redirect_count() {
            info.insert("redirect_count", count);
        }
        if let Ok(t) = easy.total_time() {
            info.insert("total_time", t.as_secs_f64());
        }
        if let Ok(t) = easy.namelookup_time() {
            info.insert("namelookup_time", t.as_secs_f64());
        }
        if let Ok(t) = easy.connect_time() {
            info.insert("connect_time", t.as_secs_f64());
        }
        if let Ok(t) = easy.pretransfer_time() {
            info.insert("pretransfer_time", t.as_secs_f64());
        }
        if let Ok(t) = easy.starttransfer_time() {
            info.insert("starttransfer_time", t.as_secs_f64());
        }
        if let Ok(t) = easy.redirect_time() {
            info.insert("redirect_time", t.as_secs_f64());
        }
        if let Ok(size) = easy.download_size() {
            info.insert("size_download", size);
        }
        if let Ok(size) = easy.upload_size() {
            info.insert("size_upload", size);
        }
        if let Ok(Some(ip)) = easy.primary_ip() {
            info.insert("primary_ip", ip);
        }
        if let Ok(port) = easy.primary_port() {
            info.insert("primary_port", port);
        }
        if let Ok(Some(ip)) = easy.local_ip() {
            info.insert("local_ip", ip);
        }
        if let Ok(port) = easy.local_port() {
            info.insert("local_port", port);
        }
        info
    }

    fn last_error(&self) -> Option<CallError> {
        self.error.clone()
    }
}

/// A libcurl multi handle and the calls registered with it.
pub struct CurlMulti {
    handles: Vec<Option<Easy2Handle<Collector>>>,
    outcomes: HashMap<usize, Result<(), ::curl::Error>>,
    multi: Multi,
}

impl CurlMulti {
    fn collect_messages(&mut self) {
        let outcomes = &mut self.outcomes;
        self.multi.messages(|message| {
            if let (Ok(token), Some(result)) = (message.token(), message.result()) {
                outcomes.insert(token, result);
            }
        });
    }
}

impl Multiplexer for CurlMulti {
    type Call = CurlCall;
    type Token = usize;

    fn register(&mut self, call: CurlCall) -> Result<usize, TransportError> {
        let token = self.handles.len();
        let mut handle = self.multi.add2(call.easy)?;
        handle.set_token(token)?;
        self.handles.push(Some(handle));
        Ok(token)
    }

    fn advance(&mut self) -> Result<usize, TransportError> {
        let running = self.multi.perform()?;
        self.collect_messages();
        Ok(running as usize)
    }

    fn wait(&mut self, timeout: Duration) -> Result<usize, TransportError> {
        let ready = self.multi.wait(&mut [], timeout)?;
        Ok(ready as usize)
    }

    fn remove(&mut self, token: usize) -> Result<CurlCall, TransportError> {
        let handle = self
            .handles
            .get_mut(token)
            .and_then(Option::take)
            .ok_or_else(|| TransportError::new(format!("no call registered as {token}")))?;
        let easy = self.multi.remove2(handle)?;
        let error = match self.outcomes.remove(&token) {
            Some(Err(err)) => Some(CallError::from(&err)),
            _ => None,
        };
        Ok(CurlCall { easy, error })
    }
}

fn auth_for(scheme: AuthScheme) -> Auth {
    let mut auth = Auth::new();
    match scheme {
        AuthScheme::Basic => auth.basic(true),
        AuthScheme::Digest => auth.digest(true),
        AuthScheme::Ntlm => auth.ntlm(true),
        AuthScheme::Any => auth.basic(true).digest(true).ntlm(true).gssnegotiate(true),
        AuthScheme::AnySafe => auth.digest(true).ntlm(true).gssnegotiate(true),
    };
    auth
}

fn mismatch(key: OptionKey, expected: &str) -> TransportError {
    TransportError::new(format!("{key:?} expects a {expected} value"))
}

fn flag(key: OptionKey, value: &OptionValue) -> Result<bool, TransportError> {
    value.as_bool().ok_or_else(|| mismatch(key, "boolean"))
}

fn long(key: OptionKey, value: &OptionValue) -> Result<i64, TransportError> {
    value.as_long().ok_or_else(|| mismatch(key, "integer"))
}

fn duration(key: OptionKey, value: &OptionValue) -> Result<Duration, TransportError> {
    value.as_duration().ok_or_else(|| mismatch(key, "duration"))
}

fn text(key: OptionKey, value: &OptionValue) -> Result<&str, TransportError> {
    value.as_text().ok_or_else(|| mismatch(key, "text"))
}

fn list(key: OptionKey, value: &OptionValue) -> Result<&[String], TransportError> {
    value.as_list().ok_or_else(|| mismatch(key, "list"))
}

fn auth(key: OptionKey, value: &OptionValue) -> Result<AuthScheme, TransportError> {
    value.as_auth().ok_or_else(|| mismatch(key, "auth scheme"))
}
