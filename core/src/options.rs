//! Transport options carried by a request.
//!
//! # Design
//! Options are plain data: an ordered map from `OptionKey` to `OptionValue`
//! that the executor hands to the transport verbatim. The request layer
//! never interprets them beyond assembling the URL and method; each transport
//! decides how a key maps onto its own knobs and rejects values it cannot
//! apply.

use std::collections::btree_map::{self, BTreeMap};
use std::time::Duration;

/// A transport setting understood by the bundled transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptionKey {
    /// Effective request URL, query string included.
    Url,
    ConnectTimeout,
    /// Upper bound for the whole transfer.
    Timeout,
    /// Keep the body as data on the response instead of writing it to
    /// standard output.
    ReturnTransfer,
    /// Prefix the response headers to the body.
    IncludeHeader,
    SslVerifyHost,
    SslVerifyPeer,
    FollowLocation,
    MaxRedirects,
    Post,
    PostFields,
    CustomRequest,
    /// Skip the response body (HEAD).
    NoBody,
    /// Raw `Name: value` request header lines.
    HttpHeader,
    CookieJar,
    CookieFile,
    /// `user:password` credentials.
    UserPwd,
    HttpAuth,
    UserAgent,
}

/// Authentication schemes a request may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthScheme {
    Basic,
    Digest,
    Ntlm,
    /// Let the transport pick any scheme the server offers.
    Any,
    /// Like `Any`, but never sends credentials in clear text.
    AnySafe,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Long(i64),
    Duration(Duration),
    Text(String),
    List(Vec<String>),
    Auth(AuthScheme),
}

impl OptionValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            OptionValue::Long(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            OptionValue::Duration(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            OptionValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            OptionValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_auth(&self) -> Option<AuthScheme> {
        match self {
            OptionValue::Auth(scheme) => Some(*scheme),
            _ => None,
        }
    }
}

/// Ordered set of transport options. Iteration follows `OptionKey` order so
/// transports apply options deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportOptions {
    entries: BTreeMap<OptionKey, OptionValue>,
}

impl TransportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing any previous value.
    pub fn set(&mut self, key: OptionKey, value: OptionValue) {
        self.entries.insert(key, value);
    }

    pub fn get(&self, key: OptionKey) -> Option<&OptionValue> {
        self.entries.get(&key)
    }

    pub fn remove(&mut self, key: OptionKey) -> Option<OptionValue> {
        self.entries.remove(&key)
    }

    pub fn contains(&self, key: OptionKey) -> bool {
        self.entries.contains_key(&key)
    }

    /// Add every entry of `other` whose key is not set yet. Keys already
    /// present in `self` keep their current value.
    pub fn merge_missing(&mut self, other: TransportOptions) {
        for (key, value) in other.entries {
            self.entries.entry(key).or_insert(value);
        }
    }

    pub fn iter(&self) -> btree_map::Iter<'_, OptionKey, OptionValue> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(OptionKey, OptionValue)> for TransportOptions {
    fn from_iter<I: IntoIterator<Item = (OptionKey, OptionValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a TransportOptions {
    type Item = (&'a OptionKey, &'a OptionValue);
    type IntoIter = btree_map::Iter<'a, OptionKey, OptionValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Options every new `RequestBuilder` starts from.
///
/// | field              | default |
/// |--------------------|---------|
/// | `connect_timeout`  | 5s      |
/// | `timeout`          | 10s     |
/// | `return_transfer`  | true    |
/// | `include_header`   | false   |
/// | `ssl_verify_host`  | true    |
/// | `ssl_verify_peer`  | true    |
/// | `follow_location`  | false   |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDefaults {
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub return_transfer: bool,
    pub include_header: bool,
    /// Strict host name verification against the peer certificate.
    pub ssl_verify_host: bool,
    pub ssl_verify_peer: bool,
    pub follow_location: bool,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            timeout: Duration::from_secs(10),
            return_transfer: true,
            include_header: false,
            ssl_verify_host: true,
            ssl_verify_peer: true,
            follow_location: false,
        }
    }
}

impl RequestDefaults {
    pub fn to_options(&self) -> TransportOptions {
        [
            (OptionKey::ConnectTimeout, OptionValue::Duration(self.connect_timeout)),
            (OptionKey::Timeout, OptionValue::Duration(self.timeout)),
            (OptionKey::ReturnTransfer, OptionValue::Bool(self.return_transfer)),
            (OptionKey::IncludeHeader, OptionValue::Bool(self.include_header)),
            (OptionKey::SslVerifyHost, OptionValue::Bool(self.ssl_verify_host)),
            (OptionKey::SslVerifyPeer, OptionValue::Bool(self.ssl_verify_peer)),
            (OptionKey::FollowLocation, OptionValue::Bool(self.follow_location)),
        ]
        .into_iter()
        .collect()
    }
}
