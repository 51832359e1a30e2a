//! Fluent request builder and the immutable `Request` it produces.
//!
//! # Design
//! `RequestBuilder` is a by-value builder: every `with_*` method consumes the
//! builder and returns it with one more setting, so calls chain naturally.
//! `build()` snapshots everything into a `Request`, which has no setters and
//! no interior mutability. A `Request` handed to an executor can therefore
//! never be affected by later builder calls.
//!
//! The effective URL is assembled in `build()`, not in `with_url` or
//! `with_get_vars`, so the two may be called in either order.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use url::form_urlencoded;

use crate::error::ClientError;
use crate::options::{AuthScheme, OptionKey, OptionValue, RequestDefaults, TransportOptions};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Head,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses exactly `get`, `post`, `put`, `delete` or `head`. Other spellings,
/// including upper case ones, are `InvalidMethod`.
impl FromStr for Method {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "get" => Ok(Method::Get),
            "post" => Ok(Method::Post),
            "put" => Ok(Method::Put),
            "delete" => Ok(Method::Delete),
            "head" => Ok(Method::Head),
            _ => Err(ClientError::InvalidMethod(s.to_string())),
        }
    }
}

/// A fully configured HTTP call.
///
/// Produced by `RequestBuilder::build`. Executors read it; nothing mutates
/// it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    url: String,
    query_params: Vec<(String, String)>,
    effective_url: String,
    method: Method,
    options: TransportOptions,
    store_response_headers: bool,
    store_info: bool,
}

impl Request {
    pub fn builder() -> RequestBuilder {
        RequestBuilder::new()
    }

    /// Base URL as given to `with_url`.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn query_params(&self) -> &[(String, String)] {
        &self.query_params
    }

    /// Base URL with the encoded query parameters appended.
    pub fn effective_url(&self) -> &str {
        &self.effective_url
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Request header lines set through `with_headers`.
    pub fn headers(&self) -> &[String] {
        self.options
            .get(OptionKey::HttpHeader)
            .and_then(OptionValue::as_list)
            .unwrap_or(&[])
    }

    pub fn store_response_headers(&self) -> bool {
        self.store_response_headers
    }

    pub fn store_info(&self) -> bool {
        self.store_info
    }

    /// The option set a transport should apply for this request: the
    /// configured options plus the effective URL and the method
    /// translation.
    pub fn options(&self) -> TransportOptions {
        let mut options = self.options.clone();
        options.set(OptionKey::Url, OptionValue::Text(self.effective_url.clone()));
        match self.method {
            Method::Get => {}
            Method::Post => options.set(OptionKey::Post, OptionValue::Bool(true)),
            Method::Put | Method::Delete => options.set(
                OptionKey::CustomRequest,
                OptionValue::Text(self.method.as_str().to_string()),
            ),
            Method::Head => {
                options.set(
                    OptionKey::CustomRequest,
                    OptionValue::Text(Method::Head.as_str().to_string()),
                );
                options.set(OptionKey::NoBody, OptionValue::Bool(true));
            }
        }
        options
    }
}

/// Chainable builder for `Request`.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    url: String,
    query_params: Vec<(String, String)>,
    method: Method,
    options: TransportOptions,
    store_response_headers: bool,
    store_info: bool,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    /// Start from `RequestDefaults::default()`.
    pub fn new() -> Self {
        Self::with_defaults(&RequestDefaults::default())
    }

    pub fn with_defaults(defaults: &RequestDefaults) -> Self {
        Self {
            url: String::new(),
            query_params: Vec::new(),
            method: Method::Get,
            options: defaults.to_options(),
            store_response_headers: false,
            store_info: false,
        }
    }

    /// Set the method from its name. Fails with `InvalidMethod` for anything
    /// other than get, post, put, delete or head.
    pub fn with_method(self, method: &str) -> Result<Self, ClientError> {
        let method = method.parse()?;
        Ok(self.with_http_method(method))
    }

    pub fn with_http_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Replace the query parameters appended to the URL.
    pub fn with_get_vars<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query_params = vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    /// Send `vars` url-form-encoded as the request body. Switches the method
    /// to POST if it is still GET; any other method is kept.
    pub fn with_post_vars<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        if self.method == Method::Get {
            self.method = Method::Post;
        }
        let pairs: Vec<(String, String)> =
            vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self.options
            .set(OptionKey::PostFields, OptionValue::Text(encode_pairs(&pairs)));
        self
    }

    /// Read and persist cookies through `path`.
    pub fn with_cookie_file(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.options
            .set(OptionKey::CookieJar, OptionValue::Text(path.clone()));
        self.options.set(OptionKey::CookieFile, OptionValue::Text(path));
        self
    }

    /// Raw `Name: value` header lines, replacing any set before.
    pub fn with_headers<S: Into<String>>(mut self, headers: impl IntoIterator<Item = S>) -> Self {
        let headers = headers.into_iter().map(Into::into).collect();
        self.options.set(OptionKey::HttpHeader, OptionValue::List(headers));
        self
    }

    pub fn with_auth_basic(self, username: &str, password: &str) -> Self {
        self.with_auth(AuthScheme::Basic, username, password)
    }

    pub fn with_auth_digest(self, username: &str, password: &str) -> Self {
        self.with_auth(AuthScheme::Digest, username, password)
    }

    pub fn with_auth_ntlm(self, username: &str, password: &str) -> Self {
        self.with_auth(AuthScheme::Ntlm, username, password)
    }

    pub fn with_auth_any(self, username: &str, password: &str) -> Self {
        self.with_auth(AuthScheme::Any, username, password)
    }

    pub fn with_auth_any_safe(self, username: &str, password: &str) -> Self {
        self.with_auth(AuthScheme::AnySafe, username, password)
    }

    fn with_auth(mut self, scheme: AuthScheme, username: &str, password: &str) -> Self {
        self.options.set(
            OptionKey::UserPwd,
            OptionValue::Text(format!("{username}:{password}")),
        );
        self.options.set(OptionKey::HttpAuth, OptionValue::Auth(scheme));
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.options
            .set(OptionKey::UserAgent, OptionValue::Text(user_agent.into()));
        self
    }

    /// Merge `options` underneath the current ones.
    ///
    /// Precedence: options already set on the builder WIN. An incoming key
    /// is only used when the builder has no value for it yet. Use
    /// `with_option` to overwrite.
    pub fn with_options(mut self, options: TransportOptions) -> Self {
        self.options.merge_missing(options);
        self
    }

    /// Set a single option, replacing any current value.
    pub fn with_option(mut self, key: OptionKey, value: OptionValue) -> Self {
        self.options.set(key, value);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.options
            .set(OptionKey::ConnectTimeout, OptionValue::Duration(timeout));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.set(OptionKey::Timeout, OptionValue::Duration(timeout));
        self
    }

    /// Follow up to `max_redirects` redirects. Values below 1 leave the
    /// builder unchanged.
    pub fn with_redirects_allowed(mut self, max_redirects: i64) -> Self {
        if max_redirects < 1 {
            return self;
        }
        self.options
            .set(OptionKey::FollowLocation, OptionValue::Bool(true));
        self.options
            .set(OptionKey::MaxRedirects, OptionValue::Long(max_redirects));
        self
    }

    /// Record the raw response header lines on the `Response`.
    pub fn with_store_response_headers(mut self, store: bool) -> Self {
        self.store_response_headers = store;
        self
    }

    /// Record extended transfer info on the `Response`.
    pub fn with_store_info(mut self, store: bool) -> Self {
        self.store_info = store;
        self
    }

    pub fn build(self) -> Request {
        let effective_url = assemble_url(&self.url, &self.query_params);
        Request {
            url: self.url,
            query_params: self.query_params,
            effective_url,
            method: self.method,
            options: self.options,
            store_response_headers: self.store_response_headers,
            store_info: self.store_info,
        }
    }
}

/// Append encoded `params` to `url`.
///
/// The rules, in order:
/// - no params: `url` unchanged
/// - no `?` in `url`: `url?params`
/// - first `?` is not the last character: `url` + params with no separator
/// - `?` is the last character: `url&params`
///
/// Keys and values are form-encoded: space becomes `+`, and everything but
/// ASCII alphanumerics and `*-._` is percent-encoded. `*` stays literal
/// where some encoders emit `%2A`; servers decode both alike.
///
/// The third case is kept for compatibility with existing callers; URLs that
/// already carry a query string should not be combined with query params.
pub fn assemble_url(url: &str, params: &[(String, String)]) -> String {
    if params.is_empty() {
        return url.to_string();
    }
    let encoded = encode_pairs(params);
    match url.find('?') {
        None => format!("{url}?{encoded}"),
        Some(pos) if pos != url.len() - 1 => format!("{url}{encoded}"),
        Some(_) => format!("{url}&{encoded}"),
    }
}

fn encode_pairs(pairs: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Vec<(String, String)> {
        vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "x y".to_string()),
        ]
    }

    #[test]
    fn url_without_params_is_unchanged() {
        assert_eq!(assemble_url("http://h/p?", &[]), "http://h/p?");
        assert_eq!(assemble_url("http://h/p", &[]), "http://h/p");
    }

    #[test]
    fn url_without_question_mark_gets_one() {
        assert_eq!(assemble_url("http://h/p", &params()), "http://h/p?a=1&b=x+y");
    }

    #[test]
    fn url_ending_in_question_mark_gets_ampersand() {
        assert_eq!(assemble_url("http://h/p?", &params()), "http://h/p?&a=1&b=x+y");
    }

    #[test]
    fn url_with_existing_query_is_concatenated() {
        assert_eq!(
            assemble_url("http://h/p?z=0", &params()),
            "http://h/p?z=0a=1&b=x+y"
        );
    }

    #[test]
    fn get_vars_and_url_are_order_independent() {
        let first = Request::builder()
            .with_url("http://h/p")
            .with_get_vars([("q", "rust")])
            .build();
        let second = Request::builder()
            .with_get_vars([("q", "rust")])
            .with_url("http://h/p")
            .build();
        assert_eq!(first.effective_url(), "http://h/p?q=rust");
        assert_eq!(first, second);
    }

    #[test]
    fn with_method_rejects_unknown_verbs() {
        let err = Request::builder().with_method("patch").unwrap_err();
        assert!(matches!(err, ClientError::InvalidMethod(ref m) if m == "patch"));
    }

    #[test]
    fn with_method_accepts_supported_verbs() {
        for (name, method) in [
            ("get", Method::Get),
            ("post", Method::Post),
            ("put", Method::Put),
            ("delete", Method::Delete),
            ("head", Method::Head),
        ] {
            let req = Request::builder().with_method(name).unwrap().build();
            assert_eq!(req.method(), method, "{name}");
        }
    }

    #[test]
    fn with_method_is_case_sensitive() {
        for name in ["PUT", "Get", "HEAD", "Delete"] {
            let err = Request::builder().with_method(name).unwrap_err();
            assert!(matches!(err, ClientError::InvalidMethod(ref m) if m == name), "{name}");
        }
        let req = Request::builder().with_http_method(Method::Put).build();
        assert_eq!(req.method(), Method::Put);
    }

    #[test]
    fn post_vars_promote_default_method() {
        let req = Request::builder()
            .with_url("http://h/form")
            .with_post_vars([("k", "v")])
            .build();
        assert_eq!(req.method(), Method::Post);
        let opts = req.options();
        assert_eq!(opts.get(OptionKey::Post), Some(&OptionValue::Bool(true)));
        assert_eq!(
            opts.get(OptionKey::PostFields).and_then(OptionValue::as_text),
            Some("k=v")
        );
    }

    #[test]
    fn post_vars_keep_explicit_method() {
        let req = Request::builder()
            .with_method("put")
            .unwrap()
            .with_post_vars([("k", "v")])
            .build();
        assert_eq!(req.method(), Method::Put);
        let opts = req.options();
        assert_eq!(
            opts.get(OptionKey::CustomRequest).and_then(OptionValue::as_text),
            Some("PUT")
        );
        assert!(!opts.contains(OptionKey::Post));
    }

    #[test]
    fn head_skips_the_body() {
        let opts = Request::builder()
            .with_http_method(Method::Head)
            .build()
            .options();
        assert_eq!(
            opts.get(OptionKey::CustomRequest).and_then(OptionValue::as_text),
            Some("HEAD")
        );
        assert_eq!(opts.get(OptionKey::NoBody), Some(&OptionValue::Bool(true)));
    }

    #[test]
    fn options_carry_effective_url() {
        let req = Request::builder()
            .with_url("http://h/search")
            .with_get_vars([("q", "a&b")])
            .build();
        assert_eq!(
            req.options().get(OptionKey::Url).and_then(OptionValue::as_text),
            Some("http://h/search?q=a%26b")
        );
    }

    #[test]
    fn redirects_below_one_are_ignored() {
        let req = Request::builder().with_redirects_allowed(0).build();
        let opts = req.options();
        assert_eq!(opts.get(OptionKey::FollowLocation), Some(&OptionValue::Bool(false)));
        assert!(!opts.contains(OptionKey::MaxRedirects));

        let req = Request::builder().with_redirects_allowed(3).build();
        let opts = req.options();
        assert_eq!(opts.get(OptionKey::FollowLocation), Some(&OptionValue::Bool(true)));
        assert_eq!(opts.get(OptionKey::MaxRedirects), Some(&OptionValue::Long(3)));
    }

    #[test]
    fn with_options_does_not_override_existing_keys() {
        let incoming: TransportOptions = [
            (OptionKey::Timeout, OptionValue::Duration(Duration::from_secs(99))),
            (OptionKey::UserAgent, OptionValue::Text("merged".to_string())),
        ]
        .into_iter()
        .collect();
        let opts = Request::builder().with_options(incoming).build().options();
        assert_eq!(
            opts.get(OptionKey::Timeout),
            Some(&OptionValue::Duration(Duration::from_secs(10)))
        );
        assert_eq!(
            opts.get(OptionKey::UserAgent).and_then(OptionValue::as_text),
            Some("merged")
        );
    }

    #[test]
    fn with_option_overrides() {
        let opts = Request::builder()
            .with_option(OptionKey::Timeout, OptionValue::Duration(Duration::from_secs(1)))
            .build()
            .options();
        assert_eq!(
            opts.get(OptionKey::Timeout),
            Some(&OptionValue::Duration(Duration::from_secs(1)))
        );
    }

    #[test]
    fn auth_helpers_set_matching_scheme() {
        let cases: [(fn(RequestBuilder) -> RequestBuilder, AuthScheme); 5] = [
            (|b| b.with_auth_basic("u", "p"), AuthScheme::Basic),
            (|b| b.with_auth_digest("u", "p"), AuthScheme::Digest),
            (|b| b.with_auth_ntlm("u", "p"), AuthScheme::Ntlm),
            (|b| b.with_auth_any("u", "p"), AuthScheme::Any),
            (|b| b.with_auth_any_safe("u", "p"), AuthScheme::AnySafe),
        ];
        for (apply, scheme) in cases {
            let opts = apply(Request::builder()).build().options();
            assert_eq!(opts.get(OptionKey::HttpAuth), Some(&OptionValue::Auth(scheme)));
            assert_eq!(
                opts.get(OptionKey::UserPwd).and_then(OptionValue::as_text),
                Some("u:p")
            );
        }
    }

    #[test]
    fn cookie_file_sets_jar_and_file() {
        let opts = Request::builder()
            .with_cookie_file("/tmp/cookies.txt")
            .build()
            .options();
        assert_eq!(
            opts.get(OptionKey::CookieJar).and_then(OptionValue::as_text),
            Some("/tmp/cookies.txt")
        );
        assert_eq!(
            opts.get(OptionKey::CookieFile).and_then(OptionValue::as_text),
            Some("/tmp/cookies.txt")
        );
    }

    #[test]
    fn headers_are_exposed_on_the_request() {
        let req = Request::builder()
            .with_headers(["Accept: application/json", "X-Trace: 1"])
            .build();
        assert_eq!(req.headers(), ["Accept: application/json", "X-Trace: 1"]);
        assert!(Request::builder().build().headers().is_empty());
    }

    #[test]
    fn built_request_is_a_snapshot() {
        let builder = Request::builder().with_url("http://h/a");
        let req = builder.clone().build();
        let _later = builder.with_url("http://h/b").build();
        assert_eq!(req.effective_url(), "http://h/a");
    }
}
