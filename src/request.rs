use std::{
    collections::BTreeMap,
    fmt,
    marker::PhantomData,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use hmac::{Hmac, Mac};
use reqwest::{
    header::{HeaderName, HeaderValue, CONTENT_TYPE},
    Method,
};
use serde::Serialize;
use sha2::Sha256;

use crate::{ApiResponse, Connection, HanCloudsError, HttpConnection, JsonResponse, Result};

type HmacSha256 = Hmac<Sha256>;

/// Query parameter carrying the request signature.
pub const SIGNATURE_PARAM: &str = "signature";
/// Query parameter carrying the signing time in Unix milliseconds.
pub const TIMESTAMP_PARAM: &str = "timestamp";

/// Transport context handed to [`ApiRequest::open_connection`].
#[derive(Clone, Copy, Debug)]
pub struct Gateway<'a> {
    /// Gateway prefix, e.g. `http://api.hanclouds.com/api/v1`.
    pub base_url: &'a str,
    pub http: &'a reqwest::Client,
    pub timeout: Duration,
}

/// One outbound gateway call.
///
/// The client drives a request through `put_header` (credentials),
/// `validate`, `sign_and_attach_query_params` and finally
/// `open_connection`. The decoded result type is [`ApiRequest::Response`].
pub trait ApiRequest {
    type Response: ApiResponse;
    type Connection: Connection + 'static;

    fn put_header(&mut self, name: &str, value: &str);

    /// Rejects malformed caller input with [`HanCloudsError::Client`].
    fn validate(&self) -> Result<()>;

    fn sign_and_attach_query_params(&mut self, secret_key: &str) -> Result<()>;

    fn open_connection(&self, gateway: &Gateway<'_>) -> Result<Self::Connection>;
}

/// Generic gateway request sent over `reqwest`.
///
/// `R` is the response type the call decodes into, by default
/// [`JsonResponse<serde_json::Value>`].
pub struct HttpRequest<R = JsonResponse<serde_json::Value>> {
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    query: BTreeMap<String, String>,
    body: Option<Vec<u8>>,
    response: PhantomData<fn() -> R>,
}

impl<R> fmt::Debug for HttpRequest<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("headers", &self.headers)
            .field("query", &self.query)
            .field("body_len", &self.body.as_ref().map(Vec::len))
            .finish()
    }
}

impl<R> HttpRequest<R> {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            query: BTreeMap::new(),
            body: None,
            response: PhantomData,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Adds a query parameter, replacing any previous value for `name`.
    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.insert(name.into(), value.to_string());
        self
    }

    /// Sets a JSON request body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        let bytes = serde_json::to_vec(body)
            .map_err(|err| HanCloudsError::Client(format!("invalid request body: {err}")))?;
        self.body = Some(bytes);
        Ok(self)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn query_params(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    fn url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.path)
    }
}

impl<R: ApiResponse> ApiRequest for HttpRequest<R> {
    type Response = R;
    type Connection = HttpConnection;

    fn put_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => *existing = value.to_owned(),
            None => self.headers.push((name.to_owned(), value.to_owned())),
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.path.starts_with('/') {
            return Err(HanCloudsError::Client(format!(
                "request path '{}' must start with '/'",
                self.path
            )));
        }

        for (name, value) in &self.headers {
            HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
                HanCloudsError::Client(format!("invalid header name '{name}': {err}"))
            })?;
            HeaderValue::from_str(value).map_err(|err| {
                HanCloudsError::Client(format!("invalid value for header '{name}': {err}"))
            })?;
        }

        if self.query.keys().any(|name| name.is_empty()) {
            return Err(HanCloudsError::Client(
                "query parameter name cannot be empty".to_owned(),
            ));
        }

        Ok(())
    }

    fn sign_and_attach_query_params(&mut self, secret_key: &str) -> Result<()> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|err| HanCloudsError::Client(format!("system clock error: {err}")))?
            .as_millis();
        self.query.remove(SIGNATURE_PARAM);
        self.query
            .insert(TIMESTAMP_PARAM.to_owned(), timestamp.to_string());

        let signature = sign_query(&self.query, secret_key)?;
        self.query.insert(SIGNATURE_PARAM.to_owned(), signature);
        Ok(())
    }

    fn open_connection(&self, gateway: &Gateway<'_>) -> Result<HttpConnection> {
        let mut builder = gateway
            .http
            .request(self.method.clone(), self.url(gateway.base_url))
            .timeout(gateway.timeout)
            .query(&self.query);

        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &self.body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone());
        }

        let request = builder.build().map_err(|err| {
            HanCloudsError::Client(format!("request get http connection error: {err}"))
        })?;
        Ok(HttpConnection::new(gateway.http.clone(), request))
    }
}

/// Canonical form signed by [`sign_query`]: every parameter except the
/// signature, sorted by name, joined as `name=value` with `&`.
pub fn canonical_query(query: &BTreeMap<String, String>) -> String {
    query
        .iter()
        .filter(|(name, _)| name.as_str() != SIGNATURE_PARAM)
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Lowercase hex HMAC-SHA256 of [`canonical_query`] keyed with `secret_key`.
pub fn sign_query(query: &BTreeMap<String, String>, secret_key: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .map_err(|err| HanCloudsError::Client(format!("failed to create HMAC: {err}")))?;
    mac.update(canonical_query(query).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}
