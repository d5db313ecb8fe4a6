use std::{fmt, future::Future};

use crate::RawResponse;

/// Failure class of a connect or read attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConnectErrorKind {
    /// The transport gave up waiting on the gateway.
    Timeout,
    /// Any other I/O failure (refused, reset, DNS, TLS...).
    Io,
}

/// Transport error raised by a [`Connection`].
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ConnectError {
    pub kind: ConnectErrorKind,
    pub message: String,
}

impl ConnectError {
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: ConnectErrorKind::Timeout,
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self {
            kind: ConnectErrorKind::Io,
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ConnectErrorKind::Timeout
    }
}

impl fmt::Display for ConnectErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("timeout"),
            Self::Io => f.write_str("io"),
        }
    }
}

impl From<reqwest::Error> for ConnectError {
    fn from(err: reqwest::Error) -> Self {
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }

        if err.is_timeout() {
            Self::timeout(message)
        } else {
            Self::io(message)
        }
    }
}

/// A connection handle opened by a request for one gateway call.
///
/// `connect` may be called several times when the client retries. The client
/// calls `disconnect` exactly once after a successful connect, whether or not
/// reading the response succeeded.
pub trait Connection: Send {
    fn connect(&mut self) -> impl Future<Output = Result<(), ConnectError>> + Send;

    /// Reads the raw response. `Ok(None)` means the transport produced nothing.
    fn read_response(
        &mut self,
    ) -> impl Future<Output = Result<Option<RawResponse>, ConnectError>> + Send;

    fn disconnect(&mut self);
}

/// [`Connection`] backed by `reqwest`.
///
/// Connecting sends the prepared request and keeps the response head; the
/// body is read by [`Connection::read_response`]. Only failures to establish
/// the TCP/TLS connection are reported by `connect`. Once the request may have
/// reached the gateway, any failure is held back and returned by
/// `read_response` so the call is never sent twice.
pub struct HttpConnection {
    http: reqwest::Client,
    request: reqwest::Request,
    response: Option<reqwest::Response>,
    send_error: Option<ConnectError>,
}

impl fmt::Debug for HttpConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpConnection")
            .field("method", self.request.method())
            .field("url", &self.request.url().path())
            .field("connected", &self.response.is_some())
            .field("send_error", &self.send_error)
            .finish()
    }
}

impl HttpConnection {
    pub fn new(http: reqwest::Client, request: reqwest::Request) -> Self {
        Self {
            http,
            request,
            response: None,
            send_error: None,
        }
    }
}

impl Connection for HttpConnection {
    async fn connect(&mut self) -> Result<(), ConnectError> {
        let request = self
            .request
            .try_clone()
            .ok_or_else(|| ConnectError::io("request body cannot be replayed"))?;
        match self.http.execute(request).await {
            Ok(response) => {
                self.response = Some(response);
                Ok(())
            }
            Err(err) if err.is_connect() => Err(err.into()),
            Err(err) => {
                self.send_error = Some(err.into());
                Ok(())
            }
        }
    }

    async fn read_response(&mut self) -> Result<Option<RawResponse>, ConnectError> {
        if let Some(err) = self.send_error.take() {
            return Err(err);
        }
        let Some(response) = self.response.take() else {
            return Ok(None);
        };

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_owned(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await?;

        Ok(Some(RawResponse::new(status, headers, body.to_vec())))
    }

    fn disconnect(&mut self) {
        self.response = None;
        self.send_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::{ConnectError, ConnectErrorKind};

    #[test]
    fn display_includes_kind_and_message() {
        let err = ConnectError::timeout("read timed out");
        assert_eq!(err.to_string(), "timeout: read timed out");
        assert!(err.is_timeout());
        assert_eq!(ConnectError::io("refused").kind, ConnectErrorKind::Io);
    }
}
