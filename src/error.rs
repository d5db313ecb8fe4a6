/// Error type returned by this crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HanCloudsError {
    /// Caller misuse detected before any network I/O: missing credentials,
    /// missing secret key or a malformed request.
    #[error("client error: {0}")]
    Client(String),
    /// Transport failure talking to the gateway, including exhausted
    /// connect retries and failures while reading the response.
    #[error("server error: {0}")]
    Server(String),
    /// Internal failure while materializing the response.
    #[error("system error: {0}")]
    System(String),
}

impl HanCloudsError {
    /// Returns `true` for errors raised before the request left the client.
    pub fn is_client(&self) -> bool {
        matches!(self, Self::Client(_))
    }

    /// Returns `true` for transport and gateway connectivity errors.
    pub fn is_server(&self) -> bool {
        matches!(self, Self::Server(_))
    }
}
