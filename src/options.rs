/// Configures connect retry and transport timeout behavior.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Number of delayed connect attempts after the initial one fails.
    pub retry_count: u32,
    /// Delay in milliseconds before each retry attempt. `0` disables retry.
    pub retry_interval_ms: u64,
    /// Per-request transport timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            retry_count: 0,
            retry_interval_ms: 5_000,
            timeout_ms: 10_000,
        }
    }
}
