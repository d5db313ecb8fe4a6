use std::{fmt, sync::Arc, time::Duration};

use crate::{
    ApiRequest, ApiResponse, ClientOptions, ConnectError, ConnectErrorKind, Connection,
    Credentials, Gateway, HanCloudsError, Result, ScheduleError, Scheduler, TokioScheduler,
};

/// Client for the HanClouds REST gateway.
///
/// Credentials and retry settings are changed through `&mut self` setters, so
/// they cannot be mutated while an [`execute`](Self::execute) call borrows the
/// client. Clone the client to share it between tasks.
pub struct HanCloudsClient<S = TokioScheduler> {
    http: reqwest::Client,
    gateway_url: String,
    credentials: Credentials,
    options: ClientOptions,
    scheduler: Arc<S>,
}

impl<S> Clone for HanCloudsClient<S> {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            gateway_url: self.gateway_url.clone(),
            credentials: self.credentials.clone(),
            options: self.options.clone(),
            scheduler: Arc::clone(&self.scheduler),
        }
    }
}

impl<S> fmt::Debug for HanCloudsClient<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HanCloudsClient")
            .field("gateway_url", &self.gateway_url)
            .field("credentials", &self.credentials)
            .field("options", &self.options)
            .finish()
    }
}

impl HanCloudsClient<TokioScheduler> {
    /// Creates a client for a gateway prefix such as
    /// `http://api.hanclouds.com/api/v1`.
    ///
    /// Retries are scheduled on the ambient tokio runtime.
    pub fn new(gateway_url: impl Into<String>) -> Self {
        Self::with_scheduler(gateway_url, TokioScheduler)
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `HANCLOUDS_GATEWAY_URL`: gateway prefix (required)
    /// - `HANCLOUDS_RETRY_COUNT`: delayed connect attempts (optional)
    /// - `HANCLOUDS_RETRY_INTERVAL_MS`: delay between attempts (optional)
    ///
    /// # Example
    ///
    /// ```no_run
    /// use hanclouds_sdk::HanCloudsClient;
    ///
    /// let client = HanCloudsClient::from_env().expect("missing HANCLOUDS_GATEWAY_URL");
    /// ```
    pub fn from_env() -> std::result::Result<Self, String> {
        let url = std::env::var("HANCLOUDS_GATEWAY_URL")
            .map_err(|_| "missing HANCLOUDS_GATEWAY_URL environment variable".to_owned())?;
        if url.trim().is_empty() {
            return Err("HANCLOUDS_GATEWAY_URL is set but empty".to_owned());
        }

        let mut options = ClientOptions::default();
        if let Some(count) = env_number("HANCLOUDS_RETRY_COUNT")? {
            options.retry_count = count;
        }
        if let Some(interval) = env_number("HANCLOUDS_RETRY_INTERVAL_MS")? {
            options.retry_interval_ms = interval;
        }

        Ok(Self::new(url.trim()).with_options(options))
    }
}

impl<S: Scheduler> HanCloudsClient<S> {
    /// Creates a client that runs connect retries through `scheduler`.
    pub fn with_scheduler(gateway_url: impl Into<String>, scheduler: S) -> Self {
        let options = ClientOptions::default();
        Self {
            http: http_client(&options),
            gateway_url: gateway_url.into(),
            credentials: Credentials::default(),
            options,
            scheduler: Arc::new(scheduler),
        }
    }

    /// Applies retry and timeout options.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        if opts.timeout_ms != self.options.timeout_ms {
            self.http = http_client(&opts);
        }
        self.options = opts;
        self
    }

    pub fn gateway_url(&self) -> &str {
        &self.gateway_url
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn set_retry_count(&mut self, retry_count: u32) {
        self.options.retry_count = retry_count;
    }

    pub fn set_retry_interval(&mut self, retry_interval_ms: u64) {
        self.options.retry_interval_ms = retry_interval_ms;
    }

    /// See [`Credentials::set_user_auth`].
    pub fn set_user_auth(&mut self, user_key: &str, auth_key: &str, secret_key: &str) {
        self.credentials.set_user_auth(user_key, auth_key, secret_key);
    }

    /// See [`Credentials::set_project_auth`].
    pub fn set_project_auth(&mut self, project_key: &str, auth_key: &str, secret_key: &str) {
        self.credentials
            .set_project_auth(project_key, auth_key, secret_key);
    }

    /// See [`Credentials::set_product_auth`].
    pub fn set_product_auth(&mut self, product_key: &str, service_key: &str, secret_key: &str) {
        self.credentials
            .set_product_auth(product_key, service_key, secret_key);
    }

    /// See [`Credentials::set_device_auth`].
    pub fn set_device_auth(&mut self, device_key: &str, device_token: &str) {
        self.credentials.set_device_auth(device_key, device_token);
    }

    /// Authenticates, signs and sends `request`, then decodes its response.
    ///
    /// Fails with [`HanCloudsError::Client`] before any I/O when no credential
    /// tier is configured or the request is malformed, with
    /// [`HanCloudsError::Server`] when the gateway cannot be reached after the
    /// configured retries or the exchange fails once the request was sent, and with [`HanCloudsError::System`] when the
    /// response cannot be materialized.
    pub async fn execute<R: ApiRequest>(&self, mut request: R) -> Result<R::Response> {
        let tier = self.credentials.attach_headers(&mut request)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(?tier, gateway = %self.gateway_url, "executing gateway request");
        #[cfg(not(feature = "tracing"))]
        let _ = tier;

        request.validate()?;

        let secret_key = self
            .credentials
            .secret_key()
            .ok_or_else(|| HanCloudsError::Client("no secretKey for request".to_owned()))?;
        request.sign_and_attach_query_params(secret_key)?;

        let gateway = Gateway {
            base_url: &self.gateway_url,
            http: &self.http,
            timeout: Duration::from_millis(self.options.timeout_ms),
        };
        let connection = request.open_connection(&gateway)?;
        let mut connection = self.connect_with_retry(connection).await?;

        let raw = connection.read_response().await;
        connection.disconnect();

        let raw = raw
            .map_err(|err| HanCloudsError::Server(err.message))?
            .ok_or_else(|| HanCloudsError::System("system error".to_owned()))?;

        <R::Response as ApiResponse>::from_raw(raw)
            .map_err(|err| HanCloudsError::System(err.to_string()))
    }

    async fn connect_with_retry<C: Connection + 'static>(&self, mut connection: C) -> Result<C> {
        let mut failures = ConnectFailures::default();

        match connection.connect().await {
            Ok(()) => return Ok(connection),
            Err(err) => failures.record(err),
        }

        let retry_count = self.options.retry_count;
        let retry_interval_ms = self.options.retry_interval_ms;

        if retry_count > 0 && retry_interval_ms > 0 {
            let delay = Duration::from_millis(retry_interval_ms);

            for attempt in 1..=retry_count {
                #[cfg(feature = "tracing")]
                tracing::info!(attempt, delay_ms = retry_interval_ms, "http request is retrying");
                #[cfg(not(feature = "tracing"))]
                let _ = attempt;

                let task = async move {
                    let outcome = connection.connect().await;
                    (connection, outcome)
                };
                let (returned, outcome) = self
                    .scheduler
                    .schedule(delay, task)
                    .await
                    .map_err(|err| match err {
                        ScheduleError::Interrupted(message) => HanCloudsError::Server(format!(
                            "http request interrupted while retrying: {message}"
                        )),
                        ScheduleError::Execution(message) => HanCloudsError::Server(format!(
                            "http request retry failed to execute: {message}"
                        )),
                    })?;
                connection = returned;

                match outcome {
                    Ok(()) => return Ok(connection),
                    Err(err) => failures.record(err),
                }
            }
        }

        Err(failures.into_error(&self.gateway_url))
    }
}

/// Latest failure message seen per class while connecting.
#[derive(Debug, Default)]
struct ConnectFailures {
    timeout: Option<String>,
    io: Option<String>,
}

impl ConnectFailures {
    fn record(&mut self, err: ConnectError) {
        #[cfg(feature = "tracing")]
        tracing::debug!(kind = %err.kind, message = %err.message, "gateway connect failed");

        match err.kind {
            ConnectErrorKind::Timeout => self.timeout = Some(err.message),
            ConnectErrorKind::Io => self.io = Some(err.message),
        }
    }

    fn into_error(self, gateway_url: &str) -> HanCloudsError {
        match (self.timeout, self.io) {
            (Some(message), _) => HanCloudsError::Server(format!(
                "rest gateway {gateway_url} connection timed out: {message}"
            )),
            (None, message) => HanCloudsError::Server(format!(
                "rest gateway {gateway_url} io error: {}",
                message.unwrap_or_default()
            )),
        }
    }
}

/// Bounds connection establishment by `timeout_ms`. The whole exchange is
/// bounded separately per request.
fn http_client(options: &ClientOptions) -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_millis(options.timeout_ms))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

fn env_number<T: std::str::FromStr>(name: &str) -> std::result::Result<Option<T>, String>
where
    T::Err: fmt::Display,
{
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|err| format!("{name} is not a valid number: {err}")),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::{ConnectFailures, HanCloudsClient};
    use crate::{ConnectError, HanCloudsError};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ENV_VARS: [&str; 3] = [
        "HANCLOUDS_GATEWAY_URL",
        "HANCLOUDS_RETRY_COUNT",
        "HANCLOUDS_RETRY_INTERVAL_MS",
    ];

    fn with_env<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        for name in ENV_VARS {
            std::env::remove_var(name);
        }
        for (name, value) in vars {
            std::env::set_var(name, value);
        }
        let out = f();
        for name in ENV_VARS {
            std::env::remove_var(name);
        }
        out
    }

    #[test]
    fn timeout_classification_wins() {
        let mut failures = ConnectFailures::default();
        failures.record(ConnectError::timeout("connect timed out"));
        failures.record(ConnectError::io("connection reset"));

        match failures.into_error("http://gw/api/v1") {
            HanCloudsError::Server(message) => {
                assert!(message.contains("http://gw/api/v1"));
                assert!(message.contains("timed out"));
                assert!(message.contains("connect timed out"));
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[test]
    fn io_classification_keeps_latest_message() {
        let mut failures = ConnectFailures::default();
        failures.record(ConnectError::io("refused"));
        failures.record(ConnectError::io("reset"));

        let message = failures.into_error("http://gw").to_string();
        assert!(message.contains("io error: reset"));
    }

    #[test]
    fn setters_update_options() {
        let mut client = HanCloudsClient::new("http://gw/api/v1");
        client.set_retry_count(3);
        client.set_retry_interval(250);
        assert_eq!(client.options().retry_count, 3);
        assert_eq!(client.options().retry_interval_ms, 250);
        assert_eq!(client.options().timeout_ms, 10_000);
    }

    #[test]
    fn debug_redacts_credentials() {
        let mut client = HanCloudsClient::new("http://gw/api/v1");
        client.set_user_auth("user", "auth-key-value", "secret-token");
        let debug = format!("{client:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-token"));
        assert!(!debug.contains("auth-key-value"));
    }

    #[test]
    fn from_env_requires_gateway_url() {
        let err = with_env(&[], HanCloudsClient::from_env).expect_err("url is required");
        assert!(err.contains("missing HANCLOUDS_GATEWAY_URL"));
    }

    #[test]
    fn from_env_rejects_blank_gateway_url() {
        let err = with_env(&[("HANCLOUDS_GATEWAY_URL", "   ")], HanCloudsClient::from_env)
            .expect_err("blank url is rejected");
        assert_eq!(err, "HANCLOUDS_GATEWAY_URL is set but empty");
    }

    #[test]
    fn from_env_rejects_unparsable_retry_count() {
        let err = with_env(
            &[
                ("HANCLOUDS_GATEWAY_URL", "http://gw/api/v1"),
                ("HANCLOUDS_RETRY_COUNT", "three"),
            ],
            HanCloudsClient::from_env,
        )
        .expect_err("retry count must be numeric");
        assert!(err.starts_with("HANCLOUDS_RETRY_COUNT is not a valid number"));
    }

    #[test]
    fn from_env_applies_overrides() {
        let client = with_env(
            &[
                ("HANCLOUDS_GATEWAY_URL", " http://gw/api/v1 "),
                ("HANCLOUDS_RETRY_COUNT", "4"),
                ("HANCLOUDS_RETRY_INTERVAL_MS", " 1500 "),
            ],
            HanCloudsClient::from_env,
        )
        .expect("env config must load");

        assert_eq!(client.gateway_url(), "http://gw/api/v1");
        assert_eq!(client.options().retry_count, 4);
        assert_eq!(client.options().retry_interval_ms, 1500);
        assert_eq!(client.options().timeout_ms, 10_000);
    }

    #[test]
    fn from_env_keeps_defaults_without_overrides() {
        let client = with_env(
            &[
                ("HANCLOUDS_GATEWAY_URL", "http://gw/api/v1"),
                ("HANCLOUDS_RETRY_INTERVAL_MS", ""),
            ],
            HanCloudsClient::from_env,
        )
        .expect("env config must load");

        assert_eq!(client.options().retry_count, 0);
        assert_eq!(client.options().retry_interval_ms, 5000);
    }
}
