//! `hanclouds-sdk` is an async client for the HanClouds IoT platform REST
//! gateway.
//!
//! [`HanCloudsClient::execute`] runs every call through the same pipeline:
//! - attach the headers of the configured credential tier
//! - validate and sign the request
//! - connect, retrying on a fixed interval when configured
//! - decode the raw response into the request's declared response type

mod client;
mod connection;
mod credentials;
mod error;
mod options;
mod request;
mod response;
mod scheduler;

pub use client::HanCloudsClient;
pub use connection::{ConnectError, ConnectErrorKind, Connection, HttpConnection};
pub use credentials::{
    Credentials, Tier, HEADER_DEVICE_KEY, HEADER_PRODUCT_KEY, HEADER_PRODUCT_SERVICE_KEY,
    HEADER_PROJECT_AUTH_KEY, HEADER_PROJECT_KEY, HEADER_USER_AUTH_KEY, HEADER_USER_KEY,
};
pub use error::HanCloudsError;
pub use options::ClientOptions;
pub use request::{
    canonical_query, sign_query, ApiRequest, Gateway, HttpRequest, SIGNATURE_PARAM,
    TIMESTAMP_PARAM,
};
pub use response::{ApiResponse, JsonResponse, Page, ParseError, RawResponse};
pub use scheduler::{ScheduleError, Scheduler, TokioScheduler};

pub type Result<T> = std::result::Result<T, HanCloudsError>;
