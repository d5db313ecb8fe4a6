use serde::{de::DeserializeOwned, Deserialize};

/// Error returned by [`ApiResponse::from_raw`] when the body cannot be decoded.
pub type ParseError = Box<dyn std::error::Error + Send + Sync>;

/// Unparsed status, headers and body captured from the transport.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Whether the status is in the `2xx` range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Looks up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Body as UTF-8 text, with invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A typed gateway response built from a [`RawResponse`].
///
/// Implementors decode the raw body into their payload. Any error returned
/// here is reported by the client as [`HanCloudsError::System`].
///
/// [`HanCloudsError::System`]: crate::HanCloudsError::System
pub trait ApiResponse: Sized {
    fn from_raw(raw: RawResponse) -> Result<Self, ParseError>;
}

impl ApiResponse for RawResponse {
    fn from_raw(raw: RawResponse) -> Result<Self, ParseError> {
        Ok(raw)
    }
}

/// JSON response decoded into `T` on success.
///
/// `data` is `None` when the gateway returned an empty body or a non-`2xx`
/// status; inspect [`JsonResponse::raw`] in that case.
#[derive(Clone, Debug)]
pub struct JsonResponse<T> {
    raw: RawResponse,
    data: Option<T>,
}

impl<T> JsonResponse<T> {
    pub fn raw(&self) -> &RawResponse {
        &self.raw
    }

    pub fn status(&self) -> u16 {
        self.raw.status
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }
}

impl<T: DeserializeOwned> ApiResponse for JsonResponse<T> {
    fn from_raw(raw: RawResponse) -> Result<Self, ParseError> {
        if raw.body.is_empty() || !raw.is_success() {
            return Ok(Self { raw, data: None });
        }

        let data = serde_json::from_slice::<T>(&raw.body).map_err(|err| {
            format!("invalid response JSON: {err}; body: {}", raw.text())
        })?;
        Ok(Self {
            raw,
            data: Some(data),
        })
    }
}

/// Paging envelope returned by list endpoints.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default)]
    pub page_no: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> Page<T> {
    /// Whether the gateway holds pages after this one.
    pub fn has_next(&self) -> bool {
        let seen = u64::from(self.page_no.max(1)) * u64::from(self.page_size);
        self.page_size > 0 && seen < self.total_count
    }
}
