use std::fmt;

use crate::{ApiRequest, HanCloudsError, Result};

pub const HEADER_USER_KEY: &str = "HC-USER-KEY";
pub const HEADER_USER_AUTH_KEY: &str = "HC-USER-AUTH-KEY";
pub const HEADER_PROJECT_KEY: &str = "HC-PROJECT-KEY";
pub const HEADER_PROJECT_AUTH_KEY: &str = "HC-PROJECT-AUTH-KEY";
pub const HEADER_PRODUCT_KEY: &str = "HC-PRODUCT-KEY";
pub const HEADER_PRODUCT_SERVICE_KEY: &str = "HC-PRODUCT-SERVICE-KEY";
pub const HEADER_DEVICE_KEY: &str = "HC-DEVICE-KEY";

/// Credential set used to authenticate a request, in priority order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Tier {
    User,
    Project,
    Product,
    Device,
}

/// Credential state held by the client.
///
/// Several tiers may be stored at once; [`Credentials::attach_headers`]
/// picks the first complete one in [`Tier`] order. The secret key belongs to
/// whichever tier was set last.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    user_key: Option<String>,
    user_auth_key: Option<String>,
    project_key: Option<String>,
    project_auth_key: Option<String>,
    product_key: Option<String>,
    product_service_key: Option<String>,
    device_key: Option<String>,
    secret_key: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_key", &self.user_key)
            .field("project_key", &self.project_key)
            .field("product_key", &self.product_key)
            .field("device_key", &self.device_key)
            .field("auth_keys", &"<redacted>")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credentials {
    /// Stores the user tier. Ignored if any argument is empty.
    pub fn set_user_auth(&mut self, user_key: &str, auth_key: &str, secret_key: &str) {
        if !all_present(&[user_key, auth_key, secret_key]) {
            ignored(Tier::User);
            return;
        }
        self.user_key = Some(user_key.to_owned());
        self.user_auth_key = Some(auth_key.to_owned());
        self.secret_key = Some(secret_key.to_owned());
    }

    /// Stores the project tier. Ignored if any argument is empty.
    pub fn set_project_auth(&mut self, project_key: &str, auth_key: &str, secret_key: &str) {
        if !all_present(&[project_key, auth_key, secret_key]) {
            ignored(Tier::Project);
            return;
        }
        self.project_key = Some(project_key.to_owned());
        self.project_auth_key = Some(auth_key.to_owned());
        self.secret_key = Some(secret_key.to_owned());
    }

    /// Stores the product tier. Ignored if any argument is empty.
    ///
    /// The product key is also forwarded alongside project credentials.
    pub fn set_product_auth(&mut self, product_key: &str, service_key: &str, secret_key: &str) {
        if !all_present(&[product_key, service_key, secret_key]) {
            ignored(Tier::Product);
            return;
        }
        self.product_key = Some(product_key.to_owned());
        self.product_service_key = Some(service_key.to_owned());
        self.secret_key = Some(secret_key.to_owned());
    }

    /// Stores the device tier; the device token doubles as the secret key.
    /// Ignored if any argument is empty.
    pub fn set_device_auth(&mut self, device_key: &str, device_token: &str) {
        if !all_present(&[device_key, device_token]) {
            ignored(Tier::Device);
            return;
        }
        self.device_key = Some(device_key.to_owned());
        self.secret_key = Some(device_token.to_owned());
    }

    pub fn secret_key(&self) -> Option<&str> {
        non_empty(&self.secret_key)
    }

    /// Puts the headers of the highest-priority complete tier on `request`.
    pub fn attach_headers<R: ApiRequest + ?Sized>(&self, request: &mut R) -> Result<Tier> {
        if let (Some(user_key), Some(auth_key)) =
            (non_empty(&self.user_key), non_empty(&self.user_auth_key))
        {
            request.put_header(HEADER_USER_KEY, user_key);
            request.put_header(HEADER_USER_AUTH_KEY, auth_key);
            return Ok(Tier::User);
        }

        if let (Some(project_key), Some(auth_key)) =
            (non_empty(&self.project_key), non_empty(&self.project_auth_key))
        {
            request.put_header(HEADER_PROJECT_KEY, project_key);
            request.put_header(HEADER_PROJECT_AUTH_KEY, auth_key);
            if let Some(product_key) = non_empty(&self.product_key) {
                request.put_header(HEADER_PRODUCT_KEY, product_key);
            }
            return Ok(Tier::Project);
        }

        if let (Some(product_key), Some(service_key)) =
            (non_empty(&self.product_key), non_empty(&self.product_service_key))
        {
            request.put_header(HEADER_PRODUCT_KEY, product_key);
            request.put_header(HEADER_PRODUCT_SERVICE_KEY, service_key);
            return Ok(Tier::Product);
        }

        if let Some(device_key) = non_empty(&self.device_key) {
            request.put_header(HEADER_DEVICE_KEY, device_key);
            return Ok(Tier::Device);
        }

        Err(HanCloudsError::Client(
            "no key or auth key or secret key for request".to_owned(),
        ))
    }
}

fn all_present(values: &[&str]) -> bool {
    values.iter().all(|value| !value.is_empty())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

fn ignored(tier: Tier) {
    #[cfg(feature = "tracing")]
    tracing::warn!(?tier, "ignoring credentials with an empty value");

    #[cfg(not(feature = "tracing"))]
    let _ = tier;
}
