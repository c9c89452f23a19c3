use std::env;
use std::fmt;

use crate::{options::ClientOptions, retry::RetryStrategy};

pub(crate) const REGION_ENV: &str = "AWS_REGION";
pub(crate) const ACCESS_KEY_ID_ENV: &str = "AWS_ACCESS_KEY_ID";
pub(crate) const SECRET_ACCESS_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";
pub(crate) const SESSION_TOKEN_ENV: &str = "AWS_SESSION_TOKEN";

/// Static signing credentials.
#[derive(Clone, Eq, PartialEq)]
pub struct Credentials {
    /// Access key id; appears in the `Authorization` credential scope.
    pub access_key_id: String,
    /// Secret key used to derive the signing key.
    pub secret_access_key: String,
    /// Session token for temporary credentials.
    pub session_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl Credentials {
    /// Creates credentials from an access key pair.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    /// Attaches a session token for temporary credentials.
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Reads credentials from the environment.
    ///
    /// Reads `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and the optional
    /// `AWS_SESSION_TOKEN`. Returns `None` unless both key variables are set
    /// and non-empty; without credentials the transport sends unsigned
    /// requests and authentication is left to the endpoint.
    pub fn from_env() -> Option<Self> {
        let access_key_id = non_empty_var(ACCESS_KEY_ID_ENV)?;
        let secret_access_key = non_empty_var(SECRET_ACCESS_KEY_ENV)?;
        Some(Self {
            access_key_id,
            secret_access_key,
            session_token: non_empty_var(SESSION_TOKEN_ENV),
        })
    }
}

/// Resolved configuration handed to
/// [`FromClientConfig::from_config`](crate::FromClientConfig::from_config).
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Target region, already resolved against the environment.
    pub region: Option<String>,
    /// Endpoint override for non-standard or local endpoints.
    pub endpoint_url: Option<String>,
    /// Signing credentials; `None` sends unsigned requests.
    pub credentials: Option<Credentials>,
    /// Retry policy installed on every client built from this config.
    pub retry: RetryStrategy,
}

impl ClientConfig {
    /// Resolves options against the process environment.
    pub fn from_options(options: ClientOptions) -> Self {
        let region = options.region.or_else(|| non_empty_var(REGION_ENV));
        let retry = RetryStrategy::standard().with_retriable_errors(options.retriable_errors);
        Self {
            region,
            endpoint_url: options.endpoint_url,
            credentials: Credentials::from_env(),
            retry,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    let value = env::var(name).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}
