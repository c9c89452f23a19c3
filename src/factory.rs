use crate::{config::ClientConfig, options::ClientOptions, Result};

/// Constructs a service client from a resolved [`ClientConfig`].
///
/// Implemented by concrete clients so [`use_client`] can build any of them
/// with the shared retry policy installed.
pub trait FromClientConfig: Sized {
    /// Builds the client. Construction failures propagate to the caller.
    fn from_config(config: ClientConfig) -> Result<Self>;
}

/// Builds a configured client with the shared retry policy.
///
/// The region comes from the options or falls back to `AWS_REGION`.
/// Credentials are read from `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` /
/// `AWS_SESSION_TOKEN` when present; otherwise requests go out unsigned and
/// authentication is left to the endpoint.
///
/// # Example
///
/// ```no_run
/// use cloudapi_http::{
///     use_client, ClientConfig, ClientOptions, CloudApiClient, FromClientConfig, Result,
/// };
///
/// struct QueueClient {
///     api: CloudApiClient,
/// }
///
/// impl FromClientConfig for QueueClient {
///     fn from_config(config: ClientConfig) -> Result<Self> {
///         Ok(Self {
///             api: CloudApiClient::new("sqs", config)?,
///         })
///     }
/// }
///
/// # async fn run() -> Result<()> {
/// let queues: QueueClient =
///     use_client(ClientOptions::default().with_region("us-east-1")).await?;
/// # Ok(())
/// # }
/// ```
pub async fn use_client<C: FromClientConfig>(options: ClientOptions) -> Result<C> {
    C::from_config(ClientConfig::from_options(options))
}
