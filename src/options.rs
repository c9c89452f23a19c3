/// Options accepted by [`use_client`](crate::use_client).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ClientOptions {
    /// Region override; falls back to `AWS_REGION` when unset.
    pub region: Option<String>,
    /// Error names retried in addition to the built-in transient set.
    pub retriable_errors: Vec<String>,
    /// Endpoint override; skips `https://{service}.{region}.amazonaws.com`.
    pub endpoint_url: Option<String>,
}

impl ClientOptions {
    /// Sets the region override.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Adds error names the retry decider should treat as transient.
    pub fn with_retriable_errors<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.retriable_errors
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Sets the endpoint override.
    pub fn with_endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = Some(url.into());
        self
    }
}
