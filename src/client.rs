use std::fmt;

use chrono::Utc;
use reqwest::{header, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tokio::time::sleep;

use crate::{
    config::{ClientConfig, Credentials},
    retry::RetryStrategy,
    sign,
    wire::ErrorBody,
    CloudApiError, Result,
};

const TARGET_HEADER: &str = "x-amz-target";
const ERROR_TYPE_HEADER: &str = "x-amzn-errortype";
const CONTENT_TYPE_AMZ_JSON: &str = "application/x-amz-json-1.1";

/// Formats a service id and region into the canonical endpoint URL.
///
/// Example: `("sqs", "us-east-1")` → `"https://sqs.us-east-1.amazonaws.com"`
pub fn service_endpoint(service: &str, region: &str) -> String {
    format!("https://{}.{}.amazonaws.com", service.trim(), region.trim())
}

#[derive(Clone)]
/// AWS-JSON HTTP transport shared by service clients.
///
/// Owns the request/retry loop; retry decisions and delays come from the
/// installed [`RetryStrategy`].
pub struct CloudApiClient {
    http: reqwest::Client,
    endpoint_url: String,
    host: String,
    path: String,
    service: String,
    region: String,
    credentials: Option<Credentials>,
    retry: RetryStrategy,
}

impl fmt::Debug for CloudApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudApiClient")
            .field("endpoint_url", &self.endpoint_url)
            .field("service", &self.service)
            .field("region", &self.region)
            .field("credentials", &self.credentials)
            .field("retry", &self.retry)
            .finish()
    }
}

impl CloudApiClient {
    /// Creates a transport for `service` from a resolved configuration.
    ///
    /// The endpoint is derived from the service id and region unless the
    /// configuration carries an endpoint override. Missing region is an
    /// error.
    pub fn new(service: impl Into<String>, config: ClientConfig) -> Result<Self> {
        let service = service.into();
        let region = config.region.ok_or(CloudApiError::MissingRegion)?;
        let endpoint_url = config
            .endpoint_url
            .unwrap_or_else(|| service_endpoint(&service, &region));

        let url = reqwest::Url::parse(&endpoint_url)
            .map_err(|err| CloudApiError::Config(format!("invalid endpoint url: {err}")))?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_owned(),
            (None, _) => {
                return Err(CloudApiError::Config(
                    "endpoint url has no host".to_owned(),
                ))
            }
        };
        let path = url.path().to_owned();

        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| CloudApiError::Config(err.to_string()))?;

        Ok(Self {
            http,
            endpoint_url,
            host,
            path,
            service,
            region,
            credentials: config.credentials,
            retry: config.retry,
        })
    }

    /// Endpoint URL requests are sent to.
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// Region the transport was configured with.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Sends one AWS-JSON operation and decodes the response.
    ///
    /// `target` is the operation id for the `X-Amz-Target` header, e.g.
    /// `"AmazonSQS.ListQueues"`. Transient failures are retried per the
    /// installed strategy; everything else surfaces to the caller.
    pub async fn post<T, R>(&self, target: &str, payload: &T) -> Result<R>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let body = serde_json::to_string(payload)
            .map_err(|err| CloudApiError::Decode(format!("invalid request payload: {err}")))?;
        let response = self.send_with_retry(target, &body).await?;
        serde_json::from_str::<R>(&response).map_err(|err| {
            CloudApiError::Decode(format!("invalid response JSON: {err}; body: {response}"))
        })
    }

    async fn send_with_retry(&self, target: &str, body: &str) -> Result<String> {
        let mut attempt = 0u32;
        loop {
            match self.send_once(target, body).await {
                Ok(text) => {
                    if attempt > 0 {
                        self.retry.quota().release_retry_tokens(attempt);
                    }
                    return Ok(text);
                }
                Err(err) => {
                    if !self.retry.should_retry(&err)
                        || attempt >= self.retry.max_attempts()
                        || !self.retry.quota().has_retry_tokens()
                    {
                        return Err(err);
                    }
                    let _tokens = self.retry.quota().retrieve_retry_tokens();
                    let delay = self.retry.backoff_delay(attempt);
                    tracing::debug!(
                        operation = target,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retrying request"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn send_once(&self, target: &str, body: &str) -> Result<String> {
        let mut request = self
            .http
            .post(&self.endpoint_url)
            .header(header::CONTENT_TYPE, CONTENT_TYPE_AMZ_JSON)
            .header(TARGET_HEADER, target)
            .body(body.to_owned());

        if let Some(credentials) = &self.credentials {
            let signed = sign::sign_request(&sign::SigningRequest {
                credentials,
                region: &self.region,
                service: &self.service,
                host: &self.host,
                path: &self.path,
                target,
                content_type: CONTENT_TYPE_AMZ_JSON,
                payload: body.as_bytes(),
                now: Utc::now(),
            });
            request = request
                .header(header::AUTHORIZATION, signed.authorization)
                .header(sign::AMZ_DATE_HEADER, signed.amz_date)
                .header(sign::CONTENT_SHA256_HEADER, signed.content_sha256);
            if let Some(token) = signed.security_token {
                request = request.header(sign::SECURITY_TOKEN_HEADER, token);
            }
        }

        let response = request.send().await.map_err(CloudApiError::Transport)?;
        let status = response.status();
        let error_type = response
            .headers()
            .get(ERROR_TYPE_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned);
        let text = response.text().await.map_err(CloudApiError::Transport)?;

        if status.is_success() {
            return Ok(text);
        }
        Err(api_error(status, error_type.as_deref(), &text))
    }
}

fn api_error(status: StatusCode, error_type: Option<&str>, body: &str) -> CloudApiError {
    let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
    let name = error_type
        .map(trim_error_name)
        .filter(|name| !name.is_empty())
        .or_else(|| {
            parsed
                .as_ref()
                .and_then(|body| body.kind.as_deref().map(trim_error_name))
        })
        .or_else(|| parsed.as_ref().and_then(|body| body.code.clone()))
        .unwrap_or_else(|| "UnknownError".to_owned());
    let message = parsed
        .and_then(|body| body.message)
        .unwrap_or_else(|| body.trim().to_owned());

    CloudApiError::Api {
        name,
        message,
        status: status.as_u16(),
    }
}

/// `x-amzn-ErrorType` values look like `ThrottlingException:Sender`; `__type`
/// carries a fully qualified prefix, `com.amazonaws.sqs#ThrottlingException`.
fn trim_error_name(raw: &str) -> String {
    let head = raw.split(':').next().unwrap_or(raw);
    let tail = head.rsplit('#').next().unwrap_or(head);
    tail.trim().to_owned()
}
