use serde::Deserialize;

/// Error body of an AWS-JSON response.
///
/// Services spell the name either as a fully qualified `__type`
/// (`com.amazonaws.sqs#ThrottlingException`) or a bare `code`; the message
/// key also varies in case.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(rename = "__type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, alias = "Message")]
    pub message: Option<String>,
}
