use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use axum::{
    body::Body,
    extract::State,
    http::{Response, StatusCode},
    response::IntoResponse,
    routing::post,
    Router,
};
use cloudapi_http::{
    use_client, ClientConfig, ClientOptions, CloudApiClient, CloudApiError, FromClientConfig,
    RetryStrategy,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

#[derive(Clone)]
struct MockResponse {
    status: StatusCode,
    body: JsonValue,
    error_type: Option<String>,
}

impl MockResponse {
    fn json(status: StatusCode, body: JsonValue) -> Self {
        Self {
            status,
            body,
            error_type: None,
        }
    }

    fn with_error_type(mut self, error_type: &str) -> Self {
        self.error_type = Some(error_type.to_owned());
        self
    }
}

#[derive(Clone)]
struct MockState {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    hits: Arc<AtomicUsize>,
}

async fn api_handler(State(state): State<MockState>, _body: String) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let response = {
        let mut queue = state
            .responses
            .lock()
            .expect("response queue mutex must not be poisoned");
        queue.pop_front().unwrap_or_else(|| {
            MockResponse::json(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"message": "no mock response available"}),
            )
        })
    };

    let mut builder = Response::builder()
        .status(response.status)
        .header("content-type", "application/x-amz-json-1.1");
    if let Some(error_type) = &response.error_type {
        builder = builder.header("x-amzn-ErrorType", error_type.clone());
    }
    builder
        .body(Body::from(response.body.to_string()))
        .expect("mock response must build")
}

struct TestServer {
    base_url: String,
    hits: Arc<AtomicUsize>,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn spawn_server(responses: Vec<MockResponse>) -> TestServer {
    let state = MockState {
        responses: Arc::new(Mutex::new(responses.into())),
        hits: Arc::new(AtomicUsize::new(0)),
    };

    let app = Router::new().route("/", post(api_handler)).with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind test listener");
    let address = listener.local_addr().expect("must have local addr");
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("mock server must run");
    });

    TestServer {
        base_url: format!("http://{address}"),
        hits: state.hits,
        task,
    }
}

#[derive(Clone, Debug)]
struct QueueClient {
    api: CloudApiClient,
}

impl FromClientConfig for QueueClient {
    fn from_config(config: ClientConfig) -> cloudapi_http::Result<Self> {
        Ok(Self {
            api: CloudApiClient::new("sqs", config)?,
        })
    }
}

#[derive(Debug, Serialize)]
struct ListQueuesRequest {
    #[serde(rename = "QueueNamePrefix")]
    prefix: String,
}

#[derive(Debug, Deserialize)]
struct ListQueuesResponse {
    #[serde(rename = "QueueUrls", default)]
    queue_urls: Vec<String>,
}

impl QueueClient {
    async fn list_queues(&self, prefix: &str) -> cloudapi_http::Result<ListQueuesResponse> {
        self.api
            .post(
                "AmazonSQS.ListQueues",
                &ListQueuesRequest {
                    prefix: prefix.to_owned(),
                },
            )
            .await
    }
}

fn options_for(server: &TestServer) -> ClientOptions {
    ClientOptions::default()
        .with_region("us-east-1")
        .with_endpoint_url(server.base_url.clone())
}

fn queue_body() -> JsonValue {
    json!({"QueueUrls": ["https://sqs.us-east-1.amazonaws.com/123456789012/jobs"]})
}

fn error_body(qualified_name: &str, message: &str) -> JsonValue {
    json!({"__type": qualified_name, "message": message})
}

#[tokio::test]
async fn factory_builds_client_and_lists_queues() {
    let server = spawn_server(vec![MockResponse::json(StatusCode::OK, queue_body())]).await;

    let client: QueueClient = use_client(options_for(&server))
        .await
        .expect("factory must build client");
    let response = client.list_queues("jobs").await.expect("request must succeed");

    assert_eq!(response.queue_urls.len(), 1);
    assert_eq!(
        response.queue_urls[0],
        "https://sqs.us-east-1.amazonaws.com/123456789012/jobs"
    );
    assert_eq!(server.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn throttling_response_is_retried_until_success() {
    let server = spawn_server(vec![
        MockResponse::json(
            StatusCode::BAD_REQUEST,
            error_body("com.amazonaws.sqs#ThrottlingException", "Rate exceeded"),
        ),
        MockResponse::json(StatusCode::OK, queue_body()),
    ])
    .await;

    let client: QueueClient = use_client(options_for(&server))
        .await
        .expect("factory must build client");
    let response = client
        .list_queues("jobs")
        .await
        .expect("request must succeed after retry");

    assert_eq!(response.queue_urls.len(), 1);
    assert_eq!(server.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn non_retriable_error_surfaces_immediately() {
    let server = spawn_server(vec![MockResponse::json(
        StatusCode::BAD_REQUEST,
        error_body("com.amazonaws.sqs#ValidationException", "bad prefix"),
    )])
    .await;

    let client: QueueClient = use_client(options_for(&server))
        .await
        .expect("factory must build client");
    let err = client
        .list_queues("jobs")
        .await
        .expect_err("validation error must not retry");

    match err {
        CloudApiError::Api {
            name,
            message,
            status,
        } => {
            assert_eq!(name, "ValidationException");
            assert_eq!(message, "bad prefix");
            assert_eq!(status, 400);
        }
        other => panic!("expected api error, got {other:?}"),
    }
    assert_eq!(server.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn caller_supplied_error_names_extend_retry_set() {
    let server = spawn_server(vec![
        MockResponse::json(
            StatusCode::BAD_REQUEST,
            error_body("com.amazonaws.sqs#LimitExceededException", "try later"),
        ),
        MockResponse::json(StatusCode::OK, queue_body()),
    ])
    .await;

    let options = options_for(&server).with_retriable_errors(["LimitExceededException"]);
    let client: QueueClient = use_client(options).await.expect("factory must build client");
    let response = client
        .list_queues("jobs")
        .await
        .expect("request must succeed after retrying the extra name");

    assert_eq!(response.queue_urls.len(), 1);
    assert_eq!(server.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn error_name_read_from_error_type_header() {
    let server = spawn_server(vec![
        MockResponse::json(StatusCode::BAD_REQUEST, json!({}))
            .with_error_type("OperationAbortedException:Sender"),
        MockResponse::json(StatusCode::OK, queue_body()),
    ])
    .await;

    let client: QueueClient = use_client(options_for(&server))
        .await
        .expect("factory must build client");
    let response = client
        .list_queues("jobs")
        .await
        .expect("request must succeed after header-classified retry");

    assert_eq!(response.queue_urls.len(), 1);
    assert_eq!(server.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn connect_failure_classifies_as_retriable_connectivity() {
    // Bind then drop a listener so the port is known to refuse connections.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind probe listener");
    let address = listener.local_addr().expect("must have local addr");
    drop(listener);

    let transport_err = reqwest::Client::new()
        .get(format!("http://{address}/"))
        .send()
        .await
        .expect_err("connection must be refused");
    let err = CloudApiError::Transport(transport_err);

    assert!(err.is_connectivity());
    let strategy = RetryStrategy::standard();
    assert!(strategy.should_retry(&err));
    assert!(strategy.should_retry(&err));
}
