use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use crate::error::RpcError;
use crate::protocol::JsonRpcRequest;

use super::{RawResponse, Transport};

static NEXT_CONNECTION: AtomicU64 = AtomicU64::new(1);

/// One request as the mock saw it.
#[derive(Debug, Clone)]
pub struct RecordedPost {
    pub connection: u64,
    pub body: Value,
}

/// A stub transport for testing. Replays canned responses in order and
/// records every posted envelope, tagged with the mock's connection id.
pub struct MockTransport {
    connection: u64,
    responses: Mutex<VecDeque<RawResponse>>,
    posts: Mutex<Vec<RecordedPost>>,
}

impl MockTransport {
    pub fn builder() -> MockTransportBuilder {
        MockTransportBuilder {
            responses: VecDeque::new(),
        }
    }

    pub fn posts(&self) -> Vec<RecordedPost> {
        self.posts.lock().expect("mock lock poisoned").clone()
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.posts().into_iter().map(|post| post.body).collect()
    }
}

pub struct MockTransportBuilder {
    responses: VecDeque<RawResponse>,
}

impl MockTransportBuilder {
    pub fn with_response(mut self, status: StatusCode, body: impl Into<String>) -> Self {
        self.responses.push_back(RawResponse {
            status,
            body: body.into(),
        });
        self
    }

    /// Queue a 200 response whose body is `body` serialized as JSON.
    pub fn with_json(self, body: Value) -> Self {
        self.with_response(StatusCode::OK, body.to_string())
    }

    pub fn build(self) -> MockTransport {
        MockTransport {
            connection: NEXT_CONNECTION.fetch_add(1, Ordering::Relaxed),
            responses: Mutex::new(self.responses),
            posts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post(&self, request: &JsonRpcRequest) -> Result<RawResponse, RpcError> {
        let body = serde_json::to_value(request).expect("request envelopes always serialize");
        self.posts
            .lock()
            .expect("mock lock poisoned")
            .push(RecordedPost {
                connection: self.connection,
                body,
            });

        // Running out of canned responses looks like an empty 200 body.
        Ok(self
            .responses
            .lock()
            .expect("mock lock poisoned")
            .pop_front()
            .unwrap_or(RawResponse {
                status: StatusCode::OK,
                body: String::new(),
            }))
    }

    fn endpoint(&self) -> &str {
        "mock://jsonrpc"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Params;
    use serde_json::json;

    #[tokio::test]
    async fn replays_responses_in_order() {
        let mock = MockTransport::builder()
            .with_json(json!({"result": 1}))
            .with_response(StatusCode::BAD_GATEWAY, "upstream down")
            .build();
        let request = JsonRpcRequest::new(1, "ping", Params::default());

        let first = mock.post(&request).await.unwrap();
        let second = mock.post(&request).await.unwrap();
        assert_eq!(first.status, StatusCode::OK);
        assert_eq!(second.status, StatusCode::BAD_GATEWAY);
        assert_eq!(second.body, "upstream down");
        assert_eq!(mock.posts().len(), 2);
    }

    #[test]
    fn each_mock_is_its_own_connection() {
        let a = MockTransport::builder().build();
        let b = MockTransport::builder().build();
        assert_ne!(a.connection, b.connection);
    }
}
