use crate::payments::errors::{GatewayError, GatewayResult};
use crate::payments::traits::{HttpRequest, HttpResponse, HttpTransport};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

enum Reply {
    Response(HttpResponse),
    Timeout,
}

/// Transport that records every request and replays canned replies.
/// The last reply is repeated once the queue runs dry.
pub(crate) struct RecordingTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RecordingTransport {
    fn with_replies(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn ok(body: Value) -> Arc<Self> {
        Self::respond(HttpResponse::new(200, body.to_string()))
    }

    pub(crate) fn respond(response: HttpResponse) -> Arc<Self> {
        Self::with_replies(vec![Reply::Response(response)])
    }

    pub(crate) fn sequence(responses: Vec<HttpResponse>) -> Arc<Self> {
        Self::with_replies(responses.into_iter().map(Reply::Response).collect())
    }

    pub(crate) fn fail_with_timeout() -> Arc<Self> {
        Self::with_replies(vec![Reply::Timeout])
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn last_body(&self) -> Option<Value> {
        self.requests
            .lock()
            .unwrap()
            .last()
            .and_then(|r| r.body.as_ref())
            .map(|b| serde_json::from_slice(b).unwrap())
    }
}

#[async_trait]
impl HttpTransport for RecordingTransport {
    async fn execute(&self, request: HttpRequest) -> GatewayResult<HttpResponse> {
        self.requests.lock().unwrap().push(request);

        let mut replies = self.replies.lock().unwrap();
        let reply = if replies.len() > 1 {
            replies.pop_front()
        } else {
            None
        };

        let reply = match reply {
            Some(reply) => reply,
            None => match replies.front() {
                Some(Reply::Response(response)) => Reply::Response(response.clone()),
                Some(Reply::Timeout) | None => Reply::Timeout,
            },
        };

        match reply {
            Reply::Response(response) => Ok(response),
            Reply::Timeout => Err(GatewayError::timeout("request timed out after 10s")),
        }
    }
}
