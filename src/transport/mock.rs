//! Mock transport for testing
//!
//! Replies come from a scripted queue, then from an optional responder
//! closure, then from a fallback response. Every request is recorded so tests
//! can assert on exactly what was sent.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{HttpRequest, HttpResponse, HttpTransport, TransportError};

/// Closure computing a response from the request
type Responder = Arc<dyn Fn(&HttpRequest) -> HttpResponse + Send + Sync>;

/// One scripted reply
#[derive(Debug, Clone)]
pub enum MockReply {
    Response(HttpResponse),
    Error(TransportError),
    /// Sleep before answering, to exercise timeouts
    Delayed(Duration, HttpResponse),
}

/// Mock transport for testing
pub struct MockTransport {
    /// Queue of replies consumed in order
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    /// Requests received, in arrival order
    requests: Arc<Mutex<Vec<HttpRequest>>>,
    responder: Option<Responder>,
    fallback: HttpResponse,
}

impl MockTransport {
    /// Create a new mock transport answering `200 {}` by default
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            responder: None,
            fallback: HttpResponse::new(200).with_body("{}"),
        }
    }

    /// Answer every unscripted request with this response
    pub fn with_fallback(mut self, response: HttpResponse) -> Self {
        self.fallback = response;
        self
    }

    /// Compute unscripted responses from the request
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static,
    {
        self.responder = Some(Arc::new(responder));
        self
    }

    /// Queue a response for the next request
    pub async fn queue_response(&self, response: HttpResponse) {
        self.queue(MockReply::Response(response)).await;
    }

    /// Queue a status-only response
    pub async fn queue_status(&self, status: u16) {
        self.queue_response(HttpResponse::new(status)).await;
    }

    /// Queue a transport failure
    pub async fn queue_error(&self, error: TransportError) {
        self.queue(MockReply::Error(error)).await;
    }

    /// Queue a response that arrives only after `delay`
    pub async fn queue_delayed(&self, delay: Duration, response: HttpResponse) {
        self.queue(MockReply::Delayed(delay, response)).await;
    }

    pub async fn queue(&self, reply: MockReply) {
        let mut replies = self.replies.lock().await;
        replies.push_back(reply);
    }

    /// Get all received requests
    pub async fn requests(&self) -> Vec<HttpRequest> {
        let requests = self.requests.lock().await;
        requests.clone()
    }

    /// Number of requests received
    pub async fn request_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    /// Clear queued replies and recorded requests
    pub async fn reset(&self) {
        self.replies.lock().await.clear();
        self.requests.lock().await.clear();
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            replies: Arc::clone(&self.replies),
            requests: Arc::clone(&self.requests),
            responder: self.responder.clone(),
            fallback: self.fallback.clone(),
        }
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn call(
        &self,
        request: &HttpRequest,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        self.requests.lock().await.push(request.clone());

        let scripted = self.replies.lock().await.pop_front();
        match scripted {
            Some(MockReply::Response(response)) => Ok(response),
            Some(MockReply::Error(error)) => Err(error),
            Some(MockReply::Delayed(delay, response)) => {
                if delay > timeout {
                    tokio::time::sleep(timeout).await;
                    return Err(TransportError::Timeout(timeout));
                }
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            None => Ok(match &self.responder {
                Some(responder) => responder(request),
                None => self.fallback.clone(),
            }),
        }
    }

    fn transport_type(&self) -> &'static str {
        "mock"
    }
}
