use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Result};
use crate::request::{Request, Response};
use crate::transport::Transport;

/// In-memory transport that replays scripted responses
///
/// Every request is recorded. Responses are handed out in the order they
/// were scripted; once the script runs out, `send` fails.
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Result<Response>>>,
    requests: Mutex<Vec<Request>>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a response with `status` and `body`
    pub fn respond(self, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.push_response(Response::new(status, body));
        self
    }

    /// Script a failed exchange
    pub fn fail(self, error: Error) -> Self {
        locked(&self.script).push_back(Err(error));
        self
    }

    pub fn push_response(&self, response: Response) {
        locked(&self.script).push_back(Ok(response));
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<Request> {
        locked(&self.requests).clone()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: Request) -> Result<Response> {
        locked(&self.requests).push(request);
        locked(&self.script)
            .pop_front()
            .unwrap_or_else(|| Err(Error::custom("no scripted response left")))
    }
}
