//! Scripted doubles for client tests.

use crate::retry::Sleeper;
use crate::transport::{HttpResponse, Transport};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;
use tierwatch_core::{ApiError, TransportKind};

/// Records requested sleeps instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }

    pub fn total(&self) -> Duration {
        self.sleeps.borrow().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}

/// Replays queued responses in order and records every request body.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: RefCell<VecDeque<Result<HttpResponse, ApiError>>>,
    requests: RefCell<Vec<Value>>,
}

impl ScriptedTransport {
    pub fn ok(self, body: Value) -> Self {
        self.push(Ok(HttpResponse {
            status: 200,
            body: body.to_string(),
        }))
    }

    pub fn status(self, status: u16) -> Self {
        self.push(Ok(HttpResponse {
            status,
            body: format!("status {status}"),
        }))
    }

    pub fn raw(self, body: &str) -> Self {
        self.push(Ok(HttpResponse {
            status: 200,
            body: body.to_string(),
        }))
    }

    pub fn timeout(self) -> Self {
        self.push(Err(ApiError::Transport {
            kind: TransportKind::Timeout,
            message: "operation timed out".into(),
        }))
    }

    fn push(self, response: Result<HttpResponse, ApiError>) -> Self {
        self.responses.borrow_mut().push_back(response);
        self
    }

    pub fn requests(&self) -> Vec<Value> {
        self.requests.borrow().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl Transport for ScriptedTransport {
    fn post_json(&self, _url: &str, body: &Value) -> Result<HttpResponse, ApiError> {
        self.requests.borrow_mut().push(body.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted response left"))
    }
}
