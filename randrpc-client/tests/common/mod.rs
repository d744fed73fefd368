//! Common test utilities for randrpc-client integration tests
//!
//! This module provides a scripted transport so client behavior can be
//! tested without a network. Replies are served in order; every request body
//! is logged together with the (tokio) instant it arrived.

#![allow(dead_code)]

use async_trait::async_trait;
use randrpc_client::Transport;
use randrpc_core::{codec, Error, Result, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// One scripted reply
pub enum Reply {
    Body(String),
    Fail(String),
}

/// Transport that answers from a script
pub struct MockTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<(Instant, String)>>,
    calls: AtomicUsize,
    latency: Duration,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            latency: Duration::ZERO,
        }
    }

    /// Simulated round-trip time for every exchange
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn reply(self, body: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Reply::Body(body.into()));
        self
    }

    pub fn fail(self, message: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Reply::Fail(message.into()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Request bodies in arrival order
    pub fn bodies(&self) -> Vec<String> {
        self.requests.lock().unwrap().iter().map(|(_, body)| body.clone()).collect()
    }

    /// Arrival instants in order
    pub fn arrivals(&self) -> Vec<Instant> {
        self.requests.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }

    /// The n-th request body, parsed
    pub fn request(&self, index: usize) -> Value {
        codec::parse(&self.bodies()[index]).unwrap()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn exchange(&self, body: Vec<u8>) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((Instant::now(), String::from_utf8(body).unwrap()));

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Reply::Body(body)) => Ok(body.into_bytes()),
            Some(Reply::Fail(message)) => Err(Error::Transport(message)),
            None => Err(Error::Transport("no scripted reply left".to_string())),
        }
    }
}

/// A successful integer reply carrying `advisory_delay` milliseconds
pub fn integers_reply(data: &str, advisory_delay: u64, id: i32) -> String {
    format!(
        r#"{{"jsonrpc":"2.0","result":{{"random":{{"data":[{}],"completionTime":"2011-10-10 13:19:12Z"}},"bitsUsed":16,"bitsLeft":199984,"requestsLeft":9999,"advisoryDelay":{}}},"id":{}}}"#,
        data, advisory_delay, id
    )
}

/// A usage reply with the given status
pub fn usage_reply(status: &str) -> String {
    format!(
        r#"{{"jsonrpc":"2.0","result":{{"status":"{}","creationTime":"2013-02-01 17:53:40Z","bitsLeft":998532,"requestsLeft":199996,"totalBits":1646421,"totalRequests":65036}},"id":1}}"#,
        status
    )
}

/// An error reply
pub fn error_reply(code: i32, message: &str) -> String {
    format!(
        r#"{{"jsonrpc":"2.0","error":{{"code":{},"message":"{}"}},"id":1}}"#,
        code, message
    )
}
