//! Pacing demo using a scripted in-process transport
//!
//! Every scripted reply advises a 400ms delay. The client waits it out before
//! each following request, and refuses once the advice exceeds the limit.

use async_trait::async_trait;
use randrpc::client::Transport;
use randrpc::{ClientBuilder, Error, IntegerRequest};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct ScriptedService {
    calls: AtomicUsize,
}

#[async_trait]
impl Transport for ScriptedService {
    async fn exchange(&self, _body: Vec<u8>) -> randrpc::Result<Vec<u8>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        // The fourth reply asks for a pause longer than the client tolerates
        let delay = if call == 2 { 5000 } else { 400 };
        Ok(format!(
            r#"{{"jsonrpc":"2.0","result":{{"random":{{"data":[{}],"completionTime":"2024-01-01 00:00:00Z"}},"bitsUsed":3,"bitsLeft":1000,"requestsLeft":100,"advisoryDelay":{}}},"id":{}}}"#,
            call % 6 + 1,
            delay,
            call
        )
        .into_bytes())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,randrpc_client=debug".into()),
        )
        .init();

    let client = ClientBuilder::new("demo-key")
        .with_transport(Arc::new(ScriptedService {
            calls: AtomicUsize::new(0),
        }))
        .max_blocking_time(Duration::from_secs(1))
        .build()?;

    let start = Instant::now();
    for round in 0..4 {
        match client.generate_integers(IntegerRequest::new(1, 1, 6)).await {
            Ok(response) => println!(
                "[{:>5}ms] round {}: {:?} (advised {}ms)",
                start.elapsed().as_millis(),
                round,
                response.integers()?,
                response.advisory_delay()
            ),
            Err(Error::PacingExceeded { wait, max }) => {
                println!(
                    "[{:>5}ms] round {}: refused, would wait {:?} (limit {:?})",
                    start.elapsed().as_millis(),
                    round,
                    wait,
                    max
                );
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
