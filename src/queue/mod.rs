//! Redis-backed FIFO hand-off between the Collector and the Rule Loader.
//!
//! A single named list (`list_name`) holds [`MockRuleDescriptor`]s serialized as
//! JSON; a second list (`dlq_name`) holds [`DeadLetterEntry`]s. Both are plain
//! `RPUSH`/`BLPOP` lists — self-describing records, nothing fancier, so the
//! dead-letter list stays inspectable with `redis-cli LRANGE` directly.
//!
//! The adapter owns reconnection via `redis::aio::ConnectionManager`, which
//! retries its own connection attempts transparently; callers only see an
//! error after [`Queue::push`]'s own retry loop is exhausted.

use std::time::Duration;

use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::QueueConfig;
use crate::error::{CaptureError, Result};
use crate::types::MockRuleDescriptor;

/// A descriptor that failed installation permanently, or exhausted retries,
/// carried alongside enough context to triage it by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    pub descriptor: MockRuleDescriptor,
    pub reason: String,
    pub last_error: String,
    pub attempts: u32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// `push`'s retry schedule: 50ms, 100ms, 200ms, 400ms, capped at 5s, 5 attempts total.
const PUSH_BACKOFF_BASE: Duration = Duration::from_millis(50);
const PUSH_BACKOFF_MAX: Duration = Duration::from_secs(5);

fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let scaled = base.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
    std::cmp::min(scaled, max)
}

pub struct Queue {
    client: redis::Client,
    conn: ConnectionManager,
    list_name: String,
    dlq_name: String,
    push_retry_attempts: u32,
    push_timeout: Duration,
    pop_timeout: Duration,
}

impl Queue {
    /// Open a connection-managed client against `config.endpoint`. A failed initial
    /// connection here is the "unreachable Queue at startup" fatal configuration
    /// error from the spec's error-handling design.
    pub async fn connect(config: &QueueConfig) -> Result<Self> {
        let mut client_url = config.endpoint.clone();
        if let Some(password) = &config.password {
            client_url = inject_password(&client_url, password);
        }

        let client = redis::Client::open(client_url.as_str())
            .map_err(|e| CaptureError::config(format!("invalid queue endpoint: {e}")))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| CaptureError::config(format!("queue unreachable at startup: {e}")))?;

        Ok(Self {
            client,
            conn,
            list_name: config.list_name.clone(),
            dlq_name: config.dlq_name.clone(),
            push_retry_attempts: config.push_retry_attempts,
            push_timeout: Duration::from_secs(config.push_timeout_secs),
            pop_timeout: Duration::from_secs(config.pop_timeout_secs),
        })
    }

    /// Push a descriptor onto the queue, retrying transient failures with
    /// exponential backoff. Exhaustion is the caller's signal to drop the record
    /// (Collector) rather than duplicate it.
    pub async fn push(&self, descriptor: &MockRuleDescriptor) -> Result<()> {
        let payload = serde_json::to_string(descriptor)?;
        let mut last_err = None;

        for attempt in 0..self.push_retry_attempts {
            let mut conn = self.conn.clone();
            let attempt_fut = conn.rpush::<_, _, i64>(&self.list_name, &payload);
            match tokio::time::timeout(self.push_timeout, attempt_fut).await {
                Ok(Ok(_)) => return Ok(()),
                Ok(Err(e)) => {
                    warn!(attempt, error = %e, "queue push attempt failed");
                    last_err = Some(CaptureError::Redis(e));
                }
                Err(_) => {
                    warn!(attempt, "queue push attempt timed out");
                    last_err = Some(CaptureError::queue("push timed out"));
                }
            }
            if attempt + 1 < self.push_retry_attempts {
                sleep(backoff_delay(attempt, PUSH_BACKOFF_BASE, PUSH_BACKOFF_MAX)).await;
            }
        }

        Err(last_err.unwrap_or_else(|| CaptureError::queue("push exhausted retries")))
    }

    /// Block up to `pop_timeout` waiting for at least one descriptor, then drain
    /// up to `max_n - 1` additional entries non-blockingly. Returns an empty
    /// `Vec` on timeout rather than an error; a drained-but-empty queue is not
    /// a failure.
    ///
    /// `BLPOP` runs on its own connection rather than the shared
    /// `ConnectionManager`: that connection is multiplexed, so a worker
    /// blocked in `BLPOP` would otherwise stall every other command
    /// (`push`, `dead_letter`, `depth`) sharing the same pipe until it
    /// unblocks.
    pub async fn pop_batch(&self, max_n: usize) -> Result<Vec<MockRuleDescriptor>> {
        if max_n == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.client.get_async_connection().await?;
        let first: Option<(String, String)> = conn
            .blpop(&self.list_name, self.pop_timeout.as_secs_f64())
            .await?;

        let Some((_, payload)) = first else {
            return Ok(Vec::new());
        };

        let mut batch = Vec::with_capacity(max_n);
        batch.push(self.decode(&payload)?);

        for _ in 1..max_n {
            let next: Option<String> = conn.lpop(&self.list_name, None).await?;
            match next {
                Some(payload) => batch.push(self.decode(&payload)?),
                None => break,
            }
        }

        debug!(batch_size = batch.len(), "popped batch from queue");
        Ok(batch)
    }

    /// Route a descriptor that failed installation permanently or exhausted
    /// retries to the dead-letter list.
    pub async fn dead_letter(&self, descriptor: MockRuleDescriptor, reason: &str, last_error: &str, attempts: u32) -> Result<()> {
        let now = Utc::now();
        let entry = DeadLetterEntry {
            descriptor,
            reason: reason.to_string(),
            last_error: last_error.to_string(),
            attempts,
            first_seen: now,
            last_seen: now,
        };
        let payload = serde_json::to_string(&entry)?;
        let mut conn = self.conn.clone();
        conn.rpush::<_, _, i64>(&self.dlq_name, payload).await?;
        Ok(())
    }

    /// Current queue depth, surfaced as the `collector_queue_depth` gauge.
    pub async fn depth(&self) -> Result<usize> {
        let mut conn = self.conn.clone();
        let len: i64 = conn.llen(&self.list_name).await?;
        Ok(len.max(0) as usize)
    }

    fn decode(&self, payload: &str) -> Result<MockRuleDescriptor> {
        serde_json::from_str(payload).map_err(CaptureError::from)
    }
}

/// Rewrite `redis://host:port` (or `redis://user@host:port`) to carry `password`
/// as userinfo, which is how the `redis` crate's URL parser expects auth to be
/// conveyed.
fn inject_password(url: &str, password: &secrecy::SecretString) -> String {
    use secrecy::ExposeSecret;
    match url.split_once("://") {
        Some((scheme, rest)) => format!("{scheme}://:{}@{rest}", rest_encode(password.expose_secret())),
        None => url.to_string(),
    }
}

fn rest_encode(secret: &str) -> String {
    urlencoding::encode(secret).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_delay_grows_and_caps() {
        assert_eq!(backoff_delay(0, PUSH_BACKOFF_BASE, PUSH_BACKOFF_MAX), Duration::from_millis(50));
        assert_eq!(backoff_delay(1, PUSH_BACKOFF_BASE, PUSH_BACKOFF_MAX), Duration::from_millis(100));
        assert_eq!(backoff_delay(10, PUSH_BACKOFF_BASE, PUSH_BACKOFF_MAX), PUSH_BACKOFF_MAX);
    }

    #[test]
    fn inject_password_adds_userinfo() {
        use secrecy::SecretString;
        let url = inject_password("redis://127.0.0.1:6379", &SecretString::new("s3cr3t".to_string()));
        assert_eq!(url, "redis://:s3cr3t@127.0.0.1:6379");
    }
}
