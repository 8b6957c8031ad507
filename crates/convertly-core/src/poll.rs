//! Cancellable poll loop
//!
//! Repeats a status fetch at a fixed interval until the returned status is
//! terminal, the attempt ceiling is reached or the token is cancelled.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::models::{ConversionJob, JobStatus, JobStatusResponse};

const SINGLE_JOB_INTERVAL: Duration = Duration::from_millis(1000);
const BATCH_INTERVAL: Duration = Duration::from_millis(2000);
const MAX_ATTEMPTS: u32 = 60;

/// Anything exposing a job status that the loop can inspect.
pub trait PollStatus {
    fn status(&self) -> JobStatus;

    /// Message to surface when the status is `error`.
    fn failure_message(&self) -> Option<String>;
}

impl PollStatus for ConversionJob {
    fn status(&self) -> JobStatus {
        self.status
    }

    fn failure_message(&self) -> Option<String> {
        self.error_message.clone()
    }
}

impl PollStatus for JobStatusResponse {
    fn status(&self) -> JobStatus {
        self.status
    }

    fn failure_message(&self) -> Option<String> {
        self.error.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    pub fn single_job() -> Self {
        Self::new(SINGLE_JOB_INTERVAL, MAX_ATTEMPTS)
    }

    pub fn batch() -> Self {
        Self::new(BATCH_INTERVAL, MAX_ATTEMPTS)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::single_job()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PollError<E> {
    #[error("Job did not finish after {attempts} status checks")]
    Timeout { attempts: u32 },

    #[error("Polling was cancelled")]
    Cancelled,

    #[error("Conversion failed: {0}")]
    Failed(String),

    #[error("Status request failed: {0}")]
    Request(E),
}

/// Poll `fetch` until it returns a terminal status.
///
/// `fetch` receives the 1-based attempt number. `finished` yields the last
/// value, `error` yields [`PollError::Failed`]. After `Timeout` or
/// `Cancelled` no further call to `fetch` is made.
pub async fn poll_until_terminal<T, E, F, Fut>(
    policy: PollPolicy,
    cancel: &CancellationToken,
    mut fetch: F,
) -> Result<T, PollError<E>>
where
    T: PollStatus,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    for attempt in 1..=policy.max_attempts {
        if cancel.is_cancelled() {
            return Err(PollError::Cancelled);
        }

        let request = fetch(attempt);
        let value = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            result = request => result.map_err(PollError::Request)?,
        };

        match value.status() {
            JobStatus::Finished => return Ok(value),
            JobStatus::Error => {
                let message = value
                    .failure_message()
                    .unwrap_or_else(|| "Conversion failed".to_string());
                return Err(PollError::Failed(message));
            }
            status => {
                tracing::debug!(attempt, status = %status, "Job not terminal yet");
            }
        }

        if attempt == policy.max_attempts {
            break;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            _ = tokio::time::sleep(policy.interval) => {}
        }
    }

    Err(PollError::Timeout {
        attempts: policy.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn response(status: JobStatus) -> JobStatusResponse {
        JobStatusResponse {
            status,
            result_url: (status == JobStatus::Finished)
                .then(|| "https://example.com/out.pdf".to_string()),
            filename: None,
            error: (status == JobStatus::Error).then(|| "corrupt input".to_string()),
        }
    }

    fn fast_policy(max_attempts: u32) -> PollPolicy {
        PollPolicy::new(Duration::from_millis(5), max_attempts)
    }

    #[tokio::test]
    async fn test_returns_finished_value() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let token = CancellationToken::new();

        let result = poll_until_terminal(fast_policy(10), &token, |attempt| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                let status = if attempt < 3 {
                    JobStatus::Processing
                } else {
                    JobStatus::Finished
                };
                Ok::<_, Infallible>(response(status))
            }
        })
        .await
        .unwrap();

        assert_eq!(result.status, JobStatus::Finished);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_error_status_propagates_message() {
        let token = CancellationToken::new();
        let result = poll_until_terminal(fast_policy(10), &token, |_| async {
            Ok::<_, Infallible>(response(JobStatus::Error))
        })
        .await;

        match result {
            Err(PollError::Failed(message)) => assert_eq!(message, "corrupt input"),
            other => panic!("unexpected result: {:?}", other.map(|r| r.status)),
        }
    }

    #[tokio::test]
    async fn test_timeout_stops_requests() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let token = CancellationToken::new();

        let result = poll_until_terminal(fast_policy(4), &token, |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, Infallible>(response(JobStatus::Processing)) }
        })
        .await;

        assert!(matches!(result, Err(PollError::Timeout { attempts: 4 })));
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_request() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let token = CancellationToken::new();
        token.cancel();

        let result = poll_until_terminal(fast_policy(10), &token, |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, Infallible>(response(JobStatus::Processing)) }
        })
        .await;

        assert!(matches!(result, Err(PollError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_during_sleep_stops_requests() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let token = CancellationToken::new();
        let policy = PollPolicy::new(Duration::from_secs(60), 10);

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let result = poll_until_terminal(policy, &token, |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, Infallible>(response(JobStatus::Queued)) }
        })
        .await;

        assert!(matches!(result, Err(PollError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_request_error_is_returned() {
        let token = CancellationToken::new();
        let result: Result<JobStatusResponse, _> =
            poll_until_terminal(fast_policy(3), &token, |_| async {
                Err::<JobStatusResponse, _>("connection reset")
            })
            .await;

        assert!(matches!(result, Err(PollError::Request("connection reset"))));
    }

    #[test]
    fn test_default_policies() {
        assert_eq!(PollPolicy::single_job().interval, Duration::from_secs(1));
        assert_eq!(PollPolicy::batch().interval, Duration::from_secs(2));
        assert_eq!(PollPolicy::batch().max_attempts, 60);
    }
}
