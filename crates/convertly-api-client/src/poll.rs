//! Client-side job polling.

use crate::ApiClient;
use convertly_core::models::JobStatusResponse;
use convertly_core::{poll_until_terminal, PollError, PollPolicy};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

impl ApiClient {
    /// Check the job status until it is finished or failed.
    ///
    /// Stops without further requests once `cancel` fires or the policy's
    /// attempt ceiling is reached.
    pub async fn wait_for_job(
        &self,
        job_id: Uuid,
        policy: PollPolicy,
        cancel: &CancellationToken,
    ) -> Result<JobStatusResponse, PollError<anyhow::Error>> {
        poll_until_terminal(policy, cancel, |attempt| async move {
            tracing::debug!(job_id = %job_id, attempt, "Checking conversion status");
            self.get_status(job_id).await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convertly_core::models::JobStatus;
    use mockito::Matcher;
    use std::time::Duration;

    fn fast(max_attempts: u32) -> PollPolicy {
        PollPolicy::new(Duration::from_millis(5), max_attempts)
    }

    #[tokio::test]
    async fn test_wait_for_finished_job() {
        let mut server = mockito::Server::new_async().await;
        let job_id = Uuid::new_v4();
        let query = Matcher::UrlEncoded("jobId".into(), job_id.to_string());

        // Mocks with outstanding expected hits are served first, in creation order.
        let processing = server
            .mock("GET", "/convert")
            .match_query(query.clone())
            .with_status(200)
            .with_body(r#"{"status":"processing"}"#)
            .expect(2)
            .create_async()
            .await;
        let finished = server
            .mock("GET", "/convert")
            .match_query(query)
            .with_status(200)
            .with_body(r#"{"status":"finished","resultUrl":"https://cdn.test/a.pdf","filename":"a.pdf"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url()).unwrap();
        let result = client
            .wait_for_job(job_id, fast(10), &CancellationToken::new())
            .await
            .unwrap();

        processing.assert_async().await;
        finished.assert_async().await;
        assert_eq!(result.status, JobStatus::Finished);
        assert_eq!(result.filename.as_deref(), Some("a.pdf"));
    }

    #[tokio::test]
    async fn test_wait_surfaces_failure_message() {
        let mut server = mockito::Server::new_async().await;
        let job_id = Uuid::new_v4();
        server
            .mock("GET", "/convert")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status":"error","error":"Unsupported input"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url()).unwrap();
        let result = client
            .wait_for_job(job_id, fast(10), &CancellationToken::new())
            .await;

        match result {
            Err(PollError::Failed(message)) => assert_eq!(message, "Unsupported input"),
            other => panic!("unexpected result: {:?}", other.map(|r| r.status)),
        }
    }

    #[tokio::test]
    async fn test_wait_times_out_after_ceiling() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/convert")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status":"queued"}"#)
            .expect(3)
            .create_async()
            .await;

        let client = ApiClient::new(server.url()).unwrap();
        let result = client
            .wait_for_job(Uuid::new_v4(), fast(3), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(PollError::Timeout { attempts: 3 })));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_cancelled_wait_sends_nothing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/convert")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let cancel = CancellationToken::new();
        cancel.cancel();

        let client = ApiClient::new(server.url()).unwrap();
        let result = client.wait_for_job(Uuid::new_v4(), fast(3), &cancel).await;

        assert!(matches!(result, Err(PollError::Cancelled)));
        mock.assert_async().await;
    }
}
