use convertly_core::models::{BatchConvertResponse, BatchItemResult, ConversionJob};
use convertly_core::{AppError, ConversionPlan, ErrorMetadata, PollError};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::ConversionOrchestrator;

impl ConversionOrchestrator {
    /// Convert files one at a time; each file's create -> poll cycle ends
    /// before the next one starts. One entry per input, in input order.
    ///
    /// Only an invalid target fails the whole call.
    #[tracing::instrument(skip(self, options, cancel), fields(files = file_ids.len()))]
    pub async fn convert_batch(
        &self,
        file_ids: &[Uuid],
        target_format: &str,
        options: Option<&Map<String, Value>>,
        cancel: &CancellationToken,
    ) -> Result<BatchConvertResponse, AppError> {
        ConversionPlan::resolve(target_format, options)?;

        let mut results = Vec::with_capacity(file_ids.len());
        for &file_id in file_ids {
            if cancel.is_cancelled() {
                results.push(failed(file_id, None, "cancelled"));
                continue;
            }

            let result = self
                .convert_one(file_id, target_format, options, cancel)
                .await;
            if let BatchItemResult::Failed { reason, .. } = &result {
                tracing::warn!(file_id = %file_id, reason = %reason, "Batch item failed");
            }
            results.push(result);
        }

        let response = BatchConvertResponse::new(results);
        tracing::info!(
            succeeded = response.succeeded,
            failed = response.failed,
            "Batch conversion completed"
        );
        Ok(response)
    }

    async fn convert_one(
        &self,
        file_id: Uuid,
        target_format: &str,
        options: Option<&Map<String, Value>>,
        cancel: &CancellationToken,
    ) -> BatchItemResult {
        let job = match self.create_job(file_id, target_format, options).await {
            Ok(job) => job,
            Err(e) => return failed(file_id, None, e.client_message()),
        };

        if let Some(message) = &job.error_message {
            return failed(file_id, Some(job.job_id), message.clone());
        }

        match self
            .wait_for_job(job.job_id, self.config.batch_poll_policy, cancel)
            .await
        {
            Ok(done) => completed(file_id, done),
            Err(PollError::Failed(message)) => failed(file_id, Some(job.job_id), message),
            Err(PollError::Timeout { attempts }) => failed(
                file_id,
                Some(job.job_id),
                format!("Timed out after {} status checks", attempts),
            ),
            Err(PollError::Cancelled) => failed(file_id, Some(job.job_id), "cancelled"),
            Err(PollError::Request(e)) => failed(file_id, Some(job.job_id), e.client_message()),
        }
    }
}

fn completed(file_id: Uuid, job: ConversionJob) -> BatchItemResult {
    match job.result_url {
        Some(url) => BatchItemResult::Ok {
            file_id,
            job_id: job.job_id,
            filename: job.result_filename,
            url,
        },
        None => failed(
            file_id,
            Some(job.job_id),
            "Provider reported completion without a result file",
        ),
    }
}

fn failed(file_id: Uuid, job_id: Option<Uuid>, reason: impl Into<String>) -> BatchItemResult {
    BatchItemResult::Failed {
        file_id,
        job_id,
        reason: reason.into(),
    }
}
