use super::types::{base_model_id, SftTrainRequest, TuningJob};
use super::COLLECTION;
use crate::backend::{collect_all, decode, ListOptions, VertexBackend};
use crate::config::VertexConfig;
use crate::resource::full_resource_name;
use crate::{Error, Result};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Clone)]
pub struct TuningService {
    backend: Arc<dyn VertexBackend>,
    config: Arc<VertexConfig>,
}

impl TuningService {
    pub fn new(backend: Arc<dyn VertexBackend>, config: Arc<VertexConfig>) -> Self {
        Self { backend, config }
    }

    /// Start a supervised fine-tuning job.
    pub async fn train(&self, request: SftTrainRequest) -> Result<TuningJob> {
        request.validate()?;
        let base_model = base_model_id(&request.source_model)?;
        let mut body = json!({
            "baseModel": base_model,
            "supervisedTuningSpec": request.spec(),
        });
        if let Some(name) = &request.tuned_model_display_name {
            body["tunedModelDisplayName"] = json!(name);
        }
        debug!(base_model = base_model.as_str(), dataset = request.train_dataset.as_str(), "creating tuning job");
        let created = self
            .backend
            .create(&self.config.parent(), COLLECTION, body)
            .await?;
        let job: TuningJob = decode(created)?;
        info!(job = job.name.as_str(), "vertexai-preview tuning job created");
        Ok(job)
    }

    pub async fn get(&self, name_or_id: &str) -> Result<TuningJob> {
        let name = full_resource_name(&self.config, COLLECTION, name_or_id)?;
        decode(self.backend.get(&name).await?)
    }

    pub async fn list(&self) -> Result<Vec<TuningJob>> {
        collect_all(self.backend.as_ref(), &self.config.parent(), COLLECTION, ListOptions::new())
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    pub async fn cancel(&self, name_or_id: &str) -> Result<()> {
        let name = full_resource_name(&self.config, COLLECTION, name_or_id)?;
        debug!(job = name.as_str(), "cancelling tuning job");
        self.backend.invoke(&name, "cancel", json!({})).await.map(|_| ())
    }

    /// Reload `job` in place from the backend.
    pub async fn refresh(&self, job: &mut TuningJob) -> Result<()> {
        *job = self.get(&job.name).await?;
        Ok(())
    }

    /// Poll until the job reaches a terminal state.
    pub async fn wait(&self, name_or_id: &str, poll: Duration, timeout: Duration) -> Result<TuningJob> {
        let start = Instant::now();
        loop {
            let job = self.get(name_or_id).await?;
            if job.has_ended() {
                info!(
                    job = job.name.as_str(),
                    state = ?job.state,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "vertexai-preview tuning job finished"
                );
                return Ok(job);
            }
            if start.elapsed() >= timeout {
                return Err(Error::Timeout {
                    message: format!(
                        "tuning job {} still {:?} after {}s",
                        job.name,
                        job.state,
                        timeout.as_secs()
                    ),
                });
            }
            tokio::time::sleep(poll).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;
    use crate::tuning::JobState;

    fn service() -> TuningService {
        TuningService::new(
            Arc::new(LocalBackend::new()),
            Arc::new(VertexConfig::new("proj", "us-central1")),
        )
    }

    #[tokio::test]
    async fn job_runs_to_completion() {
        let svc = service();
        let job = svc
            .train(SftTrainRequest::new("gemini-1.0-pro-002", "gs://bucket/train.jsonl").with_epochs(2))
            .await
            .unwrap();
        assert_eq!(job.state, JobState::Pending);
        assert_eq!(job.base_model, "gemini-1.0-pro-002");
        let done = svc
            .wait(&job.name, Duration::from_millis(1), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(done.has_succeeded());
        assert!(done.tuned_model_name().unwrap().contains("/models/"));
    }

    #[tokio::test]
    async fn cancel_after_success_fails() {
        let svc = service();
        let mut job = svc
            .train(SftTrainRequest::new("gemini-1.0-pro-002", "gs://bucket/train.jsonl"))
            .await
            .unwrap();
        svc.refresh(&mut job).await.unwrap();
        assert_eq!(job.state, JobState::Running);
        svc.refresh(&mut job).await.unwrap();
        let err = svc.cancel(job.resource_id()).await.unwrap_err();
        assert_eq!(err.status_code(), Some(400));
    }
}
