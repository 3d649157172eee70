use crate::types::Status;
use crate::{Error, ErrorContext, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobState {
    #[default]
    #[serde(rename = "JOB_STATE_UNSPECIFIED")]
    Unspecified,
    #[serde(rename = "JOB_STATE_QUEUED")]
    Queued,
    #[serde(rename = "JOB_STATE_PENDING")]
    Pending,
    #[serde(rename = "JOB_STATE_RUNNING")]
    Running,
    #[serde(rename = "JOB_STATE_SUCCEEDED")]
    Succeeded,
    #[serde(rename = "JOB_STATE_FAILED")]
    Failed,
    #[serde(rename = "JOB_STATE_CANCELLING")]
    Cancelling,
    #[serde(rename = "JOB_STATE_CANCELLED")]
    Cancelled,
    #[serde(rename = "JOB_STATE_PAUSED")]
    Paused,
    #[serde(rename = "JOB_STATE_EXPIRED")]
    Expired,
    #[serde(rename = "JOB_STATE_UPDATING")]
    Updating,
    #[serde(rename = "JOB_STATE_PARTIALLY_SUCCEEDED")]
    PartiallySucceeded,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Succeeded
                | JobState::Failed
                | JobState::Cancelled
                | JobState::Expired
                | JobState::PartiallySucceeded
        )
    }
}

/// LoRA adapter rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdapterSize {
    #[serde(rename = "ADAPTER_SIZE_UNSPECIFIED")]
    Unspecified,
    #[serde(rename = "ADAPTER_SIZE_ONE")]
    One,
    #[serde(rename = "ADAPTER_SIZE_FOUR")]
    Four,
    #[serde(rename = "ADAPTER_SIZE_EIGHT")]
    Eight,
    #[serde(rename = "ADAPTER_SIZE_SIXTEEN")]
    Sixteen,
    #[serde(rename = "ADAPTER_SIZE_THIRTY_TWO")]
    ThirtyTwo,
}

impl AdapterSize {
    pub fn from_rank(rank: u32) -> Option<Self> {
        match rank {
            1 => Some(AdapterSize::One),
            4 => Some(AdapterSize::Four),
            8 => Some(AdapterSize::Eight),
            16 => Some(AdapterSize::Sixteen),
            32 => Some(AdapterSize::ThirtyTwo),
            _ => None,
        }
    }
}

// int64 fields arrive as JSON strings.
fn de_opt_u32<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<u32>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u32),
        Str(String),
    }
    match Option::<Raw>::deserialize(d)? {
        None => Ok(None),
        Some(Raw::Num(n)) => Ok(Some(n)),
        Some(Raw::Str(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisedHyperParameters {
    #[serde(default, deserialize_with = "de_opt_u32", skip_serializing_if = "Option::is_none")]
    pub epoch_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_rate_multiplier: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter_size: Option<AdapterSize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisedTuningSpec {
    pub training_dataset_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_dataset_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hyper_parameters: Option<SupervisedHyperParameters>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TunedModel {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub endpoint: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TuningJob {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuned_model_display_name: Option<String>,
    #[serde(default)]
    pub base_model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervised_tuning_spec: Option<SupervisedTuningSpec>,
    #[serde(default)]
    pub state: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuned_model: Option<TunedModel>,
}

impl TuningJob {
    pub fn resource_id(&self) -> &str {
        crate::resource::resource_id(&self.name)
    }

    pub fn has_ended(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn has_succeeded(&self) -> bool {
        self.state == JobState::Succeeded
    }

    pub fn tuned_model_name(&self) -> Option<&str> {
        self.tuned_model
            .as_ref()
            .map(|m| m.model.as_str())
            .filter(|m| !m.is_empty())
    }

    pub fn tuned_model_endpoint_name(&self) -> Option<&str> {
        self.tuned_model
            .as_ref()
            .map(|m| m.endpoint.as_str())
            .filter(|e| !e.is_empty())
    }
}

/// Parameters of a supervised fine-tuning run.
#[derive(Debug, Clone)]
pub struct SftTrainRequest {
    pub source_model: String,
    pub train_dataset: String,
    pub validation_dataset: Option<String>,
    pub tuned_model_display_name: Option<String>,
    pub epochs: Option<u32>,
    pub learning_rate_multiplier: Option<f64>,
    pub adapter_size: Option<AdapterSize>,
}

impl SftTrainRequest {
    pub fn new(source_model: impl Into<String>, train_dataset: impl Into<String>) -> Self {
        Self {
            source_model: source_model.into(),
            train_dataset: train_dataset.into(),
            validation_dataset: None,
            tuned_model_display_name: None,
            epochs: None,
            learning_rate_multiplier: None,
            adapter_size: None,
        }
    }

    pub fn with_validation_dataset(mut self, uri: impl Into<String>) -> Self {
        self.validation_dataset = Some(uri.into());
        self
    }

    pub fn with_tuned_model_display_name(mut self, name: impl Into<String>) -> Self {
        self.tuned_model_display_name = Some(name.into());
        self
    }

    pub fn with_epochs(mut self, epochs: u32) -> Self {
        self.epochs = Some(epochs);
        self
    }

    pub fn with_learning_rate_multiplier(mut self, multiplier: f64) -> Self {
        self.learning_rate_multiplier = Some(multiplier);
        self
    }

    pub fn with_adapter_size(mut self, size: AdapterSize) -> Self {
        self.adapter_size = Some(size);
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_dataset_uri("train_dataset", &self.train_dataset)?;
        if let Some(uri) = &self.validation_dataset {
            validate_dataset_uri("validation_dataset", uri)?;
        }
        if self.epochs == Some(0) {
            return Err(Error::validation_with_context(
                "epochs must be greater than zero",
                ErrorContext::new().with_field_path("epochs"),
            ));
        }
        if let Some(m) = self.learning_rate_multiplier {
            if !(m.is_finite() && m > 0.0) {
                return Err(Error::validation_with_context(
                    format!("learning rate multiplier must be positive, got {}", m),
                    ErrorContext::new().with_field_path("learning_rate_multiplier"),
                ));
            }
        }
        Ok(())
    }

    pub(crate) fn spec(&self) -> SupervisedTuningSpec {
        let hyper = SupervisedHyperParameters {
            epoch_count: self.epochs,
            learning_rate_multiplier: self.learning_rate_multiplier,
            adapter_size: self.adapter_size,
        };
        SupervisedTuningSpec {
            training_dataset_uri: self.train_dataset.clone(),
            validation_dataset_uri: self.validation_dataset.clone(),
            hyper_parameters: (hyper != SupervisedHyperParameters::default()).then_some(hyper),
        }
    }
}

fn validate_dataset_uri(field: &str, uri: &str) -> Result<()> {
    if uri.starts_with("gs://") && uri.len() > "gs://".len() && uri.ends_with(".jsonl") {
        return Ok(());
    }
    Err(Error::validation_with_context(
        format!("'{}' is not a Cloud Storage JSONL file", uri),
        ErrorContext::new()
            .with_field_path(field)
            .with_details("expected gs://bucket/path/file.jsonl"),
    ))
}

/// Publisher model id (`gemini-1.0-pro-002`) from any model reference form.
pub(crate) fn base_model_id(model: &str) -> Result<String> {
    let model = model.trim();
    let id = match model.rfind("/models/") {
        Some(idx) if model.contains("publishers/") => &model[idx + "/models/".len()..],
        Some(_) => model,
        None => model.strip_prefix("models/").unwrap_or(model),
    };
    if id.is_empty() || !crate::resource::is_valid_id(id) {
        return Err(Error::validation_with_context(
            format!("'{}' is not a tunable base model", model),
            ErrorContext::new().with_field_path("source_model"),
        ));
    }
    Ok(id.to_string())
}
