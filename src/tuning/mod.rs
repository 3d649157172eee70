//! Supervised fine-tuning jobs (`tuningJobs`).

mod service;
mod types;

pub use service::TuningService;
pub use types::{
    AdapterSize, JobState, SftTrainRequest, SupervisedHyperParameters, SupervisedTuningSpec,
    TunedModel, TuningJob,
};

pub(crate) const COLLECTION: &str = "tuningJobs";
