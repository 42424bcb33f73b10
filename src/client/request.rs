use crate::config::ResponseFormat;
use crate::job::Job;
use serde::Serialize;

/// JSON body of `POST /v1/images/generations`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequestBody {
    pub model: String,
    pub prompt: String,
    pub aspect_ratio: String,
    pub image_size: String,
    pub size: String,
    pub response_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub image: Vec<String>,
}

impl GenerationRequestBody {
    pub fn from_job(job: &Job, format: ResponseFormat) -> Self {
        let params = job.params();
        Self {
            model: params.model.as_str().to_string(),
            prompt: job.prompt().to_string(),
            aspect_ratio: params.aspect_ratio.as_str().to_string(),
            image_size: params.resolution.as_str().to_string(),
            size: params.aspect_ratio.base_size().to_string(),
            response_format: format.as_str().to_string(),
            seed: params.seed.value(),
            image: params
                .references
                .iter()
                .map(|r| r.to_data_uri())
                .collect(),
        }
    }
}
