//! Google Cloud Vision label detection (images:annotate endpoint).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::LabelDetector;
use crate::error::UpstreamError;
use crate::llm::truncate_chars;

const MAX_LABELS: u32 = 10;
const MAX_OBJECTS: u32 = 5;

/// Cloud Vision API client.
#[derive(Debug)]
pub struct CloudVisionDetector {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl CloudVisionDetector {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::NotConfigured(format!("HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[derive(Debug, Serialize)]
struct AnnotateRequest {
    requests: Vec<ImageRequest>,
}

#[derive(Debug, Serialize)]
struct ImageRequest {
    image: Image,
    features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
struct Image {
    source: ImageSource,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageSource {
    image_uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Feature {
    #[serde(rename = "type")]
    feature_type: &'static str,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    label_annotations: Vec<LabelAnnotation>,
}

#[derive(Debug, Deserialize)]
struct LabelAnnotation {
    description: String,
}

#[async_trait]
impl LabelDetector for CloudVisionDetector {
    async fn detect_labels(&self, image_url: &str) -> Result<Vec<String>, UpstreamError> {
        let request = AnnotateRequest {
            requests: vec![ImageRequest {
                image: Image {
                    source: ImageSource {
                        image_uri: image_url.to_string(),
                    },
                },
                features: vec![
                    Feature {
                        feature_type: "LABEL_DETECTION",
                        max_results: MAX_LABELS,
                    },
                    Feature {
                        feature_type: "OBJECT_LOCALIZATION",
                        max_results: MAX_OBJECTS,
                    },
                ],
            }],
        };

        let response = self
            .client
            .post(format!("{}/images:annotate", self.base_url))
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| UpstreamError::Unavailable(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::Unavailable(e.without_url().to_string()))?;

        if !status.is_success() {
            return Err(UpstreamError::Rejected {
                status: status.as_u16(),
                message: truncate_chars(&body, 200),
            });
        }

        let parsed: AnnotateResponse =
            serde_json::from_str(&body).map_err(|_| UpstreamError::Empty)?;

        let labels: Vec<String> = parsed
            .responses
            .into_iter()
            .next()
            .map(|r| {
                r.label_annotations
                    .into_iter()
                    .map(|l| l.description)
                    .collect()
            })
            .unwrap_or_default();

        tracing::debug!(count = labels.len(), "Vision labels detected");
        Ok(labels)
    }
}
