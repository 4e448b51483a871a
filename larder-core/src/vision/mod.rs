//! Image label detection.
//!
//! Labels are short descriptions ("Bread", "Baked goods") used only as extra
//! context in the classification prompt.

mod cloud_vision;
mod fake;

pub use cloud_vision::CloudVisionDetector;
pub use fake::FakeLabelDetector;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::config::VisionConfig;
use crate::error::UpstreamError;

/// Trait for label detection services.
#[async_trait]
pub trait LabelDetector: Send + Sync + fmt::Debug {
    /// Detect labels for the image at `image_url`, most confident first.
    ///
    /// An empty list is a valid answer, not an error.
    async fn detect_labels(&self, image_url: &str) -> Result<Vec<String>, UpstreamError>;
}

/// Build the configured detector, or `None` if no API key is set.
pub fn create_detector(
    config: &VisionConfig,
) -> Result<Option<Arc<dyn LabelDetector>>, UpstreamError> {
    let Some(api_key) = config.api_key.clone() else {
        tracing::info!("VISION_API_KEY not set, image classification disabled");
        return Ok(None);
    };

    let detector = CloudVisionDetector::new(api_key, config.base_url.clone(), config.timeout)?;
    Ok(Some(Arc::new(detector)))
}
