//! Fake label detector for testing.

use super::LabelDetector;
use crate::error::UpstreamError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Returns the same labels for every image.
#[derive(Debug, Default)]
pub struct FakeLabelDetector {
    labels: Vec<String>,
    calls: AtomicUsize,
}

impl FakeLabelDetector {
    pub fn with_labels(labels: &[&str]) -> Self {
        Self {
            labels: labels.iter().map(|l| l.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl LabelDetector for FakeLabelDetector {
    async fn detect_labels(&self, _image_url: &str) -> Result<Vec<String>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.labels.clone())
    }
}
