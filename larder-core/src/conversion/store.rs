use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

use super::{ConversionKey, ConversionRecord};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Conversion store unavailable: {0}")]
    Unavailable(String),

    #[error("Conversion store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt conversion record at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Refusing to store factor {factor} for unit '{unit}'")]
    InvalidFactor { unit: String, factor: f64 },
}

/// Persistence for [`ConversionRecord`]s.
///
/// `merge` must be atomic per key: two concurrent merges of different units
/// into the same record must both be visible afterwards.
#[async_trait]
pub trait ConversionStore: Send + Sync + std::fmt::Debug {
    async fn get(&self, key: &ConversionKey) -> Result<Option<ConversionRecord>, StoreError>;

    /// Merge `units` into the record for `key`, creating it if absent, and
    /// return the record as stored.
    async fn merge(
        &self,
        key: &ConversionKey,
        units: &BTreeMap<String, f64>,
    ) -> Result<ConversionRecord, StoreError>;

    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;
}
