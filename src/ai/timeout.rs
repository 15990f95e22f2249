//! Unified Timeout Configuration
//!
//! Centralized timeout management:
//! - one per-section timeout for generative calls
//! - one aggregate timeout for the data-gathering phase
//! - no timeout for composition (CPU-bound, bounded by input size)
//!
//! ## Usage
//!
//! ```ignore
//! use crate::ai::timeout::{TimeoutConfig, with_timeout};
//!
//! let config = TimeoutConfig::from_config(&config);
//! let result = with_timeout(
//!     config.section_generation,
//!     async { /* LLM call */ },
//!     "section generation"
//! ).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::config::Config;
use crate::constants::{collection, generation};
use crate::types::{ReportError, Result};

/// Timeouts applied by the report pipeline
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Budget for one section's generation, retry included
    pub section_generation: Duration,
    /// Budget for all collector reads of one report
    pub collection: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            section_generation: Duration::from_secs(generation::DEFAULT_SECTION_TIMEOUT_SECS),
            collection: Duration::from_secs(collection::DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl TimeoutConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            section_generation: config.generation.section_timeout(),
            collection: config.collection.timeout(),
        }
    }
}

/// Execute an async operation with a timeout
///
/// Returns a timeout error if the operation doesn't complete within the specified duration.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(ReportError::timeout(operation_name, timeout)),
    }
}
