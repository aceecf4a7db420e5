//! Shared infrastructure for the document gateway:
//! - Serial request queue (paced dispatch towards the automation engine)
//! - Keyed file cache for analysis results
//! - Retry policy for webhook delivery
//! - Telemetry initialization

pub mod cache;
pub mod queue;
pub mod retry;
pub mod telemetry;

// Re-export commonly used types
pub use cache::{CacheEntry, ResultCache};
pub use queue::{QueueConfig, SerialRequestQueue};
pub use retry::RetryPolicy;
pub use telemetry::init_telemetry;
