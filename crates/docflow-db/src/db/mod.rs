//! Database repositories for data access layer
//!
//! Each repository owns one domain entity: processing records, GDPR
//! compliance results, and sharing requests. Repositories are cheap to
//! clone (they hold a `PgPool` handle) and are constructed once at startup.

pub mod gdpr;
pub mod processing;
pub mod sharing;

pub use gdpr::GdprResultRepository;
pub use processing::ProcessingRepository;
pub use sharing::SharingRepository;
