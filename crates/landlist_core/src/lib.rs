//! Core engine for the land listing catalog.
//! This crate is the single source of truth for listing invariants.

pub mod config;
pub mod db;
pub mod lifecycle;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod service;

pub use config::{
    ConfigError, EngineConfig, DEFAULT_STORAGE_KEY, MAX_EXPIRING_WINDOW_DAYS, MAX_EXTENSION_MONTHS,
};
pub use lifecycle::{
    days_until_expiration, format_expiration, is_expired, is_expiring_soon, partition,
    stamp_lifecycle, Clock, FixedClock, LifecycleStatus, Partition, SystemClock,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::listing::{normalize_code, ContractType, Listing, ListingId};
pub use model::sanitize::{sanitize, sanitize_all, sanitize_batch, SanitizedBatch, Sanitizer};
pub use model::seed::seed_records;
pub use notify::{LogSink, Notification, NotificationSink, RecordingSink, Severity};
pub use repo::{
    BlobStore, FileBlobStore, MemoryBlobStore, SqliteBlobStore, StorageError, StorageResult,
};
pub use service::listing_store::{
    ExpiringSummary, ListingStore, LoadReport, LoadSource, StoreError, StoreResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
