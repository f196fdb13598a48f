//! Use-case layer over the persistence contracts.
//!
//! # Responsibility
//! - Orchestrate sanitization, lifecycle rules and persistence per operation.
//! - Report outcomes to the caller's notification sink.
//!
//! # Invariants
//! - Services stay storage-agnostic and depend only on `BlobStore`.

pub mod listing_store;
