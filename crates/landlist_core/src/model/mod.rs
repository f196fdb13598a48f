//! Listing domain model.
//!
//! # Responsibility
//! - Define the canonical listing shape and contract terms.
//! - Own the single boundary where untrusted records become typed listings.
//! - Provide the built-in seed collection.

pub mod listing;
pub mod sanitize;
pub mod seed;
