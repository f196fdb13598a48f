//! Listing store: the only mutation surface over the listing collection.
//!
//! # Responsibility
//! - Load the persisted collection, sanitize it and sweep expired listings.
//! - Enforce id and business-code uniqueness on add/update.
//! - Keep memory and the blob store in sync after every mutation.
//!
//! # Invariants
//! - Every mutation writes the full collection before touching memory, so a
//!   failed write leaves the in-memory collection unchanged.
//! - `id` values are unique; non-empty codes are unique after trim/lowercase.
//! - Collection order is insertion order; updates replace in place.
//! - `load` never fails; unreadable blobs fall back to the seed without
//!   overwriting what is stored. A readable blob that needed sanitizing
//!   (synthesized ids, legacy shapes) is written back so ids stay stable
//!   across processes.
//! - Lifecycle fields are owned by the store: `add` stamps them from the
//!   contract term, `update` keeps the stored ones unless the term changes.

use crate::config::EngineConfig;
use crate::lifecycle::{
    self, days_until_expiration, is_expiring_soon, partition, stamp_lifecycle, Clock, Partition,
    SystemClock,
};
use crate::model::listing::{ContractType, Listing, ListingId};
use crate::model::sanitize::{sanitize, sanitize_all, sanitize_batch, SanitizedBatch};
use crate::model::seed::seed_records;
use crate::notify::{Notification, NotificationSink, Severity};
use crate::repo::{BlobStore, StorageError};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use rand::Rng;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Random spread added to the millisecond clock when minting ids.
const ID_SPREAD: i64 = 1000;
const ID_RANDOM_ATTEMPTS: usize = 16;

pub type StoreResult<T> = Result<T, StoreError>;

/// Refusal or failure of a store operation.
#[derive(Debug)]
pub enum StoreError {
    /// Another listing already uses this business code.
    DuplicateCode(String),
    /// No listing carries this id.
    NotFound(ListingId),
    /// Persisted blob is not a JSON array of records.
    MalformedBlob(String),
    Storage(StorageError),
    Serialize(serde_json::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateCode(code) => write!(f, "listing code already in use: `{code}`"),
            Self::NotFound(id) => write!(f, "listing not found: {id}"),
            Self::MalformedBlob(reason) => write!(f, "malformed listing blob: {reason}"),
            Self::Storage(err) => write!(f, "{err}"),
            Self::Serialize(err) => write!(f, "failed to serialize listings: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::Serialize(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for StoreError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

/// Where `load` took the collection from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Blob existed and parsed.
    Persisted,
    /// No blob yet; the seed was loaded and written.
    Seed,
    /// Blob could not be read or parsed; seed shown, storage left untouched.
    SeedFallback,
}

/// Listings close to expiration after a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiringSummary {
    pub count: usize,
    /// Days left for the listing that expires first.
    pub earliest_days: i64,
}

/// Outcome of `ListingStore::load`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub source: LoadSource,
    pub active_count: usize,
    /// Listings removed by the expiration sweep.
    pub expired: Vec<Listing>,
    pub expiring_soon: Option<ExpiringSummary>,
    /// Whether the collection was written back during this load.
    pub persisted: bool,
}

/// Owner of the listing collection and its persistence.
pub struct ListingStore<S: BlobStore, N: NotificationSink> {
    blobs: S,
    sink: N,
    clock: Box<dyn Clock>,
    config: EngineConfig,
    seed: Vec<Value>,
    listings: Vec<Listing>,
}

impl<S: BlobStore, N: NotificationSink> ListingStore<S, N> {
    /// Creates an empty store with default configuration. Call `load` next.
    pub fn new(blobs: S, sink: N) -> Self {
        Self::with_config(EngineConfig::default(), blobs, sink)
    }

    pub fn with_config(config: EngineConfig, blobs: S, sink: N) -> Self {
        Self {
            blobs,
            sink,
            clock: Box::new(SystemClock),
            config,
            seed: seed_records(),
            listings: Vec::new(),
        }
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replaces the built-in seed records.
    pub fn with_seed(mut self, seed: Vec<Value>) -> Self {
        self.seed = seed;
        self
    }

    /// Loads the persisted collection and sweeps expired listings.
    pub fn load(&mut self) -> LoadReport {
        let started_at = Instant::now();
        let now = self.clock.now();

        let (source, loaded, rewritten) = match self.read_persisted() {
            Ok(Some(batch)) => (LoadSource::Persisted, batch.listings, batch.changed),
            Ok(None) => (LoadSource::Seed, self.seed_listings(), true),
            Err(err) => {
                warn!(
                    "event=store_load module=store status=fallback key={} error={err}",
                    self.config.storage_key
                );
                self.report(
                    Severity::Warning,
                    "Saved listings could not be read; showing the default listings.",
                );
                (LoadSource::SeedFallback, self.seed_listings(), false)
            }
        };

        let Partition { active, expired } = partition(loaded, now);
        let should_persist = match source {
            LoadSource::Persisted | LoadSource::Seed => rewritten || !expired.is_empty(),
            LoadSource::SeedFallback => false,
        };

        let mut persisted = false;
        if should_persist {
            match self.write(&active) {
                Ok(()) => persisted = true,
                Err(err) => {
                    error!(
                        "event=store_persist module=store status=error op=load error={err}"
                    );
                    self.report(
                        Severity::Error,
                        format!("Listings could not be saved: {err}"),
                    );
                }
            }
        }
        self.listings = active;

        if !expired.is_empty() {
            self.report(
                Severity::Info,
                format!(
                    "{} expired listing(s) removed automatically.",
                    expired.len()
                ),
            );
        }

        let expiring_soon = self.expiring_summary(now);
        if let Some(summary) = expiring_soon {
            self.report(
                Severity::Info,
                format!(
                    "{} listing(s) expiring soon; the next one expires in {} day(s).",
                    summary.count, summary.earliest_days
                ),
            );
        }

        info!(
            "event=store_load module=store status=ok source={source:?} active={} expired={} persisted={persisted} duration_ms={}",
            self.listings.len(),
            expired.len(),
            started_at.elapsed().as_millis()
        );

        LoadReport {
            source,
            active_count: self.listings.len(),
            expired,
            expiring_soon,
            persisted,
        }
    }

    /// Adds a new listing, assigning a fresh id and stamping its lifecycle.
    ///
    /// Any id or timestamps carried by `draft` are ignored. The term is
    /// `contract_type`, falling back to `draft.contract_type`; without one
    /// the listing is untracked.
    ///
    /// # Errors
    /// - `DuplicateCode` when another listing uses the same code.
    /// - `Storage`/`Serialize` when the collection cannot be written.
    pub fn add(
        &mut self,
        draft: Listing,
        contract_type: Option<ContractType>,
    ) -> StoreResult<Listing> {
        if self.code_taken(&draft.code, None) {
            warn!(
                "event=store_add module=store status=rejected reason=duplicate_code code={}",
                draft.code.trim()
            );
            self.report(
                Severity::Error,
                "A listing with this code already exists. Use a unique code.",
            );
            return Err(StoreError::DuplicateCode(draft.code.trim().to_string()));
        }

        let now = self.clock.now();
        let contract_type = contract_type.or(draft.contract_type);
        let mut listing = canonical(draft)?;
        listing.id = self.fresh_id(now);
        listing = match contract_type {
            Some(contract_type) => stamp_lifecycle(listing, contract_type, now),
            None => Listing {
                created_at: None,
                expires_at: None,
                contract_type: None,
                ..listing
            },
        };

        let mut next = self.listings.clone();
        next.push(listing.clone());
        self.commit(next, "add")?;

        info!(
            "event=store_add module=store status=ok id={} contract={}",
            listing.id,
            listing.contract_type.map_or("none", ContractType::as_str)
        );
        self.report(Severity::Success, "Listing registered successfully!");
        Ok(listing)
    }

    /// Replaces the listing with the same id, keeping its position.
    ///
    /// `created_at`/`expires_at` come from the stored listing. Changing
    /// `contract_type` restarts the term at the current instant; clearing it
    /// drops the expiration. Use `extend` to move an expiration.
    ///
    /// # Errors
    /// - `NotFound` when no listing has `listing.id`.
    /// - `DuplicateCode` when a different listing uses the same code.
    /// - `Storage`/`Serialize` when the collection cannot be written.
    pub fn update(&mut self, listing: Listing) -> StoreResult<()> {
        let Some(index) = self.position(listing.id) else {
            warn!(
                "event=store_update module=store status=rejected reason=not_found id={}",
                listing.id
            );
            self.report(Severity::Error, "Listing not found.");
            return Err(StoreError::NotFound(listing.id));
        };
        if self.code_taken(&listing.code, Some(listing.id)) {
            warn!(
                "event=store_update module=store status=rejected reason=duplicate_code id={} code={}",
                listing.id,
                listing.code.trim()
            );
            self.report(
                Severity::Error,
                "Another listing already uses this code. Change the code to continue.",
            );
            return Err(StoreError::DuplicateCode(listing.code.trim().to_string()));
        }

        let stored = &self.listings[index];
        let (created_at, expires_at, stored_term) =
            (stored.created_at, stored.expires_at, stored.contract_type);
        let mut listing = canonical(listing)?;
        if listing.contract_type == stored_term {
            listing.created_at = created_at;
            listing.expires_at = expires_at;
        } else if let Some(contract_type) = listing.contract_type {
            listing = stamp_lifecycle(listing, contract_type, self.clock.now());
        } else {
            listing.created_at = created_at;
            listing.expires_at = None;
        }

        let id = listing.id;
        let mut next = self.listings.clone();
        next[index] = listing;
        self.commit(next, "update")?;

        info!("event=store_update module=store status=ok id={id}");
        self.report(Severity::Success, "Listing updated successfully!");
        Ok(())
    }

    /// Removes the listing with `id`. Returns whether anything was removed.
    ///
    /// Deleting an unknown id is not an error; the collection is still
    /// written back.
    pub fn delete(&mut self, id: ListingId) -> StoreResult<bool> {
        let next: Vec<Listing> = self
            .listings
            .iter()
            .filter(|listing| listing.id != id)
            .cloned()
            .collect();
        let removed = next.len() != self.listings.len();
        self.commit(next, "delete")?;

        info!("event=store_delete module=store status=ok id={id} removed={removed}");
        if removed {
            self.report(Severity::Info, "Listing deleted.");
        }
        Ok(removed)
    }

    /// Replaces the whole collection with the sanitized seed.
    pub fn reset(&mut self) -> StoreResult<()> {
        let next = self.seed_listings();
        let count = next.len();
        self.commit(next, "reset")?;

        info!("event=store_reset module=store status=ok count={count}");
        self.report(Severity::Info, "Data reset to the default listings.");
        Ok(())
    }

    /// Pushes one listing's expiration forward by `additional_months`.
    ///
    /// # Errors
    /// - `NotFound` when no listing has `id`.
    /// - `Storage`/`Serialize` when the collection cannot be written.
    pub fn extend(&mut self, id: ListingId, additional_months: u32) -> StoreResult<Listing> {
        let Some(index) = self.position(id) else {
            warn!("event=store_extend module=store status=rejected reason=not_found id={id}");
            self.report(Severity::Error, "Listing not found.");
            return Err(StoreError::NotFound(id));
        };

        let now = self.clock.now();
        let extended = lifecycle::extend(&self.listings[index], additional_months, now);
        let mut next = self.listings.clone();
        next[index] = extended.clone();
        self.commit(next, "extend")?;

        info!("event=store_extend module=store status=ok id={id} months={additional_months}");
        self.report(
            Severity::Success,
            format!(
                "Listing valid until {}.",
                lifecycle::format_expiration(&extended)
            ),
        );
        Ok(extended)
    }

    /// Current collection in display order.
    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub fn get(&self, id: ListingId) -> Option<&Listing> {
        self.listings.iter().find(|listing| listing.id == id)
    }

    /// Finds a listing by business code (trimmed, case-insensitive).
    pub fn find_by_code(&self, code: &str) -> Option<&Listing> {
        self.listings.iter().find(|listing| listing.has_code(code))
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    /// Listings expiring within the configured window, earliest first.
    pub fn expiring_soon(&self) -> Vec<&Listing> {
        let now = self.clock.now();
        let window = self.config.expiring_window_days;
        let mut soon: Vec<&Listing> = self
            .listings
            .iter()
            .filter(|listing| is_expiring_soon(listing, now, window))
            .collect();
        soon.sort_by_key(|listing| listing.expires_at);
        soon
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sink(&self) -> &N {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut N {
        &mut self.sink
    }

    pub fn blob_store(&self) -> &S {
        &self.blobs
    }

    fn read_persisted(&self) -> StoreResult<Option<SanitizedBatch>> {
        let Some(blob) = self.blobs.get_blob(&self.config.storage_key)? else {
            return Ok(None);
        };
        match serde_json::from_str::<Value>(&blob) {
            Ok(Value::Array(records)) => Ok(Some(sanitize_batch(&records))),
            Ok(_) => Err(StoreError::MalformedBlob(
                "expected a JSON array".to_string(),
            )),
            Err(err) => Err(StoreError::MalformedBlob(err.to_string())),
        }
    }

    fn seed_listings(&self) -> Vec<Listing> {
        sanitize_all(&self.seed)
    }

    fn write(&mut self, listings: &[Listing]) -> StoreResult<()> {
        let blob = serde_json::to_string(listings)?;
        self.blobs.set_blob(&self.config.storage_key, &blob)?;
        Ok(())
    }

    /// Persists `next`, then makes it the in-memory collection.
    fn commit(&mut self, next: Vec<Listing>, op: &str) -> StoreResult<()> {
        if let Err(err) = self.write(&next) {
            error!("event=store_persist module=store status=error op={op} error={err}");
            self.report(
                Severity::Error,
                format!("Changes could not be saved: {err}"),
            );
            return Err(err);
        }
        self.listings = next;
        Ok(())
    }

    fn position(&self, id: ListingId) -> Option<usize> {
        self.listings.iter().position(|listing| listing.id == id)
    }

    fn code_taken(&self, code: &str, except: Option<ListingId>) -> bool {
        self.listings
            .iter()
            .filter(|listing| Some(listing.id) != except)
            .any(|listing| listing.has_code(code))
    }

    fn fresh_id(&self, now: DateTime<Utc>) -> ListingId {
        let base = now.timestamp_millis();
        let mut rng = rand::thread_rng();
        for _ in 0..ID_RANDOM_ATTEMPTS {
            let candidate = base.saturating_add(rng.gen_range(0..ID_SPREAD));
            if self.position(candidate).is_none() {
                return candidate;
            }
        }
        fallback_id(&self.listings, base)
    }

    fn expiring_summary(&self, now: DateTime<Utc>) -> Option<ExpiringSummary> {
        let window = self.config.expiring_window_days;
        let days: Vec<i64> = self
            .listings
            .iter()
            .filter(|listing| is_expiring_soon(listing, now, window))
            .filter_map(|listing| days_until_expiration(listing, now))
            .collect();
        let earliest_days = days.iter().copied().min()?;
        Some(ExpiringSummary {
            count: days.len(),
            earliest_days,
        })
    }

    fn report(&mut self, severity: Severity, message: impl Into<String>) {
        self.sink.notify(Notification::new(severity, message));
    }
}

/// Runs a caller-built listing through the boundary sanitizer.
///
/// Empty `images`/`image_url` count as not provided, so either one is
/// mirrored from the other.
fn canonical(listing: Listing) -> StoreResult<Listing> {
    let mut value = serde_json::to_value(&listing)?;
    if let Value::Object(record) = &mut value {
        if listing.image_url.is_empty() {
            record.remove("imageUrl");
        }
        if listing.images.is_empty() {
            record.remove("images");
        }
    }
    Ok(sanitize(&value))
}

/// First free id above every existing one, or the smallest free positive id
/// once that would overflow.
fn fallback_id(listings: &[Listing], base: ListingId) -> ListingId {
    let taken = |candidate: ListingId| listings.iter().any(|listing| listing.id == candidate);
    let highest = listings
        .iter()
        .map(|listing| listing.id)
        .max()
        .map_or(base, |max| max.max(base));
    highest
        .checked_add(1)
        .filter(|candidate| !taken(*candidate))
        .or_else(|| (1..=ListingId::MAX).find(|candidate| !taken(*candidate)))
        .unwrap_or(base)
}
