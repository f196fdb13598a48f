//! Listing lifecycle calculator.
//!
//! # Responsibility
//! - Stamp creation/expiration timestamps from a contract term.
//! - Classify listings as active, expiring soon, or expired.
//! - Split collections for the load-time expiration sweep.
//!
//! # Invariants
//! - Every function is pure; the current instant is always an argument.
//! - `partition` is stable within each output group.
//! - Listings without `expires_at` never expire.

pub mod calendar;
mod clock;

use chrono::{DateTime, Datelike, Duration, Utc};

use crate::model::listing::{ContractType, Listing};

pub use calendar::add_calendar_months;
pub use clock::{Clock, FixedClock, SystemClock};

/// Default look-ahead window for "expiring soon" reports.
pub const DEFAULT_EXPIRING_WINDOW_DAYS: i64 = 30;
/// Default extension granted by `extend` callers.
pub const DEFAULT_EXTENSION_MONTHS: u32 = 6;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

const MONTH_NAMES_PT_BR: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

/// Temporal classification of one listing at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStatus {
    /// No expiration tracked (legacy or indefinite contract).
    Untracked,
    Active,
    /// Expires within the look-ahead window.
    ExpiringSoon { days: i64 },
    Expired,
}

/// Output of the expiration sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub active: Vec<Listing>,
    pub expired: Vec<Listing>,
}

/// Stamps creation/expiration timestamps for `contract_type`, starting at `now`.
pub fn stamp_lifecycle(
    mut listing: Listing,
    contract_type: ContractType,
    now: DateTime<Utc>,
) -> Listing {
    listing.created_at = Some(now);
    listing.contract_type = Some(contract_type);
    listing.expires_at = contract_type
        .duration_months()
        .map(|months| add_calendar_months(now, months));
    listing
}

/// Returns whether the listing's expiration lies strictly before `now`.
pub fn is_expired(listing: &Listing, now: DateTime<Utc>) -> bool {
    listing.expires_at.is_some_and(|expires_at| expires_at < now)
}

/// Returns whether the listing expires within `window_days` after `now`.
pub fn is_expiring_soon(listing: &Listing, now: DateTime<Utc>, window_days: i64) -> bool {
    let Some(expires_at) = listing.expires_at else {
        return false;
    };
    let horizon = Duration::try_days(window_days)
        .and_then(|window| now.checked_add_signed(window))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    now < expires_at && expires_at <= horizon
}

/// Whole days until expiration, rounded up. Negative once expired.
pub fn days_until_expiration(listing: &Listing, now: DateTime<Utc>) -> Option<i64> {
    let expires_at = listing.expires_at?;
    let millis = expires_at.signed_duration_since(now).num_milliseconds();
    // Integer division truncates toward zero, which already is the ceiling
    // for negative values.
    let days = millis / MILLIS_PER_DAY;
    if millis % MILLIS_PER_DAY > 0 {
        Some(days + 1)
    } else {
        Some(days)
    }
}

/// Classifies one listing at `now`.
pub fn status(listing: &Listing, now: DateTime<Utc>, window_days: i64) -> LifecycleStatus {
    if listing.expires_at.is_none() {
        LifecycleStatus::Untracked
    } else if is_expired(listing, now) {
        LifecycleStatus::Expired
    } else if is_expiring_soon(listing, now, window_days) {
        LifecycleStatus::ExpiringSoon {
            days: days_until_expiration(listing, now).unwrap_or_default(),
        }
    } else {
        LifecycleStatus::Active
    }
}

/// Splits listings into active and expired groups, preserving order.
pub fn partition(listings: Vec<Listing>, now: DateTime<Utc>) -> Partition {
    let (expired, active): (Vec<Listing>, Vec<Listing>) = listings
        .into_iter()
        .partition(|listing| is_expired(listing, now));
    Partition { active, expired }
}

/// Pushes expiration forward by `additional_months`.
///
/// The base is the later of the current expiration and `now`, so an already
/// expired listing is extended from today rather than from the past.
pub fn extend(listing: &Listing, additional_months: u32, now: DateTime<Utc>) -> Listing {
    let base = listing
        .expires_at
        .map_or(now, |expires_at| expires_at.max(now));
    Listing {
        expires_at: Some(add_calendar_months(base, additional_months)),
        ..listing.clone()
    }
}

/// Human-readable expiration label in the site's locale.
pub fn format_expiration(listing: &Listing) -> String {
    match listing.expires_at {
        Some(expires_at) => format!(
            "{:02} de {} de {}",
            expires_at.day(),
            MONTH_NAMES_PT_BR[expires_at.month0() as usize],
            expires_at.year()
        ),
        None if listing.contract_type == Some(ContractType::Indefinite) => {
            "Sem prazo de validade".to_string()
        }
        None => "Sem data de expiração".to_string(),
    }
}
