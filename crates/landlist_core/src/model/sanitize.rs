//! Boundary normalization for untrusted listing records.
//!
//! # Responsibility
//! - Turn any JSON value into a structurally valid `Listing`.
//! - Coerce legacy shapes (single `imageUrl`, comma-separated tags/features).
//! - Synthesize ids for records that lack a usable one.
//!
//! # Invariants
//! - Never fails and never panics, whatever the input shape.
//! - Idempotent: re-sanitizing a sanitized listing yields the same listing.
//! - Ids handed out by one `Sanitizer` never collide with each other nor with
//!   ids reserved up front.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::lifecycle::add_calendar_months;
use crate::model::listing::{ContractType, Listing, ListingId};

/// Batch-scoped sanitizer owning the id synthesis counter.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    next_id: ListingId,
    reserved: HashSet<ListingId>,
    assigned: HashSet<ListingId>,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sanitizer {
    /// Creates a sanitizer whose synthesized ids start at the current epoch millis.
    pub fn new() -> Self {
        Self::seeded(Utc::now().timestamp_millis())
    }

    /// Creates a sanitizer with an explicit id counter seed.
    pub fn seeded(seed: ListingId) -> Self {
        Self {
            next_id: seed,
            reserved: HashSet::new(),
            assigned: HashSet::new(),
        }
    }

    /// Marks ids that synthesized ids must avoid.
    pub fn reserve(&mut self, ids: impl IntoIterator<Item = ListingId>) {
        self.reserved.extend(ids);
    }

    /// Normalizes one raw record.
    ///
    /// An explicit id already handed out by this sanitizer is treated as
    /// missing, so one batch never yields duplicate ids.
    pub fn sanitize(&mut self, raw: &Value) -> Listing {
        let id = match explicit_id(raw) {
            Some(id) if self.assigned.insert(id) => id,
            _ => self.synthesize_id(),
        };

        let images = resolve_images(raw);
        let image_url = match raw.get("imageUrl") {
            Some(Value::String(url)) => url.clone(),
            _ => images.first().cloned().unwrap_or_default(),
        };

        let contract_type = raw
            .get("contractType")
            .and_then(Value::as_str)
            .and_then(ContractType::parse);
        let created_at = raw.get("createdAt").and_then(parse_timestamp);
        let expires_at = normalize_expiration(
            contract_type,
            created_at,
            raw.get("expiresAt").and_then(parse_timestamp),
        );

        Listing {
            id,
            image_url,
            title: text_field(raw, "title"),
            location: text_field(raw, "location"),
            full_address: text_field(raw, "fullAddress"),
            price: text_field(raw, "price"),
            tags: string_list(raw.get("tags")),
            features: string_list(raw.get("features")),
            description: text_field(raw, "description"),
            area: text_field(raw, "area"),
            solar_position: text_field(raw, "solarPosition"),
            property_type: text_field(raw, "propertyType"),
            images,
            code: text_field(raw, "code"),
            created_at,
            expires_at,
            contract_type,
        }
    }

    fn synthesize_id(&mut self) -> ListingId {
        loop {
            let candidate = self.next_id;
            self.next_id = self.next_id.wrapping_add(1);
            if !self.reserved.contains(&candidate) && self.assigned.insert(candidate) {
                return candidate;
            }
        }
    }
}

/// Sanitizes a single record with a fresh sanitizer.
pub fn sanitize(raw: &Value) -> Listing {
    Sanitizer::new().sanitize(raw)
}

/// Sanitizes a batch, keeping explicit ids and giving every record a unique id.
pub fn sanitize_all(raws: &[Value]) -> Vec<Listing> {
    sanitize_batch(raws).listings
}

/// Result of sanitizing a stored batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedBatch {
    pub listings: Vec<Listing>,
    /// At least one record differs from its canonical wire form (synthesized
    /// id, legacy shape, derived expiration...), so the batch should be
    /// written back.
    pub changed: bool,
}

/// Like `sanitize_all`, also reporting whether any record was rewritten.
pub fn sanitize_batch(raws: &[Value]) -> SanitizedBatch {
    let mut sanitizer = Sanitizer::new();
    sanitizer.reserve(raws.iter().filter_map(explicit_id));

    let mut changed = false;
    let listings = raws
        .iter()
        .map(|raw| {
            let listing = sanitizer.sanitize(raw);
            changed |= !is_canonical(&listing, raw);
            listing
        })
        .collect();
    SanitizedBatch { listings, changed }
}

fn is_canonical(listing: &Listing, raw: &Value) -> bool {
    serde_json::to_value(listing).is_ok_and(|value| &value == raw)
}

/// Returns the record's id when it is an integral JSON number.
fn explicit_id(raw: &Value) -> Option<ListingId> {
    let Value::Number(number) = raw.get("id")? else {
        return None;
    };
    if let Some(id) = number.as_i64() {
        return Some(id);
    }
    let float = number.as_f64()?;
    let in_range = float >= i64::MIN as f64 && float < i64::MAX as f64;
    (float.is_finite() && float.fract() == 0.0 && in_range).then_some(float as i64)
}

fn resolve_images(raw: &Value) -> Vec<String> {
    match raw.get("images") {
        Some(Value::Array(items)) => items.iter().filter_map(truthy_string).collect(),
        _ => raw
            .get("imageUrl")
            .and_then(truthy_string)
            .into_iter()
            .collect(),
    }
}

fn normalize_expiration(
    contract_type: Option<ContractType>,
    created_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    match contract_type {
        Some(ContractType::Indefinite) => None,
        Some(term) if expires_at.is_none() => {
            let months = term.duration_months()?;
            created_at.map(|created_at| add_calendar_months(created_at, months))
        }
        _ => expires_at,
    }
}

/// Scalar coercion used for free-text fields; containers become empty text.
fn text_field(raw: &Value, key: &str) -> String {
    match raw.get(key) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => String::new(),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_string).collect(),
        Some(Value::String(joined)) => joined
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Truthy scalars as strings: non-empty text, non-zero numbers, `true`.
fn truthy_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) if number.as_f64().is_some_and(|n| n != 0.0) => {
            Some(number.to_string())
        }
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => DateTime::parse_from_rfc3339(text.trim())
            .ok()
            .map(|parsed| parsed.with_timezone(&Utc)),
        Value::Number(number) => number.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}
