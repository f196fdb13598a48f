//! Listing domain model.
//!
//! # Responsibility
//! - Define the canonical land listing record shared by every layer.
//! - Define contract terms and their durations.
//!
//! # Invariants
//! - `id` is assigned by the store and never reused inside one collection.
//! - `ContractType::Indefinite` listings carry no `expires_at`.
//! - Term contracts carry `expires_at == created_at + term` once stamped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned numeric identifier.
pub type ListingId = i64;

/// Validity term agreed with the listing owner.
///
/// Wire values follow the historical blob format (`6-months`, `1-year`,
/// `indefinite`); the spelled-out forms are accepted on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractType {
    #[serde(rename = "6-months", alias = "six-months")]
    SixMonths,
    #[serde(rename = "1-year", alias = "one-year")]
    OneYear,
    #[serde(rename = "indefinite")]
    Indefinite,
}

impl ContractType {
    pub const ALL: [ContractType; 3] = [Self::SixMonths, Self::OneYear, Self::Indefinite];

    /// Duration in calendar months, `None` for indefinite contracts.
    pub fn duration_months(self) -> Option<u32> {
        match self {
            Self::SixMonths => Some(6),
            Self::OneYear => Some(12),
            Self::Indefinite => None,
        }
    }

    /// Display label used by the site.
    pub fn label(self) -> &'static str {
        match self {
            Self::SixMonths => "6 meses",
            Self::OneYear => "1 ano",
            Self::Indefinite => "Indeterminado",
        }
    }

    /// Stable wire value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SixMonths => "6-months",
            Self::OneYear => "1-year",
            Self::Indefinite => "indefinite",
        }
    }

    /// Parses wire and spelled-out forms, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "6-months" | "six-months" => Some(Self::SixMonths),
            "1-year" | "one-year" => Some(Self::OneYear),
            "indefinite" => Some(Self::Indefinite),
            _ => None,
        }
    }
}

/// Canonical land listing record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Listing {
    pub id: ListingId,
    /// Legacy single-image field. Mirrors `images[0]` unless set explicitly.
    pub image_url: String,
    pub title: String,
    pub location: String,
    pub full_address: String,
    /// Opaque, already formatted price text.
    pub price: String,
    pub tags: Vec<String>,
    pub features: Vec<String>,
    pub description: String,
    pub area: String,
    pub solar_position: String,
    pub property_type: String,
    pub images: Vec<String>,
    /// Operator-chosen business code. Unique when non-empty.
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// `None` marks a legacy record with no lifecycle enforcement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_type: Option<ContractType>,
}

impl Listing {
    /// Normalized business code used for uniqueness checks.
    ///
    /// Returns `None` for blank codes, which are exempt from uniqueness.
    pub fn code_key(&self) -> Option<String> {
        normalize_code(&self.code)
    }

    /// Returns whether this listing's code collides with `other_code`.
    pub fn has_code(&self, other_code: &str) -> bool {
        match (self.code_key(), normalize_code(other_code)) {
            (Some(own), Some(other)) => own == other,
            _ => false,
        }
    }

    /// Image to show in cards: first image, falling back to `image_url`.
    pub fn cover_image(&self) -> Option<&str> {
        self.images
            .first()
            .map(String::as_str)
            .or_else(|| Some(self.image_url.as_str()).filter(|url| !url.is_empty()))
    }
}

/// Trims and lowercases a business code; blank codes normalize to `None`.
pub fn normalize_code(code: &str) -> Option<String> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}
