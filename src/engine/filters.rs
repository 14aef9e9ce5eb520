//! Filtering and sorting over the canonical set
//!
//! Everything here is a pure function of its inputs and runs again on every
//! state change, including on partially hydrated records.

use crate::models::HotelRecord;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Pricing order, untouched
    #[default]
    Recommended,
    PriceAsc,
    PriceDesc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recommended" => Ok(Self::Recommended),
            "price-asc" => Ok(Self::PriceAsc),
            "price-desc" => Ok(Self::PriceDesc),
            other => Err(format!("unknown sort order {other:?}")),
        }
    }
}

/// `max: None` is the unbounded default
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub stars: BTreeSet<u8>,
    pub price: PriceRange,
    pub amenities: BTreeSet<String>,
    pub meal_plans: BTreeSet<String>,
}

impl FilterState {
    /// Any field off its default. `observed_max` is the highest price in the
    /// current canonical set, once pricing is known
    pub fn is_active(&self, observed_max: Option<f64>) -> bool {
        let max_narrowed = match (self.price.max, observed_max) {
            (Some(max), Some(observed)) => max < observed,
            (Some(_), None) => true,
            (None, _) => false,
        };
        !self.stars.is_empty()
            || !self.amenities.is_empty()
            || !self.meal_plans.is_empty()
            || self.price.min > 0.0
            || max_narrowed
    }

    /// Replace the unbounded upper price bound with the observed maximum
    pub fn narrow_price_max(&mut self, observed_max: Option<f64>) {
        if self.price.max.is_none() {
            self.price.max = observed_max;
        }
    }

    fn matches(&self, record: &HotelRecord) -> bool {
        if !self.stars.is_empty() && !self.stars.contains(&record.star_rating) {
            return false;
        }

        if self.price.min > 0.0 || self.price.max.is_some() {
            let Some(price) = record.primary_price() else {
                return false;
            };
            if price < self.price.min || self.price.max.is_some_and(|max| price > max) {
                return false;
            }
        }

        if !self.amenities.iter().all(|label| has_amenity(record, label)) {
            return false;
        }

        self.meal_plans.is_empty()
            || self.meal_plans.iter().any(|wanted| {
                let wanted = wanted.trim().to_lowercase();
                record.meal_plans.contains(&wanted)
            })
    }
}

/// How one amenity is recognised in provider data
#[derive(Debug)]
pub struct AmenityRule {
    pub key: &'static str,
    pub label: &'static str,
    /// Normalised phrases, matched on word boundaries
    pub keywords: &'static [&'static str],
    /// A raw string containing one of these never satisfies the rule
    pub negations: &'static [&'static str],
    /// Coarse provider flag that also satisfies the rule
    pub flag: Option<&'static str>,
}

pub const AMENITY_RULES: &[AmenityRule] = &[
    AmenityRule {
        key: "wifi",
        label: "Wi-Fi",
        keywords: &["wifi", "wi fi", "internet", "wireless"],
        negations: &[],
        flag: Some("has_internet"),
    },
    AmenityRule {
        key: "pool",
        label: "Pool",
        keywords: &["pool", "swimming"],
        negations: &[],
        flag: Some("has_pool"),
    },
    AmenityRule {
        key: "parking",
        label: "Parking",
        keywords: &["parking", "garage"],
        negations: &[],
        flag: Some("has_parking"),
    },
    AmenityRule {
        key: "airport_transfer",
        label: "Airport transfer",
        keywords: &[
            "airport transfer",
            "airport shuttle",
            "airport transport",
            "airport transportation",
        ],
        negations: &[],
        flag: Some("has_airport_transfer"),
    },
    AmenityRule {
        key: "pets",
        label: "Pets allowed",
        keywords: &["pets allowed", "pet friendly", "pets", "pet"],
        negations: &["not allowed", "no pets", "pets are not", "forbidden"],
        flag: Some("has_pets"),
    },
    AmenityRule {
        key: "fitness",
        label: "Fitness",
        keywords: &["fitness", "gym"],
        negations: &[],
        flag: Some("has_fitness"),
    },
    AmenityRule {
        key: "spa",
        label: "Spa",
        keywords: &["spa", "sauna", "wellness"],
        negations: &[],
        flag: Some("has_spa"),
    },
    AmenityRule {
        key: "kitchen",
        label: "Kitchen",
        keywords: &["kitchen", "kitchenette"],
        negations: &[],
        flag: Some("has_kitchen"),
    },
    AmenityRule {
        key: "accessible",
        label: "Accessible",
        keywords: &["wheelchair", "accessible", "disabled"],
        negations: &[],
        flag: Some("has_disabled_support"),
    },
    AmenityRule {
        key: "air_conditioning",
        label: "Air conditioning",
        keywords: &["air conditioning", "air conditioned", "aircon"],
        negations: &[],
        flag: None,
    },
    AmenityRule {
        key: "restaurant",
        label: "Restaurant",
        keywords: &["restaurant"],
        negations: &[],
        flag: None,
    },
];

/// Lowercase, punctuation to spaces, whitespace collapsed
pub fn normalize_text(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn compact(raw: &str) -> String {
    normalize_text(raw).replace(' ', "")
}

/// Rule for a selected amenity label, by key or label
pub fn rule_for(label: &str) -> Option<&'static AmenityRule> {
    let wanted = compact(label);
    AMENITY_RULES
        .iter()
        .find(|rule| compact(rule.key) == wanted || compact(rule.label) == wanted)
}

fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    format!(" {haystack} ").contains(&format!(" {phrase} "))
}

impl AmenityRule {
    fn matches_text(&self, amenity: &str) -> bool {
        let text = normalize_text(amenity);
        self.keywords.iter().any(|kw| contains_phrase(&text, kw))
            && !self.negations.iter().any(|neg| contains_phrase(&text, neg))
    }

    pub fn matches(&self, record: &HotelRecord) -> bool {
        record.amenities.iter().any(|amenity| self.matches_text(amenity))
            || self
                .flag
                .is_some_and(|flag| record.serp_filters.iter().any(|f| f == flag))
    }
}

/// Free-text match first, then the provider flag. Unknown labels match on their own text
pub fn has_amenity(record: &HotelRecord, label: &str) -> bool {
    match rule_for(label) {
        Some(rule) => rule.matches(record),
        None => {
            let phrase = normalize_text(label);
            !phrase.is_empty()
                && record
                    .amenities
                    .iter()
                    .any(|amenity| contains_phrase(&normalize_text(amenity), &phrase))
        }
    }
}

fn sortable_price(record: &HotelRecord) -> Option<f64> {
    if record.is_priced() {
        record.primary_price()
    } else {
        None
    }
}

/// Reorder by first-rate price. Records without a usable rate follow in their original order
pub fn sort_records(records: &mut Vec<&HotelRecord>, order: SortOrder) {
    if order == SortOrder::Recommended {
        return;
    }
    let (mut priced, rest): (Vec<&HotelRecord>, Vec<&HotelRecord>) = records
        .drain(..)
        .partition(|record| sortable_price(record).is_some());
    priced.sort_by(|a, b| {
        let (a, b) = (sortable_price(a), sortable_price(b));
        let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        if order == SortOrder::PriceDesc {
            ord.reverse()
        } else {
            ord
        }
    });
    records.extend(priced);
    records.extend(rest);
}

/// Filter then sort. With no active filter every record passes, whatever its pricing status
pub fn apply<'a>(
    records: &'a [HotelRecord],
    filters: &FilterState,
    order: SortOrder,
    observed_max: Option<f64>,
) -> Vec<&'a HotelRecord> {
    let mut out: Vec<&HotelRecord> = if filters.is_active(observed_max) {
        records
            .iter()
            .filter(|record| record.is_priced())
            .filter(|record| filters.matches(record))
            .collect()
    } else {
        records.iter().collect()
    };
    sort_records(&mut out, order);
    out
}
