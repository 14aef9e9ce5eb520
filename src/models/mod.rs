use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SearchError;

/// External hotel identifier, trimmed on construction so it can be used as a dedupe key
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct HotelId(String);

impl HotelId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for HotelId {
    fn from(raw: String) -> Self {
        let trimmed = raw.trim();
        if trimmed.len() == raw.len() {
            Self(raw)
        } else {
            Self(trimmed.to_string())
        }
    }
}

impl From<&str> for HotelId {
    fn from(raw: &str) -> Self {
        Self(raw.trim().to_string())
    }
}

impl From<HotelId> for String {
    fn from(id: HotelId) -> Self {
        id.0
    }
}

impl fmt::Display for HotelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pricing state of a record in the result set
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PricingStatus {
    /// Shown before pricing resolved
    Loading,
    /// At least one rate exists for the current query
    Priced,
    /// Pricing was fetched and this hotel had no offer in it
    SoldOut,
}

/// One priced offer for the current query
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Rate {
    pub room_name: String,
    pub meal: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub daily_prices: Vec<f64>,
}

/// A hotel returned by the catalog listing for a region, with no pricing guarantee
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub id: HotelId,
    pub name: Option<String>,
    /// Approximated from the provider's class field
    pub star_rating: Option<u8>,
}

/// Last-known catalog data for one hotel
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CatalogPayload {
    pub id: HotelId,
    pub name: Option<String>,
    pub address: Option<String>,
    pub star_rating: Option<u8>,
    pub images: Vec<String>,
    pub amenities: Vec<String>,
    pub description: Option<String>,
    pub check_in_time: Option<String>,
    pub check_out_time: Option<String>,
    pub serp_filters: Vec<String>,
}

/// A hotel as returned by the pricing service
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PricedHotel {
    pub id: HotelId,
    pub name: Option<String>,
    pub star_rating: Option<u8>,
    pub rates: Vec<Rate>,
    pub serp_filters: Vec<String>,
}

/// Canonical unit of the result set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HotelRecord {
    pub id: HotelId,
    pub name: String,
    pub address: String,
    pub star_rating: u8,
    pub images: Vec<String>,
    pub amenities: Vec<String>,
    pub description: String,
    pub check_in_time: Option<String>,
    pub check_out_time: Option<String>,
    pub rates: Vec<Rate>,
    pub pricing_status: PricingStatus,
    pub meal_plans: Vec<String>,
    pub serp_filters: Vec<String>,
}

impl HotelRecord {
    /// Bare record for an id, before any source has contributed fields
    pub fn placeholder(id: HotelId, pricing_status: PricingStatus) -> Self {
        Self {
            id,
            name: String::new(),
            address: String::new(),
            star_rating: 0,
            images: Vec::new(),
            amenities: Vec::new(),
            description: String::new(),
            check_in_time: None,
            check_out_time: None,
            rates: Vec::new(),
            pricing_status,
            meal_plans: Vec::new(),
            serp_filters: Vec::new(),
        }
    }

    /// Price of the first rate, which is the representative offer for display, sort and filter
    pub fn primary_price(&self) -> Option<f64> {
        self.rates
            .first()
            .and_then(|rate| rate.amount)
            .filter(|amount| amount.is_finite() && *amount >= 0.0)
    }

    /// Replace the offers, re-deriving meal plans and pricing status
    pub fn set_rates(&mut self, rates: Vec<Rate>) {
        self.meal_plans = meal_plans(&rates);
        self.pricing_status = if rates.is_empty() {
            PricingStatus::SoldOut
        } else {
            PricingStatus::Priced
        };
        self.rates = rates;
    }

    pub fn mark_sold_out(&mut self) {
        self.set_rates(Vec::new());
    }

    pub fn is_priced(&self) -> bool {
        self.pricing_status == PricingStatus::Priced
    }
}

/// Distinct meal codes in rate order
pub fn meal_plans(rates: &[Rate]) -> Vec<String> {
    let mut plans: Vec<String> = Vec::new();
    for meal in rates.iter().filter_map(|rate| rate.meal.as_deref()) {
        let meal = meal.trim().to_lowercase();
        if !meal.is_empty() && !plans.contains(&meal) {
            plans.push(meal);
        }
    }
    plans
}

/// One room of the party
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuestRoom {
    pub adults: u8,
    /// Ages of the children sharing the room
    #[serde(default)]
    pub children: Vec<u8>,
}

/// Where to search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchTarget {
    Region { region_id: String },
    Geo { latitude: f64, longitude: f64, radius_m: u32 },
}

impl SearchTarget {
    pub fn region_id(&self) -> Option<&str> {
        match self {
            Self::Region { region_id } => Some(region_id),
            Self::Geo { .. } => None,
        }
    }
}

/// Parameters of one search run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchParams {
    pub target: SearchTarget,
    pub checkin: NaiveDate,
    pub checkout: NaiveDate,
    pub guests: Vec<GuestRoom>,
    /// Lowercase ISO country code of the traveller
    pub residency: String,
    /// ISO 4217 currency code
    pub currency: String,
}

impl SearchParams {
    /// Reject parameters no provider could price
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.checkout <= self.checkin {
            return Err(SearchError::InvalidParams(format!(
                "checkout {} must be after checkin {}",
                self.checkout, self.checkin
            )));
        }
        if self.guests.is_empty() || self.guests.iter().any(|room| room.adults == 0) {
            return Err(SearchError::InvalidParams(
                "every room needs at least one adult".to_string(),
            ));
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(SearchError::InvalidParams(format!(
                "invalid currency code {:?}",
                self.currency
            )));
        }
        match &self.target {
            SearchTarget::Region { region_id } if region_id.trim().is_empty() => Err(
                SearchError::InvalidParams("region id is empty".to_string()),
            ),
            SearchTarget::Geo { radius_m: 0, .. } => Err(SearchError::InvalidParams(
                "geo radius must be positive".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(meal: &str, amount: Option<f64>) -> Rate {
        Rate {
            room_name: "Standard".to_string(),
            meal: Some(meal.to_string()),
            amount,
            currency: Some("EUR".to_string()),
            daily_prices: Vec::new(),
        }
    }

    fn params() -> SearchParams {
        SearchParams {
            target: SearchTarget::Region {
                region_id: "2734".to_string(),
            },
            checkin: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            checkout: NaiveDate::from_ymd_opt(2026, 11, 5).unwrap(),
            guests: vec![GuestRoom {
                adults: 2,
                children: vec![],
            }],
            residency: "gb".to_string(),
            currency: "EUR".to_string(),
        }
    }

    #[test]
    fn hotel_ids_are_trimmed() {
        assert_eq!(HotelId::from("  h-1 "), HotelId::from("h-1"));
        assert_eq!(HotelId::from(" h-1\n".to_string()).as_str(), "h-1");
    }

    #[test]
    fn set_rates_derives_status_and_meals() {
        let mut record = HotelRecord::placeholder(HotelId::from("h"), PricingStatus::Loading);
        record.set_rates(vec![
            rate("Breakfast", Some(120.0)),
            rate("nomeal", Some(90.0)),
            rate("breakfast", Some(150.0)),
        ]);
        assert_eq!(record.pricing_status, PricingStatus::Priced);
        assert_eq!(record.meal_plans, vec!["breakfast", "nomeal"]);
        assert_eq!(record.primary_price(), Some(120.0));

        record.mark_sold_out();
        assert_eq!(record.pricing_status, PricingStatus::SoldOut);
        assert!(record.meal_plans.is_empty());
        assert_eq!(record.primary_price(), None);
    }

    #[test]
    fn primary_price_ignores_later_rates() {
        let mut record = HotelRecord::placeholder(HotelId::from("h"), PricingStatus::Loading);
        record.set_rates(vec![rate("nomeal", None), rate("nomeal", Some(50.0))]);
        assert_eq!(record.primary_price(), None);
    }

    #[test]
    fn validate_rejects_bad_dates_and_party() {
        assert!(params().validate().is_ok());

        let mut reversed = params();
        reversed.checkout = reversed.checkin;
        assert!(matches!(reversed.validate(), Err(SearchError::InvalidParams(_))));

        let mut empty_room = params();
        empty_room.guests[0].adults = 0;
        assert!(empty_room.validate().is_err());

        let mut bad_currency = params();
        bad_currency.currency = "EURO".to_string();
        assert!(bad_currency.validate().is_err());

        let mut geo = params();
        geo.target = SearchTarget::Geo {
            latitude: 41.38,
            longitude: 2.17,
            radius_m: 0,
        };
        assert!(geo.validate().is_err());
    }
}
