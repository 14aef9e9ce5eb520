//! Wire shapes of the catalog and pricing services
//!
//! Every field is decoded leniently: a value of the wrong type becomes its
//! default instead of failing the whole response, and a body of an unknown
//! shape decodes to zero results.

use crate::models::{Candidate, CatalogPayload, GuestRoom, HotelId, PricedHotel, Rate, SearchParams, SearchTarget};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Like `lenient`, but drops only the list items that fail to decode
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Numbers arrive both as JSON numbers and as strings
pub fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Stars on either a 0-5 or a 0-50 scale, rounded and clamped to 0-5
pub fn normalize_stars(raw: f64) -> u8 {
    let stars = if raw > 5.0 { raw / 10.0 } else { raw };
    stars.round().clamp(0.0, 5.0) as u8
}

/// First usable id among the field names providers use for it
fn pick_id(candidates: &[&Option<Value>]) -> Option<HotelId> {
    candidates
        .iter()
        .filter_map(|value| value.as_ref().and_then(text))
        .map(HotelId::from)
        .find(|id| !id.is_empty())
}

fn stars_from(candidates: &[&Option<Value>]) -> Option<u8> {
    candidates
        .iter()
        .find_map(|value| value.as_ref().and_then(number))
        .map(normalize_stars)
}

// ---- catalog listing ----

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCandidate {
    id: Option<Value>,
    hotel_id: Option<Value>,
    hid: Option<Value>,
    #[serde(deserialize_with = "lenient")]
    name: Option<String>,
    star_class: Option<Value>,
    star_rating: Option<Value>,
    stars: Option<Value>,
}

impl RawCandidate {
    fn into_candidate(self) -> Option<Candidate> {
        let id = pick_id(&[&self.id, &self.hotel_id, &self.hid])?;
        Some(Candidate {
            id,
            name: self.name.filter(|n| !n.trim().is_empty()),
            star_rating: stars_from(&[&self.star_class, &self.star_rating, &self.stars]),
        })
    }
}

/// Decode a candidate listing: a list, or a list under `data` or `hotels`
pub fn parse_candidates(body: Value) -> Vec<Candidate> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data").or_else(|| map.remove("hotels")) {
            Some(inner) => return parse_candidates(inner),
            None => {
                warn!("Candidate listing has no recognised list field");
                return Vec::new();
            }
        },
        _ => {
            warn!("Candidate listing is not a list");
            return Vec::new();
        }
    };

    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<RawCandidate>(item).ok())
        .filter_map(RawCandidate::into_candidate)
        .collect()
}

// ---- catalog info ----

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAmenityGroup {
    #[serde(deserialize_with = "lenient_vec")]
    amenities: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawHotelInfo {
    id: Option<Value>,
    hotel_id: Option<Value>,
    hid: Option<Value>,
    #[serde(deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    address: Option<String>,
    star_rating: Option<Value>,
    stars: Option<Value>,
    #[serde(deserialize_with = "lenient")]
    images: Vec<Value>,
    #[serde(deserialize_with = "lenient")]
    amenities: Vec<Value>,
    #[serde(deserialize_with = "lenient_vec")]
    amenity_groups: Vec<RawAmenityGroup>,
    description: Option<Value>,
    #[serde(deserialize_with = "lenient")]
    check_in_time: Option<String>,
    #[serde(deserialize_with = "lenient")]
    check_out_time: Option<String>,
    #[serde(deserialize_with = "lenient_vec")]
    serp_filters: Vec<String>,
}

impl RawHotelInfo {
    fn into_payload(self, fallback_id: Option<&str>) -> Option<CatalogPayload> {
        let id = pick_id(&[&self.id, &self.hotel_id, &self.hid])
            .or_else(|| fallback_id.map(HotelId::from))
            .filter(|id| !id.is_empty())?;

        let images = self
            .images
            .iter()
            .filter_map(|image| match image {
                Value::Object(map) => map.get("url").and_then(text),
                other => text(other),
            })
            .collect();

        let mut amenities: Vec<String> = Vec::new();
        for amenity in self.amenities.iter().flat_map(amenity_strings) {
            if !amenities.contains(&amenity) {
                amenities.push(amenity);
            }
        }
        for amenity in self.amenity_groups.into_iter().flat_map(|group| group.amenities) {
            let amenity = amenity.trim().to_string();
            if !amenity.is_empty() && !amenities.contains(&amenity) {
                amenities.push(amenity);
            }
        }

        Some(CatalogPayload {
            id,
            name: self.name.filter(|n| !n.trim().is_empty()),
            address: self.address.filter(|a| !a.trim().is_empty()),
            star_rating: stars_from(&[&self.star_rating, &self.stars]),
            images,
            amenities,
            description: self.description.as_ref().and_then(description_text),
            check_in_time: self.check_in_time,
            check_out_time: self.check_out_time,
            serp_filters: self.serp_filters,
        })
    }
}

/// Amenities come flat or grouped as `{group_name, amenities: [..]}`
fn amenity_strings(value: &Value) -> Vec<String> {
    match value {
        Value::Object(map) => map
            .get("amenities")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(text).collect())
            .unwrap_or_default(),
        other => text(other).into_iter().collect(),
    }
}

/// Plain text, or paragraphs nested as `[{paragraphs: [..]}]`
fn description_text(value: &Value) -> Option<String> {
    match value {
        Value::Array(sections) => {
            let paragraphs: Vec<String> = sections
                .iter()
                .filter_map(|section| section.get("paragraphs").and_then(Value::as_array))
                .flatten()
                .filter_map(text)
                .collect();
            Some(paragraphs.join("\n\n")).filter(|d| !d.is_empty())
        }
        other => text(other),
    }
}

/// Decode a catalog info response: keyed map, list, or either under `data`
pub fn parse_catalog_info(body: Value) -> Vec<CatalogPayload> {
    match body {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value::<RawHotelInfo>(item).ok())
            .filter_map(|raw| raw.into_payload(None))
            .collect(),
        Value::Object(mut map) => {
            if let Some(inner) = map.remove("data") {
                return parse_catalog_info(inner);
            }
            map.into_iter()
                .filter(|(_, item)| item.is_object())
                .filter_map(|(key, item)| {
                    serde_json::from_value::<RawHotelInfo>(item)
                        .ok()
                        .and_then(|raw| raw.into_payload(Some(&key)))
                })
                .collect()
        }
        _ => {
            warn!("Catalog info response is neither a map nor a list");
            Vec::new()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InfoRequest<'a> {
    pub hotel_ids: &'a [HotelId],
}

#[derive(Debug, Serialize)]
pub struct CandidateRequest<'a> {
    pub region_id: &'a str,
    pub limit: usize,
}

// ---- pricing ----

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PricingTarget<'a> {
    Region { region_id: &'a str },
    Geo { latitude: f64, longitude: f64, radius: u32 },
}

#[derive(Debug, Serialize)]
pub struct PricingRequest<'a> {
    pub checkin: NaiveDate,
    pub checkout: NaiveDate,
    pub residency: &'a str,
    pub currency: &'a str,
    pub guests: &'a [GuestRoom],
    #[serde(flatten)]
    pub target: PricingTarget<'a>,
}

impl<'a> From<&'a SearchParams> for PricingRequest<'a> {
    fn from(params: &'a SearchParams) -> Self {
        let target = match &params.target {
            SearchTarget::Region { region_id } => PricingTarget::Region { region_id },
            SearchTarget::Geo {
                latitude,
                longitude,
                radius_m,
            } => PricingTarget::Geo {
                latitude: *latitude,
                longitude: *longitude,
                radius: *radius_m,
            },
        };
        Self {
            checkin: params.checkin,
            checkout: params.checkout,
            residency: &params.residency,
            currency: &params.currency,
            guests: &params.guests,
            target,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPaymentType {
    show_amount: Option<Value>,
    amount: Option<Value>,
    #[serde(deserialize_with = "lenient")]
    show_currency_code: Option<String>,
    #[serde(deserialize_with = "lenient")]
    currency_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPaymentOptions {
    #[serde(deserialize_with = "lenient_vec")]
    payment_types: Vec<RawPaymentType>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRate {
    #[serde(deserialize_with = "lenient")]
    room_name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    meal: Option<String>,
    #[serde(deserialize_with = "lenient")]
    daily_prices: Vec<Value>,
    #[serde(deserialize_with = "lenient")]
    payment_options: Option<RawPaymentOptions>,
    #[serde(deserialize_with = "lenient_vec")]
    serp_filters: Vec<String>,
}

impl RawRate {
    fn into_rate(self) -> (Rate, Vec<String>) {
        let payment = self
            .payment_options
            .and_then(|options| options.payment_types.into_iter().next());
        let (amount, currency) = match payment {
            Some(p) => (
                p.show_amount
                    .as_ref()
                    .and_then(number)
                    .or_else(|| p.amount.as_ref().and_then(number)),
                p.show_currency_code.or(p.currency_code),
            ),
            None => (None, None),
        };
        let rate = Rate {
            room_name: self.room_name.unwrap_or_default(),
            meal: self.meal,
            amount,
            currency,
            daily_prices: self.daily_prices.iter().filter_map(number).collect(),
        };
        (rate, self.serp_filters)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRgExt {
    class: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPricedHotel {
    id: Option<Value>,
    hotel_id: Option<Value>,
    hid: Option<Value>,
    #[serde(deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(deserialize_with = "lenient_vec")]
    rates: Vec<RawRate>,
    #[serde(deserialize_with = "lenient")]
    rg_ext: Option<RawRgExt>,
    #[serde(deserialize_with = "lenient_vec")]
    serp_filters: Vec<String>,
}

impl RawPricedHotel {
    fn into_priced(self) -> Option<PricedHotel> {
        let id = pick_id(&[&self.id, &self.hotel_id, &self.hid])?;
        let star_rating = self
            .rg_ext
            .and_then(|ext| ext.class.as_ref().and_then(number))
            .filter(|class| *class > 0.0)
            .map(normalize_stars);

        let mut serp_filters = self.serp_filters;
        let mut rates = Vec::with_capacity(self.rates.len());
        for raw in self.rates {
            let (rate, flags) = raw.into_rate();
            for flag in flags {
                if !serp_filters.contains(&flag) {
                    serp_filters.push(flag);
                }
            }
            rates.push(rate);
        }

        Some(PricedHotel {
            id,
            name: self.name.filter(|n| !n.trim().is_empty()),
            star_rating,
            rates,
            serp_filters,
        })
    }
}

/// Decode a pricing response: `{hotels: [..]}`, optionally under `data`.
/// Hotels are returned in response order
pub fn parse_pricing(body: Value) -> Vec<PricedHotel> {
    let hotels = match body {
        Value::Object(mut map) => {
            let nested = matches!(map.get("data"), Some(Value::Object(_)));
            if nested {
                return map.remove("data").map(parse_pricing).unwrap_or_default();
            }
            match map.remove("hotels") {
                Some(Value::Array(hotels)) => hotels,
                _ => {
                    warn!("Pricing response has no hotels list");
                    return Vec::new();
                }
            }
        }
        Value::Array(hotels) => hotels,
        _ => {
            warn!("Pricing response is not an object");
            return Vec::new();
        }
    };

    hotels
        .into_iter()
        .filter_map(|item| serde_json::from_value::<RawPricedHotel>(item).ok())
        .filter_map(RawPricedHotel::into_priced)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn stars_accept_both_scales() {
        assert_eq!(normalize_stars(4.0), 4);
        assert_eq!(normalize_stars(40.0), 4);
        assert_eq!(normalize_stars(4.6), 5);
        assert_eq!(normalize_stars(-1.0), 0);
        assert_eq!(normalize_stars(70.0), 5);
    }

    #[test]
    fn candidates_use_any_id_field() {
        let body = json!({"data": [
            {"id": " a ", "name": "Alpha", "star_class": 30},
            {"hid": 42, "stars": 4},
            {"name": "no id"},
            "garbage"
        ]});
        let candidates = parse_candidates(body);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].id, HotelId::from("a"));
        assert_eq!(candidates[0].star_rating, Some(3));
        assert_eq!(candidates[1].id, HotelId::from("42"));
        assert_eq!(candidates[1].name, None);
    }

    #[test]
    fn catalog_info_keyed_map_and_list_decode_alike() {
        let keyed = json!({
            "h1": {"name": "One", "images": ["https://img/{size}/1.jpg"], "amenities": ["Free Wi-Fi"]},
        });
        let listed = json!([
            {"hotel_id": "h1", "name": "One", "images": [{"url": "https://img/{size}/1.jpg"}],
             "amenity_groups": [{"group_name": "Internet", "amenities": ["Free Wi-Fi"]}]},
        ]);

        let from_map = parse_catalog_info(keyed);
        let from_list = parse_catalog_info(listed);
        assert_eq!(from_map, from_list);
        assert_eq!(from_map[0].id, HotelId::from("h1"));
        assert_eq!(from_map[0].amenities, vec!["Free Wi-Fi"]);
    }

    #[test]
    fn catalog_info_tolerates_wrong_types() {
        let body = json!({"data": [
            {"id": "h2", "name": 17, "address": ["x"], "amenities": "pool",
             "description": [{"paragraphs": ["First.", "Second."]}], "serp_filters": "nope"},
        ]});
        let payloads = parse_catalog_info(body);
        assert_eq!(payloads.len(), 1);
        let payload = &payloads[0];
        assert_eq!(payload.name, None);
        assert_eq!(payload.address, None);
        assert!(payload.amenities.is_empty());
        assert!(payload.serp_filters.is_empty());
        assert_eq!(payload.description.as_deref(), Some("First.\n\nSecond."));
    }

    #[test]
    fn unknown_shapes_are_zero_results() {
        assert!(parse_catalog_info(json!("oops")).is_empty());
        assert!(parse_pricing(json!({"status": "ok"})).is_empty());
        assert!(parse_candidates(json!(12)).is_empty());
    }

    #[test]
    fn pricing_takes_first_payment_type_and_collects_flags() {
        let body = json!({"data": {"hotels": [
            {"id": "p1", "rg_ext": {"class": 4},
             "rates": [
                {"room_name": "Double", "meal": "breakfast",
                 "payment_options": {"payment_types": [
                    {"show_amount": "182.50", "show_currency_code": "EUR"},
                    {"show_amount": "999"}
                 ]},
                 "serp_filters": ["has_internet"]},
                {"room_name": "Suite", "meal": "nomeal", "payment_options": null,
                 "serp_filters": ["has_internet", "has_pool"]}
             ]},
            {"hid": 7, "rates": "broken"}
        ]}});
        let hotels = parse_pricing(body);
        assert_eq!(hotels.len(), 2);

        let first = &hotels[0];
        assert_eq!(first.star_rating, Some(4));
        assert_eq!(first.rates[0].amount, Some(182.5));
        assert_eq!(first.rates[0].currency.as_deref(), Some("EUR"));
        assert_eq!(first.rates[1].amount, None);
        assert_eq!(first.serp_filters, vec!["has_internet", "has_pool"]);

        assert_eq!(hotels[1].id, HotelId::from("7"));
        assert!(hotels[1].rates.is_empty());
    }

    #[test]
    fn pricing_request_flattens_target() {
        let params = SearchParams {
            target: SearchTarget::Geo {
                latitude: 41.39,
                longitude: 2.16,
                radius_m: 1500,
            },
            checkin: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            checkout: NaiveDate::from_ymd_opt(2026, 11, 4).unwrap(),
            guests: vec![GuestRoom {
                adults: 2,
                children: vec![7],
            }],
            residency: "es".to_string(),
            currency: "EUR".to_string(),
        };
        let body = serde_json::to_value(PricingRequest::from(&params)).unwrap();
        assert_eq!(
            body,
            json!({
                "checkin": "2026-11-02",
                "checkout": "2026-11-04",
                "residency": "es",
                "currency": "EUR",
                "guests": [{"adults": 2, "children": [7]}],
                "latitude": 41.39,
                "longitude": 2.16,
                "radius": 1500
            })
        );
    }
}
