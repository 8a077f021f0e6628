//!  Ferdir Trip Search
//!
//!  Copyright (C) 2026  Mamy Ratsimbazafy
//!
//!  This program is free software: you can redistribute it and/or modify
//!  it under the terms of the GNU Affero General Public License as published by
//!  the Free Software Foundation, either version 3 of the License, or
//!  (at your option) any later version.
//!
//!  This program is distributed in the hope that it will be useful,
//!  but WITHOUT ANY WARRANTY; without even the implied warranty of
//!  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//!  GNU Affero General Public License for more details.
//!
//!  You should have received a copy of the GNU Affero General Public License
//!  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! # Trip Model
//!
//! Wire types returned by the trips backend. Field names follow the
//! backend's camelCase JSON.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub code: String,
    pub country: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agency {
    pub code: String,
    pub name: String,
    pub logo: String,
}

/// One agency's link-through for a grouped stay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgencyOffer {
    pub agency: String,
    pub logo: String,
    pub url: String,
}

/// One agency's offer for one hotel stay (package search) or one flight.
///
/// Flight records carry no hotel, so hotel fields default to empty values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub adults: u32,
    pub children: u32,
    pub agency: String,
    #[serde(default)]
    pub agency_name: String,
    #[serde(default)]
    pub agency_logo: String,
    pub departure_date: String,
    #[serde(default)]
    pub return_date: String,
    #[serde(default)]
    pub hotel: String,
    #[serde(default)]
    pub hotel_code: i64,
    #[serde(default)]
    pub hotel_image: String,
    #[serde(default)]
    pub hotel_image_small: String,
    pub place: String,
    pub price: f64,
    pub price_per_person: f64,
    #[serde(default)]
    pub room_description: String,
    #[serde(default)]
    pub stars: f64,
    pub nights: u32,
    #[serde(default)]
    pub tripadvisor_rating: f64,
    #[serde(default)]
    pub tripadvisor_url: String,
    pub url: String,
    /// Agency list already attached upstream. Reused as-is when grouping.
    #[serde(default, rename = "agencies", skip_serializing)]
    pub carried_agencies: Option<Vec<AgencyOffer>>,
}

impl Trip {
    /// Key shared by every agency's offer for the same physical stay:
    /// `{hotelCode}.{price}.{departureDate}.{nights}`.
    pub fn trip_identifier(&self) -> String {
        format!(
            "{}.{}.{}.{}",
            self.hotel_code,
            json_number(self.price),
            self.departure_date,
            self.nights
        )
    }

    pub fn agency_offer(&self) -> AgencyOffer {
        AgencyOffer {
            agency: self.agency.clone(),
            logo: self.agency_logo.clone(),
            url: self.url.clone(),
        }
    }
}

/// A trip merged across every agency offering the same stay.
///
/// `trip` holds the fields of the first offer seen, except `trip.url`, which
/// is the representative link and may be swapped as agencies are merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedTrip {
    #[serde(flatten)]
    pub trip: Trip,
    pub trip_identifier: String,
    pub agencies: Vec<AgencyOffer>,
}

impl GroupedTrip {
    pub fn from_trip(trip: &Trip) -> Self {
        let agencies = trip
            .carried_agencies
            .clone()
            .unwrap_or_else(|| vec![trip.agency_offer()]);
        Self {
            trip_identifier: trip.trip_identifier(),
            agencies,
            trip: Trip {
                carried_agencies: None,
                ..trip.clone()
            },
        }
    }

    pub fn url(&self) -> &str {
        &self.trip.url
    }

    pub fn has_agency(&self, code: &str) -> bool {
        self.agencies.iter().any(|a| a.agency == code)
    }

    pub fn agency_codes(&self) -> impl Iterator<Item = &str> {
        self.agencies.iter().map(|a| a.agency.as_str())
    }
}

/// Renders a number the way the backend JSON prints it: integral values
/// without a fractional part.
pub(crate) fn json_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> serde_json::Value {
        serde_json::json!({
            "adults": 2,
            "children": 0,
            "agency": "A",
            "agencyName": "Agency A",
            "agencyLogo": "l1",
            "departureDate": "2024-06-01",
            "returnDate": "2024-06-08",
            "hotel": "Hotel Sol",
            "hotelCode": 10,
            "hotelImage": "img",
            "hotelImageSmall": "img-s",
            "place": "Tenerife",
            "price": 1000,
            "pricePerPerson": 500,
            "roomDescription": "Double room",
            "stars": 4,
            "nights": 7,
            "tripadvisorRating": 4.5,
            "tripadvisorUrl": "https://tripadvisor.example/10",
            "url": "u1"
        })
    }

    #[test]
    fn decode_backend_trip() {
        let trip: Trip = serde_json::from_value(sample_json()).unwrap();
        assert_eq!(trip.hotel_code, 10);
        assert_eq!(trip.agency_logo, "l1");
        assert!(trip.carried_agencies.is_none());
        assert_eq!(trip.trip_identifier(), "10.1000.2024-06-01.7");
    }

    #[test]
    fn fractional_price_keeps_decimals() {
        let mut trip: Trip = serde_json::from_value(sample_json()).unwrap();
        trip.price = 1999.5;
        assert_eq!(trip.trip_identifier(), "10.1999.5.2024-06-01.7");
    }

    #[test]
    fn flight_record_without_hotel_fields() {
        let flight: Trip = serde_json::from_value(serde_json::json!({
            "adults": 1,
            "children": 0,
            "agency": "F",
            "departureDate": "2024-07-01",
            "place": "Alicante",
            "price": 45000,
            "pricePerPerson": 45000,
            "nights": 10,
            "url": "f1"
        }))
        .unwrap();
        assert_eq!(flight.hotel_code, 0);
        assert_eq!(flight.trip_identifier(), "0.45000.2024-07-01.10");
    }

    #[test]
    fn grouped_trip_json_is_flat() {
        let trip: Trip = serde_json::from_value(sample_json()).unwrap();
        let grouped = GroupedTrip::from_trip(&trip);
        let value = serde_json::to_value(&grouped).unwrap();
        assert_eq!(value["tripIdentifier"], "10.1000.2024-06-01.7");
        assert_eq!(value["hotelCode"], 10);
        assert_eq!(value["agencies"][0]["agency"], "A");

        let back: GroupedTrip = serde_json::from_value(value).unwrap();
        assert_eq!(back.agencies, grouped.agencies);
        assert!(back.trip.carried_agencies.is_none());
    }

    #[test]
    fn carried_agencies_are_reused() {
        let mut json = sample_json();
        json["agencies"] = serde_json::json!([
            {"agency": "B", "logo": "l2", "url": "u2"},
            {"agency": "A", "logo": "l1", "url": "u1"}
        ]);
        let trip: Trip = serde_json::from_value(json).unwrap();
        let grouped = GroupedTrip::from_trip(&trip);
        assert_eq!(grouped.agency_codes().collect::<Vec<_>>(), vec!["B", "A"]);
    }
}
