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

//! # Trips Query Builder
//!
//! Side-effect free search criteria for the trips backend: defaults,
//! validation and query-string encoding.

use anyhow::{Context, Result, ensure};
use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::trips_model::json_number;

pub const MIN_ADULTS: u32 = 1;
pub const MAX_ADULTS: u32 = 4;
pub const MAX_CHILDREN: u32 = 4;
pub const MIN_NIGHTS: u32 = 1;
pub const MAX_NIGHTS: u32 = 30;
pub const MAX_PRICE: u32 = 500_000;
pub const PRICE_STEP: u32 = 1_000;
pub const MIN_STARS: u32 = 1;
pub const MAX_STARS: u32 = 5;
pub const MAX_TRIPADVISOR_RATING: f64 = 5.0;
/// Months selectable after the current one.
pub const TRAVEL_PERIOD_MONTHS: u32 = 12;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Whether the backend matches `dateFrom`/`dateTo` exactly or as a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum SpecificDates {
    #[default]
    Flexible = 0,
    Exact = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderBy {
    Price,
    Stars,
    Tripadvisor,
}

impl OrderBy {
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "price" | "cheapest" => Some(OrderBy::Price),
            "stars" | "star" => Some(OrderBy::Stars),
            "tripadvisor" | "rating" => Some(OrderBy::Tripadvisor),
            _ => None,
        }
    }

    pub fn as_str_name(&self) -> &'static str {
        match self {
            OrderBy::Price => "price",
            OrderBy::Stars => "stars",
            OrderBy::Tripadvisor => "tripadvisor",
        }
    }
}

/// Package deals (hotel + flight) or flight-only offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    #[default]
    Package,
    Flight,
}

impl SearchKind {
    pub fn endpoint(&self) -> &'static str {
        match self {
            SearchKind::Package => "trips",
            SearchKind::Flight => "flights",
        }
    }
}

/// Search criteria, as sent to the trips endpoints and stored by the filter
/// service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripsFilter {
    pub adults: u32,
    pub children: u32,
    pub date_from: String,
    pub date_to: String,
    pub min_stars: u32,
    pub min_tripadvisor: f64,
    pub nights_from: u32,
    pub nights_to: u32,
    pub price_from: u32,
    pub price_to: u32,
    #[serde(default)]
    pub specific_dates: SpecificDates,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub places: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub search: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<OrderBy>,
}

impl TripsFilter {
    pub fn builder(today: NaiveDate) -> TripsFilterBuilder {
        let first_month = start_of_month(today);
        let last_month = first_month + Months::new(TRAVEL_PERIOD_MONTHS);
        TripsFilterBuilder {
            filter: TripsFilter {
                adults: 2,
                children: 0,
                date_from: first_month.format(DATE_FORMAT).to_string(),
                date_to: end_of_month(last_month).format(DATE_FORMAT).to_string(),
                min_stars: MIN_STARS,
                min_tripadvisor: 0.0,
                nights_from: 7,
                nights_to: 21,
                price_from: 0,
                price_to: MAX_PRICE,
                specific_dates: SpecificDates::Flexible,
                agencies: Vec::new(),
                places: Vec::new(),
                search: String::new(),
                order_by: None,
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            (MIN_ADULTS..=MAX_ADULTS).contains(&self.adults),
            "Adults must be between {} and {}",
            MIN_ADULTS,
            MAX_ADULTS
        );
        ensure!(
            self.children <= MAX_CHILDREN,
            "At most {} children allowed",
            MAX_CHILDREN
        );

        let from = NaiveDate::parse_from_str(&self.date_from, DATE_FORMAT)
            .context(format!("Invalid dateFrom: {}", self.date_from))?;
        let to = NaiveDate::parse_from_str(&self.date_to, DATE_FORMAT)
            .context(format!("Invalid dateTo: {}", self.date_to))?;
        ensure!(from <= to, "dateFrom must not be after dateTo");

        ensure!(
            self.nights_from >= MIN_NIGHTS && self.nights_to <= MAX_NIGHTS,
            "Nights must be between {} and {}",
            MIN_NIGHTS,
            MAX_NIGHTS
        );
        ensure!(
            self.nights_from <= self.nights_to,
            "Minimum nights cannot be greater than maximum nights"
        );

        ensure!(
            self.price_to <= MAX_PRICE,
            "Price must be at most {}",
            MAX_PRICE
        );
        ensure!(
            self.price_from <= self.price_to,
            "Minimum price cannot be greater than maximum price"
        );

        ensure!(
            (MIN_STARS..=MAX_STARS).contains(&self.min_stars),
            "Star rating must be between {} and {}",
            MIN_STARS,
            MAX_STARS
        );
        ensure!(
            (0.0..=MAX_TRIPADVISOR_RATING).contains(&self.min_tripadvisor)
                && (self.min_tripadvisor * 2.0).fract() == 0.0,
            "Tripadvisor rating must be between 0 and 5 in steps of 0.5"
        );
        Ok(())
    }

    /// Query parameters for one page of results, in the order the web client
    /// sends them. List values repeat under `name[]`.
    pub fn query_pairs(&self, kind: SearchKind, page: u32) -> Vec<(String, String)> {
        let package = kind == SearchKind::Package;
        let mut pairs: Vec<(String, String)> = Vec::new();
        let mut push = |k: &str, v: String| pairs.push((k.to_string(), v));

        push("adults", self.adults.to_string());
        push("children", self.children.to_string());
        if package {
            for code in &self.agencies {
                push("agencies[]", code.clone());
            }
        }
        push("dateFrom", self.date_from.clone());
        push("dateTo", self.date_to.clone());
        if package {
            push("minStars", self.min_stars.to_string());
            push("minTripadvisor", json_number(self.min_tripadvisor));
        }
        push("nightsFrom", self.nights_from.to_string());
        push("nightsTo", self.nights_to.to_string());
        push("page", page.to_string());
        for code in &self.places {
            push("places[]", code.clone());
        }
        push("priceFrom", self.price_from.to_string());
        push("priceTo", self.price_to.to_string());
        // Package searches always carry `search`, empty or not.
        if package {
            push("search", self.search.clone());
        }
        push("specificDates", (self.specific_dates as u8).to_string());
        if package {
            if let Some(order) = self.order_by {
                push("orderBy", order.as_str_name().to_string());
            }
        }
        pairs
    }

    pub fn query_string(&self, kind: SearchKind, page: u32) -> String {
        self.query_pairs(kind, page)
            .iter()
            .map(|(k, v)| format!("{}={}", k, encode_query_value(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Percent-encodes a query value, with spaces as `+`.
fn encode_query_value(value: &str) -> String {
    urlencoding::encode(value).replace("%20", "+")
}

pub fn start_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn end_of_month(date: NaiveDate) -> NaiveDate {
    let first = start_of_month(date);
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.checked_sub_days(Days::new(1)))
        .unwrap_or(first)
}

#[derive(Clone, Debug)]
pub struct TripsFilterBuilder {
    filter: TripsFilter,
}

impl TripsFilterBuilder {
    pub fn adults(mut self, adults: u32) -> Self {
        self.filter.adults = adults;
        self
    }

    pub fn children(mut self, children: u32) -> Self {
        self.filter.children = children;
        self
    }

    /// Travel window from the start of `from_month` to the end of `to_month`.
    pub fn travel_period(mut self, from_month: NaiveDate, to_month: NaiveDate) -> Self {
        self.filter.date_from = start_of_month(from_month).format(DATE_FORMAT).to_string();
        self.filter.date_to = end_of_month(to_month).format(DATE_FORMAT).to_string();
        self
    }

    pub fn date_range(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.filter.date_from = from.format(DATE_FORMAT).to_string();
        self.filter.date_to = to.format(DATE_FORMAT).to_string();
        self
    }

    pub fn nights(mut self, from: u32, to: u32) -> Self {
        self.filter.nights_from = from;
        self.filter.nights_to = to;
        self
    }

    pub fn prices(mut self, from: u32, to: u32) -> Self {
        self.filter.price_from = from;
        self.filter.price_to = to;
        self
    }

    pub fn min_stars(mut self, stars: u32) -> Self {
        self.filter.min_stars = stars;
        self
    }

    pub fn min_tripadvisor(mut self, rating: f64) -> Self {
        self.filter.min_tripadvisor = rating;
        self
    }

    pub fn specific_dates(mut self, specific: SpecificDates) -> Self {
        self.filter.specific_dates = specific;
        self
    }

    pub fn agencies(mut self, codes: Vec<String>) -> Self {
        self.filter.agencies = codes;
        self
    }

    pub fn places(mut self, codes: Vec<String>) -> Self {
        self.filter.places = codes;
        self
    }

    pub fn search(mut self, text: String) -> Self {
        self.filter.search = text.trim().to_string();
        self
    }

    pub fn order_by(mut self, order: Option<OrderBy>) -> Self {
        self.filter.order_by = order;
        self
    }

    pub fn build(self) -> Result<TripsFilter> {
        self.filter.validate()?;
        Ok(self.filter)
    }
}
