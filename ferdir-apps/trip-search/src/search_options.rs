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

//! # Search Options
//!
//! Selectable values for every filter input, with display labels.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::formatting::{DateFormatConfig, dot_to_comma, thousand_separator};
use crate::trips_model::json_number;
use crate::trips_query_builder::{
    MAX_NIGHTS, MAX_PRICE, MAX_STARS, MIN_NIGHTS, MIN_STARS, PRICE_STEP, TRAVEL_PERIOD_MONTHS,
    start_of_month,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption<T> {
    pub label: String,
    pub value: T,
}

/// Every option list offered by the search form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub months: Vec<SelectOption<String>>,
    pub nights: Vec<SelectOption<u32>>,
    pub prices: Vec<SelectOption<u32>>,
    pub stars: Vec<SelectOption<u32>>,
    pub tripadvisor_ratings: Vec<SelectOption<f64>>,
}

impl SearchOptions {
    pub fn new(today: NaiveDate, config: &DateFormatConfig) -> Self {
        Self {
            months: month_options(today, config),
            nights: night_options(),
            prices: price_options(),
            stars: star_options(),
            tripadvisor_ratings: tripadvisor_rating_options(),
        }
    }
}

/// `min..=max`, empty when `min > max`.
pub fn range_inclusive(max: u32, min: u32) -> Vec<u32> {
    (min..=max).collect()
}

/// The current month and the following twelve, valued by their first day.
pub fn month_options(today: NaiveDate, config: &DateFormatConfig) -> Vec<SelectOption<String>> {
    let first = start_of_month(today);
    range_inclusive(TRAVEL_PERIOD_MONTHS, 0)
        .into_iter()
        .map(|offset| {
            let month = first + Months::new(offset);
            SelectOption {
                label: config.month_label(month),
                value: month.format("%Y-%m-%d").to_string(),
            }
        })
        .collect()
}

pub fn night_options() -> Vec<SelectOption<u32>> {
    range_inclusive(MAX_NIGHTS, MIN_NIGHTS)
        .into_iter()
        .map(|n| SelectOption {
            label: n.to_string(),
            value: n,
        })
        .collect()
}

pub fn price_options() -> Vec<SelectOption<u32>> {
    range_inclusive(MAX_PRICE / PRICE_STEP, 0)
        .into_iter()
        .map(|i| {
            let value = i * PRICE_STEP;
            SelectOption {
                label: thousand_separator(&value.to_string()),
                value,
            }
        })
        .collect()
}

pub fn star_options() -> Vec<SelectOption<u32>> {
    range_inclusive(MAX_STARS, MIN_STARS)
        .into_iter()
        .map(|n| SelectOption {
            label: n.to_string(),
            value: n,
        })
        .collect()
}

/// 0 to 5 in half steps, labelled with a decimal comma.
pub fn tripadvisor_rating_options() -> Vec<SelectOption<f64>> {
    range_inclusive(10, 0)
        .into_iter()
        .map(|i| {
            let value = i as f64 / 2.0;
            SelectOption {
                label: dot_to_comma(&json_number(value)),
                value,
            }
        })
        .collect()
}
