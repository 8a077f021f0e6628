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

//! # Formatting
//!
//! Locale-aware display helpers. The locale travels in a `DateFormatConfig`
//! value handed to each call; nothing here reads process-wide state.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::trips_model::{AgencyOffer, GroupedTrip, json_number};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateLocale {
    pub name: &'static str,
    /// Sunday first.
    pub weekdays_short: [&'static str; 7],
    pub months_short: [&'static str; 12],
    pub nights_label: &'static str,
    pub per_person_label: &'static str,
    pub total_label: &'static str,
    pub currency_suffix: &'static str,
}

impl DateLocale {
    pub const ICELANDIC: DateLocale = DateLocale {
        name: "is",
        weekdays_short: ["sun", "mán", "þri", "mið", "fim", "fös", "lau"],
        months_short: [
            "jan", "feb", "mar", "apr", "maí", "jún", "júl", "ágú", "sep", "okt", "nóv", "des",
        ],
        nights_label: "nætur",
        per_person_label: "per farþega",
        total_label: "heildarverð",
        currency_suffix: "kr.",
    };

    pub const ENGLISH: DateLocale = DateLocale {
        name: "en",
        weekdays_short: ["sun", "mon", "tue", "wed", "thu", "fri", "sat"],
        months_short: [
            "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
        ],
        nights_label: "nights",
        per_person_label: "per passenger",
        total_label: "total price",
        currency_suffix: "kr.",
    };

    pub fn from_str_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "is" | "is-is" | "icelandic" => Some(Self::ICELANDIC),
            "en" | "en-us" | "en-gb" | "english" => Some(Self::ENGLISH),
            _ => None,
        }
    }
}

/// Formatting settings passed explicitly to every date and price rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateFormatConfig {
    pub locale: DateLocale,
}

impl Default for DateFormatConfig {
    fn default() -> Self {
        Self::new(DateLocale::ICELANDIC)
    }
}

impl DateFormatConfig {
    pub fn new(locale: DateLocale) -> Self {
        Self { locale }
    }

    fn weekday_short(&self, date: NaiveDate) -> &'static str {
        self.locale.weekdays_short[date.weekday().num_days_from_sunday() as usize]
    }

    fn month_short(&self, date: NaiveDate) -> &'static str {
        self.locale.months_short[date.month0() as usize]
    }

    /// `ddd. DD.MM.YYYY`, e.g. `fös. 07.06.2024`.
    pub fn format_trip_date(&self, date: NaiveDate) -> String {
        format!("{}. {}", self.weekday_short(date), date.format("%d.%m.%Y"))
    }

    /// `MMM YYYY`, capitalized, e.g. `Jún 2024`.
    pub fn month_label(&self, date: NaiveDate) -> String {
        capitalize(&format!("{} {}", self.month_short(date), date.year()))
    }

    /// `Fös. 07.06.2024 - Fös. 14.06.2024`.
    pub fn trip_dates(&self, departure: &str, return_date: &str) -> Result<String> {
        let departure = parse_iso_date(departure)?;
        let return_date = parse_iso_date(return_date)?;
        Ok(format!(
            "{} - {}",
            capitalize(&self.format_trip_date(departure)),
            capitalize(&self.format_trip_date(return_date))
        ))
    }

    pub fn price(&self, amount: f64) -> String {
        format!(
            "{}{}",
            thousand_separator(&json_number(amount)),
            self.locale.currency_suffix
        )
    }
}

fn parse_iso_date(s: &str) -> Result<NaiveDate> {
    // Backend dates sometimes carry a time part.
    let day = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").context(format!("Invalid trip date: {}", s))
}

pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Inserts `.` between every group of three digits of the integer part:
/// `1234567` becomes `1.234.567`.
pub fn thousand_separator(s: &str) -> String {
    let (sign, rest) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s),
    };
    let int_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    let (int_part, tail) = rest.split_at(int_len);

    let mut grouped = String::with_capacity(s.len() + int_len / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_len - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    format!("{}{}{}", sign, grouped, tail)
}

/// Replaces the first `.` with a decimal comma.
pub fn dot_to_comma(s: &str) -> String {
    s.replacen('.', ",", 1)
}

/// Display view of one grouped result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TripCard {
    pub title: String,
    pub dates: Option<String>,
    pub hotel: Option<String>,
    pub stars: u32,
    pub rating: Option<String>,
    pub room: Option<String>,
    pub agencies: Vec<AgencyOffer>,
    pub price_per_person: String,
    pub total_price: String,
    pub url: String,
    pub tripadvisor_url: Option<String>,
}

impl TripCard {
    pub fn from_grouped(trip: &GroupedTrip, config: &DateFormatConfig) -> Self {
        let t = &trip.trip;
        let dates = if t.return_date.is_empty() {
            None
        } else {
            match config.trip_dates(&t.departure_date, &t.return_date) {
                Ok(d) => Some(d),
                Err(e) => {
                    tracing::warn!("{}: {:#}", trip.trip_identifier, e);
                    None
                }
            }
        };
        let non_empty = |s: &str| (!s.trim().is_empty()).then(|| s.trim().to_string());

        TripCard {
            title: format!("{} - {} {}", t.place, t.nights, config.locale.nights_label),
            dates,
            hotel: non_empty(&t.hotel),
            stars: t.stars.max(0.0).floor() as u32,
            rating: (t.tripadvisor_rating > 0.0)
                .then(|| dot_to_comma(&format!("{:.1}", t.tripadvisor_rating))),
            room: non_empty(&t.room_description),
            agencies: trip.agencies.clone(),
            price_per_person: config.price(t.price_per_person),
            total_price: config.price(t.price),
            url: t.url.clone(),
            tripadvisor_url: non_empty(&t.tripadvisor_url),
        }
    }

    pub fn hotel_line(&self) -> Option<String> {
        let hotel = self.hotel.as_deref()?;
        let mut line = hotel.to_string();
        if self.stars > 0 {
            line.push(' ');
            line.push_str(&"★".repeat(self.stars as usize));
        }
        if let Some(rating) = &self.rating {
            line.push_str(&format!(" (Tripadvisor {})", rating));
        }
        Some(line)
    }
}
