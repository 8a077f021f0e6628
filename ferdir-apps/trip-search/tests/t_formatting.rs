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

//! Display formatting of grouped results and the search form options.


use chrono::NaiveDate;
use ferdir_trip_search::{
    DateFormatConfig, DateLocale, SearchOptions, TripCard, aggregate, dot_to_comma,
    thousand_separator,
};

use trip_fixtures::trip;

#[test]
fn test_trip_card_icelandic() {
    let mut offer = trip(10, 379_800.0, "2024-06-07", 7, "A");
    offer.return_date = "2024-06-14T00:00:00".to_string();
    offer.price_per_person = 189_900.0;
    offer.tripadvisor_rating = 4.5;
    offer.room_description = "Tveggja manna herbergi".to_string();
    let mut second = offer.clone();
    second.agency = "B".to_string();

    let grouped = aggregate(&[offer, second], &[]);
    let card = TripCard::from_grouped(&grouped[0], &DateFormatConfig::default());

    assert_eq!(card.title, "Tenerife - 7 nætur");
    assert_eq!(card.dates.as_deref(), Some("Fös. 07.06.2024 - Fös. 14.06.2024"));
    assert_eq!(card.price_per_person, "189.900kr.");
    assert_eq!(card.total_price, "379.800kr.");
    assert_eq!(card.rating.as_deref(), Some("4,5"));
    assert_eq!(card.agencies.len(), 2);
    assert_eq!(card.hotel_line().as_deref(), Some("Hotel 10 ★★★★ (Tripadvisor 4,5)"));
}

#[test]
fn test_flight_card_has_no_hotel() {
    let mut offer = trip(0, 45_000.0, "2024-03-01", 7, "A");
    offer.hotel = String::new();
    offer.stars = 0.0;
    let card = TripCard::from_grouped(&aggregate(&[offer], &[])[0], &DateFormatConfig::default());
    assert!(card.dates.is_none());
    assert!(card.hotel_line().is_none());
}

#[test]
fn test_english_locale() {
    let config = DateFormatConfig::new(DateLocale::ENGLISH);
    let day = NaiveDate::from_ymd_opt(2025, 5, 3).unwrap();
    assert_eq!(config.format_trip_date(day), "sat. 03.05.2025");
    assert_eq!(config.month_label(day), "May 2025");
    assert!(DateLocale::from_str_name("IS").is_some());
    assert!(DateLocale::from_str_name("fr").is_none());
}

#[test]
fn test_number_helpers() {
    assert_eq!(thousand_separator("1234567"), "1.234.567");
    assert_eq!(thousand_separator("999"), "999");
    assert_eq!(thousand_separator("-1000"), "-1.000");
    assert_eq!(dot_to_comma("4.5"), "4,5");
}

#[test]
fn test_search_options() {
    let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
    let options = SearchOptions::new(today, &DateFormatConfig::default());

    assert_eq!(options.months.len(), 13);
    assert_eq!(options.months[0].label, "Okt 2026");
    assert_eq!(options.months[0].value, "2026-10-01");
    assert_eq!(options.months[12].value, "2027-10-01");
    assert_eq!(options.nights.first().map(|o| o.value), Some(1));
    assert_eq!(options.nights.last().map(|o| o.value), Some(30));
    assert_eq!(options.prices.len(), 501);
    assert_eq!(options.prices[150].label, "150.000");
    assert_eq!(options.stars.len(), 5);
    assert_eq!(options.tripadvisor_ratings.len(), 11);
    assert_eq!(options.tripadvisor_ratings[7].label, "3,5");
}
