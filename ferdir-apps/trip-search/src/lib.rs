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

// Library for ferdir-trip-search
// Package trip and flight search across travel agencies, with grouping of
// the same stay offered by several agencies.

mod config;
mod formatting;
mod search_options;
mod search_session;
mod trips_aggregator;
mod trips_model;
mod trips_query_builder;
mod trips_search;

pub use config::ClientConfig;

pub use formatting::{
    DateFormatConfig, DateLocale, TripCard, capitalize, dot_to_comma, thousand_separator,
};

pub use search_options::{SearchOptions, SelectOption, range_inclusive};

pub use search_session::{SearchSession, TripSource};

// Re-export the aggregator, the core of result paging
pub use trips_aggregator::{
    AgencyOrder, InvertedDrawPolicy, KeepFirstUrl, TripAggregator, UrlSelectionPolicy, aggregate,
};

pub use trips_model::{Agency, AgencyOffer, GroupedTrip, Place, Trip};

pub use trips_query_builder::{
    OrderBy, SearchKind, SpecificDates, TripsFilter, TripsFilterBuilder, end_of_month,
    start_of_month,
};

pub use trips_search::{TripsApiClient, is_valid_filter_code};
