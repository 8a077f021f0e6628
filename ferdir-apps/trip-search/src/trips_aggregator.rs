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

//! # Trip Aggregator
//!
//! Side-effect free grouping of raw agency offers into one result per stay.
//!
//! Results arrive one page at a time. Offers for the same stay can straddle a
//! page boundary, so the last grouped trip of the previous pages is re-opened
//! when the next page is merged. Every earlier grouped trip is final.

use std::collections::HashMap;

use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, SeedableRng};

use crate::trips_model::{GroupedTrip, Trip};

/// Decides whether a newly merged agency's link becomes the representative
/// link of a grouped trip.
pub trait UrlSelectionPolicy {
    /// `agency_count` includes the agency that was just appended.
    fn should_replace(&mut self, agency_count: usize) -> bool;
}

/// Draws `r` uniformly in `[0, 1)` and replaces the link when `1 / r`
/// exceeds the agency count.
///
/// At agency count `n` this replaces with probability `1 / n`.
#[derive(Debug, Clone)]
pub struct InvertedDrawPolicy<R: Rng> {
    rng: R,
}

impl<R: Rng> InvertedDrawPolicy<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl Default for InvertedDrawPolicy<ThreadRng> {
    fn default() -> Self {
        Self::new(rand::thread_rng())
    }
}

impl InvertedDrawPolicy<StdRng> {
    /// `Send` variant for aggregators kept across `.await` points.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> UrlSelectionPolicy for InvertedDrawPolicy<R> {
    fn should_replace(&mut self, agency_count: usize) -> bool {
        let draw: f64 = self.rng.r#gen();
        1.0 / draw > agency_count as f64
    }
}

/// Never replaces: the first agency seen keeps the representative link.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepFirstUrl;

impl UrlSelectionPolicy for KeepFirstUrl {
    fn should_replace(&mut self, _agency_count: usize) -> bool {
        false
    }
}

impl<P: UrlSelectionPolicy + ?Sized> UrlSelectionPolicy for &mut P {
    fn should_replace(&mut self, agency_count: usize) -> bool {
        (**self).should_replace(agency_count)
    }
}

/// Order of `GroupedTrip::agencies` after a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgencyOrder {
    /// Agencies stay in the order their offers were first seen.
    #[default]
    Insertion,
    /// Re-sorted by agency code, descending, after every append.
    DescendingCode,
}

impl AgencyOrder {
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s {
            "insertion" | "seen" => Some(AgencyOrder::Insertion),
            "descending_code" | "descending" | "desc" => Some(AgencyOrder::DescendingCode),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TripAggregator<P> {
    policy: P,
    agency_order: AgencyOrder,
}

impl TripAggregator<InvertedDrawPolicy<ThreadRng>> {
    pub fn with_thread_rng() -> Self {
        Self::new(InvertedDrawPolicy::default())
    }
}

impl<P: UrlSelectionPolicy> TripAggregator<P> {
    pub fn new(policy: P) -> Self {
        Self {
            policy,
            agency_order: AgencyOrder::default(),
        }
    }

    pub fn agency_order(mut self, order: AgencyOrder) -> Self {
        self.agency_order = order;
        self
    }

    /// Merge one page of raw offers into the grouped results of the previous
    /// pages.
    ///
    /// `existing` is never modified: the re-opened last entry is cloned before
    /// agencies are added to it.
    pub fn aggregate(&mut self, new_trips: &[Trip], existing: &[GroupedTrip]) -> Vec<GroupedTrip> {
        if new_trips.is_empty() {
            return existing.to_vec();
        }

        let (finalized, reopened) = match existing.split_last() {
            Some((last, rest)) => (rest, Some(last)),
            None => (existing, None),
        };

        let mut building: Vec<GroupedTrip> = reopened.into_iter().cloned().collect();
        let mut index: HashMap<String, usize> = building
            .iter()
            .enumerate()
            .map(|(i, g)| (g.trip_identifier.clone(), i))
            .collect();

        let mut merged_offers = 0usize;
        for trip in new_trips {
            let identifier = trip.trip_identifier();
            match index.get(&identifier) {
                Some(&pos) => {
                    if self.merge_offer(&mut building[pos], trip) {
                        merged_offers += 1;
                    }
                }
                None => {
                    index.insert(identifier, building.len());
                    building.push(GroupedTrip::from_trip(trip));
                }
            }
        }

        tracing::debug!(
            "Aggregated {} offers: {} finalized, {} open, {} agencies merged",
            new_trips.len(),
            finalized.len(),
            building.len(),
            merged_offers
        );

        let mut output = Vec::with_capacity(finalized.len() + building.len());
        output.extend_from_slice(finalized);
        output.append(&mut building);
        output
    }

    /// Returns `true` when the offer's agency was not already listed.
    fn merge_offer(&mut self, grouped: &mut GroupedTrip, trip: &Trip) -> bool {
        if grouped.has_agency(&trip.agency) {
            return false;
        }

        grouped.agencies.push(trip.agency_offer());
        if self.agency_order == AgencyOrder::DescendingCode {
            grouped.agencies.sort_by(|a, b| b.agency.cmp(&a.agency));
        }
        if self.policy.should_replace(grouped.agencies.len()) {
            grouped.trip.url = trip.url.clone();
        }
        true
    }
}

/// Group one page of offers with the default link heuristic and insertion
/// order.
pub fn aggregate(new_trips: &[Trip], existing: &[GroupedTrip]) -> Vec<GroupedTrip> {
    TripAggregator::with_thread_rng().aggregate(new_trips, existing)
}
