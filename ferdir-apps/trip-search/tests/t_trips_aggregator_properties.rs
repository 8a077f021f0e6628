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

//! Property tests for page-by-page trip grouping.
//!
//! Random backend-like result lists are cut into pages at random points and
//! merged one page at a time:
//! - identifiers stay unique and agencies inside a result stay unique
//! - earlier results are never touched by later pages
//! - the page split does not change the grouping
//! - offers for the same stay need not be adjacent within a page
//!
//! Run with:
//!     cargo test --test t_trips_aggregator_properties


use std::collections::HashSet;

use ferdir_trip_search::{GroupedTrip, KeepFirstUrl, Trip, TripAggregator, aggregate};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use trip_fixtures::{random_offers, random_pages, trip};

const CASES: u64 = 200;

fn merge_pages(pages: &[Vec<Trip>]) -> Vec<GroupedTrip> {
    let mut aggregator = TripAggregator::new(KeepFirstUrl);
    pages
        .iter()
        .fold(Vec::new(), |acc, page| aggregator.aggregate(page, &acc))
}

fn summary(results: &[GroupedTrip]) -> Vec<(String, Vec<String>, String)> {
    results
        .iter()
        .map(|g| {
            (
                g.trip_identifier.clone(),
                g.agency_codes().map(str::to_string).collect(),
                g.url().to_string(),
            )
        })
        .collect()
}

#[test]
fn test_identifiers_and_agencies_unique() {
    for seed in 0..CASES {
        let mut rng = StdRng::seed_from_u64(seed);
        let offers = random_offers(&mut rng, 12);
        let pages = random_pages(&mut rng, &offers);
        let results = merge_pages(&pages);

        let ids: HashSet<&str> = results.iter().map(|g| g.trip_identifier.as_str()).collect();
        assert_eq!(ids.len(), results.len(), "seed {}: duplicate identifiers", seed);

        for g in &results {
            let codes: HashSet<&str> = g.agency_codes().collect();
            assert_eq!(
                codes.len(),
                g.agencies.len(),
                "seed {}: duplicate agency in {}",
                seed,
                g.trip_identifier
            );
            assert_eq!(g.trip_identifier, g.trip.trip_identifier());
        }
    }
}

#[test]
fn test_page_split_does_not_change_grouping() {
    for seed in 0..CASES {
        let mut rng = StdRng::seed_from_u64(seed);
        let offers = random_offers(&mut rng, 10);
        let whole = merge_pages(&[offers.clone()]);
        let paged = merge_pages(&random_pages(&mut rng, &offers));
        assert_eq!(summary(&whole), summary(&paged), "seed {}", seed);
    }
}

#[test]
fn test_finalized_prefix_is_preserved() {
    for seed in 0..CASES {
        let mut rng = StdRng::seed_from_u64(seed);
        let offers = random_offers(&mut rng, 8);
        let (first, second) = offers.split_at(offers.len() / 2);

        let existing = aggregate(first, &[]);
        let snapshot = existing.clone();
        let merged = aggregate(second, &existing);

        assert_eq!(existing, snapshot, "seed {}: input was mutated", seed);
        if let Some((_, finalized)) = existing.split_last() {
            assert_eq!(&merged[..finalized.len()], finalized, "seed {}", seed);
        }
        assert!(merged.len() >= existing.len());
    }
}

#[test]
fn test_empty_page_is_identity() {
    let mut rng = StdRng::seed_from_u64(7);
    let existing = aggregate(&random_offers(&mut rng, 5), &[]);
    assert_eq!(aggregate(&[], &existing), existing);
    assert!(aggregate(&[], &[]).is_empty());
}

#[test]
fn test_every_offer_is_accounted_for() {
    for seed in 0..CASES {
        let mut rng = StdRng::seed_from_u64(seed);
        let offers = random_offers(&mut rng, 10);
        let results = merge_pages(&random_pages(&mut rng, &offers));

        let offered: HashSet<(String, String)> = offers
            .iter()
            .map(|t| (t.trip_identifier(), t.agency.clone()))
            .collect();
        let grouped: HashSet<(String, String)> = results
            .iter()
            .flat_map(|g| {
                g.agency_codes()
                    .map(|a| (g.trip_identifier.clone(), a.to_string()))
                    .collect::<Vec<_>>()
            })
            .collect();
        assert_eq!(offered, grouped, "seed {}", seed);
    }
}

#[test]
fn test_url_always_belongs_to_a_listed_agency() {
    for seed in 0..CASES {
        let mut rng = StdRng::seed_from_u64(seed);
        let offers = random_offers(&mut rng, 10);
        let pages = random_pages(&mut rng, &offers);

        let results = pages
            .iter()
            .fold(Vec::new(), |acc, page| aggregate(page, &acc));
        for g in &results {
            assert!(
                g.agencies.iter().any(|a| a.url == g.url()),
                "seed {}: url {} not offered by any agency of {}",
                seed,
                g.url(),
                g.trip_identifier
            );
        }
    }
}

fn offer_keys(offers: &[Trip]) -> HashSet<(String, String)> {
    offers
        .iter()
        .map(|t| (t.trip_identifier(), t.agency.clone()))
        .collect()
}

fn grouped_keys(results: &[GroupedTrip]) -> HashSet<(String, String)> {
    results
        .iter()
        .flat_map(|g| {
            g.agency_codes()
                .map(|a| (g.trip_identifier.clone(), a.to_string()))
                .collect::<Vec<_>>()
        })
        .collect()
}

#[test]
fn test_shuffled_page_groups_by_first_seen_order() {
    for seed in 0..CASES {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut offers = random_offers(&mut rng, 10);
        offers.shuffle(&mut rng);
        let results = merge_pages(&[offers.clone()]);

        let mut first_seen: Vec<String> = Vec::new();
        for t in &offers {
            let id = t.trip_identifier();
            if !first_seen.contains(&id) {
                first_seen.push(id);
            }
        }
        let ids: Vec<String> = results.iter().map(|g| g.trip_identifier.clone()).collect();
        assert_eq!(ids, first_seen, "seed {}", seed);
        assert_eq!(offer_keys(&offers), grouped_keys(&results), "seed {}", seed);
        for g in &results {
            let codes: HashSet<&str> = g.agency_codes().collect();
            assert_eq!(codes.len(), g.agencies.len(), "seed {}", seed);
        }
    }
}

#[test]
fn test_shuffled_pages_account_for_every_offer() {
    for seed in 0..CASES {
        let mut rng = StdRng::seed_from_u64(seed);
        let offers = random_offers(&mut rng, 10);
        let mut pages = random_pages(&mut rng, &offers);
        for page in &mut pages {
            page.shuffle(&mut rng);
        }
        let results = merge_pages(&pages);

        assert_eq!(offer_keys(&offers), grouped_keys(&results), "seed {}", seed);
        for g in &results {
            let codes: HashSet<&str> = g.agency_codes().collect();
            assert_eq!(codes.len(), g.agencies.len(), "seed {}", seed);
        }
    }
}

/// Only the last result is re-opened: a stay seen earlier starts a new
/// result when it reappears after another stay.
#[test]
fn test_only_last_result_reopens() {
    let page1 = vec![
        trip(1, 1000.0, "2026-06-01", 7, "A"),
        trip(2, 1000.0, "2026-06-01", 7, "A"),
    ];
    let page2 = vec![
        trip(2, 1000.0, "2026-06-01", 7, "B"),
        trip(1, 1000.0, "2026-06-01", 7, "B"),
    ];
    let first = aggregate(&page1, &[]);
    let merged = aggregate(&page2, &first);

    assert_eq!(merged.len(), 3);
    assert_eq!(merged[0], first[0]);
    assert_eq!(merged[1].agency_codes().collect::<Vec<_>>(), ["A", "B"]);
    assert_eq!(merged[2].trip_identifier, "1.1000.2026-06-01.7");
    assert_eq!(merged[2].agency_codes().collect::<Vec<_>>(), ["B"]);
}

#[test]
fn test_boundary_merge_scenario() {
    let page1 = vec![
        trip(10, 1000.0, "2024-06-01", 7, "A"),
        trip(11, 2000.0, "2024-06-02", 7, "A"),
    ];
    let page2 = vec![
        trip(11, 2000.0, "2024-06-02", 7, "B"),
        trip(12, 3000.0, "2024-06-03", 7, "B"),
    ];

    let mut aggregator = TripAggregator::new(KeepFirstUrl);
    let first = aggregator.aggregate(&page1, &[]);
    let merged = aggregator.aggregate(&page2, &first);

    let ids: Vec<&str> = merged.iter().map(|g| g.trip_identifier.as_str()).collect();
    assert_eq!(
        ids,
        ["10.1000.2024-06-01.7", "11.2000.2024-06-02.7", "12.3000.2024-06-03.7"]
    );
    assert_eq!(merged[1].agency_codes().collect::<Vec<_>>(), ["A", "B"]);
    assert_eq!(merged[1].url(), "https://a.example/11");
    assert_eq!(first[1].agencies.len(), 1);
}
