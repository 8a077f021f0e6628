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

//! Search session paging against an in-memory trip source.


use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use chrono::NaiveDate;
use ferdir_trip_search::{
    AgencyOrder, KeepFirstUrl, SearchKind, SearchSession, Trip, TripSource, TripsFilter,
};

use trip_fixtures::trip;

#[derive(Clone, Default)]
struct PagedSource {
    pages: Vec<Vec<Trip>>,
    failing_page: Arc<Mutex<Option<u32>>>,
    requests: Arc<Mutex<Vec<(SearchKind, u32)>>>,
}

impl PagedSource {
    fn new(pages: Vec<Vec<Trip>>) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    fn fail_on(&self, page: u32) {
        *self.failing_page.lock().unwrap() = Some(page);
    }

    fn requested(&self) -> Vec<(SearchKind, u32)> {
        self.requests.lock().unwrap().clone()
    }
}

impl TripSource for PagedSource {
    async fn fetch_page(&self, kind: SearchKind, _filter: &TripsFilter, page: u32) -> Result<Vec<Trip>> {
        self.requests.lock().unwrap().push((kind, page));
        if *self.failing_page.lock().unwrap() == Some(page) {
            bail!("backend unavailable");
        }
        Ok(self
            .pages
            .get(page as usize - 1)
            .cloned()
            .unwrap_or_default())
    }
}

fn filter() -> TripsFilter {
    TripsFilter::builder(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap())
        .build()
        .unwrap()
}

fn two_pages() -> Vec<Vec<Trip>> {
    vec![
        vec![
            trip(10, 1000.0, "2024-06-01", 7, "A"),
            trip(11, 2000.0, "2024-06-02", 7, "A"),
        ],
        vec![
            trip(11, 2000.0, "2024-06-02", 7, "B"),
            trip(12, 3000.0, "2024-06-03", 7, "B"),
        ],
    ]
}

#[tokio::test]
async fn test_pages_merge_across_boundary() -> Result<()> {
    let source = PagedSource::new(two_pages());
    let mut session = SearchSession::with_policy(source.clone(), SearchKind::Package, KeepFirstUrl);

    assert_eq!(session.search(filter()).await?.len(), 2);
    assert!(session.has_more());

    let results = session.next_page().await?;
    assert_eq!(results.len(), 3);
    assert_eq!(results[1].agency_codes().collect::<Vec<_>>(), ["A", "B"]);
    assert_eq!(session.page(), 2);

    // Page 3 is empty: nothing changes and paging stops.
    assert_eq!(session.next_page().await?.len(), 3);
    assert!(!session.has_more());
    assert_eq!(session.next_page().await?.len(), 3);

    assert_eq!(
        source.requested(),
        [
            (SearchKind::Package, 1),
            (SearchKind::Package, 2),
            (SearchKind::Package, 3)
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_load_pages_stops_at_limit() -> Result<()> {
    let mut pages = two_pages();
    pages.push(vec![trip(13, 4000.0, "2024-06-04", 7, "C")]);
    let source = PagedSource::new(pages);
    let mut session = SearchSession::with_policy(source.clone(), SearchKind::Flight, KeepFirstUrl);

    let results = session.load_pages(filter(), 2).await?;
    assert_eq!(results.len(), 3);
    assert_eq!(session.page(), 2);
    assert!(session.has_more());
    assert_eq!(source.requested().len(), 2);
    assert!(source.requested().iter().all(|(kind, _)| *kind == SearchKind::Flight));
    Ok(())
}

#[tokio::test]
async fn test_new_search_resets_results() -> Result<()> {
    let source = PagedSource::new(two_pages());
    let mut session = SearchSession::with_policy(source, SearchKind::Package, KeepFirstUrl);

    session.load_pages(filter(), 5).await?;
    assert_eq!(session.results().len(), 3);

    let results = session.search(filter()).await?;
    assert_eq!(results.len(), 2);
    assert_eq!(session.page(), 1);
    Ok(())
}

#[tokio::test]
async fn test_next_page_before_search_is_noop() -> Result<()> {
    let source = PagedSource::new(two_pages());
    let mut session = SearchSession::with_policy(source.clone(), SearchKind::Package, KeepFirstUrl);
    assert!(session.next_page().await?.is_empty());
    assert!(session.filter().is_none());
    assert!(source.requested().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_fetch_error_keeps_previous_results() -> Result<()> {
    let source = PagedSource::new(two_pages());
    source.fail_on(2);
    let mut session = SearchSession::with_policy(source, SearchKind::Package, KeepFirstUrl);

    session.search(filter()).await?;
    let err = session.next_page().await.unwrap_err();
    assert!(err.to_string().contains("backend unavailable"));
    assert_eq!(session.results().len(), 2);
    assert_eq!(session.page(), 1);
    assert!(session.has_more());
    Ok(())
}

#[tokio::test]
async fn test_failed_new_search_keeps_previous_search() -> Result<()> {
    let source = PagedSource::new(two_pages());
    let mut session = SearchSession::with_policy(source.clone(), SearchKind::Package, KeepFirstUrl);

    session.load_pages(filter(), 2).await?;
    assert_eq!(session.results().len(), 3);

    source.fail_on(1);
    let other = TripsFilter::builder(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap())
        .adults(3)
        .build()?;
    assert!(session.search(other).await.is_err());

    assert_eq!(session.results().len(), 3);
    assert_eq!(session.page(), 2);
    assert!(session.has_more());
    assert_eq!(session.filter().map(|f| f.adults), Some(2));
    Ok(())
}

#[tokio::test]
async fn test_descending_agency_order() -> Result<()> {
    let page = vec![
        trip(20, 5000.0, "2024-07-01", 10, "B"),
        trip(20, 5000.0, "2024-07-01", 10, "A"),
        trip(20, 5000.0, "2024-07-01", 10, "C"),
    ];
    let source = PagedSource::new(vec![page]);
    let mut session = SearchSession::with_policy(source, SearchKind::Package, KeepFirstUrl)
        .agency_order(AgencyOrder::DescendingCode);

    let results = session.search(filter()).await?;
    assert_eq!(results[0].agency_codes().collect::<Vec<_>>(), ["C", "B", "A"]);
    Ok(())
}
