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

//! # Search Session
//!
//! One search's accumulated results. Pages are fetched one after another and
//! merged into the grouped list before the next page can be requested.

use std::future::Future;

use anyhow::Result;
use rand::rngs::StdRng;

use crate::trips_aggregator::{AgencyOrder, InvertedDrawPolicy, TripAggregator, UrlSelectionPolicy};
use crate::trips_model::{GroupedTrip, Trip};
use crate::trips_query_builder::{SearchKind, TripsFilter};

/// Anything that can serve pages of raw offers for a filter.
pub trait TripSource {
    /// Pages are numbered from 1. An empty page means no more results.
    fn fetch_page(
        &self,
        kind: SearchKind,
        filter: &TripsFilter,
        page: u32,
    ) -> impl Future<Output = Result<Vec<Trip>>> + Send;
}

pub struct SearchSession<S, P = InvertedDrawPolicy<StdRng>> {
    source: S,
    aggregator: TripAggregator<P>,
    kind: SearchKind,
    filter: Option<TripsFilter>,
    page: u32,
    results: Vec<GroupedTrip>,
    has_more: bool,
}

impl<S: TripSource> SearchSession<S> {
    pub fn new(source: S, kind: SearchKind) -> Self {
        Self::with_policy(source, kind, InvertedDrawPolicy::from_entropy())
    }
}

impl<S: TripSource, P: UrlSelectionPolicy> SearchSession<S, P> {
    pub fn with_policy(source: S, kind: SearchKind, policy: P) -> Self {
        Self {
            source,
            aggregator: TripAggregator::new(policy),
            kind,
            filter: None,
            page: 0,
            results: Vec::new(),
            has_more: false,
        }
    }

    pub fn agency_order(mut self, order: AgencyOrder) -> Self {
        self.aggregator = self.aggregator.agency_order(order);
        self
    }

    pub fn kind(&self) -> SearchKind {
        self.kind
    }

    pub fn filter(&self) -> Option<&TripsFilter> {
        self.filter.as_ref()
    }

    /// Last page merged, 0 before the first search.
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn results(&self) -> &[GroupedTrip] {
        &self.results
    }

    pub fn into_results(self) -> Vec<GroupedTrip> {
        self.results
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Start a new search, discarding previous results. Returns the grouped
    /// results of page 1.
    ///
    /// On a fetch error the previous search is left untouched.
    pub async fn search(&mut self, filter: TripsFilter) -> Result<&[GroupedTrip]> {
        let trips = self.source.fetch_page(self.kind, &filter, 1).await?;

        self.filter = Some(filter);
        self.page = 1;
        self.results.clear();
        self.merge(&trips);
        Ok(&self.results)
    }

    /// Fetch and merge the next page. Does nothing once the backend returned
    /// an empty page, or before `search` was called.
    pub async fn next_page(&mut self) -> Result<&[GroupedTrip]> {
        let Some(filter) = self.filter.as_ref() else {
            tracing::warn!("next_page called before search");
            return Ok(&self.results);
        };
        if !self.has_more {
            return Ok(&self.results);
        }

        let page = self.page + 1;
        let trips = self.source.fetch_page(self.kind, filter, page).await?;
        self.page = page;
        self.merge(&trips);
        Ok(&self.results)
    }

    /// Fetch pages until `max_pages` have been merged or results run out.
    pub async fn load_pages(&mut self, filter: TripsFilter, max_pages: u32) -> Result<&[GroupedTrip]> {
        self.search(filter).await?;
        while self.has_more && self.page < max_pages {
            self.next_page().await?;
        }
        Ok(&self.results)
    }

    fn merge(&mut self, trips: &[Trip]) {
        if trips.is_empty() {
            tracing::info!("Page {} is empty, no more results", self.page);
            self.has_more = false;
            return;
        }
        self.results = self.aggregator.aggregate(trips, &self.results);
        self.has_more = true;
        tracing::debug!(
            "Page {}: {} offers, {} grouped results so far",
            self.page,
            trips.len(),
            self.results.len()
        );
    }
}
