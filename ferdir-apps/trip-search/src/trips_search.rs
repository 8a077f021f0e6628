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

//! # Trips API Client
//!
//! Effectful (network) operations against the trips backend: places,
//! agencies, result pages and shareable filters.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, ensure};
use ferdir_fetch_queue::{FetchFailure, FetchQueue, RetryPolicy};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use wreq::redirect::Policy;

use crate::config::ClientConfig;
use crate::search_session::TripSource;
use crate::trips_model::{Agency, Place, Trip};
use crate::trips_query_builder::{SearchKind, TripsFilter};

static FILTER_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("valid filter code regex"));

pub fn is_valid_filter_code(code: &str) -> bool {
    FILTER_CODE_RE.is_match(code)
}

fn body_preview(body: &str) -> String {
    body.chars().take(300).collect()
}

/// Turns an HTTP response into its body, classifying failures for the retry
/// queue: 429 and 5xx are worth retrying, other non-2xx statuses are not.
async fn read_body(response: wreq::Response) -> Result<String, FetchFailure> {
    let status = response.status();
    let body = response.text().await.map_err(FetchFailure::transient)?;

    tracing::debug!(
        "HTTP {} {} ({} bytes)",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown"),
        body.len()
    );

    if status.is_server_error() || status.as_u16() == 429 {
        return Err(FetchFailure::transient(anyhow!(
            "HTTP error {}: {}",
            status,
            body_preview(&body)
        )));
    }
    if !status.is_success() {
        return Err(FetchFailure::permanent(anyhow!(
            "HTTP error {}: {}",
            status,
            body_preview(&body)
        )));
    }
    Ok(body)
}

fn decode<T: DeserializeOwned>(body: &str, what: &str) -> Result<T> {
    serde_json::from_str(body).with_context(|| {
        format!(
            "Failed to decode {} response. Body preview: {}",
            what,
            body_preview(body)
        )
    })
}

#[derive(Clone)]
pub struct TripsApiClient {
    client: Arc<wreq::Client>,
    queue: FetchQueue,
    config: ClientConfig,
}

impl TripsApiClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let client = wreq::Client::builder()
            .redirect(Policy::default())
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        let queue = FetchQueue::new(
            config.max_concurrent,
            RetryPolicy::default().with_max_retries(config.max_retries),
        );
        Ok(Self {
            client: Arc::new(client),
            queue,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_root(), path)
    }

    /// Full URL of one results page, as requested by `fetch_page`.
    pub fn page_url(&self, kind: SearchKind, filter: &TripsFilter, page: u32) -> String {
        format!(
            "{}?{}",
            self.url(&format!("{}/", kind.endpoint())),
            filter.query_string(kind, page)
        )
    }

    async fn get_text(&self, label: &str, url: String) -> Result<String> {
        let client = Arc::clone(&self.client);
        let started = std::time::Instant::now();
        let body = self
            .queue
            .run(label, move || {
                let url = url.clone();
                let http_client = Arc::clone(&client);
                async move {
                    tracing::debug!("GET {}", url);
                    let response = http_client
                        .get(&url)
                        .header("Accept", "application/json")
                        .send()
                        .await
                        .map_err(FetchFailure::transient)?;
                    read_body(response).await
                }
            })
            .await
            .context(format!("Request for {} failed", label))?;
        tracing::debug!("[{}] fetched in {:?}", label, started.elapsed());
        Ok(body)
    }

    pub async fn get_places(&self) -> Result<Vec<Place>> {
        let body = self.get_text("places", self.url("places/")).await?;
        decode(&body, "places")
    }

    pub async fn get_flight_places(&self) -> Result<Vec<Place>> {
        let body = self.get_text("flightPlaces", self.url("flightPlaces/")).await?;
        decode(&body, "flight places")
    }

    pub async fn get_agencies(&self) -> Result<Vec<Agency>> {
        let body = self.get_text("agencies", self.url("agencies/")).await?;
        decode(&body, "agencies")
    }

    /// One page of raw offers. An empty page means there are no more results.
    pub async fn get_page(&self, kind: SearchKind, filter: &TripsFilter, page: u32) -> Result<Vec<Trip>> {
        filter.validate().context("Invalid search filter")?;
        ensure!(page >= 1, "Pages are numbered from 1");

        let url = self.page_url(kind, filter, page);
        let label = format!("{} page {}", kind.endpoint(), page);
        tracing::info!("Fetching {}", label);
        let body = self.get_text(&label, url).await?;
        let trips: Vec<Trip> = decode(&body, kind.endpoint())?;
        tracing::info!("{}: {} offers", label, trips.len());
        Ok(trips)
    }

    pub async fn get_trips(&self, filter: &TripsFilter, page: u32) -> Result<Vec<Trip>> {
        self.get_page(SearchKind::Package, filter, page).await
    }

    pub async fn get_flights(&self, filter: &TripsFilter, page: u32) -> Result<Vec<Trip>> {
        self.get_page(SearchKind::Flight, filter, page).await
    }

    /// Stores `filter` on the backend and returns its short share code.
    pub async fn create_filter(&self, filter: &TripsFilter) -> Result<String> {
        filter.validate().context("Invalid search filter")?;
        let url = self.url("createFilter/");
        let payload = filter.clone();
        let client = Arc::clone(&self.client);

        let body = self
            .queue
            .run("createFilter", move || {
                let url = url.clone();
                let payload = payload.clone();
                let http_client = Arc::clone(&client);
                async move {
                    tracing::debug!("POST {}", url);
                    let response = http_client
                        .post(&url)
                        .json(&payload)
                        .send()
                        .await
                        .map_err(FetchFailure::transient)?;
                    read_body(response).await
                }
            })
            .await
            .context("Request for createFilter failed")?;

        // The code comes back either as a JSON string or as plain text.
        let code = serde_json::from_str::<String>(&body).unwrap_or_else(|_| body.trim().to_string());
        ensure!(
            is_valid_filter_code(&code),
            "Unexpected filter code from backend: {}",
            body_preview(&code)
        );
        tracing::info!("Created filter {}", code);
        Ok(code)
    }

    /// Loads the filter stored under a share code.
    pub async fn get_filter(&self, code: &str) -> Result<TripsFilter> {
        ensure!(is_valid_filter_code(code), "Invalid filter code: {}", code);
        let url = self.url(&format!("filter/{}", urlencoding::encode(code)));
        let body = self.get_text("filter", url).await?;
        decode(&body, "filter")
    }
}

impl TripSource for TripsApiClient {
    async fn fetch_page(&self, kind: SearchKind, filter: &TripsFilter, page: u32) -> Result<Vec<Trip>> {
        self.get_page(kind, filter, page).await
    }
}
