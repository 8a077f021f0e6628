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

use std::env;
use std::fmt::Display;
use std::str::FromStr;

use anyhow::{Context, Result, ensure};

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

pub const API_URL_VAR: &str = "FERDIR_API_URL";
pub const TIMEOUT_VAR: &str = "FERDIR_TIMEOUT_SECS";
pub const MAX_CONCURRENT_VAR: &str = "FERDIR_MAX_CONCURRENT";
pub const MAX_RETRIES_VAR: &str = "FERDIR_MAX_RETRIES";

/// Settings for `TripsApiClient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_concurrent: usize,
    pub max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 10,
            max_concurrent: 4,
            max_retries: 3,
        }
    }
}

impl ClientConfig {
    /// Reads `FERDIR_*` variables, keeping defaults for unset ones.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            base_url: try_load(API_URL_VAR, defaults.base_url)?,
            timeout_secs: try_load(TIMEOUT_VAR, defaults.timeout_secs)?,
            max_concurrent: try_load(MAX_CONCURRENT_VAR, defaults.max_concurrent)?,
            max_retries: try_load(MAX_RETRIES_VAR, defaults.max_retries)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.base_url.starts_with("http://") || self.base_url.starts_with("https://"),
            "API URL must start with http:// or https://: {}",
            self.base_url
        );
        ensure!(self.timeout_secs > 0, "Timeout must be at least 1 second");
        ensure!(self.max_concurrent > 0, "At least one concurrent request is required");
        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn api_root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

fn try_load<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .context(format!("Invalid {} value: {}", key, raw)),
        Err(_) => {
            tracing::debug!("{} not set, using default: {}", key, default);
            Ok(default)
        }
    }
}
