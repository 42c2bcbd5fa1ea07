//!  Tripwise Flight Client
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

use serde::{Deserialize, Serialize};

/// Where the backend lives and how its endpoints are laid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ClientConfig {
    pub base_url: String,
    pub flights_path: String,
    pub token_refresh_path: String,
    pub login_route: String,
    /// Request timeout. `None` keeps the transport default.
    pub timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            flights_path: "/api/flights/".to_string(),
            token_refresh_path: "/api/token/refresh/".to_string(),
            login_route: "/login".to_string(),
            timeout_secs: None,
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Path of a flights endpoint, e.g. `search/` -> `/api/flights/search/`.
    pub fn flights_endpoint(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.flights_path.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_join_without_double_slashes() {
        let config = ClientConfig::default();
        assert_eq!(config.flights_endpoint("search/"), "/api/flights/search/");
        assert_eq!(
            config.flights_endpoint("/get-airports/"),
            "/api/flights/get-airports/"
        );
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"base_url": "https://api.example.test", "timeout_secs": 5}"#)
                .unwrap();
        assert_eq!(config.base_url, "https://api.example.test");
        assert_eq!(config.flights_path, "/api/flights/");
        assert_eq!(config.token_refresh_path, "/api/token/refresh/");
        assert_eq!(config.timeout_secs, Some(5));
    }
}
