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

//! # Flights API Client
//!
//! Effectful (network) operations against the backend flights endpoints.
//! None of these return `Err`: transport and server failures are folded into
//! each operation's result type so callers can render them directly.

use crate::config::ClientConfig;
use crate::flights_response_normalizer::{
    DETAILS_FAILED, FlightDetailsResponse, SearchHistory, SearchResponse,
    normalize_complete_results, normalize_flight_details, normalize_search,
};
use crate::gateway::{AuthGateway, LoginNavigator};
use crate::query_params::{FlightDetailsOptions, QueryParams};
use crate::transport::{ApiRequest, HttpTransport, TransportError, WreqTransport};
use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;
use tripwise_auth_session::SessionContext;

const SEARCH_ERROR: &str = "Flight search error occurred";
const COMPLETE_RESULTS_ERROR: &str = "Error while getting complete search results";
const EMPTY_SESSION_ID: &str = "Session ID is empty or invalid";
const MISSING_DETAILS_PARAMS: &str = "Required parameters are missing.";
const SERVER_UNREACHABLE: &str =
    "Failed to connect to server. Please check your network connection.";

pub struct FlightsApiClient<T = WreqTransport> {
    gateway: AuthGateway<T>,
    config: ClientConfig,
}

impl FlightsApiClient<WreqTransport> {
    /// Client talking to `config.base_url` over HTTP.
    pub fn connect(
        config: ClientConfig,
        session: Arc<SessionContext>,
        navigator: Arc<dyn LoginNavigator>,
    ) -> Result<Self> {
        let transport = WreqTransport::new(&config)?;
        Ok(Self::with_transport(transport, config, session, navigator))
    }
}

impl<T: HttpTransport> FlightsApiClient<T> {
    pub fn with_transport(
        transport: T,
        config: ClientConfig,
        session: Arc<SessionContext>,
        navigator: Arc<dyn LoginNavigator>,
    ) -> Self {
        let gateway = AuthGateway::new(transport, session, navigator, &config);
        Self { gateway, config }
    }

    pub fn gateway(&self) -> &AuthGateway<T> {
        &self.gateway
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn get(&self, endpoint: &str, query: QueryParams) -> Result<Value, TransportError> {
        let request = ApiRequest::get(self.config.flights_endpoint(endpoint)).with_query(query);
        let response = self.gateway.execute(request).await?;
        Ok(response.body)
    }

    /// Search flights. `params` are passed through to the backend untouched
    /// (`fromEntityId`, `toEntityId`, `departDate`, `returnDate`, ...).
    pub async fn search_flights(&self, params: &QueryParams) -> SearchResponse {
        let start = std::time::Instant::now();
        let result = match self.get("search/", params.clone()).await {
            Ok(payload) => normalize_search(&payload),
            Err(e) => {
                tracing::warn!("Flight search request failed: {}", e);
                SearchResponse::error(failure_message(&e, SEARCH_ERROR))
            }
        };
        tracing::info!(
            "search_flights -> {} ({} itineraries) in {:?}",
            result.kind(),
            result.itineraries().len(),
            start.elapsed()
        );
        result
    }

    /// Fetch the complete results of a search session. `options` are merged
    /// after `sessionId` and win on conflicts.
    pub async fn get_complete_results(
        &self,
        session_id: &str,
        options: &QueryParams,
    ) -> SearchResponse {
        if session_id.trim().is_empty() {
            tracing::error!("get_complete_results called with empty session id");
            return SearchResponse::error(EMPTY_SESSION_ID);
        }

        let mut query = QueryParams::new().with("sessionId", session_id);
        query.merge(options);
        tracing::debug!("Fetching complete results for session {:?}", session_id);

        match self.get("get-complete-results/", query).await {
            Ok(payload) => normalize_complete_results(&payload, session_id),
            Err(e) => {
                tracing::error!("Complete results request failed: {}", e);
                SearchResponse::error(failure_message(&e, COMPLETE_RESULTS_ERROR))
            }
        }
    }

    pub async fn get_flight_details(
        &self,
        token: &str,
        itinerary_id: &str,
        options: &FlightDetailsOptions,
    ) -> FlightDetailsResponse {
        if token.is_empty() || itinerary_id.is_empty() {
            return FlightDetailsResponse::failure(MISSING_DETAILS_PARAMS);
        }

        let query = options.to_query(token, itinerary_id);
        match self.get("get-flight-details/", query).await {
            Ok(payload) => normalize_flight_details(&payload),
            Err(e) => {
                tracing::warn!("Flight details request failed: {}", e);
                FlightDetailsResponse::failure(details_failure_message(&e))
            }
        }
    }

    /// Airport autocomplete. Failures yield an empty list.
    pub async fn search_airports(&self, query: &str) -> Vec<Value> {
        if query.trim().is_empty() {
            return Vec::new();
        }

        match self
            .get("get-airports/", QueryParams::new().with("query", query))
            .await
        {
            Ok(Value::Array(airports)) => airports,
            Ok(Value::Null) => Vec::new(),
            Ok(other) => {
                tracing::warn!("Airport search returned a non-list payload: {}", other);
                Vec::new()
            }
            Err(e) => {
                tracing::debug!("Airport search failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Search history of the logged-in user.
    pub async fn get_search_history(&self) -> SearchHistory {
        let Some(access_token) = self.gateway.session().access_token() else {
            return SearchHistory::LoginRequired;
        };

        let request = ApiRequest::get(self.config.flights_endpoint("get-search-history/"))
            .with_bearer(&access_token);
        match self.gateway.execute(request).await {
            Ok(response) => SearchHistory::Entries(response.body),
            Err(e) if e.status() == Some(401) => SearchHistory::LoginRequired,
            Err(e) => {
                tracing::warn!("Search history request failed: {}", e);
                SearchHistory::Unavailable
            }
        }
    }
}

/// Server `message`, else the error's own description, else `fallback`.
fn failure_message(error: &TransportError, fallback: &str) -> String {
    if let Some(message) = error.server_message() {
        return message.to_string();
    }
    let description = error.to_string();
    if description.is_empty() {
        fallback.to_string()
    } else {
        description
    }
}

fn details_failure_message(error: &TransportError) -> String {
    if let Some(message) = error.server_message() {
        return message.to_string();
    }
    match error {
        TransportError::Status {
            status,
            status_text,
            ..
        } => format!("Server error ({}): {}", status, status_text),
        TransportError::Unreachable(_) => SERVER_UNREACHABLE.to_string(),
        TransportError::Other(description) if !description.is_empty() => description.clone(),
        TransportError::Other(_) => DETAILS_FAILED.to_string(),
    }
}
