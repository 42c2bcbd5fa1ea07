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

//! # Flights Response Normalizer
//!
//! Side-effect free reshaping of backend flight-search JSON.
//! The upstream aggregator does not keep a stable response shape, so every
//! endpoint is matched against an ordered list of known shapes and the first
//! match wins. Itineraries themselves are never inspected.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub(crate) const SEARCH_FAILED: &str = "Flight search failed";
pub(crate) const COMPLETE_RESULTS_FAILED: &str = "Failed to get complete results";
pub(crate) const DETAILS_FAILED: &str = "Failed to load flight details";
const ITINERARIES_NOT_FOUND: &str = "Could not extract itineraries from response";

/// Canonical result of a search or complete-results call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SearchResponse {
    Itineraries {
        items: Vec<Value>,
        session_token: String,
    },
    CountryDestination {
        payload: Value,
        session_token: String,
    },
    Unknown {
        raw: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    Error {
        message: String,
    },
}

impl SearchResponse {
    pub fn error(message: impl Into<String>) -> Self {
        SearchResponse::Error {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SearchResponse::Itineraries { .. } => "itineraries",
            SearchResponse::CountryDestination { .. } => "countryDestination",
            SearchResponse::Unknown { .. } => "unknown",
            SearchResponse::Error { .. } => "error",
        }
    }

    pub fn session_token(&self) -> Option<&str> {
        match self {
            SearchResponse::Itineraries { session_token, .. }
            | SearchResponse::CountryDestination { session_token, .. } => Some(session_token),
            _ => None,
        }
    }

    pub fn itineraries(&self) -> &[Value] {
        match self {
            SearchResponse::Itineraries { items, .. } => items,
            _ => &[],
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SearchResponse::Error { .. })
    }
}

// =============================================================================
// JSON helpers
// =============================================================================

/// Loose truthiness: absent, null, false, 0 and "" are all "not there".
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn token_at(value: &Value, pointer: &str) -> Option<String> {
    match value.pointer(pointer)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        n @ Value::Number(_) if is_present(n) => Some(n.to_string()),
        _ => None,
    }
}

fn array_at(value: &Value, pointer: &str) -> Option<Vec<Value>> {
    value.pointer(pointer)?.as_array().cloned()
}

fn reports_success(payload: &Value) -> bool {
    payload.get("status") == Some(&Value::Bool(true))
}

pub(crate) fn payload_message(payload: &Value) -> Option<&str> {
    payload
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
}

// =============================================================================
// Search
// =============================================================================

/// Session token locations of a search response, highest priority first.
const SEARCH_SESSION_TOKEN_PATHS: &[&str] = &[
    "/context/sessionId",
    "/sessionId",
    "/session/token",
    "/flightsSessionId",
    "/itineraries/0/context/sessionId",
    "/token",
];

/// First non-empty session token of a search response's `data`, or "".
pub fn resolve_search_session_token(data: &Value) -> String {
    SEARCH_SESSION_TOKEN_PATHS
        .iter()
        .find_map(|pointer| token_at(data, pointer))
        .unwrap_or_default()
}

type SearchShape = fn(&Value) -> Option<SearchResponse>;

const SEARCH_SHAPES: &[(&str, SearchShape)] = &[
    ("itineraries", search_itineraries),
    ("countryDestination", search_country_destination),
];

fn search_itineraries(data: &Value) -> Option<SearchResponse> {
    let items = array_at(data, "/itineraries")?;
    Some(SearchResponse::Itineraries {
        items,
        session_token: resolve_search_session_token(data),
    })
}

fn search_country_destination(data: &Value) -> Option<SearchResponse> {
    let payload = data.get("countryDestination").filter(|v| is_present(v))?;
    Some(SearchResponse::CountryDestination {
        session_token: token_at(payload, "/context/sessionId").unwrap_or_default(),
        payload: payload.clone(),
    })
}

/// Normalize the body of a 2xx `search/` response.
pub fn normalize_search(payload: &Value) -> SearchResponse {
    if !reports_success(payload) {
        return SearchResponse::error(payload_message(payload).unwrap_or(SEARCH_FAILED));
    }

    let data = payload.get("data").unwrap_or(&Value::Null);
    for (shape, matcher) in SEARCH_SHAPES {
        if let Some(response) = matcher(data) {
            tracing::debug!(
                "Search response matched shape '{}', session token: {:?}",
                shape,
                response.session_token()
            );
            return response;
        }
    }

    tracing::warn!("Unknown search response structure");
    SearchResponse::Unknown {
        raw: data.clone(),
        note: None,
    }
}

// =============================================================================
// Complete results
// =============================================================================

/// Itineraries found in a complete-results `data`, with the session token
/// the shape carries (if any).
struct ShapeMatch {
    items: Vec<Value>,
    session_token: Option<String>,
}

type CompleteResultsShape = fn(&Value) -> Option<ShapeMatch>;

/// Priority order is load-bearing: a payload can match several shapes.
const COMPLETE_RESULTS_SHAPES: &[(&str, CompleteResultsShape)] = &[
    ("data.data.itineraries", nested_data_itineraries),
    ("data.itineraries", direct_itineraries),
    ("data.content.results", content_results),
    ("data.rawData.itineraries", raw_data_itineraries),
    ("shallow scan", scanned_itineraries),
];

fn nested_data_itineraries(data: &Value) -> Option<ShapeMatch> {
    Some(ShapeMatch {
        items: array_at(data, "/data/itineraries")?,
        session_token: None,
    })
}

fn direct_itineraries(data: &Value) -> Option<ShapeMatch> {
    Some(ShapeMatch {
        items: array_at(data, "/itineraries")?,
        session_token: token_at(data, "/context/sessionId")
            .or_else(|| token_at(data, "/flightsSessionId")),
    })
}

fn content_results(data: &Value) -> Option<ShapeMatch> {
    Some(ShapeMatch {
        items: array_at(data, "/content/results")?,
        session_token: token_at(data, "/content/context/sessionId"),
    })
}

fn raw_data_itineraries(data: &Value) -> Option<ShapeMatch> {
    Some(ShapeMatch {
        items: array_at(data, "/rawData/itineraries")?,
        session_token: None,
    })
}

/// Walk the first level of `data`, in key order for objects and index order
/// for arrays. The first `itineraries` array found, at the root or one level
/// down, ends the walk.
fn scanned_itineraries(data: &Value) -> Option<ShapeMatch> {
    fn nested(value: &Value) -> Option<&Vec<Value>> {
        match value {
            Value::Object(_) => value.get("itineraries").and_then(Value::as_array),
            _ => None,
        }
    }

    let found = match data {
        Value::Object(object) => object.iter().find_map(|(key, value)| {
            if key == "itineraries" && value.is_array() {
                return value.as_array();
            }
            nested(value)
        }),
        Value::Array(elements) => elements.iter().find_map(nested),
        _ => None,
    }?;

    if found.is_empty() {
        return None;
    }
    Some(ShapeMatch {
        items: found.clone(),
        session_token: None,
    })
}

/// Normalize the body of a 2xx `get-complete-results/` response.
/// `session_id` is the token the call was made with.
pub fn normalize_complete_results(payload: &Value, session_id: &str) -> SearchResponse {
    if !reports_success(payload) {
        return SearchResponse::error(
            payload_message(payload).unwrap_or(COMPLETE_RESULTS_FAILED),
        );
    }

    let data = payload.get("data").unwrap_or(&Value::Null);
    for (shape, matcher) in COMPLETE_RESULTS_SHAPES {
        if let Some(found) = matcher(data) {
            tracing::debug!(
                "Found {} itineraries in complete results shape '{}'",
                found.items.len(),
                shape
            );
            return SearchResponse::Itineraries {
                items: found.items,
                session_token: found
                    .session_token
                    .unwrap_or_else(|| session_id.to_string()),
            };
        }
    }

    tracing::warn!("Unknown complete results structure, no itineraries extracted");
    SearchResponse::Unknown {
        raw: data.clone(),
        note: Some(ITINERARIES_NOT_FOUND.to_string()),
    }
}

// =============================================================================
// Flight details
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailsFailure {
    status: bool,
    message: String,
    data: Option<Value>,
}

impl DetailsFailure {
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Upstream details payload, or `{status: false, message, data: null}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FlightDetailsResponse {
    Details(Value),
    Failure(DetailsFailure),
}

impl FlightDetailsResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        FlightDetailsResponse::Failure(DetailsFailure {
            status: false,
            message: message.into(),
            data: None,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FlightDetailsResponse::Details(_))
    }

    pub fn failure_message(&self) -> Option<&str> {
        match self {
            FlightDetailsResponse::Failure(failure) => Some(failure.message()),
            FlightDetailsResponse::Details(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FlightDetailsResponse::Details(payload) => payload.clone(),
            FlightDetailsResponse::Failure(failure) => json!({
                "status": failure.status,
                "message": failure.message,
                "data": failure.data,
            }),
        }
    }
}

/// Normalize the body of a 2xx `get-flight-details/` response.
pub fn normalize_flight_details(payload: &Value) -> FlightDetailsResponse {
    let has_data = payload.get("data").is_some_and(is_present);
    if reports_success(payload) && has_data {
        FlightDetailsResponse::Details(payload.clone())
    } else {
        FlightDetailsResponse::failure(payload_message(payload).unwrap_or(DETAILS_FAILED))
    }
}

// =============================================================================
// Search history
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum SearchHistory {
    /// Upstream payload, unchanged
    Entries(Value),
    LoginRequired,
    Unavailable,
}

impl SearchHistory {
    pub fn to_json(&self) -> Value {
        match self {
            SearchHistory::Entries(payload) => payload.clone(),
            SearchHistory::LoginRequired => json!({ "error": "Login required" }),
            SearchHistory::Unavailable => json!({ "results": [] }),
        }
    }
}

impl Serialize for SearchHistory {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

// =============================================================================
// Tests
// =============================================================================
