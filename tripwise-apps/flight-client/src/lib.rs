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

// Library for tripwise-flight-client
// Client for the Tripwise flight-search backend (search, complete results, details, history)

mod config;
mod flights_api;
mod flights_response_normalizer;
mod gateway;
mod query_params;
mod routes;
mod transport;

pub use config::ClientConfig;

// Re-export commonly used items from flights_api
pub use flights_api::*;

pub use flights_response_normalizer::{
    normalize_complete_results, normalize_flight_details, normalize_search,
    resolve_search_session_token, DetailsFailure, FlightDetailsResponse, SearchHistory,
    SearchResponse,
};

pub use gateway::{AuthGateway, LoggingNavigator, LoginNavigator};
pub use query_params::{FlightDetailsOptions, QueryParams};
pub use routes::{Navigation, Route, RouteTable};
pub use transport::{
    bearer_header, ApiRequest, HttpResponse, HttpTransport, Method, TransportError, WreqTransport,
};

// Session types are part of this crate's public surface
pub use tripwise_auth_session::{
    AuthTokenPair, FileTokenStore, MemoryTokenStore, SessionContext, TokenStore,
};
