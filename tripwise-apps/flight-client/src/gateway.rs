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

//! # Authenticated Request Gateway
//!
//! Every backend call goes through [`AuthGateway::execute`], which attaches
//! the session's bearer token and recovers from one expired-token (401)
//! response per request by refreshing the token and re-issuing the request.

use crate::config::ClientConfig;
use crate::transport::{ApiRequest, HttpResponse, HttpTransport, TransportError, bearer_header};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::watch;
use tripwise_auth_session::{Attempt, SessionContext, with_single_retry_on_auth_failure};

/// Sends the user to the login view once their session is unrecoverable.
pub trait LoginNavigator: Send + Sync {
    fn redirect_to_login(&self, login_route: &str);
}

/// Navigator for headless use: only logs the redirect.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNavigator;

impl LoginNavigator for LoggingNavigator {
    fn redirect_to_login(&self, login_route: &str) {
        tracing::warn!("Session expired, log in again (redirect to {})", login_route);
    }
}

pub struct AuthGateway<T> {
    transport: T,
    session: Arc<SessionContext>,
    /// Access token behind the default `Authorization` header
    default_token: watch::Receiver<Option<String>>,
    navigator: Arc<dyn LoginNavigator>,
    token_refresh_path: String,
    login_route: String,
}

impl<T: HttpTransport> AuthGateway<T> {
    pub fn new(
        transport: T,
        session: Arc<SessionContext>,
        navigator: Arc<dyn LoginNavigator>,
        config: &ClientConfig,
    ) -> Self {
        let default_token = session.subscribe();
        Self {
            transport,
            session,
            default_token,
            navigator,
            token_refresh_path: config.token_refresh_path.clone(),
            login_route: config.login_route.clone(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    /// `Authorization` value attached to requests that do not set their own.
    pub fn default_authorization(&self) -> Option<String> {
        self.default_token.borrow().as_deref().map(bearer_header)
    }

    /// Send `request`, resolving to a 2xx response or the failure.
    ///
    /// A 401 triggers one token refresh and one re-issue with the new token.
    /// If no refresh token is stored, or the refresh fails, the session is
    /// cleared, the navigator is sent to the login route, and the original
    /// 401 is returned.
    pub async fn execute(&self, request: ApiRequest) -> Result<HttpResponse, TransportError> {
        with_single_retry_on_auth_failure(
            |attempt| self.dispatch(&request, attempt),
            || self.refresh_access_token(),
        )
        .await
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        attempt: Attempt,
    ) -> Result<HttpResponse, TransportError> {
        let mut request = request.clone();
        match attempt.access_token() {
            Some(access_token) => request.authorization = Some(bearer_header(access_token)),
            None => {
                if request.authorization.is_none() {
                    request.authorization = self.default_authorization();
                }
            }
        }

        let path = request.path.clone();
        let start = std::time::Instant::now();
        let result = self
            .transport
            .send(request)
            .await
            .and_then(HttpResponse::error_for_status);
        tracing::debug!(
            "[execute] {} ({}) finished in {:?}: {}",
            path,
            if attempt.is_retry() { "retry" } else { "initial" },
            start.elapsed(),
            match &result {
                Ok(response) => response.status.to_string(),
                Err(e) => e.to_string(),
            }
        );
        result
    }

    /// New access token, or `None` after forcing a logout.
    ///
    /// The refresh call goes straight to the transport: it carries no bearer
    /// and is never itself refreshed.
    async fn refresh_access_token(&self) -> Option<String> {
        let Some(refresh_token) = self.session.refresh_token() else {
            tracing::warn!("No refresh token found");
            self.force_login();
            return None;
        };

        tracing::info!("Attempting to refresh access token...");
        let request = ApiRequest::post_json(
            self.token_refresh_path.as_str(),
            json!({ "refresh": refresh_token }),
        );
        let response = match self
            .transport
            .send(request)
            .await
            .and_then(HttpResponse::error_for_status)
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Token refresh error: {}", e);
                self.force_login();
                return None;
            }
        };

        let Some(access_token) = response
            .body
            .get("access")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
        else {
            tracing::error!("Token refresh failed: no access token in response");
            self.force_login();
            return None;
        };

        if let Err(e) = self.session.store_access_token(access_token) {
            tracing::warn!("Refreshed access token could not be persisted: {}", e);
        }
        tracing::info!("Token refreshed successfully");
        Some(access_token.to_string())
    }

    fn force_login(&self) {
        self.session.logout();
        self.navigator.redirect_to_login(&self.login_route);
    }
}
