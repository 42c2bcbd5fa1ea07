//! Tripwise Auth Session
//! Copyright (c) 2026 Mamy Ratsimbazafy
//! Licensed and distributed under either of
//!   * MIT license (license terms at the root of the package or at http://opensource.org/licenses/MIT).
//!   * Apache v2 license (license terms at the root of the package or at http://www.apache.org/licenses/LICENSE-2.0).
//! at your option. This file may not be copied, modified, or distributed except according to those terms.

use std::sync::Arc;

use tokio::sync::watch;

use crate::store::{AuthTokenPair, StoreError, TokenStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};

/// Session state shared by the request layer and login/logout flows.
///
/// The token store is the source of truth. Subscribers receive the current
/// access token every time it changes ("auth changed"), which is how HTTP
/// clients keep their default `Authorization` header in sync.
///
/// Lifecycle: [`SessionContext::init`] at startup, [`SessionContext::login`]
/// or [`SessionContext::store_access_token`] on login/refresh,
/// [`SessionContext::logout`] on logout or unrecoverable auth failure.
pub struct SessionContext {
    store: Arc<dyn TokenStore>,
    auth_changed: watch::Sender<Option<String>>,
}

impl SessionContext {
    pub fn init(store: Arc<dyn TokenStore>) -> Self {
        let current = read_token(store.as_ref(), ACCESS_TOKEN_KEY);
        if current.is_some() {
            tracing::debug!("Access token found in token store");
        } else {
            tracing::warn!("No access token found in token store");
        }
        let (auth_changed, _) = watch::channel(current);
        Self {
            store,
            auth_changed,
        }
    }

    /// Receiver of the access token, updated on every auth change.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.auth_changed.subscribe()
    }

    pub fn access_token(&self) -> Option<String> {
        read_token(self.store.as_ref(), ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Option<String> {
        read_token(self.store.as_ref(), REFRESH_TOKEN_KEY)
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    pub fn login(&self, pair: &AuthTokenPair) -> Result<(), StoreError> {
        self.store.set(ACCESS_TOKEN_KEY, &pair.access_token)?;
        self.store.set(REFRESH_TOKEN_KEY, &pair.refresh_token)?;
        tracing::info!("Logged in, token pair stored");
        self.notify_auth_changed();
        Ok(())
    }

    /// Persist a refreshed access token. The refresh token is left untouched.
    ///
    /// Subscribers see the new token even when persisting it fails.
    pub fn store_access_token(&self, access_token: &str) -> Result<(), StoreError> {
        let stored = self.store.set(ACCESS_TOKEN_KEY, access_token);
        self.auth_changed
            .send_replace(Some(access_token.to_string()));
        stored
    }

    /// Remove both tokens and broadcast the logged-out state.
    ///
    /// Store failures are logged; subscribers are cleared regardless.
    pub fn logout(&self) {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY] {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!("Failed to remove {} from token store: {}", key, e);
            }
        }
        self.auth_changed.send_replace(None);
        tracing::warn!("Session cleared");
    }

    /// Re-read the store and broadcast the result. Called by code that
    /// mutated the store directly.
    pub fn notify_auth_changed(&self) {
        let token = self.access_token();
        match &token {
            Some(_) => tracing::debug!("Auth changed: access token updated"),
            None => tracing::warn!("Auth changed: access token removed"),
        }
        self.auth_changed.send_replace(token);
    }
}

fn read_token(store: &dyn TokenStore, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(value) => value.filter(|v| !v.is_empty()),
        Err(e) => {
            tracing::warn!("Failed to read {} from token store: {}", key, e);
            None
        }
    }
}
