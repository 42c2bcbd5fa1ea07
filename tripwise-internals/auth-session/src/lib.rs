//! Tripwise Auth Session
//! Copyright (c) 2026 Mamy Ratsimbazafy
//! Licensed and distributed under either of
//!   * MIT license (license terms at the root of the package or at http://opensource.org/licenses/MIT).
//!   * Apache v2 license (license terms at the root of the package or at http://www.apache.org/licenses/LICENSE-2.0).
//! at your option. This file may not be copied, modified, or distributed except according to those terms.

//! tripwise-internals/auth-session
//! Bearer token session state shared by HTTP clients, and a combinator that
//! retries a request at most once after an authentication failure.

mod session;
mod store;

pub use session::SessionContext;
pub use store::{
    AuthTokenPair, FileTokenStore, MemoryTokenStore, StoreError, TokenStore, ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
};

use std::future::Future;

/// Which attempt of a request is being issued.
///
/// The retry state lives in the combinator's stack frame, never on the
/// request itself, so a request can only ever see one `Retry`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    Initial,
    Retry { access_token: String },
}

impl Attempt {
    /// Token that must override whatever bearer the request would carry.
    pub fn access_token(&self) -> Option<&str> {
        match self {
            Attempt::Initial => None,
            Attempt::Retry { access_token } => Some(access_token),
        }
    }

    pub fn is_retry(&self) -> bool {
        matches!(self, Attempt::Retry { .. })
    }
}

/// Errors that can tell whether they were caused by an expired or
/// rejected credential (HTTP 401 for most backends).
pub trait AuthFailure {
    fn is_auth_failure(&self) -> bool;
}

/// Execute `request`, and if it fails with an authentication failure,
/// call `refresh` once and re-issue the request with the new access token.
///
/// - Successes and non-auth failures of the first attempt are returned as is.
/// - If `refresh` yields no token, the original failure is returned.
/// - The outcome of the retried attempt is final, even if it is another
///   authentication failure.
pub async fn with_single_retry_on_auth_failure<T, E, F, Fut, R, RFut>(
    mut request: F,
    refresh: R,
) -> Result<T, E>
where
    F: FnMut(Attempt) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: AuthFailure,
    R: FnOnce() -> RFut,
    RFut: Future<Output = Option<String>>,
{
    let error = match request(Attempt::Initial).await {
        Ok(result) => return Ok(result),
        Err(e) => e,
    };

    if !error.is_auth_failure() {
        return Err(error);
    }

    tracing::debug!("Authentication failure, attempting token refresh");
    match refresh().await {
        Some(access_token) => {
            tracing::debug!("Token refreshed, re-issuing request once");
            request(Attempt::Retry { access_token }).await
        }
        None => {
            tracing::debug!("Token refresh unavailable, propagating original failure");
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, PartialEq)]
    enum FakeError {
        Unauthorized,
        Server,
    }

    impl AuthFailure for FakeError {
        fn is_auth_failure(&self) -> bool {
            matches!(self, FakeError::Unauthorized)
        }
    }

    #[tokio::test]
    async fn success_skips_refresh() {
        let refreshes = AtomicUsize::new(0);
        let result: Result<u32, FakeError> = with_single_retry_on_auth_failure(
            |_| async { Ok(7) },
            || async {
                refreshes.fetch_add(1, Ordering::SeqCst);
                Some("new".to_string())
            },
        )
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_auth_failure_is_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, FakeError> = with_single_retry_on_auth_failure(
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(FakeError::Server) }
            },
            || async { Some("new".to_string()) },
        )
        .await;

        assert_eq!(result, Err(FakeError::Server));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn auth_failure_retries_once_with_new_token() {
        let attempts = Mutex::new(Vec::new());
        let result: Result<&str, FakeError> = with_single_retry_on_auth_failure(
            |attempt: Attempt| {
                let retry = attempt.is_retry();
                attempts.lock().unwrap().push(attempt);
                async move {
                    if retry {
                        Ok("ok")
                    } else {
                        Err(FakeError::Unauthorized)
                    }
                }
            },
            || async { Some("fresh".to_string()) },
        )
        .await;

        assert_eq!(result, Ok("ok"));
        let attempts = attempts.into_inner().unwrap();
        assert_eq!(
            attempts,
            vec![
                Attempt::Initial,
                Attempt::Retry {
                    access_token: "fresh".to_string()
                }
            ]
        );
    }

    #[tokio::test]
    async fn second_auth_failure_does_not_refresh_again() {
        let calls = AtomicUsize::new(0);
        let refreshes = AtomicUsize::new(0);
        let result: Result<(), FakeError> = with_single_retry_on_auth_failure(
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(FakeError::Unauthorized) }
            },
            || async {
                refreshes.fetch_add(1, Ordering::SeqCst);
                Some("fresh".to_string())
            },
        )
        .await;

        assert_eq!(result, Err(FakeError::Unauthorized));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_token_propagates_original_failure() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), FakeError> = with_single_retry_on_auth_failure(
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(FakeError::Unauthorized) }
            },
            || async { None },
        )
        .await;

        assert_eq!(result, Err(FakeError::Unauthorized));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
