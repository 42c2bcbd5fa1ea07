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

//! Gateway tests: bearer injection, refresh-and-retry-once on 401, forced
//! logout when the session cannot be recovered.


use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use transport_helpers::{
    RecordingNavigator, ScriptedTransport, logged_out_session, session_with, token_pair,
};
use tripwise_flight_client::{
    ApiRequest, AuthGateway, ClientConfig, HttpResponse, SessionContext, TransportError,
};

const PROTECTED: &str = "/api/flights/get-search-history/";
const REFRESH: &str = "/api/token/refresh/";

fn gateway(
    transport: ScriptedTransport,
    session: Arc<SessionContext>,
) -> (AuthGateway<ScriptedTransport>, Arc<RecordingNavigator>) {
    let navigator = Arc::new(RecordingNavigator::default());
    let gateway = AuthGateway::new(
        transport,
        session,
        navigator.clone(),
        &ClientConfig::default(),
    );
    (gateway, navigator)
}

/// Backend accepting only `valid_token` on the protected path, and issuing
/// `new_access` (if any) for refresh token `r1`.
fn backend(
    valid_token: &'static str,
    new_access: Option<&'static str>,
) -> impl Fn(&ApiRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static {
    move |request: &ApiRequest| {
        if request.path == REFRESH {
            let body = request.body.clone().unwrap_or_default();
            return Ok(match (body["refresh"].as_str(), new_access) {
                (Some("r1"), Some(access)) => HttpResponse::new(200, json!({ "access": access })),
                (Some("r1"), None) => HttpResponse::new(200, json!({ "detail": "ok" })),
                _ => HttpResponse::new(401, json!({ "detail": "Token is invalid or expired" })),
            });
        }
        if request.bearer_token() == Some(valid_token) {
            Ok(HttpResponse::new(200, json!({ "results": ["ICN-NRT"] })))
        } else {
            Ok(HttpResponse::new(401, json!({ "detail": "Given token not valid" })))
        }
    }
}

#[tokio::test]
async fn default_header_comes_from_session() {
    let (gateway, _) = gateway(
        ScriptedTransport::always(200, json!({})),
        session_with("a1", "r1"),
    );

    gateway.execute(ApiRequest::get(PROTECTED)).await.unwrap();

    let sent = gateway.transport().requests();
    assert_eq!(sent[0].authorization.as_deref(), Some("Bearer a1"));
}

#[tokio::test]
async fn logged_out_requests_carry_no_bearer() {
    let (gateway, _) = gateway(
        ScriptedTransport::always(200, json!([])),
        logged_out_session(),
    );

    gateway.execute(ApiRequest::get("/api/flights/get-airports/")).await.unwrap();

    assert_eq!(gateway.transport().requests()[0].authorization, None);
    assert_eq!(gateway.default_authorization(), None);
}

#[tokio::test]
async fn auth_changed_resyncs_default_header() {
    let session = logged_out_session();
    let (gateway, _) = gateway(ScriptedTransport::always(200, json!({})), session.clone());
    assert_eq!(gateway.default_authorization(), None);

    session.login(&token_pair("a7", "r7")).unwrap();
    assert_eq!(gateway.default_authorization().as_deref(), Some("Bearer a7"));

    session.logout();
    assert_eq!(gateway.default_authorization(), None);
}

#[tokio::test]
async fn expired_token_is_refreshed_and_request_retried_once() {
    let session = session_with("stale", "r1");
    let (gateway, navigator) = gateway(
        ScriptedTransport::new(backend("fresh", Some("fresh"))),
        session.clone(),
    );

    let response = gateway.execute(ApiRequest::get(PROTECTED)).await.unwrap();
    assert_eq!(response.body, json!({ "results": ["ICN-NRT"] }));

    let sent = gateway.transport().requests();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0].bearer_token(), Some("stale"));
    assert_eq!(sent[1].path, REFRESH);
    assert_eq!(sent[1].body, Some(json!({ "refresh": "r1" })));
    assert_eq!(sent[1].authorization, None);
    assert_eq!(sent[2].path, PROTECTED);
    assert_eq!(sent[2].bearer_token(), Some("fresh"));

    assert_eq!(session.access_token().as_deref(), Some("fresh"));
    assert_eq!(session.refresh_token().as_deref(), Some("r1"));
    assert_eq!(gateway.default_authorization().as_deref(), Some("Bearer fresh"));
    assert!(navigator.redirects().is_empty());
}

#[tokio::test]
async fn explicit_header_is_replaced_on_retry() {
    let session = session_with("stale", "r1");
    let (gateway, _) = gateway(
        ScriptedTransport::new(backend("fresh", Some("fresh"))),
        session,
    );

    let request = ApiRequest::get(PROTECTED).with_bearer("explicit-stale");
    gateway.execute(request).await.unwrap();

    let sent = gateway.transport().requests_to(PROTECTED);
    assert_eq!(sent[0].bearer_token(), Some("explicit-stale"));
    assert_eq!(sent[1].bearer_token(), Some("fresh"));
}

#[tokio::test]
async fn second_401_after_retry_does_not_refresh_again() {
    let session = session_with("stale", "r1");
    // The refreshed token is rejected too.
    let (gateway, navigator) = gateway(
        ScriptedTransport::new(backend("never-valid", Some("fresh"))),
        session.clone(),
    );

    let err = gateway.execute(ApiRequest::get(PROTECTED)).await.unwrap_err();
    assert_eq!(err.status(), Some(401));

    let transport = gateway.transport();
    assert_eq!(transport.requests_to(REFRESH).len(), 1);
    assert_eq!(transport.requests_to(PROTECTED).len(), 2);
    // The refresh itself succeeded, so the session is kept.
    assert_eq!(session.access_token().as_deref(), Some("fresh"));
    assert!(navigator.redirects().is_empty());
}

#[tokio::test]
async fn missing_refresh_token_logs_out_without_network_refresh() {
    let session = logged_out_session();
    session.login(&token_pair("stale", "")).unwrap();
    assert_eq!(session.refresh_token(), None);

    let (gateway, navigator) = gateway(
        ScriptedTransport::new(backend("fresh", Some("fresh"))),
        session.clone(),
    );

    let err = gateway.execute(ApiRequest::get(PROTECTED)).await.unwrap_err();
    assert_eq!(err.status(), Some(401));

    assert_eq!(gateway.transport().request_count(), 1);
    assert!(gateway.transport().requests_to(REFRESH).is_empty());
    assert_eq!(session.access_token(), None);
    assert_eq!(session.refresh_token(), None);
    assert_eq!(gateway.default_authorization(), None);
    assert_eq!(navigator.redirects(), vec!["/login".to_string()]);
}

#[tokio::test]
async fn refresh_without_access_token_logs_out() {
    let session = session_with("stale", "r1");
    let (gateway, navigator) = gateway(
        ScriptedTransport::new(backend("fresh", None)),
        session.clone(),
    );

    let err = gateway.execute(ApiRequest::get(PROTECTED)).await.unwrap_err();
    assert_eq!(err.status(), Some(401));

    assert_eq!(gateway.transport().request_count(), 2);
    assert_eq!(session.access_token(), None);
    assert_eq!(session.refresh_token(), None);
    assert_eq!(navigator.redirects(), vec!["/login".to_string()]);
}

#[tokio::test]
async fn rejected_refresh_token_logs_out_and_keeps_original_error() {
    let session = session_with("stale", "revoked");
    let (gateway, navigator) = gateway(
        ScriptedTransport::new(backend("fresh", Some("fresh"))),
        session.clone(),
    );

    let err = gateway.execute(ApiRequest::get(PROTECTED)).await.unwrap_err();
    match err {
        TransportError::Status { status, body, .. } => {
            assert_eq!(status, 401);
            assert_eq!(body, json!({ "detail": "Given token not valid" }));
        }
        other => panic!("expected original 401, got {other:?}"),
    }

    assert_eq!(gateway.transport().requests_to(REFRESH).len(), 1);
    assert!(!session.is_authenticated());
    assert_eq!(navigator.redirects().len(), 1);
}

#[tokio::test]
async fn unreachable_refresh_endpoint_logs_out() {
    let session = session_with("stale", "r1");
    let (gateway, navigator) = gateway(
        ScriptedTransport::new(|request| {
            if request.path == REFRESH {
                Err(TransportError::Unreachable("connection refused".into()))
            } else {
                Ok(HttpResponse::new(401, json!({})))
            }
        }),
        session.clone(),
    );

    assert!(gateway.execute(ApiRequest::get(PROTECTED)).await.is_err());
    assert!(!session.is_authenticated());
    assert_eq!(navigator.redirects().len(), 1);
}

#[tokio::test]
async fn other_failures_are_not_refreshed() {
    for status in [400u16, 403, 404, 500, 502] {
        let session = session_with("a1", "r1");
        let (gateway, navigator) = gateway(
            ScriptedTransport::always(status, json!({ "message": "nope" })),
            session.clone(),
        );

        let err = gateway.execute(ApiRequest::get(PROTECTED)).await.unwrap_err();
        assert_eq!(err.status(), Some(status));
        assert_eq!(gateway.transport().request_count(), 1);
        assert!(session.is_authenticated());
        assert!(navigator.redirects().is_empty());
    }
}

#[tokio::test]
async fn concurrent_401s_each_refresh_independently() {
    let refreshes = Arc::new(AtomicUsize::new(0));
    let counter = refreshes.clone();
    let transport = ScriptedTransport::new(move |request| {
        if request.path == REFRESH {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            return Ok(HttpResponse::new(200, json!({ "access": format!("fresh-{n}") })));
        }
        match request.bearer_token() {
            Some(token) if token.starts_with("fresh-") => {
                Ok(HttpResponse::new(200, json!({ "token": token })))
            }
            _ => Ok(HttpResponse::new(401, json!({}))),
        }
    })
    .yielding();

    let session = session_with("stale", "r1");
    let (gateway, navigator) = gateway(transport, session.clone());

    let (first, second) = tokio::join!(
        gateway.execute(ApiRequest::get(PROTECTED)),
        gateway.execute(ApiRequest::get(PROTECTED)),
    );
    let first = first.unwrap();
    let second = second.unwrap();

    // Refreshes are not de-duplicated: each 401 performs its own.
    assert_eq!(refreshes.load(Ordering::SeqCst), 2);
    assert_ne!(first.body, second.body);
    assert_eq!(gateway.transport().requests_to(PROTECTED).len(), 4);
    // Last writer wins.
    assert_eq!(session.access_token().as_deref(), Some("fresh-2"));
    assert!(navigator.redirects().is_empty());
}
