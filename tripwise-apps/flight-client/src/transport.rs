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

//! # HTTP Transport
//!
//! Effectful (network) layer: one request in, one response or transport
//! failure out. No authentication logic lives here.

use crate::config::ClientConfig;
use crate::query_params::QueryParams;
use anyhow::{Context, Result};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tripwise_auth_session::AuthFailure;
use wreq::redirect::Policy;
use wreq_util::Emulation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the backend base URL, e.g. `/api/flights/search/`
    pub path: String,
    pub query: QueryParams,
    pub body: Option<Value>,
    /// Full `Authorization` header value
    pub authorization: Option<String>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: QueryParams::new(),
            body: None,
            authorization: None,
        }
    }

    pub fn post_json(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            body: Some(body),
            ..Self::get(path)
        }
    }

    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    pub fn with_bearer(mut self, token: &str) -> Self {
        self.authorization = Some(bearer_header(token));
        self
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.authorization.as_deref()?.strip_prefix("Bearer ")
    }

    pub fn url(&self, base_url: &str) -> String {
        let mut url = format!("{}{}", base_url.trim_end_matches('/'), self.path);
        if !self.query.is_empty() {
            url.push('?');
            url.push_str(&self.query.to_query_string());
        }
        url
    }
}

pub fn bearer_header(token: &str) -> String {
    format!("Bearer {}", token)
}

/// A response that made it back from the server, whatever its status.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    /// Parsed JSON; the raw text as a JSON string if it is not JSON;
    /// `null` if empty.
    pub body: Value,
}

impl HttpResponse {
    pub fn new(status: u16, body: Value) -> Self {
        let status_text = wreq::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_string();
        Self {
            status,
            status_text,
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into [`TransportError::Status`].
    pub fn error_for_status(self) -> Result<Self, TransportError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(TransportError::Status {
                status: self.status,
                status_text: self.status_text,
                body: self.body,
            })
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Server answered with a non-2xx status.
    #[error("Request failed with status code {status}")]
    Status {
        status: u16,
        status_text: String,
        body: Value,
    },
    /// No response received.
    #[error("{0}")]
    Unreachable(String),
    /// Request could not be built or sent.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// `message` field of a structured error body.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            TransportError::Status { body, .. } => body
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty()),
            _ => None,
        }
    }
}

impl AuthFailure for TransportError {
    fn is_auth_failure(&self) -> bool {
        self.status() == Some(401)
    }
}

/// Sends requests to the backend.
pub trait HttpTransport: Send + Sync {
    fn send(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

#[derive(Clone)]
pub struct WreqTransport {
    client: Arc<wreq::Client>,
    base_url: String,
}

impl WreqTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = wreq::Client::builder()
            .emulation(Emulation::Safari18_5)
            .redirect(Policy::default());
        if let Some(timeout_secs) = config.timeout_secs {
            builder = builder
                .timeout(Duration::from_secs(timeout_secs))
                .connect_timeout(Duration::from_secs(timeout_secs));
        }
        let client = builder.build().context("Failed to build HTTP client")?;
        Ok(Self {
            client: Arc::new(client),
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl HttpTransport for WreqTransport {
    async fn send(&self, request: ApiRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url(&self.base_url);
        let http_start = std::time::Instant::now();
        tracing::trace!("[send] Starting {:?} request to: {}", request.method, url);

        let mut builder = match request.method {
            Method::Get => self.client.get(url.as_str()),
            Method::Post => self.client.post(url.as_str()),
        };
        if let Some(authorization) = &request.authorization {
            builder = builder.header("Authorization", authorization.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::debug!("[send] Request to {} failed: {:?}", url, e);
            if e.is_builder() {
                TransportError::Other(e.to_string())
            } else {
                TransportError::Unreachable(e.to_string())
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Unreachable(format!("Failed to read body: {}", e)))?;
        tracing::debug!(
            "[send] HTTP Status: {} {} in {:?}, {} bytes",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown"),
            http_start.elapsed(),
            text.len()
        );

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body: parse_body(&text),
        })
    }
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
