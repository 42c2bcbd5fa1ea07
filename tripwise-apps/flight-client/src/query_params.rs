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

//! # Query Parameters
//!
//! Side-effect free query-string building for backend requests.
//! Search parameters are opaque to the client and passed through in order.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered query parameters. Inserting an existing key replaces its value in
/// place, so `base.merge(overrides)` behaves like an object spread.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, value.to_string());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn merge(&mut self, other: &QueryParams) {
        for (key, value) in &other.0 {
            self.insert(key.clone(), value.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Convert a JSON object: strings verbatim, numbers and booleans
    /// stringified, nulls skipped, arrays as repeated `key[]` entries.
    pub fn from_json_object(value: &Value) -> Result<Self> {
        let Some(object) = value.as_object() else {
            bail!("Query parameters must be a JSON object, got: {}", value);
        };

        let mut params = Self::new();
        for (key, value) in object {
            match value {
                Value::Null => {}
                Value::Array(items) => {
                    let array_key = format!("{}[]", key);
                    params.0.extend(
                        items
                            .iter()
                            .filter_map(scalar_to_string)
                            .map(|v| (array_key.clone(), v)),
                    );
                }
                other => {
                    if let Some(v) = scalar_to_string(other) {
                        params.insert(key.clone(), v);
                    }
                }
            }
        }
        Ok(params)
    }

    /// `application/x-www-form-urlencoded` style query string, without `?`.
    pub fn to_query_string(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Optional parameters of a flight details lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightDetailsOptions {
    pub market: Option<String>,
    pub locale: Option<String>,
    pub currency: Option<String>,
    /// Opaque upstream cookie, forwarded only when present
    pub cookie: Option<String>,
}

impl FlightDetailsOptions {
    pub const DEFAULT_MARKET: &'static str = "US";
    pub const DEFAULT_LOCALE: &'static str = "en-US";
    pub const DEFAULT_CURRENCY: &'static str = "USD";

    pub fn to_query(&self, token: &str, itinerary_id: &str) -> QueryParams {
        fn or_default<'a>(value: &'a Option<String>, default: &'a str) -> &'a str {
            value.as_deref().filter(|v| !v.is_empty()).unwrap_or(default)
        }

        let mut params = QueryParams::new()
            .with("token", token)
            .with("itineraryId", itinerary_id)
            .with("market", or_default(&self.market, Self::DEFAULT_MARKET))
            .with("locale", or_default(&self.locale, Self::DEFAULT_LOCALE))
            .with("currency", or_default(&self.currency, Self::DEFAULT_CURRENCY));
        if let Some(cookie) = self.cookie.as_deref().filter(|c| !c.is_empty()) {
            params.insert("cookie", cookie);
        }
        params
    }
}
