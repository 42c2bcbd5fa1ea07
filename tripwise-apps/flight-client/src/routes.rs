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

//! Navigation guard for views that need a logged-in user.

use serde::{Deserialize, Serialize};
use tripwise_auth_session::SessionContext;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// Path pattern; `:name` segments match any single non-empty segment
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub requires_auth: bool,
}

impl Route {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: None,
            requires_auth: false,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn protected(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    /// Number of static segments if `path` matches, used to rank matches.
    fn match_score(&self, path: &str) -> Option<usize> {
        let pattern: Vec<&str> = segments(&self.path).collect();
        let actual: Vec<&str> = segments(path).collect();
        if pattern.len() != actual.len() {
            return None;
        }

        let mut score = 0;
        for (p, a) in pattern.iter().zip(&actual) {
            if p.starts_with(':') {
                if a.is_empty() {
                    return None;
                }
            } else if p == a {
                score += 1;
            } else {
                return None;
            }
        }
        Some(score)
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.split('/').filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Proceed,
    Redirect(String),
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
    login_route: String,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>, login_route: impl Into<String>) -> Self {
        Self {
            routes,
            login_route: login_route.into(),
        }
    }

    /// Best matching route: most static segments, first declared on ties.
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        let mut best: Option<(usize, &Route)> = None;
        for route in &self.routes {
            if let Some(score) = route.match_score(path) {
                if best.is_none_or(|(best_score, _)| score > best_score) {
                    best = Some((score, route));
                }
            }
        }
        best.map(|(_, route)| route)
    }

    /// Decide whether navigation to `path` may proceed for this session.
    pub fn guard(&self, path: &str, session: &SessionContext) -> Navigation {
        match self.resolve(path) {
            Some(route) if route.requires_auth && !session.is_authenticated() => {
                tracing::warn!("Login required to access {}", path);
                Navigation::Redirect(self.login_route.clone())
            }
            _ => Navigation::Proceed,
        }
    }
}
