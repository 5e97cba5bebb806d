//! Route matching logic.
//!
//! # Responsibilities
//! - Select the route for a `(method, path)` pair
//! - Extract parameter values positionally from the match
//!
//! # Design Decisions
//! - Method comparison is case-insensitive
//! - Routes are tried in table order; first match wins, there is no
//!   specificity ranking (a catch-all registered first shadows later routes)
//! - No match is `None`; "method not allowed" is not reported separately

use std::collections::BTreeMap;

use crate::routing::route::{HttpMethod, Route};

/// A matched route and the parameter values extracted from the path.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: BTreeMap<String, String>,
}

/// Finds the first route in `routes` that accepts `method` and `path`.
pub fn match_route<'a>(routes: &'a [Route], path: &str, method: &str) -> Option<RouteMatch<'a>> {
    let method: HttpMethod = method.parse().ok()?;
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };

    routes
        .iter()
        .filter(|route| route.method == method)
        .find_map(|route| {
            let caps = route.matcher.regex().captures(&path)?;
            let params = route
                .param_names
                .iter()
                .enumerate()
                .map(|(index, name)| {
                    // Group 0 is the whole match.
                    let value = caps.get(index + 1).map_or("", |m| m.as_str());
                    (name.clone(), value.to_string())
                })
                .collect();

            Some(RouteMatch { route, params })
        })
}
