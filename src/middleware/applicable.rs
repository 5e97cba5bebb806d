//! Middleware applicability by directory hierarchy.
//!
//! A layer applies to a route when its base pattern is the route pattern or a
//! whole-segment prefix of it. Global layers (empty base) apply everywhere,
//! including the root route.

use crate::middleware::layer::{Middleware, MiddlewareLayer};

/// Returns true if a layer declared at `base_pattern` applies to `route_pattern`.
pub fn is_applicable(base_pattern: &str, route_pattern: &str) -> bool {
    if base_pattern.is_empty() {
        return true;
    }
    if route_pattern.is_empty() {
        return false;
    }

    let base = base_pattern.trim_matches('/');
    let route = route_pattern.trim_matches('/');

    route == base
        || route
            .strip_prefix(base)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Layers that apply to `route_pattern`, in stored order.
pub fn applicable_layers<'a>(
    layers: &'a [MiddlewareLayer],
    route_pattern: &'a str,
) -> impl Iterator<Item = &'a MiddlewareLayer> + 'a {
    layers
        .iter()
        .filter(move |layer| is_applicable(&layer.base_pattern, route_pattern))
}

/// Flattens the applicable layers into one ordered list of functions:
/// generic layers first, declaration order kept within a layer.
pub fn applicable(layers: &[MiddlewareLayer], route_pattern: &str) -> Vec<Middleware> {
    applicable_layers(layers, route_pattern)
        .flat_map(|layer| layer.functions.iter().cloned())
        .collect()
}
