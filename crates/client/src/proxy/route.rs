//! Request classification.

use regex::Regex;
use shellcache_core::ProxyRequest;

/// Why a request is not intercepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassthroughReason {
    /// Only GET requests are cached.
    Method,
    /// Backend API calls must always reach the live origin.
    ApiPattern,
}

/// How the proxy resolves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Passthrough(PassthroughReason),
    /// Top-level document: network first.
    Navigation,
    /// Any other GET: cache first.
    Subresource,
}

pub fn classify(request: &ProxyRequest, passthrough: &[Regex]) -> Route {
    if !request.is_get() {
        return Route::Passthrough(PassthroughReason::Method);
    }
    if passthrough.iter().any(|re| re.is_match(request.url.as_str())) {
        return Route::Passthrough(PassthroughReason::ApiPattern);
    }
    if request.is_navigation() { Route::Navigation } else { Route::Subresource }
}
