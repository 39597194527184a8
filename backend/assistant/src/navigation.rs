//! Navigation guard: keeps a live chat session from being silently dropped
//! when the user leaves the site it belongs to.

use solarops_core::Lifecycle;

const SITES_SEGMENT: &str = "sites";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationDecision {
    Proceed,
    /// Ask the user first; confirming ends the session.
    RequireConfirmation,
}

/// Drop any query string or fragment.
fn strip_suffix(path: &str) -> &str {
    path.find(['?', '#']).map_or(path, |at| &path[..at])
}

/// The current path truncated after its `sites/<id>` segment pair.
///
/// `/org/1/sites/42/inverters/7` gives `/org/1/sites/42`.
pub fn site_scope(path: &str) -> Option<&str> {
    let path = strip_suffix(path);
    let mut offset = 0;
    let mut previous: Option<&str> = None;
    for segment in path.split('/') {
        if previous == Some(SITES_SEGMENT) && !segment.is_empty() {
            return Some(&path[..offset + segment.len()]);
        }
        previous = Some(segment);
        offset += segment.len() + 1;
    }
    None
}

/// `candidate` is the scope itself or a descendant of it.
pub fn is_within_scope(current: &str, candidate: &str) -> bool {
    let Some(scope) = site_scope(current) else {
        return false;
    };
    let candidate = strip_suffix(candidate);
    match candidate.strip_prefix(scope) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Decide whether navigating from `current` to `candidate` needs confirmation.
pub fn check(lifecycle: Lifecycle, current: &str, candidate: &str) -> NavigationDecision {
    if !lifecycle.is_live() || is_within_scope(current, candidate) {
        NavigationDecision::Proceed
    } else {
        NavigationDecision::RequireConfirmation
    }
}
