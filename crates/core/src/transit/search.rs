//! Route lookup over the pre-computed route list.

use super::models::Route;

/// Why a search was rejected before filtering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("origin and destination are required")]
    MissingEndpoint,

    #[error("origin and destination must differ")]
    SameEndpoint,
}

impl SearchError {
    /// Dictionary key of the localized message.
    pub fn message_key(&self) -> &'static str {
        match self {
            SearchError::MissingEndpoint => "error_missing",
            SearchError::SameEndpoint => "error_same",
        }
    }
}

/// Routes from `origin` to `destination`, fastest first.
///
/// Inputs are trimmed and matched exactly. Routes with equal duration keep
/// their dataset order.
pub fn find_routes<'a>(routes: &'a [Route], origin: &str, destination: &str) -> Result<Vec<&'a Route>, SearchError> {
    let origin = origin.trim();
    let destination = destination.trim();

    if origin.is_empty() || destination.is_empty() {
        return Err(SearchError::MissingEndpoint);
    }
    if origin == destination {
        return Err(SearchError::SameEndpoint);
    }

    let mut found: Vec<&Route> = routes
        .iter()
        .filter(|r| r.origin == origin && r.destination == destination)
        .collect();
    found.sort_by_key(|r| r.duration);
    Ok(found)
}
