/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration and login
/// - `members`, `chores`, `assignments`: entity CRUD
/// - `search`: chore search
///
/// Every handler except health and auth sits behind the bearer-token guard.

pub mod assignments;
pub mod auth;
pub mod chores;
pub mod health;
pub mod members;
pub mod search;

use serde::Deserialize;

/// `q` / `search` query parameters of list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub search: Option<String>,
}

impl SearchParams {
    /// The first non-blank of `q` and `search`
    pub fn term(&self) -> Option<String> {
        [self.q.as_deref(), self.search.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|term| !term.is_empty())
            .map(String::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_term_prefers_q() {
        let params = SearchParams {
            q: Some(" dish ".to_string()),
            search: Some("laundry".to_string()),
        };
        assert_eq!(params.term().as_deref(), Some("dish"));

        let params = SearchParams {
            q: Some("  ".to_string()),
            search: Some("laundry".to_string()),
        };
        assert_eq!(params.term().as_deref(), Some("laundry"));

        assert_eq!(SearchParams::default().term(), None);
    }
}
