//! Shared state handed to every HTTP handler.

use std::sync::Arc;

use crate::dispatch::DispatchBank;

/// State shared across the HTTP adapter: just the dispatch bank.
///
/// `spec.md` §1 scopes the HTTP front end itself out of the core; this is
/// the thin surface a handler needs to submit a [`crate::domain::Request`]
/// and await its completion.
pub struct AppState {
    dispatch: Arc<DispatchBank>,
}

impl AppState {
    /// Wrap a dispatch bank for handler access.
    #[must_use]
    pub fn new(dispatch: Arc<DispatchBank>) -> Self {
        Self { dispatch }
    }

    /// The shared dispatch bank.
    #[must_use]
    pub fn dispatch(&self) -> &DispatchBank {
        &self.dispatch
    }
}
