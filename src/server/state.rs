//! Shared application state for the HTTP server.

use crate::database::Database;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}
