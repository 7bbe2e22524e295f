//! habitlog - habit tracking with streak and completion statistics.
//!
//! The [`store`] module holds the data types and the pure statistics
//! engine, [`database`] persists everything in SQLite and [`server`]
//! exposes both over a JSON API.

pub mod database;
pub mod error;
pub mod server;
pub mod store;

pub use error::{Error, Result};
