//! Data layer module
//!
//! Handles all data persistence:
//! - SQLite database operations
//! - Typed models for role records, listings and the audit trail

mod database;
mod models;

pub use database::Database;
pub use models::*;
