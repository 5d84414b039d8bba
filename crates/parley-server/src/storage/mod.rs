//! SQLite storage for the Parley server.
//!
//! Provides persistence for users, refresh tokens, and chat messages.

mod db;
mod models;
mod queries;
mod queries_messages;


pub use db::ChatDatabase;
pub use models::*;
pub use parley_core::db::DatabaseError;
