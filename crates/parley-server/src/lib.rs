//! Parley Server Library
//!
//! Core functionality for the Parley chat server:
//! - SQLite storage for users, refresh tokens, and messages
//! - JWT issuance, validation and refresh-token rotation
//! - Account registration and login
//! - Connection registry (one live websocket per user)
//! - Realtime dispatch of send/edit/delete actions
//! - HTTP routes for accounts, history and sealed text

pub mod accounts;
pub mod auth;
pub mod chat;
pub mod error;
pub mod http;
pub mod realtime;
pub mod registry;
pub mod state;
pub mod storage;
