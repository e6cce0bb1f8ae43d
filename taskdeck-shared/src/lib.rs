//! # TaskDeck Shared Library
//!
//! Domain types, storage and authentication used by the TaskDeck API server.
//!
//! ## Module Organization
//!
//! - `auth`: passwords, tokens, session resolution, tenant scope and role rules
//! - `models`: database models and their queries
//! - `db`: connection pool and migrations
//! - `store`: the `Store` trait with PostgreSQL and in-memory implementations

pub mod auth;
pub mod db;
pub mod models;
pub mod store;

/// Current version of the TaskDeck shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
