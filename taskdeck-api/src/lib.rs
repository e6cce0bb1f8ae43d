//! # TaskDeck API Server Library
//!
//! HTTP layer of TaskDeck, a multi-tenant project and task tracker.
//!
//! ## Modules
//!
//! - `app`: Application state, router builder and session layer
//! - `config`: Configuration management
//! - `error`: Error handling, HTTP response mapping and body extractors
//! - `middleware`: Security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
