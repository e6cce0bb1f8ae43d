/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login and token refresh (public)
/// - `projects`: Project CRUD with task counters
/// - `tasks`: Task CRUD, filters and sorting
/// - `users`: Tenant user administration (ADMIN only)
/// - `profile`: Self-service profile and password
///
/// Every handler behind the session layer takes `Extension<Principal>` and
/// passes `principal.scope()` to the store, so a request can only ever see
/// rows of its own tenant.

pub mod auth;
pub mod health;
pub mod profile;
pub mod projects;
pub mod tasks;
pub mod users;
