/// API route handlers
///
/// Organized by resource:
///
/// - `health`: Liveness endpoint
/// - `auth`: Registration, login, logout, refresh, profile
/// - `tasks`: Task CRUD, listing and statistics
/// - `users`: Self-service and admin account management

pub mod auth;
pub mod health;
pub mod tasks;
pub mod users;
