//! # TaskDesk Shared Library
//!
//! Domain types, authentication, persistence and business rules shared by
//! the TaskDesk API server.
//!
//! ## Module Organization
//!
//! - `models`: Users, tasks and pagination types
//! - `auth`: Password hashing, tokens, the request guard and ownership rules
//! - `validation`: Field rules and error collection for inbound payloads
//! - `store`: Persistence traits with PostgreSQL and in-memory backends
//! - `services`: Account and task operations
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod models;
pub mod services;
pub mod store;
pub mod validation;

/// Current version of the TaskDesk shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
