//! # TaskDesk API Server Library
//!
//! HTTP edge of TaskDesk: configuration, routing, authentication layers,
//! request extraction and response shaping.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error taxonomy and HTTP response mapping
//! - `extract`: Validating extractors and the current-user extractor
//! - `middleware`: Auth layers and security headers
//! - `response`: Success envelope
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod response;
pub mod routes;
