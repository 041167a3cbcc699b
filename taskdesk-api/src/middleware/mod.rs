/// Middleware modules for the API server
///
/// - `auth`: guard pipeline layers (required, optional, admin)
/// - `security`: security response headers

pub mod auth;
pub mod security;
