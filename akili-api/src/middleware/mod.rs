/// Middleware modules for the API server
///
/// - `auth`: bearer token validation and user provisioning
/// - `rate_limit`: per-user limit on generation endpoints
/// - `security`: security response headers

pub mod auth;
pub mod rate_limit;
pub mod security;
