/// Request identity
///
/// Accounts are created and signed in by an external identity service that
/// issues HS256 bearer tokens. This module only validates those tokens and
/// carries the resulting identity through a request.
///
/// - [`jwt`]: token claims, issuing (tests and tooling) and validation
/// - [`middleware`]: bearer extraction and the `AuthContext` request extension

pub mod jwt;
pub mod middleware;
