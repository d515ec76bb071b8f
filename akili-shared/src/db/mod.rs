/// Database layer for Akili
///
/// - `pool`: PostgreSQL connection pool with a startup health check
/// - `migrations`: embedded schema migrations from the workspace `migrations/` directory
///
/// Records live in the crate-level `models` module.

pub mod migrations;
pub mod pool;
