/// PostgreSQL plumbing
///
/// - `pool`: Connection pool creation and health checks
/// - `migrations`: Embedded schema migrations
///
/// The query layer itself is [`crate::store::postgres`].

pub mod migrations;
pub mod pool;
