//! Relational persistence: pool management, backend query modules and the
//! dispatching [`Store`] facade with the posting claim primitive.

pub mod database;
mod sqlite;
mod store;

#[cfg(feature = "postgres")]
mod postgres;

pub use database::{DatabaseConfig, DatabasePool, DatabaseType, SqlitePool};
pub use store::{ClaimedBatch, Store};

#[cfg(feature = "postgres")]
pub use database::PostgresPool;
