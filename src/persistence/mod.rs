//! Persistence layer: repository rows in PostgreSQL.
//!
//! [`postgres::PgStore`] implements the
//! [`LocalStore`](crate::adapters::LocalStore) contract with `sqlx::PgPool`.
//! Schema migrations live in `migrations/` and are applied on connect.

pub mod models;
pub mod postgres;

pub use models::{NewRepository, RepositoryPatch, RepositoryRecord};
pub use postgres::PgStore;
