//! `PostgreSQL` adapters for pool ports, built on Diesel.

pub(crate) mod models;
pub(crate) mod schema;

mod repository;
mod store;

pub use repository::PostgresBoardRepository;
pub use store::{PgPool, PostgresTaskStore};
pub(crate) use store::PgTransaction;
