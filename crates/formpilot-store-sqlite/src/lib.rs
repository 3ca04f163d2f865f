//! # Formpilot SQLite Store
//!
//! SQLite persistence for recipes, execution records and recovery
//! learnings, behind the protocol store traits.

mod backend;
mod schema;

pub use backend::SqliteStore;
pub use schema::init_schema;
