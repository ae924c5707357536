pub mod models;
mod queries;
pub mod sqlite;

pub use sqlite::Database;
