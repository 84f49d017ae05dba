pub mod db;
pub mod domain;
pub mod window;

pub use db::{DocumentStore, MemoryStore, PgDocumentStore, StoreError};
pub use window::{build_window, is_queryable_day, QueryWindow};
