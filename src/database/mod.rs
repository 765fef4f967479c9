pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use manager::DatabaseManager;
pub use memory::{ForeignKey, KeyKind, MemoryStore, StoreOp};
pub use postgres::PgTableStore;
pub use store::{Row, StoreError, TableStore};
