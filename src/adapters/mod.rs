// Adapters layer: concrete implementations of the domain ports (stores, object storage, lookup tables).

pub mod local_storage;
pub mod lookup_csv;
pub mod memory_store;
pub mod sqlite_store;

pub use local_storage::LocalObjectStorage;
pub use lookup_csv::LookupTable;
pub use memory_store::MemoryWorkshopStore;
pub use sqlite_store::SqliteWorkshopStore;
