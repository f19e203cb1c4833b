/// Database model definitions.
pub mod models;
/// Record store abstraction and its backends.
pub mod record_store;
/// Storage abstraction layer shared by all backends.
pub mod storage;
