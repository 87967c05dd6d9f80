pub mod file_store;
pub mod memory_store;

pub use file_store::FileShellStore;
pub use memory_store::InMemoryShellStore;
