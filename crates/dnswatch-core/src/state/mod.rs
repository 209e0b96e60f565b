// # Task Store Implementations
//
// Implementations of the TaskStore trait for different persistence
// strategies.

pub mod file;
pub mod memory;

pub use file::FileTaskStore;
pub use memory::MemoryTaskStore;
