mod api;
mod file;
mod in_memory;

pub use api::Storage;
pub use file::FileStorage;
pub use in_memory::InMemoryStorage;
