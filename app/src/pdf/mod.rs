mod document;
pub use document::Document;

mod memory;
pub use memory::{MemoryDocument, MemoryPage};
