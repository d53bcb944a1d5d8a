pub mod export;
pub mod registry;
pub mod store;

pub use registry::{canonical_key, EntityRegistry};
pub use store::GraphStore;
