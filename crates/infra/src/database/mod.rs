//! Database implementations

pub mod entity_directory;
pub mod manager;
pub mod work_item_store;

pub use entity_directory::*;
pub use manager::*;
pub use work_item_store::*;
