/*!
 * Resources Module
 * Exclusive resource pool shared by every scheduling policy
 */

pub mod manager;
pub mod types;

pub use manager::ResourceManager;
pub use types::{Allocation, ForcedRelease, ResourceSnapshot};
