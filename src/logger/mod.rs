//! Global `tracing` subscriber whose filter can be swapped once settings are
//! loaded. See `bin/relationship_demo.rs` for it in use.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
