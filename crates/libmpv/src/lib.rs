// libmpv engine for the mpv bridge
// Loads libmpv at runtime, so nothing links against it at build time.

pub mod engine;
pub mod loader;
pub mod raw;

pub use engine::LibmpvEngine;
pub use loader::{LibrarySource, MpvLibrary};

use mpv_bridge_core::{Engine, Result};
use std::sync::Arc;

/// Load the process-wide library (if needed) and create a fresh engine instance
pub fn create_engine() -> Result<Arc<dyn Engine>> {
    let lib = MpvLibrary::init()?;
    let engine: Arc<dyn Engine> = Arc::new(LibmpvEngine::create(lib)?);
    Ok(engine)
}
