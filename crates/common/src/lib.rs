//! routeshot Common Library
//!
//! Shared data model, error taxonomy, and the storage port used by the
//! capture engine and the CLI.

pub mod error;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result};
pub use storage::{FsStorage, MemoryStorage, Storage};
pub use types::*;

/// routeshot version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Directory under the project root holding routeshot's documents
pub const DEFAULT_DATA_DIR: &str = ".routeshot";

/// Path segment reserved for routeshot's own injected UI
pub const RESERVED_UI_SEGMENT: &str = "__routeshot";
