//! Filesystem edge: directory loading, atomic writes and timestamped backups.

mod error;
pub use error::StoreError;

pub mod loader;
pub use loader::{DEFAULT_PATTERN, LoadOutcome, load_dir, load_document, read_json};

pub mod writer;
pub use writer::{backup_file, write_json_atomic};
