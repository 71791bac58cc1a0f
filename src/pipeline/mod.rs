// Two-stage pipeline: CSV -> vault (import) and vault -> remote store (export)

pub mod document;
pub mod export;
pub mod import;
pub mod normalize;

pub use export::{Exporter, SyncStats};
pub use import::{ImportStats, Importer};
