//! Identifier and document conventions shared by the importer and exporter.

pub const FPID_PREFIX: &str = "FP";
pub const YEAR_SENTINEL: &str = "0000";
pub const SLUG_MAX_LEN: usize = 100;
pub const UNKNOWN_BUCKET: &str = "unknown";
pub const UNKNOWN_RELATION: &str = "unknown";

pub const DOCUMENT_EXTENSION: &str = "md";
pub const DOCUMENT_BODY: &str = "# Notes\n";
pub const DEFAULT_RECORD_TYPE: &str = "Person";
pub const DEFAULT_STATUS: &str = "Active";

/// Text values that stand for "no value" in CSV exports and hand-edited headers.
pub const NULL_SENTINELS: &[&str] = &["", "NaT", "nan", "None", "null"];

// Remote tables
pub const IDENTITIES_TABLE: &str = "identities";
pub const RELATIONSHIPS_TABLE: &str = "relationships";
pub const IDENTITY_CONFLICT_KEY: &str = "fpid";

// Configuration defaults
pub const DEFAULT_CSV_PATH: &str = "../raw_data/wikidata_export.csv";
pub const DEFAULT_VAULT_PATH: &str = "../00-People";
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_SYNC_BATCH_SIZE: usize = 50;
pub const DEFAULT_SYNC_MAX_WORKERS: usize = 4;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONFIG_FILE: &str = "fp-pipeline.toml";

/// File name prefix the exporter looks for, e.g. `FP-1815-ada-lovelace.md`.
pub fn document_glob_prefix() -> String {
    format!("{}-", FPID_PREFIX)
}
