pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod observability;
pub mod pipeline;
pub mod storage;
pub mod types;

// Port and adapters for the remote identity store
pub mod app;
pub mod infra;
