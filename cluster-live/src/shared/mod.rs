/// Shared modules for the cluster-live terminal
pub mod config;
pub mod decoder;
pub mod error;
pub mod feed;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod store;
pub mod types;
pub mod view;
