// Library root — exposes internal modules for integration tests in `tests/`.
// Production entry point remains `src/main.rs`.

pub mod api;
pub mod broadcast;
pub mod db;
pub mod error;
pub mod evaluator;
pub mod ingest;
pub mod messages;
pub mod metrics;
pub mod model;
pub mod poller;
pub mod repository;

// These modules are only needed by the binary.
// Declared pub so integration tests can reach them if needed, but they
// contain no logic of interest to tests.
pub mod cli;
pub mod config;
pub mod logging;
