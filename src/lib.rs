//! Life Dashboard API Library
//!
//! Backend for a single-user life dashboard: university academic records
//! (catalog, periods, enrollments under a credit cap, GPA statistics, bulk
//! history import) and gig-driving shift tracking.
//!
//! # Modules
//!
//! - `api`: HTTP handlers and routes.
//! - `core`: Enrollment gate, statistics, import, models and errors.
//! - `data`: Record store trait with Postgres and in-memory backends.
//! - `integrations`: HTTP client for a running dashboard API.
//! - `config`: Configuration management.
//! - `db`: Database pool and migrations.
//! - `db_storage`: Postgres record store.
//! - `memory_storage`: In-memory record store (local mode, tests).
//! - `enrollment`: Credit-capped enrollment service.
//! - `stats`: GPA and credit aggregation.
//! - `import`: Bulk history import.
//! - `api_client`: Client used by the `import-history` tool.

pub mod api;
pub mod core;
pub mod data;
pub mod integrations;

// Re-export primary modules for shared use in tests and other binaries
pub mod api_client;
pub mod config;
pub mod db;
pub mod db_storage;
pub mod enrollment;
pub mod errors;
pub mod handlers;
pub mod import;
pub mod memory_storage;
pub mod models;
pub mod routes;
pub mod stats;
pub mod storage;
