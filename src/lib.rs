//! Lead Duplicate Detection Library
//!
//! Finds existing leads that likely describe the same company as a new one:
//! field normalization, edit-distance similarity, weighted field matching and
//! ranking, plus the service around it (lead storage, check and import
//! endpoints).
//!
//! # Modules
//!
//! - `normalizer`: Text, CNPJ, email and website normalization.
//! - `similarity`: Levenshtein-based similarity.
//! - `field_matcher`: Per-field comparison and weight redistribution.
//! - `ranker`: Candidate scoring, thresholds and severity.
//! - `detection`: Check-before-save and full-set pair scans.
//! - `import`: Bulk import conflict check.
//! - `circuit_breaker`: Circuit breaker implementation.
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `lead_storage`: Cached existing-lead queries.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `models`: Core data models.

pub mod circuit_breaker;
pub mod config;
pub mod db;
pub mod detection;
pub mod errors;
pub mod field_matcher;
pub mod handlers;
pub mod import;
pub mod lead_storage;
pub mod models;
pub mod normalizer;
pub mod ranker;
pub mod similarity;
