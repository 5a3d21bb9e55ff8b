//! Scrap Pickup API Library
//!
//! Server side of the scrap-recycling pickup flow: authenticated endpoints
//! that price scrap through a database function, record pickup
//! transactions, estimate weight from photos via an AI gateway and serve
//! the caller's receipts.
//!
//! # Modules
//!
//! - `auth`: Bearer token verification and the `AuthUser` extractor.
//! - `circuit_breaker`: Circuit breaker for AI gateway calls.
//! - `config`: Configuration management.
//! - `db`: Database connection, pool and migrations.
//! - `db_storage`: Transaction and profile persistence.
//! - `errors`: Error handling types.
//! - `estimator`: AI weight estimation client.
//! - `handlers`: HTTP request handlers.
//! - `models`: Domain enums, rows and API payloads.
//! - `pricing`: Price lookup via the `calculate_scrap_price` procedure.
//! - `routes`: Router assembly and OpenAPI document.
//! - `validation`: Request validation rules.

pub mod auth;
pub mod circuit_breaker;
pub mod config;
pub mod db;
pub mod db_storage;
pub mod errors;
pub mod estimator;
pub mod handlers;
pub mod models;
pub mod pricing;
pub mod routes;
pub mod validation;
