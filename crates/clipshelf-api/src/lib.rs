//! # clipshelf-api
//!
//! HTTP API server library for clipshelf. The binary lives in
//! `main.rs`; this library exposes the pieces with unit-testable
//! logic: the list cache service and the wire query types.

pub mod query;
pub mod services;
