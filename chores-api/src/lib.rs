//! # Chores API Server Library
//!
//! This library provides the core functionality for the chores API server.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Body, path and query extractors
//! - `format`: JSON/XML response negotiation and encoding
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod format;
pub mod routes;
