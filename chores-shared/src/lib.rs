//! # Chores Shared Library
//!
//! Storage, authentication and repository logic used by the chores API
//! server.
//!
//! ## Module Organization
//!
//! - `db`: connection pool and migrations
//! - `auth`: password hashing, tokens, the auth service and guard
//! - `models`: entities and their repository operations

pub mod auth;
pub mod db;
pub mod models;

/// Current version of the chores shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
