//! # Interio Common Library
//!
//! Shared code for the Interio services including:
//! - Error type used by every database and service operation
//! - Configuration loading (CLI / environment / TOML / defaults)
//! - Database initialization and identity tables (users, profiles, settings)
//! - Bearer token verification and capability types
//! - Timestamp helpers

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
