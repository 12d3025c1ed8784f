//! API module for shared HTTP API functionality
//!
//! # Design Principle
//!
//! This module contains ONLY:
//! - Pure functions (no HTTP framework dependencies)
//! - Database operations (via sqlx)
//! - Shared types
//!
//! Each service wraps these with framework-specific extractors (Axum, etc.).

pub mod auth;

pub use auth::{
    authenticate, calculate_signature, load_shared_secret, sign_token, verify_token,
    AdminCapability, Principal, TokenClaims,
};
