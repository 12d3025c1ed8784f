//! HTTP API handlers for interio-rt

pub mod auth;
pub mod health;
pub mod ratings;
pub mod reviews;

pub use health::health_routes;
pub use ratings::rating_routes;
pub use reviews::review_routes;
