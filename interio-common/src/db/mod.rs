//! Database initialization, identity models and queries

pub mod init;
pub mod models;
pub mod settings;
pub mod users;

pub use init::*;
pub use models::*;
