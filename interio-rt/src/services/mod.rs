//! Rating domain services

pub mod aggregator;
pub mod leaderboard;
pub mod locks;
pub mod moderation;
pub mod reviews;

pub use aggregator::Aggregator;
pub use leaderboard::Leaderboard;
pub use locks::SubjectLocks;
pub use moderation::ModerationGate;
pub use reviews::{ReviewChanges, ReviewService};
