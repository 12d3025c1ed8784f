//! Review, rating and leaderboard types

use chrono::{DateTime, Utc};
use interio_common::db::models::ProfileGroup;
use interio_common::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Polarity of a review: a star (positive) or a hollow star (negative/constructive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Positive,
    Negative,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Positive => "positive",
            Verdict::Negative => "negative",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(Verdict::Positive),
            "negative" => Ok(Verdict::Negative),
            other => Err(Error::InvalidInput(format!("Unknown verdict: {}", other))),
        }
    }
}

/// Moderation status of a review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReviewStatus::Pending),
            "approved" => Ok(ReviewStatus::Approved),
            "rejected" => Ok(ReviewStatus::Rejected),
            other => Err(Error::InvalidInput(format!("Unknown review status: {}", other))),
        }
    }
}

/// Decision a moderator can take on a pending review
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationOutcome {
    Approved,
    Rejected,
}

impl From<ModerationOutcome> for ReviewStatus {
    fn from(outcome: ModerationOutcome) -> Self {
        match outcome {
            ModerationOutcome::Approved => ReviewStatus::Approved,
            ModerationOutcome::Rejected => ReviewStatus::Rejected,
        }
    }
}

impl FromStr for ModerationOutcome {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<ReviewStatus>()? {
            ReviewStatus::Approved => Ok(ModerationOutcome::Approved),
            ReviewStatus::Rejected => Ok(ModerationOutcome::Rejected),
            ReviewStatus::Pending => Err(Error::InvalidInput(
                "Moderation outcome must be 'approved' or 'rejected'".to_string(),
            )),
        }
    }
}

/// Direction of an incremental counter update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Plus,
    Minus,
}

impl Sign {
    pub fn value(&self) -> i64 {
        match self {
            Sign::Plus => 1,
            Sign::Minus => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Review {
    pub id: Uuid,
    pub author_id: i64,
    pub subject_id: i64,
    pub verdict: Verdict,
    pub body: String,
    pub status: ReviewStatus,
    pub moderated_by: Option<i64>,
    pub moderated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Cached projection of a subject's approved reviews
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rating {
    pub subject_id: i64,
    pub positive_count: i64,
    pub negative_count: i64,
    pub last_recomputed_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Rating {
    /// Rating of a subject nobody has an approved review for yet
    pub fn empty(subject_id: i64) -> Self {
        Self {
            subject_id,
            positive_count: 0,
            negative_count: 0,
            last_recomputed_at: None,
            updated_at: None,
        }
    }

    pub fn total_count(&self) -> i64 {
        self.positive_count + self.negative_count
    }

    /// Counter pair, for comparisons that ignore timestamps
    pub fn counters(&self) -> (i64, i64) {
        (self.positive_count, self.negative_count)
    }
}

/// Ordering rule for the leaderboard. Ties always fall back to subject id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardOrder {
    /// positive desc, negative asc, subject id asc
    #[default]
    Positive,
    /// total desc, positive desc, subject id asc
    Total,
}

impl LeaderboardOrder {
    pub(crate) fn order_by_clause(&self) -> &'static str {
        match self {
            LeaderboardOrder::Positive => "positive_count DESC, negative_count ASC, subject_id ASC",
            LeaderboardOrder::Total => {
                "(positive_count + negative_count) DESC, positive_count DESC, subject_id ASC"
            }
        }
    }
}

impl FromStr for LeaderboardOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(LeaderboardOrder::Positive),
            "total" => Ok(LeaderboardOrder::Total),
            other => Err(Error::InvalidInput(format!("Unknown leaderboard order: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub subject_id: i64,
    pub display_name: String,
    pub group: ProfileGroup,
    pub positive_count: i64,
    pub negative_count: i64,
    pub total_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardPage {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub order: LeaderboardOrder,
    pub entries: Vec<LeaderboardEntry>,
}
