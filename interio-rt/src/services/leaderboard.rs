//! Leaderboard View
//!
//! Read-only ranking over published profiles. Subjects without a rating row
//! rank with zero counters.

use interio_common::db::models::ProfileGroup;
use interio_common::Result;
use sqlx::SqlitePool;

use crate::config::LeaderboardConfig;
use crate::db::ratings;
use crate::models::LeaderboardPage;
use crate::pagination::calculate_pagination;

#[derive(Clone)]
pub struct Leaderboard {
    db: SqlitePool,
    config: LeaderboardConfig,
}

impl Leaderboard {
    pub fn new(db: SqlitePool, config: LeaderboardConfig) -> Self {
        Self { db, config }
    }

    /// One page of the ranking. `limit` and `offset` are clamped, not rejected.
    pub async fn top(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
        group: Option<ProfileGroup>,
    ) -> Result<LeaderboardPage> {
        let page = calculate_pagination(
            limit,
            offset,
            self.config.default_limit,
            self.config.max_limit,
        );

        // Both reads share one snapshot
        let mut tx = self.db.begin().await?;
        let total = ratings::count_ranked(&mut *tx, group).await?;
        let entries = ratings::leaderboard_slice(
            &mut *tx,
            self.config.order,
            group,
            page.limit,
            page.offset,
        )
        .await?;
        tx.commit().await?;

        Ok(LeaderboardPage {
            total,
            limit: page.limit,
            offset: page.offset,
            order: self.config.order,
            entries,
        })
    }
}
