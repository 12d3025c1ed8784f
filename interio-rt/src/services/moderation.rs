//! Moderation Gate
//!
//! The only path from `pending` to `approved`/`rejected`. Approval and the
//! matching counter increment commit together or not at all.

use interio_common::api::AdminCapability;
use interio_common::{time, Error, Result};
use tracing::info;
use uuid::Uuid;

use super::aggregator::{apply_delta_in, open_subject, Aggregator};
use crate::db::{retry_on_lock, reviews};
use crate::models::{ModerationOutcome, Review, ReviewStatus, Sign};

#[derive(Clone)]
pub struct ModerationGate {
    aggregator: Aggregator,
}

impl ModerationGate {
    pub fn new(aggregator: Aggregator) -> Self {
        Self { aggregator }
    }

    /// Decide a pending review.
    ///
    /// # Errors
    /// - `NotFound` if the review does not exist
    /// - `InvalidState` if the review is not pending
    pub async fn decide(
        &self,
        review_id: Uuid,
        outcome: ModerationOutcome,
        admin: &AdminCapability,
    ) -> Result<Review> {
        // Subject never changes for an existing review, so it is safe to read
        // it before taking the lock.
        let subject_id = reviews::get_review(&self.aggregator.db, review_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Review {}", review_id)))?
            .subject_id;

        let _guard = self.aggregator.locks.acquire(subject_id).await;
        let review = retry_on_lock("moderation decide", self.aggregator.max_lock_wait_ms, || {
            self.decide_once(review_id, subject_id, outcome, admin.admin_id())
        })
        .await?;

        info!(
            review_id = %review.id,
            subject_id,
            moderator_id = admin.admin_id(),
            status = %review.status,
            "Review moderated"
        );
        Ok(review)
    }

    async fn decide_once(
        &self,
        review_id: Uuid,
        subject_id: i64,
        outcome: ModerationOutcome,
        moderator_id: i64,
    ) -> Result<Review> {
        let now = time::now();
        let mut tx = self.aggregator.db.begin().await?;
        open_subject(&mut tx, subject_id, &now).await?;

        let changed =
            reviews::decide_if_pending(&mut *tx, review_id, outcome.into(), moderator_id, &now)
                .await?;

        let review = reviews::get_review(&mut *tx, review_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Review {}", review_id)))?;

        if changed == 0 {
            return Err(Error::InvalidState(format!(
                "Review {} is {}, only pending reviews can be moderated",
                review_id, review.status
            )));
        }

        if outcome == ModerationOutcome::Approved {
            apply_delta_in(&mut tx, subject_id, review.verdict, Sign::Plus, &now).await?;
        }

        tx.commit().await?;
        Ok(review)
    }

    /// Pending reviews, oldest first, with the total pending count
    pub async fn pending_queue(
        &self,
        limit: i64,
        offset: i64,
        _admin: &AdminCapability,
    ) -> Result<(Vec<Review>, i64)> {
        let total = reviews::count_with_status(&self.aggregator.db, ReviewStatus::Pending).await?;
        let items = reviews::list_pending(&self.aggregator.db, limit, offset).await?;
        Ok((items, total))
    }
}
