//! Rating Aggregator
//!
//! Keeps the `ratings` projection equal to the approved subset of `reviews`.
//! Two update paths exist:
//!
//! - **Incremental:** one review changes state, one counter moves by one.
//! - **Recompute:** both counters are recounted from `reviews`.
//!
//! Both paths run under the subject's in-process lock and inside a single
//! transaction that opens with [`open_subject`], so the write lock is held
//! before the first read.

use chrono::{DateTime, Utc};
use interio_common::api::AdminCapability;
use interio_common::db::users;
use interio_common::{time, Error, Result};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};

use super::locks::SubjectLocks;
use crate::db::{ratings, retry_on_lock, reviews};
use crate::models::{Rating, Sign, Verdict};

/// Claim the subject's rating row and confirm the subject has a profile.
///
/// Must be the first call in every counter-changing transaction.
pub(crate) async fn open_subject(
    conn: &mut SqliteConnection,
    subject_id: i64,
    now: &DateTime<Utc>,
) -> Result<()> {
    ratings::touch(&mut *conn, subject_id, now).await?;
    if !users::profile_exists(conn, subject_id).await? {
        return Err(Error::NotFound(format!("No profile for subject {}", subject_id)));
    }
    Ok(())
}

/// Move one counter by one inside an open transaction
pub(crate) async fn apply_delta_in(
    conn: &mut SqliteConnection,
    subject_id: i64,
    verdict: Verdict,
    sign: Sign,
    now: &DateTime<Utc>,
) -> Result<Rating> {
    let current = ratings::get_rating(&mut *conn, subject_id)
        .await?
        .unwrap_or_else(|| Rating::empty(subject_id));

    let (positive_count, negative_count) = match verdict {
        Verdict::Positive => (
            step(subject_id, verdict, current.positive_count, sign),
            current.negative_count,
        ),
        Verdict::Negative => (
            current.positive_count,
            step(subject_id, verdict, current.negative_count, sign),
        ),
    };

    ratings::store_incremental(&mut *conn, subject_id, positive_count, negative_count, now)
        .await?;

    Ok(Rating {
        positive_count,
        negative_count,
        updated_at: Some(*now),
        ..current
    })
}

/// Recount both counters from approved reviews inside an open transaction
pub(crate) async fn recompute_in(
    conn: &mut SqliteConnection,
    subject_id: i64,
    now: &DateTime<Utc>,
) -> Result<Rating> {
    let (positive_count, negative_count) =
        reviews::count_approved_by_verdict(&mut *conn, subject_id).await?;

    ratings::store_recomputed(&mut *conn, subject_id, positive_count, negative_count, now)
        .await?;

    Ok(Rating {
        subject_id,
        positive_count,
        negative_count,
        last_recomputed_at: Some(*now),
        updated_at: Some(*now),
    })
}

fn step(subject_id: i64, verdict: Verdict, count: i64, sign: Sign) -> i64 {
    let next = count + sign.value();
    if next < 0 {
        warn!(
            subject_id,
            verdict = %verdict,
            "Counter decrement below zero; saturating at 0"
        );
        0
    } else {
        next
    }
}

/// Entry point for all rating updates
#[derive(Clone)]
pub struct Aggregator {
    pub(crate) db: SqlitePool,
    pub(crate) locks: SubjectLocks,
    pub(crate) max_lock_wait_ms: u64,
}

impl Aggregator {
    pub fn new(db: SqlitePool, max_lock_wait_ms: u64) -> Self {
        Self {
            db,
            locks: SubjectLocks::new(),
            max_lock_wait_ms,
        }
    }

    /// Current snapshot. A subject with a profile but no row reads as zeros.
    pub async fn get_rating(&self, subject_id: i64) -> Result<Rating> {
        let mut conn = self.db.acquire().await?;
        if !users::profile_exists(&mut conn, subject_id).await? {
            return Err(Error::NotFound(format!("No profile for subject {}", subject_id)));
        }
        Ok(ratings::get_rating(&mut *conn, subject_id)
            .await?
            .unwrap_or_else(|| Rating::empty(subject_id)))
    }

    /// Rebuild the subject's counters from the approved subset
    pub async fn recompute(&self, subject_id: i64) -> Result<Rating> {
        let _guard = self.locks.acquire(subject_id).await;
        retry_on_lock("rating recompute", self.max_lock_wait_ms, || {
            self.recompute_once(subject_id)
        })
        .await
    }

    async fn recompute_once(&self, subject_id: i64) -> Result<Rating> {
        let now = time::now();
        let mut tx = self.db.begin().await?;
        open_subject(&mut tx, subject_id, &now).await?;
        let rating = recompute_in(&mut tx, subject_id, &now).await?;
        tx.commit().await?;
        Ok(rating)
    }

    /// Adjust one counter after a single review changed state
    pub async fn apply_delta(&self, subject_id: i64, verdict: Verdict, sign: Sign) -> Result<Rating> {
        let _guard = self.locks.acquire(subject_id).await;
        retry_on_lock("rating delta", self.max_lock_wait_ms, || {
            self.apply_delta_once(subject_id, verdict, sign)
        })
        .await
    }

    async fn apply_delta_once(&self, subject_id: i64, verdict: Verdict, sign: Sign) -> Result<Rating> {
        let now = time::now();
        let mut tx = self.db.begin().await?;
        open_subject(&mut tx, subject_id, &now).await?;
        let rating = apply_delta_in(&mut tx, subject_id, verdict, sign, &now).await?;
        tx.commit().await?;
        Ok(rating)
    }

    /// Admin-triggered full recompute for one subject
    pub async fn recalc(&self, subject_id: i64, admin: &AdminCapability) -> Result<Rating> {
        let rating = self.recompute(subject_id).await?;
        info!(
            subject_id,
            admin_id = admin.admin_id(),
            positive = rating.positive_count,
            negative = rating.negative_count,
            "Rating recalculated"
        );
        Ok(rating)
    }

    /// Recompute every profile. Returns the number of subjects processed.
    pub async fn recompute_all(&self) -> Result<usize> {
        let subject_ids = users::list_profile_ids(&self.db).await?;
        let mut processed = 0;
        for subject_id in subject_ids {
            match self.recompute(subject_id).await {
                Ok(_) => processed += 1,
                // Profile removed since the listing
                Err(Error::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        info!(processed, "Reconciled all ratings");
        Ok(processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_increments_and_decrements() {
        assert_eq!(step(1, Verdict::Positive, 0, Sign::Plus), 1);
        assert_eq!(step(1, Verdict::Positive, 3, Sign::Minus), 2);
    }

    #[test]
    fn test_step_saturates_at_zero() {
        assert_eq!(step(1, Verdict::Negative, 0, Sign::Minus), 0);
    }
}
