//! Review lifecycle: submit, read, revise, delete
//!
//! Any change to a review that is currently approved takes its verdict back
//! out of the subject's counters in the same transaction.

use interio_common::api::Principal;
use interio_common::db::users;
use interio_common::{time, Error, Result};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::aggregator::{apply_delta_in, open_subject, Aggregator};
use crate::db::{retry_on_lock, reviews};
use crate::models::{Review, ReviewStatus, Sign, Verdict};

/// Requested changes to an existing review. Absent fields stay as they are.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewChanges {
    pub subject_id: Option<i64>,
    pub verdict: Option<Verdict>,
    pub body: Option<String>,
}

fn validate_body(body: &str) -> Result<()> {
    if body.trim().is_empty() {
        return Err(Error::InvalidInput("Review body must not be blank".to_string()));
    }
    Ok(())
}

fn review_not_found(review_id: Uuid) -> Error {
    Error::NotFound(format!("Review {}", review_id))
}

#[derive(Clone)]
pub struct ReviewService {
    aggregator: Aggregator,
}

impl ReviewService {
    pub fn new(aggregator: Aggregator) -> Self {
        Self { aggregator }
    }

    /// Submit a review of `subject_id`.
    ///
    /// A second submission for the same subject revises the author's existing
    /// review and sends it back to moderation. Returns `(review, created)`.
    pub async fn submit(
        &self,
        principal: &Principal,
        subject_id: i64,
        verdict: Verdict,
        body: &str,
    ) -> Result<(Review, bool)> {
        validate_body(body)?;
        if principal.user_id() == subject_id {
            return Err(Error::InvalidInput("Cannot review yourself".to_string()));
        }

        let author_id = principal.user_id();
        let _guard = self.aggregator.locks.acquire(subject_id).await;
        let (review, created) = retry_on_lock("review submit", self.aggregator.max_lock_wait_ms, || {
            self.submit_once(author_id, subject_id, verdict, body)
        })
        .await?;

        info!(
            review_id = %review.id,
            author_id,
            subject_id,
            verdict = %review.verdict,
            created,
            "Review submitted"
        );
        Ok((review, created))
    }

    async fn submit_once(
        &self,
        author_id: i64,
        subject_id: i64,
        verdict: Verdict,
        body: &str,
    ) -> Result<(Review, bool)> {
        let now = time::now();
        let mut tx = self.aggregator.db.begin().await?;
        open_subject(&mut tx, subject_id, &now).await?;

        let outcome = match reviews::find_by_author_and_subject(&mut *tx, author_id, subject_id).await? {
            Some(existing) => {
                if existing.status == ReviewStatus::Approved {
                    apply_delta_in(&mut tx, subject_id, existing.verdict, Sign::Minus, &now).await?;
                }
                reviews::revise_content(&mut *tx, existing.id, verdict, body, &now).await?;
                let review = reviews::get_review(&mut *tx, existing.id)
                    .await?
                    .ok_or_else(|| review_not_found(existing.id))?;
                (review, false)
            }
            None => {
                let review = Review {
                    id: Uuid::new_v4(),
                    author_id,
                    subject_id,
                    verdict,
                    body: body.to_string(),
                    status: ReviewStatus::Pending,
                    moderated_by: None,
                    moderated_at: None,
                    created_at: now,
                    updated_at: now,
                };
                reviews::insert_review(&mut *tx, &review).await?;
                (review, true)
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    /// Fetch a review visible to its author or an admin
    pub async fn get(&self, principal: &Principal, review_id: Uuid) -> Result<Review> {
        let review = reviews::get_review(&self.aggregator.db, review_id)
            .await?
            .ok_or_else(|| review_not_found(review_id))?;

        if review.author_id != principal.user_id() && !principal.is_admin() {
            return Err(Error::PermissionDenied(
                "Only the author or an admin can view this review".to_string(),
            ));
        }
        Ok(review)
    }

    /// Change verdict and/or body. Only the author may do this.
    ///
    /// `full` replacements must carry every field and keep the same subject.
    pub async fn revise(
        &self,
        principal: &Principal,
        review_id: Uuid,
        changes: ReviewChanges,
        full: bool,
    ) -> Result<Review> {
        let current = reviews::get_review(&self.aggregator.db, review_id)
            .await?
            .ok_or_else(|| review_not_found(review_id))?;

        if current.author_id != principal.user_id() {
            return Err(Error::PermissionDenied(
                "Only the author can change a review".to_string(),
            ));
        }

        if full && (changes.subject_id.is_none() || changes.verdict.is_none() || changes.body.is_none()) {
            return Err(Error::InvalidInput(
                "Full update requires subject_id, verdict and body".to_string(),
            ));
        }
        if let Some(subject_id) = changes.subject_id {
            if subject_id != current.subject_id {
                return Err(Error::InvalidInput(
                    "The reviewed subject cannot be changed".to_string(),
                ));
            }
        }
        if let Some(body) = changes.body.as_deref() {
            validate_body(body)?;
        }

        let subject_id = current.subject_id;
        let _guard = self.aggregator.locks.acquire(subject_id).await;
        let review = retry_on_lock("review revise", self.aggregator.max_lock_wait_ms, || {
            self.revise_once(review_id, subject_id, &changes)
        })
        .await?;

        info!(review_id = %review.id, subject_id, "Review revised, awaiting moderation");
        Ok(review)
    }

    async fn revise_once(
        &self,
        review_id: Uuid,
        subject_id: i64,
        changes: &ReviewChanges,
    ) -> Result<Review> {
        let now = time::now();
        let mut tx = self.aggregator.db.begin().await?;
        open_subject(&mut tx, subject_id, &now).await?;

        let current = reviews::get_review(&mut *tx, review_id)
            .await?
            .ok_or_else(|| review_not_found(review_id))?;

        if current.status == ReviewStatus::Approved {
            apply_delta_in(&mut tx, subject_id, current.verdict, Sign::Minus, &now).await?;
        }

        let verdict = changes.verdict.unwrap_or(current.verdict);
        let body = changes.body.as_deref().unwrap_or(&current.body);
        reviews::revise_content(&mut *tx, review_id, verdict, body, &now).await?;

        let review = reviews::get_review(&mut *tx, review_id)
            .await?
            .ok_or_else(|| review_not_found(review_id))?;

        tx.commit().await?;
        Ok(review)
    }

    /// Remove a review (author or admin)
    pub async fn delete(&self, principal: &Principal, review_id: Uuid) -> Result<()> {
        let review = reviews::get_review(&self.aggregator.db, review_id)
            .await?
            .ok_or_else(|| review_not_found(review_id))?;

        if review.author_id != principal.user_id() && !principal.is_admin() {
            return Err(Error::PermissionDenied(
                "Only the author or an admin can delete this review".to_string(),
            ));
        }

        let subject_id = review.subject_id;
        let _guard = self.aggregator.locks.acquire(subject_id).await;
        retry_on_lock("review delete", self.aggregator.max_lock_wait_ms, || {
            self.delete_once(review_id, subject_id)
        })
        .await?;

        info!(
            review_id = %review_id,
            subject_id,
            deleted_by = principal.user_id(),
            "Review deleted"
        );
        Ok(())
    }

    async fn delete_once(&self, review_id: Uuid, subject_id: i64) -> Result<()> {
        let now = time::now();
        let mut tx = self.aggregator.db.begin().await?;
        open_subject(&mut tx, subject_id, &now).await?;

        let review = reviews::get_review(&mut *tx, review_id)
            .await?
            .ok_or_else(|| review_not_found(review_id))?;

        if review.status == ReviewStatus::Approved {
            apply_delta_in(&mut tx, subject_id, review.verdict, Sign::Minus, &now).await?;
        }
        reviews::delete_review(&mut *tx, review_id).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Approved reviews about a subject, newest first, with the total count
    pub async fn approved_for_subject(
        &self,
        subject_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Review>, i64)> {
        if users::get_profile(&self.aggregator.db, subject_id).await?.is_none() {
            return Err(Error::NotFound(format!("No profile for subject {}", subject_id)));
        }
        let total = reviews::count_approved_for_subject(&self.aggregator.db, subject_id).await?;
        let items =
            reviews::list_approved_for_subject(&self.aggregator.db, subject_id, limit, offset)
                .await?;
        Ok((items, total))
    }
}
