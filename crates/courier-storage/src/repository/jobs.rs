//! Dispatch job queue repository
//!
//! Durable work queue rows claimed with FOR UPDATE SKIP LOCKED so multiple
//! workers can drain the queue concurrently (at-least-once semantics).

use chrono::{DateTime, Utc};
use courier_common::types::JobId;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::DispatchJob;

/// Job queue repository
#[derive(Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    /// Create a new job repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Enqueue a job on a named queue
    pub async fn enqueue(
        &self,
        queue: &str,
        payload: serde_json::Value,
        max_attempts: i32,
    ) -> Result<JobId, sqlx::Error> {
        let id = Uuid::now_v7();

        sqlx::query(
            r#"
            INSERT INTO dispatch_jobs (id, queue, payload, status, attempts, max_attempts, scheduled_at)
            VALUES ($1, $2, $3, 'pending', 0, $4, NOW())
            "#,
        )
        .bind(id)
        .bind(queue)
        .bind(&payload)
        .bind(max_attempts)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    /// Claim due pending jobs for processing
    pub async fn fetch_due(
        &self,
        queue: &str,
        limit: i64,
    ) -> Result<Vec<DispatchJob>, sqlx::Error> {
        sqlx::query_as::<_, DispatchJob>(
            r#"
            SELECT * FROM dispatch_jobs
            WHERE status = 'pending'
              AND queue = $1
              AND scheduled_at <= NOW()
            ORDER BY scheduled_at ASC
            LIMIT $2
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(queue)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Mark a job as started
    pub async fn mark_started(&self, id: JobId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE dispatch_jobs SET status = 'processing', started_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Mark a job as completed
    pub async fn mark_completed(&self, id: JobId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE dispatch_jobs SET status = 'completed', completed_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Mark a job as permanently failed
    pub async fn mark_failed(&self, id: JobId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE dispatch_jobs
            SET status = 'failed', last_error = $2, completed_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Schedule a retry attempt
    pub async fn schedule_retry(
        &self,
        id: JobId,
        attempts: i32,
        error: &str,
        scheduled_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE dispatch_jobs
            SET status = 'pending',
                attempts = $2,
                last_error = $3,
                scheduled_at = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(attempts)
        .bind(error)
        .bind(scheduled_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
