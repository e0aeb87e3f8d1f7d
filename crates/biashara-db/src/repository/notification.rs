//! # Notification Repository
//!
//! Database operations for the in-app notification feed.
//!
//! ## Best-Effort Writes
//! Notification inserts happen AFTER the owning transaction commits and a
//! failure here never fails the request that produced it. Callers log the
//! error and move on.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use biashara_core::Notification;

/// Repository for notification database operations.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    /// Creates a new NotificationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        NotificationRepository { pool }
    }

    /// Inserts a new notification.
    pub async fn insert(&self, notification: &Notification) -> DbResult<Notification> {
        debug!(
            user_id = %notification.user_id,
            title = %notification.title,
            "Inserting notification"
        );

        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, user_id, category, title, message,
                priority, read, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&notification.id)
        .bind(&notification.user_id)
        .bind(notification.category)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.priority)
        .bind(notification.read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(notification.clone())
    }

    /// Lists notifications for a user, newest first.
    ///
    /// ## Arguments
    /// * `unread_only` - When true, only unread notifications
    pub async fn list_for_user(
        &self,
        user_id: &str,
        unread_only: bool,
    ) -> DbResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, category, title, message,
                   priority, read, created_at
            FROM notifications
            WHERE user_id = ?1
              AND (?2 = 0 OR read = 0)
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    /// Counts unread notifications for a user.
    pub async fn unread_count(&self, user_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND read = 0",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Marks a single notification as read.
    ///
    /// Scoped to the user so one user cannot mark another user's
    /// notification.
    ///
    /// ## Returns
    /// * `Ok(true)` - Notification marked
    /// * `Ok(false)` - Not found for this user (or already gone)
    pub async fn mark_read(&self, id: &str, user_id: &str) -> DbResult<bool> {
        debug!(id = %id, "Marking notification read");

        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET read = 1
            WHERE id = ?1 AND user_id = ?2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Marks all of a user's notifications as read.
    ///
    /// ## Returns
    /// Number of notifications that were flipped.
    pub async fn mark_all_read(&self, user_id: &str) -> DbResult<u64> {
        debug!(user_id = %user_id, "Marking all notifications read");

        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET read = 1
            WHERE user_id = ?1 AND read = 0
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use biashara_core::{NotificationCategory, NotificationPriority};

    fn sample_notification(id: &str, user_id: &str) -> Notification {
        Notification {
            id: id.to_string(),
            user_id: user_id.to_string(),
            category: NotificationCategory::LowStock,
            title: "Low stock".to_string(),
            message: "Sugar 1kg is down to 3 units".to_string(),
            priority: NotificationPriority::Medium,
            read: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        db.notifications()
            .insert(&sample_notification("n-1", "u-1"))
            .await
            .unwrap();
        db.notifications()
            .insert(&sample_notification("n-2", "u-2"))
            .await
            .unwrap();

        let mine = db.notifications().list_for_user("u-1", false).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, "n-1");
    }

    #[tokio::test]
    async fn test_mark_read_scoped_to_user() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.notifications()
            .insert(&sample_notification("n-1", "u-1"))
            .await
            .unwrap();

        // Wrong user cannot flip it
        assert!(!db.notifications().mark_read("n-1", "u-2").await.unwrap());
        assert_eq!(db.notifications().unread_count("u-1").await.unwrap(), 1);

        assert!(db.notifications().mark_read("n-1", "u-1").await.unwrap());
        assert_eq!(db.notifications().unread_count("u-1").await.unwrap(), 0);

        let unread = db.notifications().list_for_user("u-1", true).await.unwrap();
        assert!(unread.is_empty());
    }

    #[tokio::test]
    async fn test_mark_all_read() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.notifications()
            .insert(&sample_notification("n-1", "u-1"))
            .await
            .unwrap();
        db.notifications()
            .insert(&sample_notification("n-2", "u-1"))
            .await
            .unwrap();

        let flipped = db.notifications().mark_all_read("u-1").await.unwrap();
        assert_eq!(flipped, 2);
        assert_eq!(db.notifications().unread_count("u-1").await.unwrap(), 0);
    }
}
