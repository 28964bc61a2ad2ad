use crate::Db;
use chrono::Utc;
use domain::{CommentId, UserId};

impl Db {
    /// Flips the (comment, user) like relation. Returns `true` when the user
    /// now likes the comment.
    pub async fn toggle_like(&self, comment_id: &CommentId, user_id: &UserId) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM comment_likes WHERE comment_id = ? AND user_id = ?")
            .bind(comment_id.as_str())
            .bind(user_id.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed == 0 {
            sqlx::query(
                "INSERT INTO comment_likes (comment_id, user_id, created_at) VALUES (?, ?, ?)",
            )
            .bind(comment_id.as_str())
            .bind(user_id.as_str())
            .bind(Utc::now().naive_utc())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(removed == 0)
    }

    pub async fn count_likes(&self, comment_id: &CommentId) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comment_likes WHERE comment_id = ?")
            .bind(comment_id.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
