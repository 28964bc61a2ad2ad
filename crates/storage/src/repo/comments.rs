use crate::{models::SqlComment, Db};
use chrono::Utc;
use domain::{Comment, CommentId, NewComment, PostId};
use sqlx::Row;

const SELECT_COMMENT: &str = r#"
    SELECT
        c.id,
        c.post_id,
        c.parent_id,
        c.author_id,
        c.content,
        (SELECT COUNT(*) FROM comment_likes l WHERE l.comment_id = c.id) AS like_count,
        c.created_at,
        c.updated_at
    FROM comments c
"#;

impl Db {
    pub async fn insert_comment(&self, new: NewComment) -> anyhow::Result<Comment> {
        let now = Utc::now().naive_utc();
        let comment = Comment {
            id: CommentId::generate(),
            post_id: new.post_id,
            parent_id: new.parent_id,
            author_id: new.author_id,
            content: new.content,
            like_count: 0,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO comments (id, post_id, parent_id, author_id, content, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(comment.id.as_str())
        .bind(comment.post_id.as_str())
        .bind(comment.parent_id.as_ref().map(|p| p.as_str()))
        .bind(comment.author_id.as_str())
        .bind(&comment.content)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(comment)
    }

    pub async fn get_comment(&self, id: &CommentId) -> anyhow::Result<Option<Comment>> {
        let row = sqlx::query_as::<_, SqlComment>(&format!("{SELECT_COMMENT} WHERE c.id = ?"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    pub async fn list_comments(&self, post_id: &PostId) -> anyhow::Result<Vec<Comment>> {
        let rows = sqlx::query_as::<_, SqlComment>(&format!(
            "{SELECT_COMMENT} WHERE c.post_id = ? ORDER BY c.created_at ASC, c.rowid ASC"
        ))
        .bind(post_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn update_comment_content(
        &self,
        id: &CommentId,
        content: &str,
    ) -> anyhow::Result<Option<Comment>> {
        let result = sqlx::query("UPDATE comments SET content = ?, updated_at = ? WHERE id = ?")
            .bind(content)
            .bind(Utc::now().naive_utc())
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_comment(id).await
    }

    /// Removes a comment together with every reply below it.
    ///
    /// Returns the removed ids, deepest replies first and the requested
    /// comment last. An empty vector means the comment did not exist.
    pub async fn delete_comment_tree(&self, id: &CommentId) -> anyhow::Result<Vec<CommentId>> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query(
            r#"
            WITH RECURSIVE subtree(id, depth) AS (
                SELECT id, 0 FROM comments WHERE id = ?
                UNION ALL
                SELECT c.id, s.depth + 1
                FROM comments c
                JOIN subtree s ON c.parent_id = s.id
            )
            SELECT id FROM subtree ORDER BY depth DESC
            "#,
        )
        .bind(id.as_str())
        .fetch_all(&mut *tx)
        .await?;

        let ids: Vec<String> = rows.iter().map(|r| r.get::<String, _>(0)).collect();

        for removed in &ids {
            sqlx::query("DELETE FROM comment_likes WHERE comment_id = ?")
                .bind(removed)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM comments WHERE id = ?")
                .bind(removed)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(ids.into_iter().map(CommentId::new_unchecked).collect())
    }
}
