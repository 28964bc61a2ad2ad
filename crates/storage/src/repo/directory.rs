use crate::{
    models::{SqlPost, SqlUser},
    Db,
};
use domain::{Post, PostId, User, UserId};

// Posts and users are written by the CMS; these helpers keep the mirrored
// rows current and let tests seed data.
impl Db {
    pub async fn upsert_post(&self, post: &Post) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, author_id, title)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                author_id = excluded.author_id,
                title = excluded.title
            "#,
        )
        .bind(post.id.as_str())
        .bind(post.author_id.as_str())
        .bind(&post.title)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn upsert_user(&self, user: &User) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, display_name, email)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                email = excluded.email
            "#,
        )
        .bind(user.id.as_str())
        .bind(&user.display_name)
        .bind(&user.email)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_post(&self, id: &PostId) -> anyhow::Result<Option<Post>> {
        let row = sqlx::query_as::<_, SqlPost>("SELECT id, author_id, title FROM posts WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    pub async fn get_user(&self, id: &UserId) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, SqlUser>(
            "SELECT id, display_name, email FROM users WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }
}
