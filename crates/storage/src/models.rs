use chrono::NaiveDateTime;
use domain::{Comment, CommentId, Post, PostId, User, UserId};
use sqlx::FromRow;

#[derive(FromRow)]
pub struct SqlComment {
    pub id: String,
    pub post_id: String,
    pub parent_id: Option<String>,
    pub author_id: String,
    pub content: String,
    // computed from comment_likes
    pub like_count: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<SqlComment> for Comment {
    fn from(sql: SqlComment) -> Self {
        Comment {
            id: CommentId::new_unchecked(sql.id),
            post_id: PostId::new_unchecked(sql.post_id),
            parent_id: sql.parent_id.map(CommentId::new_unchecked),
            author_id: UserId::new_unchecked(sql.author_id),
            content: sql.content,
            like_count: sql.like_count,
            created_at: sql.created_at,
            updated_at: sql.updated_at,
        }
    }
}

#[derive(FromRow)]
pub struct SqlPost {
    pub id: String,
    pub author_id: String,
    pub title: String,
}

impl From<SqlPost> for Post {
    fn from(sql: SqlPost) -> Self {
        Post {
            id: PostId::new_unchecked(sql.id),
            author_id: UserId::new_unchecked(sql.author_id),
            title: sql.title,
        }
    }
}

#[derive(FromRow)]
pub struct SqlUser {
    pub id: String,
    pub display_name: String,
    pub email: Option<String>,
}

impl From<SqlUser> for User {
    fn from(sql: SqlUser) -> Self {
        User {
            id: UserId::new_unchecked(sql.id),
            display_name: sql.display_name,
            email: sql.email,
        }
    }
}
