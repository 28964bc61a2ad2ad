use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_ID_LEN: usize = 128;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Result<Self, String> {
                let s = s.into();
                if s.trim().is_empty() {
                    return Err(format!("{} cannot be empty.", stringify!($name)));
                }
                if s.len() > MAX_ID_LEN {
                    return Err(format!(
                        "{} is too long (max {} chars).",
                        stringify!($name),
                        MAX_ID_LEN
                    ));
                }
                if s.chars().any(|c| c.is_control() || c == '/') {
                    return Err(format!("{} contains invalid characters.", stringify!($name)));
                }
                Ok(Self(s))
            }

            pub fn new_unchecked(s: String) -> Self {
                Self(s)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

opaque_id!(
    /// Identifier of the resource (blog post) a comment thread hangs off.
    PostId
);
opaque_id!(CommentId);
opaque_id!(UserId);

impl CommentId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub parent_id: Option<CommentId>,
    pub author_id: UserId,
    pub content: String,
    pub like_count: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A comment as submitted, before the store assigns identity and timestamps.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: PostId,
    pub parent_id: Option<CommentId>,
    pub author_id: UserId,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeState {
    pub liked: bool,
    pub like_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_validation() {
        assert!(PostId::new("hello-world").is_ok());
        assert!(PostId::new("  ").is_err());
        assert!(PostId::new("a/b").is_err());
        assert!(UserId::new("x".repeat(MAX_ID_LEN + 1)).is_err());
        assert_eq!(UserId::new("42").unwrap().as_str(), "42");
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(CommentId::generate(), CommentId::generate());
    }

    #[test]
    fn comment_serializes_camel_case() {
        let ts = chrono::DateTime::from_timestamp(0, 0).unwrap().naive_utc();
        let c = Comment {
            id: CommentId::new_unchecked("c1".into()),
            post_id: PostId::new_unchecked("p1".into()),
            parent_id: None,
            author_id: UserId::new_unchecked("42".into()),
            content: "hello".into(),
            like_count: 0,
            created_at: ts,
            updated_at: ts,
        };
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["id"], "c1");
        assert_eq!(v["postId"], "p1");
        assert!(v["parentId"].is_null());
        assert_eq!(v["likeCount"], 0);
    }
}
