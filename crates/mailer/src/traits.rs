use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Template {
    /// Someone commented on a post you wrote.
    NewComment,
    /// Someone replied to your comment.
    NewReply,
}

impl Template {
    pub fn as_str(&self) -> &'static str {
        match self {
            Template::NewComment => "new_comment",
            Template::NewReply => "new_reply",
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_notification(&self, recipient: &str, template: Template, context: &Value)
        -> Result<()>;
}
