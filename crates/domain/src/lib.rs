mod events;
mod models;
mod thread;

pub use events::StreamEvent;
pub use models::{Comment, CommentId, LikeState, NewComment, Post, PostId, User, UserId};
pub use thread::{thread_comments, CommentThread};
