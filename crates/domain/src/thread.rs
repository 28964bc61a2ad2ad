use crate::models::{Comment, CommentId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A top-level comment with every descendant reply flattened beneath it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<Comment>,
}

/// Groups a post's comments into one-level threads.
///
/// Replies of any depth are attached to their top-level ancestor. A reply
/// whose ancestry cannot be resolved (missing parent, cycle) is promoted to a
/// thread of its own so no comment is dropped. Input order is kept for both
/// threads and replies.
pub fn thread_comments(comments: Vec<Comment>) -> Vec<CommentThread> {
    let parents: HashMap<CommentId, Option<CommentId>> = comments
        .iter()
        .map(|c| (c.id.clone(), c.parent_id.clone()))
        .collect();

    let root_of = |c: &Comment| -> CommentId {
        let mut current = c.id.clone();
        for _ in 0..parents.len() {
            match parents.get(&current) {
                Some(Some(parent)) if parents.contains_key(parent) => current = parent.clone(),
                _ => return current,
            }
        }
        c.id.clone()
    };

    let roots: Vec<CommentId> = comments.iter().map(root_of).collect();

    let mut threads: Vec<CommentThread> = Vec::new();
    let mut index: HashMap<CommentId, usize> = HashMap::new();
    let mut pending: Vec<(CommentId, Comment)> = Vec::new();

    for (comment, root) in comments.into_iter().zip(roots) {
        if comment.id == root {
            index.insert(comment.id.clone(), threads.len());
            threads.push(CommentThread {
                comment,
                replies: Vec::new(),
            });
        } else {
            pending.push((root, comment));
        }
    }

    for (root, reply) in pending {
        match index.get(&root) {
            Some(&i) => threads[i].replies.push(reply),
            None => threads.push(CommentThread {
                comment: reply,
                replies: Vec::new(),
            }),
        }
    }

    threads
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PostId, UserId};

    fn comment(id: &str, parent: Option<&str>) -> Comment {
        let ts = chrono::DateTime::from_timestamp(0, 0).unwrap().naive_utc();
        Comment {
            id: CommentId::new_unchecked(id.into()),
            post_id: PostId::new_unchecked("p".into()),
            parent_id: parent.map(|p| CommentId::new_unchecked(p.into())),
            author_id: UserId::new_unchecked("u".into()),
            content: id.into(),
            like_count: 0,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn nested_replies_flatten_under_root() {
        let threads = thread_comments(vec![
            comment("a", None),
            comment("b", None),
            comment("a1", Some("a")),
            comment("a1x", Some("a1")),
            comment("b1", Some("b")),
        ]);

        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].comment.id.as_str(), "a");
        let a_replies: Vec<_> = threads[0].replies.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(a_replies, ["a1", "a1x"]);
        assert_eq!(threads[1].replies.len(), 1);
    }

    #[test]
    fn reply_before_parent_in_input() {
        let threads = thread_comments(vec![comment("r", Some("a")), comment("a", None)]);
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].replies[0].id.as_str(), "r");
    }

    #[test]
    fn orphans_are_promoted() {
        let threads = thread_comments(vec![comment("r", Some("gone"))]);
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].comment.id.as_str(), "r");
    }

    #[test]
    fn flattened_thread_serializes_with_replies() {
        let threads = thread_comments(vec![comment("a", None)]);
        let v = serde_json::to_value(&threads[0]).unwrap();
        assert_eq!(v["id"], "a");
        assert!(v["replies"].as_array().unwrap().is_empty());
    }
}
